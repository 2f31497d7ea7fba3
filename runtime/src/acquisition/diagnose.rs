//! Single-request diagnostic probe behind `/api/debug`.
//!
//! Issues exactly one GET with the default header set and reports what came
//! back. Never runs the strategy ladder.

use super::http_client::HttpClient;
use super::validity::{has_bot_trap_marker, has_challenge_marker, ContentValidator, Verdict};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Characters of body included in the preview.
pub const PREVIEW_CHARS: usize = 300;

/// Headers never echoed back.
const HIDDEN_HEADERS: &[&str] = &["set-cookie", "cookie"];

#[derive(Debug, Clone, Serialize)]
pub struct DebugReport {
    pub url: String,
    pub final_url: String,
    pub status_code: u16,
    /// Body length in characters.
    pub content_length: usize,
    pub is_protected: bool,
    pub is_bot_trap: bool,
    pub verdict: Verdict,
    pub content_preview: String,
    pub headers: BTreeMap<String, String>,
}

/// Fetch `url` once and describe the response.
pub async fn probe(client: &HttpClient, validator: &ContentValidator, url: &str) -> Result<DebugReport> {
    let resp = client.get(url).await?;

    let mut headers = BTreeMap::new();
    for (name, value) in resp.headers {
        if HIDDEN_HEADERS.contains(&name.as_str()) {
            continue;
        }
        headers
            .entry(name)
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.clone());
    }

    Ok(DebugReport {
        url: resp.url,
        final_url: resp.final_url,
        status_code: resp.status,
        content_length: resp.body.chars().count(),
        is_protected: has_challenge_marker(&resp.body),
        is_bot_trap: has_bot_trap_marker(&resp.body),
        verdict: validator.classify(&resp.body),
        content_preview: preview(&resp.body, PREVIEW_CHARS),
        headers,
    })
}

/// First `max` characters, with `...` appended when truncated.
pub fn preview(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short_body_untouched() {
        assert_eq!(preview("hello", 300), "hello");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let body = "é".repeat(400);
        let p = preview(&body, 300);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), 303);
    }

    #[test]
    fn test_preview_exact_length() {
        let body = "a".repeat(300);
        assert_eq!(preview(&body, 300), body);
    }
}
