//! Download formatting: metadata comment and attachment filename.

use chrono::{DateTime, Utc};
use url::Url;

/// Name stamped into the metadata comment.
pub const TOOL_NAME: &str = "WebSource";

/// Prepend an HTML comment recording where and when the content came from.
///
/// The content itself is appended unchanged.
pub fn with_metadata(
    requested: &str,
    source_url: &str,
    strategy: &str,
    content: &str,
    at: DateTime<Utc>,
) -> String {
    let header = format!(
        "<!--\nSource: {}\nExtracted URL: {}\nStrategy: {}\nTime: {}\nTool: {TOOL_NAME}\n-->\n\n",
        sanitize_comment(requested),
        sanitize_comment(source_url),
        sanitize_comment(strategy),
        at.to_rfc3339(),
    );
    let mut out = String::with_capacity(header.len() + content.len());
    out.push_str(&header);
    out.push_str(content);
    out
}

/// `extracted-<host>-<YYYYmmdd-HHMMSS>.html`
pub fn download_filename(url: &str, at: DateTime<Utc>) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_else(|| "page".to_string());
    let host: String = host
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("extracted-{host}-{}.html", at.format("%Y%m%d-%H%M%S"))
}

/// Keep user-controlled text from closing the comment early.
fn sanitize_comment(text: &str) -> String {
    text.replace("--", "- -")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn test_metadata_prefix_and_verbatim_content() {
        let content = "<!DOCTYPE html>\n<html><body>ünïcødé</body></html>\n";
        let out = with_metadata(
            "https://example.com",
            "https://example.com/",
            "direct",
            content,
            at(),
        );
        assert!(out.starts_with("<!--\nSource: https://example.com\n"));
        assert!(out.contains("Strategy: direct\n"));
        assert!(out.contains("Time: 2026-03-14T09:26:53+00:00\n"));
        assert!(out.ends_with(content));
    }

    #[test]
    fn test_comment_terminator_in_url_is_neutralized() {
        let out = with_metadata("https://x.test/a-->b", "https://x.test/", "direct", "c", at());
        let header = &out[..out.len() - 1];
        assert_eq!(header.matches("-->").count(), 1);
    }

    #[test]
    fn test_download_filename() {
        assert_eq!(
            download_filename("https://zalim.kesug.com/index", at()),
            "extracted-zalim.kesug.com-20260314-092653.html"
        );
        assert_eq!(
            download_filename("not a url", at()),
            "extracted-page-20260314-092653.html"
        );
    }

    #[test]
    fn test_download_filename_sanitizes_ipv6() {
        let name = download_filename("http://[::1]:8080/", at());
        assert_eq!(name, "extracted----1--20260314-092653.html");
    }
}
