//! `websource fetch <url>`: run the ladder once from the command line.

use crate::acquisition::orchestrator::{normalize_url, AttemptOutcome, FetchResult};
use crate::config::ServiceConfig;
use crate::export;
use crate::server::AppState;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::Path;

/// Resolve `url` and write the page to `output` or stdout.
pub async fn run(cfg: &ServiceConfig, url: &str, output: Option<&Path>, raw: bool, json: bool) -> Result<()> {
    let target = normalize_url(url)?;
    let state = AppState::from_config(cfg)?;

    let result = state.orchestrator.resolve(target.as_str()).await;
    state.shutdown().await;
    let result = result?;

    if json {
        super::print_json(&result)?;
    } else {
        print_attempts(&result);
    }

    let (Some(content), Some(source_url), Some(strategy)) =
        (&result.content, &result.source_url, &result.strategy_used)
    else {
        bail!(
            "could not extract source code from {target} after {} attempts",
            result.attempts.len()
        );
    };

    if json && output.is_none() {
        return Ok(());
    }

    let now = Utc::now();
    let body = if raw {
        content.clone()
    } else {
        export::with_metadata(target.as_str(), source_url, strategy, content, now)
    };

    match output {
        Some(path) => {
            std::fs::write(path, &body)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("  Saved {} bytes to {}", body.len(), path.display());
        }
        None => print!("{body}"),
    }
    Ok(())
}

fn print_attempts(result: &FetchResult) {
    for (i, attempt) in result.attempts.iter().enumerate() {
        let outcome = match &attempt.outcome {
            AttemptOutcome::Accepted => "accepted".to_string(),
            AttemptOutcome::Rejected { verdict } => format!("rejected: {verdict}"),
            AttemptOutcome::Status { code } => format!("HTTP {code}"),
            AttemptOutcome::Failed { message } => format!("failed: {message}"),
            AttemptOutcome::Unavailable => "browser unavailable".to_string(),
        };
        eprintln!("  {:>2}. {:<22} {outcome}", i + 1, attempt.label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn offline_config() -> ServiceConfig {
        let mut cfg = ServiceConfig::default();
        cfg.browser.enabled = false;
        cfg.fetch.archive_base = None;
        cfg.fetch.pace_ms = 0;
        cfg.fetch.hosting_prefixes.clear();
        cfg
    }

    fn page() -> String {
        format!("<html><body>{}</body></html>", "<p>saved page</p>".repeat(10))
    }

    #[tokio::test]
    async fn test_fetch_writes_download_to_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("page.html");
        run(&offline_config(), &server.uri(), Some(&out), false, false)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.starts_with("<!--\nSource: "));
        assert!(written.ends_with(&page()));
    }

    #[tokio::test]
    async fn test_fetch_raw_omits_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("raw.html");
        run(&offline_config(), &server.uri(), Some(&out), true, false)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), page());
    }

    #[tokio::test]
    async fn test_fetch_not_found_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = run(&offline_config(), &server.uri(), None, false, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("could not extract"));
    }
}
