//! `websource debug <url>`: one request, described as JSON.

use crate::acquisition::diagnose;
use crate::acquisition::http_client::HttpClient;
use crate::acquisition::orchestrator::normalize_url;
use crate::acquisition::validity::ContentValidator;
use crate::config::ServiceConfig;
use anyhow::Result;

pub async fn run(cfg: &ServiceConfig, url: &str) -> Result<()> {
    let target = normalize_url(url)?;
    let client = HttpClient::new(cfg.fetch.request_timeout_ms)?;
    let validator = ContentValidator::new(cfg.fetch.min_content_length);

    let report = diagnose::probe(&client, &validator, target.as_str()).await?;
    super::print_json(&report)
}
