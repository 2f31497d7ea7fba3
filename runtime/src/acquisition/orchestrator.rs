//! Fetch orchestrator: run the strategy ladder until a body passes the
//! validity predicate.
//!
//! Attempts run strictly one after another. A failed attempt (transport
//! error, timeout, non-200 status, invalid body) is recorded in the result
//! and the next strategy is tried; nothing is retried and nothing is raised.

use super::http_client::{HttpClient, RequestOptions};
use super::strategy::{Candidate, Channel, StrategyCatalog};
use super::validity::{ContentValidator, Verdict};
use crate::renderer::BrowserSlot;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Input errors. Everything past URL validation ends in a [`FetchResult`].
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("URL is required")]
    MissingUrl,
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Accepted,
    Rejected { verdict: Verdict },
    Status { code: u16 },
    Failed { message: String },
    Unavailable,
}

/// One entry of the attempt log.
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub label: String,
    pub url: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// Outcome of one resolve call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchResult {
    pub content: Option<String>,
    /// URL that finally served the content (after redirects).
    pub source_url: Option<String>,
    pub strategy_used: Option<String>,
    pub attempts: Vec<Attempt>,
}

impl FetchResult {
    pub fn is_found(&self) -> bool {
        self.content.is_some()
    }
}

/// Normalize user input into an absolute http(s) URL. A missing scheme
/// defaults to `https://`.
pub fn normalize_url(input: &str) -> Result<Url, ResolveError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ResolveError::MissingUrl);
    }

    let lower = trimmed.to_ascii_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else if trimmed.contains("://") {
        return Err(ResolveError::InvalidUrl {
            url: trimmed.to_string(),
            reason: "only http and https are supported".to_string(),
        });
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&with_scheme).map_err(|e| ResolveError::InvalidUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ResolveError::InvalidUrl {
            url: trimmed.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

/// Runs the strategy catalog against target URLs.
pub struct Orchestrator {
    client: HttpClient,
    catalog: StrategyCatalog,
    validator: ContentValidator,
    browser: Option<Arc<BrowserSlot>>,
    pace: Duration,
}

impl Orchestrator {
    pub fn new(client: HttpClient, catalog: StrategyCatalog, validator: ContentValidator) -> Self {
        Self {
            client,
            catalog,
            validator,
            browser: None,
            pace: Duration::ZERO,
        }
    }

    /// Attach the browser used by `Channel::Browser` strategies.
    pub fn with_browser(mut self, browser: Arc<BrowserSlot>) -> Self {
        self.browser = Some(browser);
        self
    }

    /// Pause between attempts. Up to half of it is added as random jitter.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    pub fn validator(&self) -> &ContentValidator {
        &self.validator
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Try each strategy in order and return the first valid body.
    pub async fn resolve(&self, input: &str) -> Result<FetchResult, ResolveError> {
        let url = normalize_url(input)?;
        let plan = self.catalog.plan(&url);
        info!(url = %url, strategies = plan.len(), "resolving");

        let mut result = FetchResult::default();
        for (i, candidate) in plan.iter().enumerate() {
            if i > 0 {
                self.pause().await;
            }

            let (outcome, body) = self.attempt(candidate).await;
            debug!(
                strategy = %candidate.label,
                url = %candidate.url,
                outcome = ?outcome,
                "attempt finished"
            );
            let accepted = outcome == AttemptOutcome::Accepted;
            result.attempts.push(Attempt {
                label: candidate.label.clone(),
                url: candidate.url.clone(),
                outcome,
            });

            if let (true, Some((content, source_url))) = (accepted, body) {
                info!(strategy = %candidate.label, source = %source_url, "content recovered");
                result.content = Some(content);
                result.source_url = Some(source_url);
                result.strategy_used = Some(candidate.label.clone());
                return Ok(result);
            }
        }

        warn!(url = %url, attempts = result.attempts.len(), "no strategy produced valid content");
        Ok(result)
    }

    /// Issue one candidate. On acceptance also returns `(body, final_url)`.
    async fn attempt(&self, candidate: &Candidate) -> (AttemptOutcome, Option<(String, String)>) {
        match candidate.channel {
            Channel::Http => {
                let cookie = candidate.cookie_header();
                let opts = RequestOptions {
                    headers: &candidate.headers,
                    cookie: cookie.as_deref(),
                };
                match self.client.get_with(&candidate.url, &opts).await {
                    Ok(resp) if !resp.is_ok() => (AttemptOutcome::Status { code: resp.status }, None),
                    Ok(resp) => self.judge(resp.body, resp.final_url),
                    Err(e) => (
                        AttemptOutcome::Failed {
                            message: format!("{e:#}"),
                        },
                        None,
                    ),
                }
            }
            Channel::Browser => {
                let Some(browser) = &self.browser else {
                    return (AttemptOutcome::Unavailable, None);
                };
                match browser.render(&candidate.url).await {
                    Ok(page) => self.judge(page.html, page.final_url),
                    Err(_) if !browser.is_ready() => (AttemptOutcome::Unavailable, None),
                    Err(e) => (
                        AttemptOutcome::Failed {
                            message: format!("{e:#}"),
                        },
                        None,
                    ),
                }
            }
        }
    }

    fn judge(&self, body: String, final_url: String) -> (AttemptOutcome, Option<(String, String)>) {
        match self.validator.classify(&body) {
            Verdict::Valid => (AttemptOutcome::Accepted, Some((body, final_url))),
            verdict => (AttemptOutcome::Rejected { verdict }, None),
        }
    }

    async fn pause(&self) {
        if self.pace.is_zero() {
            return;
        }
        let base = self.pace.as_millis() as u64;
        let jitter = rand::thread_rng().gen_range(0..=base / 2);
        tokio::time::sleep(Duration::from_millis(base + jitter)).await;
    }
}
