//! Async HTTP client wrapping reqwest.
//!
//! Not a browser, just HTTP requests. One client (and its connection
//! pool) lives for the whole process. Every request carries a desktop
//! browser header set; strategies layer their own headers and cookies on
//! top. No retries happen here: the strategy ladder is the only retry policy.

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use std::time::Duration;

/// Desktop Chrome identity used when a strategy does not override it.
pub const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                              AppleWebKit/537.36 (KHTML, like Gecko) \
                              Chrome/120.0.0.0 Safari/537.36";

/// Maximum redirects followed per request.
const MAX_REDIRECTS: usize = 10;

/// Response from an HTTP GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Original requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// All response headers.
    pub headers: Vec<(String, String)>,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Per-request additions on top of the default header set.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions<'a> {
    pub headers: &'a [(String, String)],
    pub cookie: Option<&'a str>,
}

/// HTTP client shared by every strategy and the diagnostic probe.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client with the browser header set and a per-request timeout.
    pub fn new(timeout_ms: u64) -> Result<Self> {
        let timeout = Duration::from_millis(timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(BROWSER_UA)
            .default_headers(browser_headers())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Perform a single GET with the default header set.
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.get_with(url, &RequestOptions::default()).await
    }

    /// Perform a single GET with extra headers and an optional cookie header.
    ///
    /// Strategy headers replace defaults with the same name.
    pub async fn get_with(&self, url: &str, opts: &RequestOptions<'_>) -> Result<HttpResponse> {
        let mut builder = self.client.get(url).timeout(self.timeout);

        for (name, value) in opts.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name {name:?}"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header {name}"))?;
            builder = builder.header(name, value);
        }
        if let Some(cookie) = opts.cookie {
            builder = builder.header(COOKIE, cookie);
        }

        let r = builder
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        let status = r.status().as_u16();
        let final_url = r.url().to_string();

        let headers: Vec<(String, String)> = r
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let body = r
            .text()
            .await
            .with_context(|| format!("failed to read body of {url}"))?;

        Ok(HttpResponse {
            url: url.to_string(),
            final_url,
            status,
            headers,
            body,
        })
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        reqwest::header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers
}
