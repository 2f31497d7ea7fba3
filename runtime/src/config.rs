//! Service configuration.
//!
//! Values come from `WEBSOURCE_*` environment variables with built-in
//! defaults; the CLI overrides individual fields after loading.

use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// Default archive proxy prefix. `id_` asks the archive for the original bytes.
pub const DEFAULT_ARCHIVE_BASE: &str = "https://web.archive.org/web/2id_/";

/// Hosting-provider document roots tried as path prefixes.
pub const DEFAULT_HOSTING_PREFIXES: &[&str] = &["public_html", "htdocs", "www", "files"];

/// Top-level configuration for the service and CLI.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceConfig {
    /// Address the REST API binds to.
    pub host: String,
    /// Port the REST API binds to.
    pub port: u16,
    /// Fetch ladder settings.
    pub fetch: FetchSettings,
    /// Headless browser settings.
    pub browser: BrowserSettings,
    /// Capacity of the recent-error ring buffer.
    pub error_history: usize,
}

/// Settings for the HTTP strategies and the validity predicate.
#[derive(Debug, Clone, Serialize)]
pub struct FetchSettings {
    /// Timeout for a single attempt.
    pub request_timeout_ms: u64,
    /// Minimum trimmed body length accepted as real content.
    pub min_content_length: usize,
    /// Base pause between attempts; up to half of it is added as jitter.
    pub pace_ms: u64,
    /// Archive proxy prefix. `None` removes the archive strategy.
    pub archive_base: Option<String>,
    /// Cookies sent by the `cookie-replay` strategy. Empty removes it.
    #[serde(skip_serializing)]
    pub replay_cookies: Vec<(String, String)>,
    /// Path prefixes for the hosting subdirectory strategies.
    pub hosting_prefixes: Vec<String>,
}

/// Settings for the headless browser strategy.
#[derive(Debug, Clone, Serialize)]
pub struct BrowserSettings {
    /// Whether the browser strategy is part of the catalog.
    pub enabled: bool,
    /// Launch the browser at startup instead of on first use.
    pub eager: bool,
    /// DevTools websocket endpoint of an already running browser.
    pub remote_endpoint: Option<String>,
    /// Explicit path to a Chromium binary.
    pub chromium_path: Option<PathBuf>,
    /// Navigation timeout.
    pub navigation_timeout_ms: u64,
    /// Fixed delay after navigation before the document is read.
    pub settle_ms: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            min_content_length: 100,
            pace_ms: 500,
            archive_base: Some(DEFAULT_ARCHIVE_BASE.to_string()),
            replay_cookies: Vec::new(),
            hosting_prefixes: DEFAULT_HOSTING_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            eager: false,
            remote_endpoint: None,
            chromium_path: None,
            navigation_timeout_ms: 30_000,
            settle_ms: 2_000,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            fetch: FetchSettings::default(),
            browser: BrowserSettings::default(),
            error_history: 20,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(host) = non_empty(lookup("WEBSOURCE_HOST")) {
            cfg.host = host;
        }
        cfg.port = parsed(&lookup, "WEBSOURCE_PORT", cfg.port);
        cfg.error_history = parsed(&lookup, "WEBSOURCE_ERROR_HISTORY", cfg.error_history).max(1);

        let fetch = &mut cfg.fetch;
        fetch.request_timeout_ms =
            parsed(&lookup, "WEBSOURCE_TIMEOUT_MS", fetch.request_timeout_ms);
        fetch.min_content_length =
            parsed(&lookup, "WEBSOURCE_MIN_LENGTH", fetch.min_content_length);
        fetch.pace_ms = parsed(&lookup, "WEBSOURCE_PACE_MS", fetch.pace_ms);
        if let Some(base) = lookup("WEBSOURCE_ARCHIVE_BASE") {
            fetch.archive_base = non_empty(Some(base));
        }
        if let Some(raw) = lookup("WEBSOURCE_REPLAY_COOKIES") {
            fetch.replay_cookies = parse_cookie_list(&raw);
        }

        let browser = &mut cfg.browser;
        browser.enabled = flag(&lookup, "WEBSOURCE_BROWSER", browser.enabled);
        browser.eager = flag(&lookup, "WEBSOURCE_BROWSER_EAGER", browser.eager);
        browser.remote_endpoint = non_empty(lookup("WEBSOURCE_BROWSER_WS"));
        browser.chromium_path = non_empty(lookup("WEBSOURCE_CHROMIUM_PATH")).map(PathBuf::from);
        browser.settle_ms = parsed(&lookup, "WEBSOURCE_SETTLE_MS", browser.settle_ms);
        browser.navigation_timeout_ms =
            parsed(&lookup, "WEBSOURCE_NAV_TIMEOUT_MS", browser.navigation_timeout_ms);

        cfg
    }

    /// Socket address string for the REST listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse `name=value; name2=value2` into cookie pairs, skipping malformed entries.
pub fn parse_cookie_list(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup(key)) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("ignoring malformed {key}={raw:?}");
            default
        }),
        None => default,
    }
}

fn flag<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup(key)).map(|v| v.to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        Some(v) => {
            warn!("ignoring malformed {key}={v:?}");
            default
        }
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let cfg = ServiceConfig::from_lookup(|_| None);
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.fetch.min_content_length, 100);
        assert_eq!(cfg.fetch.archive_base.as_deref(), Some(DEFAULT_ARCHIVE_BASE));
        assert!(cfg.browser.enabled);
        assert!(cfg.fetch.replay_cookies.is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let cfg = ServiceConfig::from_lookup(lookup_from(&[
            ("WEBSOURCE_PORT", "9100"),
            ("WEBSOURCE_MIN_LENGTH", "50"),
            ("WEBSOURCE_ARCHIVE_BASE", ""),
            ("WEBSOURCE_BROWSER", "off"),
            ("WEBSOURCE_BROWSER_WS", "ws://127.0.0.1:9222/devtools/browser/abc"),
        ]));
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.fetch.min_content_length, 50);
        assert!(cfg.fetch.archive_base.is_none());
        assert!(!cfg.browser.enabled);
        assert_eq!(
            cfg.browser.remote_endpoint.as_deref(),
            Some("ws://127.0.0.1:9222/devtools/browser/abc")
        );
    }

    #[test]
    fn test_malformed_number_falls_back() {
        let cfg = ServiceConfig::from_lookup(lookup_from(&[("WEBSOURCE_PORT", "eighty")]));
        assert_eq!(cfg.port, 8000);
    }

    #[test]
    fn test_error_history_at_least_one() {
        let cfg = ServiceConfig::from_lookup(lookup_from(&[("WEBSOURCE_ERROR_HISTORY", "0")]));
        assert_eq!(cfg.error_history, 1);
    }

    #[test]
    fn test_parse_cookie_list() {
        let cookies = parse_cookie_list("__test=abc123; theme = dark ;broken; =x");
        assert_eq!(
            cookies,
            vec![
                ("__test".to_string(), "abc123".to_string()),
                ("theme".to_string(), "dark".to_string()),
            ]
        );
    }
}
