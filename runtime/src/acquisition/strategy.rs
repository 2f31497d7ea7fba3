//! Fetch strategies: descriptors, URL transforms and the standard catalog.
//!
//! A strategy is a fixed combination of URL transform, request headers and
//! cookies. The catalog is an ordered list of descriptors built once at
//! startup; [`StrategyCatalog::plan`] expands it against one target URL.

use crate::config::FetchSettings;
use serde::Serialize;
use std::net::IpAddr;
use url::Url;

/// Googlebot identity.
pub const GOOGLEBOT_UA: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

/// Bingbot identity.
pub const BINGBOT_UA: &str = "Mozilla/5.0 (compatible; bingbot/2.0; +http://www.bing.com/bingbot.htm)";

/// How a candidate request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Plain HTTP GET through the shared client.
    Http,
    /// Rendered by the headless browser.
    Browser,
}

/// Value of an added query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Fixed(String),
    /// Current Unix time in seconds, evaluated when the plan is built.
    Timestamp,
}

/// Transformation from the original URL to a candidate URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlTransform {
    Identity,
    /// Append a query parameter, keeping the existing query.
    AddQuery { key: String, value: QueryValue },
    /// `https://` → `http://`. Not applicable to `http://` URLs.
    HttpDowngrade,
    /// Prefix the path with `/<prefix>` under the given scheme.
    PathPrefix { prefix: String, scheme: String },
    /// Prefix the path with the first host label (`/~label` or `/label`).
    UserPrefix { tilde: bool },
    /// Fetch `<base><original url>` through a third-party proxy.
    Proxy { base: String },
}

impl UrlTransform {
    /// Apply the transform. `None` means the strategy does not apply.
    pub fn apply(&self, url: &Url, now_secs: i64) -> Option<String> {
        match self {
            UrlTransform::Identity => Some(url.to_string()),
            UrlTransform::AddQuery { key, value } => {
                let value = match value {
                    QueryValue::Fixed(v) => v.clone(),
                    QueryValue::Timestamp => now_secs.to_string(),
                };
                let mut candidate = url.clone();
                candidate.query_pairs_mut().append_pair(key, &value);
                Some(candidate.to_string())
            }
            UrlTransform::HttpDowngrade => {
                if url.scheme() != "https" {
                    return None;
                }
                let mut candidate = url.clone();
                candidate.set_scheme("http").ok()?;
                Some(candidate.to_string())
            }
            UrlTransform::PathPrefix { prefix, scheme } => {
                with_path_prefix(url, prefix, Some(scheme))
            }
            UrlTransform::UserPrefix { tilde } => {
                let label = first_host_label(url)?;
                let prefix = if *tilde { format!("~{label}") } else { label };
                with_path_prefix(url, &prefix, None)
            }
            UrlTransform::Proxy { base } => Some(format!("{base}{url}")),
        }
    }
}

/// First label of a multi-label DNS host, e.g. `shop` for `shop.example.com`.
pub fn first_host_label(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    if host.parse::<IpAddr>().is_ok() || host.starts_with('[') {
        return None;
    }
    let (label, rest) = host.split_once('.')?;
    if label.is_empty() || rest.is_empty() {
        return None;
    }
    Some(label.to_ascii_lowercase())
}

fn with_path_prefix(url: &Url, prefix: &str, scheme: Option<&str>) -> Option<String> {
    let mut candidate = url.clone();
    if let Some(scheme) = scheme {
        if candidate.scheme() != scheme {
            candidate.set_scheme(scheme).ok()?;
        }
    }
    let path = url.path();
    let joined = if path.starts_with('/') {
        format!("/{prefix}{path}")
    } else {
        format!("/{prefix}/{path}")
    };
    candidate.set_path(&joined);
    Some(candidate.to_string())
}

/// One entry of the strategy catalog.
#[derive(Debug, Clone)]
pub struct StrategyDescriptor {
    /// Stable identifier reported as `strategy_used`.
    pub label: String,
    pub transform: UrlTransform,
    /// Headers layered over the client's browser header set.
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub channel: Channel,
}

impl StrategyDescriptor {
    pub fn http(label: impl Into<String>, transform: UrlTransform) -> Self {
        Self {
            label: label.into(),
            transform,
            headers: Vec::new(),
            cookies: Vec::new(),
            channel: Channel::Http,
        }
    }

    pub fn browser(label: impl Into<String>) -> Self {
        Self {
            channel: Channel::Browser,
            ..Self::http(label, UrlTransform::Identity)
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_cookies(mut self, cookies: Vec<(String, String)>) -> Self {
        self.cookies = cookies;
        self
    }
}

/// A descriptor applied to a concrete target URL.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub label: String,
    pub url: String,
    pub channel: Channel,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    #[serde(skip)]
    pub cookies: Vec<(String, String)>,
}

impl Candidate {
    /// `Cookie` header value, if the candidate carries cookies.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Ordered, immutable list of strategies.
#[derive(Debug, Clone, Default)]
pub struct StrategyCatalog {
    strategies: Vec<StrategyDescriptor>,
}

impl StrategyCatalog {
    pub fn new(strategies: Vec<StrategyDescriptor>) -> Self {
        Self { strategies }
    }

    /// The standard ladder, shaped by the fetch settings.
    pub fn standard(settings: &FetchSettings, browser_enabled: bool) -> Self {
        let mut s = vec![
            StrategyDescriptor::http("direct", UrlTransform::Identity),
            StrategyDescriptor::http(
                "cache-bust",
                UrlTransform::AddQuery {
                    key: "t".into(),
                    value: QueryValue::Timestamp,
                },
            ),
            StrategyDescriptor::http(
                "nocache",
                UrlTransform::AddQuery {
                    key: "nocache".into(),
                    value: QueryValue::Fixed("1".into()),
                },
            ),
            StrategyDescriptor::http(
                "retry-flag",
                UrlTransform::AddQuery {
                    key: "i".into(),
                    value: QueryValue::Fixed("1".into()),
                },
            ),
            StrategyDescriptor::http("googlebot", UrlTransform::Identity)
                .with_header("User-Agent", GOOGLEBOT_UA),
            StrategyDescriptor::http("bingbot", UrlTransform::Identity)
                .with_header("User-Agent", BINGBOT_UA),
            StrategyDescriptor::http("http-downgrade", UrlTransform::HttpDowngrade),
        ];

        for prefix in &settings.hosting_prefixes {
            for scheme in ["https", "http"] {
                s.push(StrategyDescriptor::http(
                    format!("subdir:{prefix}:{scheme}"),
                    UrlTransform::PathPrefix {
                        prefix: prefix.clone(),
                        scheme: scheme.to_string(),
                    },
                ));
            }
        }

        s.push(StrategyDescriptor::http(
            "user-tilde",
            UrlTransform::UserPrefix { tilde: true },
        ));
        s.push(StrategyDescriptor::http(
            "user-dir",
            UrlTransform::UserPrefix { tilde: false },
        ));

        if !settings.replay_cookies.is_empty() {
            s.push(
                StrategyDescriptor::http("cookie-replay", UrlTransform::Identity)
                    .with_cookies(settings.replay_cookies.clone()),
            );
        }

        if let Some(base) = &settings.archive_base {
            s.push(StrategyDescriptor::http(
                "archive",
                UrlTransform::Proxy { base: base.clone() },
            ));
        }

        if browser_enabled {
            s.push(StrategyDescriptor::browser("browser"));
        }

        Self::new(s)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Expand the catalog against a target, dropping inapplicable strategies.
    pub fn plan(&self, url: &Url) -> Vec<Candidate> {
        self.plan_at(url, chrono::Utc::now().timestamp())
    }

    pub fn plan_at(&self, url: &Url, now_secs: i64) -> Vec<Candidate> {
        self.strategies
            .iter()
            .filter_map(|s| {
                let candidate_url = s.transform.apply(url, now_secs)?;
                Some(Candidate {
                    label: s.label.clone(),
                    url: candidate_url,
                    channel: s.channel,
                    headers: s.headers.clone(),
                    cookies: s.cookies.clone(),
                })
            })
            .collect()
    }
}
