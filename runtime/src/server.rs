// Copyright 2026 WebSource Contributors
// SPDX-License-Identifier: Apache-2.0

//! Process lifecycle for the REST service.
//!
//! Builds the shared state once, owns the browser slot and the HTTP
//! client for the whole process, and tears the browser down after the
//! listener has drained.

use crate::acquisition::http_client::HttpClient;
use crate::acquisition::orchestrator::Orchestrator;
use crate::acquisition::strategy::StrategyCatalog;
use crate::acquisition::validity::ContentValidator;
use crate::config::ServiceConfig;
use crate::history::ErrorHistory;
use crate::renderer::BrowserSlot;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::info;

/// State shared by every request handler.
pub struct AppState {
    pub started_at: Instant,
    pub orchestrator: Orchestrator,
    pub browser: Option<Arc<BrowserSlot>>,
    pub errors: ErrorHistory,
}

impl AppState {
    /// Wire the orchestrator, client and browser slot from configuration.
    pub fn from_config(cfg: &ServiceConfig) -> Result<Self> {
        let client = HttpClient::new(cfg.fetch.request_timeout_ms)?;
        let browser = cfg
            .browser
            .enabled
            .then(|| Arc::new(BrowserSlot::chromium(cfg.browser.clone())));
        let catalog = StrategyCatalog::standard(&cfg.fetch, browser.is_some());

        let mut orchestrator = Orchestrator::new(
            client,
            catalog,
            ContentValidator::new(cfg.fetch.min_content_length),
        )
        .with_pace(Duration::from_millis(cfg.fetch.pace_ms));
        if let Some(slot) = &browser {
            orchestrator = orchestrator.with_browser(Arc::clone(slot));
        }

        Ok(Self::new(orchestrator, browser, ErrorHistory::new(cfg.error_history)))
    }

    pub fn new(
        orchestrator: Orchestrator,
        browser: Option<Arc<BrowserSlot>>,
        errors: ErrorHistory,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            orchestrator,
            browser,
            errors,
        }
    }

    /// Startup hook. Launches the browser now if configured as eager.
    pub async fn start(&self) {
        if let Some(slot) = &self.browser {
            slot.start().await;
        }
        self.record_browser_failure("startup", None);
    }

    /// Push a failed browser launch into the error history, once per process.
    pub fn record_browser_failure(&self, request_id: &str, url: Option<&str>) {
        if let Some(e) = self
            .browser
            .as_ref()
            .and_then(|slot| slot.take_unreported_launch_error())
        {
            self.errors.record(request_id, "browser", url, e);
        }
    }

    /// Shutdown hook.
    pub async fn shutdown(&self) {
        if let Some(slot) = &self.browser {
            slot.shutdown().await;
        }
    }
}

/// Serve the REST API until `shutdown` is notified, then stop the browser.
pub async fn serve(cfg: &ServiceConfig, state: Arc<AppState>, shutdown: Arc<Notify>) -> Result<()> {
    state.start().await;

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("REST API listening on http://{}", listener.local_addr()?);

    let app = crate::rest::router(Arc::clone(&state));
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.notified().await })
        .await
        .context("server error");

    info!("listener drained, shutting down browser");
    state.shutdown().await;
    result
}

/// Notify `shutdown` on Ctrl-C or SIGTERM.
pub fn spawn_signal_handler(shutdown: Arc<Notify>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            let _ = tokio::signal::ctrl_c().await;
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(_) => std::future::pending::<()>().await,
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
        info!("received shutdown signal");
        shutdown.notify_one();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_config_without_browser() {
        let mut cfg = ServiceConfig::default();
        cfg.browser.enabled = false;
        cfg.fetch.archive_base = None;
        let state = AppState::from_config(&cfg).unwrap();
        assert!(state.browser.is_none());
        assert!(!state.orchestrator.catalog().labels().contains(&"browser"));
        assert_eq!(state.errors.capacity(), 20);
    }

    #[test]
    fn test_state_from_config_with_browser_is_lazy() {
        let cfg = ServiceConfig::default();
        let state = AppState::from_config(&cfg).unwrap();
        let slot = state.browser.as_ref().unwrap();
        assert!(!slot.is_initialized());
        assert_eq!(state.orchestrator.catalog().labels().last(), Some(&"browser"));
    }
}
