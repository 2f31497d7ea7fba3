//! `websource serve`: run the REST API in the foreground.

use crate::config::ServiceConfig;
use crate::server::{self, AppState};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

/// Flags that override the environment for one run.
#[derive(Debug, Clone, Default)]
pub struct ServeOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub no_browser: bool,
    pub eager_browser: bool,
}

impl ServeOverrides {
    pub fn apply(self, cfg: &mut ServiceConfig) {
        if let Some(host) = self.host {
            cfg.host = host;
        }
        if let Some(port) = self.port {
            cfg.port = port;
        }
        if self.no_browser {
            cfg.browser.enabled = false;
        }
        if self.eager_browser {
            cfg.browser.eager = true;
        }
    }
}

/// Build shared state and serve until Ctrl-C or SIGTERM.
pub async fn run(cfg: ServiceConfig) -> Result<()> {
    info!("starting WebSource v{}", env!("CARGO_PKG_VERSION"));
    info!(
        archive = cfg.fetch.archive_base.is_some(),
        cookie_replay = !cfg.fetch.replay_cookies.is_empty(),
        browser = cfg.browser.enabled,
        "fetch ladder configured"
    );

    let state = Arc::new(AppState::from_config(&cfg).context("failed to initialize service")?);
    let shutdown = Arc::new(Notify::new());
    server::spawn_signal_handler(Arc::clone(&shutdown));

    server::serve(&cfg, state, shutdown).await?;
    info!("WebSource stopped");
    Ok(())
}
