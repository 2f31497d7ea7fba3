//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide), and the
//! [`BrowserSlot`] that owns the process-wide browser lifecycle.

pub mod chromium;

use crate::config::BrowserSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A fully rendered document.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub final_url: String,
    pub html: String,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
    /// Whether pages can actually be rendered.
    fn is_available(&self) -> bool {
        true
    }
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Get the full page HTML.
    async fn get_html(&self) -> Result<String>;
    /// Get the current URL.
    async fn get_url(&self) -> Result<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A no-op renderer used when Chromium is unavailable.
///
/// Keeps the browser strategy in the ladder as a negative attempt, so
/// every HTTP strategy still works without a browser.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        Err(anyhow::anyhow!("Browser not available (HTTP-only mode)"))
    }
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
    fn is_available(&self) -> bool {
        false
    }
}

/// Callback that brings up a renderer.
type Launcher = Box<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn Renderer>>> + Send + Sync>;

/// Process-lifetime owner of the browser.
///
/// Initialization goes through one `OnceCell` barrier: concurrent first
/// callers wait for the same launch instead of racing to start several
/// browsers. A failed launch leaves a [`NoopRenderer`] in the slot.
pub struct BrowserSlot {
    settings: BrowserSettings,
    launcher: Launcher,
    renderer: OnceCell<Arc<dyn Renderer>>,
    launch_error: std::sync::Mutex<Option<String>>,
    launch_error_reported: AtomicBool,
}

impl BrowserSlot {
    /// Slot backed by Chromium (remote endpoint or local binary).
    pub fn chromium(settings: BrowserSettings) -> Self {
        let launch_settings = settings.clone();
        Self::with_launcher(settings, move || {
            let s = launch_settings.clone();
            async move {
                let renderer = chromium::ChromiumRenderer::from_settings(&s).await?;
                Ok(Arc::new(renderer) as Arc<dyn Renderer>)
            }
        })
    }

    /// Slot with a custom launcher.
    pub fn with_launcher<F, Fut>(settings: BrowserSettings, launch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn Renderer>>> + Send + 'static,
    {
        Self {
            settings,
            launcher: Box::new(move || launch().boxed()),
            renderer: OnceCell::new(),
            launch_error: std::sync::Mutex::new(None),
            launch_error_reported: AtomicBool::new(false),
        }
    }

    /// Startup hook: launch now when eager, otherwise defer to first use.
    pub async fn start(&self) {
        if self.settings.eager {
            let renderer = self.renderer().await;
            if renderer.is_available() {
                info!("browser ready");
            }
        }
    }

    /// The renderer, launching it on first call.
    pub async fn renderer(&self) -> Arc<dyn Renderer> {
        let renderer = self
            .renderer
            .get_or_init(|| async {
                match (self.launcher)().await {
                    Ok(renderer) => {
                        info!("headless browser initialized");
                        renderer
                    }
                    Err(e) => {
                        warn!("headless browser unavailable: {e:#}");
                        if let Ok(mut slot) = self.launch_error.lock() {
                            *slot = Some(format!("{e:#}"));
                        }
                        Arc::new(NoopRenderer) as Arc<dyn Renderer>
                    }
                }
            })
            .await;
        Arc::clone(renderer)
    }

    /// Whether the browser has been initialized and is usable.
    pub fn is_ready(&self) -> bool {
        self.renderer
            .get()
            .map(|r| r.is_available())
            .unwrap_or(false)
    }

    /// Whether initialization has been attempted.
    pub fn is_initialized(&self) -> bool {
        self.renderer.initialized()
    }

    /// Error from the last launch attempt, if it failed.
    pub fn launch_error(&self) -> Option<String> {
        self.launch_error.lock().ok().and_then(|e| e.clone())
    }

    /// The launch error, returned only to the first caller that asks.
    pub fn take_unreported_launch_error(&self) -> Option<String> {
        let error = self.launch_error()?;
        if self.launch_error_reported.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(error)
    }

    /// Render a page: navigate, wait for the load plus the settle delay,
    /// then read the document.
    pub async fn render(&self, url: &str) -> Result<RenderedPage> {
        let renderer = self.renderer().await;
        let mut ctx = renderer.new_context().await?;

        let outcome = async {
            let nav = ctx
                .navigate(url, self.settings.navigation_timeout_ms)
                .await?;
            tokio::time::sleep(Duration::from_millis(self.settings.settle_ms)).await;
            let html = ctx.get_html().await.context("failed to read rendered document")?;
            let final_url = ctx.get_url().await.unwrap_or(nav.final_url);
            Ok::<_, anyhow::Error>(RenderedPage { final_url, html })
        }
        .await;

        let _ = ctx.close().await;
        outcome
    }

    /// Shutdown hook, called once the HTTP server has drained.
    pub async fn shutdown(&self) {
        if let Some(renderer) = self.renderer.get() {
            if let Err(e) = renderer.shutdown().await {
                warn!("browser shutdown failed: {e:#}");
            }
        }
    }
}
