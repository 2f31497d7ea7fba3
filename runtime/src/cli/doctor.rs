//! Environment readiness check.

use crate::acquisition::strategy::StrategyCatalog;
use crate::config::ServiceConfig;
use crate::renderer::chromium::find_chromium;
use anyhow::Result;

/// Report Chromium availability, the listen address and the active ladder.
pub async fn run(cfg: &ServiceConfig) -> Result<()> {
    println!("WebSource Doctor");
    println!("================");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("OS:      {} ({})", std::env::consts::OS, std::env::consts::ARCH);
    println!();

    let browser_ok = check_browser(cfg);
    let bind_ok = check_bind(cfg);

    let catalog = StrategyCatalog::standard(&cfg.fetch, cfg.browser.enabled);
    println!("[OK] {} strategies: {}", catalog.len(), catalog.labels().join(", "));
    match &cfg.fetch.archive_base {
        Some(base) => println!("[OK] Archive proxy: {base}"),
        None => println!("[--] Archive proxy disabled"),
    }
    if cfg.fetch.replay_cookies.is_empty() {
        println!("[--] No replay cookies configured");
    } else {
        println!("[OK] {} replay cookie(s) configured", cfg.fetch.replay_cookies.len());
    }

    println!();
    match (bind_ok, browser_ok) {
        (true, true) => println!("Status: READY"),
        (true, false) => {
            println!("Status: READY (HTTP strategies only)");
            println!("  Set WEBSOURCE_CHROMIUM_PATH or install Chrome to enable the browser fallback.");
        }
        (false, _) => println!("Status: NOT READY"),
    }

    Ok(())
}

fn check_browser(cfg: &ServiceConfig) -> bool {
    if !cfg.browser.enabled {
        println!("[--] Browser strategy disabled (WEBSOURCE_BROWSER=0)");
        return false;
    }
    if let Some(endpoint) = &cfg.browser.remote_endpoint {
        println!("[OK] Remote browser endpoint: {endpoint}");
        return true;
    }
    match find_chromium(cfg.browser.chromium_path.as_deref()) {
        Some(path) => {
            println!("[OK] Chromium found: {}", path.display());
            true
        }
        None => {
            println!("[!!] Chromium NOT found");
            false
        }
    }
}

fn check_bind(cfg: &ServiceConfig) -> bool {
    let addr = cfg.bind_addr();
    match std::net::TcpListener::bind(&addr) {
        Ok(_) => {
            println!("[OK] {addr} is free");
            true
        }
        Err(e) => {
            println!("[!!] Cannot bind {addr}: {e}");
            false
        }
    }
}
