//! `websource plan <url>`: print the candidate ladder without touching the network.

use crate::acquisition::orchestrator::normalize_url;
use crate::acquisition::strategy::{Channel, StrategyCatalog};
use crate::config::ServiceConfig;
use anyhow::Result;

pub fn run(cfg: &ServiceConfig, url: &str, json: bool) -> Result<()> {
    let target = normalize_url(url)?;
    let catalog = StrategyCatalog::standard(&cfg.fetch, cfg.browser.enabled);
    let plan = catalog.plan(&target);

    if json {
        return super::print_json(&plan);
    }

    println!("Plan for {target} ({} of {} strategies apply)", plan.len(), catalog.len());
    println!();
    for (i, candidate) in plan.iter().enumerate() {
        let via = match candidate.channel {
            Channel::Http => "",
            Channel::Browser => " [browser]",
        };
        println!("  {:>2}. {:<22} {}{via}", i + 1, candidate.label, candidate.url);
    }
    Ok(())
}
