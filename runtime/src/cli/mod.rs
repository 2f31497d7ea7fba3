//! CLI subcommand implementations for the `websource` binary.

pub mod debug_cmd;
pub mod doctor;
pub mod fetch_cmd;
pub mod plan_cmd;
pub mod serve;

use anyhow::Result;
use serde::Serialize;

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
