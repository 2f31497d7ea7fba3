// Copyright 2026 WebSource Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use websource_runtime::cli;
use websource_runtime::cli::serve::ServeOverrides;
use websource_runtime::config::ServiceConfig;

#[derive(Parser)]
#[command(
    name = "websource",
    about = "WebSource: recover a page's HTML through an ordered ladder of fetch strategies",
    version,
    after_help = "Run 'websource <command> --help' for details on each command.\nRun 'websource' with no command to start the REST API."
)]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the REST API
    Serve {
        /// Address to bind (overrides WEBSOURCE_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides WEBSOURCE_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Leave the headless browser out of the ladder
        #[arg(long)]
        no_browser: bool,
        /// Launch the browser at startup instead of on first use
        #[arg(long, conflicts_with = "no_browser")]
        eager_browser: bool,
    },
    /// Fetch one page through the strategy ladder
    Fetch {
        /// Target URL (scheme defaults to https)
        url: String,
        /// Write the page to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Omit the metadata comment
        #[arg(long)]
        raw: bool,
        /// Print the attempt log as JSON
        #[arg(long)]
        json: bool,
        /// Leave the headless browser out of the ladder
        #[arg(long)]
        no_browser: bool,
    },
    /// Issue a single request and describe the response
    Debug {
        /// Target URL
        url: String,
    },
    /// Show the candidate URLs the ladder would try
    Plan {
        /// Target URL
        url: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    let mut cfg = ServiceConfig::from_env();

    let result = match cli.command {
        None => cli::serve::run(cfg).await,
        Some(Commands::Serve {
            host,
            port,
            no_browser,
            eager_browser,
        }) => {
            ServeOverrides {
                host,
                port,
                no_browser,
                eager_browser,
            }
            .apply(&mut cfg);
            cli::serve::run(cfg).await
        }
        Some(Commands::Fetch {
            url,
            output,
            raw,
            json,
            no_browser,
        }) => {
            if no_browser {
                cfg.browser.enabled = false;
            }
            cli::fetch_cmd::run(&cfg, &url, output.as_deref(), raw, json).await
        }
        Some(Commands::Debug { url }) => cli::debug_cmd::run(&cfg, &url).await,
        Some(Commands::Plan { url, json }) => cli::plan_cmd::run(&cfg, &url, json),
        Some(Commands::Doctor) => cli::doctor::run(&cfg).await,
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "websource", &mut std::io::stdout());
            Ok(())
        }
    };

    // 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}
