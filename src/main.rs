//! Main-page gateway: server entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI args
//!   3. Load config
//!   4. Resolve effective log level (CLI `-v` flags > config/env)
//!   5. Init logger once
//!   6. Load translation bundles (missing bundle is fatal)
//!   7. Spawn Ctrl-C → shutdown signal watcher
//!   8. Serve until shutdown

use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use mainpage_gateway::config;
use mainpage_gateway::error::AppError;
use mainpage_gateway::gateway::{self, GatewayState};
use mainpage_gateway::locale::messages::Catalog;
use mainpage_gateway::logger;

/// Locale-aware front-end gateway.
#[derive(Debug, Parser)]
#[command(name = "mainpage-gateway", version)]
struct Cli {
    /// Path to configuration file (default: $GATEWAY_CONFIG or config/default.toml)
    #[arg(short = 'f', long = "config")]
    config: Option<PathBuf>,

    /// Override the bind address
    #[arg(long, env = "GATEWAY_BIND")]
    bind: Option<String>,

    /// Increase logging verbosity (-v warn, -vv info, -vvv debug, -vvvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn log_level(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("warn"),
            2 => Some("info"),
            3 => Some("debug"),
            _ => Some("trace"),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = config::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind.clone() {
        config.bind = bind;
    }

    let effective_log_level = cli.log_level().unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, true, config.log_file.as_deref())?;

    info!(
        name = %config.name,
        bind = %config.bind,
        log_level = %effective_log_level,
        default_locale = %config.locales.set.default_locale(),
        api_base_url = %config.auth.api_base_url,
        "config loaded"
    );

    let catalog = Catalog::load(&config.locales.messages_dir, &config.locales.set)?;
    let state = GatewayState::from_config(&config, catalog)?;

    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            ctrlc_token.cancel();
        }
    });

    gateway::serve(&config.bind, state, shutdown).await
}
