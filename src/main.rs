//! phonebot operator CLI
//!
//! `check` probes the configuration, `dial` exercises the token/directory/
//! bridge chain directly for smoke-testing a deployment. Event handling
//! itself lives in the library and is driven by the hosting runtime.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use phonebot::{auth, directory::DirectoryClient, dispatch, phone, Config};

#[derive(Parser)]
#[command(name = "phonebot")]
#[command(about = "Bridge two chat participants over a phone call", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "phonebot.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the configuration
    Check,

    /// Place a call between two directory users, bypassing the chat platform
    Dial {
        /// Tenant to authenticate against
        #[arg(short, long)]
        tenant: String,

        /// Directory id of the caller
        caller: String,

        /// Directory id of the callee
        callee: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Check => {
            Config::load(&cli.config)?;
            println!("Configuration OK: {}", cli.config.display());
        }
        Commands::Dial {
            tenant,
            caller,
            callee,
        } => {
            let config = Config::load(&cli.config)?;
            dial(&config, &tenant, &caller, &callee).await?;
        }
    }

    Ok(())
}

/// Run the pipeline tail once: token, two lookups, normalize, dispatch.
async fn dial(config: &Config, tenant: &str, caller: &str, callee: &str) -> Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling");
            ctrl_c.cancel();
        }
    });

    let token = auth::acquire_app_token(tenant, config, &cancel)
        .await
        .context("Token acquisition failed")?;
    if token.is_empty() {
        bail!("Identity provider returned an empty token");
    }

    let directory = DirectoryClient::new(config, &token.token);
    let caller_phone = directory
        .get_phone(caller, &cancel)
        .await?
        .with_context(|| format!("No phone number on record for {}", caller))?;
    let callee_phone = directory
        .get_phone(callee, &cancel)
        .await?
        .with_context(|| format!("No phone number on record for {}", callee))?;

    let from = phone::normalize(&caller_phone);
    let to = phone::normalize(&callee_phone);
    tracing::info!("dialing {} -> {}", from, to);

    dispatch::place_call(config, &from, &to, &cancel).await?;
    println!("Call placed: {} -> {}", from, to);

    Ok(())
}
