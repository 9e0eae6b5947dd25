// pitchlink — session relay server for paired game displays and controllers
//
// A host display registers a session, a phone controller joins it, and the
// server relays kicks one way and score events the other.

mod config;
mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "pitchlink")]
#[command(about = "pitchlink — host/controller session relay", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Start {
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
        #[arg(short, long)]
        bind: Option<IpAddr>,
        /// Emit logs as JSON lines
        #[arg(long)]
        log_json: bool,
    },
    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Set { key: String, value: String },
    Get { key: String },
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            port,
            bind,
            log_json,
        } => cmd_start(cli.config, port, bind, log_json).await,
        Commands::Config { action } => {
            let _guard = init_logging("warn", false, None)?;
            cmd_config(cli.config, action)
        }
    }
}

/// Install the global subscriber; keep the guard alive to flush file logs
fn init_logging(
    default_level: &str,
    json: bool,
    log_dir: Option<&str>,
) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "pitchlink.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stdout_layer = if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

async fn cmd_start(
    config_path: Option<PathBuf>,
    port: Option<u16>,
    bind: Option<IpAddr>,
    log_json: bool,
) -> Result<()> {
    let mut config = config::ServerConfig::load(config_path.as_deref())?;
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(bind) = bind {
        config.bind_address = bind;
    }
    config.log_json |= log_json;

    let _guard = init_logging("info", config.log_json, config.log_dir.as_deref())?;

    println!("{}", "pitchlink — Starting...".bold());
    println!("  {} Listening on {}", "✓".green(), config.listen_addr().to_string().bright_cyan());
    println!("  {} WebSocket endpoint /ws, status at /status", "✓".green());
    println!();

    let state = Arc::new(server::ServerState::new(&config));

    tokio::select! {
        _ = server::serve(&config, Arc::clone(&state)) => {
            tracing::warn!("Server task ended");
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            tracing::info!(
                "Shutting down with {} open sessions",
                state.relay.session_count()
            );
        }
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    let path = config_path.as_deref();
    let mut config = config::ServerConfig::load(path)?;

    match action {
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save(path)?;
            println!("{} {} = {}", "✓".green(), key.bright_cyan(), value);
        }
        ConfigAction::Get { key } => match config.get(&key) {
            Some(value) => println!("{}", value),
            None => println!("{} {} is not set", "✗".red(), key),
        },
        ConfigAction::List => {
            println!("{}", "Configuration".bold());
            for (key, value) in config.list() {
                println!("  {:<20} {}", key.bright_cyan(), value);
            }
        }
    }

    Ok(())
}
