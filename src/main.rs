// nvsmi-watch - version 0.1.0
// Terminal watcher for NVIDIA GPU power and compute processes
use anyhow::{Context, Result};
use clap::Parser;
use nvsmi_watch::{CommandRunner, Scheduler, SmiQuery};
use std::io;
use tokio::signal;
use tracing::{debug, error, info};
use tracing_subscriber::filter::LevelFilter;

mod cli;
mod commands;
mod config;

use cli::{Args, Commands};
use config::{resolve_config, show_config, validate_effective_config, Config};

/// Initializes tracing logging subsystem with configured log level.
/// Logs go to stderr; stdout carries the report.
fn setup_logging(config: &Config) -> Result<()> {
    let level = config
        .log_level()
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::WARN);

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    debug!("Logging initialized with level: {}", level);
    Ok(())
}

/// Resolves once SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// -------------------------------------------------------------------
/// MAIN APPLICATION ENTRY POINT
/// -------------------------------------------------------------------
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    // Config inspection modes exit before anything is started
    if args.check_config {
        if let Err(e) = validate_effective_config(&config) {
            eprintln!("❌ Configuration invalid: {e:#}");
            std::process::exit(1);
        }
        println!("✅ Configuration is valid");
        return Ok(());
    }

    if args.show_config {
        return show_config(&config, args.config_format);
    }

    // `check` reports an invalid config as one of its own findings.
    if validates_before_dispatch(&args) {
        validate_effective_config(&config).context("Configuration invalid")?;
    }

    setup_logging(&config)?;

    // Handle subcommands
    if let Some(command) = &args.command {
        return match command {
            Commands::Check => commands::command_check(&config).await,
            Commands::Config {
                output,
                format,
                commented,
            } => commands::command_config(output.clone(), *format, *commented),
            Commands::Test {
                iterations,
                verbose,
            } => commands::command_test(*iterations, *verbose, &config).await,
            Commands::Devices => commands::command_devices(&config).await,
        };
    }

    info!("Starting nvsmi-watch using {}", config.smi_path());

    let query = SmiQuery::new(CommandRunner::new(config.smi_path()));
    let mut scheduler = Scheduler::new(query, config.watch_settings()?, io::stdout());
    let list_devices = config.list_devices_on_start.unwrap_or(true);

    match scheduler.run_until(list_devices, shutdown_signal()).await {
        Ok(_) => {
            info!("nvsmi-watch stopped gracefully");
            Ok(())
        }
        Err(e) => {
            error!("Watch loop stopped: {}", e);
            Err(e.into())
        }
    }
}

/// Everything but `check` refuses to start on an invalid config.
fn validates_before_dispatch(args: &Args) -> bool {
    !matches!(args.command, Some(Commands::Check))
}
