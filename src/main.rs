//! slurm-rest-exporter
//!
//! Prometheus exporter for Slurm clusters backed by slurmrestd.
//! This is the main entry point that initializes the server and handles subcommands.

mod cli;
mod commands;
mod config;
mod handlers;
mod state;

use axum::{routing::get, Router};
use clap::Parser;
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;
use tokio::{net::TcpListener, signal, sync::Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};

use slurm_rest_exporter::health_stats::HealthStats;
use slurm_rest_exporter::metrics::SlurmMetrics;
use slurm_rest_exporter::transport::SlurmClient;

use cli::{Args, Commands, LogLevel};
use commands::{command_check, command_config, command_test};
use config::{resolve_config, show_config, validate_effective_config, Config};
use handlers::{config_handler, health_handler, metrics_handler, root_handler};
use state::{AppState, SharedState};

/// `SLURM_EXPORTER_DEBUG` forces debug logging when set to a truthy value.
fn debug_from_env() -> bool {
    std::env::var("SLURM_EXPORTER_DEBUG")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(args: &Args) {
    let log_level = if debug_from_env() {
        Some(Level::DEBUG)
    } else {
        match args.log_level {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    };
    let Some(log_level) = log_level else {
        return;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    info!("Logging initialized with level: {}", log_level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Resolves once SIGINT or SIGTERM is received.
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

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format.clone());
    }

    if let Some(command) = &args.command {
        return match command {
            Commands::Config {
                output,
                format,
                commented,
            } => command_config(output.clone(), format.clone(), *commented),

            Commands::Check => {
                setup_logging(&args);
                let config = resolve_config(&args)?;
                if let Err(e) = command_check(&config).await {
                    eprintln!("\n❌ {}", e);
                    std::process::exit(1);
                }
                Ok(())
            }

            Commands::Test {
                iterations,
                verbose,
            } => {
                setup_logging(&args);
                let config = load_validated_config(&args)?;
                Ok(command_test(*iterations, *verbose, &config).await?)
            }
        };
    }

    setup_logging(&args);
    let config = load_validated_config(&args)?;
    info!("Starting slurm-rest-exporter");

    let settings = config.client_settings();
    let scrape_options = config.scrape_options();
    let client = SlurmClient::new(&settings)?;
    info!(
        "Using slurmrestd at {} (API {}, Slurm {})",
        settings.api_url,
        scrape_options.api_version,
        scrape_options.api_version.slurm_release()
    );
    if scrape_options.enable_gpus {
        info!("GPU accounting enabled");
    }

    let registry = Registry::new();
    let metrics = SlurmMetrics::new(&registry, scrape_options.enable_gpus)?;

    let addr = config.listen_addr()?;
    let shutdown = CancellationToken::new();
    let state: SharedState = Arc::new(AppState {
        registry,
        metrics,
        config: Arc::new(config),
        scrape_options,
        fetcher: Arc::new(client),
        scrape_lock: Mutex::new(()),
        health_stats: Arc::new(HealthStats::new()),
        shutdown: shutdown.clone(),
        start_time: Instant::now(),
    });

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/config", get(config_handler))
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    info!("slurm-rest-exporter listening on http://{}", addr);

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e.into());
            }
        }
        _ = shutdown_signal() => {
            shutdown.cancel();
            warn!("Shutdown signal received, in-flight scrapes cancelled");
        }
    }

    info!("slurm-rest-exporter stopped gracefully");
    Ok(())
}
