//! herakles-plugin-agent - version 0.1.0
//!
//! Plugin-based metrics collection agent with tracing logging.
//! This is the main entry point that initializes the plugin manager, the
//! HTTP server and handles subcommands.

mod cli;
mod commands;
mod handlers;
mod state;

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use prometheus::Registry;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::{net::TcpListener, signal};
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;

use herakles_plugin_agent::config::{
    validate_effective_config, Config, DEFAULT_BIND_ADDR, DEFAULT_LOG_FILE, DEFAULT_PORT,
};
use herakles_plugin_agent::{AgentMetrics, PluginManager};

use cli::{resolve_config, show_config, Args, Commands};
use commands::{command_config, command_plugins, command_test};
use state::{AppState, SharedState};

/// Maps the configured level name to a filter; unknown names fall back to info.
fn level_filter(level: &str) -> LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "off" => LevelFilter::OFF,
        "error" => LevelFilter::ERROR,
        "warn" | "warning" => LevelFilter::WARN,
        "debug" => LevelFilter::DEBUG,
        "trace" => LevelFilter::TRACE,
        _ => LevelFilter::INFO,
    }
}

/// Initializes tracing logging subsystem with configured level and output.
fn setup_logging(config: &Config) {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level_filter(&config.log.level))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    let mut fallback_reason = None;
    let result = if config.log.output == "file" {
        let path = config
            .log
            .file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => tracing::subscriber::set_global_default(
                builder.with_ansi(false).with_writer(Mutex::new(file)).finish(),
            ),
            Err(e) => {
                fallback_reason = Some(format!("{}: {}", path.display(), e));
                tracing::subscriber::set_global_default(builder.finish())
            }
        }
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    if let Some(reason) = fallback_reason {
        warn!("Cannot open log file {}, logging to stdout", reason);
    }
    info!(
        "Logging initialized with level: {} (output: {})",
        config.log.level, config.log.output
    );
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

        return show_config(&config, args.config_format);
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        if let Commands::Config { output, format } = command {
            return command_config(output.clone(), *format);
        }

        let config = load_validated_config(&args)?;

        return match command {
            Commands::Test {
                iterations,
                verbose,
            } => command_test(*iterations, *verbose, &config).await,
            Commands::Plugins => command_plugins(&config),
            Commands::Config { .. } => Ok(()),
        };
    }

    // Load configuration for main server mode
    let config = load_validated_config(&args)?;

    setup_logging(&config);

    info!("Starting herakles-plugin-agent");

    let bind_ip_str = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR).to_string();
    let port = config.port.unwrap_or(DEFAULT_PORT);
    let config = Arc::new(config);

    // Initialize Prometheus metrics registry
    let registry = Registry::new();
    let metrics = AgentMetrics::new(&registry)?;
    debug!("All metrics registered successfully");

    let mut manager = PluginManager::new(Arc::clone(&config), metrics.clone());
    manager.register_plugins()?;
    info!(
        "Registered plugins: {} (sinks: {})",
        manager.plugin_names().join(", "),
        manager.reporter().len()
    );
    if manager.reporter().is_empty() {
        warn!("No sinks configured, collected data is only kept locally");
    }

    let manager = Arc::new(manager);
    manager.start_plugins();

    let state: SharedState = Arc::new(AppState {
        registry,
        metrics,
        manager: Arc::clone(&manager),
        config: Arc::clone(&config),
        start_time: Instant::now(),
    });

    // Configure HTTP server routes
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port).parse()?;

    let app = handlers::router(state);

    let served: Result<(), Box<dyn std::error::Error>> = if config.enable_tls.unwrap_or(false) {
        // Presence of both paths is checked by validate_effective_config()
        let (Some(cert_path), Some(key_path)) =
            (config.tls_cert_path.as_ref(), config.tls_key_path.as_ref())
        else {
            return Err("TLS is enabled but certificate or key path is missing".into());
        };

        info!("Loading TLS certificate from: {}", cert_path);
        info!("Loading TLS private key from: {}", key_path);

        let tls_config = RustlsConfig::from_pem_file(cert_path, key_path)
            .await
            .map_err(|e| {
                error!("Failed to load TLS configuration: {}", e);
                e
            })?;

        info!(
            "herakles-plugin-agent listening on https://{}:{}",
            bind_ip_str, port
        );

        let server = axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service());

        tokio::select! {
            result = server => result.map_err(Into::into),
            _ = shutdown_signal() => {
                info!("Shutdown signal received, stopping plugins...");
                Ok(())
            }
        }
    } else {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "herakles-plugin-agent listening on http://{}:{}",
            bind_ip_str, port
        );

        let server = axum::serve(listener, app);

        tokio::select! {
            result = server => result.map_err(Into::into),
            _ = shutdown_signal() => {
                info!("Shutdown signal received, stopping plugins...");
                Ok(())
            }
        }
    };

    if let Err(e) = &served {
        error!("Server error: {}", e);
    }

    manager.stop_plugins().await;

    info!("herakles-plugin-agent stopped gracefully");
    served
}
