//! Users service entry point.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use users_service::api::{create_router, AppState};
use users_service::config::Config;
use users_service::db::{PgUserStore, PoolManager, PoolSettings, UserStore};
use users_service::metrics;
use users_service::utils::shutdown_signal;
use users_service::{Result as ServiceResult, ServiceError};

/// Users CRUD service.
#[derive(Parser, Debug)]
#[command(name = "users-service")]
#[command(about = "HTTP CRUD service for the users table")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON log lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// Bind address, overrides HOST.
        #[arg(long)]
        host: Option<String>,

        /// Listen port, overrides PORT.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Check database connectivity.
    CheckDb,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration (also reads .env)
    let config = Config::load();

    // Initialize logging
    let (log_level, log_json) = match &config {
        Ok(c) => (c.rust_log.clone(), c.log_json || args.json_logs),
        Err(_) => ("info".to_string(), args.json_logs),
    };
    init_logging(&log_level, log_json, args.verbose);

    let config = config.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        ServiceError::from(e)
    })?;

    // Handle subcommands
    match args.command {
        Some(Command::Serve { host, port }) => cmd_serve(config, host, port).await,
        Some(Command::CheckConfig) => cmd_check_config(&config),
        Some(Command::CheckDb) => Ok(cmd_check_db(&config).await?),
        None => cmd_serve(config, None, None).await,
    }
}

fn init_logging(log_level: &str, json: bool, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("users_service=debug,info")
    } else {
        EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let (json_layer, plain_layer) = if json {
        (Some(fmt::layer().json()), None)
    } else {
        (None, Some(fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .init();
}

/// Check configuration validity.
fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("USERS SERVICE - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Listen Address: {}", config.bind_addr());
    println!("  Database: {}", config.redacted_dsn());
    println!(
        "  Password: {}",
        if config.db_password.is_empty() { "not set" } else { "set" }
    );
    println!("  Max Connections: {}", config.db_max_connections);
    println!("  Acquire Timeout: {}s", config.db_acquire_timeout_secs);
    println!("  Hostname: {}", config.resolved_hostname());
    println!("  Log Filter: {}", config.rust_log);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Open the pool, run `SELECT 1`, close the pool.
async fn cmd_check_db(config: &Config) -> ServiceResult<()> {
    config.validate().map_err(ServiceError::InvalidConfig)?;

    println!("Database: {}", config.redacted_dsn());

    print!("Opening pool... ");
    let pool = Arc::new(PoolManager::new(PoolSettings::from_config(config)));
    if let Err(e) = pool.initialize().await {
        println!("FAILED");
        println!("  Error: {}", e);
        return Err(e.into());
    }
    println!("OK");

    print!("Running SELECT 1... ");
    let result = PgUserStore::new(pool.clone()).ping().await;
    pool.shutdown().await;

    match result {
        Ok(()) => {
            println!("OK");
            Ok(())
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            Err(e.into())
        }
    }
}

/// Run the HTTP server.
async fn cmd_serve(
    mut config: Config,
    host_override: Option<String>,
    port_override: Option<u16>,
) -> anyhow::Result<()> {
    // Override with CLI args if provided
    if let Some(host) = host_override {
        config.host = host;
    }
    if let Some(port) = port_override {
        config.port = port;
    }

    // Validate configuration
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        ServiceError::InvalidConfig(e)
    })?;

    info!("Configuration loaded successfully");
    info!("Database: {}", config.redacted_dsn());

    // Initialize metrics
    let prometheus = metrics::install_recorder()?;
    metrics::init_metrics();

    // Open the pool before accepting traffic
    let pool = Arc::new(PoolManager::new(PoolSettings::from_config(&config)));
    pool.initialize().await.map_err(|e| {
        error!("Database pool initialization failed: {}", e);
        ServiceError::from(e)
    })?;

    let store = Arc::new(PgUserStore::new(pool.clone()));
    let hostname = config.resolved_hostname();
    let app_state = AppState::new(store, hostname.clone(), config.db_host.clone());
    let router = create_router(app_state).merge(metrics::metrics_router(prometheus));

    // Start HTTP server
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        error!("Failed to bind {}: {}", addr, e);
        ServiceError::from(e)
    })?;
    info!(hostname = %hostname, "HTTP server listening on {}", addr);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Err(e) = &served {
        warn!("HTTP server stopped with error: {}", e);
    }

    pool.shutdown().await;
    info!("Shutdown complete");

    served.map_err(|e| ServiceError::from(e).into())
}
