//! planet-server: Planet user service main binary
//!
//! Usage:
//!   planet-server                 - Start the public API and internal RPC servers
//!   planet-server --check-config  - Print the resolved configuration and exit
//!   planet-server --help          - Show help

use std::sync::Arc;

use planet_api::{AppState, JwtVerifier};
use planet_core::{
    AnalyticsSink, CalendarService, Config, Database, EventStore, FollowStore, HttpAnalyticsSink, MonthCache,
    ProfileService, ProfileStore, TodoService, TodoStore, VisibilityResolver,
};
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    /// Serve both listeners
    Server,
    /// Print the resolved configuration
    CheckConfig,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args();

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("planet-server {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    if let RunMode::CheckConfig = mode {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    // RUST_LOG wins over LOG_LEVEL
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(config.log_directive()),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting planet-server...");
    run_server(config).await
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    let args: Vec<String> = std::env::args().collect();

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--check-config" => return RunMode::CheckConfig,
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("planet-server - Planet user service");
    println!();
    println!("Usage:");
    println!("  planet-server                 Start the public API and internal RPC servers");
    println!("  planet-server --check-config  Print the resolved configuration");
    println!("  planet-server --help          Show this help message");
    println!("  planet-server --version       Show version");
    println!();
    println!("Environment Variables:");
    println!("  PORT                   Public HTTP port (required)");
    println!("  USER_GRPC_PORT         Internal RPC port (required)");
    println!("  JWT_SECRET_KEY         HS256 token secret (required)");
    println!("  DB_NAME                Database name (required)");
    println!("  DB_PATH                SQLite file path (default: data/<DB_NAME>.db)");
    println!("  DB_MAX_OPEN            Pool size (default: 50)");
    println!("  DB_MAX_IDLE            Idle connections kept (default: 10)");
    println!("  DB_MAX_LIFETIME_SECS   Connection lifetime in seconds (default: 3600)");
    println!("  REQUEST_TIMEOUT_SECS   Per-request deadline (default: 10)");
    println!("  ANALYTICS_GRPC_SERVER_ADDR  Analytics service address (optional)");
    println!("  AUTH_GRPC_SERVER_ADDR  Auth service address (optional)");
    println!("  MaxTodoLength          Maximum todo length (default: 255)");
    println!("  LOG_LEVEL              Log level name or number (default: info)");
}

/// Wire stores and services, then serve until Ctrl+C
async fn run_server(config: Config) -> anyhow::Result<()> {
    let db = Database::open(&config.database)
        .map_err(|e| anyhow::anyhow!("Failed to open database: {}", e))?;

    let events = EventStore::new(db.clone());
    let profiles = ProfileStore::new(db.clone());
    let follows = FollowStore::new(db.clone());
    let todos = TodoStore::new(db);

    let cache = Arc::new(MonthCache::new());
    let purge_handle = Arc::clone(&cache).start_purge_task();

    let analytics: Option<Arc<dyn AnalyticsSink>> = match &config.analytics.addr {
        Some(addr) => {
            let sink = HttpAnalyticsSink::new(addr, config.analytics.timeout())
                .map_err(|e| anyhow::anyhow!("Failed to create analytics client: {}", e))?;
            tracing::info!("Analytics enabled: {}", sink.endpoint());
            Some(Arc::new(sink))
        }
        None => {
            tracing::info!("Analytics disabled (no address configured)");
            None
        }
    };

    let state = AppState {
        calendar: CalendarService::new(
            events,
            profiles.clone(),
            VisibilityResolver::new(Arc::new(follows)),
            cache,
            config.limits,
        ),
        todos: TodoService::new(todos, analytics).with_analytics_timeout(config.analytics.timeout()),
        profiles: ProfileService::new(profiles, config.limits),
        verifier: JwtVerifier::new(&config.auth.jwt_secret),
    };

    let mut service_handles = vec![purge_handle];

    // Start internal RPC server
    let internal_port = config.server.internal_port;
    let internal_state = state.clone();
    let handle = tokio::spawn(async move {
        if let Err(e) = planet_api::start_internal_server(internal_port, internal_state).await {
            tracing::error!("Internal RPC error: {}", e);
        }
    });
    service_handles.push(handle);

    // Start public HTTP API server
    let api_port = config.server.port;
    let request_timeout = config.server.request_timeout();
    let handle = tokio::spawn(async move {
        if let Err(e) = planet_api::start_server(api_port, state, request_timeout).await {
            tracing::error!("HTTP API error: {}", e);
        }
    });
    service_handles.push(handle);

    tracing::info!("planet-server initialized successfully");
    tracing::info!("Press Ctrl+C to exit");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    for handle in service_handles {
        handle.abort();
    }

    Ok(())
}
