//! HTTP API Server
//!
//! Builds the public and internal routers and serves them with axum.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{Router, http::StatusCode, middleware};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use planet_core::{CalendarService, ProfileService, TodoService};

use crate::middleware::auth::{JwtVerifier, auth_middleware};
use crate::routes::{internal_routes, routes};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub calendar: CalendarService,
    pub todos: TodoService,
    pub profiles: ProfileService,
    pub verifier: JwtVerifier,
}

/// Public router with authentication, tracing, timeout and CORS layers
pub fn public_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Internal router; no bearer authentication
pub fn internal_router(state: AppState) -> Router {
    Router::new()
        .merge(internal_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the public HTTP API server
pub async fn start_server(port: u16, state: AppState, request_timeout: Duration) -> anyhow::Result<()> {
    let app = public_router(state, request_timeout);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("HTTP API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Start the internal RPC server
pub async fn start_internal_server(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = internal_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Internal RPC listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
