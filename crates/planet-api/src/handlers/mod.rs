//! HTTP API handlers

pub mod calendar;
pub mod internal;
pub mod plans;
pub mod todos;

use serde::Serialize;

/// Generic success acknowledgement
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}
