//! Todo status updates

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::middleware::auth::AuthUser;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub is_done: bool,
}

/// PATCH /me/todos/{todo_id}
pub async fn toggle_todo(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    path: std::result::Result<Path<Uuid>, PathRejection>,
    payload: std::result::Result<Json<ToggleRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let Path(todo_id) = path.map_err(|_| ApiError::InvalidRequest("invalid todo ID format".to_string()))?;
    let Json(req) = payload?;

    state.todos.set_done(caller, todo_id, req.is_done).await?;
    Ok(StatusCode::NO_CONTENT)
}
