//! Route definitions
//!
//! Public endpoints and the internal RPC surface live on separate routers.

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::handlers::{calendar, health, internal, plans, todos};
use crate::server::AppState;

/// Public API routes
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Calendar
        .route("/me/calendar", get(calendar::my_month))
        .route("/users/{nickname}/calendar", get(calendar::user_month))
        .route("/me/calendar/events", post(calendar::create_event))
        .route(
            "/me/calendar/events/{event_id}",
            get(calendar::get_event)
                .put(calendar::update_event)
                .delete(calendar::delete_event),
        )
        // Daily plans
        .route("/me/plans/daily", get(plans::my_daily))
        .route("/users/{nickname}/plans/daily", get(plans::user_daily))
        // Todos
        .route("/me/todos/{todo_id}", patch(todos::toggle_todo))
}

/// Internal RPC routes, served on the internal port only
pub fn internal_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/user.v1.UserService/CreateProfile", post(internal::create_profile))
}
