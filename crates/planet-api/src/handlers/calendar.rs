//! Calendar month views and event mutations

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use planet_core::{CalendarEvent, EventPatch, MonthView, NewEvent};

use super::SuccessResponse;
use crate::error::{ApiError, Result};
use crate::middleware::auth::{AuthUser, MaybeUser};
use crate::server::AppState;

/// `?year=Y&month=M`
#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: i32,
    pub month: u32,
}

pub(crate) fn event_id(path: std::result::Result<Path<Uuid>, PathRejection>) -> Result<Uuid> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::InvalidRequest("invalid eventId".to_string()))
}

/// GET /me/calendar
pub async fn my_month(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    query: std::result::Result<Query<MonthQuery>, QueryRejection>,
) -> Result<Json<MonthView>> {
    let Query(query) = query?;
    debug!("Month view for {} {:04}-{:02}", caller, query.year, query.month);

    let view = state
        .calendar
        .get_month(Some(caller), caller, query.year, query.month)
        .await?;
    Ok(Json(view))
}

/// GET /users/{nickname}/calendar
pub async fn user_month(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(nickname): Path<String>,
    query: std::result::Result<Query<MonthQuery>, QueryRejection>,
) -> Result<Json<MonthView>> {
    let Query(query) = query?;
    debug!("Month view of {} {:04}-{:02} for {:?}", nickname, query.year, query.month, viewer);

    let view = state
        .calendar
        .get_month_by_nickname(viewer, &nickname, query.year, query.month)
        .await?;
    Ok(Json(view))
}

/// POST /me/calendar/events
pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    payload: std::result::Result<Json<NewEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<CalendarEvent>)> {
    let Json(draft) = payload?;
    let event = state.calendar.create_event(caller, draft).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /me/calendar/events/{event_id}
pub async fn get_event(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<CalendarEvent>> {
    let event_id = event_id(path)?;
    Ok(Json(state.calendar.get_event(caller, event_id).await?))
}

/// PUT /me/calendar/events/{event_id}
pub async fn update_event(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    path: std::result::Result<Path<Uuid>, PathRejection>,
    payload: std::result::Result<Json<EventPatch>, JsonRejection>,
) -> Result<Json<CalendarEvent>> {
    let event_id = event_id(path)?;
    let Json(patch) = payload?;
    Ok(Json(state.calendar.update_event(caller, event_id, patch).await?))
}

/// DELETE /me/calendar/events/{event_id}
pub async fn delete_event(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SuccessResponse>> {
    let event_id = event_id(path)?;
    state.calendar.delete_event(caller, event_id).await?;
    info!("Event {} deleted via API", event_id);
    Ok(Json(SuccessResponse { success: true }))
}
