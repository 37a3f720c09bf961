//! Daily plan views (events with todos)

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use chrono::NaiveDate;
use serde::Deserialize;

use planet_core::DayView;

use crate::error::{ApiError, Result};
use crate::middleware::auth::{AuthUser, MaybeUser};
use crate::server::AppState;

/// `?date=YYYY-MM-DD`
#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    pub date: Option<String>,
}

fn parse_date(query: &DailyQuery) -> Result<NaiveDate> {
    let raw = query
        .date
        .as_deref()
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("date query parameter is required in YYYY-MM-DD format".to_string()))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::InvalidRequest("invalid date format, must be YYYY-MM-DD".to_string()))
}

/// GET /me/plans/daily
pub async fn my_daily(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    query: std::result::Result<Query<DailyQuery>, QueryRejection>,
) -> Result<Json<DayView>> {
    let Query(query) = query?;
    let date = parse_date(&query)?;
    Ok(Json(state.calendar.get_day(Some(caller), caller, date).await?))
}

/// GET /users/{nickname}/plans/daily
pub async fn user_daily(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(nickname): Path<String>,
    query: std::result::Result<Query<DailyQuery>, QueryRejection>,
) -> Result<Json<DayView>> {
    let Query(query) = query?;
    let date = parse_date(&query)?;
    Ok(Json(state.calendar.get_day_by_nickname(viewer, &nickname, date).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(date: Option<&str>) -> DailyQuery {
        DailyQuery {
            date: date.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date(&query(Some("2025-03-10"))).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
        );
        assert!(parse_date(&query(None)).is_err());
        assert!(parse_date(&query(Some(""))).is_err());
        assert!(parse_date(&query(Some("10/03/2025"))).is_err());
        assert!(parse_date(&query(Some("2025-02-30"))).is_err());
    }
}
