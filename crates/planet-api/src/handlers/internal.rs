//! Internal RPC: profile seeding from the auth service
//!
//! Always answers 200; the outcome is carried in `success` and `message`.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use planet_core::{Error, NewProfile};

use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub user_id: String,
    pub nickname: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateProfileResponse {
    pub success: bool,
    pub message: String,
}

impl CreateProfileResponse {
    fn failure(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            message: message.into(),
        })
    }
}

/// POST /user.v1.UserService/CreateProfile
pub async fn create_profile(
    State(state): State<AppState>,
    payload: Result<Json<CreateProfileRequest>, JsonRejection>,
) -> Json<CreateProfileResponse> {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!("Malformed CreateProfile request: {}", rejection.body_text());
            return CreateProfileResponse::failure("invalid request");
        }
    };
    debug!("Received CreateProfile request: user_id={}, nickname={}", req.user_id, req.nickname);

    let Ok(user_id) = Uuid::parse_str(&req.user_id) else {
        return CreateProfileResponse::failure("invalid userId");
    };

    let new = NewProfile {
        user_id,
        nickname: req.nickname,
        bio: req.bio,
        profile_image: req.profile_image,
    };

    match state.profiles.create_profile(new).await {
        Ok(_) => Json(CreateProfileResponse {
            success: true,
            message: "profile created successfully".to_string(),
        }),
        Err(Error::Validation(msg)) => CreateProfileResponse::failure(msg),
        Err(Error::Conflict(msg)) => CreateProfileResponse::failure(msg),
        Err(e) => {
            error!("Failed to create profile: {}", e);
            CreateProfileResponse::failure("failed to create profile")
        }
    }
}
