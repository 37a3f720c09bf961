//! Authentication middleware
//!
//! Verifies `Authorization: Bearer <jwt>` (HS256) and records the caller's
//! user id for the handlers. Requests without the header continue as
//! anonymous. An unusable token leaves public reads anonymous and is
//! rejected with 401 wherever a signed-in caller is required.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::AppState;

/// Token claims; `sub` carries the user id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// HS256 token verifier
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Decode `token` and return the user id in its `sub` claim
    pub fn verify(&self, token: &str) -> Result<Uuid, ApiError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            debug!("Token rejected: {}", e);
            ApiError::InvalidToken
        })?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| ApiError::InvalidToken)
    }
}

/// Caller identity attached to each request by [`auth_middleware`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Caller {
    Anonymous,
    User(Uuid),
    /// A token was sent but could not be verified
    Rejected,
}

fn resolve_caller(verifier: &JwtVerifier, header_value: Option<&header::HeaderValue>) -> Caller {
    let Some(value) = header_value else {
        return Caller::Anonymous;
    };
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match token.map(|t| verifier.verify(t)) {
        Some(Ok(user_id)) => Caller::User(user_id),
        _ => Caller::Rejected,
    }
}

/// Bearer token authentication middleware
pub async fn auth_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let caller = resolve_caller(&state.verifier, request.headers().get(header::AUTHORIZATION));
    request.extensions_mut().insert(caller);
    next.run(request).await
}

/// Authenticated caller; rejects anonymous requests and unusable tokens with 401
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Caller>() {
            Some(Caller::User(user_id)) => Ok(AuthUser(*user_id)),
            Some(Caller::Rejected) => Err(ApiError::InvalidToken),
            _ => Err(ApiError::Unauthenticated),
        }
    }
}

/// Caller that may be anonymous; an unusable token reads as anonymous
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<Uuid>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Caller>() {
            Some(Caller::User(user_id)) => Ok(MaybeUser(Some(*user_id))),
            _ => Ok(MaybeUser(None)),
        }
    }
}
