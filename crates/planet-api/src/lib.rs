//! planet-api: HTTP surface for the planet user service
//!
//! Public calendar, plan and todo endpoints behind bearer-token
//! authentication, plus the internal profile-seeding RPC router.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use middleware::auth::{AuthUser, Claims, JwtVerifier, MaybeUser};
pub use server::{AppState, internal_router, public_router, start_internal_server, start_server};
