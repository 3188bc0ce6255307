//! Identity resolution as Axum extractors.
//!
//! `Caller` is the mandatory mode for owner-scoped routes; `MaybeCaller` is the
//! optional mode for analyze, where any failure simply means anonymous.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::{error, warn};

use crate::errors::AppError;
use crate::models::identity::CallerIdentity;
use crate::state::AppState;

/// Authenticated caller. Rejects with `UNAUTHORIZED` or `INVALID_TOKEN`.
#[derive(Debug, Clone)]
pub struct Caller(pub CallerIdentity);

/// Caller if a valid bearer token was sent, otherwise anonymous. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeCaller(pub Option<CallerIdentity>);

/// Returns the token of an `Authorization: Bearer <token>` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            warn!("Authentication failed: missing bearer token");
            return Err(AppError::Unauthorized);
        };

        match state.identity.resolve(token).await {
            Ok(Some(identity)) => Ok(Caller(identity)),
            Ok(None) => {
                warn!("Authentication failed: invalid or expired token");
                Err(AppError::InvalidToken)
            }
            Err(e) => {
                error!("Authentication error: {e}");
                Err(AppError::Internal(anyhow::Error::new(e).context("Authentication error")))
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeCaller {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(MaybeCaller(None));
        };

        match state.identity.resolve(token).await {
            Ok(identity) => Ok(MaybeCaller(identity)),
            Err(e) => {
                warn!("Optional auth error, continuing anonymously: {e}");
                Ok(MaybeCaller(None))
            }
        }
    }
}
