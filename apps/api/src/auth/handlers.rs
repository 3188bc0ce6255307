//! Account endpoints. These only relay to the identity provider.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::extractors::{bearer_token, Caller};
use crate::errors::AppError;
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// POST /auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let req = json_body(payload)?;
    let (email, password) = required_credentials(req.email, req.password)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    if !looks_like_email(&email) {
        return Err(AppError::Validation("Invalid email format".to_string()));
    }

    let registration = state
        .identity
        .sign_up(&email, &password, req.full_name.as_deref())
        .await
        .map_err(|e| match AppError::from(e) {
            // Sign-up refusals (duplicate email, weak password) are client errors.
            AppError::AuthFailed(msg) => AppError::Validation(msg),
            other => other,
        })?;

    info!("User registered");
    let access_token = registration.session.as_ref().map(|s| s.access_token.clone());
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "data": {
                "user": registration.user,
                "session": registration.session,
                "access_token": access_token,
            }
        })),
    ))
}

/// POST /auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let req = json_body(payload)?;
    let (email, password) = required_credentials(req.email, req.password)?;
    let session = state.identity.sign_in(&email, &password).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "data": {
            "user": session.user,
            "access_token": session.access_token,
            "session": session,
        }
    })))
}

/// POST /auth/refresh
pub async fn handle_refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let req = json_body(payload)?;
    let refresh_token = req
        .refresh_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Refresh token is required".to_string()))?;
    let session = state.identity.refresh(&refresh_token).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Token refreshed successfully",
        "data": {
            "access_token": session.access_token,
            "session": session,
        }
    })))
}

/// POST /auth/logout
///
/// Succeeds without a token; a revocation failure is logged, not returned.
pub async fn handle_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<Value> {
    if let Some(token) = bearer_token(&headers) {
        if let Err(e) = state.identity.sign_out(token).await {
            warn!("Logout revocation failed: {e}");
        }
    }
    Json(json!({ "success": true, "message": "Logout successful" }))
}

/// GET /auth/me
pub async fn handle_me(Caller(identity): Caller) -> Json<Value> {
    Json(json!({ "success": true, "data": { "user": identity } }))
}

fn required_credentials(
    email: Option<String>,
    password: Option<String>,
) -> Result<(String, String), AppError> {
    match (email, password) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
            Ok((email.trim().to_string(), password))
        }
        _ => Err(AppError::Validation(
            "Email and password are required".to_string(),
        )),
    }
}

/// `local@host.tld` with no whitespace: one `@`, and a dot in the domain with
/// something on both sides of it. The provider does the real check.
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .char_indices()
                    .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
        }
        None => false,
    }
}

/// Unreadable JSON bodies get the same envelope as every other client error.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::Validation(e.body_text()))
}
