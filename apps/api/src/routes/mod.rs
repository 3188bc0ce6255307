pub mod health;

use std::any::Any;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::analysis::handlers as analysis;
use crate::analysis::upload::MAX_BODY_BYTES;
use crate::auth::handlers as auth;
use crate::errors::error_response;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/analysis", analysis_routes())
        .nest("/auth", auth_routes())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/analyze",
            post(analysis::handle_analyze).layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .route("/history", get(analysis::handle_history))
        .route(
            "/:id",
            get(analysis::handle_get_analysis).delete(analysis::handle_delete_analysis),
        )
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::handle_register))
        .route("/login", post(auth::handle_login))
        .route("/refresh", post(auth::handle_refresh))
        .route("/logout", post(auth::handle_logout))
        .route("/me", get(auth::handle_me))
}

/// Last-resort handler: a panicking request still gets the standard 500 envelope.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Handler panicked: {detail}");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal server error occurred",
        None,
    )
}
