use axum::extract::{multipart::MultipartRejection, Multipart, Path, State};
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::analysis::history::{StoreError, HISTORY_LIMIT};
use crate::analysis::upload::stage_upload;
use crate::auth::extractors::{Caller, MaybeCaller};
use crate::errors::AppError;
use crate::state::AppState;

/// POST /analysis/analyze
///
/// Multipart: `resume` (.pdf/.docx, ≤10 MiB) and `jobDescription`. A bearer token
/// is optional; with one, the result is also saved to the caller's history.
pub async fn handle_analyze(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, AppError> {
    // A body that is not multipart at all cannot carry a file.
    let mut multipart = multipart.map_err(|_| AppError::NoFileUploaded)?;
    let form = stage_upload(&mut multipart, &state.temp_store).await?;
    let resume = form.resume.ok_or(AppError::NoFileUploaded)?;
    let job_description = form.job_description.unwrap_or_default();

    // Owned by its own task so a client disconnect cannot cancel the engine call,
    // the history write or the cleanup.
    let broker = state.broker.clone();
    let outcome = tokio::spawn(async move {
        broker
            .analyze(resume, &job_description, caller.as_ref())
            .await
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Analysis task failed: {e}")))??;

    Ok(Json(json!({
        "success": true,
        "message": "Analysis completed successfully",
        "data": outcome,
    })))
}

/// GET /analysis/history
pub async fn handle_history(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Value>, AppError> {
    let analyses = state.history.list(&caller.id, HISTORY_LIMIT).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Analysis history retrieved successfully",
        "count": analyses.len(),
        "data": analyses,
    })))
}

/// GET /analysis/:id
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let analysis = state.history.get_by_id(&caller.id, parse_id(&id)?).await?;
    Ok(Json(json!({ "success": true, "data": analysis })))
}

/// DELETE /analysis/:id
pub async fn handle_delete_analysis(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.history.delete(&caller.id, parse_id(&id)?).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Analysis deleted successfully",
    })))
}

/// An id that is not a UUID cannot match any row.
fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::Store(StoreError::NotFound))
}
