//! Best-effort persistence of analysis results.
//!
//! A failed save never fails the analyze request: the outcome is recorded and
//! the caller gets `analysis_id: null`.

use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::history::HistoryStore;
use crate::models::analysis::AnalysisResult;
use crate::models::identity::CallerIdentity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(Uuid),
    /// Anonymous caller; the store was not contacted.
    Skipped,
    Failed(String),
}

impl SaveOutcome {
    pub fn analysis_id(&self) -> Option<Uuid> {
        match self {
            SaveOutcome::Saved(id) => Some(*id),
            SaveOutcome::Skipped | SaveOutcome::Failed(_) => None,
        }
    }
}

/// Writes the result under the caller's identity. Never returns an error.
pub async fn save_best_effort(
    store: &dyn HistoryStore,
    caller: Option<&CallerIdentity>,
    job_description: &str,
    result: &AnalysisResult,
) -> SaveOutcome {
    let Some(caller) = caller else {
        return SaveOutcome::Skipped;
    };

    match store.create(&caller.id, job_description, result).await {
        Ok(id) => {
            info!(user_id = %caller.id, analysis_id = %id, "Analysis persisted");
            SaveOutcome::Saved(id)
        }
        Err(e) => {
            warn!(user_id = %caller.id, "Database save error: {e}");
            SaveOutcome::Failed(e.to_string())
        }
    }
}
