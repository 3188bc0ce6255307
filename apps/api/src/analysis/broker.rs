//! Analysis broker: validates the request, calls the engine, saves the result
//! when there is a caller, and always removes the staged resume before returning.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::analysis::history::HistoryStore;
use crate::analysis::persistence::{save_best_effort, SaveOutcome};
use crate::analysis::upload::StagedFile;
use crate::engine::AnalysisEngine;
use crate::errors::AppError;
use crate::models::analysis::AnalysisResult;
use crate::models::identity::CallerIdentity;

/// `data` payload of a successful analyze response.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub analysis_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct AnalysisBroker {
    engine: Arc<dyn AnalysisEngine>,
    history: Arc<dyn HistoryStore>,
}

impl AnalysisBroker {
    pub fn new(engine: Arc<dyn AnalysisEngine>, history: Arc<dyn HistoryStore>) -> Self {
        Self { engine, history }
    }

    /// Runs one analysis. The staged file is consumed and removed on every path.
    pub async fn analyze(
        &self,
        resume: StagedFile,
        job_description: &str,
        caller: Option<&CallerIdentity>,
    ) -> Result<AnalysisOutcome, AppError> {
        let outcome = self.run(&resume, job_description, caller).await;
        resume.discard().await;
        outcome
    }

    async fn run(
        &self,
        resume: &StagedFile,
        job_description: &str,
        caller: Option<&CallerIdentity>,
    ) -> Result<AnalysisOutcome, AppError> {
        if job_description.trim().is_empty() {
            return Err(AppError::NoJobDescription);
        }

        info!(
            file = %resume.original_name(),
            bytes = resume.size(),
            user_id = caller.map(|c| c.id.as_str()).unwrap_or("anonymous"),
            "Analyzing resume"
        );

        let result = self.engine.analyze(resume, job_description).await?;
        info!(
            match_percentage = result.match_percentage,
            "Analysis completed successfully"
        );

        let saved = save_best_effort(self.history.as_ref(), caller, job_description, &result).await;
        if let SaveOutcome::Failed(reason) = &saved {
            debug!("Responding without analysis_id: {reason}");
        }

        Ok(AnalysisOutcome {
            analysis_id: saved.analysis_id(),
            result,
        })
    }
}
