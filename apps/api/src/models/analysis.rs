use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Result computed by the analysis engine. The shape is fixed by the engine's
/// contract; range and subset invariants are not re-checked here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub resume_skills: Vec<String>,
    pub job_skills: Vec<String>,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub match_percentage: f64, // 0 to 100
    pub similarity_score: f64, // 0.0 to 1.0
    pub recommendations: Vec<Recommendation>,
    pub analysis_summary: AnalysisSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub skill: String,
    pub priority: Priority,
    pub courses: Vec<Course>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub name: String,
    pub platform: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_job_skills: usize,
    pub total_resume_skills: usize,
    pub matched_count: usize,
    pub missing_count: usize,
}

impl AnalysisSummary {
    pub fn from_lists(
        resume_skills: &[String],
        job_skills: &[String],
        matched_skills: &[String],
        missing_skills: &[String],
    ) -> Self {
        Self {
            total_job_skills: job_skills.len(),
            total_resume_skills: resume_skills.len(),
            matched_count: matched_skills.len(),
            missing_count: missing_skills.len(),
        }
    }
}

/// A stored analysis as returned by the history endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedAnalysis {
    pub id: Uuid,
    pub user_id: String,
    pub job_description: String,
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AnalysisRow {
    pub id: Uuid,
    pub user_id: String,
    pub job_description: String,
    pub resume_skills: Vec<String>,
    pub job_skills: Vec<String>,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub match_percentage: f64,
    pub similarity_score: f64,
    pub recommendations: Json<Vec<Recommendation>>,
    pub created_at: DateTime<Utc>,
}

impl From<AnalysisRow> for PersistedAnalysis {
    fn from(row: AnalysisRow) -> Self {
        // The summary is not stored; it is derived from the lists.
        let analysis_summary = AnalysisSummary::from_lists(
            &row.resume_skills,
            &row.job_skills,
            &row.matched_skills,
            &row.missing_skills,
        );
        PersistedAnalysis {
            id: row.id,
            user_id: row.user_id,
            job_description: row.job_description,
            result: AnalysisResult {
                resume_skills: row.resume_skills,
                job_skills: row.job_skills,
                matched_skills: row.matched_skills,
                missing_skills: row.missing_skills,
                match_percentage: row.match_percentage,
                similarity_score: row.similarity_score,
                recommendations: row.recommendations.0,
                analysis_summary,
            },
            created_at: row.created_at,
        }
    }
}
