use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::analysis::{AnalysisResult, AnalysisRow, PersistedAnalysis};

/// Most rows returned by a history listing.
pub const HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no matching analysis for this owner")]
    NotFound,

    #[error("history store is not configured")]
    Unavailable,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Owner-scoped CRUD over stored analyses. Every operation filters by owner in
/// the query itself, so rows of other users are indistinguishable from missing ones.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn create(
        &self,
        owner_id: &str,
        job_description: &str,
        result: &AnalysisResult,
    ) -> Result<Uuid, StoreError>;

    /// Newest first, at most `limit` rows. No rows is an empty list.
    async fn list(&self, owner_id: &str, limit: i64) -> Result<Vec<PersistedAnalysis>, StoreError>;

    async fn get_by_id(&self, owner_id: &str, id: Uuid) -> Result<PersistedAnalysis, StoreError>;

    /// `NotFound` when nothing owned by `owner_id` matched.
    async fn delete(&self, owner_id: &str, id: Uuid) -> Result<(), StoreError>;
}

/// PostgreSQL-backed history store.
#[derive(Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn create(
        &self,
        owner_id: &str,
        job_description: &str,
        result: &AnalysisResult,
    ) -> Result<Uuid, StoreError> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO analysis_results
                (user_id, job_description, resume_skills, job_skills, matched_skills,
                 missing_skills, match_percentage, similarity_score, recommendations)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(owner_id)
        .bind(job_description)
        .bind(&result.resume_skills)
        .bind(&result.job_skills)
        .bind(&result.matched_skills)
        .bind(&result.missing_skills)
        .bind(result.match_percentage)
        .bind(result.similarity_score)
        .bind(Json(&result.recommendations))
        .fetch_one(&self.pool)
        .await?;

        info!(user_id = %owner_id, analysis_id = %id, "Analysis saved to database");
        Ok(id)
    }

    async fn list(&self, owner_id: &str, limit: i64) -> Result<Vec<PersistedAnalysis>, StoreError> {
        let rows = sqlx::query_as::<_, AnalysisRow>(
            "SELECT * FROM analysis_results WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PersistedAnalysis::from).collect())
    }

    async fn get_by_id(&self, owner_id: &str, id: Uuid) -> Result<PersistedAnalysis, StoreError> {
        sqlx::query_as::<_, AnalysisRow>(
            "SELECT * FROM analysis_results WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?
        .map(PersistedAnalysis::from)
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, owner_id: &str, id: Uuid) -> Result<(), StoreError> {
        let deleted = sqlx::query("DELETE FROM analysis_results WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(StoreError::NotFound);
        }
        info!(user_id = %owner_id, analysis_id = %id, "Analysis deleted");
        Ok(())
    }
}

/// Stand-in used when no database is configured: every call fails with `Unavailable`.
pub struct UnconfiguredHistoryStore;

#[async_trait]
impl HistoryStore for UnconfiguredHistoryStore {
    async fn create(&self, _: &str, _: &str, _: &AnalysisResult) -> Result<Uuid, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn list(&self, _: &str, _: i64) -> Result<Vec<PersistedAnalysis>, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn get_by_id(&self, _: &str, _: Uuid) -> Result<PersistedAnalysis, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn delete(&self, _: &str, _: Uuid) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }
}
