//! Test doubles and fixtures shared by the unit tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::analysis::broker::AnalysisBroker;
use crate::analysis::history::{HistoryStore, StoreError};
use crate::analysis::upload::{StagedFile, TempStore};
use crate::auth::provider::{IdentityError, IdentityProvider, Registration};
use crate::engine::{AnalysisEngine, EngineError};
use crate::models::analysis::{
    AnalysisResult, AnalysisSummary, Course, PersistedAnalysis, Priority, Recommendation,
};
use crate::models::identity::{CallerIdentity, Session};
use crate::state::AppState;

pub const BOUNDARY: &str = "skilllens-test-boundary";

/// The engine answer from the "Need 3 years Go experience" scenario.
pub fn sample_result() -> AnalysisResult {
    let resume_skills = vec!["Go".to_string(), "Docker".to_string()];
    let job_skills = vec!["Go".to_string(), "Kubernetes".to_string()];
    let matched_skills = vec!["Go".to_string()];
    let missing_skills = vec!["Kubernetes".to_string()];
    AnalysisResult {
        analysis_summary: AnalysisSummary::from_lists(
            &resume_skills,
            &job_skills,
            &matched_skills,
            &missing_skills,
        ),
        resume_skills,
        job_skills,
        matched_skills,
        missing_skills,
        match_percentage: 62.5,
        similarity_score: 0.71,
        recommendations: vec![Recommendation {
            skill: "Kubernetes".to_string(),
            priority: Priority::High,
            courses: vec![Course {
                name: "Kubernetes for Developers".to_string(),
                platform: "Udemy".to_string(),
                url: "https://example.com/courses/k8s".to_string(),
            }],
        }],
    }
}

pub fn caller(id: &str) -> CallerIdentity {
    CallerIdentity {
        id: id.to_string(),
        email: Some(format!("{id}@example.com")),
    }
}

/// Writes `data` into `dir` and wraps it the way the upload gate would.
pub async fn staged_file(dir: &Path, original_name: &str, data: &[u8]) -> StagedFile {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    let path = dir.join(format!("resume-{}.{extension}", Uuid::new_v4().simple()));
    tokio::fs::write(&path, data).await.unwrap();
    let content_type = if extension == "pdf" {
        "application/pdf"
    } else {
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    };
    StagedFile::new(path, original_name.to_string(), content_type.to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

/// Engine stub that counts invocations and checks the staged file is still there.
pub struct StubEngine {
    calls: AtomicUsize,
    finished: AtomicUsize,
    failure: Mutex<Option<EngineError>>,
    delay: Option<Duration>,
    panics: bool,
}

impl StubEngine {
    pub fn succeeding() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            failure: Mutex::new(None),
            delay: None,
            panics: false,
        }
    }

    pub fn failing(err: EngineError) -> Self {
        Self {
            failure: Mutex::new(Some(err)),
            ..Self::succeeding()
        }
    }

    /// Succeeds after sleeping for `delay`.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::succeeding()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::succeeding()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that ran to the end rather than being dropped mid-flight.
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisEngine for StubEngine {
    async fn analyze(
        &self,
        resume: &StagedFile,
        job_description: &str,
    ) -> Result<AnalysisResult, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(resume.path().exists(), "staged file removed before engine call");
        assert!(!job_description.trim().is_empty());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panics {
            panic!("engine blew up");
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        let failure = self.failure.lock().unwrap().take();
        match failure {
            Some(err) => Err(err),
            None => Ok(sample_result()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// History store
// ────────────────────────────────────────────────────────────────────────────

/// In-memory history store. `failing()` makes every operation return `Unavailable`.
#[derive(Default)]
pub struct MemoryHistoryStore {
    rows: Mutex<Vec<PersistedAnalysis>>,
    create_calls: AtomicUsize,
    fail: bool,
}

impl MemoryHistoryStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn create(
        &self,
        owner_id: &str,
        job_description: &str,
        result: &AnalysisResult,
    ) -> Result<Uuid, StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let id = Uuid::new_v4();
        self.rows.lock().unwrap().push(PersistedAnalysis {
            id,
            user_id: owner_id.to_string(),
            job_description: job_description.to_string(),
            result: result.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list(&self, owner_id: &str, limit: i64) -> Result<Vec<PersistedAnalysis>, StoreError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| r.user_id == owner_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, owner_id: &str, id: Uuid) -> Result<PersistedAnalysis, StoreError> {
        self.check()?;
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id && r.user_id == owner_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, owner_id: &str, id: Uuid) -> Result<(), StoreError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| !(r.id == id && r.user_id == owner_id));
        if rows.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Identity
// ────────────────────────────────────────────────────────────────────────────

/// Accepts `token-<id>` and resolves it to the caller `<id>`.
pub struct StubIdentity;

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn resolve(&self, token: &str) -> Result<Option<CallerIdentity>, IdentityError> {
        Ok(token.strip_prefix("token-").map(caller))
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        _full_name: Option<&str>,
    ) -> Result<Registration, IdentityError> {
        Ok(Registration {
            user: serde_json::json!({ "id": "new-user", "email": email }),
            session: None,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        if password != "correct-horse" {
            return Err(IdentityError::Rejected {
                status: 400,
                message: "Invalid login credentials".to_string(),
            });
        }
        Ok(session_for(email))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        match refresh_token.strip_prefix("refresh-") {
            Some(email) => Ok(session_for(email)),
            None => Err(IdentityError::Rejected {
                status: 400,
                message: "Invalid Refresh Token".to_string(),
            }),
        }
    }

    async fn sign_out(&self, _token: &str) -> Result<(), IdentityError> {
        Ok(())
    }
}

fn session_for(email: &str) -> Session {
    Session {
        access_token: format!("token-{email}"),
        refresh_token: format!("refresh-{email}"),
        expires_in: Some(3600),
        token_type: Some("bearer".to_string()),
        user: serde_json::json!({ "id": email, "email": email }),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// State and request helpers
// ────────────────────────────────────────────────────────────────────────────

pub fn test_state(upload_dir: &Path) -> AppState {
    test_state_with(
        upload_dir,
        Arc::new(StubEngine::succeeding()),
        Arc::new(MemoryHistoryStore::default()),
    )
}

pub fn test_state_with(
    upload_dir: &Path,
    engine: Arc<dyn AnalysisEngine>,
    history: Arc<dyn HistoryStore>,
) -> AppState {
    AppState {
        broker: AnalysisBroker::new(engine, history.clone()),
        history,
        identity: Arc::new(StubIdentity),
        temp_store: TempStore::new(upload_dir),
    }
}

pub enum Part<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

/// Encodes `parts` as a multipart/form-data body delimited by `BOUNDARY`.
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
