//! Upload gate and temp-file staging for resumes.
//!
//! The gate streams the multipart body to disk, enforcing the extension allow-list,
//! the size ceiling and the single-file rule as it goes. Whatever it accepts is
//! handed on as a `StagedFile`, which owns the file on disk until discarded.

use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;

/// Hard ceiling for a single resume upload.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Request body limit for the analyze route: the file plus room for the text field.
pub const MAX_BODY_BYTES: usize = MAX_FILE_BYTES as usize + 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 2] = ["pdf", "docx"];
const FILE_FIELD: &str = "resume";
const JOB_DESCRIPTION_FIELD: &str = "jobDescription";

/// Staging directory for uploads. Names are unique per request, so no locking.
#[derive(Debug, Clone)]
pub struct TempStore {
    dir: PathBuf,
}

impl TempStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `resume-<unix millis>-<9 random digits><ext>`, keeping the client's extension.
    fn staging_path(&self, extension: &str) -> PathBuf {
        let millis = Utc::now().timestamp_millis();
        let random = Uuid::new_v4().as_u128() % 1_000_000_000;
        self.dir
            .join(format!("resume-{millis}-{random:09}.{extension}"))
    }
}

/// A resume written to the temp store. Owned by exactly one request.
///
/// `discard` is the normal way out. If the value is dropped without it (early
/// return, panic unwinding), the file is removed synchronously in `Drop`.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    original_name: String,
    content_type: String,
    size: u64,
    armed: bool,
}

impl StagedFile {
    pub(crate) fn new(path: PathBuf, original_name: String, content_type: String) -> Self {
        Self {
            path,
            original_name,
            content_type,
            size: 0,
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Removes the file from disk. A file that is already gone is not an error.
    pub async fn discard(mut self) {
        self.armed = false;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(file = %self.path.display(), "Temporary file cleaned up"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(file = %self.path.display(), "File cleanup error: {e}"),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.armed {
            match std::fs::remove_file(&self.path) {
                Ok(()) => debug!(file = %self.path.display(), "Temporary file removed on drop"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(file = %self.path.display(), "File cleanup error: {e}"),
            }
        }
    }
}

/// What the gate extracted from the multipart body.
#[derive(Debug, Default)]
pub struct StagedForm {
    pub resume: Option<StagedFile>,
    pub job_description: Option<String>,
}

impl StagedForm {
    async fn discard(self) {
        if let Some(resume) = self.resume {
            resume.discard().await;
        }
    }
}

/// Reads the whole multipart body, staging at most one resume file.
/// On rejection nothing stays on disk.
pub async fn stage_upload(
    multipart: &mut Multipart,
    store: &TempStore,
) -> Result<StagedForm, AppError> {
    let mut form = StagedForm::default();
    match read_fields(multipart, store, &mut form).await {
        Ok(()) => Ok(form),
        Err(e) => {
            form.discard().await;
            Err(e)
        }
    }
}

async fn read_fields(
    multipart: &mut Multipart,
    store: &TempStore,
    form: &mut StagedForm,
) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if field.file_name().is_some() {
            if name != FILE_FIELD {
                return Err(AppError::Upload(format!("Unexpected field: {name}")));
            }
            if form.resume.is_some() {
                return Err(AppError::Upload("Too many files".to_string()));
            }
            stage_file(field, store, form).await?;
        } else if name == JOB_DESCRIPTION_FIELD {
            form.job_description = Some(field.text().await.map_err(multipart_error)?);
        }
    }
    Ok(())
}

async fn stage_file(
    mut field: Field<'_>,
    store: &TempStore,
    form: &mut StagedForm,
) -> Result<(), AppError> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let extension = allowed_extension(&original_name)
        .ok_or_else(|| AppError::Upload("Only PDF and DOCX files are allowed".to_string()))?;
    let content_type = field
        .content_type()
        .map(String::from)
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let path = store.staging_path(extension);
    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to stage upload: {e}")))?;

    // Registered before the first byte so a failure below still removes the file.
    let staged = form
        .resume
        .insert(StagedFile::new(path, original_name, content_type));

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        staged.size += chunk.len() as u64;
        if staged.size > MAX_FILE_BYTES {
            return Err(AppError::FileTooLarge);
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to stage upload: {e}")))?;
    }
    file.flush()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to stage upload: {e}")))?;

    debug!(
        file = %staged.path.display(),
        original = %staged.original_name,
        bytes = staged.size,
        "Resume staged"
    );
    Ok(())
}

/// Returns the file's extension as supplied if it is on the allow-list
/// (compared case-insensitively).
pub fn allowed_extension(file_name: &str) -> Option<&str> {
    let extension = Path::new(file_name).extension()?.to_str()?;
    ALLOWED_EXTENSIONS
        .iter()
        .any(|allowed| extension.eq_ignore_ascii_case(allowed))
        .then_some(extension)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::FileTooLarge
    } else {
        AppError::Upload(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_extensions_are_case_insensitive() {
        assert_eq!(allowed_extension("cv.pdf"), Some("pdf"));
        assert_eq!(allowed_extension("CV.PDF"), Some("PDF"));
        assert_eq!(allowed_extension("resume.final.Docx"), Some("Docx"));
    }

    #[test]
    fn test_disallowed_extensions_are_rejected() {
        assert_eq!(allowed_extension("cv.txt"), None);
        assert_eq!(allowed_extension("cv.doc"), None);
        assert_eq!(allowed_extension("pdf"), None);
        assert_eq!(allowed_extension("cv.pdf.exe"), None);
        assert_eq!(allowed_extension(""), None);
    }

    #[test]
    fn test_staging_paths_are_unique_and_keep_extension() {
        let store = TempStore::new("uploads");
        let a = store.staging_path("pdf");
        let b = store.staging_path("pdf");
        assert_ne!(a, b);

        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("resume-"));
        assert!(name.ends_with(".pdf"));
        assert_eq!(a.parent().unwrap(), Path::new("uploads"));
    }

    #[tokio::test]
    async fn test_discard_removes_file_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume-1.pdf");
        tokio::fs::write(&path, b"data").await.unwrap();

        StagedFile::new(path.clone(), "cv.pdf".into(), "application/pdf".into())
            .discard()
            .await;
        assert!(!path.exists());

        // Already gone: still fine.
        StagedFile::new(path.clone(), "cv.pdf".into(), "application/pdf".into())
            .discard()
            .await;
    }

    #[test]
    fn test_drop_removes_file_that_was_never_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume-2.pdf");
        std::fs::write(&path, b"data").unwrap();

        {
            let _staged = StagedFile::new(path.clone(), "cv.pdf".into(), "application/pdf".into());
        }
        assert!(!path.exists());
    }
}
