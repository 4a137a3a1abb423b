use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use super::domain::{
    Application, ApplicationStatus, ApplicationSubmission, NewApplication, UploadedFile,
    DOCUMENT_PATHS_KEY,
};
use super::repository::{
    ApplicationRepository, Bucket, DocumentStorage, RepositoryError, StorageError,
};

const UPLOAD_PREFIX: &str = "applications";

/// Result of one best-effort attachment upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub field: String,
    pub file_name: String,
    pub result: Result<String, StorageError>,
}

impl UploadOutcome {
    pub fn stored_path(&self) -> Option<&str> {
        self.result.as_deref().ok()
    }
}

/// Persisted application plus what happened to each attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    pub application: Application,
    pub uploads: Vec<UploadOutcome>,
}

impl SubmissionReceipt {
    pub fn failed_uploads(&self) -> usize {
        self.uploads
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .count()
    }
}

/// Writes finished conversations: attachments first, then one record insert.
pub struct SubmissionService<R, S> {
    repository: Arc<R>,
    storage: Arc<S>,
}

impl<R, S> SubmissionService<R, S>
where
    R: ApplicationRepository + 'static,
    S: DocumentStorage + 'static,
{
    pub fn new(repository: Arc<R>, storage: Arc<S>) -> Self {
        Self {
            repository,
            storage,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub async fn submit(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let ApplicationSubmission {
            payload,
            uploads,
            client_id,
        } = submission;

        let mut outcomes = Vec::with_capacity(uploads.len());
        for file in uploads {
            outcomes.push(self.upload(file).await);
        }

        let mut data = payload.data;
        let stored: Vec<Value> = outcomes
            .iter()
            .filter_map(UploadOutcome::stored_path)
            .map(|path| Value::String(path.to_string()))
            .collect();
        if !stored.is_empty() {
            data.insert(DOCUMENT_PATHS_KEY.to_string(), Value::Array(stored));
        }

        let application = self
            .repository
            .insert_application(NewApplication {
                client_id,
                user_path: payload.path,
                data,
                status: ApplicationStatus::Pending,
            })
            .await
            .map_err(|error| {
                warn!(path = %payload.path, %error, "application insert failed");
                SubmissionError::Repository(error)
            })?;

        info!(
            application_id = %application.id,
            path = %application.user_path,
            uploads = outcomes.len(),
            "application persisted"
        );

        Ok(SubmissionReceipt {
            application,
            uploads: outcomes,
        })
    }

    async fn upload(&self, file: UploadedFile) -> UploadOutcome {
        let path = storage_path(
            Utc::now().timestamp_millis(),
            Uuid::new_v4(),
            &file.field,
            &file.file_name,
        );
        let content_type = file.mime_type().to_string();
        let result = self
            .storage
            .upload(Bucket::Attachments, &path, &content_type, file.bytes)
            .await;

        match &result {
            Ok(stored) => info!(field = %file.field, path = %stored, "document uploaded"),
            Err(error) => warn!(field = %file.field, %error, "document upload failed"),
        }

        UploadOutcome {
            field: file.field,
            file_name: file.file_name,
            result,
        }
    }
}

/// Object key for an attachment: `applications/{millis}-{field}-{upload id}-{name}`.
pub fn storage_path(timestamp_millis: i64, upload_id: Uuid, field: &str, file_name: &str) -> String {
    let field = sanitize(field, "file");
    let name = sanitize(file_name, "upload");
    format!(
        "{UPLOAD_PREFIX}/{timestamp_millis}-{field}-{}-{name}",
        upload_id.simple()
    )
}

pub(crate) fn sanitize(raw: &str, fallback: &str) -> String {
    let sanitized: String = raw
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        fallback.to_string()
    } else {
        sanitized
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
