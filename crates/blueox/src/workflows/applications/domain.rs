use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::workflows::admin::domain::ClientId;
use crate::workflows::conversation::domain::PathId;
use crate::workflows::jobs::JobId;

/// Identifier wrapper for persisted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Review workflow status set by staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    InReview,
    DocumentsRequested,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Pending,
        ApplicationStatus::InReview,
        ApplicationStatus::DocumentsRequested,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::InReview => "in_review",
            ApplicationStatus::DocumentsRequested => "documents_requested",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown application status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.label() == value.trim())
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

/// Record written once when a conversation completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    #[serde(default)]
    pub client_id: Option<ClientId>,
    pub user_path: PathId,
    /// Collected answers plus form values, kept schema-less.
    #[serde(default)]
    pub data: Map<String, Value>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Application {
    pub fn data_text(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }
}

/// Insert payload; the backend assigns the id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewApplication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    pub user_path: PathId,
    pub data: Map<String, Value>,
    pub status: ApplicationStatus,
}

pub const USER_PATH_KEY: &str = "userPath";
pub const SELECTED_JOB_KEY: &str = "selectedJob";
pub const UPLOADED_DOCUMENTS_KEY: &str = "uploadedDocuments";
pub const DOCUMENT_PATHS_KEY: &str = "documentPaths";
pub const SAVED_AT_KEY: &str = "savedAt";

/// Merged record produced by a finished conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub path: PathId,
    #[serde(default)]
    pub selected_job: Option<JobId>,
    pub data: Map<String, Value>,
}

/// File attached to a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Declared content type, else a guess from the extension.
    pub fn mime_type(&self) -> mime::Mime {
        self.content_type
            .as_deref()
            .and_then(|raw| raw.parse::<mime::Mime>().ok())
            .unwrap_or_else(|| {
                mime_guess::from_path(&self.file_name).first_or(mime::APPLICATION_OCTET_STREAM)
            })
    }
}

/// Everything the submission sink needs to persist one application.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationSubmission {
    pub payload: SubmissionPayload,
    pub uploads: Vec<UploadedFile>,
    pub client_id: Option<ClientId>,
}
