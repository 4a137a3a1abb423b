//! Submission sink: persists one application per finished conversation.

pub mod domain;
pub mod repository;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationSubmission, NewApplication,
    SubmissionPayload, UnknownStatus, UploadedFile,
};
pub use repository::{
    ApplicationRepository, Bucket, DocumentStorage, RepositoryError, StorageError, StoredObject,
};
pub use service::{storage_path, SubmissionError, SubmissionReceipt, SubmissionService, UploadOutcome};
