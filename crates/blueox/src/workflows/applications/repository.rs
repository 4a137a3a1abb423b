use async_trait::async_trait;

use super::domain::{Application, ApplicationId, NewApplication};
use crate::workflows::admin::domain::ClientId;

/// Error enumeration for backend collection failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction over the `applications` collection.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Single all-or-nothing insert.
    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError>;
    async fn update_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError>;
    async fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError>;
    /// Every application, newest first.
    async fn list_applications(&self) -> Result<Vec<Application>, RepositoryError>;
    async fn applications_for_client(
        &self,
        client_id: &ClientId,
    ) -> Result<Vec<Application>, RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("object '{0}' not found")]
    NotFound(String),
    #[error("upload rejected: {0}")]
    Rejected(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Object buckets the service writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Files attached to a conversation's final form.
    Attachments,
    /// A signed-in client's document safe.
    ClientDocuments,
}

/// Bytes and content type of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Object storage for attachments and client documents.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Stores `bytes` under `path` and returns the stored object path.
    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError>;
    async fn download(&self, bucket: Bucket, path: &str) -> Result<StoredObject, StorageError>;
    /// Removing a missing object is not an error.
    async fn remove(&self, bucket: Bucket, path: &str) -> Result<(), StorageError>;
}
