use async_trait::async_trait;

use super::domain::{JobDraft, JobId, JobPosting};
use crate::workflows::applications::RepositoryError;

/// Read/write access to the `jobs` collection.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Postings with `is_active == true`, newest first.
    async fn active_jobs(&self) -> Result<Vec<JobPosting>, RepositoryError>;
    async fn list_jobs(&self) -> Result<Vec<JobPosting>, RepositoryError>;
    async fn insert_job(&self, draft: JobDraft) -> Result<JobPosting, RepositoryError>;
    async fn update_job(&self, id: &JobId, draft: JobDraft) -> Result<JobPosting, RepositoryError>;
    async fn delete_job(&self, id: &JobId) -> Result<(), RepositoryError>;
}
