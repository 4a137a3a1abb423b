use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::workflows::admin::domain::{
    Client, ClientId, Document, DocumentId, NewClient, NewDocument, NewPayment, Payment, PaymentId,
};
use crate::workflows::admin::repository::{ClientRepository, DocumentRepository, PaymentRepository};
use crate::workflows::applications::domain::{Application, ApplicationId, NewApplication};
use crate::workflows::applications::repository::{
    ApplicationRepository, Bucket, DocumentStorage, RepositoryError, StorageError, StoredObject,
};
use crate::workflows::jobs::{JobDraft, JobId, JobPosting, JobRepository};

#[derive(Debug, Default)]
struct Tables {
    applications: Vec<Application>,
    jobs: Vec<JobPosting>,
    clients: Vec<Client>,
    documents: Vec<Document>,
    payments: Vec<Payment>,
    objects: HashMap<(Bucket, String), StoredObject>,
}

/// Process-local backend used for development, demos, and tests.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tables: Mutex<Tables>,
    jobs_offline: AtomicBool,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Newest first; equal timestamps keep the most recent insert on top.
fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut rows: Vec<T> = rows.iter().rev().cloned().collect();
    rows.sort_by(|left, right| created_at(right).cmp(&created_at(left)));
    rows
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend preloaded with the sample postings.
    pub fn with_sample_jobs() -> Self {
        let backend = Self::new();
        for draft in sample_jobs() {
            backend.seed_job(draft);
        }
        backend
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every job lookup fail until switched back.
    pub fn set_jobs_offline(&self, offline: bool) {
        self.jobs_offline.store(offline, Ordering::SeqCst);
    }

    fn jobs_available(&self) -> Result<(), RepositoryError> {
        if self.jobs_offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("jobs table offline".to_string()));
        }
        Ok(())
    }

    pub fn seed_job(&self, draft: JobDraft) -> JobPosting {
        let id = draft.id.clone().unwrap_or_else(|| JobId(new_id()));
        let posting = draft.into_posting(id, Utc::now());
        self.tables().jobs.push(posting.clone());
        posting
    }

    pub fn seed_client(&self, client: NewClient) -> Client {
        let record = Client {
            id: ClientId(new_id()),
            auth_user_id: client.auth_user_id,
            email: client.email,
            full_name: client.full_name,
            phone: client.phone,
            nationality: client.nationality,
            role: client.role,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.tables().clients.push(record.clone());
        record
    }

    /// Records document metadata for a client, unverified.
    pub fn seed_document(
        &self,
        client_id: &ClientId,
        document_type: &str,
        file_name: &str,
    ) -> Document {
        let document = Document {
            id: DocumentId(new_id()),
            client_id: client_id.clone(),
            application_id: None,
            document_type: document_type.to_string(),
            file_name: file_name.to_string(),
            file_path: format!("clients/{}/{file_name}", client_id.0),
            file_size: None,
            mime_type: None,
            is_verified: false,
            verified_by: None,
            verified_at: None,
            created_at: Utc::now(),
        };
        self.tables().documents.push(document.clone());
        document
    }

    pub fn object(&self, bucket: Bucket, path: &str) -> Option<StoredObject> {
        self.tables()
            .objects
            .get(&(bucket, path.to_string()))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.tables().objects.len()
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryBackend {
    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError> {
        let record = Application {
            id: ApplicationId(new_id()),
            client_id: application.client_id,
            user_path: application.user_path,
            data: application.data,
            status: application.status,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.tables().applications.push(record.clone());
        debug!(application_id = %record.id, "application stored in memory");
        Ok(record)
    }

    async fn update_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut tables = self.tables();
        let slot = tables
            .applications
            .iter_mut()
            .find(|stored| stored.id == application.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = application.clone();
        Ok(application)
    }

    async fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .tables()
            .applications
            .iter()
            .find(|stored| &stored.id == id)
            .cloned())
    }

    async fn list_applications(&self) -> Result<Vec<Application>, RepositoryError> {
        Ok(newest_first(&self.tables().applications, |row| row.created_at))
    }

    async fn applications_for_client(
        &self,
        client_id: &ClientId,
    ) -> Result<Vec<Application>, RepositoryError> {
        let owned: Vec<Application> = self
            .tables()
            .applications
            .iter()
            .filter(|stored| stored.client_id.as_ref() == Some(client_id))
            .cloned()
            .collect();
        Ok(newest_first(&owned, |row| row.created_at))
    }
}

#[async_trait]
impl JobRepository for InMemoryBackend {
    async fn active_jobs(&self) -> Result<Vec<JobPosting>, RepositoryError> {
        self.jobs_available()?;
        let active: Vec<JobPosting> = self
            .tables()
            .jobs
            .iter()
            .filter(|job| job.is_active)
            .cloned()
            .collect();
        Ok(newest_first(&active, |row| row.created_at))
    }

    async fn list_jobs(&self) -> Result<Vec<JobPosting>, RepositoryError> {
        self.jobs_available()?;
        Ok(newest_first(&self.tables().jobs, |row| row.created_at))
    }

    async fn insert_job(&self, draft: JobDraft) -> Result<JobPosting, RepositoryError> {
        self.jobs_available()?;
        let mut tables = self.tables();
        if let Some(id) = &draft.id {
            if tables.jobs.iter().any(|job| &job.id == id) {
                return Err(RepositoryError::Conflict);
            }
        }
        let id = draft.id.clone().unwrap_or_else(|| JobId(new_id()));
        let posting = draft.into_posting(id, Utc::now());
        tables.jobs.push(posting.clone());
        Ok(posting)
    }

    async fn update_job(&self, id: &JobId, draft: JobDraft) -> Result<JobPosting, RepositoryError> {
        self.jobs_available()?;
        let mut tables = self.tables();
        let posting = tables
            .jobs
            .iter_mut()
            .find(|job| &job.id == id)
            .ok_or(RepositoryError::NotFound)?;
        draft.apply_to(posting, Utc::now());
        Ok(posting.clone())
    }

    async fn delete_job(&self, id: &JobId) -> Result<(), RepositoryError> {
        self.jobs_available()?;
        let mut tables = self.tables();
        let before = tables.jobs.len();
        tables.jobs.retain(|job| &job.id != id);
        if tables.jobs.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ClientRepository for InMemoryBackend {
    async fn insert_client(&self, client: NewClient) -> Result<Client, RepositoryError> {
        let duplicate = self
            .tables()
            .clients
            .iter()
            .any(|stored| stored.email.eq_ignore_ascii_case(&client.email));
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        Ok(self.seed_client(client))
    }

    async fn fetch_client(&self, id: &ClientId) -> Result<Option<Client>, RepositoryError> {
        Ok(self
            .tables()
            .clients
            .iter()
            .find(|stored| &stored.id == id)
            .cloned())
    }

    async fn list_clients(&self) -> Result<Vec<Client>, RepositoryError> {
        Ok(newest_first(&self.tables().clients, |row| row.created_at))
    }
}

#[async_trait]
impl DocumentRepository for InMemoryBackend {
    async fn list_documents(&self) -> Result<Vec<Document>, RepositoryError> {
        Ok(newest_first(&self.tables().documents, |row| row.created_at))
    }

    async fn documents_for_client(
        &self,
        client_id: &ClientId,
    ) -> Result<Vec<Document>, RepositoryError> {
        let owned: Vec<Document> = self
            .tables()
            .documents
            .iter()
            .filter(|document| &document.client_id == client_id)
            .cloned()
            .collect();
        Ok(newest_first(&owned, |row| row.created_at))
    }

    async fn fetch_document(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError> {
        Ok(self
            .tables()
            .documents
            .iter()
            .find(|document| &document.id == id)
            .cloned())
    }

    async fn update_document(&self, document: Document) -> Result<Document, RepositoryError> {
        let mut tables = self.tables();
        let slot = tables
            .documents
            .iter_mut()
            .find(|stored| stored.id == document.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = document.clone();
        Ok(document)
    }

    async fn insert_document(&self, document: NewDocument) -> Result<Document, RepositoryError> {
        let record = Document {
            id: DocumentId(new_id()),
            client_id: document.client_id,
            application_id: None,
            document_type: document.document_type,
            file_name: document.file_name,
            file_path: document.file_path,
            file_size: document.file_size,
            mime_type: document.mime_type,
            is_verified: false,
            verified_by: None,
            verified_at: None,
            created_at: Utc::now(),
        };
        self.tables().documents.push(record.clone());
        Ok(record)
    }

    async fn delete_document(&self, id: &DocumentId) -> Result<(), RepositoryError> {
        let mut tables = self.tables();
        let before = tables.documents.len();
        tables.documents.retain(|document| &document.id != id);
        if tables.documents.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentRepository for InMemoryBackend {
    async fn list_payments(&self) -> Result<Vec<Payment>, RepositoryError> {
        Ok(newest_first(&self.tables().payments, |row| row.created_at))
    }

    async fn fetch_payment(&self, id: &PaymentId) -> Result<Option<Payment>, RepositoryError> {
        Ok(self
            .tables()
            .payments
            .iter()
            .find(|payment| &payment.id == id)
            .cloned())
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, RepositoryError> {
        let record = Payment {
            id: PaymentId(new_id()),
            client_id: payment.client_id,
            application_id: None,
            phase: payment.phase,
            amount: payment.amount,
            currency: payment.currency,
            status: payment.status,
            payment_date: None,
            verified_by: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.tables().payments.push(record.clone());
        Ok(record)
    }

    async fn update_payment(&self, payment: Payment) -> Result<Payment, RepositoryError> {
        let mut tables = self.tables();
        let slot = tables
            .payments
            .iter_mut()
            .find(|stored| stored.id == payment.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = payment.clone();
        Ok(payment)
    }
}

#[async_trait]
impl DocumentStorage for InMemoryBackend {
    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::Rejected(format!("'{path}' is empty")));
        }
        self.tables().objects.insert(
            (bucket, path.to_string()),
            StoredObject {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        Ok(path.to_string())
    }

    async fn download(&self, bucket: Bucket, path: &str) -> Result<StoredObject, StorageError> {
        self.object(bucket, path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn remove(&self, bucket: Bucket, path: &str) -> Result<(), StorageError> {
        self.tables().objects.remove(&(bucket, path.to_string()));
        Ok(())
    }
}

/// Postings used by the demo command and the development server.
pub fn sample_jobs() -> Vec<JobDraft> {
    let job = |title: &str, company: Option<&str>, country: &str, description: &str, salary: &str| {
        JobDraft {
            id: None,
            title: title.to_string(),
            company: company.map(str::to_string),
            location: None,
            country: country.to_string(),
            job_type: "Full-time".to_string(),
            description: description.to_string(),
            requirements: None,
            salary_range: Some(salary.to_string()),
            is_active: true,
        }
    };

    vec![
        job(
            "Industrial Electrician",
            Some("Voltwerk BV"),
            "Netherlands",
            "Install and maintain electrical wiring in production halls.",
            "€2,800 - €3,400/month",
        ),
        job(
            "Plumber",
            None,
            "Poland",
            "Pipe fitting and plumbing maintenance for residential blocks.",
            "€1,900 - €2,300/month",
        ),
        job(
            "Warehouse Operative",
            Some("NordLog"),
            "Germany",
            "Picking, packing, and forklift work in a logistics centre.",
            "€2,200/month",
        ),
        job(
            "Care Assistant",
            Some("Zorg Samen"),
            "Netherlands",
            "Support elderly residents with daily care and nursing tasks.",
            "€2,400/month",
        ),
        job(
            "Construction Welder",
            Some("Budmax"),
            "Poland",
            "MIG and TIG welding on steel structures at construction sites.",
            "€2,100 - €2,600/month",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::admin::domain::ClientRole;
    use crate::workflows::applications::domain::ApplicationStatus;
    use crate::workflows::conversation::domain::PathId;
    use serde_json::Map;

    fn new_client(email: &str) -> NewClient {
        NewClient {
            auth_user_id: None,
            email: email.to_string(),
            full_name: "Ada Obi".to_string(),
            phone: None,
            nationality: Some("Nigeria".to_string()),
            role: ClientRole::Workforce,
        }
    }

    #[tokio::test]
    async fn active_jobs_exclude_inactive_postings() {
        let backend = InMemoryBackend::with_sample_jobs();
        let mut hidden = sample_jobs().remove(0);
        hidden.title = "Closed role".to_string();
        hidden.is_active = false;
        backend.seed_job(hidden);

        let active = backend.active_jobs().await.expect("jobs load");
        assert_eq!(active.len(), sample_jobs().len());
        assert!(active.iter().all(|job| job.is_active));
        assert_eq!(backend.list_jobs().await.expect("jobs load").len(), 6);
    }

    #[tokio::test]
    async fn offline_jobs_fail_lookups() {
        let backend = InMemoryBackend::with_sample_jobs();
        backend.set_jobs_offline(true);
        assert!(matches!(
            backend.active_jobs().await,
            Err(RepositoryError::Unavailable(_))
        ));
        backend.set_jobs_offline(false);
        assert!(backend.active_jobs().await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_signup_email_conflicts() {
        let backend = InMemoryBackend::new();
        backend
            .insert_client(new_client("ada@example.com"))
            .await
            .expect("first signup");
        assert_eq!(
            backend.insert_client(new_client("ADA@example.com")).await,
            Err(RepositoryError::Conflict)
        );
    }

    #[tokio::test]
    async fn applications_list_newest_first_and_filter_by_client() {
        let backend = InMemoryBackend::new();
        let client = backend.seed_client(new_client("ada@example.com"));
        let first = backend
            .insert_application(NewApplication {
                client_id: Some(client.id.clone()),
                user_path: PathId::WorkerJob,
                data: Map::new(),
                status: ApplicationStatus::Pending,
            })
            .await
            .expect("insert");
        let second = backend
            .insert_application(NewApplication {
                client_id: None,
                user_path: PathId::StudentUniversity,
                data: Map::new(),
                status: ApplicationStatus::Pending,
            })
            .await
            .expect("insert");

        let listed = backend.list_applications().await.expect("list");
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);

        let owned = backend
            .applications_for_client(&client.id)
            .await
            .expect("list");
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, first.id);
    }

    #[tokio::test]
    async fn deleting_a_missing_job_reports_not_found() {
        let backend = InMemoryBackend::new();
        let result = backend
            .delete_job(&JobId("missing".to_string()))
            .await;
        assert_eq!(result, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn uploads_keep_content_type() {
        let backend = InMemoryBackend::new();
        let stored = backend
            .upload(
                Bucket::Attachments,
                "applications/1-cv.pdf",
                "application/pdf",
                b"%PDF".to_vec(),
            )
            .await
            .expect("upload");
        assert_eq!(stored, "applications/1-cv.pdf");
        let object = backend
            .download(Bucket::Attachments, &stored)
            .await
            .expect("object stored");
        assert_eq!(object.content_type, "application/pdf");
        assert!(backend
            .upload(Bucket::Attachments, "applications/2-empty.txt", "text/plain", Vec::new())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn buckets_keep_objects_apart() {
        let backend = InMemoryBackend::new();
        backend
            .upload(Bucket::ClientDocuments, "user-1/passport.pdf", "application/pdf", b"%PDF".to_vec())
            .await
            .expect("upload");
        assert!(backend.object(Bucket::Attachments, "user-1/passport.pdf").is_none());
        assert_eq!(
            backend.download(Bucket::Attachments, "user-1/passport.pdf").await,
            Err(StorageError::NotFound("user-1/passport.pdf".to_string()))
        );

        backend
            .remove(Bucket::ClientDocuments, "user-1/passport.pdf")
            .await
            .expect("remove");
        assert_eq!(backend.object_count(), 0);
        backend
            .remove(Bucket::ClientDocuments, "user-1/passport.pdf")
            .await
            .expect("removing twice is fine");
    }
}
