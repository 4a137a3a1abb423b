use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use super::domain::{
    Client, ClientId, ClientRole, Document, DocumentId, NewClient, NewDocument, NewPayment,
    Payment, PaymentId, PaymentStatus,
};
use super::repository::AdminStore;
use super::views::{owner, ApplicationView, Attached, ClientPortal, DashboardCounts, DashboardSnapshot};
use crate::workflows::applications::domain::{
    Application, ApplicationId, ApplicationStatus, UploadedFile,
};
use crate::workflows::applications::service::sanitize;
use crate::workflows::applications::{Bucket, RepositoryError, StorageError, StoredObject};
use crate::workflows::conversation::domain::{AnswerValue, PathId};
use crate::workflows::conversation::engine::validate_answer;
use crate::workflows::conversation::PathCatalog;
use crate::workflows::jobs::{JobDraft, JobId, JobPosting};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdminError {
    #[error("caller is not signed in")]
    Unauthorized,
    #[error("client '{0}' may not use the review console")]
    Forbidden(ClientId),
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error("'{field}' is not a field of the {path} path")]
    UnknownField { field: String, path: PathId },
    #[error("role '{}' cannot be chosen at signup", .0.label())]
    RoleNotAllowed(ClientRole),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Storage(StorageError),
}

impl AdminError {
    fn not_found(kind: &'static str, id: impl ToString) -> Self {
        AdminError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<RepositoryError> for AdminError {
    fn from(error: RepositoryError) -> Self {
        warn!(%error, "admin backend call failed");
        AdminError::Repository(error)
    }
}

impl From<StorageError> for AdminError {
    fn from(error: StorageError) -> Self {
        warn!(%error, "document storage call failed");
        AdminError::Storage(error)
    }
}

/// Staff review operations over every persisted collection.
pub struct AdminConsole<B> {
    store: Arc<B>,
    catalog: Arc<PathCatalog>,
}

impl<B> AdminConsole<B>
where
    B: AdminStore + 'static,
{
    pub fn new(store: Arc<B>, catalog: Arc<PathCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Resolves the caller and requires the admin role.
    pub async fn authorize(&self, client_id: &ClientId) -> Result<Client, AdminError> {
        let client = self
            .store
            .fetch_client(client_id)
            .await?
            .ok_or(AdminError::Unauthorized)?;
        if !client.is_admin() {
            warn!(client_id = %client_id, role = client.role.label(), "review console refused");
            return Err(AdminError::Forbidden(client.id));
        }
        Ok(client)
    }

    pub async fn dashboard(&self) -> Result<DashboardSnapshot, AdminError> {
        let (mut clients, mut applications, mut documents, mut payments, mut jobs) = tokio::try_join!(
            self.store.list_clients(),
            self.store.list_applications(),
            self.store.list_documents(),
            self.store.list_payments(),
            self.store.list_jobs(),
        )?;

        clients.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        applications.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        documents.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        payments.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        jobs.sort_by(|left, right| right.created_at.cmp(&left.created_at));

        let applications: Vec<ApplicationView> = applications
            .iter()
            .map(|application| {
                self.render(application, owner(&clients, application.client_id.as_ref()))
            })
            .collect();
        let documents: Vec<Attached<Document>> = documents
            .into_iter()
            .map(|document| Attached {
                client: owner(&clients, Some(&document.client_id)).cloned(),
                record: document,
            })
            .collect();
        let payments: Vec<Attached<Payment>> = payments
            .into_iter()
            .map(|payment| Attached {
                client: owner(&clients, Some(&payment.client_id)).cloned(),
                record: payment,
            })
            .collect();

        let counts = DashboardCounts::tally(&clients, &applications, &documents, &payments, &jobs);
        Ok(DashboardSnapshot {
            clients,
            applications,
            documents,
            payments,
            jobs,
            counts,
        })
    }

    pub async fn application(&self, id: &ApplicationId) -> Result<ApplicationView, AdminError> {
        let application = self.load_application(id).await?;
        let applicant = match &application.client_id {
            Some(client_id) => self.store.fetch_client(client_id).await?,
            None => None,
        };
        Ok(self.render(&application, applicant.as_ref()))
    }

    pub async fn search_applications(&self, term: &str) -> Result<Vec<ApplicationView>, AdminError> {
        let snapshot = self.dashboard().await?;
        Ok(snapshot
            .applications
            .into_iter()
            .filter(|view| view.matches(term))
            .collect())
    }

    pub async fn update_application_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Application, AdminError> {
        let mut application = self.load_application(id).await?;
        application.status = status;
        application.updated_at = Some(Utc::now());
        let stored = self.store.update_application(application).await?;
        info!(application_id = %id, status = status.label(), "application status changed");
        Ok(stored)
    }

    /// Overwrites answer values; every key must be a field of the application's path
    /// and step answers must pass the same checks as in the conversation.
    pub async fn edit_application(
        &self,
        id: &ApplicationId,
        edits: BTreeMap<String, Value>,
    ) -> Result<Application, AdminError> {
        let mut application = self.load_application(id).await?;
        let path = application.user_path;
        let config = self
            .catalog
            .get(path)
            .ok_or_else(|| AdminError::Invalid(format!("path '{path}' has no field list")))?;

        let mut checked = BTreeMap::new();
        for (field, value) in edits {
            if !config.known_fields().any(|(known, _)| known == field.as_str()) {
                return Err(AdminError::UnknownField { field, path });
            }
            let value = match config.steps.iter().find(|step| step.field == field) {
                Some(step) => {
                    let answer: AnswerValue = serde_json::from_value(value).map_err(|_| {
                        AdminError::Invalid(format!("'{field}' must be text or a list of text"))
                    })?;
                    let answer = validate_answer(step, answer)
                        .map_err(|error| AdminError::Invalid(error.to_string()))?;
                    serde_json::to_value(answer)
                        .map_err(|error| AdminError::Invalid(error.to_string()))?
                }
                None => value,
            };
            checked.insert(field, value);
        }

        let edited = checked.len();
        application.data.extend(checked);
        application.updated_at = Some(Utc::now());
        let stored = self.store.update_application(application).await?;
        info!(application_id = %id, edited, "application fields edited");
        Ok(stored)
    }

    pub async fn verify_document(
        &self,
        verifier: &Client,
        id: &DocumentId,
    ) -> Result<Document, AdminError> {
        let mut document = self
            .store
            .fetch_document(id)
            .await?
            .ok_or_else(|| AdminError::not_found("document", &id.0))?;
        document.is_verified = true;
        document.verified_by = Some(verifier.id.clone());
        document.verified_at = Some(Utc::now());
        let stored = self.store.update_document(document).await?;
        info!(document_id = %id.0, verifier = %verifier.id, "document verified");
        Ok(stored)
    }

    /// The verifier is recorded only for `verified`; any other status clears it.
    pub async fn update_payment_status(
        &self,
        verifier: &Client,
        id: &PaymentId,
        status: PaymentStatus,
    ) -> Result<Payment, AdminError> {
        let mut payment = self
            .store
            .fetch_payment(id)
            .await?
            .ok_or_else(|| AdminError::not_found("payment", &id.0))?;
        payment.status = status;
        payment.verified_by = (status == PaymentStatus::Verified).then(|| verifier.id.clone());
        payment.updated_at = Some(Utc::now());
        Ok(self.store.update_payment(payment).await?)
    }

    pub async fn add_payment(
        &self,
        client_id: ClientId,
        phase: u8,
        amount: f64,
    ) -> Result<Payment, AdminError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AdminError::Invalid(
                "payment amount must be a positive number".to_string(),
            ));
        }
        if self.store.fetch_client(&client_id).await?.is_none() {
            return Err(AdminError::not_found("client", &client_id));
        }
        let payment = self
            .store
            .insert_payment(NewPayment::pending(client_id, phase, amount))
            .await?;
        info!(payment_id = %payment.id.0, phase, "payment added");
        Ok(payment)
    }

    /// Inserts when the draft has no id, otherwise updates in place.
    pub async fn save_job(&self, draft: JobDraft) -> Result<JobPosting, AdminError> {
        if draft.title.trim().is_empty() || draft.country.trim().is_empty() {
            return Err(AdminError::Invalid(
                "job title and country are required".to_string(),
            ));
        }

        let posting = match draft.id.clone() {
            Some(id) => self
                .store
                .update_job(&id, draft)
                .await
                .map_err(|error| match error {
                    RepositoryError::NotFound => AdminError::not_found("job", &id),
                    other => AdminError::from(other),
                })?,
            None => self.store.insert_job(draft).await?,
        };
        info!(job_id = %posting.id, active = posting.is_active, "job saved");
        Ok(posting)
    }

    pub async fn delete_job(&self, id: &JobId) -> Result<(), AdminError> {
        self.store.delete_job(id).await.map_err(|error| match error {
            RepositoryError::NotFound => AdminError::not_found("job", id),
            other => AdminError::from(other),
        })?;
        info!(job_id = %id, "job deleted");
        Ok(())
    }

    /// A client's own applications and documents.
    pub async fn portal(&self, client_id: &ClientId) -> Result<ClientPortal, AdminError> {
        let client = self
            .store
            .fetch_client(client_id)
            .await?
            .ok_or_else(|| AdminError::not_found("client", client_id))?;
        let (mut applications, mut documents) = tokio::try_join!(
            self.store.applications_for_client(client_id),
            self.store.documents_for_client(client_id),
        )?;
        applications.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        documents.sort_by(|left, right| right.created_at.cmp(&left.created_at));

        let applications = applications
            .iter()
            .map(|application| self.render(application, Some(&client)))
            .collect();
        Ok(ClientPortal {
            client,
            applications,
            documents,
        })
    }

    /// Stores a file in the owner's document safe and records its metadata.
    /// `file.field` carries the document type, e.g. `Passport`.
    pub async fn upload_client_document(
        &self,
        caller: &ClientId,
        owner: &ClientId,
        file: UploadedFile,
    ) -> Result<Document, AdminError> {
        let owner = self.document_owner(caller, owner).await?;
        let document_type = file.field.trim().to_string();
        if document_type.is_empty() {
            return Err(AdminError::Invalid("document type is required".to_string()));
        }
        if file.bytes.is_empty() {
            return Err(AdminError::Invalid("uploaded file is empty".to_string()));
        }

        let file_name = safe_file_name(&owner, &document_type, &file.file_name);
        let folder = owner.auth_user_id.as_deref().unwrap_or(owner.id.0.as_str());
        let file_path = format!("{folder}/{file_name}");
        let content_type = file.mime_type().to_string();
        let file_size = file.bytes.len() as u64;
        self.store
            .upload(Bucket::ClientDocuments, &file_path, &content_type, file.bytes)
            .await?;

        // Same path means the object was replaced; drop the stale row.
        let existing = self.store.documents_for_client(&owner.id).await?;
        for stale in existing.iter().filter(|document| document.file_path == file_path) {
            self.store.delete_document(&stale.id).await?;
        }

        let stored = self
            .store
            .insert_document(NewDocument {
                client_id: owner.id.clone(),
                document_type,
                file_name,
                file_path,
                file_size: Some(file_size),
                mime_type: Some(content_type),
            })
            .await?;
        info!(client_id = %owner.id, document_id = %stored.id.0, "client document uploaded");
        Ok(stored)
    }

    /// Removes the stored object, then its metadata row.
    pub async fn delete_client_document(
        &self,
        caller: &ClientId,
        owner: &ClientId,
        id: &DocumentId,
    ) -> Result<(), AdminError> {
        let document = self.owned_document(caller, owner, id).await?;
        self.store
            .remove(Bucket::ClientDocuments, &document.file_path)
            .await?;
        self.store.delete_document(&document.id).await?;
        info!(client_id = %owner, document_id = %id.0, "client document deleted");
        Ok(())
    }

    pub async fn download_client_document(
        &self,
        caller: &ClientId,
        owner: &ClientId,
        id: &DocumentId,
    ) -> Result<(Document, StoredObject), AdminError> {
        let document = self.owned_document(caller, owner, id).await?;
        let object = self
            .store
            .download(Bucket::ClientDocuments, &document.file_path)
            .await?;
        Ok((document, object))
    }

    /// The caller must be the owner or an admin.
    async fn document_owner(
        &self,
        caller: &ClientId,
        owner: &ClientId,
    ) -> Result<Client, AdminError> {
        let caller = self
            .store
            .fetch_client(caller)
            .await?
            .ok_or(AdminError::Unauthorized)?;
        if &caller.id != owner && !caller.is_admin() {
            warn!(client_id = %caller.id, owner = %owner, "document safe access refused");
            return Err(AdminError::Forbidden(caller.id));
        }
        if &caller.id == owner {
            return Ok(caller);
        }
        self.store
            .fetch_client(owner)
            .await?
            .ok_or_else(|| AdminError::not_found("client", owner))
    }

    async fn owned_document(
        &self,
        caller: &ClientId,
        owner: &ClientId,
        id: &DocumentId,
    ) -> Result<Document, AdminError> {
        self.document_owner(caller, owner).await?;
        self.store
            .fetch_document(id)
            .await?
            .filter(|document| &document.client_id == owner)
            .ok_or_else(|| AdminError::not_found("document", &id.0))
    }

    /// Signup for applicants; admin accounts are provisioned out of band.
    pub async fn register_client(&self, client: NewClient) -> Result<Client, AdminError> {
        if client.role == ClientRole::Admin {
            return Err(AdminError::RoleNotAllowed(client.role));
        }
        if client.full_name.trim().is_empty() {
            return Err(AdminError::Invalid("full name is required".to_string()));
        }
        if !client.email.contains('@') {
            return Err(AdminError::Invalid("email address is invalid".to_string()));
        }

        let stored = self.store.insert_client(client).await?;
        info!(client_id = %stored.id, role = stored.role.label(), "client registered");
        Ok(stored)
    }

    async fn load_application(&self, id: &ApplicationId) -> Result<Application, AdminError> {
        self.store
            .fetch_application(id)
            .await?
            .ok_or_else(|| AdminError::not_found("application", id))
    }

    fn render(&self, application: &Application, applicant: Option<&Client>) -> ApplicationView {
        ApplicationView::render(application, self.catalog.get(application.user_path), applicant)
    }
}

/// `{Full_Name}_{Type}.{ext}`, keeping the uploaded file's extension.
fn safe_file_name(owner: &Client, document_type: &str, original: &str) -> String {
    let name: String = owner
        .full_name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect();
    let stem = format!("{name}_{}", sanitize(document_type, "Other"));
    match original.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!("{stem}.{}", sanitize(ext, "bin")),
        _ => stem,
    }
}
