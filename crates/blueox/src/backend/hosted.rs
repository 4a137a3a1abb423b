//! REST client for the hosted database and object storage.
//!
//! Tables live under `{url}/rest/v1/{table}` and are filtered with
//! `column=eq.value` query pairs; objects live under
//! `{url}/storage/v1/object/{bucket}/{path}`. Every request carries the
//! `apikey` header and the same key as a bearer token.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::BackendError;
use crate::config::{BackendConfig, DEFAULT_CLIENT_DOCUMENTS_BUCKET, DEFAULT_DOCUMENTS_BUCKET};
use crate::workflows::admin::domain::{
    Client, ClientId, Document, DocumentId, NewClient, NewDocument, NewPayment, Payment, PaymentId,
};
use crate::workflows::admin::repository::{ClientRepository, DocumentRepository, PaymentRepository};
use crate::workflows::applications::domain::{Application, ApplicationId, NewApplication};
use crate::workflows::applications::repository::{
    ApplicationRepository, Bucket, DocumentStorage, RepositoryError, StorageError, StoredObject,
};
use crate::workflows::jobs::{JobDraft, JobId, JobPosting, JobRepository};

const APPLICATIONS: &str = "applications";
const JOBS: &str = "jobs";
const CLIENTS: &str = "clients";
const DOCUMENTS: &str = "documents";
const PAYMENTS: &str = "payments";

const USER_AGENT: &str = concat!("blueox/", env!("CARGO_PKG_VERSION"));
const NEWEST_FIRST: (&str, &str) = ("order", "created_at.desc");

/// Backend client for the hosted relational store and file bucket.
#[derive(Debug, Clone)]
pub struct HostedBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    attachments_bucket: String,
    client_documents_bucket: String,
}

impl HostedBackend {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            attachments_bucket: DEFAULT_DOCUMENTS_BUCKET.to_string(),
            client_documents_bucket: DEFAULT_CLIENT_DOCUMENTS_BUCKET.to_string(),
        }
    }

    pub fn with_buckets(
        mut self,
        attachments: impl Into<String>,
        client_documents: impl Into<String>,
    ) -> Self {
        self.attachments_bucket = attachments.into();
        self.client_documents_bucket = client_documents.into();
        self
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let url = config
            .url
            .as_deref()
            .ok_or(BackendError::MissingSetting("BACKEND_URL"))?;
        let key = config
            .anon_key
            .as_deref()
            .ok_or(BackendError::MissingSetting("BACKEND_ANON_KEY"))?;
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(client, url, key).with_buckets(
            config.documents_bucket.clone(),
            config.client_documents_bucket.clone(),
        ))
    }

    fn bucket_name(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Attachments => &self.attachments_bucket,
            Bucket::ClientDocuments => &self.client_documents_bucket,
        }
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    pub fn object_url(&self, bucket: Bucket, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            self.bucket_name(bucket),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, RepositoryError> {
        let mut query: Vec<(&str, String)> = vec![("select", "*".to_string())];
        query.extend(filters.iter().cloned());

        let response = self
            .request(Method::GET, self.table_url(table))
            .query(&query)
            .send()
            .await
            .map_err(unavailable)?;
        let rows = read_rows(response).await?;
        debug!(table, rows = rows.len(), "backend select");
        Ok(rows)
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
    ) -> Result<Option<T>, RepositoryError> {
        let rows = self.select(table, &[("id", format!("eq.{id}"))]).await?;
        Ok(rows.into_iter().next())
    }

    async fn write<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        table: &str,
        id: Option<&str>,
        body: &B,
    ) -> Result<T, RepositoryError> {
        let mut request = self
            .request(method, self.table_url(table))
            .header("Prefer", "return=representation");
        if let Some(id) = id {
            request = request.query(&[("id", format!("eq.{id}"))]);
        }

        let response = request.json(body).send().await.map_err(unavailable)?;
        read_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or(RepositoryError::NotFound)
    }

    async fn insert<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, RepositoryError> {
        self.write(Method::POST, table, None, body).await
    }

    async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        table: &str,
        id: &str,
        body: &B,
    ) -> Result<T, RepositoryError> {
        self.write(Method::PATCH, table, Some(id), body).await
    }
}

async fn read_rows<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<Vec<T>, RepositoryError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), %body, "backend request rejected");
        return Err(map_status(status, body));
    }
    response
        .json::<Vec<T>>()
        .await
        .map_err(|error| RepositoryError::Rejected(format!("unexpected row shape: {error}")))
}

/// 404 and 409 keep their meaning; other client errors are rejections.
pub fn map_status(status: StatusCode, body: String) -> RepositoryError {
    match status {
        StatusCode::NOT_FOUND => RepositoryError::NotFound,
        StatusCode::CONFLICT => RepositoryError::Conflict,
        status if status.is_client_error() => RepositoryError::Rejected(body),
        status => RepositoryError::Unavailable(format!("status {}: {body}", status.as_u16())),
    }
}

fn unavailable(error: reqwest::Error) -> RepositoryError {
    RepositoryError::Unavailable(error.to_string())
}

async fn storage_failure(response: reqwest::Response, path: &str) -> StorageError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), path, %body, "storage request rejected");
    match status {
        StatusCode::NOT_FOUND => StorageError::NotFound(path.to_string()),
        status if status.is_client_error() => StorageError::Rejected(body),
        status => StorageError::Unavailable(format!("status {}: {body}", status.as_u16())),
    }
}

fn storage_unavailable(error: reqwest::Error) -> StorageError {
    StorageError::Unavailable(error.to_string())
}

#[async_trait]
impl ApplicationRepository for HostedBackend {
    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError> {
        self.insert(APPLICATIONS, &application).await
    }

    async fn update_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let body = json!({
            "status": application.status,
            "data": application.data,
            "updated_at": application.updated_at.unwrap_or_else(Utc::now),
        });
        self.patch(APPLICATIONS, &application.id.0, &body).await
    }

    async fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        self.select_one(APPLICATIONS, &id.0).await
    }

    async fn list_applications(&self) -> Result<Vec<Application>, RepositoryError> {
        self.select(APPLICATIONS, &[(NEWEST_FIRST.0, NEWEST_FIRST.1.to_string())])
            .await
    }

    async fn applications_for_client(
        &self,
        client_id: &ClientId,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.select(
            APPLICATIONS,
            &[
                ("client_id", format!("eq.{client_id}")),
                (NEWEST_FIRST.0, NEWEST_FIRST.1.to_string()),
            ],
        )
        .await
    }
}

#[async_trait]
impl JobRepository for HostedBackend {
    async fn active_jobs(&self) -> Result<Vec<JobPosting>, RepositoryError> {
        self.select(
            JOBS,
            &[
                ("is_active", "eq.true".to_string()),
                (NEWEST_FIRST.0, NEWEST_FIRST.1.to_string()),
            ],
        )
        .await
    }

    async fn list_jobs(&self) -> Result<Vec<JobPosting>, RepositoryError> {
        self.select(JOBS, &[(NEWEST_FIRST.0, NEWEST_FIRST.1.to_string())])
            .await
    }

    async fn insert_job(&self, draft: JobDraft) -> Result<JobPosting, RepositoryError> {
        let draft = JobDraft { id: None, ..draft };
        self.insert(JOBS, &draft).await
    }

    async fn update_job(&self, id: &JobId, draft: JobDraft) -> Result<JobPosting, RepositoryError> {
        let mut body = serde_json::to_value(JobDraft { id: None, ..draft })
            .map_err(|error| RepositoryError::Rejected(error.to_string()))?;
        if let Value::Object(fields) = &mut body {
            fields.insert("updated_at".to_string(), json!(Utc::now()));
        }
        self.patch(JOBS, &id.0, &body).await
    }

    async fn delete_job(&self, id: &JobId) -> Result<(), RepositoryError> {
        let _: JobPosting = self.write(Method::DELETE, JOBS, Some(&id.0), &json!({})).await?;
        Ok(())
    }
}

#[async_trait]
impl ClientRepository for HostedBackend {
    async fn insert_client(&self, client: NewClient) -> Result<Client, RepositoryError> {
        self.insert(CLIENTS, &client).await
    }

    async fn fetch_client(&self, id: &ClientId) -> Result<Option<Client>, RepositoryError> {
        self.select_one(CLIENTS, &id.0).await
    }

    async fn list_clients(&self) -> Result<Vec<Client>, RepositoryError> {
        self.select(CLIENTS, &[(NEWEST_FIRST.0, NEWEST_FIRST.1.to_string())])
            .await
    }
}

#[async_trait]
impl DocumentRepository for HostedBackend {
    async fn list_documents(&self) -> Result<Vec<Document>, RepositoryError> {
        self.select(DOCUMENTS, &[(NEWEST_FIRST.0, NEWEST_FIRST.1.to_string())])
            .await
    }

    async fn documents_for_client(
        &self,
        client_id: &ClientId,
    ) -> Result<Vec<Document>, RepositoryError> {
        self.select(
            DOCUMENTS,
            &[
                ("client_id", format!("eq.{client_id}")),
                (NEWEST_FIRST.0, NEWEST_FIRST.1.to_string()),
            ],
        )
        .await
    }

    async fn fetch_document(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError> {
        self.select_one(DOCUMENTS, &id.0).await
    }

    async fn update_document(&self, document: Document) -> Result<Document, RepositoryError> {
        let body = json!({
            "is_verified": document.is_verified,
            "verified_by": document.verified_by,
            "verified_at": document.verified_at,
        });
        self.patch(DOCUMENTS, &document.id.0, &body).await
    }

    async fn insert_document(&self, document: NewDocument) -> Result<Document, RepositoryError> {
        self.insert(DOCUMENTS, &document).await
    }

    async fn delete_document(&self, id: &DocumentId) -> Result<(), RepositoryError> {
        let _: Document = self
            .write(Method::DELETE, DOCUMENTS, Some(&id.0), &json!({}))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PaymentRepository for HostedBackend {
    async fn list_payments(&self) -> Result<Vec<Payment>, RepositoryError> {
        self.select(PAYMENTS, &[(NEWEST_FIRST.0, NEWEST_FIRST.1.to_string())])
            .await
    }

    async fn fetch_payment(&self, id: &PaymentId) -> Result<Option<Payment>, RepositoryError> {
        self.select_one(PAYMENTS, &id.0).await
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, RepositoryError> {
        self.insert(PAYMENTS, &payment).await
    }

    async fn update_payment(&self, payment: Payment) -> Result<Payment, RepositoryError> {
        let body = json!({
            "status": payment.status,
            "verified_by": payment.verified_by,
            "updated_at": payment.updated_at.unwrap_or_else(Utc::now),
        });
        self.patch(PAYMENTS, &payment.id.0, &body).await
    }
}

#[async_trait]
impl DocumentStorage for HostedBackend {
    /// Client documents overwrite an existing object; attachments never do.
    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let upsert = bucket == Bucket::ClientDocuments;
        let response = self
            .request(Method::POST, self.object_url(bucket, path))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", upsert.to_string())
            .body(bytes)
            .send()
            .await
            .map_err(storage_unavailable)?;

        if response.status().is_success() {
            return Ok(path.to_string());
        }
        Err(storage_failure(response, path).await)
    }

    async fn download(&self, bucket: Bucket, path: &str) -> Result<StoredObject, StorageError> {
        let response = self
            .request(Method::GET, self.object_url(bucket, path))
            .send()
            .await
            .map_err(storage_unavailable)?;
        if !response.status().is_success() {
            return Err(storage_failure(response, path).await);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(mime::APPLICATION_OCTET_STREAM.essence_str())
            .to_string();
        let bytes = response.bytes().await.map_err(storage_unavailable)?;
        Ok(StoredObject {
            content_type,
            bytes: bytes.to_vec(),
        })
    }

    async fn remove(&self, bucket: Bucket, path: &str) -> Result<(), StorageError> {
        let response = self
            .request(Method::DELETE, self.object_url(bucket, path))
            .send()
            .await
            .map_err(storage_unavailable)?;
        match response.status() {
            status if status.is_success() || status == StatusCode::NOT_FOUND => Ok(()),
            _ => Err(storage_failure(response, path).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_follow_the_rest_and_storage_layout() {
        let backend = HostedBackend::new("https://project.backend.test/", "anon");
        assert_eq!(
            backend.table_url("jobs"),
            "https://project.backend.test/rest/v1/jobs"
        );
        assert_eq!(
            backend.object_url(Bucket::Attachments, "/applications/1-cv.pdf"),
            "https://project.backend.test/storage/v1/object/documents/applications/1-cv.pdf"
        );
        assert_eq!(
            backend.object_url(Bucket::ClientDocuments, "user-1/Ada_Passport.pdf"),
            "https://project.backend.test/storage/v1/object/client-documents/user-1/Ada_Passport.pdf"
        );
    }

    #[test]
    fn configured_buckets_override_the_defaults() {
        let backend = HostedBackend::new("https://project.backend.test", "anon")
            .with_buckets("uploads", "safe");
        assert_eq!(
            backend.object_url(Bucket::Attachments, "a.pdf"),
            "https://project.backend.test/storage/v1/object/uploads/a.pdf"
        );
        assert_eq!(
            backend.object_url(Bucket::ClientDocuments, "b.pdf"),
            "https://project.backend.test/storage/v1/object/safe/b.pdf"
        );
    }

    #[test]
    fn status_codes_map_to_repository_errors() {
        assert_eq!(
            map_status(StatusCode::NOT_FOUND, String::new()),
            RepositoryError::NotFound
        );
        assert_eq!(
            map_status(StatusCode::CONFLICT, String::new()),
            RepositoryError::Conflict
        );
        assert_eq!(
            map_status(StatusCode::UNPROCESSABLE_ENTITY, "bad row".to_string()),
            RepositoryError::Rejected("bad row".to_string())
        );
        assert!(matches!(
            map_status(StatusCode::SERVICE_UNAVAILABLE, String::new()),
            RepositoryError::Unavailable(_)
        ));
    }

    #[test]
    fn from_config_requires_url_and_key() {
        let config = BackendConfig {
            url: Some("https://project.backend.test".to_string()),
            anon_key: None,
            documents_bucket: "documents".to_string(),
            client_documents_bucket: "client-documents".to_string(),
        };
        assert!(matches!(
            HostedBackend::from_config(&config),
            Err(BackendError::MissingSetting("BACKEND_ANON_KEY"))
        ));
    }
}
