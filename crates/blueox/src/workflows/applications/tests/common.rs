use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::workflows::admin::domain::ClientId;
use crate::workflows::applications::domain::{
    Application, ApplicationId, ApplicationSubmission, NewApplication, SubmissionPayload,
    UploadedFile,
};
use crate::workflows::applications::repository::{
    ApplicationRepository, Bucket, DocumentStorage, RepositoryError, StorageError, StoredObject,
};
use crate::workflows::applications::SubmissionService;
use crate::workflows::conversation::domain::PathId;
use crate::workflows::jobs::JobId;

pub(super) fn payload() -> SubmissionPayload {
    let mut data = Map::new();
    data.insert("fullName".to_string(), json!("Chinedu Okafor"));
    data.insert("email".to_string(), json!("chinedu@example.com"));
    data.insert("whatsapp".to_string(), json!("+234 801 000 0000"));
    data.insert("targetCountries".to_string(), json!(["Netherlands"]));
    data.insert("skills".to_string(), json!(["Electricians"]));
    data.insert("userPath".to_string(), json!("worker_job"));
    data.insert("selectedJob".to_string(), json!("job-1"));
    data.insert("uploadedDocuments".to_string(), json!([]));
    SubmissionPayload {
        path: PathId::WorkerJob,
        selected_job: Some(JobId("job-1".to_string())),
        data,
    }
}

pub(super) fn upload(field: &str, file_name: &str) -> UploadedFile {
    UploadedFile {
        field: field.to_string(),
        file_name: file_name.to_string(),
        content_type: None,
        bytes: b"%PDF-1.7".to_vec(),
    }
}

pub(super) fn submission(uploads: Vec<UploadedFile>) -> ApplicationSubmission {
    ApplicationSubmission {
        payload: payload(),
        uploads,
        client_id: None,
    }
}

pub(super) fn build_service() -> (
    SubmissionService<MemoryApplications, MemoryStorage>,
    Arc<MemoryApplications>,
    Arc<MemoryStorage>,
) {
    let repository = Arc::new(MemoryApplications::default());
    let storage = Arc::new(MemoryStorage::default());
    let service = SubmissionService::new(repository.clone(), storage.clone());
    (service, repository, storage)
}

#[derive(Default, Clone)]
pub(super) struct MemoryApplications {
    pub(super) records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
}

impl MemoryApplications {
    pub(super) fn count(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

#[async_trait]
impl ApplicationRepository for MemoryApplications {
    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let id = ApplicationId(format!("app-{}", guard.len() + 1));
        let record = Application {
            id: id.clone(),
            client_id: application.client_id,
            user_path: application.user_path,
            data: application.data,
            status: application.status,
            created_at: Utc::now(),
            updated_at: None,
        };
        guard.insert(id, record.clone());
        Ok(record)
    }

    async fn update_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    async fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    async fn list_applications(&self) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    async fn applications_for_client(
        &self,
        client_id: &ClientId,
    ) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|application| application.client_id.as_ref() == Some(client_id))
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableApplications;

#[async_trait]
impl ApplicationRepository for UnavailableApplications {
    async fn insert_application(
        &self,
        _application: NewApplication,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn update_application(
        &self,
        _application: Application,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn fetch_application(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn list_applications(&self) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn applications_for_client(
        &self,
        _client_id: &ClientId,
    ) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Stores objects in memory; names listed in `reject` fail.
#[derive(Default, Clone)]
pub(super) struct MemoryStorage {
    pub(super) objects: Arc<Mutex<HashMap<String, (String, Vec<u8>)>>>,
    pub(super) reject: Vec<String>,
}

impl MemoryStorage {
    pub(super) fn rejecting(file_name: &str) -> Self {
        Self {
            reject: vec![file_name.to_string()],
            ..Self::default()
        }
    }

    pub(super) fn object_count(&self) -> usize {
        self.objects.lock().expect("storage mutex poisoned").len()
    }

    pub(super) fn content_types(&self) -> Vec<String> {
        let guard = self.objects.lock().expect("storage mutex poisoned");
        let mut types: Vec<String> = guard.values().map(|(kind, _)| kind.clone()).collect();
        types.sort();
        types
    }
}

#[async_trait]
impl DocumentStorage for MemoryStorage {
    async fn upload(
        &self,
        _bucket: Bucket,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        if self.reject.iter().any(|name| path.ends_with(name.as_str())) {
            return Err(StorageError::Rejected("bucket quota exceeded".to_string()));
        }
        self.objects
            .lock()
            .expect("storage mutex poisoned")
            .insert(path.to_string(), (content_type.to_string(), bytes));
        Ok(path.to_string())
    }

    async fn download(&self, _bucket: Bucket, path: &str) -> Result<StoredObject, StorageError> {
        let guard = self.objects.lock().expect("storage mutex poisoned");
        guard
            .get(path)
            .map(|(content_type, bytes)| StoredObject {
                content_type: content_type.clone(),
                bytes: bytes.clone(),
            })
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn remove(&self, _bucket: Bucket, path: &str) -> Result<(), StorageError> {
        self.objects
            .lock()
            .expect("storage mutex poisoned")
            .remove(path);
        Ok(())
    }
}

pub(super) fn document_paths(application: &Application) -> Vec<String> {
    application
        .data
        .get("documentPaths")
        .and_then(Value::as_array)
        .map(|paths| {
            paths
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
