use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};

use super::console::{AdminConsole, AdminError};
use super::domain::{Client, ClientId, DocumentId, NewClient, PaymentId, PaymentStatus};
use super::repository::AdminStore;
use crate::workflows::applications::domain::{ApplicationId, ApplicationStatus};
use crate::workflows::applications::{RepositoryError, StorageError, UploadedFile};
use crate::workflows::conversation::CLIENT_ID_HEADER;
use crate::workflows::jobs::{JobDraft, JobId};

/// Review console, client portal, and signup endpoints.
pub fn admin_router<B>(console: Arc<AdminConsole<B>>) -> Router
where
    B: AdminStore + 'static,
{
    Router::new()
        .route("/api/v1/clients", post(register_handler::<B>))
        .route("/api/v1/portal/:client_id", get(portal_handler::<B>))
        .route(
            "/api/v1/portal/:client_id/documents",
            post(upload_document_handler::<B>),
        )
        .route(
            "/api/v1/portal/:client_id/documents/:document_id",
            get(download_document_handler::<B>).delete(delete_document_handler::<B>),
        )
        .route("/api/v1/admin/dashboard", get(dashboard_handler::<B>))
        .route("/api/v1/admin/applications", get(search_handler::<B>))
        .route(
            "/api/v1/admin/applications/:application_id",
            get(application_handler::<B>).patch(edit_handler::<B>),
        )
        .route(
            "/api/v1/admin/applications/:application_id/status",
            put(status_handler::<B>),
        )
        .route(
            "/api/v1/admin/documents/:document_id/verify",
            post(verify_handler::<B>),
        )
        .route("/api/v1/admin/payments", post(add_payment_handler::<B>))
        .route(
            "/api/v1/admin/payments/:payment_id/status",
            put(payment_status_handler::<B>),
        )
        .route("/api/v1/admin/jobs", post(save_job_handler::<B>))
        .route("/api/v1/admin/jobs/:job_id", axum::routing::delete(delete_job_handler::<B>))
        .with_state(console)
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest<S> {
    pub status: S,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub fields: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub client_id: ClientId,
    pub phase: u8,
    pub amount: f64,
}

/// Document-safe upload with base64 content.
#[derive(Debug, Deserialize)]
pub struct DocumentUploadRequest {
    pub document_type: String,
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    pub content: String,
}

fn caller(headers: &HeaderMap) -> Option<ClientId> {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| ClientId(value.to_string()))
}

async fn require_admin<B>(console: &AdminConsole<B>, headers: &HeaderMap) -> Result<Client, Response>
where
    B: AdminStore + 'static,
{
    let Some(client_id) = caller(headers) else {
        return Err(admin_error_response(AdminError::Unauthorized));
    };
    console
        .authorize(&client_id)
        .await
        .map_err(admin_error_response)
}

pub(crate) async fn register_handler<B>(
    State(console): State<Arc<AdminConsole<B>>>,
    axum::Json(client): axum::Json<NewClient>,
) -> Response
where
    B: AdminStore + 'static,
{
    match console.register_client(client).await {
        Ok(client) => (StatusCode::CREATED, axum::Json(client)).into_response(),
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn portal_handler<B>(
    State(console): State<Arc<AdminConsole<B>>>,
    headers: HeaderMap,
    Path(client_id): Path<String>,
) -> Response
where
    B: AdminStore + 'static,
{
    let client_id = ClientId(client_id);
    let Some(caller_id) = caller(&headers) else {
        return admin_error_response(AdminError::Unauthorized);
    };
    if caller_id != client_id {
        if let Err(response) = require_admin(&console, &headers).await {
            return response;
        }
    }

    match console.portal(&client_id).await {
        Ok(portal) => (StatusCode::OK, axum::Json(portal)).into_response(),
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn upload_document_handler<B>(
    State(console): State<Arc<AdminConsole<B>>>,
    headers: HeaderMap,
    Path(client_id): Path<String>,
    axum::Json(request): axum::Json<DocumentUploadRequest>,
) -> Response
where
    B: AdminStore + 'static,
{
    let Some(caller_id) = caller(&headers) else {
        return admin_error_response(AdminError::Unauthorized);
    };
    let bytes = match STANDARD.decode(request.content.trim()) {
        Ok(bytes) => bytes,
        Err(error) => {
            return admin_error_response(AdminError::Invalid(format!(
                "document content is not valid base64: {error}"
            )))
        }
    };
    let file = UploadedFile {
        field: request.document_type,
        file_name: request.file_name,
        content_type: request.content_type,
        bytes,
    };

    match console
        .upload_client_document(&caller_id, &ClientId(client_id), file)
        .await
    {
        Ok(document) => (StatusCode::CREATED, axum::Json(document)).into_response(),
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn download_document_handler<B>(
    State(console): State<Arc<AdminConsole<B>>>,
    headers: HeaderMap,
    Path((client_id, document_id)): Path<(String, String)>,
) -> Response
where
    B: AdminStore + 'static,
{
    let Some(caller_id) = caller(&headers) else {
        return admin_error_response(AdminError::Unauthorized);
    };
    match console
        .download_client_document(&caller_id, &ClientId(client_id), &DocumentId(document_id))
        .await
    {
        Ok((document, object)) => {
            let content_type = HeaderValue::from_str(&object.content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
            let disposition = HeaderValue::from_str(&format!(
                "attachment; filename=\"{}\"",
                document.file_name.replace('"', "")
            ))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                object.bytes,
            )
                .into_response()
        }
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn delete_document_handler<B>(
    State(console): State<Arc<AdminConsole<B>>>,
    headers: HeaderMap,
    Path((client_id, document_id)): Path<(String, String)>,
) -> Response
where
    B: AdminStore + 'static,
{
    let Some(caller_id) = caller(&headers) else {
        return admin_error_response(AdminError::Unauthorized);
    };
    match console
        .delete_client_document(&caller_id, &ClientId(client_id), &DocumentId(document_id))
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn dashboard_handler<B>(
    State(console): State<Arc<AdminConsole<B>>>,
    headers: HeaderMap,
) -> Response
where
    B: AdminStore + 'static,
{
    if let Err(response) = require_admin(&console, &headers).await {
        return response;
    }
    match console.dashboard().await {
        Ok(snapshot) => (StatusCode::OK, axum::Json(snapshot)).into_response(),
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn search_handler<B>(
    State(console): State<Arc<AdminConsole<B>>>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Response
where
    B: AdminStore + 'static,
{
    if let Err(response) = require_admin(&console, &headers).await {
        return response;
    }
    match console.search_applications(&query.q).await {
        Ok(views) => (StatusCode::OK, axum::Json(json!({ "applications": views }))).into_response(),
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn application_handler<B>(
    State(console): State<Arc<AdminConsole<B>>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    B: AdminStore + 'static,
{
    if let Err(response) = require_admin(&console, &headers).await {
        return response;
    }
    match console.application(&ApplicationId(application_id)).await {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn edit_handler<B>(
    State(console): State<Arc<AdminConsole<B>>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<EditRequest>,
) -> Response
where
    B: AdminStore + 'static,
{
    if let Err(response) = require_admin(&console, &headers).await {
        return response;
    }
    match console
        .edit_application(&ApplicationId(application_id), request.fields)
        .await
    {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn status_handler<B>(
    State(console): State<Arc<AdminConsole<B>>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<StatusRequest<ApplicationStatus>>,
) -> Response
where
    B: AdminStore + 'static,
{
    if let Err(response) = require_admin(&console, &headers).await {
        return response;
    }
    match console
        .update_application_status(&ApplicationId(application_id), request.status)
        .await
    {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn verify_handler<B>(
    State(console): State<Arc<AdminConsole<B>>>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
) -> Response
where
    B: AdminStore + 'static,
{
    let admin = match require_admin(&console, &headers).await {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    match console
        .verify_document(&admin, &DocumentId(document_id))
        .await
    {
        Ok(document) => (StatusCode::OK, axum::Json(document)).into_response(),
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn add_payment_handler<B>(
    State(console): State<Arc<AdminConsole<B>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<PaymentRequest>,
) -> Response
where
    B: AdminStore + 'static,
{
    if let Err(response) = require_admin(&console, &headers).await {
        return response;
    }
    match console
        .add_payment(request.client_id, request.phase, request.amount)
        .await
    {
        Ok(payment) => (StatusCode::CREATED, axum::Json(payment)).into_response(),
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn payment_status_handler<B>(
    State(console): State<Arc<AdminConsole<B>>>,
    headers: HeaderMap,
    Path(payment_id): Path<String>,
    axum::Json(request): axum::Json<StatusRequest<PaymentStatus>>,
) -> Response
where
    B: AdminStore + 'static,
{
    let admin = match require_admin(&console, &headers).await {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    match console
        .update_payment_status(&admin, &PaymentId(payment_id), request.status)
        .await
    {
        Ok(payment) => (StatusCode::OK, axum::Json(payment)).into_response(),
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn save_job_handler<B>(
    State(console): State<Arc<AdminConsole<B>>>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<JobDraft>,
) -> Response
where
    B: AdminStore + 'static,
{
    if let Err(response) = require_admin(&console, &headers).await {
        return response;
    }
    let created = draft.id.is_none();
    match console.save_job(draft).await {
        Ok(job) => {
            let status = if created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, axum::Json(job)).into_response()
        }
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn delete_job_handler<B>(
    State(console): State<Arc<AdminConsole<B>>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Response
where
    B: AdminStore + 'static,
{
    if let Err(response) = require_admin(&console, &headers).await {
        return response;
    }
    match console.delete_job(&JobId(job_id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => admin_error_response(error),
    }
}

fn admin_error_response(error: AdminError) -> Response {
    let status = match &error {
        AdminError::Unauthorized => StatusCode::UNAUTHORIZED,
        AdminError::Forbidden(_) => StatusCode::FORBIDDEN,
        AdminError::NotFound { .. }
        | AdminError::Repository(RepositoryError::NotFound)
        | AdminError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
        AdminError::UnknownField { .. } | AdminError::RoleNotAllowed(_) | AdminError::Invalid(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AdminError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        AdminError::Repository(RepositoryError::Rejected(_))
        | AdminError::Storage(StorageError::Rejected(_)) => StatusCode::BAD_REQUEST,
        AdminError::Repository(RepositoryError::Unavailable(_))
        | AdminError::Storage(StorageError::Unavailable(_)) => StatusCode::BAD_GATEWAY,
    };
    (status, axum::Json(json!({ "error": error.to_string() }))).into_response()
}
