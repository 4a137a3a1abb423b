use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;

use super::domain::{AnswerValue, FormSubmission, PathId};
use super::draft::DraftStore;
use super::engine::ConversationError;
use super::session::{ConversationService, SessionError, SessionId, UserEvent};
use crate::workflows::admin::domain::ClientId;
use crate::workflows::applications::{ApplicationRepository, DocumentStorage, UploadedFile};
use crate::workflows::jobs::{JobId, JobRepository};

/// Header carrying the signed-in client, when there is one.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Catalog and conversation endpoints.
pub fn conversation_router<J, R, S, D>(service: Arc<ConversationService<J, R, S, D>>) -> Router
where
    J: JobRepository + 'static,
    R: ApplicationRepository + 'static,
    S: DocumentStorage + 'static,
    D: DraftStore + 'static,
{
    Router::new()
        .route("/api/v1/paths", get(paths_handler::<J, R, S, D>))
        .route("/api/v1/paths/:path_id", get(path_handler::<J, R, S, D>))
        .route("/api/v1/conversations", post(open_handler::<J, R, S, D>))
        .route(
            "/api/v1/conversations/:session_id",
            get(view_handler::<J, R, S, D>).delete(close_handler::<J, R, S, D>),
        )
        .route(
            "/api/v1/conversations/:session_id/events",
            post(event_handler::<J, R, S, D>),
        )
        .route(
            "/api/v1/conversations/:session_id/resume",
            post(resume_handler::<J, R, S, D>),
        )
        .with_state(service)
}

/// Wire shape of a visitor action.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventRequest {
    SelectPath {
        path: PathId,
    },
    Answer {
        value: AnswerValue,
    },
    SelectJob {
        job_id: JobId,
    },
    DeclineJobs,
    Submit {
        #[serde(default)]
        values: BTreeMap<String, String>,
        #[serde(default)]
        uploads: Vec<UploadRequest>,
    },
    Reset,
}

/// Attachment with base64 content.
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub field: String,
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl EventRequest {
    fn into_user_event(self) -> Result<UserEvent, String> {
        Ok(match self {
            EventRequest::SelectPath { path } => UserEvent::SelectPath(path),
            EventRequest::Answer { value } => UserEvent::Answer(value),
            EventRequest::SelectJob { job_id } => UserEvent::SelectJob(job_id),
            EventRequest::DeclineJobs => UserEvent::DeclineJobs,
            EventRequest::Submit { values, uploads } => {
                let uploads = uploads
                    .into_iter()
                    .map(|upload| {
                        let bytes = STANDARD.decode(upload.content.trim()).map_err(|error| {
                            format!("upload '{}' is not valid base64: {error}", upload.field)
                        })?;
                        Ok(UploadedFile {
                            field: upload.field,
                            file_name: upload.file_name,
                            content_type: upload.content_type,
                            bytes,
                        })
                    })
                    .collect::<Result<Vec<_>, String>>()?;
                UserEvent::Submit {
                    form: FormSubmission {
                        values,
                        uploaded_fields: Vec::new(),
                    },
                    uploads,
                }
            }
            EventRequest::Reset => UserEvent::Reset,
        })
    }
}

pub(crate) async fn paths_handler<J, R, S, D>(
    State(service): State<Arc<ConversationService<J, R, S, D>>>,
) -> Response
where
    J: JobRepository + 'static,
    R: ApplicationRepository + 'static,
    S: DocumentStorage + 'static,
    D: DraftStore + 'static,
{
    let paths = service.catalog().paths();
    (StatusCode::OK, axum::Json(json!({ "paths": paths }))).into_response()
}

pub(crate) async fn path_handler<J, R, S, D>(
    State(service): State<Arc<ConversationService<J, R, S, D>>>,
    Path(path_id): Path<String>,
) -> Response
where
    J: JobRepository + 'static,
    R: ApplicationRepository + 'static,
    S: DocumentStorage + 'static,
    D: DraftStore + 'static,
{
    let config = path_id
        .parse::<PathId>()
        .ok()
        .and_then(|path| service.catalog().get(path));
    match config {
        Some(config) => (StatusCode::OK, axum::Json(config)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("unknown path '{path_id}'")),
    }
}

pub(crate) async fn open_handler<J, R, S, D>(
    State(service): State<Arc<ConversationService<J, R, S, D>>>,
    headers: HeaderMap,
) -> Response
where
    J: JobRepository + 'static,
    R: ApplicationRepository + 'static,
    S: DocumentStorage + 'static,
    D: DraftStore + 'static,
{
    let client_id = headers
        .get(CLIENT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| ClientId(value.to_string()));

    let view = service.open(client_id).await;
    (StatusCode::CREATED, axum::Json(view)).into_response()
}

pub(crate) async fn view_handler<J, R, S, D>(
    State(service): State<Arc<ConversationService<J, R, S, D>>>,
    Path(session_id): Path<String>,
) -> Response
where
    J: JobRepository + 'static,
    R: ApplicationRepository + 'static,
    S: DocumentStorage + 'static,
    D: DraftStore + 'static,
{
    session_response(service.view(&SessionId(session_id)).await)
}

pub(crate) async fn event_handler<J, R, S, D>(
    State(service): State<Arc<ConversationService<J, R, S, D>>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<EventRequest>,
) -> Response
where
    J: JobRepository + 'static,
    R: ApplicationRepository + 'static,
    S: DocumentStorage + 'static,
    D: DraftStore + 'static,
{
    let event = match request.into_user_event() {
        Ok(event) => event,
        Err(reason) => return error_response(StatusCode::UNPROCESSABLE_ENTITY, reason),
    };
    session_response(service.handle(&SessionId(session_id), event).await)
}

pub(crate) async fn resume_handler<J, R, S, D>(
    State(service): State<Arc<ConversationService<J, R, S, D>>>,
    Path(session_id): Path<String>,
) -> Response
where
    J: JobRepository + 'static,
    R: ApplicationRepository + 'static,
    S: DocumentStorage + 'static,
    D: DraftStore + 'static,
{
    session_response(service.resume(&SessionId(session_id)).await)
}

/// Ends a conversation; resetting goes through the `reset` event instead.
pub(crate) async fn close_handler<J, R, S, D>(
    State(service): State<Arc<ConversationService<J, R, S, D>>>,
    Path(session_id): Path<String>,
) -> Response
where
    J: JobRepository + 'static,
    R: ApplicationRepository + 'static,
    S: DocumentStorage + 'static,
    D: DraftStore + 'static,
{
    let id = SessionId(session_id);
    if service.close(&id) {
        tracing::info!(session_id = %id, "conversation closed");
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "error": format!("session '{id}' not found") })),
        )
            .into_response()
    }
}

fn session_response(
    result: Result<super::session::ConversationView, SessionError>,
) -> Response {
    match result {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error @ (SessionError::NotFound(_) | SessionError::NoDraft(_))) => {
            error_response(StatusCode::NOT_FOUND, error.to_string())
        }
        Err(SessionError::Conversation(error @ ConversationError::UnexpectedEvent { .. })) => {
            error_response(StatusCode::CONFLICT, error.to_string())
        }
        Err(SessionError::Conversation(error)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, axum::Json(json!({ "error": message }))).into_response()
}
