use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::catalog::PathCatalog;
use super::domain::{AnswerValue, CollectedAnswers, FormField, FormSubmission, PathId};
use super::draft::DraftStore;
use super::engine::{Conversation, ConversationError, ConversationEvent, ConversationState, Effect, Transition};
use super::messages::AssistantMessage;
use crate::workflows::admin::domain::ClientId;
use crate::workflows::applications::{
    ApplicationRepository, ApplicationSubmission, DocumentStorage, SubmissionService, UploadedFile,
};
use crate::workflows::jobs::{JobId, JobRepository};
use crate::workflows::matching::MatchingService;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One bubble in the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatEntry {
    User { content: String },
    Assistant(AssistantMessage),
}

/// Events a visitor can send; effect results are fed back internally.
#[derive(Debug, Clone, PartialEq)]
pub enum UserEvent {
    SelectPath(PathId),
    Answer(AnswerValue),
    SelectJob(JobId),
    DeclineJobs,
    Submit {
        form: FormSubmission,
        uploads: Vec<UploadedFile>,
    },
    Reset,
}

/// Snapshot returned to the client after every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationView {
    pub session_id: SessionId,
    pub path: Option<PathId>,
    #[serde(flatten)]
    pub state: ConversationState,
    pub progress: u8,
    pub answers: CollectedAnswers,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub form_fields: Vec<FormField>,
    pub transcript: Vec<ChatEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("conversation '{0}' not found")]
    NotFound(SessionId),
    #[error("no saved draft for conversation '{0}'")]
    NoDraft(SessionId),
    #[error(transparent)]
    Conversation(#[from] ConversationError),
}

struct Session {
    conversation: Conversation,
    client_id: Option<ClientId>,
    transcript: Vec<ChatEntry>,
}

impl Session {
    fn record(&mut self, transition: &Transition) {
        if let Some(echo) = &transition.echo {
            self.transcript.push(ChatEntry::User {
                content: echo.clone(),
            });
        }
        self.transcript.extend(
            transition
                .messages
                .iter()
                .cloned()
                .map(ChatEntry::Assistant),
        );
    }
}

type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

struct Registered {
    handle: SessionHandle,
    last_seen: DateTime<Utc>,
}

/// Sessions untouched for this long are dropped when new ones open.
pub const DEFAULT_IDLE_LIMIT_MINUTES: i64 = 120;

/// Owns live conversations and runs the effects their transitions request.
///
/// A session leaves the registry when it completes, redirects, is closed,
/// or sits idle past the idle limit.
pub struct ConversationService<J, R, S, D> {
    catalog: Arc<PathCatalog>,
    sessions: Mutex<HashMap<SessionId, Registered>>,
    idle_limit: Duration,
    drafts: Arc<D>,
    matching: MatchingService<J>,
    submissions: SubmissionService<R, S>,
}

impl<J, R, S, D> ConversationService<J, R, S, D>
where
    J: JobRepository + 'static,
    R: ApplicationRepository + 'static,
    S: DocumentStorage + 'static,
    D: DraftStore + 'static,
{
    pub fn new(
        catalog: Arc<PathCatalog>,
        drafts: Arc<D>,
        matching: MatchingService<J>,
        submissions: SubmissionService<R, S>,
    ) -> Self {
        Self {
            catalog,
            sessions: Mutex::new(HashMap::new()),
            idle_limit: Duration::minutes(DEFAULT_IDLE_LIMIT_MINUTES),
            drafts,
            matching,
            submissions,
        }
    }

    pub fn with_idle_limit(mut self, idle_limit: Duration) -> Self {
        self.idle_limit = idle_limit;
        self
    }

    pub fn catalog(&self) -> &Arc<PathCatalog> {
        &self.catalog
    }

    pub fn live_sessions(&self) -> usize {
        self.registry().len()
    }

    /// Starts a conversation at `Idle` with the welcome message.
    pub async fn open(&self, client_id: Option<ClientId>) -> ConversationView {
        let id = SessionId::generate();
        let session = Session {
            conversation: Conversation::new(self.catalog.clone()),
            client_id,
            transcript: vec![ChatEntry::Assistant(AssistantMessage::welcome())],
        };
        let view = self.view_of(&id, &session);

        let now = Utc::now();
        self.expire_idle(now);
        self.registry().insert(
            id.clone(),
            Registered {
                handle: Arc::new(tokio::sync::Mutex::new(session)),
                last_seen: now,
            },
        );
        info!(session_id = %id, "conversation opened");
        view
    }

    pub async fn view(&self, id: &SessionId) -> Result<ConversationView, SessionError> {
        let handle = self.session(id)?;
        let session = handle.lock().await;
        Ok(self.view_of(id, &session))
    }

    pub async fn handle(
        &self,
        id: &SessionId,
        event: UserEvent,
    ) -> Result<ConversationView, SessionError> {
        let handle = self.session(id)?;
        let mut session = handle.lock().await;

        let (event, uploads) = match event {
            UserEvent::SelectPath(path) => (ConversationEvent::SelectPath { path }, Vec::new()),
            UserEvent::Answer(value) => (ConversationEvent::Answer { value }, Vec::new()),
            UserEvent::SelectJob(job_id) => (ConversationEvent::SelectJob { job_id }, Vec::new()),
            UserEvent::DeclineJobs => (ConversationEvent::DeclineJobs, Vec::new()),
            UserEvent::Submit { mut form, uploads } => {
                for upload in &uploads {
                    if !form.uploaded_fields.contains(&upload.field) {
                        form.uploaded_fields.push(upload.field.clone());
                    }
                }
                (ConversationEvent::Submit { form }, uploads)
            }
            UserEvent::Reset => (ConversationEvent::Reset, Vec::new()),
        };

        let transition = session.conversation.apply(event).map_err(|error| {
            warn!(session_id = %id, %error, "conversation event rejected");
            SessionError::from(error)
        })?;
        self.run(id, &mut session, transition, uploads).await?;

        let view = self.view_of(id, &session);
        drop(session);
        self.retire_if_finished(id, &view.state);
        Ok(view)
    }

    /// Abandons the current attempt; answers and draft are discarded.
    pub async fn reset(&self, id: &SessionId) -> Result<ConversationView, SessionError> {
        self.handle(id, UserEvent::Reset).await
    }

    /// Rebuilds the conversation from the draft cache.
    pub async fn resume(&self, id: &SessionId) -> Result<ConversationView, SessionError> {
        let handle = self.session(id)?;
        let mut session = handle.lock().await;

        let draft = match self.drafts.load(id) {
            Ok(Some(draft)) => draft,
            Ok(None) => return Err(SessionError::NoDraft(id.clone())),
            Err(error) => {
                warn!(session_id = %id, %error, "draft lookup failed");
                return Err(SessionError::NoDraft(id.clone()));
            }
        };

        let (conversation, transition) = Conversation::restore(self.catalog.clone(), &draft)?;
        session.conversation = conversation;
        session.transcript = vec![ChatEntry::Assistant(AssistantMessage::say(
            "Welcome back! Let's pick up where you left off.",
        ))];
        info!(session_id = %id, path = %draft.path, answers = draft.answers.len(), "conversation resumed");
        self.run(id, &mut session, transition, Vec::new()).await?;

        let view = self.view_of(id, &session);
        drop(session);
        self.retire_if_finished(id, &view.state);
        Ok(view)
    }

    /// Forgets a session entirely.
    pub fn close(&self, id: &SessionId) -> bool {
        if let Err(error) = self.drafts.clear(id) {
            warn!(session_id = %id, %error, "draft clear failed");
        }
        self.registry().remove(id).is_some()
    }

    /// Completed and redirected conversations accept no further events.
    fn retire_if_finished(&self, id: &SessionId, state: &ConversationState) {
        if matches!(
            state,
            ConversationState::Complete { .. } | ConversationState::Redirected
        ) {
            self.close(id);
            info!(session_id = %id, state = state.name(), "conversation finished");
        }
    }

    fn expire_idle(&self, now: DateTime<Utc>) {
        let expired: Vec<SessionId> = {
            let mut registry = self.registry();
            let expired: Vec<SessionId> = registry
                .iter()
                .filter(|(_, entry)| now - entry.last_seen >= self.idle_limit)
                .map(|(id, _)| id.clone())
                .collect();
            for id in &expired {
                registry.remove(id);
            }
            expired
        };
        for id in &expired {
            if let Err(error) = self.drafts.clear(id) {
                warn!(session_id = %id, %error, "draft clear failed");
            }
        }
        if !expired.is_empty() {
            info!(expired = expired.len(), "idle conversations dropped");
        }
    }

    async fn run(
        &self,
        id: &SessionId,
        session: &mut Session,
        transition: Transition,
        mut uploads: Vec<UploadedFile>,
    ) -> Result<(), SessionError> {
        session.record(&transition);
        let mut pending: VecDeque<Effect> = transition.effects.into();

        while let Some(effect) = pending.pop_front() {
            let next = match effect {
                Effect::SaveDraft => {
                    if let Some(draft) = session.conversation.draft(Utc::now()) {
                        if let Err(error) = self.drafts.save(id, draft) {
                            warn!(session_id = %id, %error, "draft save failed");
                        }
                    }
                    continue;
                }
                Effect::ClearDraft => {
                    if let Err(error) = self.drafts.clear(id) {
                        warn!(session_id = %id, %error, "draft clear failed");
                    }
                    continue;
                }
                Effect::MatchJobs { answers } => {
                    let matches = self.matching.suggest(&answers).await;
                    info!(session_id = %id, matched = matches.len(), "job matching finished");
                    session
                        .conversation
                        .apply(ConversationEvent::JobsMatched { matches })?
                }
                Effect::Persist { payload } => {
                    let submission = ApplicationSubmission {
                        payload,
                        uploads: std::mem::take(&mut uploads),
                        client_id: session.client_id.clone(),
                    };
                    let event = match self.submissions.submit(submission).await {
                        Ok(receipt) => {
                            info!(
                                session_id = %id,
                                application_id = %receipt.application.id,
                                failed_uploads = receipt.failed_uploads(),
                                "conversation submitted"
                            );
                            ConversationEvent::SubmissionSucceeded {
                                application_id: receipt.application.id,
                            }
                        }
                        Err(error) => {
                            warn!(session_id = %id, %error, "conversation submission failed");
                            ConversationEvent::SubmissionFailed {
                                reason: error.to_string(),
                            }
                        }
                    };
                    session.conversation.apply(event)?
                }
            };

            session.record(&next);
            pending.extend(next.effects);
        }

        Ok(())
    }

    fn view_of(&self, id: &SessionId, session: &Session) -> ConversationView {
        let conversation = &session.conversation;
        let form_fields = match conversation.state() {
            ConversationState::AwaitingForm { .. } => conversation
                .path()
                .and_then(|path| self.catalog.get(path))
                .map(|config| config.form_fields.clone())
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        ConversationView {
            session_id: id.clone(),
            path: conversation.path(),
            state: conversation.state().clone(),
            progress: conversation.progress_percent(),
            answers: conversation.answers().clone(),
            form_fields,
            transcript: session.transcript.clone(),
        }
    }

    fn session(&self, id: &SessionId) -> Result<SessionHandle, SessionError> {
        let mut registry = self.registry();
        let entry = registry
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        entry.last_seen = Utc::now();
        Ok(entry.handle.clone())
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Registered>> {
        // a poisoned registry still holds valid sessions
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
