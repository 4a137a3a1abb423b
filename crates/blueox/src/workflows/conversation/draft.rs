use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{CollectedAnswers, PathId};
use super::session::SessionId;

/// Best-effort snapshot of an unfinished conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDraft {
    #[serde(rename = "userPath")]
    pub path: PathId,
    #[serde(flatten)]
    pub answers: CollectedAnswers,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("draft store unavailable: {0}")]
    Unavailable(String),
}

/// Draft cache keyed by session. Callers log failures and carry on.
pub trait DraftStore: Send + Sync {
    fn save(&self, session: &SessionId, draft: ConversationDraft) -> Result<(), DraftError>;
    fn load(&self, session: &SessionId) -> Result<Option<ConversationDraft>, DraftError>;
    fn clear(&self, session: &SessionId) -> Result<(), DraftError>;
}

#[derive(Debug, Default)]
pub struct InMemoryDraftStore {
    drafts: Mutex<HashMap<SessionId, ConversationDraft>>,
}

impl InMemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<SessionId, ConversationDraft>>, DraftError> {
        self.drafts
            .lock()
            .map_err(|_| DraftError::Unavailable("draft lock poisoned".to_string()))
    }
}

impl DraftStore for InMemoryDraftStore {
    fn save(&self, session: &SessionId, draft: ConversationDraft) -> Result<(), DraftError> {
        self.lock()?.insert(session.clone(), draft);
        Ok(())
    }

    fn load(&self, session: &SessionId) -> Result<Option<ConversationDraft>, DraftError> {
        Ok(self.lock()?.get(session).cloned())
    }

    fn clear(&self, session: &SessionId) -> Result<(), DraftError> {
        self.lock()?.remove(session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::conversation::domain::AnswerValue;

    #[test]
    fn draft_serializes_flat_with_saved_at() {
        let mut answers = CollectedAnswers::new();
        answers.insert("skills", AnswerValue::list(["Welders"]));
        let draft = ConversationDraft {
            path: PathId::WorkerJob,
            answers,
            saved_at: DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
                .expect("timestamp parses")
                .with_timezone(&Utc),
        };

        let value = serde_json::to_value(&draft).expect("draft serializes");
        assert_eq!(value["userPath"], "worker_job");
        assert_eq!(value["skills"], serde_json::json!(["Welders"]));
        assert_eq!(value["savedAt"], "2025-03-01T10:00:00Z");
    }

    #[test]
    fn clear_forgets_the_session() {
        let store = InMemoryDraftStore::new();
        let session = SessionId("s-1".to_string());
        let draft = ConversationDraft {
            path: PathId::StudentJob,
            answers: CollectedAnswers::new(),
            saved_at: Utc::now(),
        };

        store.save(&session, draft.clone()).expect("saved");
        assert_eq!(store.load(&session).expect("loads"), Some(draft));
        store.clear(&session).expect("cleared");
        assert_eq!(store.load(&session).expect("loads"), None);
    }
}
