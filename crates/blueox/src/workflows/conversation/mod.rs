//! Guided conversation: step catalog, engine reducer, drafts, and live sessions.

pub mod catalog;
pub mod domain;
pub mod draft;
pub mod engine;
pub mod messages;
pub mod router;
pub mod session;

pub use catalog::PathCatalog;
pub use domain::{
    AnswerValue, CollectedAnswers, FormField, FormFieldKind, FormSubmission, InputKind,
    PathConfig, PathId, Step, UnknownPath,
};
pub use draft::{ConversationDraft, DraftError, DraftStore, InMemoryDraftStore};
pub use engine::{
    Conversation, ConversationError, ConversationEvent, ConversationState, Effect, Transition,
};
pub use messages::{AssistantMessage, ChatChoice, InputPrompt, WHATSAPP_LINK};
pub use router::{conversation_router, CLIENT_ID_HEADER};
pub use session::{ChatEntry, ConversationService, ConversationView, SessionError, SessionId, UserEvent};
