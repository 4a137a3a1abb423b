use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use blueox::config::MatchingConfig;
use blueox::workflows::admin::{AdminConsole, AdminStore};
use blueox::workflows::applications::{DocumentStorage, SubmissionService};
use blueox::workflows::conversation::{ConversationService, InMemoryDraftStore, PathCatalog};
use blueox::workflows::matching::{JobMatcher, MatchingService};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type Conversations<B> = ConversationService<B, B, B, InMemoryDraftStore>;

/// Services sharing one backend and one catalog.
pub(crate) struct Services<B> {
    pub(crate) backend: Arc<B>,
    pub(crate) conversations: Arc<Conversations<B>>,
    pub(crate) console: Arc<AdminConsole<B>>,
}

impl<B> Services<B>
where
    B: AdminStore + DocumentStorage + 'static,
{
    pub(crate) fn new(backend: Arc<B>, matching: MatchingConfig) -> Self {
        let catalog = Arc::new(PathCatalog::standard());
        let conversations = ConversationService::new(
            catalog.clone(),
            Arc::new(InMemoryDraftStore::default()),
            MatchingService::new(backend.clone(), JobMatcher::new(matching.into())),
            SubmissionService::new(backend.clone(), backend.clone()),
        );
        let console = AdminConsole::new(backend.clone(), catalog);

        Self {
            backend,
            conversations: Arc::new(conversations),
            console: Arc::new(console),
        }
    }
}
