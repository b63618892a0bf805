use std::sync::Arc;

use tokio::sync::RwLock;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::services::providers::{CbfScorer, CfScorer, LlmScorer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cf: Arc<CfScorer>,
    pub llm: Arc<LlmScorer>,
    snapshot: Arc<RwLock<Snapshot>>,
}

/// One immutable view of the catalog plus the content index derived from
/// it. Requests clone the whole snapshot up front, so a concurrent reload
/// never changes what a request in flight is looking at.
#[derive(Clone)]
pub struct Snapshot {
    pub catalog: Arc<Catalog>,
    pub cbf: Arc<CbfScorer>,
}

impl AppState {
    pub fn new(config: Config, catalog: Catalog, cf: CfScorer) -> Self {
        let llm = Arc::new(LlmScorer::from_config(&config));
        let cbf = Arc::new(CbfScorer::build(&catalog));
        Self {
            config: Arc::new(config),
            cf: Arc::new(cf),
            llm,
            snapshot: Arc::new(RwLock::new(Snapshot {
                catalog: Arc::new(catalog),
                cbf,
            })),
        }
    }

    /// Current catalog snapshot
    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }

    /// Swaps in a freshly loaded catalog and a rebuilt content index as one
    /// atomic unit
    pub async fn replace_catalog(&self, catalog: Catalog) {
        let cbf = Arc::new(CbfScorer::build(&catalog));
        let mut guard = self.snapshot.write().await;
        *guard = Snapshot {
            catalog: Arc::new(catalog),
            cbf,
        };
    }
}
