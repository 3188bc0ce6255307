use std::sync::Arc;

use crate::analysis::broker::AnalysisBroker;
use crate::analysis::history::HistoryStore;
use crate::analysis::upload::TempStore;
use crate::auth::provider::IdentityProvider;

/// Shared application state injected into all route handlers via Axum extractors.
/// Every external collaborator sits behind a trait object so tests can swap in fakes.
#[derive(Clone)]
pub struct AppState {
    pub broker: AnalysisBroker,
    /// Read/delete side of the history; the broker holds its own handle for writes.
    pub history: Arc<dyn HistoryStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub temp_store: TempStore,
}
