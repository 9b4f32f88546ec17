use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::jobs::models::JobTable;
use crate::llm_client::LlmClient;
use crate::sheets::SheetsSync;

/// The session's job table, explicitly owned here and handed to handlers by
/// reference. There is no other copy of this state.
pub type SharedJobTable = Arc<RwLock<JobTable>>;

/// Shared application state injected into all route handlers via Axum
/// extractors.
#[derive(Clone)]
pub struct AppState {
    pub jobs: SharedJobTable,
    pub llm: LlmClient,
    /// `None` when startup could not reach the spreadsheet; the service then
    /// runs with the local table only. The mutex serializes push/pull so one
    /// sync operation completes before the next starts.
    pub sheets: Option<Arc<Mutex<SheetsSync>>>,
}
