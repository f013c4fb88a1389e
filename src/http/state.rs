use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::session::VoiceSession;

/// Shared application state for HTTP handlers
///
/// Holds at most one voice session: the slot is the invariant that only one
/// session can be connecting or active at a time.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub api_key: String,
    pub session: Arc<RwLock<Option<Arc<VoiceSession>>>>,
}

impl AppState {
    pub fn new(config: Config, api_key: String) -> Self {
        Self {
            config: Arc::new(config),
            api_key,
            session: Arc::new(RwLock::new(None)),
        }
    }
}
