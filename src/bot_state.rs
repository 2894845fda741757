use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::sessions::{OperatorState, Sessions};
use crate::store::Store;

/// Shared state handed to every handler by the dispatcher. Cheap to clone;
/// the store is injected behind the trait so tests can run against
/// `MemoryStore`.
#[derive(Clone)]
pub struct BotState {
    pub store: Arc<dyn Store>,
    pub sessions: Sessions,
    operator: Arc<RwLock<OperatorState>>,
    config: Arc<Config>,
}

impl BotState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        BotState {
            store,
            sessions: Sessions::new(),
            operator: Arc::new(RwLock::new(OperatorState::Idle)),
            config: Arc::new(config),
        }
    }

    /// The single privileged responder's chat id.
    pub fn operator_id(&self) -> i64 {
        self.config.psychologist_id
    }

    pub fn is_operator(&self, chat_id: i64) -> bool {
        chat_id == self.config.psychologist_id
    }

    pub async fn operator_state(&self) -> OperatorState {
        *self.operator.read().await
    }

    pub async fn set_operator_state(&self, state: OperatorState) {
        *self.operator.write().await = state;
    }
}
