use thiserror::Error;

use crate::gateway::GatewayError;
use crate::store::StoreError;

/// Errors surfaced by the conversation flows. Store and gateway failures are
/// kept separate so callers can tell "data was not saved" apart from "data
/// was saved but not delivered".
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
