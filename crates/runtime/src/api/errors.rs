//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, content loading and the action
//! core so clients can bubble them up with consistent context.

use actions_core::{
    ActionError, ContainerError, EntityId, GrantError, ReplicationError, UpgradeError,
};
use thiserror::Error;
use tokio::sync::oneshot;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("simulation worker command channel closed")]
    CommandChannelClosed,

    #[error("simulation worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("simulation worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("failed to load action content: {0}")]
    Content(String),

    #[error("entity {0} is not known to the world model")]
    UnknownEntity(EntityId),

    /// A client tried to forward a request naming an entity the server never
    /// replicated to it.
    #[error("entity {0} has no network handle")]
    NotReplicated(EntityId),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Grant(#[from] GrantError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Upgrade(#[from] UpgradeError),

    #[error(transparent)]
    Replication(#[from] ReplicationError),
}

impl RuntimeError {
    /// The execution rejection carried by this error, if any.
    pub fn as_rejection(&self) -> Option<&ActionError> {
        match self {
            Self::Action(err) => Some(err),
            _ => None,
        }
    }
}
