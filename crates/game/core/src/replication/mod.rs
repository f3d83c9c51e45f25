//! Replication of the action graph to remote observers.
//!
//! Mutations mark records dirty in a [`ReplicationQueue`]; the host drains it
//! into a [`ReplicationBatch`] once per tick and ships it to clients, which
//! apply it through [`ActionWorld::apply_replication`](crate::ActionWorld::apply_replication).
mod apply;
mod error;
mod fields;
mod net;
mod payload;
mod queue;

pub use error::ReplicationError;
pub use fields::RecordFields;
pub use net::{NetEntity, NetEntityMap, NetExecutionRequest};
pub use payload::{LedgerState, RecordState, ReplicationBatch};
pub use queue::ReplicationQueue;
