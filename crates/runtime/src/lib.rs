//! Tokio-hosted runtime for the action core.
//!
//! This crate hosts the authoritative [`ActionWorld`](actions_core::ActionWorld)
//! on a background worker, exposes it through a cloneable [`RuntimeHandle`],
//! publishes execution outcomes and replication batches on a topic-based
//! [`EventBus`], and provides the predicting [`ClientSession`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`client`] keeps a replica world in sync with the server
//! - [`oracle`] provides in-memory spatial and blocker collaborators
//! - `workers` keeps background tasks internal to the crate
pub mod api;
pub mod client;
pub mod config;
pub mod events;
pub mod oracle;
pub mod runtime;

mod workers;

pub use api::{Result, RuntimeError, RuntimeHandle};
pub use client::{ClientOutcome, ClientSession};
pub use config::RuntimeConfig;
pub use events::{ActionEvent, Event, EventBus, ReplicationPacket, Topic};
pub use oracle::{EntitySpec, STORAGE_ACCESS_RANGE, Wall, WorldModel};
pub use runtime::{Runtime, RuntimeBuilder};
pub use workers::HandlerTarget;
