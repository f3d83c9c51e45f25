//! High-level runtime orchestrator.
//!
//! The runtime owns the simulation worker (and optionally a wall-clock
//! ticker), wires up command/event channels, and exposes a builder-based API
//! for embedding the action system.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::info;

use actions_content::{ConfigLoader, PrototypeRegistry};
use actions_core::{
    ActionHandler, ActionWorld, Authority, EventKey, HandlerRegistry, ItemActionSource,
    ItemActionSources, PrototypeOracle,
};

use crate::api::{Result, RuntimeError, RuntimeHandle};
use crate::config::RuntimeConfig;
use crate::events::{Event, EventBus, Topic};
use crate::oracle::WorldModel;
use crate::workers::{Command, SimulationWorker, spawn_ticker};

/// Main runtime that hosts the authoritative action world
///
/// Design: Runtime owns workers and coordinates execution.
/// [`RuntimeHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: RuntimeHandle,
    sim_worker_handle: JoinHandle<()>,
    ticker_handle: Option<JoinHandle<()>>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    ///
    /// The handle can be shared across clients and async tasks.
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.handle.subscribe(topic)
    }

    /// Shutdown the runtime gracefully
    ///
    /// The worker finishes once every outstanding [`RuntimeHandle`] clone has
    /// been dropped.
    pub async fn shutdown(self) -> Result<()> {
        if let Some(ticker) = self.ticker_handle {
            ticker.abort();
        }
        drop(self.handle);

        self.sim_worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        Ok(())
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    prototypes: Option<Arc<dyn PrototypeOracle>>,
    handlers: HandlerRegistry,
    item_sources: ItemActionSources,
    world_model: WorldModel,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            prototypes: None,
            handlers: HandlerRegistry::new(),
            item_sources: ItemActionSources::with_defaults(),
            world_model: WorldModel::new(),
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `prototypes` instead of loading catalogs at start.
    pub fn prototypes(mut self, prototypes: Arc<dyn PrototypeOracle>) -> Self {
        self.prototypes = Some(prototypes);
        self
    }

    /// Replace the handler registry wholesale.
    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn on_event(mut self, key: impl Into<EventKey>, handler: Arc<dyn ActionHandler>) -> Self {
        self.handlers.on_event(key, handler);
        self
    }

    /// Adds an equip-time source after the resident-record default.
    pub fn item_source(mut self, source: Arc<dyn ItemActionSource>) -> Self {
        self.item_sources.push(source);
        self
    }

    /// Seed the spatial model (pre-placed entities and walls).
    pub fn world_model(mut self, model: WorldModel) -> Self {
        self.world_model = model;
        self
    }

    /// Loads content, spawns the worker and returns the running runtime.
    pub async fn start(self) -> Result<Runtime> {
        let mut config = self.config;

        if let Some(path) = &config.config_path {
            config.actions = ConfigLoader::load(path).map_err(content_error)?;
        }

        let prototypes = match self.prototypes {
            Some(prototypes) => prototypes,
            None => {
                let registry = match &config.prototype_dir {
                    Some(dir) => PrototypeRegistry::load_dir(dir),
                    None => PrototypeRegistry::load_embedded(),
                }
                .map_err(content_error)?;
                info!(prototypes = registry.len(), "loaded action prototypes");
                Arc::new(registry) as Arc<dyn PrototypeOracle>
            }
        };

        let (command_tx, command_rx) = mpsc::channel::<Command>(config.command_buffer_size);
        let event_bus = EventBus::with_capacity(config.event_buffer_size);
        let handle = RuntimeHandle::new(command_tx, event_bus.clone());

        let world = ActionWorld::new(Authority::Server, config.actions.clone());
        let sim_worker = SimulationWorker::new(
            world,
            prototypes,
            self.world_model,
            self.handlers,
            self.item_sources,
            command_rx,
            event_bus,
        );

        let sim_worker_handle = tokio::spawn(async move {
            sim_worker.run().await;
        });

        let ticker_handle = config
            .tick_interval
            .map(|tick| spawn_ticker(handle.clone(), tick));

        info!(
            tick = ?config.tick_interval,
            command_buffer = config.command_buffer_size,
            event_buffer = config.event_buffer_size,
            "runtime started"
        );

        Ok(Runtime {
            handle,
            sim_worker_handle,
            ticker_handle,
        })
    }
}

fn content_error(err: anyhow::Error) -> RuntimeError {
    RuntimeError::Content(format!("{err:#}"))
}
