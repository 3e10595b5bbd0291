//! Entry point that wires one store to the engine, projector and ledger.

use crate::community::CommunityLedger;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::events::{EventBus, EventSink};
use crate::graph::{EdgeStore, RelationshipEngine};
use crate::locks::KeyedLocks;
use crate::stats::StatsProjector;
use crate::storage::StorageBackend;
use log::info;
use std::sync::Arc;

/// A relationship graph over one storage backend.
///
/// Construct one per process (or per test) and share it; every component is
/// `Send + Sync` and cheap to clone.
#[derive(Clone)]
pub struct Network {
    store: EdgeStore,
    events: Arc<EventBus>,
    engine: RelationshipEngine,
    projector: StatsProjector,
    ledger: CommunityLedger,
    config: EngineConfig,
}

impl Network {
    /// Build a network over an existing backend.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Config`](crate::NetworkError::Config) if `config` is invalid.
    pub fn with_backend(backend: Arc<dyn StorageBackend>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let store = EdgeStore::new(backend);
        let locks = Arc::new(KeyedLocks::new(config.lock_shards, config.lock_timeout()));
        let events = Arc::new(EventBus::new());

        Ok(Self {
            engine: RelationshipEngine::new(store.clone(), locks.clone(), events.clone(), &config),
            projector: StatsProjector::new(store.clone()),
            ledger: CommunityLedger::new(store.clone(), locks, events.clone()),
            store,
            events,
            config,
        })
    }

    /// Open a persistent network at `path` with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::StorageUnavailable`](crate::NetworkError::StorageUnavailable)
    /// if the database cannot be opened.
    #[cfg(feature = "rocksdb-backend")]
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, EngineConfig::default())
    }

    /// Open a persistent network at `path`.
    ///
    /// # Errors
    ///
    /// Storage errors from opening the database, config errors from validation.
    #[cfg(feature = "rocksdb-backend")]
    pub fn open_with_config<P: AsRef<std::path::Path>>(
        path: P,
        config: EngineConfig,
    ) -> Result<Self> {
        info!("Opening relationship graph at {:?}", path.as_ref());
        let backend = crate::storage::RocksDBBackend::open(path)?;
        Self::with_backend(Arc::new(backend), config)
    }

    /// Create an ephemeral in-memory network with default configuration.
    ///
    /// All data is lost when the network is dropped.
    pub fn in_memory() -> Result<Self> {
        info!("Creating in-memory relationship graph");
        let backend = crate::storage::MemoryBackend::new();
        Self::with_backend(Arc::new(backend), EngineConfig::default())
    }

    /// The relationship state machine.
    pub fn engine(&self) -> &RelationshipEngine {
        &self.engine
    }

    /// Read-only stats and views.
    pub fn stats(&self) -> &StatsProjector {
        &self.projector
    }

    /// Community join/leave and member counts.
    pub fn communities(&self) -> &CommunityLedger {
        &self.ledger
    }

    /// The underlying edge store.
    pub fn store(&self) -> &EdgeStore {
        &self.store
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribe a sink to every event published from now on.
    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.events.subscribe(sink);
    }

    /// Flush the backend to durable storage.
    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }
}
