use tracing::{debug, info};

use crate::{
    config::StoreUrl,
    error::Result,
    sql::{
        engine::{Engine, kv::KVEngine},
        executor::ResultSet,
        types::Params,
    },
    storage::{disk::DiskEngine, memory::MemoryEngine},
};

/// Handle to the backing store
///
/// Clones share the same underlying store.
#[derive(Clone)]
pub struct Database {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Memory(KVEngine<MemoryEngine>),
    Disk(KVEngine<DiskEngine>),
}

impl Database {
    /// Opens a store from a connection string, see [`StoreUrl::parse`]
    pub fn open(url: &str) -> Result<Self> {
        Self::open_url(&StoreUrl::parse(url)?)
    }

    pub fn open_url(url: &StoreUrl) -> Result<Self> {
        let backend = match url {
            StoreUrl::Memory => Backend::Memory(KVEngine::new(MemoryEngine::new())),
            StoreUrl::File(path) => Backend::Disk(KVEngine::new(DiskEngine::open(path.clone())?)),
        };
        info!(%url, "opened store");
        Ok(Self { backend })
    }

    /// A fresh in-memory store
    pub fn memory() -> Self {
        Self {
            backend: Backend::Memory(KVEngine::new(MemoryEngine::new())),
        }
    }

    /// Executes one statement in its own transaction: committed when it
    /// succeeds, rolled back otherwise.
    pub fn execute(&self, sql: &str, params: &Params) -> Result<ResultSet> {
        debug!(sql = sql.trim(), ?params, "execute");
        match &self.backend {
            Backend::Memory(engine) => engine.session()?.execute(sql, params),
            Backend::Disk(engine) => engine.session()?.execute(sql, params),
        }
    }
}
