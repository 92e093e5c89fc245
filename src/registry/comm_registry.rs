use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use crate::hasher::SeededHasher;

use super::multiplexer::{ConnectFn, MultiplexError, ServerMultiplexer};

/// Registry holds far fewer distinct keys (remote nameserver addresses)
/// than the record cache holds names, so a smaller default shard count is
/// reasonable; this is a tuning choice, not a spec requirement.
#[derive(Clone, Copy, Debug)]
pub struct RegistryConfig {
    pub shard_count: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig { shard_count: 256 }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("transport connect failed: {0}")]
    Connect(#[from] MultiplexError),
}

struct RegistryShard {
    entries: RwLock<HashMap<SocketAddr, Arc<ServerMultiplexer>>>,
}

impl RegistryShard {
    fn new() -> Self {
        RegistryShard {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

/// Demand-created table of per-server multiplexers (C3). At most one
/// `ServerMultiplexer` exists per remote address per process; once
/// created it is reused indefinitely.
pub struct ServerCommRegistry {
    shards: Vec<RegistryShard>,
    hasher: SeededHasher,
    connect: ConnectFn,
}

impl ServerCommRegistry {
    pub fn new(config: RegistryConfig, connect: ConnectFn) -> Self {
        let shard_count = config.shard_count.max(1);
        ServerCommRegistry {
            shards: (0..shard_count).map(|_| RegistryShard::new()).collect(),
            hasher: SeededHasher::new(),
            connect,
        }
    }

    fn shard_for(&self, addr: &SocketAddr) -> &RegistryShard {
        let idx = (self.hasher.hash_server(addr) as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// Fast path: reader lock, return an existing multiplexer if present.
    /// Slow path: `establish_server_comm`.
    #[tracing::instrument(skip(self))]
    pub fn get_server_comm(&self, addr: SocketAddr) -> Result<Arc<ServerMultiplexer>, RegistryError> {
        {
            let shard = self.shard_for(&addr);
            let guard = shard.entries.read().expect("registry shard lock poisoned");
            if let Some(mux) = guard.get(&addr) {
                return Ok(mux.clone());
            }
        }
        self.establish_server_comm(addr)
    }

    /// Writer lock, double-checked: if another task won the race to create
    /// a multiplexer for `addr` while we waited for the lock, return that
    /// one instead of calling `connect` again.
    fn establish_server_comm(&self, addr: SocketAddr) -> Result<Arc<ServerMultiplexer>, RegistryError> {
        let shard = self.shard_for(&addr);
        let mut guard = shard.entries.write().expect("registry shard lock poisoned");
        if let Some(mux) = guard.get(&addr) {
            return Ok(mux.clone());
        }

        let mux = Arc::new((self.connect)(addr)?);
        metrics::increment_counter!("multiplexer_connect_total");
        guard.insert(addr, mux.clone());
        Ok(mux)
    }
}
