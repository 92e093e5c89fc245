//! Bundles the cache, registry, and resolver behind one shared handle, the
//! way the teacher's `ServerContext` bundles per-process shared state.
//! Construction is the only documented "init" barrier: `ResolverContext::new`
//! creates the cache shards (bootstrapping the root), creates the registry
//! shards, and installs the pluggable transport in one call.

use std::sync::Arc;

use crate::cache::{CacheConfig, ShardedCache};
use crate::protocol::{Answer, RecordType};
use crate::registry::{ConnectFn, RegistryConfig, ServerCommRegistry};
use crate::resolver::IterativeResolver;

pub struct ResolverContext {
    pub cache: Arc<ShardedCache>,
    pub registry: Arc<ServerCommRegistry>,
    resolver: IterativeResolver,
}

impl ResolverContext {
    pub fn new(cache_config: CacheConfig, registry_config: RegistryConfig, connect: ConnectFn) -> Self {
        let cache = Arc::new(ShardedCache::init(cache_config));
        let registry = Arc::new(ServerCommRegistry::new(registry_config, connect));
        let resolver = IterativeResolver::new(cache.clone(), registry.clone());
        ResolverContext { cache, registry, resolver }
    }

    /// The sole public query entry point. Empty slice on any failure;
    /// see `resolver::ResolverError` for the internal taxonomy that
    /// collapses into it.
    pub async fn query_lookup(&self, name: &str, qtype: RecordType) -> Vec<Answer> {
        self.resolver.query_lookup(name, qtype).await
    }
}
