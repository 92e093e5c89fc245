use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use crate::hasher::SeededHasher;
use crate::protocol::{Name, RecordData, RecordType};

use super::entry::CacheEntry;

/// TTL applied to the root bootstrap records, chosen to far exceed any
/// query's lifetime so the root delegation never expires in practice.
const ROOT_BOOTSTRAP_TTL_DAYS: i64 = 365;

/// `n` is the init parameter; 1024 is a typical production value.
/// Memory-vs-contention tradeoff, not a correctness requirement.
#[derive(Clone, Copy, Debug)]
pub struct CacheConfig {
    pub shard_count: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { shard_count: 1024 }
    }
}

struct Shard {
    entries: RwLock<HashMap<Name, HashMap<RecordType, CacheEntry>>>,
}

impl Shard {
    fn new() -> Self {
        Shard {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

/// Array of independently-locked shards. Shard selection is
/// `hash(normalize(name), seed) mod shard_count`; the seed is drawn once at
/// construction and never exposed.
pub struct ShardedCache {
    shards: Vec<Shard>,
    hasher: SeededHasher,
}

impl ShardedCache {
    /// Creates `shard_count` shards, seeds the hasher, and bootstraps the
    /// root NS record plus one root server's glue A record. Must be
    /// called before any resolution is attempted.
    pub fn init(config: CacheConfig) -> Self {
        let shard_count = config.shard_count.max(1);
        let cache = ShardedCache {
            shards: (0..shard_count).map(|_| Shard::new()).collect(),
            hasher: SeededHasher::new(),
        };
        cache.bootstrap_root();
        cache
    }

    fn bootstrap_root(&self) {
        let expires = Utc::now() + Duration::days(ROOT_BOOTSTRAP_TTL_DAYS);
        self.set(
            ".",
            RecordType::Ns,
            expires,
            vec![RecordData::Ns(Name::new("a.root-servers.net."))],
        );
        self.set(
            "a.root-servers.net.",
            RecordType::A,
            expires,
            vec![RecordData::A("198.41.0.4".parse().unwrap())],
        );
    }

    fn shard_for(&self, name: &Name) -> &Shard {
        let idx = (self.hasher.hash_name(name) as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// Returns the entry if present, unexpired, and nonempty; otherwise
    /// absent. Safe under concurrent `lookup` and `set` on any shard.
    #[tracing::instrument(skip(self))]
    pub fn lookup(&self, name: &str, rtype: RecordType) -> Option<CacheEntry> {
        let name = Name::new(name);
        let shard = self.shard_for(&name);
        let guard = shard.entries.read().expect("cache shard lock poisoned");
        let found = guard
            .get(&name)
            .and_then(|by_type| by_type.get(&rtype))
            .filter(|entry| entry.is_valid())
            .cloned();

        metrics::increment_counter!("cache_lookup_total", "result" => if found.is_some() { "hit" } else { "miss" });
        found
    }

    /// Replaces the entry at `[name][type]` atomically. Concurrent `set`s
    /// on the same key are last-writer-wins; no merging is performed.
    #[tracing::instrument(skip(self, data))]
    pub fn set(&self, name: &str, rtype: RecordType, expires: DateTime<Utc>, data: Vec<RecordData>) {
        let name = Name::new(name);
        let shard = self.shard_for(&name);
        let mut guard = shard.entries.write().expect("cache shard lock poisoned");
        let by_type = guard.entry(name).or_insert_with(HashMap::new);
        by_type.insert(rtype, CacheEntry { expires, data });
        metrics::increment_counter!("cache_set_total");
    }

    /// The most specific cached, unexpired NS entry covering `name`, found
    /// by stripping the leftmost label repeatedly until a hit or the root
    /// is reached. Guaranteed nonempty since the root NS record is always
    /// bootstrapped on init.
    pub fn best_ns(&self, name: &str) -> CacheEntry {
        let name = Name::new(name);
        for candidate in name.ancestors() {
            if let Some(entry) = self.lookup(candidate.as_str(), RecordType::Ns) {
                return entry;
            }
        }
        unreachable!("root NS record must always be present")
    }
}
