//! Sharded, time-bounded record cache (C2): an array of independently
//! locked shards mapping name -> record type -> cache entry.

mod entry;
mod shard;

pub use entry::CacheEntry;
pub use shard::{CacheConfig, ShardedCache};
