use chrono::{DateTime, Utc};

use crate::protocol::RecordData;

/// `{ expires, data }`. Never partially mutated: `ShardedCache::set`
/// replaces the whole entry atomically. An entry is logically absent once
/// `expires` has passed, or if `data` is empty.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub expires: DateTime<Utc>,
    pub data: Vec<RecordData>,
}

impl CacheEntry {
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty() && self.expires > Utc::now()
    }
}
