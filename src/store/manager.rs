//! Routes keys to shards and exposes the store-wide operations the engine
//! needs (point lookups plus a full scan for compaction).

use std::sync::Arc;

use ahash::AHasher;
use std::hash::{Hash, Hasher};

use crate::store::shard::Shard;

/// Matches the original implementation's fixed bucket count; there is no
/// config knob for it because resizing a live shard array isn't supported.
pub const DEFAULT_SHARD_COUNT: usize = 256;

/// A fixed array of independently-locked shards.
#[derive(Debug)]
pub struct ShardManager {
    shards: Vec<Arc<Shard>>,
}

impl ShardManager {
    pub fn new() -> Self {
        Self::with_shard_count(DEFAULT_SHARD_COUNT)
    }

    pub fn with_shard_count(count: usize) -> Self {
        let shards = (0..count).map(|_| Arc::new(Shard::new())).collect();
        ShardManager { shards }
    }

    fn route(&self, key: &str) -> &Shard {
        let mut hasher = AHasher::default();
        key.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.shards.len();
        &self.shards[index]
    }

    pub fn set(&self, key: String, value: String) {
        self.route(&key).set(key, value);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.route(key).get(key)
    }

    pub fn del(&self, key: &str) {
        self.route(key).del(key);
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.len()).sum()
    }

    /// Snapshot of every live key/value pair across all shards, in
    /// shard order. Used by the compactor to rewrite a single segment.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.shards.iter().flat_map(|s| s.entries()).collect()
    }
}

impl Default for ShardManager {
    fn default() -> Self {
        ShardManager::new()
    }
}
