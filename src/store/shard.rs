//! A single lock-protected bucket of the sharded store.

use std::collections::HashMap;

use parking_lot::Mutex;

const DEFAULT_SHARD_CAPACITY: usize = 8;

/// One bucket of the store: a plain `HashMap` behind a `Mutex`. No TTL, no
/// eviction, no memory accounting — just the key/value bytes the engine
/// asks it to hold.
#[derive(Debug)]
pub struct Shard {
    map: Mutex<HashMap<String, String>>,
}

impl Shard {
    pub fn new() -> Self {
        Shard {
            map: Mutex::new(HashMap::with_capacity(DEFAULT_SHARD_CAPACITY)),
        }
    }

    pub fn set(&self, key: String, value: String) {
        self.map.lock().insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.lock().get(key).cloned()
    }

    pub fn del(&self, key: &str) {
        self.map.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    /// Snapshot of every live key/value pair, used by compaction.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.map
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl Default for Shard {
    fn default() -> Self {
        Shard::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_del_roundtrip() {
        let shard = Shard::new();
        shard.set("a".into(), "1".into());
        assert_eq!(shard.get("a"), Some("1".to_string()));
        shard.del("a");
        assert_eq!(shard.get("a"), None);
    }

    #[test]
    fn del_of_missing_key_is_a_no_op() {
        let shard = Shard::new();
        shard.del("missing");
        assert_eq!(shard.get("missing"), None);
    }

    #[test]
    fn set_overwrites_existing_value() {
        let shard = Shard::new();
        shard.set("a".into(), "1".into());
        shard.set("a".into(), "2".into());
        assert_eq!(shard.get("a"), Some("2".to_string()));
    }
}
