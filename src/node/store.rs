use dashmap::DashMap;

/// In-memory key-value store backing one node. The map serializes concurrent
/// key operations; there is no persistence, a restart loses everything.
#[derive(Debug, Default)]
pub struct KeyStore {
    entries: DashMap<String, String>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Stores a value, replacing any previous one for the key.
    pub fn put(&self, key: String, value: String) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Removes a key; removing an absent key is a no-op.
    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
