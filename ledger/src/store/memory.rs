use super::BlobStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

/// Process-local backend. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, String>> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, key: &str) -> std::io::Result<Option<String>> {
        Ok(self.map().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> std::io::Result<()> {
        self.map().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        self.map().remove(key);
        Ok(())
    }
}
