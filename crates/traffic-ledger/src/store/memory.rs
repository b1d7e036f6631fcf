use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::{Collection, DocumentStore, StoreError};

/// Process-local store used by tests, demos, and ephemeral servers.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<Collection, Vec<Value>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn load_collection(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let guard = self
            .collections
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store mutex poisoned".to_string()))?;
        Ok(guard.get(&collection).cloned().unwrap_or_default())
    }

    fn save_collection(
        &self,
        collection: Collection,
        documents: &[Value],
    ) -> Result<(), StoreError> {
        let mut guard = self
            .collections
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store mutex poisoned".to_string()))?;
        guard.insert(collection, documents.to_vec());
        Ok(())
    }
}
