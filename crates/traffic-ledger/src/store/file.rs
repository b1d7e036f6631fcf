use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use super::{Collection, DocumentStore, StoreError};

/// One pretty-printed JSON array per collection under a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|err| {
            StoreError::Unavailable(format!(
                "cannot create data directory {}: {err}",
                root.display()
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, collection: Collection) -> PathBuf {
        self.root.join(format!("{}.json", collection.name()))
    }
}

impl DocumentStore for JsonFileStore {
    fn load_collection(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let path = self.path_for(collection);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { collection, source }),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw).map_err(|source| StoreError::Malformed { collection, source })
    }

    fn save_collection(
        &self,
        collection: Collection,
        documents: &[Value],
    ) -> Result<(), StoreError> {
        let path = self.path_for(collection);
        let staging = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(documents)
            .map_err(|source| StoreError::Malformed { collection, source })?;

        fs::write(&staging, body).map_err(|source| StoreError::Io { collection, source })?;
        fs::rename(&staging, &path).map_err(|source| StoreError::Io { collection, source })?;

        debug!(collection = collection.name(), documents = documents.len(), "collection saved");
        Ok(())
    }
}
