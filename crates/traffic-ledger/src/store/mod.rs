//! Document store boundary.
//!
//! The engine only ever loads a full collection, mutates it in memory, and
//! writes the full collection back. There is no transaction or row-level lock,
//! so a store must have at most one logical writer at a time.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Named collections persisted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Vehicles,
    Violations,
    Stickers,
    StickerDeliveries,
    StickerMisuseReports,
    Counters,
}

impl Collection {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vehicles => "vehicles",
            Self::Violations => "violations",
            Self::Stickers => "stickers",
            Self::StickerDeliveries => "stickerDeliveries",
            Self::StickerMisuseReports => "stickerMisuseReports",
            Self::Counters => "counters",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Get-all/put-all access to JSON documents, one table per collection.
pub trait DocumentStore: Send + Sync {
    fn load_collection(&self, collection: Collection) -> Result<Vec<Value>, StoreError>;
    fn save_collection(&self, collection: Collection, documents: &[Value])
        -> Result<(), StoreError>;
}

/// Failures raised while reading or writing a collection.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access collection {collection}: {source}")]
    Io {
        collection: Collection,
        #[source]
        source: std::io::Error,
    },
    #[error("collection {collection} holds malformed documents: {source}")]
    Malformed {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Load a collection and decode every document into `T`.
pub fn load_typed<S, T>(store: &S, collection: Collection) -> Result<Vec<T>, StoreError>
where
    S: DocumentStore + ?Sized,
    T: DeserializeOwned,
{
    store
        .load_collection(collection)?
        .into_iter()
        .map(|document| {
            serde_json::from_value(document)
                .map_err(|source| StoreError::Malformed { collection, source })
        })
        .collect()
}

/// Encode every record and replace the stored collection.
pub fn save_typed<S, T>(store: &S, collection: Collection, records: &[T]) -> Result<(), StoreError>
where
    S: DocumentStore + ?Sized,
    T: Serialize,
{
    let documents = records
        .iter()
        .map(|record| {
            serde_json::to_value(record)
                .map_err(|source| StoreError::Malformed { collection, source })
        })
        .collect::<Result<Vec<_>, _>>()?;
    store.save_collection(collection, &documents)
}
