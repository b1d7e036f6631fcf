//! Vehicle registry, violation ledger, and parking-sticker linkage over a
//! pluggable JSON document store.

pub mod config;
pub mod engine;
pub mod error;
pub mod keys;
pub mod ledger;
pub mod linkage;
pub mod registry;
pub mod statistics;
pub mod store;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use engine::{BatchReport, EngineError, ErrorKind, OperationResult, TrafficEngine};
pub use store::{DocumentStore, JsonFileStore, MemoryStore};
