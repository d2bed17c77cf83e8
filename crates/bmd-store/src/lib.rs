//! Series storage for the collector.
//!
//! The sync engine talks to the `SeriesStore` trait; two implementations
//! are provided: `JsonFileStore` (durable, one JSON file per series plus a
//! JSON Lines run log) and `MemoryStore` (volatile, for tests).

pub mod contract;
pub mod error;
pub mod json;
pub mod memory;

mod tables;

pub use contract::SeriesStore;
pub use error::{StoreError, StoreResult};
pub use json::JsonFileStore;
pub use memory::MemoryStore;
