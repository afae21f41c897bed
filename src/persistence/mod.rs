//! This module contains the persistence layer: key-value stores and the
//! threshold store adapter built on top of them.

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod threshold_store;
pub mod traits;

pub use memory::InMemoryStateRepository;
pub use sqlite::SqliteStateRepository;
pub use threshold_store::KeyValueThresholdStore;
