#![forbid(unsafe_code)]

pub mod documents;
pub mod repository;
pub mod sqlite;

pub use documents::{DecodedHistory, DecodedProgress};
pub use repository::{InMemoryStore, KeyValueStore, Storage, StorageError};
