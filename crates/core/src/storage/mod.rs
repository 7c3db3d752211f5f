//! Storage module - JSON file persistence used by the tracked-set store.

mod file_store;

pub use file_store::{FileStore, JsonFileStore};
