//! Key-value persistence backends for the task collection.

pub mod file_store;
pub mod kv;

pub use file_store::{FileKvStore, platform_store_dir, store_dir_from_env};
pub use kv::{KeyValueStore, MemoryKvStore};
