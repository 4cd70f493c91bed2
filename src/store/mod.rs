//! Per-device persisted key space.
//!
//! The application only sees the [`KeyValueStore`] trait, so the on-disk
//! [`FileStore`] can be swapped for [`MemoryStore`] in tests.

pub mod file;
pub mod memory;
pub mod profile;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use profile::ProfileStore;

use crate::error::StoreError;

pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;

    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Drop every key.
    fn clear(&mut self) -> Result<(), StoreError>;

    fn keys(&self) -> Vec<String>;
}
