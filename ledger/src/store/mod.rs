//! String-keyed blob storage the ledger persists its document into.

/// Backend holding one string value per key.
pub trait BlobStore: Send + Sync {
    /// `Ok(None)` when nothing is stored under `key`.
    fn read(&self, key: &str) -> std::io::Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> std::io::Result<()>;
    fn remove(&self, key: &str) -> std::io::Result<()>;
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::FileBlobStore;
pub use memory::MemoryBlobStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBlobStore;
