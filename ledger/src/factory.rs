use crate::store::BlobStore;
use crate::store::FileBlobStore;

#[cfg(feature = "sqlite")]
use crate::store::SqliteBlobStore;

/// Backend selection for ledger persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    File,
    #[cfg(feature = "sqlite")]
    Sqlite,
}

/// Choose backend using env `AETHER_LEDGER_BACKEND` if present: `sqlite` or `file`.
/// Defaults to file; if `sqlite` is requested but not compiled in, falls back to file.
pub fn choose_backend_from_env() -> Backend {
    let v = std::env::var("AETHER_LEDGER_BACKEND").unwrap_or_default();
    match v.as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" | "SQLITE" => Backend::Sqlite,
        _ => Backend::File,
    }
}

/// Parse a backend name given on the command line.
pub fn parse_backend(name: &str) -> Option<Backend> {
    match name.to_ascii_lowercase().as_str() {
        "file" | "json" => Some(Backend::File),
        #[cfg(feature = "sqlite")]
        "sqlite" => Some(Backend::Sqlite),
        _ => None,
    }
}

/// Build a store rooted at `home` (typically `~/.aether/ledger`).
/// Paths can be overridden via env:
/// - `AETHER_LEDGER_FILE_DIR` for the JSON file directory
/// - `AETHER_LEDGER_DB` for the SQLite file path
pub fn open_store(home: &std::path::Path, backend: Option<Backend>) -> Box<dyn BlobStore> {
    let be = backend.unwrap_or_else(choose_backend_from_env);
    tracing::debug!("ledger: opening {be:?} store under {}", home.display());
    match be {
        Backend::File => {
            let dir = std::env::var("AETHER_LEDGER_FILE_DIR")
                .map(std::path::PathBuf::from)
                .unwrap_or_else(|_| home.to_path_buf());
            Box::new(FileBlobStore::new(dir))
        }
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => {
            let path = std::env::var("AETHER_LEDGER_DB")
                .map(std::path::PathBuf::from)
                .unwrap_or_else(|_| home.join("ledger.db"));
            Box::new(SqliteBlobStore::new(path))
        }
    }
}
