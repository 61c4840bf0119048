use crate::store::BlobStore;

/// Copy the document stored under `key` from one backend to another.
///
/// Returns `false` when the source holds nothing under `key`. The value is
/// validated as JSON before it is written.
pub fn copy_blob(from: &dyn BlobStore, to: &dyn BlobStore, key: &str) -> crate::Result<bool> {
    let Some(data) = from.read(key)? else {
        return Ok(false);
    };
    serde_json::from_str::<serde_json::Value>(&data)?;
    to.write(key, &data)?;
    Ok(true)
}

/// Migrate a file-backed document into a SQLite database file.
///
/// - `file_dir`: directory of the file backend
/// - `sqlite_path`: destination SQLite DB (created if missing)
#[cfg(feature = "sqlite")]
pub fn migrate_file_to_sqlite(
    file_dir: &std::path::Path,
    sqlite_path: &std::path::Path,
    key: &str,
) -> crate::Result<bool> {
    use crate::store::FileBlobStore;
    use crate::store::SqliteBlobStore;

    let from = FileBlobStore::new(file_dir);
    let to = SqliteBlobStore::new(sqlite_path);
    copy_blob(&from, &to, key)
}

#[cfg(not(feature = "sqlite"))]
pub fn migrate_file_to_sqlite(
    _file_dir: &std::path::Path,
    _sqlite_path: &std::path::Path,
    _key: &str,
) -> crate::Result<bool> {
    Err(crate::LedgerError::StorageUnavailable(std::io::Error::other(
        "sqlite backend not compiled; enable with `--features aether-ledger/sqlite`",
    )))
}
