use super::BlobStore;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        CREATE TABLE IF NOT EXISTS ledger_blobs (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
}

fn to_io(e: rusqlite::Error) -> std::io::Error {
    std::io::Error::other(format!("sqlite: {e}"))
}

/// Key-value table in a single SQLite file. Opens a connection per call.
#[derive(Debug, Clone)]
pub struct SqliteBlobStore {
    path: std::path::PathBuf,
}

impl SqliteBlobStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn open_conn(&self) -> std::io::Result<Connection> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(&self.path).map_err(to_io)?;
        init_db(&conn).map_err(to_io)?;
        Ok(conn)
    }
}

impl BlobStore for SqliteBlobStore {
    fn read(&self, key: &str) -> std::io::Result<Option<String>> {
        let conn = self.open_conn()?;
        conn.query_row(
            "SELECT value FROM ledger_blobs WHERE key=?1",
            params![key],
            |r| r.get::<_, String>(0),
        )
        .optional()
        .map_err(to_io)
    }

    fn write(&self, key: &str, value: &str) -> std::io::Result<()> {
        let conn = self.open_conn()?;
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO ledger_blobs (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value=excluded.value,
                updated_at=excluded.updated_at",
            params![key, value, now],
        )
        .map_err(to_io)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        let conn = self.open_conn()?;
        conn.execute("DELETE FROM ledger_blobs WHERE key=?1", params![key])
            .map_err(to_io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteBlobStore::new(dir.path().join("ledger.db"));
        assert_eq!(store.read("k").unwrap(), None);
        store.write("k", "one").unwrap();
        store.write("k", "two").unwrap();
        assert_eq!(store.read("k").unwrap().as_deref(), Some("two"));
        store.remove("k").unwrap();
        assert_eq!(store.read("k").unwrap(), None);
    }
}
