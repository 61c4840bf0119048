use super::BlobStore;
use std::path::Path;
use std::path::PathBuf;

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl BlobStore for FileBlobStore {
    fn read(&self, key: &str) -> std::io::Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &str, value: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        // Write a sibling temp file first so a crash never leaves half a document.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path().join("nested"));
        assert_eq!(store.read("k").unwrap(), None);
        store.write("k", "{\"a\":1}").unwrap();
        assert_eq!(store.read("k").unwrap().as_deref(), Some("{\"a\":1}"));
        store.remove("k").unwrap();
        assert_eq!(store.read("k").unwrap(), None);
        store.remove("k").unwrap();
    }

    #[test]
    fn key_is_sanitized_into_file_name() {
        let store = FileBlobStore::new("/tmp/x");
        assert_eq!(store.path_for("a/b c"), PathBuf::from("/tmp/x/a_b_c.json"));
    }
}
