use crate::document::MemoryDocument;
use crate::error::Result;
use crate::store::BlobStore;

/// Strict load: `Ok(None)` when the key is absent, an error on I/O or parse
/// failure. Out-of-range scalars are clamped; duplicate ids are a parse error.
pub fn try_load(backend: &dyn BlobStore, key: &str) -> Result<Option<MemoryDocument>> {
    let Some(data) = backend.read(key)? else {
        return Ok(None);
    };
    let mut doc: MemoryDocument = serde_json::from_str(&data)?;
    doc.normalize()?;
    Ok(Some(doc))
}

/// Lenient load: any failure is logged and yields an empty document.
pub fn load(backend: &dyn BlobStore, key: &str) -> MemoryDocument {
    match try_load(backend, key) {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            tracing::debug!("ledger: no document under {key:?}, starting empty");
            MemoryDocument::default()
        }
        Err(e) => {
            tracing::warn!("ledger: failed to load {key:?}, starting empty: {e}");
            MemoryDocument::default()
        }
    }
}

/// Serialize the whole document, metadata included, under `key`.
pub fn save(backend: &dyn BlobStore, key: &str, doc: &MemoryDocument) -> Result<()> {
    let data = serde_json::to_string(doc)?;
    backend.write(key, &data)?;
    tracing::debug!("ledger: saved {} bytes under {key:?}", data.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LedgerError;
    use crate::store::MemoryBlobStore;

    #[test]
    fn missing_and_corrupt_documents_load_empty() {
        let backend = MemoryBlobStore::new();
        assert!(try_load(&backend, "k").unwrap().is_none());
        assert!(load(&backend, "k").is_empty());

        backend.write("k", "{\"experiences\": 3").unwrap();
        assert!(matches!(try_load(&backend, "k"), Err(LedgerError::Parse(_))));
        assert!(load(&backend, "k").is_empty());
    }

    #[test]
    fn save_then_load_rehydrates_timestamps() {
        let backend = MemoryBlobStore::new();
        let doc: MemoryDocument = serde_json::from_str(
            r#"{
                "experiences": [{
                    "id": "exp-1",
                    "timestamp": "2025-02-03T04:05:06.789Z",
                    "type": "learning",
                    "content": "read a paper",
                    "emotionalImpact": 0.4,
                    "learningValue": 0.9
                }],
                "preferences": [], "goals": [], "learnings": [], "relationships": []
            }"#,
        )
        .unwrap();
        save(&backend, "k", &doc).unwrap();
        let back = try_load(&backend, "k").unwrap().unwrap();
        assert_eq!(back, doc);
        assert_eq!(
            back.experiences[0].timestamp.to_rfc3339(),
            "2025-02-03T04:05:06.789+00:00"
        );
    }

    #[test]
    fn load_clamps_stored_scalars() {
        let backend = MemoryBlobStore::new();
        backend
            .write(
                "k",
                r#"{
                    "experiences": [{
                        "id": "exp-1", "timestamp": "2025-02-03T04:05:06Z", "type": "learning",
                        "content": "x", "emotionalImpact": 4.0, "learningValue": -2.0
                    }],
                    "preferences": [], "goals": [], "learnings": [], "relationships": []
                }"#,
            )
            .unwrap();
        let doc = try_load(&backend, "k").unwrap().unwrap();
        assert_eq!(doc.experiences[0].emotional_impact, 1.0);
        assert_eq!(doc.experiences[0].learning_value, 0.0);
    }
}
