/// Errors surfaced by the ledger.
///
/// Unknown ids on update are not errors; those operations return `false`.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The storage backend could not be read or written.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] std::io::Error),

    /// JSON text did not parse or did not match the store shape.
    #[error("invalid memory document: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configuration could not be parsed.
    #[error("invalid ledger config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
