//! Local-first experience ledger: experiences, preferences, goals, learnings
//! and relationships kept in one JSON document, with filtered queries and
//! derived analytics.

pub mod analytics;
pub mod clock;
pub mod config;
pub mod document;
mod error;
pub mod factory;
mod ledger;
pub mod migrate;
pub mod persist;
pub mod query;
pub mod store;
pub mod types;

pub use config::LedgerConfig;
pub use config::RetentionPolicy;
pub use document::MemoryDocument;
pub use error::LedgerError;
pub use error::Result;
pub use ledger::Ledger;
