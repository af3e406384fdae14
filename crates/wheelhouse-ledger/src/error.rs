//! Error types for wheelhouse-ledger
//!
//! Claim conflicts and missing leases are outcomes, not errors. Everything
//! here means the ledger itself could not be used.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    /// The backing store could not be read or written
    #[error("Ledger I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A key that cannot address a ledger entry
    #[error("Invalid ledger key: {key:?}")]
    InvalidKey { key: String },

    /// A document could not be produced or validated
    #[error(transparent)]
    Document(#[from] wheelhouse_core::Error),
}

impl LedgerError {
    pub fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            key: key.into(),
            source,
        }
    }

    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }
}
