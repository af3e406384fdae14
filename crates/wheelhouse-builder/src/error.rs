//! Errors that stop a package run
//!
//! Failures of individual attempts are `AttemptFailure` data instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BuildError>;

#[derive(Error, Debug)]
pub enum BuildError {
    /// The package configuration, skip ledger or plan is invalid
    #[error(transparent)]
    Config(#[from] wheelhouse_core::Error),

    /// The local workspace could not be prepared
    #[error("Workspace error at {path}: {source}")]
    Workspace {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Build plan error: {0}")]
    Plan(String),
}

impl BuildError {
    pub fn workspace(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Workspace {
            path: path.into(),
            source,
        }
    }

    /// Whether the run was rejected before any build started
    pub fn is_validation(&self) -> bool {
        match self {
            BuildError::Config(e) => e.is_validation(),
            BuildError::Plan(_) => true,
            BuildError::Workspace { .. } => false,
        }
    }
}
