//! # wheelhouse-core
//!
//! Core library for wheelhouse providing:
//! - Package configuration, skip ledger and lease documents
//! - The version specifier language and numeric version comparison
//! - Effective configuration resolution (base + first matching override)
//! - Validation of every document before a build runs
//! - Python runtime tags and wheel filenames
//! - Hierarchical agent configuration

pub mod catalog;
pub mod config;
pub mod error;
pub mod resolve;
pub mod runtime;
pub mod types;
pub mod utils;
pub mod validate;
pub mod version;

pub use catalog::PackageCatalog;
pub use config::{AgentConfig, AgentConfigLoader};
pub use error::{Error, Result};
pub use resolve::{resolve, EffectiveConfig};
pub use version::{compare_versions, matches_version, VersionSpec};
