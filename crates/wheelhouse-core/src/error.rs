//! Error types for wheelhouse-core

use thiserror::Error;

/// Result type alias using wheelhouse-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for wheelhouse
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// A package configuration or skip document failed validation
    #[error("Invalid package configuration: {message}")]
    ConfigValidation { message: String },

    /// A version specifier could not be parsed
    #[error("Invalid version specifier {spec:?}: {reason}")]
    VersionSpecParse { spec: String, reason: String },

    /// Invalid agent configuration (files, environment overrides)
    #[error("Invalid agent configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create a package configuration validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create a version specifier parse error
    pub fn spec_parse(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::VersionSpecParse {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid agent configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// True for errors that make a package run fail fast before any build
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ConfigValidation { .. } | Self::VersionSpecParse { .. }
        )
    }
}
