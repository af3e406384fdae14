//! Package build configuration (`packages/{name}/config.yaml`)

use crate::error::{Error, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

/// Default number of versions of history to build
pub const DEFAULT_VERSION_COUNT: u32 = 10;

/// Build configuration for one package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Git repository URL of the package source
    pub repo: String,

    /// Target history depth
    #[serde(
        default = "default_version_count",
        skip_serializing_if = "is_default_version_count"
    )]
    pub version_count: u32,

    /// Tag/version pairs to build, in order
    #[serde(default)]
    pub versions: Vec<VersionEntry>,

    /// System packages to install before building, optionally pinned (`pkg=1.0`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system_deps: Vec<String>,

    /// Environment variables set during the build
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Patch files applied in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<String>,

    /// Full build command replacing the default wheel build
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub script: String,

    /// Version-scoped deltas, first match wins
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<Override>,
}

/// A git ref and the package version it produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Git tag or ref to check out
    pub tag: String,

    /// Published version string
    pub version: String,
}

impl VersionEntry {
    pub fn new(tag: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            version: version.into(),
        }
    }
}

/// Version-range-scoped configuration delta
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Override {
    /// Version specifier selecting the versions this override applies to
    #[serde(rename = "match")]
    pub match_spec: String,

    /// Appended after the base system dependencies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system_deps: Vec<String>,

    /// Merged into the base environment, override wins
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Appended after the base patches
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<String>,

    /// Replaces the base script when non-empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub script: String,
}

fn default_version_count() -> u32 {
    DEFAULT_VERSION_COUNT
}

fn is_default_version_count(count: &u32) -> bool {
    *count == DEFAULT_VERSION_COUNT
}

impl PackageConfig {
    /// Create a config with only a repo and versions
    pub fn new(repo: impl Into<String>, versions: Vec<VersionEntry>) -> Self {
        Self {
            repo: repo.into(),
            version_count: DEFAULT_VERSION_COUNT,
            versions,
            system_deps: Vec::new(),
            env: BTreeMap::new(),
            patches: Vec::new(),
            script: String::new(),
            overrides: Vec::new(),
        }
    }

    /// Parse a YAML document, applying defaults
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut config: PackageConfig = serde_yaml_ng::from_str(content)?;
        if config.version_count == 0 {
            config.version_count = DEFAULT_VERSION_COUNT;
        }
        Ok(config)
    }

    /// Serialize as a minimal YAML document
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Read and parse a config file
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config_not_found(path.as_str())
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_yaml(&content)
    }

    /// Write the config, creating parent directories
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let yaml = self.to_yaml()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Look up the tag for a version
    pub fn tag_for(&self, version: &str) -> Option<&str> {
        self.versions
            .iter()
            .find(|v| v.version == version)
            .map(|v| v.tag.as_str())
    }
}
