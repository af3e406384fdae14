//! Known build failures (`packages/{name}/skips.yaml`)

use crate::error::Result;
use crate::version::{looks_like_specifier, same_version, VersionSpec};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;

/// Skip ledger of one package
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skips {
    #[serde(default)]
    pub skips: Vec<SkipEntry>,
}

/// A known failing (version, runtime set) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipEntry {
    /// Exact version or version specifier
    pub version: String,

    /// Python versions that fail
    pub python: Vec<String>,

    /// Human-readable failure explanation
    pub reason: String,

    /// Pointer to the stored build log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,

    /// How many times this failure has been recorded
    #[serde(default, skip_serializing_if = "is_zero")]
    pub attempts: u32,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl SkipEntry {
    pub fn new(
        version: impl Into<String>,
        python: Vec<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            python,
            reason: reason.into(),
            log: None,
            attempts: 0,
        }
    }

    /// True when `version` is an exact version rather than a range
    pub fn is_exact(&self) -> bool {
        !looks_like_specifier(&self.version)
    }

    /// Whether this entry applies to `version`.
    ///
    /// Ranges that fail to parse apply to nothing; validation reports them.
    pub fn applies_to(&self, version: &str) -> bool {
        if self.is_exact() {
            same_version(&self.version, version)
        } else {
            VersionSpec::parse(&self.version)
                .map(|spec| spec.matches(version))
                .unwrap_or(false)
        }
    }

    /// Whether this entry skips the (version, python) pair
    pub fn covers(&self, version: &str, python: &str) -> bool {
        self.python.iter().any(|p| p == python) && self.applies_to(version)
    }

    /// Order-insensitive comparison of the runtime set
    pub fn same_runtimes(&self, python: &[String]) -> bool {
        let ours: BTreeSet<&str> = self.python.iter().map(String::as_str).collect();
        let theirs: BTreeSet<&str> = python.iter().map(String::as_str).collect();
        ours == theirs
    }
}

impl Skips {
    pub fn new(skips: Vec<SkipEntry>) -> Self {
        Self { skips }
    }

    pub fn is_empty(&self) -> bool {
        self.skips.is_empty()
    }

    pub fn len(&self) -> usize {
        self.skips.len()
    }

    /// Whether any entry skips the (version, python) pair
    pub fn covers(&self, version: &str, python: &str) -> bool {
        self.skips.iter().any(|s| s.covers(version, python))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Read a skips file. A missing file is an empty ledger.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_yaml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the skips file. An empty ledger removes the file instead.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        if self.is_empty() {
            return match fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }

        let yaml = self.to_yaml()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, yaml)?;
        Ok(())
    }
}
