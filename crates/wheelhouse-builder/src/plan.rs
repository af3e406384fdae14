//! Build matrix selection and the aggregated report

use crate::attempt::BuildAttemptResult;
use crate::error::{BuildError, Result};
use camino::Utf8Path;
use wheelhouse_core::types::{PackageConfig, Skips, VersionEntry};
use wheelhouse_core::version::same_version;

/// Which (version, runtime) pairs to build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPlan {
    /// Versions to build; every configured version when empty
    pub versions: Vec<String>,
    /// Runtimes to build each version for
    pub pythons: Vec<String>,
    /// Versions neither built nor emitted
    pub exclude_versions: Vec<String>,
}

impl BuildPlan {
    pub fn new(pythons: Vec<String>) -> Self {
        Self {
            pythons,
            ..Default::default()
        }
    }

    pub fn with_versions(mut self, versions: Vec<String>) -> Self {
        self.versions = versions;
        self
    }

    pub fn excluding(mut self, versions: Vec<String>) -> Self {
        self.exclude_versions = versions;
        self
    }

    pub fn is_excluded(&self, version: &str) -> bool {
        contains_version(&self.exclude_versions, version)
    }

    /// Configured versions to build, in configuration order
    pub fn select<'c>(&self, config: &'c PackageConfig) -> Result<Vec<&'c VersionEntry>> {
        if self.pythons.is_empty() {
            return Err(BuildError::Plan("no runtimes selected".to_string()));
        }
        for wanted in &self.versions {
            if !config
                .versions
                .iter()
                .any(|v| same_version(&v.version, wanted))
            {
                return Err(BuildError::Plan(format!(
                    "version {} is not configured",
                    wanted
                )));
            }
        }

        Ok(config
            .versions
            .iter()
            .filter(|v| self.versions.is_empty() || contains_version(&self.versions, &v.version))
            .filter(|v| !self.is_excluded(&v.version))
            .collect())
    }

    /// The configuration to commit: the input minus excluded versions
    pub fn emit(&self, config: &PackageConfig) -> PackageConfig {
        let mut emitted = config.clone();
        emitted.versions.retain(|v| !self.is_excluded(&v.version));
        emitted
    }
}

fn contains_version(list: &[String], version: &str) -> bool {
    list.iter().any(|v| same_version(v, version))
}

/// Everything one package run produced
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub package: String,
    pub results: Vec<BuildAttemptResult>,
    /// Minimal configuration to commit
    pub config: PackageConfig,
    /// Updated skip ledger
    pub skips: Skips,
}

impl BuildReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &BuildAttemptResult> {
        self.results.iter().filter(|r| r.success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &BuildAttemptResult> {
        self.results.iter().filter(|r| !r.success())
    }

    pub fn wheels(&self) -> Vec<&Utf8Path> {
        self.results
            .iter()
            .filter_map(|r| r.wheel.as_deref())
            .collect()
    }

    pub fn is_complete_success(&self) -> bool {
        !self.results.is_empty() && self.failed().next().is_none()
    }
}
