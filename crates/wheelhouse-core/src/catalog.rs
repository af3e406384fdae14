//! Filesystem package catalog
//!
//! Layout: `{packages_dir}/{name}/config.yaml`, `{packages_dir}/{name}/skips.yaml`
//! and any patch files next to them.

use crate::error::{Error, Result};
use crate::types::{PackageConfig, Skips};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

const CONFIG_FILE: &str = "config.yaml";
const SKIPS_FILE: &str = "skips.yaml";

/// Committed package configurations and skip ledgers
#[derive(Debug, Clone)]
pub struct PackageCatalog {
    packages_dir: Utf8PathBuf,
}

impl PackageCatalog {
    pub fn new(packages_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            packages_dir: packages_dir.into(),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.packages_dir
    }

    /// Directory holding a package's config, skips and patches
    pub fn package_dir(&self, name: &str) -> Result<Utf8PathBuf> {
        check_package_name(name)?;
        Ok(self.packages_dir.join(name))
    }

    pub fn config_path(&self, name: &str) -> Result<Utf8PathBuf> {
        Ok(self.package_dir(name)?.join(CONFIG_FILE))
    }

    pub fn skips_path(&self, name: &str) -> Result<Utf8PathBuf> {
        Ok(self.package_dir(name)?.join(SKIPS_FILE))
    }

    /// Whether a package has a committed configuration
    pub fn has_config(&self, name: &str) -> bool {
        self.config_path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    pub fn load_config(&self, name: &str) -> Result<PackageConfig> {
        PackageConfig::load(&self.config_path(name)?)
    }

    pub fn load_skips(&self, name: &str) -> Result<Skips> {
        Skips::load(&self.skips_path(name)?)
    }

    pub fn save_config(&self, name: &str, config: &PackageConfig) -> Result<()> {
        config.save(&self.config_path(name)?)
    }

    pub fn save_skips(&self, name: &str, skips: &Skips) -> Result<()> {
        skips.save(&self.skips_path(name)?)
    }

    /// Names of all packages with a config file, sorted
    pub fn list_packages(&self) -> Result<Vec<String>> {
        if !self.packages_dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.packages_dir)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            if self.has_config(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Reject names that would escape the catalog directory
pub fn check_package_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_whitespace);
    if valid {
        Ok(())
    } else {
        Err(Error::validation(format!("invalid package name {:?}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SkipEntry, VersionEntry};
    use tempfile::TempDir;

    fn catalog() -> (PackageCatalog, TempDir) {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        (PackageCatalog::new(root), temp)
    }

    #[test]
    fn test_save_and_load() {
        let (catalog, _temp) = catalog();
        assert!(!catalog.has_config("requests"));

        let config = PackageConfig::new(
            "https://github.com/psf/requests",
            vec![VersionEntry::new("v2.31.0", "2.31.0")],
        );
        catalog.save_config("requests", &config).unwrap();
        assert!(catalog.has_config("requests"));
        assert_eq!(catalog.load_config("requests").unwrap(), config);

        assert!(catalog.load_skips("requests").unwrap().is_empty());
        let skips = Skips::new(vec![SkipEntry::new("2.31.0", vec!["3.13".into()], "x")]);
        catalog.save_skips("requests", &skips).unwrap();
        assert_eq!(catalog.load_skips("requests").unwrap(), skips);

        assert_eq!(catalog.list_packages().unwrap(), vec!["requests".to_string()]);
    }

    #[test]
    fn test_rejects_traversal() {
        let (catalog, _temp) = catalog();
        assert!(catalog.package_dir("../etc").is_err());
        assert!(catalog.package_dir("").is_err());
        assert!(!catalog.has_config(".."));
    }

    #[test]
    fn test_list_missing_root() {
        let catalog = PackageCatalog::new("/nonexistent/packages");
        assert!(catalog.list_packages().unwrap().is_empty());
    }
}
