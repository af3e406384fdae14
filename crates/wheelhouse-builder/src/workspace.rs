//! Per-package scratch directories
//!
//! `{work}/{package}/src` holds the checkout and `{work}/{package}/dist`
//! collects built wheels. One workspace belongs to one in-progress build.

use crate::error::{BuildError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::ErrorKind;
use glob::{MatchOptions, Pattern};
use wheelhouse_core::runtime::wheel_prefix;
use wheelhouse_core::utils::absolute_path;

#[derive(Debug, Clone)]
pub struct BuildWorkspace {
    root: Utf8PathBuf,
    source_dir: Utf8PathBuf,
    dist_dir: Utf8PathBuf,
}

impl BuildWorkspace {
    /// Workspace for `package` under `work_dir`, resolved to an absolute
    /// path since build commands run from inside the checkout
    pub fn new(work_dir: &Utf8Path, package: &str) -> Result<Self> {
        let root = absolute_path(&work_dir.join(package))?;
        Ok(Self {
            source_dir: root.join("src"),
            dist_dir: root.join("dist"),
            root,
        })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn source_dir(&self) -> &Utf8Path {
        &self.source_dir
    }

    pub fn dist_dir(&self) -> &Utf8Path {
        &self.dist_dir
    }

    /// Create an empty dist directory and a fresh parent for the checkout.
    ///
    /// A checkout left by an earlier run is removed since `git clone`
    /// refuses a non-empty destination.
    pub fn setup(&self) -> Result<()> {
        remove_dir_if_exists(&self.source_dir)?;
        remove_dir_if_exists(&self.dist_dir)?;
        for dir in [&self.root, &self.dist_dir] {
            fs::create_dir_all(dir).map_err(|e| BuildError::workspace(dir.as_str(), e))?;
        }
        Ok(())
    }

    /// The wheel built for (package, version, runtime), if present in dist.
    ///
    /// Name matching ignores case since build backends differ in how they
    /// case the distribution name.
    pub fn find_wheel(&self, package: &str, version: &str, python: &str) -> Option<Utf8PathBuf> {
        let pattern = format!(
            "{}/{}*.whl",
            Pattern::escape(self.dist_dir.as_str()),
            Pattern::escape(&wheel_prefix(package, version, python))
        );
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };
        let paths = match glob::glob_with(&pattern, options) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::debug!("Invalid wheel pattern {}: {}", pattern, e);
                return None;
            }
        };
        let mut matches: Vec<Utf8PathBuf> = paths
            .filter_map(|p| p.ok())
            .filter_map(|p| Utf8PathBuf::from_path_buf(p).ok())
            .collect();
        matches.sort();
        matches.into_iter().next()
    }
}

fn remove_dir_if_exists(dir: &Utf8Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BuildError::workspace(dir.as_str(), e)),
    }
}
