//! Package configs and orchestrator fixtures

use camino::Utf8PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wheelhouse_builder::{
    BuildOrchestrator, BuildWorkspace, BuilderSettings, CommandRunner, LocalLogStore,
};
use wheelhouse_core::types::{PackageConfig, VersionEntry};

pub const PACKAGE: &str = "zope.interface";

pub fn pythons() -> Vec<String> {
    ["3.10", "3.11", "3.12", "3.13"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Two versions, no overrides
pub fn sample_config() -> PackageConfig {
    PackageConfig::new(
        "https://github.com/zopefoundation/zope.interface",
        vec![
            VersionEntry::new("6.0", "6.0"),
            VersionEntry::new("6.1", "6.1"),
        ],
    )
}

pub struct Harness {
    pub orchestrator: BuildOrchestrator,
    pub workspace: BuildWorkspace,
    pub work_dir: Utf8PathBuf,
    pub patch_dir: Utf8PathBuf,
    _temp: TempDir,
}

pub fn harness(runner: Arc<dyn CommandRunner>, max_parallel_runtimes: usize) -> Harness {
    let temp = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let work_dir = root.join("work");
    let patch_dir = root.join("packages").join(PACKAGE);

    let settings = BuilderSettings {
        python_bin_dir: Utf8PathBuf::from("/usr/bin"),
        platform: "linux_aarch64".to_string(),
        build_timeout: Duration::from_secs(60),
        step_timeout: Duration::from_secs(60),
        max_parallel_runtimes,
    };
    let orchestrator = BuildOrchestrator::new(
        runner,
        Arc::new(LocalLogStore::new(work_dir.clone())),
        settings,
    );

    Harness {
        orchestrator,
        workspace: BuildWorkspace::new(&work_dir, PACKAGE).unwrap(),
        work_dir,
        patch_dir,
        _temp: temp,
    }
}
