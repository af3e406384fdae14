//! Build matrix state machine
//!
//! Per package: validate, clone once, then for each selected version check
//! out its tag, install the version's system dependencies and apply its
//! patches, and build every runtime. Any failure before the runtime builds
//! fails all runtimes of that version (a clone failure fails every version).
//! Per-runtime failures never stop the run; they are folded into the skip
//! ledger once the whole matrix has been attempted.

use crate::attempt::{AttemptFailure, AttemptStage, BuildAttemptResult};
use crate::error::Result;
use crate::logs::LogStore;
use crate::plan::{BuildPlan, BuildReport};
use crate::runner::{CommandRequest, CommandRunner};
use crate::skips::fold_skips;
use crate::steps::{transcript, StepFailure, Steps};
use crate::workspace::BuildWorkspace;
use camino::Utf8PathBuf;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use wheelhouse_core::resolve::{resolve, EffectiveConfig};
use wheelhouse_core::runtime::{python_binary, wheel_filename};
use wheelhouse_core::types::{PackageConfig, Skips, VersionEntry};
use wheelhouse_core::utils::absolute_path;
use wheelhouse_core::validate::{validate_config, validate_skips};

/// Variables every build command receives on top of the package's `env`
pub const ENV_PYTHON: &str = "PYTHON";
pub const ENV_PYTHON_VERSION: &str = "WHEELHOUSE_PYTHON_VERSION";
pub const ENV_DIST_DIR: &str = "WHEELHOUSE_DIST_DIR";

/// Default limit for git and apk steps
const STEP_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Host-specific build settings
#[derive(Debug, Clone)]
pub struct BuilderSettings {
    /// Directory containing `python3.x` interpreters
    pub python_bin_dir: Utf8PathBuf,
    /// Platform tag of produced wheels
    pub platform: String,
    /// Limit for each build command
    pub build_timeout: Duration,
    /// Limit for each preparation command
    pub step_timeout: Duration,
    /// Runtimes of one version built concurrently
    pub max_parallel_runtimes: usize,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            python_bin_dir: Utf8PathBuf::from("/usr/bin"),
            platform: wheelhouse_core::runtime::DEFAULT_PLATFORM.to_string(),
            build_timeout: Duration::from_secs(4 * 3600),
            step_timeout: STEP_TIMEOUT,
            max_parallel_runtimes: 1,
        }
    }
}

/// Inputs of one package run
pub struct PackageJob<'a> {
    pub package: &'a str,
    pub config: &'a PackageConfig,
    pub skips: &'a Skips,
    /// Directory holding the package's patch files
    pub patch_dir: Utf8PathBuf,
    pub workspace: &'a BuildWorkspace,
}

pub struct BuildOrchestrator {
    runner: Arc<dyn CommandRunner>,
    logs: Arc<dyn LogStore>,
    settings: BuilderSettings,
}

impl BuildOrchestrator {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        logs: Arc<dyn LogStore>,
        settings: BuilderSettings,
    ) -> Self {
        Self {
            runner,
            logs,
            settings,
        }
    }

    pub fn settings(&self) -> &BuilderSettings {
        &self.settings
    }

    /// Run the whole matrix for one package.
    ///
    /// Returns `Err` only when the run is rejected up front (invalid config,
    /// skips or plan) or the workspace cannot be prepared.
    pub async fn run(&self, job: &PackageJob<'_>, plan: &BuildPlan) -> Result<BuildReport> {
        validate_config(job.config)?;
        validate_skips(job.skips)?;
        let selected = plan.select(job.config)?;
        let job = &PackageJob {
            patch_dir: absolute_path(&job.patch_dir)?,
            ..*job
        };

        // Resolve everything before touching the workspace
        let mut resolved: Vec<(&VersionEntry, EffectiveConfig)> = Vec::with_capacity(selected.len());
        for entry in selected {
            resolved.push((entry, resolve(job.config, &entry.version)?));
        }

        info!(
            package = %job.package,
            versions = resolved.len(),
            runtimes = plan.pythons.len(),
            "Starting build matrix"
        );

        job.workspace.setup()?;
        let steps = Steps::new(self.runner.as_ref(), self.settings.step_timeout);

        let mut results = Vec::with_capacity(resolved.len() * plan.pythons.len());
        match steps
            .clone_source(&job.config.repo, job.workspace.source_dir())
            .await
        {
            Ok(_) => {
                debug!(package = %job.package, "Source acquired");
                for (entry, effective) in &resolved {
                    results.extend(self.build_version(job, &steps, entry, effective, plan).await);
                }
            }
            Err(failure) => {
                warn!(package = %job.package, "Clone failed: {}", failure.failure);
                for (entry, _) in &resolved {
                    results.extend(self.fail_all(job, &entry.version, plan, AttemptStage::Init, &failure));
                }
            }
        }

        let skips = fold_skips(job.skips, &results);
        let report = BuildReport {
            package: job.package.to_string(),
            config: plan.emit(job.config),
            skips,
            results,
        };
        info!(
            package = %job.package,
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            "Build matrix aggregated"
        );
        Ok(report)
    }

    async fn build_version(
        &self,
        job: &PackageJob<'_>,
        steps: &Steps<'_>,
        entry: &VersionEntry,
        effective: &EffectiveConfig,
        plan: &BuildPlan,
    ) -> Vec<BuildAttemptResult> {
        let version = entry.version.as_str();
        let source = job.workspace.source_dir();

        let mut prep_log = match steps.checkout(source, &entry.tag).await {
            Ok(log) => log,
            Err(failure) => {
                return self.fail_all(job, version, plan, AttemptStage::Init, &failure);
            }
        };
        debug!(package = %job.package, version = %version, "Checked out {}", entry.tag);

        match steps.install_system_deps(&effective.system_deps).await {
            Ok(log) => prep_log.push_str(&log),
            Err(failure) => {
                return self.fail_all(job, version, plan, AttemptStage::SourceAcquired, &failure);
            }
        }

        match steps
            .apply_patches(source, &job.patch_dir, &effective.patches)
            .await
        {
            Ok(log) => prep_log.push_str(&log),
            Err(failure) => {
                return self.fail_all(job, version, plan, AttemptStage::DepsInstalled, &failure);
            }
        }

        let prep_log = prep_log.as_str();
        stream::iter(plan.pythons.iter())
            .map(|python| self.build_runtime(job, version, python, effective, prep_log))
            .buffered(self.settings.max_parallel_runtimes.max(1))
            .collect::<Vec<_>>()
            .await
    }

    async fn build_runtime(
        &self,
        job: &PackageJob<'_>,
        version: &str,
        python: &str,
        effective: &EffectiveConfig,
        prep_log: &str,
    ) -> BuildAttemptResult {
        let request = self.build_request(job.workspace, python, effective);
        debug!(package = %job.package, version = %version, python = %python, "Building");

        let mut log = prep_log.to_string();
        let result = match self.runner.run(&request).await {
            Err(e) => {
                log.push_str(&format!("$ {}\n{}\n", request.display(), e));
                BuildAttemptResult::failed(
                    version,
                    python,
                    AttemptStage::PatchesApplied,
                    AttemptFailure::Spawn {
                        program: request.program.clone(),
                        message: e.to_string(),
                    },
                    log,
                )
            }
            Ok(output) => {
                log.push_str(&transcript(&request, &output));
                if output.timed_out {
                    BuildAttemptResult::failed(
                        version,
                        python,
                        AttemptStage::PatchesApplied,
                        AttemptFailure::TimedOut {
                            secs: self.settings.build_timeout.as_secs(),
                        },
                        log,
                    )
                } else if !output.success() {
                    BuildAttemptResult::failed(
                        version,
                        python,
                        AttemptStage::PatchesApplied,
                        AttemptFailure::BuildCommand {
                            exit_code: output.exit_code,
                        },
                        log,
                    )
                } else {
                    match job.workspace.find_wheel(job.package, version, python) {
                        Some(wheel) => BuildAttemptResult::succeeded(version, python, wheel, log),
                        None => {
                            let expected =
                                wheel_filename(job.package, version, python, &self.settings.platform);
                            log.push_str(&format!("no wheel matching {} in dist\n", expected));
                            BuildAttemptResult::failed(
                                version,
                                python,
                                AttemptStage::BuildAttempted,
                                AttemptFailure::ArtifactNotFound { expected },
                                log,
                            )
                        }
                    }
                }
            }
        };

        match &result.error {
            None => info!(package = %job.package, version = %version, python = %python, "Built wheel"),
            Some(e) => warn!(package = %job.package, version = %version, python = %python, "Build failed: {}", e),
        }
        self.with_stored_log(job.package, result)
    }

    /// The build command for one runtime: the custom script via `sh -c`,
    /// otherwise an isolated `pip wheel` from source
    fn build_request(
        &self,
        workspace: &BuildWorkspace,
        python: &str,
        effective: &EffectiveConfig,
    ) -> CommandRequest {
        let interpreter = python_binary(&self.settings.python_bin_dir, python);
        let base = match effective.custom_script() {
            Some(script) => CommandRequest::new("sh").args(["-c", script]),
            None => CommandRequest::new(interpreter.as_str()).args([
                "-m",
                "pip",
                "wheel",
                "--no-deps",
                "--no-binary",
                ":all:",
                "-w",
                workspace.dist_dir().as_str(),
                ".",
            ]),
        };
        base.dir(workspace.source_dir())
            .envs(&effective.env)
            .env(ENV_PYTHON, interpreter.as_str())
            .env(ENV_PYTHON_VERSION, python)
            .env(ENV_DIST_DIR, workspace.dist_dir().as_str())
            .path_prefix(self.settings.python_bin_dir.clone())
            .timeout(self.settings.build_timeout)
    }

    /// One failed result per runtime, all carrying the same step failure
    fn fail_all(
        &self,
        job: &PackageJob<'_>,
        version: &str,
        plan: &BuildPlan,
        stage: AttemptStage,
        failure: &StepFailure,
    ) -> Vec<BuildAttemptResult> {
        warn!(
            package = %job.package,
            version = %version,
            "{}; failing all runtimes",
            failure.failure
        );
        plan.pythons
            .iter()
            .map(|python| {
                let result = BuildAttemptResult::failed(
                    version,
                    python,
                    stage,
                    failure.failure.clone(),
                    failure.log.clone(),
                );
                self.with_stored_log(job.package, result)
            })
            .collect()
    }

    fn with_stored_log(&self, package: &str, mut result: BuildAttemptResult) -> BuildAttemptResult {
        result.log_ref = self
            .logs
            .store(package, &result.version, &result.python, &result.log);
        result
    }
}
