//! Per-(version, runtime) attempt results

use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// Furthest point a build attempt reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttemptStage {
    Init,
    SourceAcquired,
    DepsInstalled,
    PatchesApplied,
    BuildAttempted,
    WheelResolved,
}

impl AttemptStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStage::Init => "init",
            AttemptStage::SourceAcquired => "source-acquired",
            AttemptStage::DepsInstalled => "deps-installed",
            AttemptStage::PatchesApplied => "patches-applied",
            AttemptStage::BuildAttempted => "build-attempted",
            AttemptStage::WheelResolved => "wheel-resolved",
        }
    }
}

impl fmt::Display for AttemptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an attempt failed. Recorded on the result, never propagated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    #[error("source checkout failed: {0}")]
    SourceAcquisition(String),

    #[error("system dependency install failed: {0}")]
    DependencyInstall(String),

    #[error("patch {patch} did not apply")]
    PatchApply { patch: String },

    #[error("build command failed with {}", describe_exit(.exit_code))]
    BuildCommand { exit_code: Option<i32> },

    #[error("build timed out after {secs}s")]
    TimedOut { secs: u64 },

    #[error("build succeeded but no {expected} wheel was produced")]
    ArtifactNotFound { expected: String },

    #[error("could not run {program}: {message}")]
    Spawn { program: String, message: String },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

/// Outcome of building one version for one runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildAttemptResult {
    pub version: String,
    pub python: String,
    pub stage: AttemptStage,
    /// Built wheel, on success
    pub wheel: Option<Utf8PathBuf>,
    /// Captured command output
    pub log: String,
    /// Where the log was stored, if anywhere
    pub log_ref: Option<String>,
    pub error: Option<AttemptFailure>,
}

impl BuildAttemptResult {
    pub fn succeeded(version: &str, python: &str, wheel: Utf8PathBuf, log: String) -> Self {
        Self {
            version: version.to_string(),
            python: python.to_string(),
            stage: AttemptStage::WheelResolved,
            wheel: Some(wheel),
            log,
            log_ref: None,
            error: None,
        }
    }

    pub fn failed(
        version: &str,
        python: &str,
        stage: AttemptStage,
        error: AttemptFailure,
        log: String,
    ) -> Self {
        Self {
            version: version.to_string(),
            python: python.to_string(),
            stage,
            wheel: None,
            log,
            log_ref: None,
            error: Some(error),
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none() && self.wheel.is_some()
    }

    /// Human-readable failure reason for the skip ledger
    pub fn reason(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(AttemptFailure::BuildCommand { exit_code: Some(1) }, "build command failed with exit code 1" ; "exit code")]
    #[test_case(AttemptFailure::BuildCommand { exit_code: None }, "build command failed with a signal" ; "signal")]
    #[test_case(AttemptFailure::TimedOut { secs: 14400 }, "build timed out after 14400s" ; "timeout")]
    #[test_case(AttemptFailure::PatchApply { patch: "musl.patch".into() }, "patch musl.patch did not apply" ; "patch")]
    fn test_failure_messages(failure: AttemptFailure, expected: &str) {
        assert_eq!(failure.to_string(), expected);
    }

    #[test]
    fn test_stage_order() {
        assert!(AttemptStage::Init < AttemptStage::SourceAcquired);
        assert!(AttemptStage::BuildAttempted < AttemptStage::WheelResolved);
    }

    #[test]
    fn test_success_requires_wheel() {
        let ok = BuildAttemptResult::succeeded("1.0", "3.12", "dist/a.whl".into(), String::new());
        assert!(ok.success());
        assert!(ok.reason().is_none());

        let failed = BuildAttemptResult::failed(
            "1.0",
            "3.12",
            AttemptStage::PatchesApplied,
            AttemptFailure::BuildCommand { exit_code: Some(2) },
            "boom".into(),
        );
        assert!(!failed.success());
        assert_eq!(failed.reason().unwrap(), "build command failed with exit code 2");
    }
}
