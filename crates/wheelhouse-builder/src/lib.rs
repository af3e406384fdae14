//! # wheelhouse-builder
//!
//! Drives the version × runtime build matrix of one package:
//! - `CommandRunner` / `ProcessRunner`: the subprocess capability
//! - `Steps`: git checkout, `apk` system packages and patches
//! - `BuildOrchestrator`: the per-version state machine
//! - `fold_skips`: turns failed attempts into retry-tracked skip entries
//! - `LogStore`: where attempt logs go

pub mod attempt;
pub mod error;
pub mod logs;
pub mod orchestrator;
pub mod plan;
pub mod runner;
pub mod skips;
pub mod steps;
pub mod workspace;

pub use attempt::{AttemptFailure, AttemptStage, BuildAttemptResult};
pub use error::{BuildError, Result};
pub use logs::{LocalLogStore, LogStore, NullLogStore};
pub use orchestrator::{BuildOrchestrator, BuilderSettings, PackageJob};
pub use plan::{BuildPlan, BuildReport};
pub use runner::{CommandOutput, CommandRequest, CommandRunner, ProcessRunner};
pub use skips::fold_skips;
pub use workspace::BuildWorkspace;
