//! Preparation steps run before a build: checkout, system packages, patches

use crate::attempt::AttemptFailure;
use crate::runner::{CommandOutput, CommandRequest, CommandRunner};
use camino::Utf8Path;
use std::time::Duration;
use tracing::debug;

/// A failed step and the output gathered up to that point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub failure: AttemptFailure,
    pub log: String,
}

type StepResult = Result<String, StepFailure>;

/// Runs the preparation commands for one package
pub struct Steps<'a> {
    runner: &'a dyn CommandRunner,
    timeout: Duration,
}

impl<'a> Steps<'a> {
    pub fn new(runner: &'a dyn CommandRunner, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Shallow clone of `repo` into `dest`
    pub async fn clone_source(&self, repo: &str, dest: &Utf8Path) -> StepResult {
        let request = CommandRequest::new("git")
            .args(["clone", "--depth", "1", repo, dest.as_str()])
            .timeout(self.timeout);
        let output = self.exec(&request, AttemptFailure::SourceAcquisition).await?;
        if output.success() {
            Ok(transcript(&request, &output))
        } else {
            Err(StepFailure {
                failure: AttemptFailure::SourceAcquisition(format!("clone of {} failed", repo)),
                log: transcript(&request, &output),
            })
        }
    }

    /// Fetch `tag` (as a tag, then as a plain ref) and check it out clean
    pub async fn checkout(&self, source: &Utf8Path, tag: &str) -> StepResult {
        let mut log = String::new();

        let fetch_tag = self
            .git(source, ["fetch", "--depth", "1", "origin", "tag", tag]);
        let output = self.exec(&fetch_tag, AttemptFailure::SourceAcquisition).await?;
        log.push_str(&transcript(&fetch_tag, &output));

        if !output.success() {
            debug!("{} is not a tag; fetching as a ref", tag);
            let fetch_ref = self.git(source, ["fetch", "--depth", "1", "origin", tag]);
            let output = self.exec(&fetch_ref, AttemptFailure::SourceAcquisition).await?;
            log.push_str(&transcript(&fetch_ref, &output));
            if !output.success() {
                return Err(StepFailure {
                    failure: AttemptFailure::SourceAcquisition(format!("could not fetch {}", tag)),
                    log,
                });
            }
        }

        let checkout = self.git(source, ["checkout", "FETCH_HEAD"]);
        let output = self.exec(&checkout, AttemptFailure::SourceAcquisition).await?;
        log.push_str(&transcript(&checkout, &output));
        if !output.success() {
            return Err(StepFailure {
                failure: AttemptFailure::SourceAcquisition(format!("could not check out {}", tag)),
                log,
            });
        }

        // Leftovers from an earlier version's build; failure here is harmless.
        let clean = self.git(source, ["clean", "-fdx"]);
        if let Ok(output) = self.runner.run(&clean).await {
            log.push_str(&transcript(&clean, &output));
        }

        Ok(log)
    }

    /// `apk add --no-cache` the given packages; nothing to do when empty
    pub async fn install_system_deps(&self, deps: &[String]) -> StepResult {
        if deps.is_empty() {
            return Ok(String::new());
        }
        let request = CommandRequest::new("apk")
            .args(["add", "--no-cache"])
            .args(deps.iter().cloned())
            .timeout(self.timeout);
        let output = self.exec(&request, AttemptFailure::DependencyInstall).await?;
        if output.success() {
            Ok(transcript(&request, &output))
        } else {
            Err(StepFailure {
                failure: AttemptFailure::DependencyInstall(deps.join(" ")),
                log: transcript(&request, &output),
            })
        }
    }

    /// `git apply` each patch from `patch_dir` in order, stopping at the
    /// first that fails
    pub async fn apply_patches(
        &self,
        source: &Utf8Path,
        patch_dir: &Utf8Path,
        patches: &[String],
    ) -> StepResult {
        let mut log = String::new();
        for patch in patches {
            let path = patch_dir.join(patch);
            let request = self.git(source, ["apply", path.as_str()]);
            let output = self
                .exec(&request, |message| AttemptFailure::Spawn {
                    program: "git".to_string(),
                    message,
                })
                .await?;
            log.push_str(&transcript(&request, &output));
            if !output.success() {
                return Err(StepFailure {
                    failure: AttemptFailure::PatchApply {
                        patch: patch.clone(),
                    },
                    log,
                });
            }
            debug!("Applied patch {}", patch);
        }
        Ok(log)
    }

    fn git<const N: usize>(&self, source: &Utf8Path, args: [&str; N]) -> CommandRequest {
        CommandRequest::new("git")
            .args(args)
            .dir(source)
            .timeout(self.timeout)
    }

    /// Run a request, turning a spawn error into a step failure
    async fn exec(
        &self,
        request: &CommandRequest,
        on_spawn_error: impl FnOnce(String) -> AttemptFailure,
    ) -> Result<CommandOutput, StepFailure> {
        self.runner.run(request).await.map_err(|e| StepFailure {
            failure: on_spawn_error(format!("{}: {}", request.program, e)),
            log: format!("$ {}\n{}\n", request.display(), e),
        })
    }
}

/// `$ command` followed by its output
pub fn transcript(request: &CommandRequest, output: &CommandOutput) -> String {
    let mut text = format!("$ {}\n", request.display());
    let body = output.combined_output();
    text.push_str(&body);
    if !body.is_empty() && !body.ends_with('\n') {
        text.push('\n');
    }
    text
}
