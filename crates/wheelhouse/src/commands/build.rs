//! Build and next commands
//!
//! Both run the same workflow: claim the package, build its matrix, commit
//! the emitted config and skips to the catalog, and release. The lease is
//! released on every path out of the build, errors included, before the
//! error is reported.

use anyhow::{Context, Result};
use std::sync::Arc;
use tabled::Tabled;
use wheelhouse_builder::{
    BuildOrchestrator, BuildPlan, BuildReport, BuildWorkspace, BuilderSettings, CommandRunner,
    LocalLogStore, PackageJob, ProcessRunner,
};
use wheelhouse_core::types::{ClaimType, Lease};
use wheelhouse_core::AgentConfig;
use wheelhouse_ledger::{ClaimManager, ClaimOutcome, PendingQueue, ReleaseOutcome};

use crate::cli::{AgentOptions, BuildArgs, MatrixArgs, NextArgs};
use crate::commands::claim::acquire;
use crate::context::AgentContext;
use crate::output;

pub async fn run(args: BuildArgs, options: &AgentOptions) -> Result<()> {
    let ctx = AgentContext::load(options)?;
    let claims = ctx.claims()?;
    let Some(lease) = acquire(&claims, &args.package, &ctx.agent_id, args.claim_type)? else {
        return Ok(());
    };

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
    let report = build_claimed(&ctx, &claims, &args.package, &lease, &args.matrix, runner).await?;
    print_report(&report);
    Ok(())
}

pub async fn next(args: NextArgs, options: &AgentOptions) -> Result<()> {
    let ctx = AgentContext::load(options)?;
    let claims = ctx.claims()?;
    let queue = ctx.queue()?;

    let Some((package, lease)) = claim_next(&ctx, &claims, &queue, args.claim_type)? else {
        output::info("Nothing to do");
        return Ok(());
    };
    output::info(&format!("Picked {} from the pending set", package));

    if let Err(e) = queue.remove(&package) {
        release(&claims, &package, &lease);
        return Err(e).context("Failed to update pending set");
    }

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
    let report = build_claimed(&ctx, &claims, &package, &lease, &args.matrix, runner).await?;
    print_report(&report);
    Ok(())
}

/// Claim the first pending package that has a config and is not held by
/// another agent
fn claim_next(
    ctx: &AgentContext,
    claims: &ClaimManager,
    queue: &PendingQueue,
    claim_type: ClaimType,
) -> Result<Option<(String, Lease)>> {
    let pending = queue.list().context("Failed to list pending packages")?;
    for package in pending {
        if !ctx.catalog.has_config(&package) {
            tracing::debug!("Skipping {}: no config in the catalog yet", package);
            continue;
        }
        match claims
            .acquire(&package, &ctx.agent_id, claim_type)
            .with_context(|| format!("Failed to claim {}", package))?
        {
            ClaimOutcome::Acquired(lease) => return Ok(Some((package, lease))),
            ClaimOutcome::Conflict { .. } => {
                tracing::debug!("Skipping {}: claimed by another agent", package);
            }
        }
    }
    Ok(None)
}

/// Build a package whose lease is held, then give the lease back
async fn build_claimed(
    ctx: &AgentContext,
    claims: &ClaimManager,
    package: &str,
    lease: &Lease,
    matrix: &MatrixArgs,
    runner: Arc<dyn CommandRunner>,
) -> Result<BuildReport> {
    let outcome = build_and_commit(ctx, package, matrix, runner).await;

    match claims.release_owned(package, lease) {
        Ok(released) => report_release(package, released),
        Err(e) if outcome.is_err() => {
            tracing::warn!("Failed to release {} after a failed build: {}", package, e);
        }
        Err(e) => {
            return Err(anyhow::Error::new(e).context(format!("Failed to release {}", package)))
        }
    }
    outcome
}

async fn build_and_commit(
    ctx: &AgentContext,
    package: &str,
    matrix: &MatrixArgs,
    runner: Arc<dyn CommandRunner>,
) -> Result<BuildReport> {
    let config = ctx
        .catalog
        .load_config(package)
        .with_context(|| format!("Failed to load config for {}", package))?;
    let skips = ctx
        .catalog
        .load_skips(package)
        .with_context(|| format!("Failed to load skips for {}", package))?;

    let orchestrator = BuildOrchestrator::new(
        runner,
        Arc::new(LocalLogStore::new(ctx.config.work_dir.clone())),
        settings_for(&ctx.config),
    );
    let workspace = BuildWorkspace::new(&ctx.config.work_dir, package)
        .context("Failed to resolve the build workspace")?;
    let job = PackageJob {
        package,
        config: &config,
        skips: &skips,
        patch_dir: ctx.catalog.package_dir(package)?,
        workspace: &workspace,
    };
    let plan = plan_for(&ctx.config, matrix);

    let spinner = output::spinner(&format!(
        "Building {} for Python {}...",
        package,
        plan.pythons.join(", ")
    ));
    let result = orchestrator.run(&job, &plan).await;
    spinner.finish_and_clear();
    let report = result.with_context(|| format!("Build of {} was rejected", package))?;

    ctx.catalog
        .save_config(package, &report.config)
        .with_context(|| format!("Failed to save config for {}", package))?;
    ctx.catalog
        .save_skips(package, &report.skips)
        .with_context(|| format!("Failed to save skips for {}", package))?;
    Ok(report)
}

fn release(claims: &ClaimManager, package: &str, lease: &Lease) {
    match claims.release_owned(package, lease) {
        Ok(released) => report_release(package, released),
        Err(e) => tracing::warn!("Failed to release {}: {}", package, e),
    }
}

fn report_release(package: &str, outcome: ReleaseOutcome) {
    match outcome {
        ReleaseOutcome::Released => tracing::debug!("Released {}", package),
        ReleaseOutcome::NotFound => {
            output::warning(&format!("Lease on {} disappeared during the build", package))
        }
        ReleaseOutcome::Superseded => output::warning(&format!(
            "Lease on {} was reclaimed and taken by another agent during the build",
            package
        )),
    }
}

fn settings_for(config: &AgentConfig) -> BuilderSettings {
    BuilderSettings {
        python_bin_dir: config.python_bin_dir.clone(),
        platform: config.platform.clone(),
        build_timeout: config.build_timeout(),
        max_parallel_runtimes: config.max_parallel_runtimes,
        ..Default::default()
    }
}

fn plan_for(config: &AgentConfig, matrix: &MatrixArgs) -> BuildPlan {
    let pythons = if matrix.pythons.is_empty() {
        config.python_versions.clone()
    } else {
        matrix.pythons.clone()
    };
    BuildPlan::new(pythons)
        .with_versions(matrix.versions.clone())
        .excluding(matrix.exclude.clone())
}

#[derive(Tabled)]
struct AttemptRow {
    version: String,
    python: String,
    result: String,
    detail: String,
}

fn print_report(report: &BuildReport) {
    output::header(&format!("Build results for {}", report.package));
    let rows: Vec<AttemptRow> = report
        .results
        .iter()
        .map(|r| AttemptRow {
            version: r.version.clone(),
            python: r.python.clone(),
            result: if r.success() { "built" } else { "failed" }.to_string(),
            detail: match (&r.wheel, r.reason()) {
                (Some(wheel), _) => wheel.file_name().unwrap_or(wheel.as_str()).to_string(),
                (None, Some(reason)) => match &r.log_ref {
                    Some(log) => format!("{} (log: {})", reason, log),
                    None => reason,
                },
                (None, None) => String::new(),
            },
        })
        .collect();
    output::table(rows, "Nothing was attempted");

    let built = report.succeeded().count();
    let failed = report.failed().count();
    if report.is_complete_success() {
        output::success(&format!("Built {} wheel(s)", built));
    } else if built > 0 {
        output::warning(&format!(
            "Built {} wheel(s); {} attempt(s) recorded as skips",
            built, failed
        ));
    } else {
        output::warning(&format!(
            "No wheels built; {} attempt(s) recorded as skips",
            failed
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::temp_context;
    use async_trait::async_trait;
    use camino::Utf8PathBuf;
    use std::io;
    use wheelhouse_builder::orchestrator::{ENV_DIST_DIR, ENV_PYTHON_VERSION};
    use wheelhouse_builder::{CommandOutput, CommandRequest};
    use wheelhouse_core::runtime::wheel_filename;
    use wheelhouse_core::types::{PackageConfig, VersionEntry};

    /// Succeeds at every preparation step; build commands drop wheels for
    /// every configured version into dist unless the runtime is marked broken
    struct FakeRunner {
        package: String,
        versions: Vec<String>,
        broken_python: Option<String>,
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(&self, request: &CommandRequest) -> io::Result<CommandOutput> {
            let ok = CommandOutput {
                exit_code: Some(0),
                ..Default::default()
            };
            if request.program == "git" || request.program == "apk" {
                return Ok(ok);
            }

            let python = request.env.get(ENV_PYTHON_VERSION).cloned().unwrap_or_default();
            if self.broken_python.as_deref() == Some(python.as_str()) {
                return Ok(CommandOutput {
                    exit_code: Some(1),
                    stderr: "error: compiler exploded".to_string(),
                    ..Default::default()
                });
            }
            let dist = Utf8PathBuf::from(request.env.get(ENV_DIST_DIR).cloned().unwrap_or_default());
            for version in &self.versions {
                let name = wheel_filename(&self.package, version, &python, "linux_x86_64");
                std::fs::write(dist.join(name), b"wheel")?;
            }
            Ok(ok)
        }
    }

    fn fake(broken_python: Option<&str>) -> Arc<dyn CommandRunner> {
        Arc::new(FakeRunner {
            package: "six".to_string(),
            versions: vec!["1.16.0".to_string(), "1.17.0".to_string()],
            broken_python: broken_python.map(String::from),
        })
    }

    fn six_config() -> PackageConfig {
        PackageConfig::new(
            "https://github.com/benjaminp/six",
            vec![
                VersionEntry::new("1.16.0", "1.16.0"),
                VersionEntry::new("1.17.0", "1.17.0"),
            ],
        )
    }

    fn matrix() -> MatrixArgs {
        MatrixArgs {
            pythons: vec!["3.12".to_string(), "3.13".to_string()],
            ..Default::default()
        }
    }

    fn claim(ctx: &AgentContext, claims: &ClaimManager, package: &str) -> Lease {
        match claims.acquire(package, &ctx.agent_id, ClaimType::Build).unwrap() {
            ClaimOutcome::Acquired(lease) => lease,
            other => panic!("expected to acquire {}: {:?}", package, other),
        }
    }

    #[tokio::test]
    async fn test_full_success_commits_config_and_releases() {
        let (_dir, ctx) = temp_context();
        ctx.catalog.save_config("six", &six_config()).unwrap();
        let claims = ctx.claims().unwrap();
        let lease = claim(&ctx, &claims, "six");

        let report = build_claimed(&ctx, &claims, "six", &lease, &matrix(), fake(None))
            .await
            .unwrap();

        assert!(report.is_complete_success());
        assert_eq!(report.wheels().len(), 4);
        assert!(claims.current("six").unwrap().is_none());
        assert!(ctx.catalog.load_skips("six").unwrap().is_empty());
        assert_eq!(ctx.catalog.load_config("six").unwrap(), six_config());
    }

    #[tokio::test]
    async fn test_partial_failure_records_skips() {
        let (_dir, ctx) = temp_context();
        ctx.catalog.save_config("six", &six_config()).unwrap();
        let claims = ctx.claims().unwrap();
        let lease = claim(&ctx, &claims, "six");

        let report = build_claimed(&ctx, &claims, "six", &lease, &matrix(), fake(Some("3.13")))
            .await
            .unwrap();

        assert_eq!(report.succeeded().count(), 2);
        let skips = ctx.catalog.load_skips("six").unwrap();
        assert_eq!(skips.len(), 2);
        assert!(skips.covers("1.16.0", "3.13"));
        assert!(!skips.covers("1.16.0", "3.12"));
        assert!(claims.current("six").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exclusions_are_dropped_from_committed_config() {
        let (_dir, ctx) = temp_context();
        ctx.catalog.save_config("six", &six_config()).unwrap();
        let claims = ctx.claims().unwrap();
        let lease = claim(&ctx, &claims, "six");
        let matrix = MatrixArgs {
            exclude: vec!["1.16.0".to_string()],
            ..matrix()
        };

        let report = build_claimed(&ctx, &claims, "six", &lease, &matrix, fake(None))
            .await
            .unwrap();

        assert_eq!(report.results.len(), 2);
        let committed = ctx.catalog.load_config("six").unwrap();
        assert_eq!(committed.versions.len(), 1);
        assert_eq!(committed.versions[0].version, "1.17.0");
    }

    #[tokio::test]
    async fn test_invalid_config_fails_and_still_releases() {
        let (_dir, ctx) = temp_context();
        let mut config = six_config();
        config.repo = String::new();
        ctx.catalog.save_config("six", &config).unwrap();
        let claims = ctx.claims().unwrap();
        let lease = claim(&ctx, &claims, "six");

        let result = build_claimed(&ctx, &claims, "six", &lease, &matrix(), fake(None)).await;

        assert!(result.is_err());
        assert!(claims.current("six").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_config_fails_and_still_releases() {
        let (_dir, ctx) = temp_context();
        let claims = ctx.claims().unwrap();
        let lease = claim(&ctx, &claims, "six");

        let result = build_claimed(&ctx, &claims, "six", &lease, &matrix(), fake(None)).await;

        assert!(result.is_err());
        assert!(claims.current("six").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_superseded_lease_is_left_alone() {
        let (_dir, ctx) = temp_context();
        ctx.catalog.save_config("six", &six_config()).unwrap();
        let claims = ctx.claims().unwrap();
        let ours = claim(&ctx, &claims, "six");

        // Reclaimed by GC and taken by another agent while we were building
        claims.release("six").unwrap();
        claims.acquire("six", "agent-b", ClaimType::Fixer).unwrap();

        build_claimed(&ctx, &claims, "six", &ours, &matrix(), fake(None))
            .await
            .unwrap();

        let holder = claims.current("six").unwrap().unwrap();
        assert_eq!(holder.agent, "agent-b");
    }

    #[test]
    fn test_claim_next_skips_unconfigured_and_held_packages() {
        let (_dir, ctx) = temp_context();
        let claims = ctx.claims().unwrap();
        let queue = ctx.queue().unwrap();
        for package in ["aaa-unconfigured", "bbb-held", "ccc-ready"] {
            queue.ensure_pending(package).unwrap();
        }
        ctx.catalog.save_config("bbb-held", &six_config()).unwrap();
        ctx.catalog.save_config("ccc-ready", &six_config()).unwrap();
        claims.acquire("bbb-held", "agent-b", ClaimType::Build).unwrap();

        let (package, lease) = claim_next(&ctx, &claims, &queue, ClaimType::Build)
            .unwrap()
            .unwrap();
        assert_eq!(package, "ccc-ready");
        assert_eq!(lease.agent, ctx.agent_id);

        // Everything left is either unconfigured or held
        assert!(claim_next(&ctx, &claims, &queue, ClaimType::Build)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_plan_defaults_to_configured_runtimes() {
        let (_dir, ctx) = temp_context();
        let plan = plan_for(&ctx.config, &MatrixArgs::default());
        assert_eq!(plan.pythons, ctx.config.python_versions);

        let plan = plan_for(&ctx.config, &matrix());
        assert_eq!(plan.pythons, vec!["3.12", "3.13"]);
    }
}
