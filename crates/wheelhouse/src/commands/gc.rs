//! Garbage collection command

use anyhow::{Context, Result};
use std::sync::Arc;
use wheelhouse_core::config::lease_ttl_from_secs;
use wheelhouse_ledger::{GarbageCollector, SweepReport};

use crate::cli::{AgentOptions, GcArgs};
use crate::commands::claims::format_age;
use crate::context::AgentContext;
use crate::output;

pub fn run(args: GcArgs, options: &AgentOptions) -> Result<()> {
    let ctx = AgentContext::load(options)?;
    let report = sweep(&ctx, &args)?;
    print_report(&report, args.dry_run);
    Ok(())
}

fn sweep(ctx: &AgentContext, args: &GcArgs) -> Result<SweepReport> {
    let ttl = match args.ttl_secs {
        Some(secs) => lease_ttl_from_secs(secs).context("Invalid --ttl-secs")?,
        None => ctx.config.lease_ttl()?,
    };
    GarbageCollector::new(ctx.store()?, Arc::new(ctx.catalog.clone()), ttl)
        .with_dry_run(args.dry_run)
        .sweep()
        .context("Garbage collection failed")
}

fn print_report(report: &SweepReport, dry_run: bool) {
    let now = chrono::Utc::now();
    for record in &report.reclaimed {
        output::kv(
            &record.package,
            &format!(
                "{} ({}, held {})",
                record.lease.agent,
                record.lease.claim_type,
                format_age(record.lease.age(now))
            ),
        );
    }
    for key in &report.unreadable {
        output::warning(&format!("Unreadable lease left in place: {}", key));
    }
    if report.raced > 0 {
        output::info(&format!(
            "{} expired lease(s) changed during the sweep and were kept",
            report.raced
        ));
    }

    let verb = if dry_run { "Would reclaim" } else { "Reclaimed" };
    output::success(&format!(
        "{} {} of {} lease(s); {} package(s) back to pending",
        verb,
        report.reclaimed_count(),
        report.scanned,
        report.requeued.len()
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::temp_context;
    use wheelhouse_core::types::ClaimType;

    fn stale_claim(ctx: &AgentContext, package: &str) {
        let past = chrono::Utc::now() - chrono::Duration::minutes(5);
        ctx.claims()
            .unwrap()
            .acquire_at(package, "agent-a", ClaimType::Build, past)
            .unwrap();
    }

    #[test]
    fn test_short_ttl_reclaims_and_requeues_unconfigured() {
        let (_dir, ctx) = temp_context();
        stale_claim(&ctx, "attrs");

        let args = GcArgs {
            ttl_secs: Some(60),
            dry_run: false,
        };
        let report = sweep(&ctx, &args).unwrap();

        assert_eq!(report.reclaimed_count(), 1);
        assert_eq!(report.requeued, vec!["attrs"]);
        assert!(ctx.claims().unwrap().current("attrs").unwrap().is_none());
        assert!(ctx.queue().unwrap().contains("attrs").unwrap());
    }

    #[test]
    fn test_default_ttl_keeps_recent_claims() {
        let (_dir, ctx) = temp_context();
        stale_claim(&ctx, "attrs");

        let args = GcArgs {
            ttl_secs: None,
            dry_run: false,
        };
        let report = sweep(&ctx, &args).unwrap();

        assert_eq!(report.scanned, 1);
        assert_eq!(report.reclaimed_count(), 0);
        assert!(ctx.claims().unwrap().current("attrs").unwrap().is_some());
    }

    #[test]
    fn test_dry_run_leaves_ledger_untouched() {
        let (_dir, ctx) = temp_context();
        stale_claim(&ctx, "attrs");

        let args = GcArgs {
            ttl_secs: Some(60),
            dry_run: true,
        };
        let report = sweep(&ctx, &args).unwrap();

        assert_eq!(report.reclaimed_count(), 1);
        assert!(ctx.claims().unwrap().current("attrs").unwrap().is_some());
        assert!(!ctx.queue().unwrap().contains("attrs").unwrap());
    }

    #[test]
    fn test_oversized_ttl_is_an_error() {
        let (_dir, ctx) = temp_context();
        stale_claim(&ctx, "attrs");

        let args = GcArgs {
            ttl_secs: Some(10_000_000_000_000_000),
            dry_run: false,
        };
        assert!(sweep(&ctx, &args).is_err());
        assert!(ctx.claims().unwrap().current("attrs").unwrap().is_some());
    }
}
