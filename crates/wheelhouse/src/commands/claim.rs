//! Claim and release commands

use anyhow::{Context, Result};
use wheelhouse_core::types::{ClaimType, Lease};
use wheelhouse_ledger::{ClaimManager, ClaimOutcome, ReleaseOutcome};

use crate::cli::{AgentOptions, ClaimArgs, ReleaseArgs};
use crate::context::AgentContext;
use crate::output;

pub fn claim(args: ClaimArgs, options: &AgentOptions) -> Result<()> {
    let ctx = AgentContext::load(options)?;
    let claims = ctx.claims()?;
    if acquire(&claims, &args.package, &ctx.agent_id, args.claim_type)?.is_some() {
        output::success(&format!(
            "Claimed {} as {} ({})",
            args.package, ctx.agent_id, args.claim_type
        ));
    }
    Ok(())
}

/// Try to take the lease. A conflict is reported as a warning and yields
/// `None`; only ledger failures are errors.
pub(crate) fn acquire(
    claims: &ClaimManager,
    package: &str,
    agent: &str,
    claim_type: ClaimType,
) -> Result<Option<Lease>> {
    let outcome = claims
        .acquire(package, agent, claim_type)
        .with_context(|| format!("Failed to claim {}", package))?;
    match outcome {
        ClaimOutcome::Acquired(lease) => Ok(Some(lease)),
        ClaimOutcome::Conflict { holder: Some(lease) } => {
            output::warning(&format!(
                "{} is already claimed by {} ({} since {})",
                package,
                lease.agent,
                lease.claim_type,
                lease.claimed_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
            Ok(None)
        }
        ClaimOutcome::Conflict { holder: None } => {
            output::warning(&format!("{} is already claimed", package));
            Ok(None)
        }
    }
}

pub fn release(args: ReleaseArgs, options: &AgentOptions) -> Result<()> {
    let ctx = AgentContext::load(options)?;
    let outcome = ctx
        .claims()?
        .release(&args.package)
        .with_context(|| format!("Failed to release {}", args.package))?;
    match outcome {
        ReleaseOutcome::Released => output::success(&format!("Released {}", args.package)),
        ReleaseOutcome::NotFound => output::info(&format!("{} was not claimed", args.package)),
        ReleaseOutcome::Superseded => {
            output::warning(&format!("{} is now held by another agent", args.package))
        }
    }
    Ok(())
}
