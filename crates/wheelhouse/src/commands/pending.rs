//! Pending-work set management

use anyhow::{Context, Result};
use wheelhouse_core::catalog::check_package_name;

use crate::cli::{AgentOptions, PendingCommands};
use crate::context::AgentContext;
use crate::output;

pub fn run(command: PendingCommands, options: &AgentOptions) -> Result<()> {
    let ctx = AgentContext::load(options)?;
    let queue = ctx.queue()?;

    match command {
        PendingCommands::Add(args) => {
            check_package_name(&args.package)?;
            if !ctx.catalog.has_config(&args.package) {
                output::info(&format!(
                    "{} has no config in {} yet; `next` skips it until one is added",
                    args.package,
                    ctx.catalog.root()
                ));
            }
            if queue
                .ensure_pending(&args.package)
                .context("Failed to update pending set")?
            {
                output::success(&format!("{} is now pending", args.package));
            } else {
                output::info(&format!("{} was already pending", args.package));
            }
        }
        PendingCommands::List(args) => {
            let pending = queue.list().context("Failed to list pending packages")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&pending)?);
            } else if pending.is_empty() {
                output::info("Nothing pending");
            } else {
                for package in &pending {
                    println!("{}", package);
                }
            }
        }
        PendingCommands::Remove(args) => {
            if queue
                .remove(&args.package)
                .context("Failed to update pending set")?
            {
                output::success(&format!("Removed {} from pending", args.package));
            } else {
                output::info(&format!("{} was not pending", args.package));
            }
        }
    }
    Ok(())
}
