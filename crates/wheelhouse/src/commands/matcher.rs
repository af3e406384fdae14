//! Version matcher command

use anyhow::{Context, Result};
use wheelhouse_core::VersionSpec;

use crate::cli::MatchArgs;
use crate::output;

pub fn run(args: MatchArgs) -> Result<()> {
    let spec = VersionSpec::parse(&args.specifier)
        .with_context(|| format!("Invalid specifier {:?}", args.specifier))?;

    if spec.matches(&args.version) {
        output::success(&format!("{} matches {}", args.version, spec));
    } else {
        let failing: Vec<String> = spec
            .clauses()
            .iter()
            .filter(|c| !c.matches(&args.version))
            .map(|c| c.to_string())
            .collect();
        output::info(&format!(
            "{} does not match {} (fails {})",
            args.version,
            spec,
            failing.join(", ")
        ));
    }
    Ok(())
}
