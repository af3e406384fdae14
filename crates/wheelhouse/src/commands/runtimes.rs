//! Runtime and tooling report

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;
use wheelhouse_builder::ProcessRunner;
use wheelhouse_core::runtime::{available_runtimes, RuntimeInfo};

use crate::cli::{AgentOptions, RuntimesArgs};
use crate::context::AgentContext;
use crate::output;

/// Host tools the build steps shell out to
const TOOLS: &[&str] = &["git", "apk", "sh"];

#[derive(Tabled)]
struct RuntimeRow {
    python: String,
    abi: String,
    binary: String,
    available: String,
}

#[derive(Serialize)]
struct ToolStatus {
    name: String,
    available: bool,
}

#[derive(Serialize)]
struct RuntimesJson {
    platform: String,
    runtimes: Vec<RuntimeInfo>,
    tools: Vec<ToolStatus>,
}

pub fn run(args: RuntimesArgs, options: &AgentOptions) -> Result<()> {
    let ctx = AgentContext::load(options)?;
    let report = probe(&ctx);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    output::header(&format!("Runtimes ({})", report.platform));
    let rows: Vec<RuntimeRow> = report
        .runtimes
        .iter()
        .map(|r| RuntimeRow {
            python: r.version.clone(),
            abi: r.abi_tag.clone(),
            binary: r.binary.to_string(),
            available: yes_no(r.available),
        })
        .collect();
    output::table(rows, "No runtimes configured");

    output::header("Tools");
    for tool in &report.tools {
        output::kv(&tool.name, &yes_no(tool.available));
    }

    let usable = available_runtimes(&ctx.config.python_bin_dir, &ctx.config.python_versions);
    let missing = ctx.config.python_versions.len() - usable.len();
    if missing > 0 {
        output::warning(&format!(
            "{} configured runtime(s) missing under {}; usable: {}",
            missing,
            ctx.config.python_bin_dir,
            if usable.is_empty() { "none".to_string() } else { usable.join(", ") }
        ));
    }
    Ok(())
}

fn probe(ctx: &AgentContext) -> RuntimesJson {
    RuntimesJson {
        platform: ctx.config.platform.clone(),
        runtimes: ctx
            .config
            .python_versions
            .iter()
            .map(|py| RuntimeInfo::probe(&ctx.config.python_bin_dir, py))
            .collect(),
        tools: TOOLS
            .iter()
            .map(|name| ToolStatus {
                name: name.to_string(),
                available: ProcessRunner::is_available(name),
            })
            .collect(),
    }
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}
