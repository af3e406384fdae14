//! Package configuration commands

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use wheelhouse_core::types::{PackageConfig, Skips};
use wheelhouse_core::validate::{validate_config, validate_skips};
use wheelhouse_core::{resolve, EffectiveConfig};

use crate::cli::{AgentOptions, ConfigCommands, ConfigResolveArgs, ConfigValidateArgs};
use crate::context::AgentContext;
use crate::output;

const SKIPS_FILE: &str = "skips.yaml";

pub fn run(command: ConfigCommands, options: &AgentOptions) -> Result<()> {
    match command {
        ConfigCommands::Validate(args) => validate(args, options),
        ConfigCommands::Resolve(args) => {
            let ctx = AgentContext::load(options)?;
            resolve_command(&ctx, args)
        }
    }
}

fn validate(args: ConfigValidateArgs, options: &AgentOptions) -> Result<()> {
    let (config_path, skips_path) = locate(&args.target, options)?;
    let summary = validate_files(&config_path, &skips_path)?;

    output::success(&format!("{} is valid", config_path));
    output::kv("Versions", &summary.versions.to_string());
    output::kv("Overrides", &summary.overrides.to_string());
    output::kv("Skips", &summary.skips.to_string());
    Ok(())
}

/// A file path, a package directory, or a package name in the catalog
fn locate(target: &str, options: &AgentOptions) -> Result<(Utf8PathBuf, Utf8PathBuf)> {
    let path = Utf8Path::new(target);
    if path.is_file() {
        return Ok((path.to_path_buf(), path.with_file_name(SKIPS_FILE)));
    }
    if path.is_dir() {
        return Ok((path.join("config.yaml"), path.join(SKIPS_FILE)));
    }
    let ctx = AgentContext::load(options)?;
    Ok((
        ctx.catalog.config_path(target)?,
        ctx.catalog.skips_path(target)?,
    ))
}

#[derive(Debug, PartialEq, Eq)]
struct ValidationSummary {
    versions: usize,
    overrides: usize,
    skips: usize,
}

fn validate_files(config_path: &Utf8Path, skips_path: &Utf8Path) -> Result<ValidationSummary> {
    let config = PackageConfig::load(config_path)
        .with_context(|| format!("Failed to load {}", config_path))?;
    validate_config(&config).with_context(|| format!("{} is invalid", config_path))?;

    let skips =
        Skips::load(skips_path).with_context(|| format!("Failed to load {}", skips_path))?;
    validate_skips(&skips).with_context(|| format!("{} is invalid", skips_path))?;

    Ok(ValidationSummary {
        versions: config.versions.len(),
        overrides: config.overrides.len(),
        skips: skips.len(),
    })
}

fn resolve_command(ctx: &AgentContext, args: ConfigResolveArgs) -> Result<()> {
    let config = ctx
        .catalog
        .load_config(&args.package)
        .with_context(|| format!("Failed to load config for {}", args.package))?;
    let effective = resolve(&config, &args.version)
        .with_context(|| format!("Failed to resolve {} {}", args.package, args.version))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&effective)?);
        return Ok(());
    }

    output::header(&format!("{} {}", args.package, args.version));
    match config.tag_for(&args.version) {
        Some(tag) => output::kv("Tag", tag),
        None => output::warning(&format!(
            "{} is not a configured version of {}",
            args.version, args.package
        )),
    }
    print_effective(&config, &effective);
    Ok(())
}

fn print_effective(config: &PackageConfig, effective: &EffectiveConfig) {
    let applied = match effective.applied_override {
        Some(i) => match config.overrides.get(i) {
            Some(o) => format!("#{} ({})", i, o.match_spec),
            None => format!("#{}", i),
        },
        None => "none".to_string(),
    };
    output::kv("Override", &applied);
    output::kv("System deps", &join_or_none(&effective.system_deps));
    output::kv("Patches", &join_or_none(&effective.patches));
    output::kv(
        "Env",
        &if effective.env.is_empty() {
            "none".to_string()
        } else {
            effective
                .env
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ")
        },
    );
    output::kv(
        "Script",
        effective.custom_script().unwrap_or("default pip wheel build"),
    );
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
repo: https://github.com/lxml/lxml
versions:
  - tag: lxml-5.2.0
    version: 5.2.0
  - tag: lxml-5.3.0
    version: 5.3.0
system_deps: [libxml2-dev, libxslt-dev]
overrides:
  - match: ">=5.3"
    env:
      STATIC_DEPS: "true"
"#;

    fn package_dir() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_valid_config_without_skips() {
        let (_dir, root) = package_dir();
        fs::write(root.join("config.yaml"), CONFIG).unwrap();

        let (config, skips) = locate(root.as_str(), &AgentOptions::default()).unwrap();
        let summary = validate_files(&config, &skips).unwrap();
        assert_eq!(
            summary,
            ValidationSummary {
                versions: 2,
                overrides: 1,
                skips: 0
            }
        );
    }

    #[test]
    fn test_file_target_finds_sibling_skips() {
        let (_dir, root) = package_dir();
        let config = root.join("config.yaml");
        fs::write(&config, CONFIG).unwrap();
        fs::write(
            root.join(SKIPS_FILE),
            "skips:\n  - version: 5.2.0\n    python: ['3.13']\n    reason: no cp313 support\n",
        )
        .unwrap();

        let (config, skips) = locate(config.as_str(), &AgentOptions::default()).unwrap();
        assert_eq!(skips, root.join(SKIPS_FILE));
        assert_eq!(validate_files(&config, &skips).unwrap().skips, 1);
    }

    #[test]
    fn test_invalid_override_specifier_rejected() {
        let (_dir, root) = package_dir();
        let broken = CONFIG.replace(">=5.3", ">>5.3");
        fs::write(root.join("config.yaml"), broken).unwrap();

        let err = validate_files(&root.join("config.yaml"), &root.join(SKIPS_FILE)).unwrap_err();
        assert!(err.to_string().contains("is invalid"));
    }

    #[test]
    fn test_invalid_skip_rejected() {
        let (_dir, root) = package_dir();
        fs::write(root.join("config.yaml"), CONFIG).unwrap();
        fs::write(
            root.join(SKIPS_FILE),
            "skips:\n  - version: 5.2.0\n    python: []\n    reason: nothing\n",
        )
        .unwrap();

        assert!(validate_files(&root.join("config.yaml"), &root.join(SKIPS_FILE)).is_err());
    }
}
