//! Python runtimes, ABI tags and wheel filenames

use camino::{Utf8Path, Utf8PathBuf};

/// Python versions built by default
pub const SUPPORTED_PYTHON_VERSIONS: &[&str] = &["3.10", "3.11", "3.12", "3.13"];

/// Platform tag of wheels built in the default build image
pub const DEFAULT_PLATFORM: &str = "linux_aarch64";

/// CPython tag for a runtime, e.g. `"3.12"` -> `"cp312"`
pub fn abi_tag(python: &str) -> String {
    format!("cp{}", python.replacen('.', "", 1))
}

/// Interpreter path for a runtime, e.g. `/usr/bin/python3.12`
pub fn python_binary(bin_dir: &Utf8Path, python: &str) -> Utf8PathBuf {
    bin_dir.join(format!("python{}", python))
}

/// Wheel-normalized distribution name: `-` and `.` become `_`
pub fn normalize_name(name: &str) -> String {
    name.replace(['-', '.'], "_")
}

/// Wheel-normalized version: `-` becomes `_`
pub fn normalize_version(version: &str) -> String {
    version.replace('-', "_")
}

/// Expected wheel filename for a build
pub fn wheel_filename(name: &str, version: &str, python: &str, platform: &str) -> String {
    let tag = abi_tag(python);
    format!(
        "{}-{}-{}-{}-{}.whl",
        normalize_name(name),
        normalize_version(version),
        tag,
        tag,
        platform
    )
}

/// Filename prefix shared by every platform variant of a build:
/// `{name}-{version}-{tag}-{tag}-`
pub fn wheel_prefix(name: &str, version: &str, python: &str) -> String {
    let tag = abi_tag(python);
    format!(
        "{}-{}-{}-{}-",
        normalize_name(name),
        normalize_version(version),
        tag,
        tag
    )
}

/// Summary of one runtime on this host
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RuntimeInfo {
    pub version: String,
    pub binary: Utf8PathBuf,
    pub abi_tag: String,
    pub available: bool,
}

impl RuntimeInfo {
    pub fn probe(bin_dir: &Utf8Path, python: &str) -> Self {
        let binary = python_binary(bin_dir, python);
        let available = binary.exists();
        Self {
            version: python.to_string(),
            abi_tag: abi_tag(python),
            binary,
            available,
        }
    }
}

/// Runtimes from `candidates` whose interpreter exists under `bin_dir`
pub fn available_runtimes(bin_dir: &Utf8Path, candidates: &[String]) -> Vec<String> {
    candidates
        .iter()
        .filter(|py| python_binary(bin_dir, py).exists())
        .cloned()
        .collect()
}
