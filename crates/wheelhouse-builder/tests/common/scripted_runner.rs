//! Scripted command runner

use async_trait::async_trait;
use camino::Utf8PathBuf;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Mutex;
use std::time::Duration;
use wheelhouse_builder::orchestrator::{ENV_DIST_DIR, ENV_PYTHON_VERSION};
use wheelhouse_builder::{CommandOutput, CommandRequest, CommandRunner};
use wheelhouse_core::runtime::wheel_filename;
use wheelhouse_core::types::PackageConfig;

/// What the build command does for one (version, runtime)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildBehavior {
    Succeed,
    Fail(i32),
    /// Exits 0 without producing a wheel
    NoWheel,
    TimeOut,
    /// The interpreter cannot be started
    Missing,
}

pub struct ScriptedRunner {
    package: String,
    platform: String,
    tags: HashMap<String, String>,
    fail_clone: bool,
    fail_apk: bool,
    failing_fetches: HashSet<String>,
    failing_patches: HashSet<String>,
    builds: HashMap<(String, String), BuildBehavior>,
    fetched: Mutex<Option<String>>,
    checked_out: Mutex<Option<String>>,
    invocations: Mutex<Vec<CommandRequest>>,
}

impl ScriptedRunner {
    pub fn new(package: &str, config: &PackageConfig) -> Self {
        Self {
            package: package.to_string(),
            platform: "linux_aarch64".to_string(),
            tags: config
                .versions
                .iter()
                .map(|v| (v.tag.clone(), v.version.clone()))
                .collect(),
            fail_clone: false,
            fail_apk: false,
            failing_fetches: HashSet::new(),
            failing_patches: HashSet::new(),
            builds: HashMap::new(),
            fetched: Mutex::new(None),
            checked_out: Mutex::new(None),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_clone(mut self) -> Self {
        self.fail_clone = true;
        self
    }

    pub fn fail_apk(mut self) -> Self {
        self.fail_apk = true;
        self
    }

    pub fn fail_fetch(mut self, tag: &str) -> Self {
        self.failing_fetches.insert(tag.to_string());
        self
    }

    pub fn fail_patch(mut self, patch: &str) -> Self {
        self.failing_patches.insert(patch.to_string());
        self
    }

    pub fn build(mut self, version: &str, python: &str, behavior: BuildBehavior) -> Self {
        self.builds
            .insert((version.to_string(), python.to_string()), behavior);
        self
    }

    pub fn invocations(&self) -> Vec<CommandRequest> {
        self.invocations.lock().unwrap().clone()
    }

    /// Invocations of `program` whose first argument is `subcommand`
    pub fn calls(&self, program: &str, subcommand: &str) -> Vec<CommandRequest> {
        self.invocations()
            .into_iter()
            .filter(|r| r.program == program && r.args.first().map(String::as_str) == Some(subcommand))
            .collect()
    }

    /// Build command invocations
    pub fn build_calls(&self) -> Vec<CommandRequest> {
        self.invocations()
            .into_iter()
            .filter(|r| r.env.contains_key(ENV_PYTHON_VERSION))
            .collect()
    }

    fn exit(code: i32, stderr: &str) -> io::Result<CommandOutput> {
        Ok(CommandOutput {
            exit_code: Some(code),
            stderr: stderr.to_string(),
            duration: Duration::from_millis(1),
            ..Default::default()
        })
    }

    fn git(&self, request: &CommandRequest) -> io::Result<CommandOutput> {
        let last = request.args.last().cloned().unwrap_or_default();
        match request.args.first().map(String::as_str) {
            Some("clone") if self.fail_clone => Self::exit(128, "fatal: repository not found"),
            Some("clone") => {
                std::fs::create_dir_all(&last)?;
                Self::exit(0, "")
            }
            Some("fetch") if self.failing_fetches.contains(&last) => {
                Self::exit(128, "fatal: couldn't find remote ref")
            }
            Some("fetch") => {
                *self.fetched.lock().unwrap() = Some(last);
                Self::exit(0, "")
            }
            Some("checkout") => {
                let fetched = self.fetched.lock().unwrap().clone();
                let version = fetched.and_then(|tag| self.tags.get(&tag).cloned());
                *self.checked_out.lock().unwrap() = version;
                Self::exit(0, "")
            }
            Some("apply") => {
                let name = Utf8PathBuf::from(&last)
                    .file_name()
                    .unwrap_or_default()
                    .to_string();
                if self.failing_patches.contains(&name) {
                    Self::exit(1, "error: patch failed")
                } else {
                    Self::exit(0, "")
                }
            }
            _ => Self::exit(0, ""),
        }
    }

    fn python_build(&self, request: &CommandRequest) -> io::Result<CommandOutput> {
        let python = request.env.get(ENV_PYTHON_VERSION).cloned().unwrap_or_default();
        let version = self
            .checked_out
            .lock()
            .unwrap()
            .clone()
            .expect("build before checkout");
        let behavior = self
            .builds
            .get(&(version.clone(), python.clone()))
            .copied()
            .unwrap_or(BuildBehavior::Succeed);

        match behavior {
            BuildBehavior::Succeed => {
                // Relative paths resolve against the checkout, as for a real process
                let dist = Utf8PathBuf::from(request.env.get(ENV_DIST_DIR).cloned().unwrap_or_default());
                let dist = match &request.dir {
                    Some(dir) if dist.is_relative() => dir.join(dist),
                    _ => dist,
                };
                let wheel = wheel_filename(&self.package, &version, &python, &self.platform);
                std::fs::write(dist.join(&wheel), b"wheel")?;
                Ok(CommandOutput {
                    exit_code: Some(0),
                    stdout: format!("Successfully built {}", wheel),
                    ..Default::default()
                })
            }
            BuildBehavior::Fail(code) => Self::exit(code, "error: command 'gcc' failed"),
            BuildBehavior::NoWheel => Self::exit(0, ""),
            BuildBehavior::TimeOut => Ok(CommandOutput {
                exit_code: None,
                timed_out: true,
                ..Default::default()
            }),
            BuildBehavior::Missing => Err(io::Error::new(io::ErrorKind::NotFound, "no such file")),
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, request: &CommandRequest) -> io::Result<CommandOutput> {
        self.invocations.lock().unwrap().push(request.clone());
        match request.program.as_str() {
            "git" => self.git(request),
            "apk" if self.fail_apk => Self::exit(1, "ERROR: unable to select packages"),
            "apk" => Self::exit(0, ""),
            _ => self.python_build(request),
        }
    }
}
