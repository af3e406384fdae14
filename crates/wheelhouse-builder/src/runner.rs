//! Subprocess execution
//!
//! Every external tool (git, apk, the Python build) is invoked through the
//! `CommandRunner` capability so the orchestrator can be driven by a
//! scripted runner in tests.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long to wait for output readers after the child is gone
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// A command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; the caller's when `None`
    pub dir: Option<Utf8PathBuf>,
    /// Variables set on top of the inherited environment
    pub env: BTreeMap<String, String>,
    /// Directory prepended to `PATH`
    pub path_prefix: Option<Utf8PathBuf>,
    /// Wall-clock limit after which the command is killed
    pub timeout: Option<Duration>,
}

impl CommandRequest {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: None,
            env: BTreeMap::new(),
            path_prefix: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn path_prefix(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.path_prefix = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Program and arguments joined for logs
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What a finished (or killed) command produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed or terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// stdout then stderr, separated by a newline when both are present
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Runs commands on behalf of the orchestrator
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `request` to completion or timeout.
    ///
    /// Returns `Err` only when the process could not be started. A non-zero
    /// exit or a timeout is reported in the `CommandOutput`.
    async fn run(&self, request: &CommandRequest) -> io::Result<CommandOutput>;
}

/// `CommandRunner` backed by real processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Whether `program` resolves on `PATH`
    pub fn is_available(program: &str) -> bool {
        which::which(program).is_ok()
    }

    fn search_path(prefix: &Utf8Path, overlay: Option<&String>) -> io::Result<OsString> {
        let current = match overlay {
            Some(path) => OsString::from(path),
            None => std::env::var_os("PATH").unwrap_or_default(),
        };
        let dirs = std::iter::once(prefix.as_std_path().to_path_buf())
            .chain(std::env::split_paths(&current));
        std::env::join_paths(dirs).map_err(io::Error::other)
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, request: &CommandRequest) -> io::Result<CommandOutput> {
        debug!("Running: {}", request.display());

        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &request.dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &request.env {
            cmd.env(key, value);
        }
        if let Some(prefix) = &request.path_prefix {
            cmd.env("PATH", Self::search_path(prefix, request.env.get("PATH"))?);
        }

        let start = Instant::now();
        let mut child = cmd.spawn()?;

        let stdout_buf = Arc::new(Mutex::new(String::new()));
        let stderr_buf = Arc::new(Mutex::new(String::new()));
        let readers = [
            child
                .stdout
                .take()
                .map(|out| spawn_reader(out, stdout_buf.clone(), "stdout")),
            child
                .stderr
                .take()
                .map(|err| spawn_reader(err, stderr_buf.clone(), "stderr")),
        ];

        let (exit_code, timed_out) = match request.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => (status?.code(), false),
                Err(_) => {
                    warn!(
                        "{} timed out after {}s; killing it",
                        request.program,
                        limit.as_secs()
                    );
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill {}: {}", request.program, e);
                    }
                    (None, true)
                }
            },
            None => (child.wait().await?.code(), false),
        };

        for reader in readers.into_iter().flatten() {
            drain(reader).await;
        }

        Ok(CommandOutput {
            exit_code,
            stdout: take(&stdout_buf),
            stderr: take(&stderr_buf),
            duration: start.elapsed(),
            timed_out,
        })
    }
}

fn spawn_reader<R>(stream: R, buf: Arc<Mutex<String>>, label: &'static str) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!("{}: {}", label, line);
            let mut out = buf.lock().unwrap_or_else(|p| p.into_inner());
            out.push_str(&line);
            out.push('\n');
        }
    })
}

/// Wait for a reader to hit EOF. Grandchildren that outlive a killed
/// command can hold the pipe open, so give up after a grace period.
async fn drain(reader: JoinHandle<()>) {
    let abort = reader.abort_handle();
    if tokio::time::timeout(OUTPUT_DRAIN_GRACE, reader).await.is_err() {
        abort.abort();
    }
}

fn take(buf: &Mutex<String>) -> String {
    std::mem::take(&mut *buf.lock().unwrap_or_else(|p| p.into_inner()))
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let request = CommandRequest::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]);
        let output = ProcessRunner::new().run(&request).await.unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert_eq!(output.combined_output(), "out\n\nerr\n");
    }

    #[tokio::test]
    async fn test_env_overlay_and_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let request = CommandRequest::new("sh")
            .args(["-c", "printf '%s %s' \"$GREETING\" \"$(pwd)\""])
            .env("GREETING", "hello")
            .dir(dir.clone());
        let output = ProcessRunner::new().run(&request).await.unwrap();
        assert!(output.success());
        assert!(output.stdout.starts_with("hello "));
        assert!(output.stdout.trim_end().ends_with(temp.path().file_name().unwrap().to_str().unwrap()));
    }

    #[tokio::test]
    async fn test_path_prefix_is_searched_first() {
        let request = CommandRequest::new("sh")
            .args(["-c", "echo \"$PATH\""])
            .path_prefix("/opt/python/bin");
        let output = ProcessRunner::new().run(&request).await.unwrap();
        assert!(output.stdout.starts_with("/opt/python/bin:"));
    }

    #[tokio::test]
    async fn test_timeout_kills_command() {
        let request = CommandRequest::new("sleep")
            .arg("30")
            .timeout(Duration::from_millis(200));
        let output = ProcessRunner::new().run(&request).await.unwrap();
        assert!(output.timed_out);
        assert_eq!(output.exit_code, None);
        assert!(!output.success());
        assert!(output.duration < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let request = CommandRequest::new("definitely-not-a-real-program-wheelhouse");
        assert!(ProcessRunner::new().run(&request).await.is_err());
    }

    #[test]
    fn test_display() {
        let request = CommandRequest::new("git").args(["clone", "--depth", "1"]);
        assert_eq!(request.display(), "git clone --depth 1");
    }
}
