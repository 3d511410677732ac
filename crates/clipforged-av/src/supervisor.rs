//! Supervised execution of built command lines.
//!
//! The engine is launched directly, never through a shell, as the leader of
//! a fresh process group. When the deadline passes or the caller drops the
//! run future, the whole group is killed, so helpers the engine spawned do
//! not outlive the job. Standard output and standard error are merged in
//! arrival order.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clipforged_common::JobId;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::command::CommandLine;

/// Time allowed for a killed process to be reaped and its pipes drained.
const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// Upper bound on captured output; older bytes are dropped first.
const MAX_CAPTURED_OUTPUT: usize = 4 * 1024 * 1024;

/// Terminal state of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Engine exited with status 0.
    Succeeded { output: PathBuf },
    /// Engine exited non-zero or was killed by a signal (`exit_code` is
    /// `None` then).
    Failed { exit_code: Option<i32>, output: String },
    /// Deadline expired; the process group was killed.
    TimedOut { output: String },
    /// The engine could not be started.
    LaunchError { cause: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Outcome kind as reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Succeeded { .. } => "Succeeded",
            Self::Failed { .. } => "Failed",
            Self::TimedOut { .. } => "TimedOut",
            Self::LaunchError { .. } => "LaunchError",
        }
    }

    /// Captured engine output for outcomes that get a diagnostic log.
    pub fn diagnostic_output(&self) -> Option<&str> {
        match self {
            Self::Failed { output, .. } | Self::TimedOut { output } => Some(output),
            _ => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded { output } => write!(f, "succeeded: {}", output.display()),
            Self::Failed {
                exit_code: Some(code),
                ..
            } => write!(f, "failed with exit code {}", code),
            Self::Failed { exit_code: None, .. } => write!(f, "terminated by signal"),
            Self::TimedOut { .. } => write!(f, "timed out"),
            Self::LaunchError { cause } => write!(f, "launch error: {}", cause),
        }
    }
}

/// One execution attempt.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub recipe: String,
    pub command: CommandLine,
    pub deadline: Duration,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: Outcome,
}

impl Job {
    /// Wall-clock duration of the attempt.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Runs command lines with a deadline.
#[derive(Debug, Clone)]
pub struct Supervisor {
    grace: Duration,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self {
            grace: DEFAULT_GRACE,
        }
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the grace period used for reaping and draining after a kill.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Run a job and record its timing.
    pub async fn execute(&self, recipe: &str, command: CommandLine, deadline: Duration) -> Job {
        let id = JobId::new();
        let started_at = Utc::now();

        #[cfg(feature = "tracing")]
        tracing::info!(job = %id, recipe, "Starting job");

        let outcome = self.run(&command, deadline).await;
        let finished_at = Utc::now();

        #[cfg(feature = "tracing")]
        tracing::info!(job = %id, recipe, outcome = outcome.kind(), "Job finished");

        Job {
            id,
            recipe: recipe.to_string(),
            command,
            deadline,
            started_at,
            finished_at,
            outcome,
        }
    }

    /// Run `command` until it exits or `deadline` passes.
    ///
    /// Dropping the returned future kills the process group.
    pub async fn run(&self, command: &CommandLine, deadline: Duration) -> Outcome {
        let mut cmd = Command::new(command.program());
        cmd.args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return Outcome::LaunchError {
                    cause: format!("failed to spawn {}: {}", command.program().display(), e),
                }
            }
        };
        let mut group = ProcessGroupGuard::new(child.id());

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump(stderr, tx.clone()));
        }
        drop(tx);

        let mut captured = Vec::new();
        let waited = tokio::time::timeout(deadline, async {
            loop {
                tokio::select! {
                    Some(chunk) = rx.recv() => append_bounded(&mut captured, chunk),
                    status = child.wait() => break status,
                }
            }
        })
        .await;

        let status = match waited {
            Ok(status) => status,
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(?deadline, "Deadline expired, killing process group");

                group.kill();
                let _ = child.start_kill();
                let _ = tokio::time::timeout(self.grace, child.wait()).await;
                self.drain(&mut rx, &mut captured).await;
                return Outcome::TimedOut {
                    output: String::from_utf8_lossy(&captured).into_owned(),
                };
            }
        };

        // The leader is reaped, so its pgid is only still ours while stray
        // members keep the group alive; they could otherwise hold the pipes.
        group.kill_stragglers();
        self.drain(&mut rx, &mut captured).await;
        let output = String::from_utf8_lossy(&captured).into_owned();

        match status {
            Ok(status) if status.success() => Outcome::Succeeded {
                output: command.output().to_path_buf(),
            },
            Ok(status) => Outcome::Failed {
                exit_code: status.code(),
                output,
            },
            Err(e) => Outcome::Failed {
                exit_code: None,
                output: format!("{}\nwait failed: {}", output, e),
            },
        }
    }

    async fn drain(&self, rx: &mut mpsc::UnboundedReceiver<Vec<u8>>, captured: &mut Vec<u8>) {
        let _ = tokio::time::timeout(self.grace, async {
            while let Some(chunk) = rx.recv().await {
                append_bounded(captured, chunk);
            }
        })
        .await;
    }
}

async fn pump<R: AsyncRead + Unpin>(reader: R, tx: mpsc::UnboundedSender<Vec<u8>>) {
    let mut reader = BufReader::new(reader);
    loop {
        let mut chunk = Vec::new();
        match reader.read_until(b'\n', &mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                if tx.send(chunk).is_err() {
                    break;
                }
            }
        }
    }
}

fn append_bounded(buf: &mut Vec<u8>, chunk: Vec<u8>) {
    buf.extend_from_slice(&chunk);
    if buf.len() > MAX_CAPTURED_OUTPUT {
        let excess = buf.len() - MAX_CAPTURED_OUTPUT;
        buf.drain(..excess);
    }
}

/// Kills the child's process group when dropped.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    /// Kill the group. Only valid while the leader is unreaped.
    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }

    /// Kill members left behind by a leader that has already been reaped.
    fn kill_stragglers(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            if group_alive(pgid) {
                kill_group(pgid);
            }
        }
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pgid) else {
        return;
    };
    if let Err(err) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        if err != Errno::ESRCH {
            #[cfg(feature = "tracing")]
            tracing::warn!(pgid, error = %err, "Failed to kill process group");
        }
    }
}

/// Whether any process is still in group `pgid`.
#[cfg(unix)]
fn group_alive(pgid: u32) -> bool {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    i32::try_from(pgid)
        .map(|raw| killpg(Pid::from_raw(raw), None::<Signal>).is_ok())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

#[cfg(not(unix))]
fn group_alive(_pgid: u32) -> bool {
    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::time::Instant;

    /// Alive and not a zombie, per `/proc`.
    fn process_alive(pid: &str) -> bool {
        std::fs::read_to_string(format!("/proc/{}/stat", pid.trim()))
            .map(|stat| {
                stat.rsplit(')')
                    .next()
                    .map(|rest| !rest.trim_start().starts_with('Z'))
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_success() {
        let cmd = CommandLine::from_parts("echo", &["hello"], "/tmp/out.mp4");
        let outcome = Supervisor::new().run(&cmd, Duration::from_secs(10)).await;
        assert_eq!(
            outcome,
            Outcome::Succeeded {
                output: PathBuf::from("/tmp/out.mp4")
            }
        );
    }

    #[tokio::test]
    async fn test_launch_error() {
        let cmd = CommandLine::from_parts("/nonexistent/engine-12345", &[], "/tmp/out.mp4");
        let outcome = Supervisor::new().run(&cmd, Duration::from_secs(10)).await;
        assert_matches!(outcome, Outcome::LaunchError { .. });
        assert_eq!(outcome.diagnostic_output(), None);
    }

    #[tokio::test]
    async fn test_failed_captures_both_streams() {
        let cmd = CommandLine::from_parts(
            "sh",
            &["-c", "echo to-stdout; echo to-stderr >&2; exit 3"],
            "/tmp/out.mp4",
        );
        let outcome = Supervisor::new().run(&cmd, Duration::from_secs(10)).await;
        assert_matches!(
            &outcome,
            Outcome::Failed { exit_code: Some(3), output }
                if output.contains("to-stdout") && output.contains("to-stderr")
        );
        assert_eq!(outcome.kind(), "Failed");
    }

    #[tokio::test]
    async fn test_timeout_kills_group() {
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("child.pid");
        let script = format!(
            "sleep 30 & echo $! > {}; echo started; wait",
            pidfile.display()
        );
        let cmd = CommandLine::from_parts("sh", &["-c", &script], "/tmp/out.mp4");

        let start = Instant::now();
        let outcome = Supervisor::new()
            .with_grace(Duration::from_secs(2))
            .run(&cmd, Duration::from_millis(500))
            .await;
        assert!(start.elapsed() < Duration::from_secs(10));
        assert_matches!(&outcome, Outcome::TimedOut { output } if output.contains("started"));

        let pid = std::fs::read_to_string(&pidfile).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while process_alive(&pid) {
            assert!(Instant::now() < deadline, "background child survived the kill");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    #[tokio::test]
    async fn test_exit_kills_leftover_group_members() {
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("straggler.pid");
        let script = format!("sleep 30 & echo $! > {}; exit 0", pidfile.display());
        let cmd = CommandLine::from_parts("sh", &["-c", &script], "/tmp/out.mp4");

        let start = Instant::now();
        let outcome = Supervisor::new()
            .with_grace(Duration::from_secs(2))
            .run(&cmd, Duration::from_secs(10))
            .await;
        assert!(outcome.is_success(), "{outcome}");
        assert!(start.elapsed() < Duration::from_secs(5));

        let pid = std::fs::read_to_string(&pidfile).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while process_alive(&pid) {
            assert!(Instant::now() < deadline, "straggler survived a finished job");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    #[test]
    fn test_group_alive_for_missing_group() {
        // pid_max never reaches i32::MAX, so this group cannot exist.
        assert!(!group_alive(i32::MAX as u32));
    }

    #[tokio::test]
    async fn test_execute_records_job() {
        let cmd = CommandLine::from_parts("true", &[], "/tmp/out.mp4");
        let job = Supervisor::new()
            .execute("trim", cmd.clone(), Duration::from_secs(5))
            .await;
        assert_eq!(job.recipe, "trim");
        assert_eq!(job.command, cmd);
        assert!(job.outcome.is_success());
        assert!(job.finished_at >= job.started_at);
    }

    #[test]
    fn test_append_bounded_keeps_tail() {
        let mut buf = vec![b'a'; MAX_CAPTURED_OUTPUT];
        append_bounded(&mut buf, b"tail".to_vec());
        assert_eq!(buf.len(), MAX_CAPTURED_OUTPUT);
        assert!(buf.ends_with(b"tail"));
    }
}
