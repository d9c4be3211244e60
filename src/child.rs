/// Child process lifecycle: spawn the user's command with the parent's output
/// streams, stop it (politely or not), and wait for it to exit.
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};

/// The command to run: executable plus arguments. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    /// Build from command-line words. Returns `None` for an empty list.
    pub fn from_words(words: Vec<String>) -> Option<Self> {
        let mut words = words.into_iter();
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Whether the child gets the parent's standard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdinPolicy {
    Inherit,
    Null,
}

/// The command could not be launched.
#[derive(Debug)]
pub struct SpawnError {
    pub program: String,
    pub source: std::io::Error,
}

impl std::fmt::Display for SpawnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to spawn {}: {}", self.program, self.source)
    }
}

impl std::error::Error for SpawnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// One running invocation of a `CommandSpec`.
///
/// Owned by exactly one supervision cycle. The process is killed if the
/// handle is dropped while it is still running.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    pid: u32,
}

impl ChildProcess {
    pub fn start(spec: &CommandSpec, stdin: StdinPolicy) -> Result<Self, SpawnError> {
        let stdin = match stdin {
            StdinPolicy::Inherit => Stdio::inherit(),
            StdinPolicy::Null => Stdio::null(),
        };

        let child = Command::new(spec.program())
            .args(spec.args())
            .stdin(stdin)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpawnError {
                program: spec.program().to_string(),
                source: e,
            })?;

        let pid = child.id().unwrap_or(0);
        tracing::debug!(pid, command = %spec, "child started");
        Ok(Self { child, pid })
    }

    /// PID at spawn time (for logging).
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Ask the process to terminate (SIGTERM). No-op once it has been reaped.
    #[cfg(unix)]
    pub fn request_graceful_stop(&mut self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(pid) = self.child.id() else {
            return;
        };
        if let Err(err) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            tracing::debug!(pid, error = %err, "SIGTERM delivery failed");
        }
    }

    #[cfg(not(unix))]
    pub fn request_graceful_stop(&mut self) {
        self.force_kill();
    }

    /// Kill the process immediately. No-op once it has been reaped.
    pub fn force_kill(&mut self) {
        if let Err(err) = self.child.start_kill() {
            tracing::debug!(pid = self.pid, error = %err, "kill failed");
        }
    }

    /// Wait for the process to exit for any reason.
    ///
    /// The status is returned for logging only; `None` means it could not be
    /// collected.
    pub async fn wait_for_exit(&mut self) -> Option<ExitStatus> {
        match self.child.wait().await {
            Ok(status) => Some(status),
            Err(err) => {
                tracing::warn!(pid = self.pid, error = %err, "failed to wait for child");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::from_words(vec!["sh".into(), "-c".into(), script.into()]).unwrap()
    }

    #[test]
    fn test_from_words_splits_program_and_args() {
        let spec =
            CommandSpec::from_words(vec!["cargo".into(), "build".into(), "--release".into()])
                .unwrap();
        assert_eq!(spec.program(), "cargo");
        assert_eq!(spec.args(), &["build".to_string(), "--release".to_string()]);
        assert_eq!(spec.to_string(), "cargo build --release");
    }

    #[test]
    fn test_from_words_rejects_empty() {
        assert!(CommandSpec::from_words(vec![]).is_none());
    }

    #[tokio::test]
    async fn test_natural_exit_reports_status() {
        let mut child = ChildProcess::start(&sh("exit 3"), StdinPolicy::Null).unwrap();
        assert!(child.pid() > 0);
        let status = child.wait_for_exit().await.unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let spec = CommandSpec::from_words(vec!["nonexistent-binary-xyz".into()]).unwrap();
        let err = ChildProcess::start(&spec, StdinPolicy::Null).unwrap_err();
        assert_eq!(err.program, "nonexistent-binary-xyz");
        assert!(err.to_string().contains("failed to spawn"));
    }

    #[tokio::test]
    async fn test_force_kill_stops_long_runner() {
        let mut child = ChildProcess::start(&sh("sleep 5"), StdinPolicy::Null).unwrap();
        let start = Instant::now();
        child.force_kill();
        let status = child.wait_for_exit().await.unwrap();
        assert!(!status.success());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_graceful_stop_sends_sigterm() {
        use std::os::unix::process::ExitStatusExt;

        let mut child = ChildProcess::start(&sh("sleep 5"), StdinPolicy::Null).unwrap();
        child.request_graceful_stop();
        let status = child.wait_for_exit().await.unwrap();
        assert_eq!(status.signal(), Some(nix::libc::SIGTERM));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_graceful_stop_can_be_handled() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("term");
        let script = format!(
            "trap 'echo term > {}; exit 0' TERM; sleep 5 & wait",
            marker.display()
        );
        let mut child = ChildProcess::start(&sh(&script), StdinPolicy::Null).unwrap();
        // Give the shell a moment to install its trap.
        tokio::time::sleep(Duration::from_millis(200)).await;
        child.request_graceful_stop();
        let status = child.wait_for_exit().await.unwrap();
        assert!(status.success());
        assert_eq!(std::fs::read_to_string(&marker).unwrap().trim(), "term");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_force_kill_is_sigkill_even_when_term_ignored() {
        use std::os::unix::process::ExitStatusExt;

        let mut child =
            ChildProcess::start(&sh("trap '' TERM; sleep 5"), StdinPolicy::Null).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let start = Instant::now();
        child.force_kill();
        let status = child.wait_for_exit().await.unwrap();
        assert_eq!(status.signal(), Some(nix::libc::SIGKILL));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_stop_after_exit_is_noop() {
        let mut child = ChildProcess::start(&sh("true"), StdinPolicy::Null).unwrap();
        child.wait_for_exit().await.unwrap();
        child.request_graceful_stop();
        child.force_kill();
        // Waiting again returns the cached status.
        assert!(child.wait_for_exit().await.unwrap().success());
    }
}
