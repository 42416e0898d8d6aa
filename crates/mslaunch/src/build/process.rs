//! Build process supervision
//!
//! A [`BuildProcess`] owns one child process and the tasks relaying its
//! output. It is created by [`super::BuildLauncher`] and lives for exactly one
//! build.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::{Error, Result};

use super::output::{LineSink, OutputStream, spawn_line_reader};

/// How long output readers may run after the build tool exited
///
/// Helper processes spawned by the tool can inherit its pipes and keep them
/// open after the tool itself is gone.
pub const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Lifecycle of a build process
///
/// A [`BuildProcess`] only exists once its child has been spawned, so the
/// `Created` phase is the [`super::BuildLauncher`] preparing the launch.
/// `Started` moves to either `Exited` or `TimedOut`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Running and relaying output
    Started,
    /// Exited on its own with the given code
    Exited(i32),
    /// Killed after the blocking wait gave up
    TimedOut,
}

/// Running build tool process
pub struct BuildProcess {
    program: Utf8PathBuf,
    child: Child,
    /// Pid of the child, which also leads its process group on unix
    pid: Option<u32>,
    readers: Vec<JoinHandle<()>>,
    state: BuildState,
}

impl BuildProcess {
    /// Spawn `command` with captured output
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn spawn(
        program: Utf8PathBuf,
        mut command: Command,
        on_stdout: Option<LineSink>,
        on_stderr: Option<LineSink>,
    ) -> Result<Self> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Helper processes of the tool join its group and are killed with it
        #[cfg(unix)]
        command.process_group(0);

        tracing::debug!("Spawning build process: {:?}", command);

        let mut child = command.spawn().map_err(|source| Error::ProcessStart {
            program: program.clone(),
            source,
        })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(Error::ProcessStart {
                program,
                source: std::io::Error::other("output streams were not captured"),
            });
        };

        let readers = vec![
            spawn_line_reader(stdout, OutputStream::Stdout, program.to_string(), on_stdout),
            spawn_line_reader(stderr, OutputStream::Stderr, program.to_string(), on_stderr),
        ];

        let pid = child.id();
        tracing::debug!("Started {} (pid {:?})", program, pid);

        Ok(Self {
            program,
            child,
            pid,
            readers,
            state: BuildState::Started,
        })
    }

    /// Path of the running executable
    pub fn program(&self) -> &Utf8Path {
        &self.program
    }

    /// OS process id, while the process is running
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Current lifecycle state
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Wait for the process to exit and return its exit code
    pub async fn wait(&mut self) -> Result<i32> {
        let status = self.child.wait().await.map_err(|source| Error::Wait {
            program: self.program.clone(),
            source,
        })?;

        self.finish(status).await
    }

    /// Wait for the process to exit, killing it if `timeout` elapses first
    ///
    /// A timed out process is killed and reaped before [`Error::Timeout`] is
    /// returned.
    pub async fn wait_timeout(&mut self, timeout: Duration) -> Result<i32> {
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(status) => {
                let status = status.map_err(|source| Error::Wait {
                    program: self.program.clone(),
                    source,
                })?;
                self.finish(status).await
            }
            Err(_) => {
                tracing::warn!(
                    "{} did not exit within {:?}, killing it",
                    self.program,
                    timeout
                );
                self.state = BuildState::TimedOut;

                self.kill_group();
                if let Err(e) = self.child.kill().await {
                    tracing::warn!("Failed to kill {}: {}", self.program, e);
                }
                self.abort_output();

                Err(Error::Timeout {
                    program: self.program.clone(),
                    timeout,
                })
            }
        }
    }

    async fn finish(&mut self, status: ExitStatus) -> Result<i32> {
        self.drain_output().await;

        let code = status.code().ok_or_else(|| Error::Terminated {
            program: self.program.clone(),
        })?;

        tracing::debug!("{} exited with code {}", self.program, code);
        self.state = BuildState::Exited(code);

        Ok(code)
    }

    /// Kill every process in the child's process group
    #[cfg(unix)]
    fn kill_group(&self) {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        let Some(pid) = self.pid.and_then(|pid| i32::try_from(pid).ok()) else {
            return;
        };

        // ESRCH: the whole group is already gone
        match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
            Err(e) => tracing::warn!("Failed to kill process group of {}: {}", self.program, e),
        }
    }

    #[cfg(not(unix))]
    fn kill_group(&self) {}

    /// Stop relaying output right away
    fn abort_output(&mut self) {
        for reader in self.readers.drain(..) {
            reader.abort();
        }
    }

    /// Wait for the output readers, giving up after [`OUTPUT_DRAIN_GRACE`]
    async fn drain_output(&mut self) {
        let deadline = tokio::time::Instant::now() + OUTPUT_DRAIN_GRACE;

        for reader in self.readers.drain(..) {
            let abort = reader.abort_handle();
            if tokio::time::timeout_at(deadline, reader).await.is_err() {
                tracing::warn!(
                    "Output of {} still open after exit, detaching",
                    self.program
                );
                abort.abort();
            }
        }
    }
}

impl Drop for BuildProcess {
    fn drop(&mut self) {
        // The child itself is killed by `kill_on_drop`, its helpers are not
        if self.state == BuildState::Started && self.child.id().is_some() {
            self.kill_group();
        }
        self.abort_output();
    }
}

impl std::fmt::Debug for BuildProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildProcess")
            .field("program", &self.program)
            .field("pid", &self.child.id())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::build::channel_sink;

    fn sh(script: &str) -> (Utf8PathBuf, Command) {
        let program = Utf8PathBuf::from("/bin/sh");
        let mut command = Command::new(&program);
        command.args(["-c", script]);
        (program, command)
    }

    #[tokio::test]
    async fn test_wait_returns_exit_code() {
        let (program, command) = sh("exit 3");
        let mut process = BuildProcess::spawn(program, command, None, None).unwrap();

        assert_eq!(process.state(), BuildState::Started);
        assert_eq!(process.wait().await.unwrap(), 3);
        assert_eq!(process.state(), BuildState::Exited(3));
    }

    #[tokio::test]
    async fn test_wait_relays_both_streams() {
        let (program, command) = sh("echo out1; echo err1 >&2; echo out2; echo err2 >&2");
        let (out_sink, mut out_rx) = channel_sink();
        let (err_sink, mut err_rx) = channel_sink();

        let mut process =
            BuildProcess::spawn(program, command, Some(out_sink), Some(err_sink)).unwrap();
        assert_eq!(process.wait().await.unwrap(), 0);
        drop(process);

        let mut out = Vec::new();
        while let Some(line) = out_rx.recv().await {
            out.push(line);
        }
        let mut err = Vec::new();
        while let Some(line) = err_rx.recv().await {
            err.push(line);
        }

        assert_eq!(out, vec!["out1", "out2"]);
        assert_eq!(err, vec!["err1", "err2"]);
    }

    #[tokio::test]
    async fn test_wait_timeout_kills_process() {
        let (program, command) = sh("exec sleep 30");
        let mut process = BuildProcess::spawn(program, command, None, None).unwrap();

        let started = std::time::Instant::now();
        let result = process.wait_timeout(Duration::from_millis(200)).await;

        assert!(matches!(result, Err(Error::Timeout { .. })));
        assert_eq!(process.state(), BuildState::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(2));
        // Reaped: no pid is reported anymore
        assert_eq!(process.id(), None);
    }

    #[tokio::test]
    async fn test_wait_timeout_kills_helper_processes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let marker = temp_dir.path().join("helper_survived");
        let (program, command) = sh(&format!(
            "(sleep 2; touch {}) & exec sleep 60",
            marker.display()
        ));
        let mut process = BuildProcess::spawn(program, command, None, None).unwrap();

        let timeout = Duration::from_millis(300);
        let started = std::time::Instant::now();
        let result = process.wait_timeout(timeout).await;

        assert!(matches!(result, Err(Error::Timeout { .. })));
        // The helper still holds the pipes, so readers must not be awaited
        assert!(started.elapsed() < timeout + Duration::from_secs(1));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_signal_termination_has_no_exit_code() {
        let (program, command) = sh("kill -9 $$");
        let mut process = BuildProcess::spawn(program, command, None, None).unwrap();

        assert!(matches!(
            process.wait().await,
            Err(Error::Terminated { .. })
        ));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let program = Utf8PathBuf::from("/nonexistent/msbuild");
        let command = Command::new(&program);

        let err = BuildProcess::spawn(program, command, None, None).unwrap_err();
        assert!(matches!(err, Error::ProcessStart { .. }));
    }
}
