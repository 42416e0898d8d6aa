//! Build launcher
//!
//! Ties together tool resolution, argument rendering, environment
//! sanitization and process supervision. Each call starts exactly one build
//! process; launchers hold no per-build state and can run builds concurrently.

use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::arguments::{BuildArguments, LoggerSpec};
use crate::environment::BuildEnvironment;
use crate::request::BuildRequest;
use crate::resolver::{ResolvedTool, ToolResolver};
use crate::{Error, Result};

use super::output::LineSink;
use super::process::BuildProcess;

/// Upper bound of the blocking [`BuildLauncher::build`] wait
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_millis(32_000);

/// Suppresses the console window of the child on Windows
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Launches builds through a resolved build tool
#[derive(Clone)]
pub struct BuildLauncher {
    resolver: Arc<dyn ToolResolver>,
    logger: LoggerSpec,
    timeout: Duration,
    /// Base environment; the process environment at launch time when unset
    environment: Option<BuildEnvironment>,
}

impl BuildLauncher {
    /// Create a launcher using `resolver` to find the tool and registering `logger`
    pub fn new(resolver: Arc<dyn ToolResolver>, logger: LoggerSpec) -> Self {
        Self {
            resolver,
            logger,
            timeout: DEFAULT_BUILD_TIMEOUT,
            environment: None,
        }
    }

    /// Override the blocking wait timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use `environment` instead of the inherited one as the base environment
    ///
    /// The environment is still sanitized before each launch.
    pub fn with_environment(mut self, environment: BuildEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Timeout applied by [`BuildLauncher::build`]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Render the arguments `request` would be launched with
    pub fn arguments(&self, request: &BuildRequest) -> Result<(ResolvedTool, BuildArguments)> {
        request.validate()?;
        let resolved = self.resolver.resolve()?;
        let arguments = BuildArguments::new(resolved.tool, request, &self.logger);
        Ok((resolved, arguments))
    }

    /// Start the build tool for `request`
    ///
    /// Before starting, a `Running: ...` line with the executable and its
    /// arguments is sent to `on_stdout`. Must be called from within a Tokio
    /// runtime.
    pub fn launch(
        &self,
        request: &BuildRequest,
        on_stdout: Option<LineSink>,
        on_stderr: Option<LineSink>,
    ) -> Result<BuildProcess> {
        let (ResolvedTool { path, tool }, arguments) = self.arguments(request)?;

        let launch_message = format!("Running: \"{}\" {}", path, arguments);
        if let Some(ref sink) = on_stdout {
            sink(&launch_message);
        }
        tracing::info!(tool = %tool, "{}", launch_message);

        let mut command = Command::new(&path);
        command.args(arguments.argv());

        let environment = match &self.environment {
            Some(environment) => environment.clone(),
            None => BuildEnvironment::inherited(),
        };
        environment.sanitized().apply(&mut command);

        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        BuildProcess::spawn(path, command, on_stdout, on_stderr)
    }

    /// Run a build, blocking the calling thread until it exits or times out
    ///
    /// Output is relayed from runtime worker threads, never from the calling
    /// thread. A build still running after [`BuildLauncher::timeout`] is killed
    /// and reported as [`Error::Timeout`].
    ///
    /// Outside a runtime a dedicated one is created. Inside a multi-thread
    /// runtime the current worker is handed off with `block_in_place`; inside a
    /// current-thread runtime blocking is impossible and
    /// [`Error::BlockingInAsyncContext`] is returned, use
    /// [`BuildLauncher::build_async`] there.
    pub fn build(
        &self,
        request: &BuildRequest,
        on_stdout: Option<LineSink>,
        on_stderr: Option<LineSink>,
    ) -> Result<i32> {
        let run = async {
            let mut process = self.launch(request, on_stdout, on_stderr)?;
            process.wait_timeout(self.timeout).await
        };

        match Handle::try_current() {
            Ok(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::MultiThread => {
                    tokio::task::block_in_place(|| handle.block_on(run))
                }
                _ => Err(Error::BlockingInAsyncContext),
            },
            Err(_) => {
                let rt = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(2)
                    .enable_all()
                    .build()
                    .map_err(Error::Io)?;

                rt.block_on(run)
            }
        }
    }

    /// Run a build, suspending until it exits
    ///
    /// There is no timeout on this path; callers wanting one can wrap the
    /// future, in which case dropping it kills the build process.
    pub async fn build_async(
        &self,
        request: &BuildRequest,
        on_stdout: Option<LineSink>,
        on_stderr: Option<LineSink>,
    ) -> Result<i32> {
        let mut process = self.launch(request, on_stdout, on_stderr)?;
        process.wait().await
    }
}

impl std::fmt::Debug for BuildLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildLauncher")
            .field("logger", &self.logger)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::BuildTool;
    use crate::resolver::StaticResolver;

    #[test]
    fn test_default_timeout() {
        let launcher = BuildLauncher::new(
            Arc::new(StaticResolver::new("/nonexistent", BuildTool::MsBuild)),
            LoggerSpec::default(),
        );

        assert_eq!(launcher.timeout(), Duration::from_secs(32));
        assert_eq!(
            launcher
                .with_timeout(Duration::from_secs(1))
                .timeout(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_tool_not_found_before_launch() {
        let launcher = BuildLauncher::new(
            Arc::new(StaticResolver::new("/nonexistent/msbuild", BuildTool::MsBuild)),
            LoggerSpec::default(),
        );
        let request = BuildRequest::new("/proj/App.sln", "Debug", "/proj/logs");

        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let sink: LineSink = Arc::new(move |_: &str| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        let result = launcher.build(&request, Some(sink), None);

        assert!(matches!(result, Err(Error::ToolNotFound { .. })));
        // Nothing was launched, so not even the launch line was emitted
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_build_in_current_thread_runtime_is_rejected() {
        let launcher = BuildLauncher::new(
            Arc::new(StaticResolver::new("/bin/sh", BuildTool::MsBuild)),
            LoggerSpec::default(),
        );
        let request = BuildRequest::new("/proj/App.sln", "Debug", "/proj/logs");

        assert!(matches!(
            launcher.build(&request, None, None),
            Err(Error::BlockingInAsyncContext)
        ));
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn test_build_in_multi_thread_runtime_blocks_in_place() {
        let temp_dir = tempfile::tempdir().unwrap();
        let script = temp_dir.path().join("App.sln");
        std::fs::write(&script, "echo built\nexit 4\n").unwrap();
        let script = camino::Utf8PathBuf::try_from(script).unwrap();

        // `/bin/sh` runs the "solution" as a script and ignores the rest
        let launcher = BuildLauncher::new(
            Arc::new(StaticResolver::new("/bin/sh", BuildTool::MsBuild)),
            LoggerSpec::default(),
        );
        let request = BuildRequest::new(script, "Debug", "/proj/logs");

        let (sink, mut rx) = crate::build::channel_sink();
        let exit_code = launcher.build(&request, Some(sink), None).unwrap();

        assert_eq!(exit_code, 4);
        assert!(rx.recv().await.unwrap().starts_with("Running: "));
        assert_eq!(rx.recv().await.as_deref(), Some("built"));
    }

    #[test]
    fn test_invalid_request_rejected() {
        let launcher = BuildLauncher::new(
            Arc::new(StaticResolver::new("/nonexistent/msbuild", BuildTool::MsBuild)),
            LoggerSpec::default(),
        );
        let request = BuildRequest::new("/proj/App.sln", "Debug", "/proj/logs")
            .with_targets(Vec::<String>::new());

        assert!(matches!(
            launcher.build(&request, None, None),
            Err(Error::InvalidRequest { .. })
        ));
    }
}
