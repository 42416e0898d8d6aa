//! Error types for mslaunch

// This warning is a false positive from thiserror macro expansion
#![allow(unused_assignments)]

use std::time::Duration;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for mslaunch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mslaunch
///
/// A non-zero exit code from the build tool is not an error: it is returned
/// as a normal value and left for the caller to interpret.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// No build tool executable could be located
    #[error("Cannot find the MSBuild executable")]
    #[diagnostic(help(
        "Install the .NET SDK or MSBuild, or set [tool].path in mslaunch.toml"
    ))]
    ToolNotFound {
        /// Locations that were searched
        searched: Vec<Utf8PathBuf>,
    },

    /// The OS refused to create the build process
    #[error("Failed to start {program}: {source}")]
    #[diagnostic(help("Check that the build tool path is executable"))]
    ProcessStart {
        program: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the build process failed
    #[error("Failed to wait for {program}: {source}")]
    Wait {
        program: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking wait gave up before the build process exited
    #[error("{program} did not exit within {}s and was killed", .timeout.as_secs_f64())]
    #[diagnostic(help("Use the async build path for long-running builds"))]
    Timeout { program: Utf8PathBuf, timeout: Duration },

    /// The blocking build was called where the thread cannot be blocked
    #[error("Blocking build called from a current-thread async runtime")]
    #[diagnostic(help("Use build_async from async code"))]
    BlockingInAsyncContext,

    /// The build process ended without an exit code (killed by a signal)
    #[error("{program} was terminated without an exit code")]
    Terminated { program: Utf8PathBuf },

    /// The build request cannot be rendered into a usable command line
    #[error("Invalid build request: {message}")]
    InvalidRequest {
        message: String,
        #[help]
        help: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[help]
        help: String,
    },
}

impl Error {
    /// Create a tool-not-found error
    pub fn tool_not_found(searched: Vec<Utf8PathBuf>) -> Self {
        Self::ToolNotFound { searched }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.into(),
        }
    }
}
