//! Command-line construction for the build tool
//!
//! Turns a [`BuildTool`] and a [`BuildRequest`] into the arguments passed to the
//! build tool executable. The result is a pure function of its inputs.

use std::fmt;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::request::{BuildRequest, BuildTool};

/// Verbosity passed to every build
const VERBOSITY: &str = "/v:normal";

/// Custom logger registered with the build tool
///
/// The logger writes structured build logs into the request's logs directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerSpec {
    /// Fully qualified type name of the logger
    pub type_name: String,
    /// Path to the assembly containing the logger
    pub assembly_path: Utf8PathBuf,
}

impl LoggerSpec {
    pub fn new(type_name: impl Into<String>, assembly_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            type_name: type_name.into(),
            assembly_path: assembly_path.into(),
        }
    }
}

impl Default for LoggerSpec {
    fn default() -> Self {
        Self {
            type_name: "GodotTools.BuildLogger.GodotBuildLogger".to_string(),
            assembly_path: Utf8PathBuf::from("GodotTools.BuildLogger.dll"),
        }
    }
}

/// A single argument and whether it is quoted in the rendered command line
#[derive(Debug, Clone, PartialEq, Eq)]
struct Arg {
    value: String,
    quoted: bool,
}

impl Arg {
    fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quoted: false,
        }
    }

    fn quoted(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quoted: true,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "\"{}\"", self.value)
        } else {
            f.write_str(&self.value)
        }
    }
}

/// Arguments for one build tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArguments {
    verb: Option<&'static str>,
    args: Vec<Arg>,
}

impl BuildArguments {
    /// Build the argument list for `request` run through `tool`
    ///
    /// Order: solution, `/restore`, `/t:`, configuration, verbosity, logger,
    /// then one `/p:` per custom property in input order.
    pub fn new(tool: BuildTool, request: &BuildRequest, logger: &LoggerSpec) -> Self {
        let mut args = vec![Arg::quoted(request.solution_path.as_str())];

        if request.restore {
            args.push(Arg::plain("/restore"));
        }

        args.push(Arg::plain(format!("/t:{}", request.targets.join(","))));
        args.push(Arg::quoted(format!(
            "/p:Configuration={}",
            request.configuration
        )));
        args.push(Arg::plain(VERBOSITY));
        args.push(Arg::quoted(format!(
            "/l:{},{};{}",
            logger.type_name, logger.assembly_path, request.logs_dir_path
        )));

        args.extend(
            request
                .custom_properties
                .iter()
                .map(|property| Arg::plain(format!("/p:{}", property))),
        );

        Self {
            verb: tool.verb(),
            args,
        }
    }

    /// Arguments as passed to the OS, without shell quoting
    pub fn argv(&self) -> Vec<String> {
        self.verb
            .map(str::to_string)
            .into_iter()
            .chain(self.args.iter().map(|arg| arg.value.clone()))
            .collect()
    }

    /// Render the full command line as a single string
    pub fn command_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BuildArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The verb is followed by two spaces, matching what the tool has always been shown
        if let Some(verb) = self.verb {
            write!(f, "{}  ", verb)?;
        }

        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", arg)?;
        }

        Ok(())
    }
}
