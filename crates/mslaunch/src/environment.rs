//! Environment computation for build processes
//!
//! The child inherits the caller's environment minus variables known to break
//! the build tool's own property resolution.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};

use tokio::process::Command;

/// Variable removed from the child environment, compared ignoring ASCII case
///
/// Developer command prompts set `Platform`, which the build tool would pick up
/// as the `$(Platform)` property.
pub const PLATFORM_VARIABLE: &str = "PLATFORM";

/// Variable forced on to skip the first-run banner of the `dotnet` front end
pub const SKIP_FIRST_TIME_EXPERIENCE: &str = "DOTNET_SKIP_FIRST_TIME_EXPERIENCE";

/// Environment handed to a build process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnvironment {
    vars: HashMap<OsString, OsString>,
}

impl BuildEnvironment {
    /// Snapshot the current process environment
    pub fn inherited() -> Self {
        Self::from_vars(std::env::vars_os())
    }

    /// Create an environment from explicit variables
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a specific environment variable
    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    /// Set an environment variable
    pub fn set(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Iterate over variable names
    pub fn keys(&self) -> impl Iterator<Item = &OsStr> {
        self.vars.keys().map(OsString::as_os_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Remove every `PLATFORM` variable regardless of case and disable the
    /// `dotnet` first-run experience
    pub fn sanitize(&mut self) {
        // Collect first, then remove: the map cannot be mutated while iterated
        let platform_keys: Vec<OsString> = self
            .vars
            .keys()
            .filter(|key| is_platform_variable(key))
            .cloned()
            .collect();

        for key in platform_keys {
            tracing::debug!("Removing {:?} from build environment", key);
            self.vars.remove(&key);
        }

        self.vars
            .insert(SKIP_FIRST_TIME_EXPERIENCE.into(), OsString::from("1"));
    }

    /// Consume the environment and return a sanitized copy
    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }

    /// Replace the command's environment with this one
    pub fn apply(&self, command: &mut Command) {
        command.env_clear().envs(&self.vars);
    }
}

fn is_platform_variable(key: &OsStr) -> bool {
    key.to_str()
        .is_some_and(|k| k.eq_ignore_ascii_case(PLATFORM_VARIABLE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_removes_all_platform_spellings() {
        let mut env = BuildEnvironment::from_vars([
            ("Platform", "x64"),
            ("PLATFORM", "Any CPU"),
            ("plAtForm", "arm64"),
            ("PATH", "/usr/bin"),
            ("PLATFORM_TOOLSET", "v143"),
            ("TargetPlatform", "linux"),
        ]);

        env.sanitize();

        assert!(env.keys().all(|k| !is_platform_variable(k)));
        assert_eq!(env.get("PATH"), Some(OsStr::new("/usr/bin")));
        assert_eq!(env.get("PLATFORM_TOOLSET"), Some(OsStr::new("v143")));
        assert_eq!(env.get("TargetPlatform"), Some(OsStr::new("linux")));
        assert_eq!(env.get(SKIP_FIRST_TIME_EXPERIENCE), Some(OsStr::new("1")));
        assert_eq!(env.len(), 4);
    }

    #[test]
    fn test_sanitize_overrides_first_time_experience() {
        let env = BuildEnvironment::from_vars([(SKIP_FIRST_TIME_EXPERIENCE, "0")]).sanitized();

        assert_eq!(env.get(SKIP_FIRST_TIME_EXPERIENCE), Some(OsStr::new("1")));
    }

    #[test]
    fn test_sanitize_empty_environment() {
        let env = BuildEnvironment::default().sanitized();

        assert_eq!(env.len(), 1);
        assert_eq!(env.get(SKIP_FIRST_TIME_EXPERIENCE), Some(OsStr::new("1")));
    }

    #[test]
    fn test_inherited_matches_process_environment() {
        let env = BuildEnvironment::inherited();

        assert_eq!(env.len(), std::env::vars_os().count());
    }
}
