//! Data-described external commands
//!
//! Install actions, hardware queries and supervisor calls are expressed as
//! [`CommandSpec`] values and handed to an injected runner, so tests can
//! record them instead of spawning processes.

use std::path::PathBuf;
use std::time::Duration;

/// What a command needs from the host in order to succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Nothing beyond the program itself
    None,
    /// Superuser privileges
    Root,
    /// A working container engine
    Docker,
    /// Outbound network access
    Network,
    /// A visible NVIDIA GPU
    Gpu,
}

/// A program invocation described as data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory, inherited when `None`
    pub cwd: Option<PathBuf>,
    pub capability: Capability,
    /// Kill the command after this long
    pub timeout: Option<Duration>,
    /// Inherit stdio instead of capturing output
    pub stream: bool,
    /// Extra environment; kept out of [`CommandSpec::display`]
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            capability: Capability::None,
            timeout: None,
            stream: false,
            env: Vec::new(),
        }
    }

    /// Run a pipeline through `sh -c`
    pub fn shell(script: &str) -> Self {
        Self::new("sh", ["-c", script])
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.push((key.to_string(), value.into()));
        self
    }

    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    /// Human-readable command line
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Result of running a [`CommandSpec`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` if the program could not be spawned, was killed by a
    /// signal or timed out
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Successful exit with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// Non-zero exit
    pub fn failed(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Self::default()
        }
    }

    /// Program absent from the host
    pub fn not_found() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display() {
        let cmd = CommandSpec::new("docker", ["compose", "ps"]);
        assert_eq!(cmd.to_string(), "docker compose ps");
        assert_eq!(CommandSpec::new("nvidia-smi", Vec::<String>::new()).display(), "nvidia-smi");
    }

    #[test]
    fn test_builder() {
        let cmd = CommandSpec::new("apt-get", ["update"])
            .with_capability(Capability::Root)
            .with_timeout(Duration::from_secs(5))
            .in_dir("/tmp")
            .with_env("HF_TOKEN", "hf_secret")
            .streaming();
        assert_eq!(cmd.capability, Capability::Root);
        assert_eq!(cmd.timeout, Some(Duration::from_secs(5)));
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
        assert!(cmd.stream);
        assert_eq!(cmd.env, vec![("HF_TOKEN".to_string(), "hf_secret".to_string())]);
        assert_eq!(cmd.display(), "apt-get update");
    }

    #[test]
    fn test_output_success() {
        assert!(CommandOutput::ok("").success());
        assert!(!CommandOutput::failed(1).success());
        assert!(!CommandOutput::not_found().success());
    }
}
