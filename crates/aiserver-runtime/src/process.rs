//! Process-based runner
//!
//! Spawns each command as an OS process. Captured commands collect stdout and
//! stderr; streamed commands inherit the terminal so long installs show
//! progress.

use aiserver_core::{Capability, CommandOutput, CommandSpec};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::traits::CommandRunner;

/// Process runner configuration
#[derive(Debug, Clone)]
pub struct ProcessRunnerConfig {
    /// Prefix `Root` commands with `sudo` when not already running as root
    pub elevate: bool,
    /// Timeout applied to commands that do not carry their own
    pub default_timeout: Option<Duration>,
}

impl Default for ProcessRunnerConfig {
    fn default() -> Self {
        Self {
            elevate: true,
            default_timeout: None,
        }
    }
}

/// Runner that spawns real subprocesses
pub struct ProcessRunner {
    config: ProcessRunnerConfig,
    is_root: bool,
}

impl ProcessRunner {
    /// Create a new process runner
    pub fn new(config: ProcessRunnerConfig) -> Self {
        let is_root = running_as_root();
        debug!(is_root, elevate = config.elevate, "Process runner initialized");
        Self { config, is_root }
    }

    fn needs_sudo(&self, spec: &CommandSpec) -> bool {
        spec.capability == Capability::Root && self.config.elevate && !self.is_root
    }

    /// Build the command for a spec
    fn build_command(&self, spec: &CommandSpec) -> Command {
        let mut cmd = if self.needs_sudo(spec) {
            let mut cmd = Command::new("sudo");
            cmd.arg(&spec.program);
            cmd
        } else {
            Command::new(&spec.program)
        };
        cmd.args(&spec.args);

        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        cmd.envs(spec.env.iter().map(|(k, v)| (k, v)));

        if spec.stream {
            cmd.stdin(Stdio::inherit());
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::null());
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        }

        // An interrupted install drops the in-flight future; take the child with it.
        cmd.kill_on_drop(true);
        cmd
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(ProcessRunnerConfig::default())
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> CommandOutput {
        debug!(
            command = %spec,
            capability = ?spec.capability,
            sudo = self.needs_sudo(spec),
            "Running command"
        );

        let child = match self.build_command(spec).spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!(program = %spec.program, error = %e, "Failed to spawn command");
                return CommandOutput {
                    stderr: e.to_string(),
                    ..CommandOutput::not_found()
                };
            }
        };

        let timeout = spec.timeout.or(self.config.default_timeout);
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(command = %spec, timeout_secs = limit.as_secs(), "Command timed out");
                    return CommandOutput {
                        timed_out: true,
                        ..CommandOutput::not_found()
                    };
                }
            },
            None => child.wait_with_output().await,
        };

        match result {
            Ok(output) => {
                let out = CommandOutput {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    timed_out: false,
                };
                debug!(command = %spec, code = ?out.code, "Command finished");
                out
            }
            Err(e) => {
                warn!(command = %spec, error = %e, "Failed to wait for command");
                CommandOutput {
                    stderr: e.to_string(),
                    ..CommandOutput::not_found()
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

/// Whether the current process runs with effective uid 0
fn running_as_root() -> bool {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| parse_effective_uid(&status))
        .map(|uid| uid == 0)
        .unwrap_or(false)
}

/// Effective uid from the `Uid:` line of `/proc/<pid>/status`
fn parse_effective_uid(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Uid:"))
        .and_then(|ids| ids.split_whitespace().nth(1))
        .and_then(|euid| euid.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_runner_config_default() {
        let config = ProcessRunnerConfig::default();
        assert!(config.elevate);
        assert!(config.default_timeout.is_none());
    }

    #[test]
    fn test_parse_effective_uid() {
        let status = "Name:\tbash\nUid:\t1000\t0\t1000\t1000\nGid:\t1000\t1000\t1000\t1000\n";
        assert_eq!(parse_effective_uid(status), Some(0));
        assert_eq!(parse_effective_uid("Name:\tbash\n"), None);
    }

    #[test]
    fn test_sudo_only_for_root_capability() {
        let runner = ProcessRunner {
            config: ProcessRunnerConfig::default(),
            is_root: false,
        };
        let plain = CommandSpec::new("docker", ["--version"]);
        let privileged = CommandSpec::new("apt-get", ["update"]).with_capability(Capability::Root);
        assert!(!runner.needs_sudo(&plain));
        assert!(runner.needs_sudo(&privileged));

        let as_root = ProcessRunner {
            config: ProcessRunnerConfig::default(),
            is_root: true,
        };
        assert!(!as_root.needs_sudo(&privileged));
        assert_eq!(runner.name(), "process");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_output() {
        let runner = ProcessRunner::default();
        let output = runner.run(&CommandSpec::shell("echo hello; exit 3")).await;
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_passes_environment() {
        let runner = ProcessRunner::default();
        let spec = CommandSpec::shell("printf %s \"$AISERVER_TEST_VALUE\"")
            .with_env("AISERVER_TEST_VALUE", "from-spec");
        let output = runner.run(&spec).await;
        assert!(output.success());
        assert_eq!(output.stdout, "from-spec");
    }

    #[tokio::test]
    async fn test_missing_program_is_not_an_error() {
        let runner = ProcessRunner::default();
        let output = runner
            .run(&CommandSpec::new("definitely-not-a-real-binary-xyz", ["--version"]))
            .await;
        assert!(!output.success());
        assert_eq!(output.code, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_command() {
        let runner = ProcessRunner::default();
        let spec = CommandSpec::new("sleep", ["5"]).with_timeout(Duration::from_millis(100));
        let output = runner.run(&spec).await;
        assert!(output.timed_out);
        assert!(!output.success());
    }
}
