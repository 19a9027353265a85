//! The install step abstraction

use aiserver_core::{AiServerError, AiServerResult, CommandSpec, HardwareSnapshot, Reporter, StackRoot};
use aiserver_runtime::CommandRunner;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Question asked before running a step that is not yet satisfied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub question: String,
    /// Answer assumed in unattended mode
    pub default: bool,
}

impl Confirmation {
    pub fn new(question: impl Into<String>, default: bool) -> Self {
        Self {
            question: question.into(),
            default,
        }
    }
}

/// Result of a step's precheck
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precheck {
    /// Nothing to do
    Satisfied(String),
    /// Nothing to do, but the operator should know something
    SatisfiedWithWarning(String),
    /// The action has to run
    Needed(String),
}

impl Precheck {
    pub fn is_satisfied(&self) -> bool {
        !matches!(self, Precheck::Needed(_))
    }
}

/// Everything a step may touch
pub struct StepContext {
    /// Configuration root the stack is installed under
    pub root: StackRoot,
    /// Snapshot taken at the start of the run
    pub snapshot: HardwareSnapshot,
    /// Executes every external command
    pub runner: Arc<dyn CommandRunner>,
    /// Operator-facing status lines
    pub reporter: Arc<dyn Reporter>,
    /// Home directory holding the shell profile
    pub home: PathBuf,
    /// Login name added to the docker group
    pub user: Option<String>,
}

impl StepContext {
    /// Run one command, failing on a non-zero exit
    pub async fn run(&self, spec: &CommandSpec) -> AiServerResult<()> {
        debug!(program = %spec.program, command = %spec, "Running");
        let output = self.runner.run(spec).await;
        if output.success() {
            return Ok(());
        }
        let reason = if output.timed_out {
            "timed out".to_string()
        } else {
            match output.code {
                Some(code) => format!("exit code {}", code),
                None => "could not be started".to_string(),
            }
        };
        Err(AiServerError::Command(format!("`{}` {}", spec, reason)))
    }

    /// Run commands in order, stopping at the first failure
    pub async fn run_all(&self, specs: &[CommandSpec]) -> AiServerResult<()> {
        for spec in specs {
            self.run(spec).await?;
        }
        Ok(())
    }

    /// Run commands in order, reporting failures without stopping.
    /// Returns the number of failed commands.
    pub async fn run_best_effort(&self, specs: &[CommandSpec]) -> usize {
        let mut failures = 0;
        for spec in specs {
            if let Err(e) = self.run(spec).await {
                warn!(error = %e, "Best-effort command failed");
                self.reporter.warn(&e.to_string());
                failures += 1;
            }
        }
        failures
    }
}

/// One idempotent unit of the installation
#[async_trait]
pub trait InstallStep: Send + Sync {
    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Whether skipping this step aborts the run
    fn required(&self) -> bool;

    /// Question asked before the action runs, if any
    fn confirmation(&self) -> Option<Confirmation> {
        None
    }

    /// Inspect the host; never changes anything
    async fn precheck(&self, ctx: &StepContext) -> Precheck;

    /// Perform the step
    async fn run(&self, ctx: &StepContext) -> AiServerResult<()>;
}
