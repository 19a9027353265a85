//! Sequential step execution

use aiserver_core::Reporter;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::policy::{self, Decision, Mode};
use crate::prompt::Prompter;
use crate::step::{InstallStep, Precheck, StepContext};

/// Final state of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    AlreadySatisfied,
    Succeeded,
    Skipped,
    Failed,
    /// The run aborted before reaching the step
    NotReached,
}

impl std::fmt::Display for StepState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepState::AlreadySatisfied => write!(f, "already satisfied"),
            StepState::Succeeded => write!(f, "succeeded"),
            StepState::Skipped => write!(f, "skipped"),
            StepState::Failed => write!(f, "failed"),
            StepState::NotReached => write!(f, "not reached"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: &'static str,
    pub required: bool,
    pub state: StepState,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub records: Vec<StepRecord>,
    /// The run stopped before the last step
    pub aborted: bool,
}

impl InstallReport {
    /// Report of a run the operator declined before any step
    pub fn declined() -> Self {
        Self {
            records: Vec::new(),
            aborted: true,
        }
    }

    pub fn state_of(&self, name: &str) -> Option<StepState> {
        self.records.iter().find(|r| r.name == name).map(|r| r.state)
    }

    /// Required steps that did not end satisfied or succeeded
    pub fn incomplete_required(&self) -> Vec<&StepRecord> {
        self.records
            .iter()
            .filter(|r| r.required && matches!(r.state, StepState::Failed | StepState::Skipped))
            .collect()
    }

    pub fn is_success(&self) -> bool {
        !self.aborted && self.incomplete_required().is_empty()
    }

    /// Process exit code for the run
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Runs steps in order, one at a time
pub struct StepRunner {
    mode: Mode,
    prompter: Arc<dyn Prompter>,
    reporter: Arc<dyn Reporter>,
}

impl StepRunner {
    pub fn new(mode: Mode, prompter: Arc<dyn Prompter>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            mode,
            prompter,
            reporter,
        }
    }

    /// Run every step, returning what happened to each
    pub async fn run(&self, steps: &[Box<dyn InstallStep>], ctx: &StepContext) -> InstallReport {
        let mut report = InstallReport::default();

        for (position, step) in steps.iter().enumerate() {
            let name = step.name();
            info!(step = %name, position = position + 1, total = steps.len(), "Starting step");
            self.reporter.info(&format!("[{}/{}] {}", position + 1, steps.len(), name));

            let state = match self.run_step(step.as_ref(), ctx).await {
                Ok(state) => state,
                Err(state) => {
                    report.records.push(record(step.as_ref(), state));
                    report.aborted = true;
                    for rest in &steps[position + 1..] {
                        report.records.push(record(rest.as_ref(), StepState::NotReached));
                    }
                    warn!(step = %name, "Installation aborted");
                    self.reporter.error("Installation aborted");
                    break;
                }
            };
            report.records.push(record(step.as_ref(), state));
        }

        report
    }

    /// Drive one step. `Err` carries the final state of a step that aborts
    /// the run.
    async fn run_step(&self, step: &dyn InstallStep, ctx: &StepContext) -> Result<StepState, StepState> {
        let name = step.name();

        match step.precheck(ctx).await {
            Precheck::Satisfied(message) => {
                debug!(step = %name, "Precheck satisfied");
                self.reporter.success(&message);
                return Ok(StepState::AlreadySatisfied);
            }
            Precheck::SatisfiedWithWarning(message) => {
                self.reporter.warn(&message);
                return Ok(StepState::AlreadySatisfied);
            }
            Precheck::Needed(message) => {
                self.reporter.info(&message);
            }
        }

        let confirmation = step.confirmation();
        let answer = match &confirmation {
            Some(c) if policy::needs_answer(Some(c), self.mode) => {
                self.prompter.confirm(&c.question, c.default).await
            }
            _ => None,
        };
        if policy::decide_run(confirmation.as_ref(), self.mode, answer) == Decision::Skip {
            self.reporter.warn(&format!("Skipped: {}", name));
            return match policy::decide_after_skip(step.required()) {
                Decision::Abort => {
                    self.reporter.error(&format!("{} is required", name));
                    Err(StepState::Skipped)
                }
                _ => Ok(StepState::Skipped),
            };
        }

        match step.run(ctx).await {
            Ok(()) => {
                info!(step = %name, "Step succeeded");
                self.reporter.success(&format!("Completed: {}", name));
                Ok(StepState::Succeeded)
            }
            Err(e) => {
                error!(step = %name, error = %e, "Step failed");
                self.reporter.error(&format!("{} failed: {}", name, e));

                let answer = match self.mode {
                    Mode::Interactive => self.prompter.confirm("Continue anyway?", true).await,
                    Mode::Unattended => None,
                };
                match policy::decide_after_failure(self.mode, answer) {
                    Decision::Abort => Err(StepState::Failed),
                    _ => Ok(StepState::Failed),
                }
            }
        }
    }
}

fn record(step: &dyn InstallStep, state: StepState) -> StepRecord {
    StepRecord {
        name: step.name(),
        required: step.required(),
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;
    use crate::step::Confirmation;
    use aiserver_core::{
        AiServerError, AiServerResult, BufferReporter, HardwareSnapshot, HostInfo, StackRoot,
    };
    use aiserver_runtime::ScriptedRunner;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeStep {
        name: &'static str,
        required: bool,
        satisfied: bool,
        fails: bool,
        confirmation: Option<Confirmation>,
        runs: AtomicUsize,
    }

    impl FakeStep {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                required: true,
                satisfied: false,
                fails: false,
                confirmation: None,
                runs: AtomicUsize::new(0),
            }
        }

        fn optional(mut self) -> Self {
            self.required = false;
            self
        }

        fn satisfied(mut self) -> Self {
            self.satisfied = true;
            self
        }

        fn failing(mut self) -> Self {
            self.fails = true;
            self
        }

        fn confirm(mut self, default: bool) -> Self {
            self.confirmation = Some(Confirmation::new(format!("Run {}?", self.name), default));
            self
        }
    }

    #[async_trait]
    impl InstallStep for FakeStep {
        fn name(&self) -> &'static str {
            self.name
        }

        fn required(&self) -> bool {
            self.required
        }

        fn confirmation(&self) -> Option<Confirmation> {
            self.confirmation.clone()
        }

        async fn precheck(&self, _ctx: &StepContext) -> Precheck {
            if self.satisfied {
                Precheck::Satisfied(format!("{} already installed", self.name))
            } else {
                Precheck::Needed(format!("{} missing", self.name))
            }
        }

        async fn run(&self, _ctx: &StepContext) -> AiServerResult<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fails {
                Err(AiServerError::Command("boom".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn context(reporter: Arc<BufferReporter>) -> StepContext {
        StepContext {
            root: StackRoot::new("/tmp/aiserver-runner-test"),
            snapshot: HardwareSnapshot::new(HostInfo::default(), Vec::new(), false, false),
            runner: Arc::new(ScriptedRunner::new()),
            reporter,
            home: PathBuf::from("/tmp"),
            user: None,
        }
    }

    fn runner(mode: Mode, answers: Vec<bool>, reporter: Arc<BufferReporter>) -> StepRunner {
        StepRunner::new(mode, Arc::new(ScriptedPrompter::new(answers)), reporter)
    }

    fn states(report: &InstallReport) -> Vec<StepState> {
        report.records.iter().map(|r| r.state).collect()
    }

    #[tokio::test]
    async fn test_satisfied_step_never_runs() {
        let reporter = Arc::new(BufferReporter::new());
        let steps: Vec<Box<dyn InstallStep>> =
            vec![Box::new(FakeStep::new("CUDA toolkit").satisfied().confirm(true))];

        let report = runner(Mode::Unattended, vec![], reporter.clone())
            .run(&steps, &context(reporter.clone()))
            .await;

        assert_eq!(states(&report), vec![StepState::AlreadySatisfied]);
        assert_eq!(report.exit_code(), 0);
        assert!(reporter
            .lines(aiserver_core::Level::Success)
            .iter()
            .any(|l| l.contains("already installed")));
    }

    #[tokio::test]
    async fn test_unattended_failure_continues() {
        let reporter = Arc::new(BufferReporter::new());
        let steps: Vec<Box<dyn InstallStep>> = vec![
            Box::new(FakeStep::new("Docker").failing()),
            Box::new(FakeStep::new("Manifest")),
        ];

        let report = runner(Mode::Unattended, vec![], reporter.clone())
            .run(&steps, &context(reporter))
            .await;

        assert_eq!(states(&report), vec![StepState::Failed, StepState::Succeeded]);
        assert!(!report.aborted);
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_interactive_failure_can_abort() {
        let reporter = Arc::new(BufferReporter::new());
        let steps: Vec<Box<dyn InstallStep>> = vec![
            Box::new(FakeStep::new("Docker").failing()),
            Box::new(FakeStep::new("Manifest")),
        ];

        let report = runner(Mode::Interactive, vec![false], reporter.clone())
            .run(&steps, &context(reporter))
            .await;

        assert_eq!(states(&report), vec![StepState::Failed, StepState::NotReached]);
        assert!(report.aborted);
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_declining_optional_step_continues() {
        let reporter = Arc::new(BufferReporter::new());
        let cuda = FakeStep::new("CUDA toolkit").optional().confirm(true);
        let steps: Vec<Box<dyn InstallStep>> = vec![Box::new(cuda), Box::new(FakeStep::new("Docker"))];

        let report = runner(Mode::Interactive, vec![false], reporter.clone())
            .run(&steps, &context(reporter))
            .await;

        assert_eq!(states(&report), vec![StepState::Skipped, StepState::Succeeded]);
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_declining_required_step_aborts() {
        let reporter = Arc::new(BufferReporter::new());
        let steps: Vec<Box<dyn InstallStep>> = vec![
            Box::new(FakeStep::new("NVIDIA drivers").confirm(true)),
            Box::new(FakeStep::new("Docker")),
        ];

        let report = runner(Mode::Interactive, vec![false], reporter.clone())
            .run(&steps, &context(reporter))
            .await;

        assert_eq!(states(&report), vec![StepState::Skipped, StepState::NotReached]);
        assert!(report.aborted);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_ignores_optional_failures() {
        let report = InstallReport {
            records: vec![StepRecord {
                name: "Pull images",
                required: false,
                state: StepState::Failed,
            }],
            aborted: false,
        };
        assert_eq!(report.exit_code(), 0);
        assert_eq!(InstallReport::declined().exit_code(), 1);
    }
}
