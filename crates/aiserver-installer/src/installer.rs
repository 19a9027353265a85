//! Full installation: probe, confirm, run the plan, summarize

use aiserver_core::{DeploymentConfig, Reporter, StackRoot};
use aiserver_hardware::{HardwareProber, HardwareReport, ProbeConfig};
use aiserver_runtime::CommandRunner;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::plan::install_plan;
use crate::policy::{self, Decision, Mode};
use crate::prompt::Prompter;
use crate::runner::{InstallReport, StepRunner};
use crate::step::{Confirmation, StepContext};
use crate::summary::render_summary;

/// Drives one install run against a configuration root
pub struct Installer {
    root: StackRoot,
    runner: Arc<dyn CommandRunner>,
    prober: HardwareProber,
    prompter: Arc<dyn Prompter>,
    reporter: Arc<dyn Reporter>,
    mode: Mode,
    home: PathBuf,
    user: Option<String>,
}

impl Installer {
    pub fn new(
        root: StackRoot,
        runner: Arc<dyn CommandRunner>,
        probe_config: ProbeConfig,
        prompter: Arc<dyn Prompter>,
        reporter: Arc<dyn Reporter>,
        mode: Mode,
    ) -> Self {
        let home = aiserver_core::home_dir().unwrap_or_else(|_| root.base().to_path_buf());
        let user = std::env::var("SUDO_USER")
            .or_else(|_| std::env::var("USER"))
            .ok()
            .filter(|u| !u.is_empty());

        Self {
            root,
            prober: HardwareProber::new(runner.clone(), probe_config),
            runner,
            prompter,
            reporter,
            mode,
            home,
            user,
        }
    }

    /// Directory holding the shell profile the CUDA step edits
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = home.into();
        self
    }

    /// Account added to the docker group
    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    /// Run the whole procedure. The summary is printed whatever the outcome.
    pub async fn run(&self) -> InstallReport {
        info!(root = %self.root.base().display(), mode = ?self.mode, "Starting installation");
        self.reporter.info("Detecting hardware");
        let snapshot = self.prober.probe().await;
        self.reporter.block(&HardwareReport::new(&snapshot).to_string());

        let proceed = Confirmation::new("Proceed with installation?", true);
        let answer = if policy::needs_answer(Some(&proceed), self.mode) {
            self.prompter.confirm(&proceed.question, proceed.default).await
        } else {
            None
        };

        let report = if policy::decide_run(Some(&proceed), self.mode, answer) == Decision::Skip {
            self.reporter.warn("Installation cancelled");
            InstallReport::declined()
        } else {
            let ctx = StepContext {
                root: self.root.clone(),
                snapshot,
                runner: self.runner.clone(),
                reporter: self.reporter.clone(),
                home: self.home.clone(),
                user: self.user.clone(),
            };
            StepRunner::new(self.mode, self.prompter.clone(), self.reporter.clone())
                .run(&install_plan(), &ctx)
                .await
        };

        let config = DeploymentConfig::load_or_default(&self.root).unwrap_or_else(|e| {
            warn!(error = %e, "Could not read config for summary");
            DeploymentConfig::for_root(&self.root)
        });
        self.reporter.block(&render_summary(&self.root, &config, &report));

        if report.is_success() {
            self.reporter.success("Installation complete");
        } else {
            self.reporter.error("Installation incomplete");
        }
        report
    }
}
