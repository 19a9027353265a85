//! Closing summary of an install run

use aiserver_core::{DeploymentConfig, ManagementScript, StackRoot};
use std::fmt;

use crate::runner::{InstallReport, StepState};

const RULE: &str = "============================================================";

/// Step outcomes, access URLs and the commands to run next
struct Summary<'a> {
    root: &'a StackRoot,
    config: &'a DeploymentConfig,
    report: &'a InstallReport,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        writeln!(f, "INSTALLATION SUMMARY")?;
        writeln!(f, "{}", RULE)?;

        for record in &self.report.records {
            let marker = match record.state {
                StepState::AlreadySatisfied | StepState::Succeeded => "ok",
                StepState::Skipped => "--",
                StepState::Failed => "!!",
                StepState::NotReached => "  ",
            };
            writeln!(f, " [{}] {:<28} {}", marker, record.name, record.state)?;
        }
        if self.report.aborted {
            writeln!(f, "\nInstallation did not finish. Re-run `aiserver install` to resume.")?;
        } else if !self.report.is_success() {
            writeln!(
                f,
                "\nSome required steps did not complete. Fix them and re-run `aiserver install`."
            )?;
        }

        let server = &self.config.server;
        writeln!(f, "\nInstallation directory: {}", self.root.base().display())?;
        writeln!(f, "\nAccess URLs:")?;
        writeln!(f, "  Inference API:  http://localhost:{}/v1", server.inference_port)?;
        writeln!(f, "  AnythingLLM UI: http://localhost:{}", server.rag_port)?;

        writeln!(f, "\nNext steps:")?;
        writeln!(
            f,
            "  Start services:  aiserver start   (or {})",
            self.root.script(ManagementScript::Start).display()
        )?;
        writeln!(f, "  Check status:    aiserver status")?;
        writeln!(f, "  View logs:       aiserver logs")?;
        writeln!(f, "  Stop services:   aiserver stop")?;
        writeln!(f, "\nIf NVIDIA drivers were installed, reboot before starting the services.")?;
        write!(f, "{}", RULE)
    }
}

pub fn render_summary(root: &StackRoot, config: &DeploymentConfig, report: &InstallReport) -> String {
    Summary {
        root,
        config,
        report,
    }
    .to_string()
}
