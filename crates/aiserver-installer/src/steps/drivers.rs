use aiserver_core::{AiServerResult, Capability, CommandSpec};
use aiserver_hardware::commands;
use async_trait::async_trait;

use crate::step::{Confirmation, InstallStep, Precheck, StepContext};

/// Installs the NVIDIA kernel driver
pub struct NvidiaDriversStep;

fn install_commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("apt-get", ["update"]),
        CommandSpec::new("apt-get", ["install", "-y", "ubuntu-drivers-common"]),
        CommandSpec::new("ubuntu-drivers", ["autoinstall"]),
    ]
    .into_iter()
    .map(|c| c.with_capability(Capability::Root).streaming())
    .collect()
}

#[async_trait]
impl InstallStep for NvidiaDriversStep {
    fn name(&self) -> &'static str {
        "NVIDIA drivers"
    }

    fn required(&self) -> bool {
        true
    }

    fn confirmation(&self) -> Option<Confirmation> {
        Some(Confirmation::new("NVIDIA drivers not found. Install them?", true))
    }

    async fn precheck(&self, ctx: &StepContext) -> Precheck {
        let reachable = ctx.runner.run(&commands::gpu_status()).await.success();

        // Under WSL the Windows host owns the driver.
        if ctx.snapshot.host.wsl {
            return if reachable {
                Precheck::Satisfied(
                    "WSL environment detected; NVIDIA drivers are managed by Windows".to_string(),
                )
            } else {
                Precheck::SatisfiedWithWarning(
                    "WSL environment detected but nvidia-smi failed; install the NVIDIA driver on the Windows host".to_string(),
                )
            };
        }

        if reachable {
            Precheck::Satisfied("NVIDIA drivers already installed".to_string())
        } else {
            Precheck::Needed("NVIDIA drivers not found".to_string())
        }
    }

    async fn run(&self, ctx: &StepContext) -> AiServerResult<()> {
        ctx.run_all(&install_commands()).await?;
        ctx.reporter.warn("NVIDIA drivers installed. REBOOT REQUIRED!");
        Ok(())
    }
}
