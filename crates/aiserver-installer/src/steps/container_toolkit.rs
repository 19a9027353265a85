use aiserver_core::{AiServerError, AiServerResult, Capability, CommandSpec};
use aiserver_hardware::commands;
use async_trait::async_trait;

use crate::step::{Confirmation, InstallStep, Precheck, StepContext};

const KEYRING_PATH: &str = "/usr/share/keyrings/nvidia-container-toolkit-keyring.gpg";

/// Installs and wires the NVIDIA container runtime into Docker
pub struct ContainerToolkitStep;

fn install_commands() -> Vec<CommandSpec> {
    let keyring = format!(
        "curl -fsSL https://nvidia.github.io/libnvidia-container/gpgkey | gpg --dearmor --yes -o {}",
        KEYRING_PATH
    );
    let sources = format!(
        "curl -s -L https://nvidia.github.io/libnvidia-container/stable/deb/nvidia-container-toolkit.list \
         | sed 's#deb https://#deb [signed-by={}] https://#g' \
         > /etc/apt/sources.list.d/nvidia-container-toolkit.list",
        KEYRING_PATH
    );

    vec![
        CommandSpec::shell(&keyring),
        CommandSpec::shell(&sources),
        CommandSpec::new("apt-get", ["update"]).streaming(),
        CommandSpec::new("apt-get", ["install", "-y", "nvidia-container-toolkit"]).streaming(),
        CommandSpec::new("nvidia-ctk", ["runtime", "configure", "--runtime=docker"]),
        CommandSpec::new("systemctl", ["restart", "docker"]),
    ]
    .into_iter()
    .map(|c| c.with_capability(Capability::Root))
    .collect()
}

#[async_trait]
impl InstallStep for ContainerToolkitStep {
    fn name(&self) -> &'static str {
        "NVIDIA Container Toolkit"
    }

    fn required(&self) -> bool {
        true
    }

    fn confirmation(&self) -> Option<Confirmation> {
        Some(Confirmation::new(
            "NVIDIA Container Toolkit not configured. Install it?",
            true,
        ))
    }

    async fn precheck(&self, ctx: &StepContext) -> Precheck {
        if ctx.runner.run(&commands::gpu_container_test()).await.success() {
            Precheck::Satisfied("NVIDIA Container Toolkit already working".to_string())
        } else {
            Precheck::Needed("GPU containers are not functional".to_string())
        }
    }

    async fn run(&self, ctx: &StepContext) -> AiServerResult<()> {
        ctx.run_best_effort(&install_commands()).await;

        if ctx.runner.run(&commands::gpu_container_test()).await.success() {
            Ok(())
        } else {
            Err(AiServerError::Install(
                "GPU containers still not functional after configuring the toolkit".to_string(),
            ))
        }
    }
}
