use aiserver_core::{AiServerResult, Capability, CommandSpec};
use aiserver_hardware::commands;
use async_trait::async_trait;

use crate::step::{Confirmation, InstallStep, Precheck, StepContext};

const INSTALL_SCRIPT_URL: &str = "https://get.docker.com";

/// Installs the Docker engine with the upstream convenience script
pub struct DockerStep;

#[async_trait]
impl InstallStep for DockerStep {
    fn name(&self) -> &'static str {
        "Docker"
    }

    fn required(&self) -> bool {
        true
    }

    fn confirmation(&self) -> Option<Confirmation> {
        Some(Confirmation::new("Docker not found. Install it?", true))
    }

    async fn precheck(&self, ctx: &StepContext) -> Precheck {
        if ctx.runner.run(&commands::docker_version()).await.success() {
            Precheck::Satisfied("Docker already installed".to_string())
        } else {
            Precheck::Needed("Docker not found".to_string())
        }
    }

    async fn run(&self, ctx: &StepContext) -> AiServerResult<()> {
        let script = std::env::temp_dir().join("get-docker.sh");
        let script = script.to_string_lossy().into_owned();

        ctx.run_all(&[
            CommandSpec::new("curl", ["-fsSL", INSTALL_SCRIPT_URL, "-o", script.as_str()])
                .with_capability(Capability::Network),
            CommandSpec::new("sh", [script.as_str()])
                .with_capability(Capability::Root)
                .streaming(),
        ])
        .await?;

        match &ctx.user {
            Some(user) => {
                let added = ctx
                    .run_best_effort(&[CommandSpec::new("usermod", ["-aG", "docker", user.as_str()])
                        .with_capability(Capability::Root)])
                    .await
                    == 0;
                if added {
                    ctx.reporter.warn(&format!(
                        "Added {} to the docker group; log out and back in for it to apply",
                        user
                    ));
                }
            }
            None => ctx
                .reporter
                .warn("Could not determine the current user; add it to the docker group manually"),
        }
        Ok(())
    }
}
