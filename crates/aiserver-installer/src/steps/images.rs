use aiserver_core::{AiServerResult, Capability, CommandSpec, DeploymentConfig};
use aiserver_manifest::ComposeFile;
use async_trait::async_trait;

use crate::step::{Confirmation, InstallStep, Precheck, StepContext};

/// Pre-fetches the service images
pub struct PullImagesStep;

#[async_trait]
impl InstallStep for PullImagesStep {
    fn name(&self) -> &'static str {
        "Pull images"
    }

    fn required(&self) -> bool {
        false
    }

    fn confirmation(&self) -> Option<Confirmation> {
        Some(Confirmation::new(
            "Pull Docker images now? (this may take a while)",
            true,
        ))
    }

    async fn precheck(&self, _ctx: &StepContext) -> Precheck {
        Precheck::Needed("Fetching service images".to_string())
    }

    async fn run(&self, ctx: &StepContext) -> AiServerResult<()> {
        let config = DeploymentConfig::load_or_default(&ctx.root)?;
        let compose = ComposeFile::build(&config, &ctx.snapshot);
        let pulls: Vec<CommandSpec> = compose
            .images()
            .into_iter()
            .map(|image| {
                CommandSpec::new("docker", ["pull", image])
                    .with_capability(Capability::Docker)
                    .streaming()
            })
            .collect();

        let failed = ctx.run_best_effort(&pulls).await;
        if failed > 0 {
            ctx.reporter.warn(&format!(
                "{} image(s) failed to pull; they will be fetched on first start",
                failed
            ));
        }
        Ok(())
    }
}
