use aiserver_core::{clamp_tensor_parallel, AiServerResult, DeploymentConfig};
use aiserver_manifest::render_manifest;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::step::{InstallStep, Precheck, StepContext};

/// Renders the compose manifest from the persisted config
pub struct ManifestStep;

#[async_trait]
impl InstallStep for ManifestStep {
    fn name(&self) -> &'static str {
        "Docker Compose manifest"
    }

    fn required(&self) -> bool {
        true
    }

    async fn precheck(&self, ctx: &StepContext) -> Precheck {
        let config = match DeploymentConfig::load(&ctx.root) {
            Ok(config) => config,
            Err(e) => return Precheck::Needed(e.to_string()),
        };
        let rendered = match render_manifest(&config, &ctx.snapshot) {
            Ok(rendered) => rendered,
            Err(e) => return Precheck::Needed(e.to_string()),
        };
        match std::fs::read_to_string(ctx.root.compose_file()) {
            Ok(existing) if existing == rendered => {
                Precheck::Satisfied("Docker Compose manifest up to date".to_string())
            }
            Ok(_) => Precheck::Needed("Docker Compose manifest out of date".to_string()),
            Err(_) => Precheck::Needed("Generating Docker Compose manifest".to_string()),
        }
    }

    async fn run(&self, ctx: &StepContext) -> AiServerResult<()> {
        let config = DeploymentConfig::load(&ctx.root)?;
        config.validate()?;

        let gpus = ctx.snapshot.gpu_count();
        let tensor_parallel = clamp_tensor_parallel(config.inference.tensor_parallel_size, gpus);
        if tensor_parallel != config.inference.tensor_parallel_size {
            debug!(
                configured = config.inference.tensor_parallel_size,
                effective = tensor_parallel,
                "Clamped tensor parallelism to the GPU count"
            );
        }

        let path = ctx.root.compose_file();
        std::fs::write(&path, render_manifest(&config, &ctx.snapshot)?)?;
        info!(path = %path.display(), model = %config.inference.model, "Wrote manifest");

        if gpus == 0 {
            ctx.reporter
                .warn("No GPU detected; the inference service needs GPU access to start");
        }
        Ok(())
    }
}
