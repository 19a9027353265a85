use aiserver_core::AiServerResult;
use aiserver_manifest::write_env_file_if_absent;
use async_trait::async_trait;

use crate::step::{InstallStep, Precheck, StepContext};

/// Writes `.env` with a fresh API key, once
pub struct SecretsStep;

#[async_trait]
impl InstallStep for SecretsStep {
    fn name(&self) -> &'static str {
        "Secrets file"
    }

    fn required(&self) -> bool {
        true
    }

    async fn precheck(&self, ctx: &StepContext) -> Precheck {
        if ctx.root.env_file().exists() {
            Precheck::Satisfied(".env file already exists, keeping existing secrets".to_string())
        } else {
            Precheck::Needed("Generating secrets file".to_string())
        }
    }

    async fn run(&self, ctx: &StepContext) -> AiServerResult<()> {
        let path = ctx.root.env_file();
        if write_env_file_if_absent(&path)? {
            ctx.reporter.warn(&format!(
                "Edit {} and set HF_TOKEN to use gated models",
                path.display()
            ));
        }
        Ok(())
    }
}
