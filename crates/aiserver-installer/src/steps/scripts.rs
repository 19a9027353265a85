use aiserver_core::{AiServerResult, DeploymentConfig};
use aiserver_manifest::{scripts_up_to_date, write_scripts};
use async_trait::async_trait;

use crate::step::{InstallStep, Precheck, StepContext};

/// Writes start.sh, stop.sh, status.sh and logs.sh
pub struct ManagementScriptsStep;

#[async_trait]
impl InstallStep for ManagementScriptsStep {
    fn name(&self) -> &'static str {
        "Management scripts"
    }

    fn required(&self) -> bool {
        false
    }

    async fn precheck(&self, ctx: &StepContext) -> Precheck {
        match DeploymentConfig::load(&ctx.root) {
            Ok(config) if scripts_up_to_date(&ctx.root, &config) => {
                Precheck::Satisfied("Management scripts up to date".to_string())
            }
            Ok(_) => Precheck::Needed("Writing management scripts".to_string()),
            Err(e) => Precheck::Needed(e.to_string()),
        }
    }

    async fn run(&self, ctx: &StepContext) -> AiServerResult<()> {
        let config = DeploymentConfig::load(&ctx.root)?;
        write_scripts(&ctx.root, &config)
    }
}
