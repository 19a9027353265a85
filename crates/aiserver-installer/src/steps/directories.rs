use aiserver_core::{AiServerResult, DeploymentConfig, StackRoot};
use async_trait::async_trait;
use std::net::TcpListener;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::step::{InstallStep, Precheck, StepContext};

/// Creates the directory layout and the default configuration
pub struct SetupDirectoriesStep;

fn layout(root: &StackRoot, config: &DeploymentConfig) -> Vec<PathBuf> {
    vec![
        root.base().to_path_buf(),
        root.logs_dir(),
        config.paths.models_dir.clone(),
        config.paths.data_dir.clone(),
        config.paths.data_dir.join("anythingllm"),
        config.paths.data_dir.join("documents"),
    ]
}

fn port_in_use(host: &str, port: u16) -> bool {
    TcpListener::bind((host, port)).is_err()
}

#[async_trait]
impl InstallStep for SetupDirectoriesStep {
    fn name(&self) -> &'static str {
        "Setup directories"
    }

    fn required(&self) -> bool {
        true
    }

    async fn precheck(&self, ctx: &StepContext) -> Precheck {
        if !ctx.root.config_file().exists() {
            return Precheck::Needed(format!(
                "Creating installation directory at {}",
                ctx.root.base().display()
            ));
        }
        let config = match DeploymentConfig::load(&ctx.root) {
            Ok(config) => config,
            Err(e) => return Precheck::Needed(e.to_string()),
        };
        if layout(&ctx.root, &config).iter().all(|dir| dir.is_dir()) {
            Precheck::Satisfied(format!(
                "Directories already set up at {}",
                ctx.root.base().display()
            ))
        } else {
            Precheck::Needed("Completing directory layout".to_string())
        }
    }

    async fn run(&self, ctx: &StepContext) -> AiServerResult<()> {
        std::fs::create_dir_all(ctx.root.base())?;
        let (config, created) = DeploymentConfig::ensure(&ctx.root)?;
        if created {
            ctx.reporter.info(&format!(
                "Wrote default configuration to {}",
                ctx.root.config_file().display()
            ));
        }

        for dir in layout(&ctx.root, &config) {
            std::fs::create_dir_all(&dir)?;
        }
        info!(root = %ctx.root.base().display(), "Directory layout ready");

        for (service, port) in [
            ("inference", config.server.inference_port),
            ("RAG", config.server.rag_port),
        ] {
            if port_in_use(&config.server.host, port) {
                warn!(port = port, service = service, "Port already bound");
                ctx.reporter.warn(&format!(
                    "Port {} is already in use; the {} service may fail to start",
                    port, service
                ));
            }
        }
        Ok(())
    }
}
