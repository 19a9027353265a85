//! CLI commands implementation

mod model;

pub use model::{model_download, model_info, model_list, model_set};

use aiserver_core::{default_report_path, ConsoleReporter, Reporter, StackRoot};
use aiserver_hardware::{write_report_json, HardwareProber, HardwareReport, ProbeConfig};
use aiserver_installer::{Installer, Mode, StdinPrompter};
use aiserver_runtime::{CommandRunner, ProcessRunner, ProcessRunnerConfig};
use aiserver_supervisor::Supervisor;
use anyhow::{Context as _, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Shared state for every command
pub struct Context {
    pub root: StackRoot,
    pub runner: Arc<dyn CommandRunner>,
    pub reporter: Arc<dyn Reporter>,
}

impl Context {
    pub fn new(root: Option<PathBuf>, no_sudo: bool) -> Result<Self> {
        let root = match root {
            Some(path) if path.is_absolute() => StackRoot::new(path),
            Some(path) => StackRoot::new(
                std::env::current_dir()
                    .context("Failed to resolve the current directory")?
                    .join(path),
            ),
            None => StackRoot::default_location()?,
        };

        let runner = ProcessRunner::new(ProcessRunnerConfig {
            elevate: !no_sudo,
            ..Default::default()
        });

        Ok(Self {
            root,
            runner: Arc::new(runner),
            reporter: Arc::new(ConsoleReporter),
        })
    }

    fn prober(&self, container_test: bool) -> HardwareProber {
        HardwareProber::new(
            self.runner.clone(),
            ProbeConfig {
                container_test,
                ..Default::default()
            },
        )
    }

    fn supervisor(&self) -> Result<Supervisor> {
        Ok(Supervisor::new(
            self.root.clone(),
            self.runner.clone(),
            self.reporter.clone(),
        )?)
    }
}

/// Probe the host, print the report and save it as JSON
pub async fn detect(ctx: &Context, report: Option<PathBuf>) -> Result<i32> {
    ctx.reporter.info("Detecting hardware");
    let snapshot = ctx.prober(true).probe().await;
    ctx.reporter.block(&HardwareReport::new(&snapshot).to_string());

    // Saving the JSON copy is best effort
    let saved = match report {
        Some(path) => Ok(path),
        None => default_report_path(),
    }
    .and_then(|path| write_report_json(&snapshot, &path).map(|_| path));
    match saved {
        Ok(path) => ctx.reporter.success(&format!("Report saved to {}", path.display())),
        Err(e) => {
            warn!(error = %e, "Hardware report not saved");
            ctx.reporter.warn(&format!("Could not save the JSON report: {}", e));
        }
    }
    Ok(0)
}

/// Run the full installation
pub async fn install(ctx: &Context, auto: bool) -> Result<i32> {
    let mode = if auto { Mode::Unattended } else { Mode::Interactive };
    let installer = Installer::new(
        ctx.root.clone(),
        ctx.runner.clone(),
        ProbeConfig::default(),
        Arc::new(StdinPrompter),
        ctx.reporter.clone(),
        mode,
    );
    Ok(installer.run().await.exit_code())
}

/// Start the services
pub async fn start(ctx: &Context) -> Result<i32> {
    ctx.supervisor()?.start().await?;
    Ok(0)
}

/// Stop the services
pub async fn stop(ctx: &Context) -> Result<i32> {
    ctx.supervisor()?.stop().await?;
    Ok(0)
}

/// Show service status
pub async fn status(ctx: &Context) -> Result<i32> {
    ctx.supervisor()?.status().await?;
    Ok(0)
}

/// Follow service logs
pub async fn logs(ctx: &Context, services: &[String]) -> Result<i32> {
    ctx.supervisor()?.logs(services).await?;
    Ok(0)
}
