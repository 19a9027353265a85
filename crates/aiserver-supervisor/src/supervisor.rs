//! Operating the installed stack

use aiserver_core::{
    AiServerError, AiServerResult, Capability, CommandOutput, CommandSpec, DeploymentConfig,
    Reporter, StackRoot,
};
use aiserver_hardware::commands;
use aiserver_manifest::compose::{INFERENCE_HEALTH_PATH, RAG_HEALTH_PATH};
use aiserver_runtime::CommandRunner;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::health::{HealthChecker, ServiceHealth, PROBE_TIMEOUT};

/// Where the two services listen on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub host: String,
    pub inference_port: u16,
    pub rag_port: u16,
}

impl ServiceEndpoints {
    /// URLs shown to the operator
    pub fn for_access(config: &DeploymentConfig) -> Self {
        Self {
            host: "localhost".to_string(),
            inference_port: config.server.inference_port,
            rag_port: config.server.rag_port,
        }
    }

    /// URLs probed from this host. A wildcard bind address is probed on
    /// loopback.
    pub fn for_probe(config: &DeploymentConfig) -> Self {
        let host = match config.server.host.trim() {
            "" | "0.0.0.0" | "::" | "[::]" => "127.0.0.1".to_string(),
            host => host.to_string(),
        };
        Self {
            host,
            inference_port: config.server.inference_port,
            rag_port: config.server.rag_port,
        }
    }

    pub fn inference_api(&self) -> String {
        format!("http://{}:{}/v1", self.host, self.inference_port)
    }

    pub fn rag_ui(&self) -> String {
        format!("http://{}:{}", self.host, self.rag_port)
    }

    pub fn inference_health(&self) -> String {
        format!("http://{}:{}{}", self.host, self.inference_port, INFERENCE_HEALTH_PATH)
    }

    pub fn rag_health(&self) -> String {
        format!("http://{}:{}{}", self.host, self.rag_port, RAG_HEALTH_PATH)
    }
}

/// Health of both services at `status` time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub inference: ServiceHealth,
    pub rag: ServiceHealth,
}

/// Drives the compose tool for an installed root
pub struct Supervisor {
    root: StackRoot,
    runner: Arc<dyn CommandRunner>,
    reporter: Arc<dyn Reporter>,
    health: HealthChecker,
}

impl Supervisor {
    pub fn new(
        root: StackRoot,
        runner: Arc<dyn CommandRunner>,
        reporter: Arc<dyn Reporter>,
    ) -> AiServerResult<Self> {
        Ok(Self {
            root,
            runner,
            reporter,
            health: HealthChecker::new(PROBE_TIMEOUT)?,
        })
    }

    fn compose(&self, args: &[&str]) -> CommandSpec {
        let mut full = vec!["compose"];
        full.extend_from_slice(args);
        CommandSpec::new("docker", full)
            .in_dir(self.root.base())
            .with_capability(Capability::Docker)
    }

    async fn run_compose(&self, spec: CommandSpec) -> AiServerResult<()> {
        debug!(command = %spec, "Running compose");
        let output = self.runner.run(&spec).await;
        if output.success() {
            Ok(())
        } else {
            Err(failure(&spec, &output))
        }
    }

    /// Bring both services up in the background
    pub async fn start(&self) -> AiServerResult<()> {
        self.root.require_installed()?;
        let config = DeploymentConfig::load_or_default(&self.root)?;

        info!(root = %self.root.base().display(), "Starting services");
        self.reporter.info("Starting services");
        self.run_compose(self.compose(&["--env-file", ".env", "up", "-d"]).streaming())
            .await?;

        let urls = ServiceEndpoints::for_access(&config);
        self.reporter.success("Services started");
        self.reporter.block(&format!(
            "Access URLs:\n  Inference API:  {}\n  AnythingLLM UI: {}\n\n\
             The model can take several minutes to load; check with `aiserver status`.",
            urls.inference_api(),
            urls.rag_ui()
        ));
        Ok(())
    }

    /// Stop and remove both containers
    pub async fn stop(&self) -> AiServerResult<()> {
        self.root.require_installed()?;

        info!(root = %self.root.base().display(), "Stopping services");
        self.reporter.info("Stopping services");
        self.run_compose(self.compose(&["down"]).streaming()).await?;
        self.reporter.success("Services stopped");
        Ok(())
    }

    /// Container table, GPU utilization and both health probes.
    ///
    /// Only a missing installation is an error; anything unreachable is
    /// reported as such. An unreadable `config.json` falls back to the
    /// default ports.
    pub async fn status(&self) -> AiServerResult<StatusReport> {
        self.root.require_installed()?;
        let config = match DeploymentConfig::load_or_default(&self.root) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Falling back to default ports for status");
                self.reporter.warn(&format!(
                    "Could not read {} ({}); probing the default ports",
                    self.root.config_file().display(),
                    e
                ));
                DeploymentConfig::for_root(&self.root)
            }
        };

        self.reporter.block("=== Container Status ===");
        let ps = self.runner.run(&self.compose(&["ps"])).await;
        if ps.success() {
            self.reporter.block(ps.stdout.trim_end());
        } else {
            self.reporter.warn("Could not list containers");
        }

        self.reporter.block("=== GPU Status ===");
        let gpus = self.runner.run(&commands::gpu_utilization()).await;
        if gpus.success() {
            self.reporter.block(gpus.stdout.trim_end());
        } else {
            self.reporter.warn("nvidia-smi not available");
        }

        self.reporter.block("=== Service Health ===");
        let endpoints = ServiceEndpoints::for_probe(&config);
        let report = StatusReport {
            inference: self.health.check(&endpoints.inference_health()).await,
            rag: self.health.check(&endpoints.rag_health()).await,
        };
        self.report_health("vLLM", report.inference);
        self.report_health("AnythingLLM", report.rag);
        Ok(report)
    }

    fn report_health(&self, service: &str, health: ServiceHealth) {
        let line = format!("{}: {}", service, health);
        match health {
            ServiceHealth::Running => self.reporter.success(&line),
            ServiceHealth::NotResponding => self.reporter.warn(&line),
        }
    }

    /// Follow the logs of the given services, or all of them
    pub async fn logs(&self, services: &[String]) -> AiServerResult<()> {
        self.root.require_installed()?;

        let mut args = vec!["logs", "-f"];
        args.extend(services.iter().map(String::as_str));
        self.run_compose(self.compose(&args).streaming()).await
    }
}

fn failure(spec: &CommandSpec, output: &CommandOutput) -> AiServerError {
    let reason = match (output.timed_out, output.code) {
        (true, _) => "timed out".to_string(),
        (false, Some(code)) => format!("exit code {}", code),
        (false, None) => "could not be started".to_string(),
    };
    AiServerError::Supervisor(format!("`{}` failed: {}", spec, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiserver_core::BufferReporter;
    use aiserver_runtime::ScriptedRunner;
    use tempfile::TempDir;

    fn installed_root(inference_port: u16, rag_port: u16) -> (TempDir, StackRoot) {
        let dir = TempDir::new().unwrap();
        let root = StackRoot::new(dir.path());
        let mut config = DeploymentConfig::for_root(&root);
        config.server.inference_port = inference_port;
        config.server.rag_port = rag_port;
        config.save(&root.config_file()).unwrap();
        (dir, root)
    }

    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_missing_root_is_not_installed() {
        let dir = TempDir::new().unwrap();
        let root = StackRoot::new(dir.path().join("absent"));
        let runner = Arc::new(ScriptedRunner::succeeding());
        let supervisor =
            Supervisor::new(root, runner.clone(), Arc::new(BufferReporter::new())).unwrap();

        assert!(matches!(supervisor.start().await, Err(AiServerError::NotInstalled(_))));
        assert!(matches!(supervisor.stop().await, Err(AiServerError::NotInstalled(_))));
        assert!(matches!(supervisor.status().await, Err(AiServerError::NotInstalled(_))));
        assert!(matches!(supervisor.logs(&[]).await, Err(AiServerError::NotInstalled(_))));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_start_runs_compose_in_root() {
        let (_dir, root) = installed_root(18000, 13001);
        let runner = Arc::new(ScriptedRunner::succeeding());
        let reporter = Arc::new(BufferReporter::new());
        let supervisor = Supervisor::new(root.clone(), runner.clone(), reporter.clone()).unwrap();

        supervisor.start().await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].display(), "docker compose --env-file .env up -d");
        assert_eq!(calls[0].cwd.as_deref(), Some(root.base()));
        assert!(reporter.contains("http://localhost:18000/v1"));
        assert!(reporter.contains("http://localhost:13001"));
    }

    #[tokio::test]
    async fn test_stop_failure_is_reported() {
        let (_dir, root) = installed_root(8000, 3001);
        let runner = Arc::new(ScriptedRunner::new().respond("docker compose down", CommandOutput::failed(1)));
        let supervisor = Supervisor::new(root, runner, Arc::new(BufferReporter::new())).unwrap();

        let err = supervisor.stop().await.unwrap_err();
        assert!(err.to_string().contains("exit code 1"));
    }

    #[tokio::test]
    async fn test_status_probes_both_services() {
        let mut server = mockito::Server::new_async().await;
        let _health = server.mock("GET", "/health").with_status(200).create();
        let (_dir, root) = installed_root(server.socket_address().port(), closed_port());

        let runner = Arc::new(
            ScriptedRunner::new().respond("docker compose ps", CommandOutput::ok("NAME  STATUS\n")),
        );
        let reporter = Arc::new(BufferReporter::new());
        let supervisor = Supervisor::new(root, runner, reporter.clone()).unwrap();

        let report = supervisor.status().await.unwrap();
        assert_eq!(report.inference, ServiceHealth::Running);
        assert_eq!(report.rag, ServiceHealth::NotResponding);
        assert!(reporter.contains("vLLM: Running"));
        assert!(reporter.contains("AnythingLLM: Not responding"));
        assert!(reporter.contains("nvidia-smi not available"));
    }

    #[tokio::test]
    async fn test_status_succeeds_when_nothing_answers() {
        let (_dir, root) = installed_root(closed_port(), closed_port());
        let supervisor = Supervisor::new(
            root,
            Arc::new(ScriptedRunner::new()),
            Arc::new(BufferReporter::new()),
        )
        .unwrap();

        let report = supervisor.status().await.unwrap();
        assert_eq!(report.inference, ServiceHealth::NotResponding);
        assert_eq!(report.rag, ServiceHealth::NotResponding);
    }

    #[tokio::test]
    async fn test_status_with_unreadable_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let root = StackRoot::new(dir.path());
        std::fs::write(root.config_file(), "{ not json").unwrap();
        let runner = Arc::new(
            ScriptedRunner::new().respond("docker compose ps", CommandOutput::ok("NAME  STATUS\n")),
        );
        let reporter = Arc::new(BufferReporter::new());
        let supervisor = Supervisor::new(root, runner.clone(), reporter.clone()).unwrap();

        assert!(supervisor.status().await.is_ok());
        assert!(reporter.contains("probing the default ports"));
        assert!(reporter.contains("=== Service Health ==="));
        assert!(runner.invoked("docker compose ps"));
    }

    #[tokio::test]
    async fn test_logs_follow_selected_services() {
        let (_dir, root) = installed_root(8000, 3001);
        let runner = Arc::new(ScriptedRunner::succeeding());
        let supervisor =
            Supervisor::new(root, runner.clone(), Arc::new(BufferReporter::new())).unwrap();

        supervisor.logs(&["vllm".to_string()]).await.unwrap();
        assert_eq!(runner.command_lines(), vec!["docker compose logs -f vllm"]);
    }

    #[test]
    fn test_probe_host_for_wildcard_bind() {
        let root = StackRoot::new("/srv/ai");
        let mut config = DeploymentConfig::for_root(&root);
        assert_eq!(ServiceEndpoints::for_probe(&config).host, "127.0.0.1");
        config.server.host = "10.0.0.5".to_string();
        assert_eq!(
            ServiceEndpoints::for_probe(&config).inference_health(),
            "http://10.0.0.5:8000/health"
        );
    }
}
