//! End-to-end install runs against a temporary root with scripted commands

use aiserver_core::{BufferReporter, CommandOutput, Level, StackRoot};
use aiserver_hardware::ProbeConfig;
use aiserver_installer::{Installer, Mode, ScriptedPrompter, StepState};
use aiserver_runtime::ScriptedRunner;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

struct Host {
    fs: TempDir,
    home: TempDir,
    root: TempDir,
}

impl Host {
    fn new() -> Self {
        let fs = TempDir::new().unwrap();
        std::fs::create_dir_all(fs.path().join("etc")).unwrap();
        std::fs::create_dir_all(fs.path().join("proc")).unwrap();
        std::fs::write(
            fs.path().join("etc/os-release"),
            "NAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\n",
        )
        .unwrap();
        std::fs::write(
            fs.path().join("proc/meminfo"),
            "MemTotal:       65536000 kB\nMemAvailable:   32768000 kB\n",
        )
        .unwrap();
        std::fs::write(fs.path().join("proc/version"), "Linux version 6.5.0-generic\n").unwrap();

        Self {
            fs,
            home: TempDir::new().unwrap(),
            root: TempDir::new().unwrap(),
        }
    }

    fn stack_root(&self) -> StackRoot {
        StackRoot::new(self.root.path().join("local-ai-server"))
    }

    fn installer(
        &self,
        runner: Arc<ScriptedRunner>,
        prompter: ScriptedPrompter,
        reporter: Arc<BufferReporter>,
        mode: Mode,
    ) -> Installer {
        let probe = ProbeConfig {
            fs_root: self.fs.path().to_path_buf(),
            container_test: true,
        };
        Installer::new(
            self.stack_root(),
            runner,
            probe,
            Arc::new(prompter),
            reporter,
            mode,
        )
        .with_home(self.home.path())
        .with_user(Some("operator".to_string()))
    }
}

/// A host where every tool is already installed and working
fn provisioned_host() -> ScriptedRunner {
    ScriptedRunner::new()
        .respond("nvidia-smi", CommandOutput::ok(""))
        .respond(
            "nvidia-smi --query-gpu=index,name,memory.total",
            CommandOutput::ok(
                "0, NVIDIA GeForce RTX 4090, 24564, 24000, 550.54\n\
                 1, NVIDIA GeForce RTX 4090, 24564, 24000, 550.54\n",
            ),
        )
        .respond("nvidia-smi --query-gpu=compute_cap", CommandOutput::ok("8.9\n"))
        .respond(
            "nvcc --version",
            CommandOutput::ok("Cuda compilation tools, release 12.4, V12.4.131\n"),
        )
        .respond("docker --version", CommandOutput::ok("Docker version 27.1.1\n"))
        .respond("docker run --rm --gpus all", CommandOutput::ok(""))
        .respond("docker pull", CommandOutput::ok(""))
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn test_second_install_changes_nothing() {
    let host = Host::new();
    let root = host.stack_root();

    let first = host
        .installer(
            Arc::new(provisioned_host()),
            ScriptedPrompter::default(),
            Arc::new(BufferReporter::new()),
            Mode::Unattended,
        )
        .run()
        .await;
    assert_eq!(first.exit_code(), 0);

    let manifest = read(&root.compose_file());
    let env = read(&root.env_file());
    let config = read(&root.config_file());
    assert!(manifest.contains("--tensor-parallel-size"));
    assert!(env.contains("VLLM_API_KEY="));

    let second = host
        .installer(
            Arc::new(provisioned_host()),
            ScriptedPrompter::default(),
            Arc::new(BufferReporter::new()),
            Mode::Unattended,
        )
        .run()
        .await;
    assert_eq!(second.exit_code(), 0);

    assert_eq!(read(&root.compose_file()), manifest);
    assert_eq!(read(&root.env_file()), env);
    assert_eq!(read(&root.config_file()), config);
    for step in [
        "Setup directories",
        "Docker Compose manifest",
        "Secrets file",
        "Management scripts",
    ] {
        assert_eq!(second.state_of(step), Some(StepState::AlreadySatisfied), "{}", step);
    }
}

#[tokio::test]
async fn test_installed_cuda_is_not_reinstalled() {
    let host = Host::new();
    let runner = Arc::new(provisioned_host());
    let reporter = Arc::new(BufferReporter::new());

    let report = host
        .installer(runner.clone(), ScriptedPrompter::default(), reporter.clone(), Mode::Unattended)
        .run()
        .await;

    assert_eq!(report.state_of("CUDA toolkit"), Some(StepState::AlreadySatisfied));
    assert!(!runner.invoked("wget"));
    assert!(!runner.invoked("apt-get"));
    assert!(!host.home.path().join(".bashrc").exists());
    assert!(reporter
        .lines(Level::Success)
        .contains(&"CUDA toolkit already installed".to_string()));
}

#[tokio::test]
async fn test_directories_precede_manifest_on_bare_host() {
    let host = Host::new();
    let root = host.stack_root();
    // Nothing is installed and no install command can run
    let runner = Arc::new(ScriptedRunner::new());

    let report = host
        .installer(runner.clone(), ScriptedPrompter::default(), Arc::new(BufferReporter::new()), Mode::Unattended)
        .run()
        .await;

    assert_eq!(report.state_of("Setup directories"), Some(StepState::Succeeded));
    assert_eq!(report.state_of("NVIDIA drivers"), Some(StepState::Failed));
    assert_eq!(report.state_of("Docker"), Some(StepState::Failed));
    assert_eq!(report.state_of("Docker Compose manifest"), Some(StepState::Succeeded));
    assert!(!report.aborted);
    assert_eq!(report.exit_code(), 1);

    assert!(root.compose_file().exists());
    assert!(root.logs_dir().is_dir());
    assert!(root.models_dir().is_dir());
    // No GPU: single-way tensor parallelism
    let manifest: serde_yaml::Value = serde_yaml::from_str(&read(&root.compose_file())).unwrap();
    let command: Vec<&str> = manifest["services"]["vllm"]["command"]
        .as_sequence()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    let flag = command
        .iter()
        .position(|c| *c == "--tensor-parallel-size")
        .unwrap();
    assert_eq!(command[flag + 1], "1");
    assert!(runner.invoked("apt-get update"));
}

#[tokio::test]
async fn test_declining_to_proceed_touches_nothing() {
    let host = Host::new();
    let root = host.stack_root();
    let runner = Arc::new(provisioned_host());
    let reporter = Arc::new(BufferReporter::new());

    let report = host
        .installer(runner.clone(), ScriptedPrompter::new([false]), reporter.clone(), Mode::Interactive)
        .run()
        .await;

    assert!(report.aborted);
    assert!(report.records.is_empty());
    assert_eq!(report.exit_code(), 1);
    assert!(!root.exists());
    assert!(reporter.contains("INSTALLATION SUMMARY"));
}

#[tokio::test]
async fn test_declining_required_step_aborts_run() {
    let host = Host::new();
    let root = host.stack_root();
    let prompter = ScriptedPrompter::new([true, false]);

    let installer = host.installer(
        Arc::new(ScriptedRunner::new()),
        prompter,
        Arc::new(BufferReporter::new()),
        Mode::Interactive,
    );
    let report = installer.run().await;

    assert!(report.aborted);
    assert_eq!(report.state_of("Setup directories"), Some(StepState::Succeeded));
    assert_eq!(report.state_of("NVIDIA drivers"), Some(StepState::Skipped));
    assert_eq!(report.state_of("Docker Compose manifest"), Some(StepState::NotReached));
    assert!(!root.compose_file().exists());
}
