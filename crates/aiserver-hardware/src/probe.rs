//! Hardware prober
//!
//! Every detection is independent: a missing tool or file degrades only its
//! own field to a sentinel, and [`HardwareProber::probe`] itself cannot fail.

use aiserver_core::{GpuDescriptor, HardwareSnapshot, HostInfo, UNKNOWN};
use aiserver_runtime::CommandRunner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::commands;
use crate::parse;

/// Prober configuration
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Root that `etc/os-release` and `proc/*` are read relative to
    pub fs_root: PathBuf,
    /// Run the GPU container functional test when Docker is present
    pub container_test: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            fs_root: PathBuf::from("/"),
            container_test: true,
        }
    }
}

/// Builds hardware snapshots from kernel interfaces and vendor tools
pub struct HardwareProber {
    runner: Arc<dyn CommandRunner>,
    config: ProbeConfig,
}

impl HardwareProber {
    /// Create a new prober
    pub fn new(runner: Arc<dyn CommandRunner>, config: ProbeConfig) -> Self {
        Self { runner, config }
    }

    /// Take a fresh snapshot of the host
    pub async fn probe(&self) -> HardwareSnapshot {
        let host = self.host_info();
        let gpus = self.detect_gpus().await;
        let docker_available = self.runner.run(&commands::docker_version()).await.success();
        let nvidia_docker_available = docker_available && self.gpu_passthrough_works().await;

        info!(
            gpus = gpus.len(),
            docker = docker_available,
            nvidia_docker = nvidia_docker_available,
            wsl = host.wsl,
            "Hardware probe complete"
        );

        HardwareSnapshot::new(host, gpus, docker_available, nvidia_docker_available)
    }

    /// OS, CPU, memory and kernel facts
    pub fn host_info(&self) -> HostInfo {
        let mut host = HostInfo::default();

        if let Some(content) = self.read("etc/os-release") {
            let (name, version) = parse::parse_os_release(&content);
            host.os_name = name.unwrap_or_else(|| UNKNOWN.to_string());
            host.os_version = version.unwrap_or_else(|| UNKNOWN.to_string());
        }

        if let Some(model) = self
            .read("proc/cpuinfo")
            .and_then(|c| parse::parse_cpu_model(&c))
        {
            host.cpu_model = model;
        }
        host.cpu_cores = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(0);

        if let Some(content) = self.read("proc/meminfo") {
            let (total, available) = parse::parse_meminfo(&content);
            host.ram_total_gb = total;
            host.ram_available_gb = available;
        }

        host.wsl = self.is_wsl();
        host
    }

    /// Whether the kernel is a virtualized Linux-on-Windows kernel
    pub fn is_wsl(&self) -> bool {
        self.read("proc/version")
            .map(|v| parse::is_wsl_kernel(&v))
            .unwrap_or(false)
    }

    /// Enumerate NVIDIA GPUs. A failing inventory query is the "no GPU" case.
    pub async fn detect_gpus(&self) -> Vec<GpuDescriptor> {
        let inventory = self.runner.run(&commands::gpu_inventory()).await;
        if !inventory.success() {
            debug!(code = ?inventory.code, "GPU inventory query failed, assuming no GPUs");
            return Vec::new();
        }

        let cuda_version = self.cuda_version().await;
        let mut gpus = Vec::new();

        for gpu in parse::parse_gpu_rows(&inventory.stdout) {
            let cap = self
                .runner
                .run(&commands::compute_capability(gpu.index))
                .await;
            let compute_capability = match cap.stdout.trim() {
                value if cap.success() && !value.is_empty() => value.to_string(),
                _ => UNKNOWN.to_string(),
            };

            gpus.push(
                gpu.with_cuda_version(cuda_version.clone())
                    .with_compute_capability(compute_capability),
            );
        }

        gpus
    }

    /// CUDA toolkit release, or "Unknown"
    pub async fn cuda_version(&self) -> String {
        let output = self.runner.run(&commands::nvcc_version()).await;
        if !output.success() {
            return UNKNOWN.to_string();
        }
        parse::parse_nvcc_release(&output.stdout).unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// Functional test: the GPU status tool must run inside a GPU container
    pub async fn gpu_passthrough_works(&self) -> bool {
        if !self.config.container_test {
            return false;
        }
        self.runner
            .run(&commands::gpu_container_test())
            .await
            .success()
    }

    fn read(&self, relative: &str) -> Option<String> {
        let path: PathBuf = self.config.fs_root.join(Path::new(relative));
        std::fs::read_to_string(&path)
            .map_err(|e| debug!(path = %path.display(), error = %e, "Could not read"))
            .ok()
    }
}
