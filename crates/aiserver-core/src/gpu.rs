//! Hardware snapshot and GPU descriptors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel used for any identity field that could not be detected
pub const UNKNOWN: &str = "Unknown";

/// Represents one NVIDIA GPU as reported by the vendor tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuDescriptor {
    /// Device index
    pub index: u32,
    /// Device name
    pub name: String,
    /// Total memory in MB
    pub memory_total_mb: u64,
    /// Free memory in MB, never above `memory_total_mb`
    pub memory_free_mb: u64,
    /// Driver version string
    pub driver_version: String,
    /// CUDA toolkit version, or "Unknown"
    pub cuda_version: String,
    /// Compute capability (e.g. "8.9"), or "Unknown"
    pub compute_capability: String,
}

impl GpuDescriptor {
    /// Create a descriptor, clamping free memory to total memory
    pub fn new(
        index: u32,
        name: String,
        memory_total_mb: u64,
        memory_free_mb: u64,
        driver_version: String,
    ) -> Self {
        Self {
            index,
            name,
            memory_total_mb,
            memory_free_mb: memory_free_mb.min(memory_total_mb),
            driver_version,
            cuda_version: UNKNOWN.to_string(),
            compute_capability: UNKNOWN.to_string(),
        }
    }

    pub fn with_cuda_version(mut self, cuda_version: String) -> Self {
        self.cuda_version = cuda_version;
        self
    }

    pub fn with_compute_capability(mut self, compute_capability: String) -> Self {
        self.compute_capability = compute_capability;
        self
    }

    pub fn memory_total_gb(&self) -> f64 {
        self.memory_total_mb as f64 / 1024.0
    }

    pub fn memory_free_gb(&self) -> f64 {
        self.memory_free_mb as f64 / 1024.0
    }
}

/// Host identity facts gathered from OS and kernel interfaces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub os_name: String,
    pub os_version: String,
    pub cpu_model: String,
    /// Logical processor count, 0 when unavailable
    pub cpu_cores: u32,
    pub ram_total_gb: f64,
    pub ram_available_gb: f64,
    /// Running under a virtualized Linux-on-Windows kernel
    pub wsl: bool,
}

impl Default for HostInfo {
    fn default() -> Self {
        Self {
            os_name: UNKNOWN.to_string(),
            os_version: UNKNOWN.to_string(),
            cpu_model: UNKNOWN.to_string(),
            cpu_cores: 0,
            ram_total_gb: 0.0,
            ram_available_gb: 0.0,
            wsl: false,
        }
    }
}

/// Immutable point-in-time description of host capabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareSnapshot {
    #[serde(flatten)]
    pub host: HostInfo,
    /// Detected GPUs, ordered by index
    pub gpus: Vec<GpuDescriptor>,
    /// True iff at least one GPU was detected
    pub cuda_available: bool,
    /// Container engine answers a version probe
    pub docker_available: bool,
    /// A GPU-enabled container actually ran the GPU status tool
    pub nvidia_docker_available: bool,
    pub detected_at: DateTime<Utc>,
}

impl HardwareSnapshot {
    /// Assemble a snapshot. GPUs are sorted by index and `cuda_available` is
    /// derived from the GPU list.
    pub fn new(
        host: HostInfo,
        mut gpus: Vec<GpuDescriptor>,
        docker_available: bool,
        nvidia_docker_available: bool,
    ) -> Self {
        gpus.sort_by_key(|g| g.index);
        gpus.dedup_by_key(|g| g.index);
        let cuda_available = !gpus.is_empty();

        Self {
            host,
            gpus,
            cuda_available,
            docker_available,
            nvidia_docker_available,
            detected_at: Utc::now(),
        }
    }

    /// Number of detected GPUs
    pub fn gpu_count(&self) -> u32 {
        self.gpus.len() as u32
    }

    /// Combined total VRAM across all GPUs, in MB
    pub fn total_vram_mb(&self) -> u64 {
        self.gpus.iter().map(|g| g.memory_total_mb).sum()
    }

    pub fn total_vram_gb(&self) -> f64 {
        self.total_vram_mb() as f64 / 1024.0
    }
}
