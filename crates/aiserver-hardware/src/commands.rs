//! Vendor tool queries shared by the prober and the installer prechecks

use aiserver_core::{Capability, CommandSpec};
use std::time::Duration;

/// Upper bound for a single hardware query
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(15);

/// Upper bound for the GPU container test, which may pull its image first
pub const CONTAINER_TEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Minimal CUDA image used to verify GPU passthrough
pub const CUDA_TEST_IMAGE: &str = "nvidia/cuda:12.4.1-base-ubuntu22.04";

/// Plain `nvidia-smi`: exits zero when the driver is loaded
pub fn gpu_status() -> CommandSpec {
    CommandSpec::new("nvidia-smi", Vec::<String>::new())
        .with_capability(Capability::Gpu)
        .with_timeout(QUERY_TIMEOUT)
}

/// One structured row per device
pub fn gpu_inventory() -> CommandSpec {
    CommandSpec::new(
        "nvidia-smi",
        [
            "--query-gpu=index,name,memory.total,memory.free,driver_version",
            "--format=csv,noheader,nounits",
        ],
    )
    .with_capability(Capability::Gpu)
    .with_timeout(QUERY_TIMEOUT)
}

/// Compute capability of a single device
pub fn compute_capability(index: u32) -> CommandSpec {
    CommandSpec::new(
        "nvidia-smi",
        [
            "--query-gpu=compute_cap".to_string(),
            "--format=csv,noheader".to_string(),
            "-i".to_string(),
            index.to_string(),
        ],
    )
    .with_capability(Capability::Gpu)
    .with_timeout(QUERY_TIMEOUT)
}

/// Utilization table shown by `status`
pub fn gpu_utilization() -> CommandSpec {
    CommandSpec::new(
        "nvidia-smi",
        [
            "--query-gpu=index,name,utilization.gpu,memory.used,memory.total",
            "--format=csv",
        ],
    )
    .with_capability(Capability::Gpu)
    .with_timeout(QUERY_TIMEOUT)
}

/// CUDA compiler version banner
pub fn nvcc_version() -> CommandSpec {
    CommandSpec::new("nvcc", ["--version"]).with_timeout(QUERY_TIMEOUT)
}

/// Container engine presence
pub fn docker_version() -> CommandSpec {
    CommandSpec::new("docker", ["--version"])
        .with_capability(Capability::Docker)
        .with_timeout(QUERY_TIMEOUT)
}

/// Functional GPU passthrough test: run the status tool inside a GPU container
pub fn gpu_container_test() -> CommandSpec {
    CommandSpec::new(
        "docker",
        ["run", "--rm", "--gpus", "all", CUDA_TEST_IMAGE, "nvidia-smi"],
    )
    .with_capability(Capability::Docker)
    .with_timeout(CONTAINER_TEST_TIMEOUT)
}
