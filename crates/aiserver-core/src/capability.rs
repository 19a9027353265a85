//! Capability evaluation: advisory model recommendation from a hardware snapshot

use serde::Serialize;

use crate::{preferred_model, HardwareSnapshot, ModelClass, ModelInfo};

/// Combined VRAM (MB) a multi-GPU host needs for a 70B-class quantized model
pub const MULTI_GPU_70B_VRAM_MB: u64 = 45_000;
/// Combined VRAM (MB) a multi-GPU host needs for a 32B-class model
pub const MULTI_GPU_32B_VRAM_MB: u64 = 24_000;
/// VRAM (MB) a single GPU needs for a 32B-class model
pub const SINGLE_GPU_32B_VRAM_MB: u64 = 30_000;
/// VRAM (MB) a single GPU needs for a 14B-class model
pub const SINGLE_GPU_14B_VRAM_MB: u64 = 20_000;

/// Remediation hints emitted alongside the recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Hint {
    NoAccelerator,
    InstallDocker,
    ConfigureGpuRuntime,
}

impl Hint {
    pub fn message(&self) -> &'static str {
        match self {
            Hint::NoAccelerator => "No accelerator detected - the inference service needs an NVIDIA GPU",
            Hint::InstallDocker => "Docker not installed - required for deployment",
            Hint::ConfigureGpuRuntime => {
                "NVIDIA Container Toolkit not configured - required for GPU access in containers"
            }
        }
    }
}

/// Advisory output of [`recommend`]. Never blocks installation.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    /// Recommended model class, `None` when no accelerator was detected
    pub class: Option<ModelClass>,
    /// Catalog model suggested for the class
    pub model: Option<&'static ModelInfo>,
    pub tensor_parallel: u32,
    /// One-line reasoning shown to the user
    pub summary: &'static str,
    pub hints: Vec<Hint>,
}

impl Recommendation {
    pub fn no_accelerator(&self) -> bool {
        self.class.is_none()
    }
}

/// Derive a recommendation from a snapshot. Rules are evaluated in priority
/// order and the first match wins.
pub fn recommend(snapshot: &HardwareSnapshot) -> Recommendation {
    let gpu_count = snapshot.gpu_count();
    let total_vram = snapshot.total_vram_mb();

    let (class, tensor_parallel, summary) = match gpu_count {
        0 => (None, 1, "No NVIDIA GPUs detected - no model can be served"),
        1 => {
            let vram = snapshot.gpus[0].memory_total_mb;
            if vram >= SINGLE_GPU_32B_VRAM_MB {
                (Some(ModelClass::B32), 1, "Single large GPU - excellent for 32B models")
            } else if vram >= SINGLE_GPU_14B_VRAM_MB {
                (Some(ModelClass::B14), 1, "Single GPU with good VRAM")
            } else {
                (Some(ModelClass::B8), 1, "Limited VRAM - recommend a smaller model")
            }
        }
        n => {
            if total_vram >= MULTI_GPU_70B_VRAM_MB {
                (
                    Some(ModelClass::B70),
                    n,
                    "Sufficient VRAM for a 70B model (4-bit quantized)",
                )
            } else if total_vram >= MULTI_GPU_32B_VRAM_MB {
                (
                    Some(ModelClass::B32),
                    n,
                    "Limited VRAM - recommend a 32B or smaller model",
                )
            } else {
                (
                    Some(ModelClass::B14),
                    n,
                    "Low combined VRAM - recommend a 14B or smaller model",
                )
            }
        }
    };

    let mut hints = Vec::new();
    if class.is_none() {
        hints.push(Hint::NoAccelerator);
    }
    if !snapshot.docker_available {
        hints.push(Hint::InstallDocker);
    } else if !snapshot.nvidia_docker_available {
        hints.push(Hint::ConfigureGpuRuntime);
    }

    Recommendation {
        class,
        model: class.and_then(preferred_model),
        tensor_parallel,
        summary,
        hints,
    }
}

/// Tensor-parallel degree actually rendered into the manifest.
///
/// Over-provisioned values are clamped to the detected GPU count; with no
/// GPUs the result is 1.
pub fn clamp_tensor_parallel(configured: u32, gpu_count: u32) -> u32 {
    if gpu_count == 0 {
        1
    } else {
        configured.clamp(1, gpu_count)
    }
}
