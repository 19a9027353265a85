//! Hardware report rendering

use aiserver_core::{recommend, AiServerResult, HardwareSnapshot, Recommendation};
use std::fmt;
use std::path::Path;
use tracing::info;

const RULE: usize = 60;

/// Formatted system report with recommendations
pub struct HardwareReport<'a> {
    snapshot: &'a HardwareSnapshot,
    recommendation: Recommendation,
}

impl<'a> HardwareReport<'a> {
    pub fn new(snapshot: &'a HardwareSnapshot) -> Self {
        Self {
            snapshot,
            recommendation: recommend(snapshot),
        }
    }
}

fn yes_no(value: bool, yes: &str, no: &str) -> String {
    if value {
        yes.to_string()
    } else {
        no.to_string()
    }
}

impl fmt::Display for HardwareReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.snapshot;
        let host = &s.host;

        writeln!(f, "{}", "=".repeat(RULE))?;
        writeln!(f, "SYSTEM DETECTION REPORT")?;
        writeln!(f, "{}", "=".repeat(RULE))?;
        writeln!(f)?;
        writeln!(f, "Operating System: {} {}", host.os_name, host.os_version)?;
        if host.wsl {
            writeln!(f, "  (WSL kernel - GPU drivers are managed by the Windows host)")?;
        }
        writeln!(f, "CPU: {} ({} cores)", host.cpu_model, host.cpu_cores)?;
        writeln!(
            f,
            "RAM: {:.1} GB available / {:.1} GB total",
            host.ram_available_gb, host.ram_total_gb
        )?;
        writeln!(f)?;
        writeln!(
            f,
            "Docker: {}",
            yes_no(s.docker_available, "Available", "Not installed")
        )?;
        writeln!(
            f,
            "NVIDIA Docker: {}",
            yes_no(s.nvidia_docker_available, "Available", "Not configured")
        )?;

        if s.gpus.is_empty() {
            writeln!(f)?;
            writeln!(f, "No NVIDIA GPUs detected")?;
        } else {
            writeln!(f)?;
            writeln!(f, "GPUs Detected: {}", s.gpu_count())?;
            writeln!(f, "Total VRAM: {:.1} GB", s.total_vram_gb())?;
            for gpu in &s.gpus {
                writeln!(f)?;
                writeln!(f, "  GPU {}: {}", gpu.index, gpu.name)?;
                writeln!(
                    f,
                    "    Memory: {:.1} GB free / {:.1} GB total",
                    gpu.memory_free_gb(),
                    gpu.memory_total_gb()
                )?;
                writeln!(f, "    Driver: {}", gpu.driver_version)?;
                writeln!(f, "    CUDA: {}", gpu.cuda_version)?;
                writeln!(f, "    Compute Capability: {}", gpu.compute_capability)?;
            }
        }

        let rec = &self.recommendation;
        if let (Some(class), Some(model)) = (rec.class, rec.model) {
            writeln!(f)?;
            writeln!(f, "{}", "-".repeat(RULE))?;
            writeln!(f, "RECOMMENDATIONS")?;
            writeln!(f, "{}", "-".repeat(RULE))?;
            writeln!(f, "{}", rec.summary)?;
            writeln!(
                f,
                "   Recommended: {}-class {} with tensor_parallel_size={}",
                class, model.id, rec.tensor_parallel
            )?;
        }

        for hint in &rec.hints {
            writeln!(f)?;
            writeln!(f, "Warning: {}", hint.message())?;
        }

        write!(f, "{}", "=".repeat(RULE))
    }
}

/// Write the snapshot as pretty JSON
pub fn write_report_json(snapshot: &HardwareSnapshot, path: &Path) -> AiServerResult<()> {
    let content = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, content)?;
    info!(path = %path.display(), "Saved hardware report");
    Ok(())
}
