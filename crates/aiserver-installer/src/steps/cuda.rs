use aiserver_core::{AiServerResult, Capability, CommandSpec};
use aiserver_hardware::commands;
use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::step::{Confirmation, InstallStep, Precheck, StepContext};

const KEYRING_URL: &str =
    "https://developer.download.nvidia.com/compute/cuda/repos/ubuntu2204/x86_64/cuda-keyring_1.1-1_all.deb";
const TOOLKIT_PACKAGE: &str = "cuda-toolkit-12-4";

/// Line guarding the exports appended to the shell profile
pub const PROFILE_MARKER: &str = "# CUDA toolkit paths (aiserver)";

const PROFILE_EXPORTS: &str = "export PATH=/usr/local/cuda-12.4/bin${PATH:+:${PATH}}\n\
export LD_LIBRARY_PATH=/usr/local/cuda-12.4/lib64${LD_LIBRARY_PATH:+:${LD_LIBRARY_PATH}}\n";

/// Installs the CUDA toolkit from NVIDIA's apt repository
pub struct CudaToolkitStep;

/// Append the CUDA exports to `profile` unless already present.
/// Returns whether the file changed.
fn append_profile_exports(profile: &Path) -> AiServerResult<bool> {
    let existing = match std::fs::read_to_string(profile) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    if existing.lines().any(|line| line == PROFILE_MARKER) {
        return Ok(false);
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(profile)?;
    write!(file, "\n{}\n{}", PROFILE_MARKER, PROFILE_EXPORTS)?;
    debug!(profile = %profile.display(), "Appended CUDA exports");
    Ok(true)
}

#[async_trait]
impl InstallStep for CudaToolkitStep {
    fn name(&self) -> &'static str {
        "CUDA toolkit"
    }

    fn required(&self) -> bool {
        false
    }

    fn confirmation(&self) -> Option<Confirmation> {
        Some(Confirmation::new("CUDA toolkit not found. Install it?", true))
    }

    async fn precheck(&self, ctx: &StepContext) -> Precheck {
        if ctx.runner.run(&commands::nvcc_version()).await.success() {
            Precheck::Satisfied("CUDA toolkit already installed".to_string())
        } else {
            Precheck::Needed("CUDA toolkit not found".to_string())
        }
    }

    async fn run(&self, ctx: &StepContext) -> AiServerResult<()> {
        let keyring = std::env::temp_dir().join("cuda-keyring_1.1-1_all.deb");
        let keyring = keyring.to_string_lossy().into_owned();

        ctx.run_all(&[
            CommandSpec::new("wget", ["-q", "-O", keyring.as_str(), KEYRING_URL])
                .with_capability(Capability::Network),
            CommandSpec::new("dpkg", ["-i", keyring.as_str()]).with_capability(Capability::Root),
            CommandSpec::new("apt-get", ["update"])
                .with_capability(Capability::Root)
                .streaming(),
            CommandSpec::new("apt-get", ["install", "-y", TOOLKIT_PACKAGE])
                .with_capability(Capability::Root)
                .streaming(),
        ])
        .await?;
        ctx.run_best_effort(&[CommandSpec::new("rm", ["-f", keyring.as_str()])])
            .await;

        if append_profile_exports(&ctx.home.join(".bashrc"))? {
            ctx.reporter
                .info("CUDA paths added to ~/.bashrc; run 'source ~/.bashrc' to use them");
        }
        Ok(())
    }
}
