//! Model catalog commands

use aiserver_core::{
    find_model, partition_models, AiServerError, AiServerResult, Capability, CommandSpec,
    DeploymentConfig, ModelInfo, StackRoot,
};
use aiserver_installer::Prompter;
use aiserver_manifest::read_env_value;
use aiserver_manifest::secrets::HF_TOKEN_VAR;
use anyhow::{Context as _, Result};
use std::path::Path;
use tracing::debug;

use super::Context;

fn print_row(model: &ModelInfo, current: &str) {
    let marker = if model.id == current { "*" } else { " " };
    println!(
        "{} {:<45} {:>4} {:>6.1} GB  {} GPU(s){}",
        marker,
        model.id,
        model.class.to_string(),
        model.vram_required_gb,
        model.min_gpus,
        if model.gated { "  [gated]" } else { "" }
    );
}

/// List the catalog against the detected hardware
pub async fn model_list(ctx: &Context) -> Result<i32> {
    let snapshot = ctx.prober(false).probe().await;
    let config = DeploymentConfig::load_or_default(&ctx.root)?;
    let (compatible, incompatible) =
        partition_models(snapshot.gpu_count(), snapshot.total_vram_gb());

    println!(
        "Detected {} GPU(s), {:.1} GB VRAM total\n",
        snapshot.gpu_count(),
        snapshot.total_vram_gb()
    );
    println!("Compatible models:");
    if compatible.is_empty() {
        println!("  (none)");
    }
    for model in &compatible {
        print_row(model, &config.inference.model);
    }
    if !incompatible.is_empty() {
        println!("\nNeeds more GPU resources:");
        for model in &incompatible {
            print_row(model, &config.inference.model);
        }
    }
    println!("\n* = configured model");
    Ok(0)
}

/// Print one catalog entry
pub fn model_info(id: &str) -> Result<i32> {
    let model = find_model(id).ok_or_else(|| AiServerError::ModelNotFound(id.to_string()))?;

    println!("{}", model.name);
    println!("  ID:             {}", model.id);
    println!("  Class:          {}", model.class);
    println!("  Download size:  {:.1} GB", model.size_gb);
    println!("  VRAM required:  {:.1} GB", model.vram_required_gb);
    println!("  Minimum GPUs:   {}", model.min_gpus);
    println!("  Quantization:   {}", model.quantization);
    println!("  Gated:          {}", if model.gated { "yes (HF_TOKEN required)" } else { "no" });
    println!("  Use case:       {}", model.use_case);
    Ok(0)
}

/// Outcome of switching the configured model
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ModelChange {
    pub previous: String,
    pub model: &'static str,
    /// Gated model without an HF token in `.env`
    pub missing_token: bool,
}

pub(crate) fn apply_model(root: &StackRoot, id: &str) -> AiServerResult<ModelChange> {
    root.require_installed()?;
    let model = find_model(id).ok_or_else(|| AiServerError::ModelNotFound(id.to_string()))?;

    let mut config = DeploymentConfig::load_or_default(root)?;
    let previous = config.inference.model.clone();
    config.select_model(model);
    config.save(&root.config_file())?;

    let missing_token = model.gated
        && read_env_value(&root.env_file(), HF_TOKEN_VAR)
            .map(|token| token.is_empty())
            .unwrap_or(true);

    Ok(ModelChange {
        previous,
        model: model.id,
        missing_token,
    })
}

/// Configure a different model
pub fn model_set(ctx: &Context, id: &str) -> Result<i32> {
    let change = apply_model(&ctx.root, id)?;

    ctx.reporter.success(&format!(
        "Model changed from {} to {}",
        change.previous, change.model
    ));
    if change.missing_token {
        ctx.reporter.warn(&format!(
            "{} is gated; set HF_TOKEN in {} before starting",
            change.model,
            ctx.root.env_file().display()
        ));
    }
    ctx.reporter.info(
        "Run `aiserver install` to regenerate the manifest, then `aiserver stop` and `aiserver start`",
    );
    Ok(0)
}

/// Non-empty `HF_TOKEN` from `.env`
fn hf_token(root: &StackRoot) -> Option<String> {
    read_env_value(&root.env_file(), HF_TOKEN_VAR).filter(|token| !token.is_empty())
}

/// Fetch weights into the cache the inference container mounts
pub(crate) fn download_command(models_dir: &Path, id: &str, token: Option<&str>) -> CommandSpec {
    // The container mounts models_dir as ~/.cache/huggingface, whose hub cache is hub/
    let cache = models_dir.join("hub");
    let spec = CommandSpec::new(
        "huggingface-cli",
        [
            "download".to_string(),
            id.to_string(),
            "--cache-dir".to_string(),
            cache.display().to_string(),
        ],
    )
    .with_capability(Capability::Network)
    .streaming();
    match token {
        Some(token) => spec.with_env(HF_TOKEN_VAR, token),
        None => spec,
    }
}

/// Pre-download a model so the first start does not wait on it
pub async fn model_download(ctx: &Context, id: &str, prompter: &dyn Prompter) -> Result<i32> {
    let token = hf_token(&ctx.root);
    match find_model(id) {
        Some(model) => {
            ctx.reporter.info(&format!(
                "Downloading {} (~{:.0} GB); this may take a while",
                model.name, model.size_gb
            ));
            if model.gated && token.is_none() {
                let org = model.id.split('/').next().unwrap_or(model.id);
                ctx.reporter.warn(&format!("{} is a gated model", model.id));
                ctx.reporter.block(&format!(
                    "  1. Create a token at https://huggingface.co/settings/tokens\n  \
                     2. Accept the license at https://huggingface.co/{}\n  \
                     3. Set HF_TOKEN in {}",
                    org,
                    ctx.root.env_file().display()
                ));
                if !prompter.confirm("Continue anyway?", false).await.unwrap_or(false) {
                    ctx.reporter.info("Download cancelled");
                    return Ok(1);
                }
            }
        }
        None => ctx
            .reporter
            .warn(&format!("{} is not in the catalog; downloading it directly", id)),
    }

    let config = DeploymentConfig::load_or_default(&ctx.root)?;
    let models_dir = &config.paths.models_dir;
    std::fs::create_dir_all(models_dir)
        .with_context(|| format!("Failed to create {}", models_dir.display()))?;

    let spec = download_command(models_dir, id, token.as_deref());
    debug!(command = %spec, "Downloading model");
    let output = ctx.runner.run(&spec).await;
    if output.success() {
        ctx.reporter.success(&format!("Model downloaded: {}", id));
        Ok(0)
    } else if output.code.is_none() && !output.timed_out {
        ctx.reporter
            .error("huggingface-cli not found; install it with `pip install -U \"huggingface_hub[cli]\"`");
        Ok(1)
    } else {
        ctx.reporter
            .error("Download failed. Check HF_TOKEN and the network connection.");
        Ok(1)
    }
}
