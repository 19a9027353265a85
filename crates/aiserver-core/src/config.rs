//! Persisted deployment configuration
//!
//! `config.json` is written once at first install and edited afterwards by
//! the user or by `model set`. Every field has a default so older or partial
//! files keep loading; structural changes between schema versions go through
//! [`migrate`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{AiServerError, AiServerResult, ModelInfo, StackRoot};

/// Current schema version of `config.json`
pub const CONFIG_VERSION: u32 = 2;

/// Top-level deployment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Schema version
    pub version: u32,
    /// Inference service settings
    pub inference: InferenceConfig,
    /// Embedding settings
    pub embedding: EmbeddingConfig,
    /// Ports and bind address
    pub server: ServerConfig,
    /// Host directories mounted into the containers
    pub paths: PathsConfig,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            inference: InferenceConfig::default(),
            embedding: EmbeddingConfig::default(),
            server: ServerConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

/// Inference service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Model identifier (Hugging Face repository id)
    pub model: String,
    /// Serving backend name
    pub backend: String,
    /// Requested tensor-parallel degree, clamped to the GPU count at render time
    pub tensor_parallel_size: u32,
    /// Maximum context length in tokens
    pub max_model_len: u32,
    /// Fraction of GPU memory the engine may claim, in (0, 1]
    pub gpu_memory_utilization: f64,
    /// Quantization scheme ("awq", "gptq", "none", ...)
    pub quantization: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model: "Qwen/Qwen3-32B-Instruct".to_string(),
            backend: "vllm".to_string(),
            tensor_parallel_size: 1,
            max_model_len: 4096,
            gpu_memory_utilization: 0.85,
            quantization: "awq".to_string(),
        }
    }
}

impl InferenceConfig {
    /// Last path segment of the model id, as the UI service expects it
    pub fn model_short_name(&self) -> &str {
        self.model.rsplit('/').next().unwrap_or(&self.model)
    }
}

/// Embedding configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    /// Execution device ("cpu" or "cuda")
    pub device: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "BAAI/bge-large-en-v1.5".to_string(),
            device: "cpu".to_string(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host of the inference service
    pub host: String,
    /// Host port of the inference API
    pub inference_port: u16,
    /// Host port of the RAG/UI service
    pub rag_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            inference_port: 8000,
            rag_port: 3001,
        }
    }
}

/// Directory layout. Empty entries are filled from the [`StackRoot`] on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub base_dir: PathBuf,
    pub models_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl DeploymentConfig {
    /// Default configuration laid out under `root`
    pub fn for_root(root: &StackRoot) -> Self {
        let mut config = Self::default();
        config.fill_missing_paths(root);
        config
    }

    /// Load `config.json` from the root, migrating older schemas
    pub fn load(root: &StackRoot) -> AiServerResult<Self> {
        let path = root.config_file();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            AiServerError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_json(&content)?;
        config.fill_missing_paths(root);
        Ok(config)
    }

    /// Load the persisted config, or the defaults if none has been written
    pub fn load_or_default(root: &StackRoot) -> AiServerResult<Self> {
        if root.config_file().exists() {
            Self::load(root)
        } else {
            Ok(Self::for_root(root))
        }
    }

    /// Load the persisted config, writing the defaults first if absent.
    /// Returns the config and whether it was created.
    pub fn ensure(root: &StackRoot) -> AiServerResult<(Self, bool)> {
        if root.config_file().exists() {
            return Ok((Self::load(root)?, false));
        }
        let config = Self::for_root(root);
        config.save(&root.config_file())?;
        info!(path = %root.config_file().display(), "Created default config");
        Ok((config, true))
    }

    /// Parse a config document of any supported schema version
    pub fn from_json(content: &str) -> AiServerResult<Self> {
        let raw: Value = serde_json::from_str(content)
            .map_err(|e| AiServerError::Config(format!("Failed to parse config: {}", e)))?;
        let migrated = migrate(raw)?;
        serde_json::from_value(migrated)
            .map_err(|e| AiServerError::Config(format!("Invalid config: {}", e)))
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: &Path) -> AiServerResult<()> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        std::fs::write(path, content)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    fn fill_missing_paths(&mut self, root: &StackRoot) {
        if self.paths.base_dir.as_os_str().is_empty() {
            self.paths.base_dir = root.base().to_path_buf();
        }
        if self.paths.models_dir.as_os_str().is_empty() {
            self.paths.models_dir = root.models_dir();
        }
        if self.paths.data_dir.as_os_str().is_empty() {
            self.paths.data_dir = root.data_dir();
        }
    }

    /// Check the invariants the manifest relies on
    pub fn validate(&self) -> AiServerResult<()> {
        let mut problems = Vec::new();

        if self.inference.model.trim().is_empty() {
            problems.push("inference.model must not be empty".to_string());
        }
        if self.inference.tensor_parallel_size == 0 {
            problems.push("inference.tensor_parallel_size must be at least 1".to_string());
        }
        if self.inference.max_model_len == 0 {
            problems.push("inference.max_model_len must be positive".to_string());
        }
        let util = self.inference.gpu_memory_utilization;
        if !(util > 0.0 && util <= 1.0) {
            problems.push(format!(
                "inference.gpu_memory_utilization must be in (0, 1], got {}",
                util
            ));
        }
        if self.server.inference_port == 0 || self.server.rag_port == 0 {
            problems.push("server ports must be between 1 and 65535".to_string());
        }
        if self.server.inference_port == self.server.rag_port {
            problems.push(format!(
                "server.inference_port and server.rag_port must differ (both {})",
                self.server.rag_port
            ));
        }
        for (name, path) in [
            ("paths.base_dir", &self.paths.base_dir),
            ("paths.models_dir", &self.paths.models_dir),
            ("paths.data_dir", &self.paths.data_dir),
        ] {
            if !path.is_absolute() {
                problems.push(format!("{} must be absolute, got {}", name, path.display()));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AiServerError::Config(problems.join("; ")))
        }
    }

    /// Switch to a catalog model, re-deriving the fields that depend on it
    pub fn select_model(&mut self, model: &ModelInfo) {
        self.inference.model = model.id.to_string();
        self.inference.quantization = model.quantization.to_string();
        self.inference.tensor_parallel_size = model.min_gpus.max(1);
    }
}

/// Bring a raw config document up to [`CONFIG_VERSION`].
///
/// Version 1 files carry no `version` key and use the `llm` section with
/// `vllm_host`/`vllm_port`/`anythingllm_port` server keys.
pub fn migrate(mut raw: Value) -> AiServerResult<Value> {
    let Some(obj) = raw.as_object_mut() else {
        return Err(AiServerError::Config(
            "config must be a JSON object".to_string(),
        ));
    };

    let version = match obj.get("version") {
        None => 1,
        Some(v) => v
            .as_u64()
            .ok_or_else(|| AiServerError::Config("version must be an integer".to_string()))?
            as u32,
    };

    if version > CONFIG_VERSION {
        return Err(AiServerError::Config(format!(
            "config version {} is newer than supported version {}",
            version, CONFIG_VERSION
        )));
    }

    if version < 2 {
        if let Some(llm) = obj.remove("llm") {
            obj.entry("inference").or_insert(llm);
        }
        if let Some(Value::Object(server)) = obj.get_mut("server") {
            rename_key(server, "vllm_host", "host");
            rename_key(server, "vllm_port", "inference_port");
            rename_key(server, "anythingllm_port", "rag_port");
        }
        debug!(from = version, to = 2, "Migrated config schema");
    }

    obj.insert("version".to_string(), Value::from(CONFIG_VERSION));
    Ok(raw)
}

fn rename_key(map: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(value) = map.remove(from) {
        map.entry(to.to_string()).or_insert(value);
    }
}
