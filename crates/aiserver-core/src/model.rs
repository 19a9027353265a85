//! Static model catalog

use serde::Serialize;

/// Parameter-count class of a model, used by capability evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelClass {
    #[serde(rename = "70b")]
    B70,
    #[serde(rename = "32b")]
    B32,
    #[serde(rename = "14b")]
    B14,
    #[serde(rename = "8b")]
    B8,
}

impl std::fmt::Display for ModelClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelClass::B70 => write!(f, "70B"),
            ModelClass::B32 => write!(f, "32B"),
            ModelClass::B14 => write!(f, "14B"),
            ModelClass::B8 => write!(f, "8B"),
        }
    }
}

/// Catalog entry describing a servable model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    /// Hugging Face repository id
    pub id: &'static str,
    pub name: &'static str,
    pub class: ModelClass,
    /// Download size in GB
    pub size_gb: f64,
    /// Approximate VRAM needed to serve, in GB
    pub vram_required_gb: f64,
    /// Minimum GPUs; also the tensor-parallel degree the model is configured with
    pub min_gpus: u32,
    pub quantization: &'static str,
    /// Requires an accepted license and an HF token to download
    pub gated: bool,
    pub use_case: &'static str,
}

impl ModelInfo {
    /// Whether this model fits on a host with the given GPUs
    pub fn fits(&self, gpu_count: u32, total_vram_gb: f64) -> bool {
        self.min_gpus <= gpu_count && self.vram_required_gb <= total_vram_gb
    }
}

pub static MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "casperhansen/llama-3.3-70b-instruct-awq",
        name: "Llama 3.3 70B Instruct (AWQ)",
        class: ModelClass::B70,
        size_gb: 37.0,
        vram_required_gb: 40.0,
        min_gpus: 2,
        quantization: "awq",
        gated: true,
        use_case: "High-quality general purpose, tool use",
    },
    ModelInfo {
        id: "Qwen/Qwen3-32B-Instruct",
        name: "Qwen3 32B Instruct",
        class: ModelClass::B32,
        size_gb: 18.0,
        vram_required_gb: 22.0,
        min_gpus: 1,
        quantization: "awq",
        gated: false,
        use_case: "General purpose, reasoning, analysis, multilingual",
    },
    ModelInfo {
        id: "Qwen/Qwen3-Coder-32B",
        name: "Qwen3 Coder 32B",
        class: ModelClass::B32,
        size_gb: 18.0,
        vram_required_gb: 22.0,
        min_gpus: 1,
        quantization: "awq",
        gated: false,
        use_case: "Coding, debugging, code generation",
    },
    ModelInfo {
        id: "google/gemma-3-27b",
        name: "Gemma 3 27B",
        class: ModelClass::B32,
        size_gb: 15.0,
        vram_required_gb: 18.0,
        min_gpus: 1,
        quantization: "awq",
        gated: false,
        use_case: "General purpose, efficient deployment",
    },
    ModelInfo {
        id: "Qwen/Qwen3-14B-Instruct",
        name: "Qwen3 14B Instruct",
        class: ModelClass::B14,
        size_gb: 8.0,
        vram_required_gb: 11.0,
        min_gpus: 1,
        quantization: "awq",
        gated: false,
        use_case: "General purpose, resource-efficient",
    },
    ModelInfo {
        id: "google/gemma-3-12b",
        name: "Gemma 3 12B",
        class: ModelClass::B14,
        size_gb: 7.0,
        vram_required_gb: 9.0,
        min_gpus: 1,
        quantization: "awq",
        gated: false,
        use_case: "General purpose, balanced",
    },
    ModelInfo {
        id: "Qwen/Qwen3-8B-Instruct",
        name: "Qwen3 8B Instruct",
        class: ModelClass::B8,
        size_gb: 5.0,
        vram_required_gb: 7.0,
        min_gpus: 1,
        quantization: "awq",
        gated: false,
        use_case: "General purpose, fast responses",
    },
    ModelInfo {
        id: "google/gemma-3-4b",
        name: "Gemma 3 4B",
        class: ModelClass::B8,
        size_gb: 3.0,
        vram_required_gb: 5.0,
        min_gpus: 1,
        quantization: "awq",
        gated: false,
        use_case: "Testing, edge deployment",
    },
];

/// Look up a catalog entry by id
pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

/// First catalog entry of a class; the catalog lists the preferred model first
pub fn preferred_model(class: ModelClass) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.class == class)
}

/// Split the catalog into (compatible, incompatible) for the given hardware
pub fn partition_models(
    gpu_count: u32,
    total_vram_gb: f64,
) -> (Vec<&'static ModelInfo>, Vec<&'static ModelInfo>) {
    MODELS.iter().partition(|m| m.fits(gpu_count, total_vram_gb))
}
