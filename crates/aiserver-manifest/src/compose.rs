//! Compose manifest generation
//!
//! The manifest is built as a typed [`ComposeFile`] from the deployment
//! config and the hardware snapshot, then emitted as YAML. Rendering is
//! deterministic: the same inputs always produce byte-identical text.

use aiserver_core::{
    clamp_tensor_parallel, AiServerError, AiServerResult, DeploymentConfig, HardwareSnapshot,
};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;

/// Port the inference engine listens on inside its container
pub const INFERENCE_CONTAINER_PORT: u16 = 8000;
/// Port the RAG/UI service listens on inside its container
pub const RAG_CONTAINER_PORT: u16 = 3001;

pub const INFERENCE_SERVICE: &str = "vllm";
pub const RAG_SERVICE: &str = "anythingllm";
pub const INFERENCE_IMAGE: &str = "vllm/vllm-openai:latest";
pub const RAG_IMAGE: &str = "mintplexlabs/anythingllm:latest";
pub const INFERENCE_HEALTH_PATH: &str = "/health";
pub const RAG_HEALTH_PATH: &str = "/api/ping";
pub const NETWORK_NAME: &str = "local-ai-network";

/// Container readiness probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthProbe {
    pub url: String,
    pub interval_secs: u32,
    pub timeout_secs: u32,
    pub retries: u32,
    /// Grace period before failures count
    pub start_period_secs: u32,
}

/// One service of the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    pub image: String,
    pub container_name: String,
    /// Attach all GPUs through the NVIDIA runtime
    pub gpu: bool,
    pub environment: Vec<String>,
    pub volumes: Vec<String>,
    pub ports: Vec<String>,
    pub command: Vec<String>,
    pub healthcheck: HealthProbe,
    /// Services that must report healthy before this one starts
    pub depends_on_healthy: Vec<String>,
}

/// The whole deployment description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeFile {
    pub services: Vec<ServiceSpec>,
    pub network: String,
}

impl ComposeFile {
    /// Build the two-service deployment
    pub fn build(config: &DeploymentConfig, snapshot: &HardwareSnapshot) -> Self {
        let inference = &config.inference;
        let tensor_parallel =
            clamp_tensor_parallel(inference.tensor_parallel_size, snapshot.gpu_count());

        let mut command = vec![
            "--model".to_string(),
            inference.model.clone(),
            "--tensor-parallel-size".to_string(),
            tensor_parallel.to_string(),
            "--max-model-len".to_string(),
            inference.max_model_len.to_string(),
            "--gpu-memory-utilization".to_string(),
            inference.gpu_memory_utilization.to_string(),
            "--dtype".to_string(),
            "auto".to_string(),
            "--trust-remote-code".to_string(),
        ];
        if let Some(quantization) = explicit_quantization(&inference.quantization) {
            command.push("--quantization".to_string());
            command.push(quantization.to_string());
        }

        let vllm = ServiceSpec {
            name: INFERENCE_SERVICE.to_string(),
            image: INFERENCE_IMAGE.to_string(),
            container_name: "local-ai-vllm".to_string(),
            gpu: true,
            environment: vec![
                "NVIDIA_VISIBLE_DEVICES=all".to_string(),
                "HF_TOKEN=${HF_TOKEN:-}".to_string(),
            ],
            volumes: vec![
                format!("{}:/root/.cache/huggingface", config.paths.models_dir.display()),
                "/dev/shm:/dev/shm".to_string(),
            ],
            ports: vec![format!(
                "{}:{}:{}",
                config.server.host, config.server.inference_port, INFERENCE_CONTAINER_PORT
            )],
            command,
            healthcheck: HealthProbe {
                url: format!(
                    "http://localhost:{}{}",
                    INFERENCE_CONTAINER_PORT, INFERENCE_HEALTH_PATH
                ),
                interval_secs: 30,
                timeout_secs: 10,
                retries: 5,
                // Large models take minutes to load
                start_period_secs: 300,
            },
            depends_on_healthy: Vec::new(),
        };

        let data_dir = config.paths.data_dir.display();
        let anythingllm = ServiceSpec {
            name: RAG_SERVICE.to_string(),
            image: RAG_IMAGE.to_string(),
            container_name: "local-ai-anythingllm".to_string(),
            gpu: false,
            environment: vec![
                "STORAGE_DIR=/app/server/storage".to_string(),
                "LLM_PROVIDER=generic-openai".to_string(),
                format!(
                    "GENERIC_OPEN_AI_BASE_PATH=http://{}:{}/v1",
                    INFERENCE_SERVICE, INFERENCE_CONTAINER_PORT
                ),
                format!("GENERIC_OPEN_AI_MODEL_PREF={}", inference.model_short_name()),
                format!("GENERIC_OPEN_AI_MODEL_TOKEN_LIMIT={}", inference.max_model_len),
                "EMBEDDING_ENGINE=native".to_string(),
                "VECTOR_DB=lancedb".to_string(),
                "TTS_PROVIDER=native".to_string(),
                "PASSWORDLESS_AUTH=false".to_string(),
            ],
            volumes: vec![
                format!("{}/anythingllm:/app/server/storage", data_dir),
                format!("{}/documents:/app/server/storage/documents", data_dir),
            ],
            ports: vec![format!("{}:{}", config.server.rag_port, RAG_CONTAINER_PORT)],
            command: Vec::new(),
            healthcheck: HealthProbe {
                url: format!("http://localhost:{}{}", RAG_CONTAINER_PORT, RAG_HEALTH_PATH),
                interval_secs: 30,
                timeout_secs: 10,
                retries: 3,
                start_period_secs: 60,
            },
            depends_on_healthy: vec![INFERENCE_SERVICE.to_string()],
        };

        Self {
            services: vec![vllm, anythingllm],
            network: NETWORK_NAME.to_string(),
        }
    }

    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Images the deployment pulls
    pub fn images(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.image.as_str()).collect()
    }
}

/// `None` when the engine should detect quantization from the weights
fn explicit_quantization(quantization: &str) -> Option<&str> {
    match quantization.trim() {
        "" => None,
        q if q.eq_ignore_ascii_case("none") || q.eq_ignore_ascii_case("auto") => None,
        q => Some(q),
    }
}

/// Compose document as written to disk, borrowing from [`ComposeFile`]
#[derive(Serialize)]
struct Document<'a> {
    services: Services<'a>,
    networks: Networks<'a>,
}

/// Services keyed by name, in build order
struct Services<'a>(&'a [ServiceSpec]);

impl Serialize for Services<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for service in self.0 {
            map.serialize_entry(&service.name, &ServiceEntry::from(service))?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct ServiceEntry<'a> {
    image: &'a str,
    container_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    runtime: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    environment: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    volumes: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ports: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    command: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deploy: Option<Deploy>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    depends_on: BTreeMap<&'a str, DependsOn>,
    healthcheck: Healthcheck<'a>,
    restart: &'static str,
}

impl<'a> From<&'a ServiceSpec> for ServiceEntry<'a> {
    fn from(service: &'a ServiceSpec) -> Self {
        let probe = &service.healthcheck;
        Self {
            image: &service.image,
            container_name: &service.container_name,
            runtime: service.gpu.then_some("nvidia"),
            environment: strs(&service.environment),
            volumes: strs(&service.volumes),
            ports: strs(&service.ports),
            command: strs(&service.command),
            deploy: service.gpu.then(Deploy::all_gpus),
            depends_on: service
                .depends_on_healthy
                .iter()
                .map(|d| (d.as_str(), DependsOn { condition: "service_healthy" }))
                .collect(),
            healthcheck: Healthcheck {
                test: vec!["CMD", "curl", "-f", probe.url.as_str()],
                interval: format!("{}s", probe.interval_secs),
                timeout: format!("{}s", probe.timeout_secs),
                retries: probe.retries,
                start_period: format!("{}s", probe.start_period_secs),
            },
            restart: "unless-stopped",
        }
    }
}

fn strs(items: &[String]) -> Vec<&str> {
    items.iter().map(String::as_str).collect()
}

#[derive(Serialize)]
struct Deploy {
    resources: Resources,
}

#[derive(Serialize)]
struct Resources {
    reservations: Reservations,
}

#[derive(Serialize)]
struct Reservations {
    devices: Vec<Device>,
}

#[derive(Serialize)]
struct Device {
    driver: &'static str,
    count: &'static str,
    capabilities: Vec<&'static str>,
}

impl Deploy {
    fn all_gpus() -> Self {
        Self {
            resources: Resources {
                reservations: Reservations {
                    devices: vec![Device {
                        driver: "nvidia",
                        count: "all",
                        capabilities: vec!["gpu"],
                    }],
                },
            },
        }
    }
}

#[derive(Serialize)]
struct DependsOn {
    condition: &'static str,
}

#[derive(Serialize)]
struct Healthcheck<'a> {
    test: Vec<&'a str>,
    interval: String,
    timeout: String,
    retries: u32,
    start_period: String,
}

#[derive(Serialize)]
struct Networks<'a> {
    default: NetworkName<'a>,
}

#[derive(Serialize)]
struct NetworkName<'a> {
    name: &'a str,
}

const HEADER: &str =
    "# Generated by aiserver from config.json; re-run `aiserver install` after editing it.\n";

impl ComposeFile {
    /// Emit the manifest as YAML behind a fixed header comment
    pub fn to_yaml(&self) -> AiServerResult<String> {
        let document = Document {
            services: Services(&self.services),
            networks: Networks {
                default: NetworkName { name: &self.network },
            },
        };
        let body = serde_yaml::to_string(&document)
            .map_err(|e| AiServerError::Manifest(e.to_string()))?;
        Ok(format!("{}{}", HEADER, body))
    }
}

/// Render the manifest text for a config on the probed host
pub fn render_manifest(
    config: &DeploymentConfig,
    snapshot: &HardwareSnapshot,
) -> AiServerResult<String> {
    ComposeFile::build(config, snapshot).to_yaml()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiserver_core::{GpuDescriptor, HostInfo, StackRoot};
    use serde_yaml::Value;

    fn snapshot(gpus: u32) -> HardwareSnapshot {
        let gpus = (0..gpus)
            .map(|i| GpuDescriptor::new(i, "NVIDIA RTX 4090".to_string(), 24564, 24000, "550".to_string()))
            .collect();
        HardwareSnapshot::new(HostInfo::default(), gpus, true, true)
    }

    fn config() -> DeploymentConfig {
        DeploymentConfig::for_root(&StackRoot::new("/srv/ai"))
    }

    fn parse(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    fn strings(value: &Value) -> Vec<String> {
        value
            .as_sequence()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }

    fn flag_value(doc: &Value, flag: &str) -> Option<String> {
        let command = strings(&doc["services"][INFERENCE_SERVICE]["command"]);
        let at = command.iter().position(|c| c == flag)?;
        command.get(at + 1).cloned()
    }

    #[test]
    fn test_clamping_law() {
        for configured in 1..=8 {
            for gpus in 0..=4 {
                let mut cfg = config();
                cfg.inference.tensor_parallel_size = configured;
                let doc = parse(&render_manifest(&cfg, &snapshot(gpus)).unwrap());
                let expected = if gpus == 0 { 1 } else { configured.min(gpus) };
                assert_eq!(
                    flag_value(&doc, "--tensor-parallel-size"),
                    Some(expected.to_string())
                );
            }
        }
    }

    #[test]
    fn test_config_values_appear_once() {
        let mut cfg = config();
        cfg.inference.model = "org/Unique-Model-7B".to_string();
        cfg.inference.max_model_len = 12345;
        cfg.inference.gpu_memory_utilization = 0.77;
        cfg.server.inference_port = 18000;
        cfg.server.rag_port = 13001;
        let text = render_manifest(&cfg, &snapshot(2)).unwrap();

        assert_eq!(text.matches("org/Unique-Model-7B").count(), 1);
        assert_eq!(text.matches("0.0.0.0:18000:8000").count(), 1);
        assert_eq!(text.matches("13001:3001").count(), 1);
        assert_eq!(text.matches("/srv/ai/models:/root/.cache/huggingface").count(), 1);

        let doc = parse(&text);
        assert_eq!(flag_value(&doc, "--gpu-memory-utilization").as_deref(), Some("0.77"));
        assert_eq!(flag_value(&doc, "--max-model-len").as_deref(), Some("12345"));
        assert!(strings(&doc["services"][RAG_SERVICE]["environment"])
            .contains(&"GENERIC_OPEN_AI_MODEL_PREF=Unique-Model-7B".to_string()));
    }

    #[test]
    fn test_render_is_deterministic() {
        let cfg = config();
        let s = snapshot(2);
        assert_eq!(
            render_manifest(&cfg, &s).unwrap(),
            render_manifest(&cfg, &s).unwrap()
        );
    }

    #[test]
    fn test_header_and_service_order() {
        let text = render_manifest(&config(), &snapshot(1)).unwrap();
        assert!(text.starts_with("# Generated by aiserver"));
        let vllm = text.find("  vllm:").unwrap();
        let rag = text.find("  anythingllm:").unwrap();
        assert!(vllm < rag);
        assert_eq!(parse(&text)["networks"]["default"]["name"].as_str(), Some(NETWORK_NAME));
    }

    #[test]
    fn test_rag_waits_for_inference_health() {
        let compose = ComposeFile::build(&config(), &snapshot(1));
        let rag = compose.service(RAG_SERVICE).unwrap();
        assert_eq!(rag.depends_on_healthy, vec![INFERENCE_SERVICE.to_string()]);
        assert!(rag
            .environment
            .contains(&"GENERIC_OPEN_AI_BASE_PATH=http://vllm:8000/v1".to_string()));

        let vllm = compose.service(INFERENCE_SERVICE).unwrap();
        assert!(vllm.healthcheck.start_period_secs > rag.healthcheck.start_period_secs);
        assert!(vllm.gpu);

        let doc = parse(&compose.to_yaml().unwrap());
        let services = &doc["services"];
        assert_eq!(
            services[RAG_SERVICE]["depends_on"][INFERENCE_SERVICE]["condition"].as_str(),
            Some("service_healthy")
        );
        assert_eq!(
            services[INFERENCE_SERVICE]["healthcheck"]["start_period"].as_str(),
            Some("300s")
        );
        assert_eq!(
            strings(&services[INFERENCE_SERVICE]["healthcheck"]["test"]),
            vec!["CMD", "curl", "-f", "http://localhost:8000/health"]
        );
        assert_eq!(services[INFERENCE_SERVICE]["runtime"].as_str(), Some("nvidia"));
        assert_eq!(
            services[INFERENCE_SERVICE]["deploy"]["resources"]["reservations"]["devices"][0]
                ["count"]
                .as_str(),
            Some("all")
        );
        assert!(services[RAG_SERVICE].get("runtime").is_none());
        assert!(services[INFERENCE_SERVICE].get("depends_on").is_none());
    }

    #[test]
    fn test_quantization_flag() {
        let mut cfg = config();
        cfg.inference.quantization = "awq".to_string();
        let doc = parse(&render_manifest(&cfg, &snapshot(1)).unwrap());
        assert_eq!(flag_value(&doc, "--quantization").as_deref(), Some("awq"));

        cfg.inference.quantization = "none".to_string();
        let text = render_manifest(&cfg, &snapshot(1)).unwrap();
        assert!(!text.contains("--quantization"));
    }

    #[test]
    fn test_control_characters_survive_rendering() {
        let mut cfg = config();
        cfg.inference.model = "org/odd\tname\nwith: \"quotes\" # and \\ more".to_string();
        let doc = parse(&render_manifest(&cfg, &snapshot(1)).unwrap());
        assert_eq!(flag_value(&doc, "--model"), Some(cfg.inference.model.clone()));
    }

    #[test]
    fn test_images() {
        let compose = ComposeFile::build(&config(), &snapshot(0));
        assert_eq!(compose.images(), vec![INFERENCE_IMAGE, RAG_IMAGE]);
    }
}
