//! Helper scripts wrapping the orchestration tool

use aiserver_core::{AiServerResult, DeploymentConfig, ManagementScript, StackRoot};
use tracing::debug;

use crate::compose::{INFERENCE_HEALTH_PATH, RAG_HEALTH_PATH};

/// Single-quote a value for a POSIX shell
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Script body for the given root and config
pub fn render_script(script: ManagementScript, root: &StackRoot, config: &DeploymentConfig) -> String {
    let cd = format!(
        "#!/bin/bash\ncd {} || exit 1\n",
        shell_quote(&root.base().display().to_string())
    );
    let inference_url = format!("http://localhost:{}", config.server.inference_port);
    let rag_url = format!("http://localhost:{}", config.server.rag_port);

    let body = match script {
        ManagementScript::Start => format!(
            "docker compose --env-file .env up -d\n\
             echo \"Services starting...\"\n\
             echo \"vLLM API: {inference_url}\"\n\
             echo \"AnythingLLM UI: {rag_url}\"\n\
             echo \"\"\n\
             echo \"Use './logs.sh' to view logs\"\n"
        ),
        ManagementScript::Stop => "docker compose down\necho \"Services stopped.\"\n".to_string(),
        ManagementScript::Status => format!(
            "echo \"=== Container Status ===\"\n\
             docker compose ps\n\
             echo \"\"\n\
             echo \"=== GPU Usage ===\"\n\
             nvidia-smi --query-gpu=index,name,utilization.gpu,memory.used,memory.total --format=csv\n\
             echo \"\"\n\
             echo \"=== Service Health ===\"\n\
             curl -sf -m 5 {inference_url}{INFERENCE_HEALTH_PATH} > /dev/null && echo \"vLLM: OK\" || echo \"vLLM: DOWN\"\n\
             curl -sf -m 5 {rag_url}{RAG_HEALTH_PATH} > /dev/null && echo \"AnythingLLM: OK\" || echo \"AnythingLLM: DOWN\"\n"
        ),
        ManagementScript::Logs => "docker compose logs -f \"$@\"\n".to_string(),
    };

    cd + &body
}

/// Whether every script exists with the expected content
pub fn scripts_up_to_date(root: &StackRoot, config: &DeploymentConfig) -> bool {
    ManagementScript::ALL.iter().all(|script| {
        std::fs::read_to_string(root.script(*script))
            .map(|existing| existing == render_script(*script, root, config))
            .unwrap_or(false)
    })
}

/// (Re)write all four scripts, executable
pub fn write_scripts(root: &StackRoot, config: &DeploymentConfig) -> AiServerResult<()> {
    for script in ManagementScript::ALL {
        let path = root.script(script);
        std::fs::write(&path, render_script(script, root, config))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        }

        debug!(path = %path.display(), "Wrote script");
    }
    Ok(())
}
