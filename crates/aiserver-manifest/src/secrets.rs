//! Secrets file (`.env`)
//!
//! Written once with a freshly generated API key. An existing file is never
//! touched so a running stack keeps its credentials.

use aiserver_core::AiServerResult;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{debug, info};

/// Key holding the generated inference API token
pub const API_KEY_VAR: &str = "VLLM_API_KEY";
/// Key the user fills in for gated model downloads
pub const HF_TOKEN_VAR: &str = "HF_TOKEN";

/// 16 random bytes, hex encoded
pub fn generate_api_key() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// Content of a fresh secrets file
pub fn render_env_file(api_key: &str) -> String {
    format!(
        "# Local AI Server environment variables\n\
         # Add your HuggingFace token here for gated models\n\
         {hf}=\n\
         \n\
         # Auto-generated inference API key (do not share!)\n\
         {key}={api_key}\n\
         \n\
         # Optional: fallback provider keys\n\
         ANTHROPIC_API_KEY=\n\
         OPENAI_API_KEY=\n",
        hf = HF_TOKEN_VAR,
        key = API_KEY_VAR,
        api_key = api_key,
    )
}

/// Create the secrets file unless it already exists.
/// Returns `true` if a new file was written.
pub fn write_env_file_if_absent(path: &Path) -> AiServerResult<bool> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = match options.open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "Secrets file exists, leaving it untouched");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    file.write_all(render_env_file(&generate_api_key()).as_bytes())?;
    info!(path = %path.display(), "Created secrets file");
    Ok(true)
}

/// Value of `key` in an env file; `None` if the file or key is missing.
/// An empty assignment yields `Some("")`.
pub fn read_env_value(path: &Path, key: &str) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    content.lines().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        (k.trim() == key).then(|| v.trim().trim_matches('"').to_string())
    })
}
