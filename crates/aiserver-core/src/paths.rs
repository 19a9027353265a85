//! Configuration root and the persisted on-disk layout

use std::path::{Path, PathBuf};

use crate::{AiServerError, AiServerResult};

/// Directory name used under the home directory when no root is given
pub const DEFAULT_ROOT_DIR: &str = ".local-ai-server";

/// File name of the hardware report written by `detect`
pub const REPORT_FILE: &str = "hardware_report.json";

/// Helper scripts written next to the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagementScript {
    Start,
    Stop,
    Status,
    Logs,
}

impl ManagementScript {
    pub const ALL: [ManagementScript; 4] = [
        ManagementScript::Start,
        ManagementScript::Stop,
        ManagementScript::Status,
        ManagementScript::Logs,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            ManagementScript::Start => "start.sh",
            ManagementScript::Stop => "stop.sh",
            ManagementScript::Status => "status.sh",
            ManagementScript::Logs => "logs.sh",
        }
    }
}

/// The configuration root every component is constructed with.
///
/// All persisted artifacts live below this directory; nothing in the
/// workspace reaches for a global path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRoot {
    base: PathBuf,
}

impl StackRoot {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// `~/.local-ai-server`
    pub fn default_location() -> AiServerResult<Self> {
        Ok(Self::new(home_dir()?.join(DEFAULT_ROOT_DIR)))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Whether a prior install created the root
    pub fn exists(&self) -> bool {
        self.base.is_dir()
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    pub fn env_file(&self) -> PathBuf {
        self.base.join(".env")
    }

    pub fn compose_file(&self) -> PathBuf {
        self.base.join("docker-compose.yml")
    }

    pub fn script(&self, script: ManagementScript) -> PathBuf {
        self.base.join(script.file_name())
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.base.join("models")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base.join("data")
    }

    /// Fail with `NotInstalled` unless the root exists
    pub fn require_installed(&self) -> AiServerResult<()> {
        if self.exists() {
            Ok(())
        } else {
            Err(AiServerError::NotInstalled(format!(
                "{} does not exist",
                self.base.display()
            )))
        }
    }
}

/// Current user's home directory
pub fn home_dir() -> AiServerResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| AiServerError::Config("Could not determine home directory".to_string()))
}

/// `~/hardware_report.json`
pub fn default_report_path() -> AiServerResult<PathBuf> {
    Ok(home_dir()?.join(REPORT_FILE))
}
