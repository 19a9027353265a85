//! aiserver-manifest: Deployment manifest and management artifacts
//!
//! This crate renders everything the install writes next to `config.json`:
//! - The two-service compose manifest
//! - The secrets file (written once, never regenerated)
//! - The start/stop/status/logs helper scripts

pub mod compose;
pub mod scripts;
pub mod secrets;

pub use compose::{render_manifest, ComposeFile, HealthProbe, ServiceSpec};
pub use scripts::{render_script, scripts_up_to_date, write_scripts};
pub use secrets::{read_env_value, render_env_file, write_env_file_if_absent};
