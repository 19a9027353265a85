//! aiserver-supervisor: Service supervision for the installed stack
//!
//! This crate provides:
//! - Bounded HTTP health probes
//! - Start, stop, status and log following through the compose tool

pub mod health;
pub mod supervisor;

pub use health::{HealthChecker, ServiceHealth, PROBE_TIMEOUT};
pub use supervisor::{ServiceEndpoints, StatusReport, Supervisor};
