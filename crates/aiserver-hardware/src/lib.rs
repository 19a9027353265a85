//! aiserver-hardware: Host hardware prober
//!
//! This crate builds [`aiserver_core::HardwareSnapshot`] values:
//! - OS, CPU and memory facts from kernel interfaces
//! - NVIDIA GPU enumeration through the vendor management tool
//! - Container engine and GPU passthrough checks
//! - Human-readable and JSON reports

pub mod commands;
pub mod parse;
pub mod probe;
pub mod report;

pub use probe::{HardwareProber, ProbeConfig};
pub use report::{write_report_json, HardwareReport};
