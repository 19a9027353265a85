//! aiserver-installer: Step runner for the local AI stack
//!
//! This crate provides the installation procedure:
//! - The install step abstraction and the fixed step plan
//! - A pure decision policy for confirmations and failures
//! - Prompting for interactive answers
//! - The runner that records per-step outcomes
//! - The installer that ties probing, steps and the final summary together

pub mod installer;
pub mod plan;
pub mod policy;
pub mod prompt;
pub mod runner;
pub mod step;
pub mod steps;
pub mod summary;

pub use installer::Installer;
pub use plan::install_plan;
pub use policy::{Decision, Mode};
pub use prompt::{Prompter, ScriptedPrompter, StdinPrompter};
pub use runner::{InstallReport, StepRecord, StepRunner, StepState};
pub use step::{Confirmation, InstallStep, Precheck, StepContext};
