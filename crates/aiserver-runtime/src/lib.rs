//! aiserver-runtime: Command execution layer
//!
//! This crate provides the runners that execute data-described commands:
//! - Process-based runner spawning real subprocesses with bounded timeouts
//! - Scripted runner that records invocations for tests

pub mod process;
pub mod scripted;
pub mod traits;

pub use process::{ProcessRunner, ProcessRunnerConfig};
pub use scripted::ScriptedRunner;
pub use traits::CommandRunner;
