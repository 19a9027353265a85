//! Runner trait definitions

use aiserver_core::{CommandOutput, CommandSpec};
use async_trait::async_trait;

/// Executes data-described commands on behalf of the prober, the installer
/// and the supervisor
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion.
    ///
    /// Never fails: a missing program or a timeout is reported through
    /// [`CommandOutput`] so callers can degrade instead of aborting.
    async fn run(&self, spec: &CommandSpec) -> CommandOutput;

    /// Get the runner name
    fn name(&self) -> &'static str;
}
