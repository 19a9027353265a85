//! Scripted runner that records invocations instead of spawning processes

use aiserver_core::{CommandOutput, CommandSpec};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

use crate::traits::CommandRunner;

/// Runner answering from a table of canned outputs.
///
/// Responses are keyed by a prefix of the rendered command line; the longest
/// matching prefix wins. Unmatched commands get the fallback output.
pub struct ScriptedRunner {
    responses: Vec<(String, CommandOutput)>,
    fallback: CommandOutput,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    /// Every unmatched command behaves like a missing program
    pub fn new() -> Self {
        Self::with_fallback(CommandOutput::not_found())
    }

    /// Every unmatched command succeeds with empty output
    pub fn succeeding() -> Self {
        Self::with_fallback(CommandOutput::ok(""))
    }

    pub fn with_fallback(fallback: CommandOutput) -> Self {
        Self {
            responses: Vec::new(),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer commands starting with `prefix` with `output`
    pub fn respond(mut self, prefix: &str, output: CommandOutput) -> Self {
        self.responses.push((prefix.to_string(), output));
        self
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<CommandSpec>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All commands run so far, in order
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.lock_calls().clone()
    }

    /// Rendered command lines run so far, in order
    pub fn command_lines(&self) -> Vec<String> {
        self.lock_calls().iter().map(CommandSpec::display).collect()
    }

    /// Number of commands run that start with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.lock_calls()
            .iter()
            .filter(|spec| spec.display().starts_with(prefix))
            .count()
    }

    pub fn invoked(&self, prefix: &str) -> bool {
        self.count(prefix) > 0
    }

    fn lookup(&self, line: &str) -> CommandOutput {
        self.responses
            .iter()
            .filter(|(prefix, _)| line.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> CommandOutput {
        let output = self.lookup(&spec.display());
        self.lock_calls().push(spec.clone());
        output
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
