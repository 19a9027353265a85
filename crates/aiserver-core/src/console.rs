//! User-facing status lines
//!
//! Diagnostics go through `tracing`; what the operator is meant to read goes
//! through a [`Reporter`] so every step prints one line with a consistent
//! level marker.

use chrono::Local;
use std::sync::{Mutex, MutexGuard};

/// Level marker of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn marker(&self) -> &'static str {
        match self {
            Level::Info => "[INFO]",
            Level::Success => "[ OK ]",
            Level::Warning => "[WARN]",
            Level::Error => "[FAIL]",
        }
    }
}

/// Sink for status lines and plain text blocks
pub trait Reporter: Send + Sync {
    /// One status line
    fn line(&self, level: Level, message: &str);

    /// Unprefixed text (reports, tables, summaries)
    fn block(&self, text: &str);

    fn info(&self, message: &str) {
        self.line(Level::Info, message);
    }

    fn success(&self, message: &str) {
        self.line(Level::Success, message);
    }

    fn warn(&self, message: &str) {
        self.line(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.line(Level::Error, message);
    }
}

/// Prints to stdout with a local timestamp
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn line(&self, level: Level, message: &str) {
        println!(
            "{} [{}] {}",
            level.marker(),
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        );
    }

    fn block(&self, text: &str) {
        println!("{}", text);
    }
}

/// Collects output in memory
#[derive(Debug, Default)]
pub struct BufferReporter {
    lines: Mutex<Vec<(Option<Level>, String)>>,
}

impl BufferReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(Option<Level>, String)>> {
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Status lines at the given level
    pub fn lines(&self, level: Level) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(l, _)| *l == Some(level))
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Everything reported, in order, one entry per call
    pub fn text(&self) -> String {
        self.lock()
            .iter()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lock().iter().any(|(_, text)| text.contains(needle))
    }
}

impl Reporter for BufferReporter {
    fn line(&self, level: Level, message: &str) {
        self.lock().push((Some(level), message.to_string()));
    }

    fn block(&self, text: &str) {
        self.lock().push((None, text.to_string()));
    }
}
