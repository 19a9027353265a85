//! Collecting yes/no answers

use async_trait::async_trait;
use std::collections::VecDeque;
use std::future::Future;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;

/// Source of answers to yes/no questions.
///
/// `None` means no answer could be read; the policy then applies the
/// question's default.
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn confirm(&self, question: &str, default: bool) -> Option<bool>;
}

#[derive(Debug, PartialEq, Eq)]
enum Reply {
    Yes,
    No,
    Default,
    Invalid,
}

fn parse_reply(input: &str) -> Reply {
    match input.trim().to_ascii_lowercase().as_str() {
        "" => Reply::Default,
        "y" | "yes" => Reply::Yes,
        "n" | "no" => Reply::No,
        _ => Reply::Invalid,
    }
}

/// Prints `question` and reads replies until one parses.
///
/// Returns `None` once `read_line` runs out of input.
async fn ask<F, Fut>(question: &str, default: bool, mut read_line: F) -> Option<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<String>>,
{
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    loop {
        print!("{} {}: ", question, hint);
        let _ = std::io::stdout().flush();

        let line = read_line().await?;
        match parse_reply(&line) {
            Reply::Yes => return Some(true),
            Reply::No => return Some(false),
            Reply::Default => return Some(default),
            Reply::Invalid => println!("Please answer 'y' or 'n'"),
        }
    }
}

/// Asks on the terminal.
///
/// Each read happens on a detached thread outside the runtime, so dropping a
/// pending question (Ctrl-C) never holds up runtime shutdown.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl StdinPrompter {
    async fn read_line() -> Option<String> {
        let (tx, rx) = oneshot::channel();
        std::thread::Builder::new()
            .name("stdin-prompt".to_string())
            .spawn(move || {
                let mut line = String::new();
                let read = match std::io::stdin().read_line(&mut line) {
                    Ok(0) | Err(_) => None,
                    Ok(_) => Some(line),
                };
                let _ = tx.send(read);
            })
            .ok()?;
        rx.await.ok().flatten()
    }
}

#[async_trait]
impl Prompter for StdinPrompter {
    async fn confirm(&self, question: &str, default: bool) -> Option<bool> {
        ask(question, default, Self::read_line).await
    }
}

/// Replays a fixed list of answers and records the questions asked
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Option<bool>>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().map(Some).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    fn lock_asked(&self) -> MutexGuard<'_, Vec<String>> {
        self.asked.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Questions asked so far, in order
    pub fn asked(&self) -> Vec<String> {
        self.lock_asked().clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm(&self, question: &str, _default: bool) -> Option<bool> {
        self.lock_asked().push(question.to_string());
        self.answers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .flatten()
    }
}
