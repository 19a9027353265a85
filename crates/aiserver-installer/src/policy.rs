//! Decision policy for confirmations and failures
//!
//! These functions only look at step metadata, the run mode and the answer
//! collected so far. Prompting lives in [`crate::prompt`].

use crate::step::Confirmation;

/// How the installer collects answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Ask on the terminal
    Interactive,
    /// Use each question's default and treat failures as non-fatal
    Unattended,
}

/// Outcome of a policy decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Run,
    Skip,
    Continue,
    Abort,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Run => write!(f, "run"),
            Decision::Skip => write!(f, "skip"),
            Decision::Continue => write!(f, "continue"),
            Decision::Abort => write!(f, "abort"),
        }
    }
}

/// Whether the runner has to ask before running a step
pub fn needs_answer(confirmation: Option<&Confirmation>, mode: Mode) -> bool {
    confirmation.is_some() && mode == Mode::Interactive
}

/// Run or skip a step that is not already satisfied.
///
/// A missing answer (unattended mode, or end of input) means the default.
pub fn decide_run(confirmation: Option<&Confirmation>, mode: Mode, answer: Option<bool>) -> Decision {
    let Some(confirmation) = confirmation else {
        return Decision::Run;
    };
    let yes = match mode {
        Mode::Unattended => confirmation.default,
        Mode::Interactive => answer.unwrap_or(confirmation.default),
    };
    if yes {
        Decision::Run
    } else {
        Decision::Skip
    }
}

/// What a skipped step means for the rest of the run
pub fn decide_after_skip(required: bool) -> Decision {
    if required {
        Decision::Abort
    } else {
        Decision::Continue
    }
}

/// Continue or abort after a step failed.
///
/// Unattended runs are best effort; interactive runs follow the answer to
/// "continue anyway?", defaulting to yes.
pub fn decide_after_failure(mode: Mode, answer: Option<bool>) -> Decision {
    match mode {
        Mode::Unattended => Decision::Continue,
        Mode::Interactive => {
            if answer.unwrap_or(true) {
                Decision::Continue
            } else {
                Decision::Abort
            }
        }
    }
}
