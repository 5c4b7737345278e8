//! The single domain-error type every runtime operation raises.
//!
//! Grounded in the teacher's `RunError`/`ResourceError` split (`exception_private.rs`,
//! `resource.rs`): one error enum carries everything a diagnostic needs, and resource
//! exhaustion is just another variant of the same taxonomy rather than a parallel
//! channel, matching §7's "resource exhaustion and cancellation are modeled as runtime
//! diagnostic kinds (not separate channels)".

use crate::{
    ast::Position,
    diagnostics::{Diagnostic, MessageCode},
};

/// A runtime error in flight. Carries a `MessageCode`, its positional args, and an
/// optional source location — the location starts absent and is filled in by the
/// compiler's per-statement guard the first time the error crosses a statement
/// boundary without one.
#[derive(Debug, Clone)]
pub struct RunError {
    pub code: MessageCode,
    pub args: Vec<String>,
    pub location: Option<Position>,
}

impl RunError {
    #[must_use]
    pub fn new(code: MessageCode, args: Vec<String>) -> Self {
        Self { code, args, location: None }
    }

    #[must_use]
    pub const fn has_location(&self) -> bool {
        self.location.is_some()
    }

    /// Attaches `position` only if no location is already present, matching "errors
    /// that already carry a location pass through unchanged".
    #[must_use]
    pub fn with_location_if_absent(mut self, position: Position) -> Self {
        if self.location.is_none() {
            self.location = Some(position);
        }
        self
    }

    #[must_use]
    pub fn into_diagnostic(self) -> Diagnostic {
        let diagnostic = Diagnostic::new(self.code, self.args);
        match self.location {
            Some(pos) => diagnostic.with_location(pos),
            None => diagnostic,
        }
    }
}

pub type RunResult<T> = Result<T, RunError>;
