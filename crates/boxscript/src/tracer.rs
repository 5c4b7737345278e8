//! Execution tracing.
//!
//! A trait with default no-op methods so `NoopTracer` compiles away entirely, plus a
//! human-readable `StderrTracer` for local debugging. The instrumentation points are
//! this engine's own — statement/loop-iteration/call boundaries and diagnostic
//! emission — since the executor is a tree-walker with no bytecode to report on.

use crate::{ast::Position, diagnostics::Diagnostic};

/// Hook trait fired at the same boundaries the resource limiter checks, plus
/// whenever a diagnostic is about to be surfaced. All methods default to no-ops so
/// `NoopTracer` requires no code and the compiler can inline the calls away.
pub trait VmTracer {
    #[inline(always)]
    fn on_statement(&mut self, _position: Position) {}

    #[inline(always)]
    fn on_loop_iteration(&mut self, _position: Position) {}

    #[inline(always)]
    fn on_call(&mut self, _name: &str, _depth: u64) {}

    #[inline(always)]
    fn on_diagnostic(&mut self, _diagnostic: &Diagnostic) {}
}

/// Production default: zero-cost, matching `NoLimitTracker`'s monomorphization story.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl VmTracer for NoopTracer {}

/// Prints one line per hook to stderr; intended for local debugging of a script's
/// control flow, not for production use (unbounded output, no rate limiting).
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrTracer;

impl VmTracer for StderrTracer {
    fn on_statement(&mut self, position: Position) {
        eprintln!("stmt  Ln {}, Col {}", position.line, position.column);
    }

    fn on_loop_iteration(&mut self, position: Position) {
        eprintln!("loop  Ln {}, Col {}", position.line, position.column);
    }

    fn on_call(&mut self, name: &str, depth: u64) {
        eprintln!("call  {name} (depth {depth})");
    }

    fn on_diagnostic(&mut self, diagnostic: &Diagnostic) {
        eprintln!("diag  {diagnostic}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_tracer_accepts_every_hook() {
        let mut t = NoopTracer;
        t.on_statement(Position::new(1, 1, 1));
        t.on_loop_iteration(Position::new(1, 1, 1));
        t.on_call("Map", 1);
    }
}
