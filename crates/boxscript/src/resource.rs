//! The resource limiter.
//!
//! Grounded in the teacher's `ResourceTracker`/`NoLimitTracker` pair (`resource.rs`):
//! the compiler/executor call through a trait at every statement, loop-iteration, and
//! call-depth boundary rather than branching on "is a limiter installed", so the
//! no-limiter path monomorphizes down to nothing. Unlike the teacher, there is no
//! allocation/memory tracking and no garbage collection.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use crate::{diagnostics::MessageCode, errors::RunError};

/// A condition a resource limit breach or host cancellation raises. Mirrors the
/// teacher's `ResourceError`, narrowed to the four ceilings §5 defines plus
/// cancellation (the teacher's `Allocation`/`Memory` variants have no counterpart here).
#[derive(Debug, Clone, Copy)]
pub enum ResourceError {
    Statements { limit: u64 },
    LoopIterations { limit: u64 },
    CallDepth { limit: u64 },
    ExecutionTime { limit: Duration },
    Cancelled,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Statements { limit } => write!(f, "statement limit of {limit} exceeded"),
            Self::LoopIterations { limit } => write!(f, "loop iteration limit of {limit} exceeded"),
            Self::CallDepth { limit } => write!(f, "call depth limit of {limit} exceeded"),
            Self::ExecutionTime { limit } => write!(f, "execution time limit of {limit:?} exceeded"),
            Self::Cancelled => write!(f, "execution was cancelled by the host"),
        }
    }
}

impl From<ResourceError> for RunError {
    fn from(err: ResourceError) -> Self {
        let code = match err {
            ResourceError::Statements { .. } => MessageCode::StatementLimitExceeded,
            ResourceError::LoopIterations { .. } => MessageCode::LoopIterationLimitExceeded,
            ResourceError::CallDepth { .. } => MessageCode::CallDepthLimitExceeded,
            ResourceError::ExecutionTime { .. } => MessageCode::ExecutionTimeLimitExceeded,
            ResourceError::Cancelled => MessageCode::CancelledByHost,
        };
        let args = match err {
            ResourceError::Statements { limit }
            | ResourceError::LoopIterations { limit }
            | ResourceError::CallDepth { limit } => vec![limit.to_string()],
            ResourceError::ExecutionTime { limit } => vec![format!("{limit:?}")],
            ResourceError::Cancelled => vec![],
        };
        Self::new(code, args)
    }
}

/// A shared, cloneable flag that can be fired from any thread. A host may hand one in
/// to `ExecutionContext`; the limiter (if installed) fires its own on a timer and
/// checks the host's alongside it at every poll.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Host-configured ceilings. Every field is optional; leaving
/// all of them unset means "install no limiter at all" (`ExecutionContext::unlimited`),
/// not "install a limiter with every ceiling set to infinity" — the two are
/// observably different in that the former never polls cancellation either.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceLimits {
    pub max_statements: Option<u64>,
    pub max_loop_iterations: Option<u64>,
    pub max_call_depth: Option<u64>,
    pub max_execution_time: Option<Duration>,
}

impl ResourceLimits {
    #[must_use]
    pub const fn new() -> Self {
        Self { max_statements: None, max_loop_iterations: None, max_call_depth: None, max_execution_time: None }
    }

    #[must_use]
    pub const fn max_statements(mut self, n: u64) -> Self {
        self.max_statements = Some(n);
        self
    }

    #[must_use]
    pub const fn max_loop_iterations(mut self, n: u64) -> Self {
        self.max_loop_iterations = Some(n);
        self
    }

    #[must_use]
    pub const fn max_call_depth(mut self, n: u64) -> Self {
        self.max_call_depth = Some(n);
        self
    }

    #[must_use]
    pub const fn max_execution_time(mut self, d: Duration) -> Self {
        self.max_execution_time = Some(d);
        self
    }

    /// True if every ceiling is unset — the caller should install `NoLimitTracker`
    /// rather than a `LimitedTracker` with nothing to check.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.max_statements.is_none()
            && self.max_loop_iterations.is_none()
            && self.max_call_depth.is_none()
            && self.max_execution_time.is_none()
    }
}

/// The per-boundary accounting surface the compiler/executor call through.
pub trait ResourceTracker {
    /// Called immediately before a statement's body runs.
    fn account_statement(&mut self) -> Result<(), ResourceError>;
    /// Called immediately before a loop iteration's body runs.
    fn account_loop_iteration(&mut self) -> Result<(), ResourceError>;
    /// Called on entry to any user-visible call (builtin, host function, or lambda
    /// invocation), before the call's body runs. Returns the depth to pass to the
    /// matching `exit_call`.
    fn enter_call(&mut self) -> Result<(), ResourceError>;
    /// Called on every exit path from a call, including error paths.
    fn exit_call(&mut self);
    /// Polls the combined cancellation state without accounting anything.
    fn poll_cancelled(&self) -> Result<(), ResourceError>;
}

/// The zero-cost default: every method is an inlined no-op, so a tree walker
/// monomorphized over `NoLimitTracker` has no limiter checks left in the compiled
/// output at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLimitTracker;

impl ResourceTracker for NoLimitTracker {
    #[inline(always)]
    fn account_statement(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }

    #[inline(always)]
    fn account_loop_iteration(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }

    #[inline(always)]
    fn enter_call(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }

    #[inline(always)]
    fn exit_call(&mut self) {}

    #[inline(always)]
    fn poll_cancelled(&self) -> Result<(), ResourceError> {
        Ok(())
    }
}

/// A tracker that enforces every ceiling the host configured, plus an armed
/// `CancellationToken` combined from the host's (if any) and the limiter's own
/// time-based one.
#[derive(Debug)]
pub struct LimitedTracker {
    limits: ResourceLimits,
    statements: u64,
    loop_iterations: u64,
    call_depth: u64,
    token: CancellationToken,
    host_token: Option<CancellationToken>,
}

impl LimitedTracker {
    /// Arms a time-based auto-cancellation on construction if `limits.max_execution_time`
    /// is set, and links it with `host_token` if the host supplied one.
    #[must_use]
    pub fn new(limits: ResourceLimits, host_token: Option<CancellationToken>) -> Self {
        let token = CancellationToken::new();
        if let Some(duration) = limits.max_execution_time {
            let fired = token.clone();
            thread::spawn(move || {
                thread::sleep(duration);
                fired.cancel();
            });
        }
        Self { limits, statements: 0, loop_iterations: 0, call_depth: 0, token, host_token }
    }

    fn check_cancelled(&self) -> Result<(), ResourceError> {
        let cancelled_by_timer = self.token.is_cancelled();
        let cancelled_by_host = self.host_token.as_ref().is_some_and(CancellationToken::is_cancelled);
        if cancelled_by_timer || cancelled_by_host {
            if cancelled_by_timer {
                if let Some(limit) = self.limits.max_execution_time {
                    return Err(ResourceError::ExecutionTime { limit });
                }
            }
            return Err(ResourceError::Cancelled);
        }
        Ok(())
    }
}

impl ResourceTracker for LimitedTracker {
    fn account_statement(&mut self) -> Result<(), ResourceError> {
        self.check_cancelled()?;
        self.statements += 1;
        if let Some(limit) = self.limits.max_statements
            && self.statements > limit
        {
            return Err(ResourceError::Statements { limit });
        }
        Ok(())
    }

    fn account_loop_iteration(&mut self) -> Result<(), ResourceError> {
        self.check_cancelled()?;
        self.loop_iterations += 1;
        if let Some(limit) = self.limits.max_loop_iterations
            && self.loop_iterations > limit
        {
            return Err(ResourceError::LoopIterations { limit });
        }
        Ok(())
    }

    fn enter_call(&mut self) -> Result<(), ResourceError> {
        self.check_cancelled()?;
        self.call_depth += 1;
        if let Some(limit) = self.limits.max_call_depth
            && self.call_depth > limit
        {
            return Err(ResourceError::CallDepth { limit });
        }
        Ok(())
    }

    fn exit_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }

    fn poll_cancelled(&self) -> Result<(), ResourceError> {
        self.check_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_limit_tracker_never_fails() {
        let mut t = NoLimitTracker;
        assert!(t.account_statement().is_ok());
        assert!(t.account_loop_iteration().is_ok());
        assert!(t.enter_call().is_ok());
        t.exit_call();
        assert!(t.poll_cancelled().is_ok());
    }

    #[test]
    fn limited_tracker_enforces_statement_ceiling() {
        let limits = ResourceLimits::new().max_statements(2);
        let mut t = LimitedTracker::new(limits, None);
        assert!(t.account_statement().is_ok());
        assert!(t.account_statement().is_ok());
        assert!(t.account_statement().is_err());
    }

    #[test]
    fn limited_tracker_enforces_call_depth_and_unwinds() {
        let limits = ResourceLimits::new().max_call_depth(1);
        let mut t = LimitedTracker::new(limits, None);
        assert!(t.enter_call().is_ok());
        assert!(t.enter_call().is_err());
        t.exit_call();
        t.exit_call();
        assert!(t.enter_call().is_ok());
    }

    #[test]
    fn host_token_cancels_combined_token() {
        let host = CancellationToken::new();
        let mut t = LimitedTracker::new(ResourceLimits::new(), Some(host.clone()));
        assert!(t.account_statement().is_ok());
        host.cancel();
        assert!(t.account_statement().is_err());
    }

    #[test]
    fn empty_limits_reports_as_empty() {
        assert!(ResourceLimits::new().is_empty());
        assert!(!ResourceLimits::new().max_statements(1).is_empty());
    }
}
