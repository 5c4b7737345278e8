//! The top-level pipeline driver. `Pipeline` owns no state of its own — it is a
//! namespace for the free functions a host calls to turn source text (or a previously
//! saved artifact) into a runnable `Program`, and to run that `Program` against one
//! `data` value.
//!
//! `Program` is a cheap, serializable "compiled once" handle the host holds onto,
//! separate from the per-call state an actual execution needs. A script runs to
//! completion or fails in one pass — there is no snapshotting or iterative resumption,
//! so there is no progress state machine to carry between calls.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::{
    ast::Stmt,
    compiler::{self, CompiledAst},
    diagnostics::{Diagnostic, MessageCode, has_errors},
    errors::RunError,
    executor::Executor,
    function_table::FunctionTable,
    linker,
    parser::parse,
    resource::{CancellationToken, LimitedTracker, NoLimitTracker, ResourceLimits},
    tracer::{NoopTracer, StderrTracer, VmTracer},
    validator,
    value::Value,
};

/// One pipeline stage, used only to label a `StatsCollector` measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Validate,
    Link,
    Compile,
    Execute,
    Deserialize,
}

/// Receives one wall-clock measurement per stage. Mirrors `VmTracer`'s shape: a trait
/// with a single hook, a no-op default, and nothing else — a host that wants timing
/// data implements this instead of instrumenting the pipeline itself.
pub trait StatsCollector {
    fn record(&mut self, stage: Stage, elapsed: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStats;

impl StatsCollector for NoopStats {
    fn record(&mut self, _stage: Stage, _elapsed: Duration) {}
}

fn timed<T>(stats: &mut dyn StatsCollector, stage: Stage, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    stats.record(stage, start.elapsed());
    result
}

/// A linked, compiled program ready to execute, plus the merged function table it was
/// linked against and any non-fatal diagnostics accumulated along the way.
///
/// Not `Serialize`: `functions` carries native `fn` pointers and `Arc<dyn Fn>` host
/// closures, neither of which round-trips. `compile_to_artifact` serializes only the
/// `CompiledAst` half (see `compiler` module docs); `compile_from_artifact` rebuilds
/// `functions` from the host's current table and re-links against it.
pub struct Program {
    compiled: CompiledAst,
    functions: FunctionTable,
    diagnostics: Vec<Diagnostic>,
}

impl Program {
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn body(&self) -> &[Stmt] {
        &self.compiled.body
    }
}

/// Host-configured execution-time knobs: resource ceilings, an optional external
/// cancellation token, and whether to install `StderrTracer` for local debugging.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    limits: ResourceLimits,
    cancellation: Option<CancellationToken>,
    trace: bool,
}

impl ExecutionContext {
    /// No limiter, no tracer — the fast path for trusted scripts.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    #[must_use]
    pub const fn with_tracing(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

/// The result of `Pipeline::execute`: the final `data` value on success (`None`
/// on failure), the `return`/`fail` completion message if any, and every diagnostic
/// accumulated across compilation and this run — Info/Warning only when `value` is
/// `Some`.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub value: Option<Value>,
    pub message: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A namespace for the pipeline's entry points; holds no state of its own.
pub struct Pipeline;

impl Pipeline {
    /// Runs Parse → Validate → Link → Compile, stopping at the first stage whose
    /// diagnostics contain a `Severity::Error`.
    pub fn compile(source: &str, host_functions: FunctionTable) -> Result<Program, Vec<Diagnostic>> {
        Self::compile_with_stats(source, host_functions, &mut NoopStats)
    }

    pub fn compile_with_stats(
        source: &str,
        host_functions: FunctionTable,
        stats: &mut dyn StatsCollector,
    ) -> Result<Program, Vec<Diagnostic>> {
        let ast = timed(stats, Stage::Parse, || parse(source)).map_err(|diagnostic| vec![diagnostic])?;

        let validation = timed(stats, Stage::Validate, || validator::validate(&ast));
        if has_errors(&validation) {
            return Err(validation);
        }

        let (functions, mut diagnostics) = merge_functions(&host_functions);
        diagnostics.extend(validation);

        let link_diagnostics = timed(stats, Stage::Link, || linker::link(&ast, &functions));
        if has_errors(&link_diagnostics) {
            let mut all = diagnostics;
            all.extend(link_diagnostics);
            return Err(all);
        }
        diagnostics.extend(link_diagnostics);

        let compiled = timed(stats, Stage::Compile, || compiler::compile(ast));
        Ok(Program { compiled, functions, diagnostics })
    }

    /// Runs `compile` then serializes the compiled AST body with `postcard` — compact
    /// and `no_std`-friendly, suited to a "resume later" precompiled artifact.
    pub fn compile_to_artifact(source: &str, host_functions: FunctionTable) -> Result<Vec<u8>, Vec<Diagnostic>> {
        let program = Self::compile(source, host_functions)?;
        postcard::to_allocvec(&program.compiled).map_err(|err| {
            vec![Diagnostic::new(MessageCode::RuntimeError, vec![format!("failed to serialize artifact: {err}")])]
        })
    }

    /// Deserializes a previously compiled artifact, then re-runs exactly the Link
    /// stage against `host_functions` — Parse/Validate/Compile never run again, since
    /// the artifact only ever held an already-validated body.
    pub fn compile_from_artifact(bytes: &[u8], host_functions: FunctionTable) -> Result<Program, Vec<Diagnostic>> {
        Self::compile_from_artifact_with_stats(bytes, host_functions, &mut NoopStats)
    }

    pub fn compile_from_artifact_with_stats(
        bytes: &[u8],
        host_functions: FunctionTable,
        stats: &mut dyn StatsCollector,
    ) -> Result<Program, Vec<Diagnostic>> {
        let compiled: CompiledAst = timed(stats, Stage::Deserialize, || postcard::from_bytes(bytes)).map_err(|err| {
            vec![Diagnostic::new(MessageCode::RuntimeError, vec![format!("failed to deserialize artifact: {err}")])]
        })?;

        let (functions, mut diagnostics) = merge_functions(&host_functions);

        let ast = crate::ast::AstProgram { body: compiled.body.clone() };
        let link_diagnostics = timed(stats, Stage::Link, || linker::link(&ast, &functions));
        if has_errors(&link_diagnostics) {
            let mut all = diagnostics;
            all.extend(link_diagnostics);
            return Err(all);
        }
        diagnostics.extend(link_diagnostics);

        Ok(Program { compiled, functions, diagnostics })
    }

    /// Runs `program` against `input`, honoring `ctx`'s resource limits and tracing
    /// preference. Branches once on whether a limiter/tracer is installed rather than
    /// checking at every statement boundary — the executor itself stays generic and
    /// monomorphized over whichever combination is chosen here.
    pub fn execute(program: &Program, input: Value, ctx: &ExecutionContext) -> ExecutionOutcome {
        Self::execute_with_stats(program, input, ctx, &mut NoopStats)
    }

    pub fn execute_with_stats(
        program: &Program,
        input: Value,
        ctx: &ExecutionContext,
        stats: &mut dyn StatsCollector,
    ) -> ExecutionOutcome {
        let start = Instant::now();
        let outcome = if ctx.limits.is_empty() {
            if ctx.trace {
                run_with(program, input, NoLimitTracker, StderrTracer)
            } else {
                run_with(program, input, NoLimitTracker, NoopTracer)
            }
        } else {
            let tracker = LimitedTracker::new(ctx.limits, ctx.cancellation.clone());
            if ctx.trace {
                run_with(program, input, tracker, StderrTracer)
            } else {
                run_with(program, input, tracker, NoopTracer)
            }
        };
        stats.record(Stage::Execute, start.elapsed());
        outcome
    }
}

fn run_with<R: crate::resource::ResourceTracker, Tr: VmTracer>(
    program: &Program,
    input: Value,
    tracker: R,
    tracer: Tr,
) -> ExecutionOutcome {
    let mut executor = Executor::new(&program.functions, tracker, tracer, input);
    let mut diagnostics = program.diagnostics.clone();
    match executor.run(program.body()) {
        Ok(value) => {
            ExecutionOutcome { value: Some(value), message: executor.completion_message().map(str::to_owned), diagnostics }
        }
        Err(err) => {
            diagnostics.push(err_into_diagnostic(err));
            ExecutionOutcome { value: None, message: None, diagnostics }
        }
    }
}

fn err_into_diagnostic(err: RunError) -> Diagnostic {
    err.into_diagnostic()
}

/// Builds the merged function table (builtins + host) for a fresh compile, turning any
/// shadowed-builtin names into non-fatal `FunctionOverride` warnings.
fn merge_functions(host_functions: &FunctionTable) -> (FunctionTable, Vec<Diagnostic>) {
    let (functions, overrides) = crate::stdlib::standard_table().merged_with_host(host_functions);
    let diagnostics = overrides.into_iter().map(|name| Diagnostic::new(MessageCode::FunctionOverride, vec![name])).collect();
    (functions, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use indexmap::IndexMap;

    #[test]
    fn compiles_and_executes_a_simple_script() {
        let program = Pipeline::compile("return data.name", FunctionTable::new()).expect("compiles cleanly");
        let mut obj = IndexMap::new();
        obj.insert("name".to_owned(), Value::String("Alice".to_owned()));
        let outcome = Pipeline::execute(&program, Value::Object(obj), &ExecutionContext::unlimited());
        assert_eq!(outcome.value, Some(Value::String("Alice".to_owned())));
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn compile_stops_at_the_first_error_stage() {
        let diagnostics = Pipeline::compile("return x", FunctionTable::new()).unwrap_err();
        assert!(diagnostics.iter().any(|d| d.code == MessageCode::UndeclaredVariable));
    }

    #[test]
    fn artifact_round_trip_re_links_against_the_current_host_table() {
        let bytes = Pipeline::compile_to_artifact("return Double(data.n)", FunctionTable::new());
        // `Double` is undefined at first compile, so the artifact was never produced —
        // this path instead exercises that `compile_to_artifact` surfaces the link
        // error up front rather than silently saving an unlinkable body.
        assert!(bytes.is_err());
    }

    #[test]
    fn artifact_round_trip_executes_after_deserialization() {
        let bytes = Pipeline::compile_to_artifact("return data.n + 1", FunctionTable::new()).expect("compiles");
        let program = Pipeline::compile_from_artifact(&bytes, FunctionTable::new()).expect("re-links");
        let mut obj = IndexMap::new();
        obj.insert("n".to_owned(), Value::Number(41.0));
        let outcome = Pipeline::execute(&program, Value::Object(obj), &ExecutionContext::unlimited());
        assert_eq!(outcome.value, Some(Value::Number(42.0)));
    }

    #[test]
    fn runtime_failure_is_reported_as_a_diagnostic_not_a_panic() {
        let program = Pipeline::compile("var x = 10 / 0", FunctionTable::new()).expect("compiles");
        let outcome = Pipeline::execute(&program, Value::Null, &ExecutionContext::unlimited());
        assert!(outcome.value.is_none());
        assert!(outcome.diagnostics.iter().any(|d| d.code == MessageCode::DivisionByZero));
    }

    #[test]
    fn statement_limit_surfaces_through_the_full_pipeline() {
        let program = Pipeline::compile("while true { }", FunctionTable::new()).expect("compiles");
        let ctx = ExecutionContext::unlimited().with_limits(ResourceLimits::new().max_statements(50));
        let outcome = Pipeline::execute(&program, Value::Null, &ctx);
        assert!(outcome.value.is_none());
        assert!(outcome.diagnostics.iter().any(|d| d.code == MessageCode::StatementLimitExceeded));
    }
}
