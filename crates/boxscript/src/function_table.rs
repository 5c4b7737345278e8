//! The merged builtin-plus-host function registry and the narrow surface host-authored
//! functions and builtins see.
//!
//! The full execution context stays generic over the resource tracker and tracer types
//! and internal to the executor, while every `Native`/`Host` function implementation is
//! written against the object-safe `HostContext` trait here, so the function table
//! itself never needs to be generic over which tracker/tracer the current run happens
//! to use.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::{errors::RunResult, scope::Closure, signature::Signature, value::Value};

/// One evaluated call argument. Every position the linker declared `ParamType::Lambda`
/// for carries a `Closure`; every other position carries a plain `Value`.
#[derive(Clone)]
pub enum CallArg {
    Value(Value),
    Closure(Closure),
}

impl CallArg {
    /// The `Value` at this position, or `None` if it is a lambda argument. Stdlib
    /// functions that take no lambda parameters use this to avoid matching on the enum
    /// at every call site.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Closure(_) => None,
        }
    }

    #[must_use]
    pub fn as_closure(&self) -> Option<&Closure> {
        match self {
            Self::Closure(c) => Some(c),
            Self::Value(_) => None,
        }
    }
}

/// The surface a builtin or host function implementation is given: enough to invoke
/// lambda arguments (with call-depth accounting), record a completion message, and
/// check cancellation, and nothing else. Deliberately object-safe so it can be a
/// trait object — see the module doc for why.
pub trait HostContext {
    /// Invokes `closure` with `args` bound to its parameters in order, evaluating its
    /// body expression in a fresh scope seeded with the lambda's captured environment.
    /// Performs the same call-depth increment/decrement every other call goes through.
    fn call_lambda(&mut self, closure: &Closure, args: &[Value]) -> RunResult<Value>;

    /// Sets (or clears) the human-readable completion message `return`/`fail` record.
    fn set_completion_message(&mut self, message: Option<String>);

    /// Polls the combined cancellation token without accounting any resource usage.
    /// Blocking builtins (`Sleep`, host I/O) call this in their wait loop.
    fn poll_cancelled(&self) -> RunResult<()>;
}

pub type NativeFn = fn(&[CallArg], &mut dyn HostContext) -> RunResult<Value>;
pub type HostFn = Arc<dyn Fn(&[CallArg], &mut dyn HostContext) -> RunResult<Value> + Send + Sync>;

/// Either an engine-shipped builtin or a host-registered function, stored behind one
/// enum so the linker and executor treat both uniformly.
#[derive(Clone)]
pub enum FunctionImpl {
    Native(NativeFn),
    Host(HostFn),
}

impl FunctionImpl {
    pub fn call(&self, args: &[CallArg], ctx: &mut dyn HostContext) -> RunResult<Value> {
        match self {
            Self::Native(f) => f(args, ctx),
            Self::Host(f) => f(args, ctx),
        }
    }
}

#[derive(Clone)]
pub struct FunctionEntry {
    pub signature: Signature,
    pub implementation: FunctionImpl,
    /// True for engine-shipped builtins, false for host-registered functions. Used
    /// only to decide whether registering a name a second time is a silent override
    /// (host replacing its own earlier registration) or a `FunctionOverride` warning
    /// (host shadowing a builtin) — see `merge_host_functions`.
    is_builtin: bool,
}

/// An insertion-ordered name → `FunctionEntry` map. Insertion order has no
/// behavioral significance for lookup; it is kept only so that diagnostics/debugging
/// output that enumerates the table is stable and matches registration order.
#[derive(Clone, Default)]
pub struct FunctionTable {
    entries: IndexMap<String, FunctionEntry>,
}

impl FunctionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_builtin(&mut self, signature: Signature, implementation: NativeFn) {
        let name = signature.name.to_owned();
        self.entries.insert(name, FunctionEntry { signature, implementation: FunctionImpl::Native(implementation), is_builtin: true });
    }

    pub fn register_host(&mut self, signature: Signature, implementation: HostFn) {
        let name = signature.name.to_owned();
        self.entries.insert(name, FunctionEntry { signature, implementation: FunctionImpl::Host(implementation), is_builtin: false });
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FunctionEntry> {
        self.entries.get(name)
    }

    /// Merges `host` functions into a clone of `self` (the standard table), returning
    /// the merged table plus the list of names that shadowed a builtin.
    #[must_use]
    pub fn merged_with_host(&self, host: &FunctionTable) -> (Self, Vec<String>) {
        let mut merged = self.clone();
        let mut overrides = Vec::new();
        for (name, entry) in &host.entries {
            if merged.entries.get(name).is_some_and(|existing| existing.is_builtin) {
                overrides.push(name.clone());
            }
            merged.entries.insert(name.clone(), entry.clone());
        }
        (merged, overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::{
        errors::RunError,
        signature::{Param, ParamType},
    };

    fn noop_native(_args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
        Ok(Value::Null)
    }

    #[test]
    fn host_function_shadowing_builtin_is_reported() {
        let mut builtins = FunctionTable::new();
        builtins.register_builtin(Signature::new("Abs", vec![Param::required("n", ParamType::Number)], ParamType::Number), noop_native);

        let mut host = FunctionTable::new();
        host.register_host(
            Signature::new("Abs", vec![Param::required("n", ParamType::Number)], ParamType::Number),
            Arc::new(|_args, _ctx| Ok(Value::Number(0.0))),
        );

        let (merged, overrides) = builtins.merged_with_host(&host);
        assert_eq!(overrides, vec!["Abs".to_owned()]);
        assert!(matches!(merged.get("Abs").unwrap().implementation, FunctionImpl::Host(_)));
    }

    #[test]
    fn non_shadowing_host_function_registers_cleanly() {
        let builtins = FunctionTable::new();
        let mut host = FunctionTable::new();
        host.register_host(
            Signature::new("DoubleIt", vec![Param::required("n", ParamType::Number)], ParamType::Number),
            Arc::new(|args: &[CallArg], _ctx: &mut dyn HostContext| {
                if args[0].as_value().and_then(Value::as_number).is_some() {
                    Ok(Value::Number(0.0))
                } else {
                    Err(RunError::new(crate::diagnostics::MessageCode::RuntimeError, vec!["unused".to_owned()]))
                }
            }),
        );
        let (_merged, overrides) = builtins.merged_with_host(&host);
        assert!(overrides.is_empty());
    }
}
