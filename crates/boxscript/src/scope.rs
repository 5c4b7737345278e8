//! Name-addressed variable binding.
//!
//! A cell is a shared, mutable reference to a single `Value`; a scope is an ordered
//! list of `(name, cell)` pairs; a scope stack is innermost-first. This is the
//! mechanism that gives lambdas "capture by reference" semantics without a
//! slot-indexed namespace the way the teacher's `Function`/`namespace.rs` pair would
//! use for a language with reusable named functions — this language has neither, so a
//! flat `Rc<RefCell<Value>>` per binding is the whole story.

use std::{cell::RefCell, rc::Rc};

use crate::{
    ast::{Lambda, TypeHint},
    value::Value,
};

pub type Cell = Rc<RefCell<Value>>;

/// One block's bindings, innermost declarations last so shadowing resolves correctly
/// even if a name is declared twice in the same scope (parser/validator already reject
/// that case for non-loop scopes, but the lookup stays correct regardless). Each
/// binding carries the `TypeHint` it was declared with so a later
/// plain or compound assignment to that name can be re-coerced against it.
#[derive(Default)]
pub struct Scope {
    bindings: Vec<(String, TypeHint, Cell)>,
}

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an untyped binding (`Any`) — used for loop variables, lambda
    /// parameters, and the implicit `data` binding, none of which carry a type hint.
    pub fn declare(&mut self, name: impl Into<String>, value: Value) -> Cell {
        self.declare_typed(name, TypeHint::Any, value)
    }

    pub fn declare_typed(&mut self, name: impl Into<String>, hint: TypeHint, value: Value) -> Cell {
        let cell: Cell = Rc::new(RefCell::new(value));
        self.bindings.push((name.into(), hint, Rc::clone(&cell)));
        cell
    }

    fn get(&self, name: &str) -> Option<Cell> {
        self.bindings.iter().rev().find(|(n, ..)| n == name).map(|(_, _, cell)| Rc::clone(cell))
    }

    fn get_hint(&self, name: &str) -> Option<TypeHint> {
        self.bindings.iter().rev().find(|(n, ..)| n == name).map(|(_, hint, _)| *hint)
    }
}

/// The live scope stack during execution. The outermost scope (index 0) holds the
/// implicit `data` binding; each nested block pushes one more.
pub struct ScopeStack(Vec<Scope>);

impl ScopeStack {
    #[must_use]
    pub fn new() -> Self {
        Self(vec![Scope::new()])
    }

    pub fn push(&mut self) {
        self.0.push(Scope::new());
    }

    pub fn pop(&mut self) {
        self.0.pop();
    }

    /// Declares `name` in the *innermost* scope, shadowing any outer binding of the
    /// same name for the remainder of that scope's lifetime.
    pub fn declare(&mut self, name: impl Into<String>, value: Value) -> Cell {
        self.0.last_mut().expect("scope stack is never empty").declare(name, value)
    }

    pub fn declare_typed(&mut self, name: impl Into<String>, hint: TypeHint, value: Value) -> Cell {
        self.0.last_mut().expect("scope stack is never empty").declare_typed(name, hint, value)
    }

    /// Resolves `name` against the innermost-to-outermost scope chain.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Cell> {
        self.0.iter().rev().find_map(|scope| scope.get(name))
    }

    /// The `TypeHint` `name` was declared with, or `None` if it resolves to nothing
    /// (callers only consult this after `resolve` already succeeded).
    #[must_use]
    pub fn resolve_hint(&self, name: &str) -> Option<TypeHint> {
        self.0.iter().rev().find_map(|scope| scope.get_hint(name))
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

/// A lambda's captured environment: a flat snapshot of every cell visible at the
/// point the lambda literal was evaluated.
#[derive(Clone, Default)]
pub struct Captured(Vec<(String, TypeHint, Cell)>);

impl Captured {
    #[must_use]
    pub fn snapshot(stack: &ScopeStack) -> Self {
        let mut flat = Vec::new();
        for scope in &stack.0 {
            for (name, hint, cell) in &scope.bindings {
                flat.push((name.clone(), *hint, Rc::clone(cell)));
            }
        }
        Self(flat)
    }

    /// Builds a fresh scope stack for invoking the lambda: one scope holding the
    /// captured bindings (searched first-declared-first, so later shadows earlier,
    /// matching the original innermost-to-outermost resolution order), then one
    /// scope per parameter binding (untyped — lambda parameters carry no type hint).
    #[must_use]
    pub fn into_call_stack(self, params: &[String], args: &[Value]) -> ScopeStack {
        let mut captured_scope = Scope::new();
        for (name, hint, cell) in self.0 {
            captured_scope.bindings.push((name, hint, cell));
        }
        let mut stack = ScopeStack(vec![captured_scope]);
        stack.push();
        for (param, arg) in params.iter().zip(args.iter()) {
            stack.declare(param.clone(), arg.clone());
        }
        stack
    }
}

/// A lambda literal paired with the environment it closed over.
/// Built once, at the moment an `Expr::Lambda` is evaluated as a call argument — the
/// only position a lambda literal may appear in (validator enforces this, see
/// `LambdaOutsideCallArgument`) — and passed into the builtin/host function as an
/// invocable handle rather than as a `Value`, since `Value` has no lambda variant.
#[derive(Clone)]
pub struct Closure {
    pub lambda: Lambda,
    pub captured: Captured,
}

impl Closure {
    #[must_use]
    pub fn new(lambda: Lambda, stack: &ScopeStack) -> Self {
        Self { lambda, captured: Captured::snapshot(stack) }
    }
}
