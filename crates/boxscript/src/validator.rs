//! Scope and control-flow validation. Walks a parsed `AstProgram` once and
//! produces a `Vec<Diagnostic>` — never a thrown error. Compile-time errors are
//! accumulated and the host receives the whole list.
//!
//! There is no global/nonlocal distinction and no user-defined functions to
//! pre-declare, so the scope tracker here is a plain stack of declared-name sets
//! rather than a multi-namespace symbol table.

use std::collections::HashSet;

use crate::{
    ast::{AstProgram, AssignTarget, Expr, Lambda, Stmt, StmtKind, TypeHint},
    diagnostics::{Diagnostic, MessageCode},
};

/// A static, non-configurable ceiling on loop nesting depth — distinct from the host-
/// configurable `MaxLoopIterations` runtime limiter, this guards against
/// pathologically deep *nesting* regardless of how many times any loop actually runs.
const MAX_LOOP_NESTING: usize = 32;

/// The ambient input binding every script starts with; declaring a variable of the
/// same name is a `ReservedNameCollision`.
const RESERVED_NAME: &str = "data";

struct Validator {
    diagnostics: Vec<Diagnostic>,
    scopes: Vec<HashSet<String>>,
    loop_depth: usize,
}

/// Validates `ast`, returning every diagnostic found. Compilation proceeds only if the
/// result contains no `Severity::Error` entries.
#[must_use]
pub fn validate(ast: &AstProgram) -> Vec<Diagnostic> {
    let mut validator = Validator { diagnostics: Vec::new(), scopes: vec![HashSet::from([RESERVED_NAME.to_owned()])], loop_depth: 0 };
    validator.validate_block(&ast.body);
    validator.diagnostics
}

impl Validator {
    fn push_scope(&mut self) {
        self.scopes.push(HashSet::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn is_declared(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|scope| scope.contains(name))
    }

    /// Declares `name` in the innermost scope, flagging a `ReservedNameCollision` if it
    /// shadows the ambient `data` binding. Declaration still proceeds after the
    /// diagnostic so the rest of the block validates against a consistent scope.
    fn declare(&mut self, name: &str, position: crate::ast::Position) {
        if name == RESERVED_NAME {
            self.diagnostics.push(Diagnostic::new(MessageCode::ReservedNameCollision, vec![name.to_owned()]).with_location(position));
        }
        self.scopes.last_mut().expect("scope stack is never empty").insert(name.to_owned());
    }

    fn validate_block(&mut self, block: &[Stmt]) {
        self.push_scope();
        let mut terminator: Option<&'static str> = None;
        for stmt in block {
            if let Some(after) = terminator {
                self.diagnostics.push(
                    Diagnostic::new(MessageCode::UnreachableCode, vec![after.to_owned()]).with_location(stmt.position),
                );
            }
            self.validate_stmt(stmt);
            if terminator.is_none() {
                terminator = terminator_name(&stmt.kind);
            }
        }
        self.pop_scope();
    }

    fn validate_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::VarDecl { name, init, .. } => {
                if let Some(init) = init {
                    self.validate_expr(init);
                }
                self.declare(name, stmt.position);
            }
            StmtKind::Assignment { target, value, .. } => {
                self.validate_target(target);
                self.validate_expr(value);
            }
            StmtKind::If { condition, then_block, else_ifs, else_block } => {
                self.validate_expr(condition);
                self.validate_block(then_block);
                for else_if in else_ifs {
                    self.validate_expr(&else_if.condition);
                    self.validate_block(&else_if.body);
                }
                if let Some(block) = else_block {
                    self.validate_block(block);
                }
            }
            StmtKind::Switch { scrutinee, cases, default_block } => {
                self.validate_expr(scrutinee);
                for case in cases {
                    for comparand in &case.comparands {
                        self.validate_expr(comparand);
                    }
                    self.validate_block(&case.body);
                }
                if let Some(block) = default_block {
                    self.validate_block(block);
                }
            }
            StmtKind::While { condition, body } => {
                self.validate_expr(condition);
                self.enter_loop(stmt.position);
                self.validate_block(body);
                self.loop_depth -= 1;
            }
            StmtKind::For { var, start, end, step, body, .. } => {
                self.validate_expr(start);
                self.validate_expr(end);
                if let Some(step) = step {
                    self.validate_expr(step);
                }
                self.enter_loop(stmt.position);
                self.push_scope();
                self.declare(var, stmt.position);
                self.validate_block(body);
                self.pop_scope();
                self.loop_depth -= 1;
            }
            StmtKind::ForEach { var, collection, body } => {
                self.validate_expr(collection);
                self.enter_loop(stmt.position);
                self.push_scope();
                self.declare(var, stmt.position);
                self.validate_block(body);
                self.pop_scope();
                self.loop_depth -= 1;
            }
            StmtKind::Return { message } | StmtKind::Fail { message } => {
                if let Some(message) = message {
                    self.validate_expr(message);
                }
            }
            StmtKind::Break => {
                if self.loop_depth == 0 {
                    self.diagnostics.push(Diagnostic::new(MessageCode::BreakOutsideLoop, vec![]).with_location(stmt.position));
                }
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.diagnostics.push(Diagnostic::new(MessageCode::ContinueOutsideLoop, vec![]).with_location(stmt.position));
                }
            }
            StmtKind::ExprStmt(expr) => self.validate_expr(expr),
        }
    }

    fn enter_loop(&mut self, position: crate::ast::Position) {
        self.loop_depth += 1;
        if self.loop_depth > MAX_LOOP_NESTING {
            self.diagnostics.push(
                Diagnostic::new(MessageCode::ExcessiveLoopNesting, vec![MAX_LOOP_NESTING.to_string()]).with_location(position),
            );
        }
    }

    fn validate_target(&mut self, target: &AssignTarget) {
        match target {
            AssignTarget::Identifier { name, position } => {
                if !self.is_declared(name) {
                    self.diagnostics
                        .push(Diagnostic::new(MessageCode::UndeclaredVariable, vec![name.clone()]).with_location(*position));
                }
            }
            AssignTarget::Property { object, .. } | AssignTarget::Index { object, .. } => {
                self.validate_expr(object);
                if let AssignTarget::Index { index, .. } = target {
                    self.validate_expr(index);
                }
            }
        }
    }

    /// Validates an expression in general position. A bare `Expr::Lambda` reaching
    /// here means it was *not* a direct call argument — the only position
    /// a lambda literal is permitted — so it is always a `LambdaOutsideCallArgument` error.
    /// `Expr::Call` special-cases each argument so a lambda literal passed directly
    /// never takes this path.
    fn validate_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal { .. } => {}
            Expr::Identifier { name, position } => {
                if !self.is_declared(name) {
                    self.diagnostics
                        .push(Diagnostic::new(MessageCode::UndeclaredVariable, vec![name.clone()]).with_location(*position));
                }
            }
            Expr::Property { object, .. } => self.validate_expr(object),
            Expr::Index { object, index, .. } => {
                self.validate_expr(object);
                self.validate_expr(index);
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.validate_expr(lhs);
                self.validate_expr(rhs);
            }
            Expr::Unary { operand, .. } => self.validate_expr(operand),
            Expr::TypeTest { operand, .. } => self.validate_expr(operand),
            Expr::Call { args, .. } => {
                for arg in args {
                    if let Expr::Lambda(lambda) = arg {
                        self.validate_lambda_body(lambda);
                    } else {
                        self.validate_expr(arg);
                    }
                }
            }
            Expr::Lambda(lambda) => {
                self.diagnostics
                    .push(Diagnostic::new(MessageCode::LambdaOutsideCallArgument, vec![]).with_location(lambda.position));
                self.validate_lambda_body(lambda);
            }
            Expr::ArrayLiteral { elements, .. } => {
                for element in elements {
                    self.validate_expr(element);
                }
            }
            Expr::ObjectLiteral { entries, .. } => {
                for (_, value) in entries {
                    self.validate_expr(value);
                }
            }
        }
    }

    fn validate_lambda_body(&mut self, lambda: &Lambda) {
        self.push_scope();
        for param in &lambda.params {
            self.scopes.last_mut().expect("scope stack is never empty").insert(param.clone());
        }
        self.validate_expr(&lambda.body);
        self.pop_scope();
    }
}

/// The describing word used in an `UnreachableCode` diagnostic's `{0}` placeholder,
/// or `None` if `kind` does not unconditionally terminate its enclosing block.
const fn terminator_name(kind: &StmtKind) -> Option<&'static str> {
    match kind {
        StmtKind::Return { .. } => Some("return"),
        StmtKind::Fail { .. } => Some("fail"),
        StmtKind::Break => Some("break"),
        StmtKind::Continue => Some("continue"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::{diagnostics::Severity, parser::parse};

    fn diagnostics_for(source: &str) -> Vec<Diagnostic> {
        validate(&parse(source).expect("source must parse"))
    }

    #[test]
    fn undeclared_read_is_an_error() {
        let diags = diagnostics_for("return x");
        assert!(diags.iter().any(|d| d.code == MessageCode::UndeclaredVariable));
    }

    #[test]
    fn data_is_always_declared() {
        let diags = diagnostics_for("return data");
        assert!(diags.is_empty());
    }

    #[test]
    fn declaring_data_is_reserved() {
        let diags = diagnostics_for("var data = 1");
        assert!(diags.iter().any(|d| d.code == MessageCode::ReservedNameCollision));
    }

    #[test]
    fn break_outside_loop_is_an_error() {
        let diags = diagnostics_for("break");
        assert!(diags.iter().any(|d| d.code == MessageCode::BreakOutsideLoop));
    }

    #[test]
    fn break_inside_while_is_fine() {
        let diags = diagnostics_for("while true { break }");
        assert!(diags.is_empty());
    }

    #[test]
    fn unreachable_code_after_return_is_a_warning() {
        let diags = diagnostics_for("return data\nvar x = 1");
        let found = diags.iter().find(|d| d.code == MessageCode::UnreachableCode).expect("expected warning");
        assert_eq!(found.severity, Severity::Warning);
    }

    #[test]
    fn for_loop_variable_is_scoped_to_its_body() {
        let diags = diagnostics_for("for i from 1 to 5 step 1 ascending { }\nreturn i");
        assert!(diags.iter().any(|d| d.code == MessageCode::UndeclaredVariable));
    }

    #[test]
    fn lambda_outside_call_argument_is_an_error() {
        let diags = diagnostics_for("var f = x => x + 1");
        assert!(diags.iter().any(|d| d.code == MessageCode::LambdaOutsideCallArgument));
    }

    #[test]
    fn lambda_as_direct_call_argument_is_fine() {
        let diags = diagnostics_for("data.items = Map(data.items, x => x + 1)");
        assert!(diags.iter().all(|d| d.code != MessageCode::LambdaOutsideCallArgument));
    }
}
