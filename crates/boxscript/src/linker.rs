//! Call-site resolution. Walks every `Call` expression in a validated AST and
//! checks it against the merged `FunctionTable`: the name must exist, the argument
//! count must fall within the signature's arity, and every position the signature
//! declares `ParamType::Lambda` for must receive a lambda literal (and vice versa).
//!
//! Grounded in the teacher's `prepare.rs` call-resolution pass, narrowed the same way
//! `validator.rs` is: there is no overload resolution and no partial application, so
//! each call site either matches its signature or doesn't.

use crate::{
    ast::{AstProgram, Expr, Lambda, Stmt, StmtKind},
    diagnostics::{Diagnostic, MessageCode},
    function_table::FunctionTable,
    signature::ParamType,
};

/// Links `ast` against `functions`, returning every diagnostic found. Compilation
/// proceeds only if the result contains no `Severity::Error` entries.
#[must_use]
pub fn link(ast: &AstProgram, functions: &FunctionTable) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    link_block(&ast.body, functions, &mut diagnostics);
    diagnostics
}

fn link_block(block: &[Stmt], functions: &FunctionTable, out: &mut Vec<Diagnostic>) {
    for stmt in block {
        link_stmt(stmt, functions, out);
    }
}

fn link_stmt(stmt: &Stmt, functions: &FunctionTable, out: &mut Vec<Diagnostic>) {
    match &stmt.kind {
        StmtKind::VarDecl { init, .. } => {
            if let Some(init) = init {
                link_expr(init, functions, out);
            }
        }
        StmtKind::Assignment { target, value, .. } => {
            link_target(target, functions, out);
            link_expr(value, functions, out);
        }
        StmtKind::If { condition, then_block, else_ifs, else_block } => {
            link_expr(condition, functions, out);
            link_block(then_block, functions, out);
            for else_if in else_ifs {
                link_expr(&else_if.condition, functions, out);
                link_block(&else_if.body, functions, out);
            }
            if let Some(block) = else_block {
                link_block(block, functions, out);
            }
        }
        StmtKind::Switch { scrutinee, cases, default_block } => {
            link_expr(scrutinee, functions, out);
            for case in cases {
                for comparand in &case.comparands {
                    link_expr(comparand, functions, out);
                }
                link_block(&case.body, functions, out);
            }
            if let Some(block) = default_block {
                link_block(block, functions, out);
            }
        }
        StmtKind::While { condition, body } => {
            link_expr(condition, functions, out);
            link_block(body, functions, out);
        }
        StmtKind::For { start, end, step, body, .. } => {
            link_expr(start, functions, out);
            link_expr(end, functions, out);
            if let Some(step) = step {
                link_expr(step, functions, out);
            }
            link_block(body, functions, out);
        }
        StmtKind::ForEach { collection, body, .. } => {
            link_expr(collection, functions, out);
            link_block(body, functions, out);
        }
        StmtKind::Return { message } | StmtKind::Fail { message } => {
            if let Some(message) = message {
                link_expr(message, functions, out);
            }
        }
        StmtKind::Break | StmtKind::Continue => {}
        StmtKind::ExprStmt(expr) => link_expr(expr, functions, out),
    }
}

fn link_target(target: &crate::ast::AssignTarget, functions: &FunctionTable, out: &mut Vec<Diagnostic>) {
    match target {
        crate::ast::AssignTarget::Identifier { .. } => {}
        crate::ast::AssignTarget::Property { object, .. } => link_expr(object, functions, out),
        crate::ast::AssignTarget::Index { object, index, .. } => {
            link_expr(object, functions, out);
            link_expr(index, functions, out);
        }
    }
}

fn link_expr(expr: &Expr, functions: &FunctionTable, out: &mut Vec<Diagnostic>) {
    match expr {
        Expr::Literal { .. } | Expr::Identifier { .. } => {}
        Expr::Property { object, .. } => link_expr(object, functions, out),
        Expr::Index { object, index, .. } => {
            link_expr(object, functions, out);
            link_expr(index, functions, out);
        }
        Expr::Binary { lhs, rhs, .. } => {
            link_expr(lhs, functions, out);
            link_expr(rhs, functions, out);
        }
        Expr::Unary { operand, .. } | Expr::TypeTest { operand, .. } => link_expr(operand, functions, out),
        Expr::Call { name, args, position } => {
            link_call(name, args, *position, functions, out);
        }
        Expr::Lambda(lambda) => link_lambda(lambda, functions, out),
        Expr::ArrayLiteral { elements, .. } => {
            for element in elements {
                link_expr(element, functions, out);
            }
        }
        Expr::ObjectLiteral { entries, .. } => {
            for (_, value) in entries {
                link_expr(value, functions, out);
            }
        }
    }
}

fn link_lambda(lambda: &Lambda, functions: &FunctionTable, out: &mut Vec<Diagnostic>) {
    link_expr(&lambda.body, functions, out);
}

/// Links a single call site: existence, arity, and per-position lambda obligation.
/// Recurses into every argument regardless of whether the call site itself is valid —
/// a malformed outer call should not suppress diagnostics for its nested arguments.
fn link_call(name: &str, args: &[Expr], position: crate::ast::Position, functions: &FunctionTable, out: &mut Vec<Diagnostic>) {
    let Some(entry) = functions.get(name) else {
        out.push(Diagnostic::new(MessageCode::UndefinedFunction, vec![name.to_owned()]).with_location(position));
        for arg in args {
            if let Expr::Lambda(lambda) = arg {
                link_lambda(lambda, functions, out);
            } else {
                link_expr(arg, functions, out);
            }
        }
        return;
    };

    let signature = &entry.signature;
    if args.len() < signature.min_arity() {
        out.push(
            Diagnostic::new(
                MessageCode::TooFewArguments,
                vec![name.to_owned(), signature.min_arity().to_string(), args.len().to_string()],
            )
            .with_location(position),
        );
    } else if args.len() > signature.max_arity() {
        out.push(
            Diagnostic::new(
                MessageCode::TooManyArguments,
                vec![name.to_owned(), signature.max_arity().to_string(), args.len().to_string()],
            )
            .with_location(position),
        );
    }

    for (index, arg) in args.iter().enumerate() {
        let declared = signature.param_type_at(index);
        let is_lambda_literal = arg.is_lambda_literal();
        match (declared, is_lambda_literal) {
            (Some(ParamType::Lambda), false) => {
                out.push(
                    Diagnostic::new(MessageCode::ExpectedLambdaArgument, vec![(index + 1).to_string(), name.to_owned()])
                        .with_location(arg.position()),
                );
            }
            (Some(_) | None, true) if declared != Some(ParamType::Lambda) => {
                out.push(
                    Diagnostic::new(MessageCode::UnexpectedLambdaArgument, vec![(index + 1).to_string(), name.to_owned()])
                        .with_location(arg.position()),
                );
            }
            _ => {}
        }

        if let Expr::Lambda(lambda) = arg {
            link_lambda(lambda, functions, out);
        } else {
            link_expr(arg, functions, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::{errors::RunResult, function_table::{CallArg, HostContext}, parser::parse, signature::{Param, Signature}, value::Value};

    fn noop(_args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
        Ok(Value::Null)
    }

    fn table_with_map() -> FunctionTable {
        let mut table = FunctionTable::new();
        table.register_builtin(
            Signature::new(
                "Map",
                vec![Param::required("items", ParamType::Array), Param::required("f", ParamType::Lambda)],
                ParamType::Array,
            ),
            noop,
        );
        table.register_builtin(Signature::new("Abs", vec![Param::required("n", ParamType::Number)], ParamType::Number), noop);
        table
    }

    fn diagnostics_for(source: &str, functions: &FunctionTable) -> Vec<Diagnostic> {
        link(&parse(source).expect("source must parse"), functions)
    }

    #[test]
    fn undefined_function_is_an_error() {
        let diags = diagnostics_for("return Nope(1)", &table_with_map());
        assert!(diags.iter().any(|d| d.code == MessageCode::UndefinedFunction));
    }

    #[test]
    fn too_few_arguments_is_an_error() {
        let diags = diagnostics_for("return Abs()", &table_with_map());
        assert!(diags.iter().any(|d| d.code == MessageCode::TooFewArguments));
    }

    #[test]
    fn too_many_arguments_is_an_error() {
        let diags = diagnostics_for("return Abs(1, 2)", &table_with_map());
        assert!(diags.iter().any(|d| d.code == MessageCode::TooManyArguments));
    }

    #[test]
    fn missing_lambda_argument_is_an_error() {
        let diags = diagnostics_for("return Map(data, 1)", &table_with_map());
        assert!(diags.iter().any(|d| d.code == MessageCode::ExpectedLambdaArgument));
    }

    #[test]
    fn unexpected_lambda_argument_is_an_error() {
        let diags = diagnostics_for("return Abs(x => x)", &table_with_map());
        assert!(diags.iter().any(|d| d.code == MessageCode::UnexpectedLambdaArgument));
    }

    #[test]
    fn well_formed_call_links_cleanly() {
        let diags = diagnostics_for("return Map(data, x => x + 1)", &table_with_map());
        assert!(diags.is_empty());
    }

    #[test]
    fn nested_calls_are_linked_even_under_a_bad_outer_call() {
        let diags = diagnostics_for("return Nope(Missing(1))", &table_with_map());
        assert_eq!(diags.iter().filter(|d| d.code == MessageCode::UndefinedFunction).count(), 2);
    }
}
