//! The tree-walking executor. Evaluates a validated-and-linked statement list
//! against a `data` binding, a resource tracker, and a tracer, producing the final
//! `data` value plus an optional completion message.
//!
//! Grounded in the teacher's `bytecode::VM<R, Tr>`: generic over the same two type
//! parameters for the same reason — monomorphizing over `NoLimitTracker`/`LimitedTracker`
//! and `NoopTracer`/`StderrTracer` means the no-limiter, no-tracing configuration costs
//! nothing at the call site. Unlike the teacher's bytecode dispatch loop, this walks the
//! AST directly; there is no opcode stream, no instruction pointer, no stack machine.

use indexmap::IndexMap;

use crate::{
    ast::{AssignTarget, BinaryOp, CompoundOp, Expr, ForDirection, Position, Stmt, StmtKind, TypeHint, UnaryOp},
    diagnostics::MessageCode,
    errors::{RunError, RunResult},
    function_table::{CallArg, FunctionTable, HostContext},
    operators::{coerce_to_type, evaluate_binary, evaluate_unary, get_index, get_index_mut, get_property, get_property_mut, set_index, set_property, to_iterable},
    resource::ResourceTracker,
    scope::{Cell, Closure, ScopeStack},
    tracer::VmTracer,
    value::{Value, deep_eq},
};

/// The control-flow signal block/loop evaluation propagates in the `Ok` channel of a
/// `RunResult`. `Fail`/runtime errors ride the `Err` channel instead, so the two
/// never need to be reconciled into one combined enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return,
}

/// One step of a write path into a container, built once per assignment/pre-increment
/// and reused for both the read (compound forms) and the write, so a sub-expression
/// like an index computed from a function call is never evaluated twice.
enum PathSegment {
    Property(String),
    Index(f64),
}

fn expect_number(value: &Value, what: &str) -> RunResult<f64> {
    value
        .as_number()
        .ok_or_else(|| RunError::new(MessageCode::InvalidType, vec![what.to_owned(), "Number".to_owned(), value.value_type().to_string()]))
}

fn read_path(cell: &Cell, segments: &[PathSegment]) -> RunResult<Value> {
    let mut current = cell.borrow().clone();
    for segment in segments {
        current = match segment {
            PathSegment::Property(key) => get_property(&current, key)?,
            PathSegment::Index(index) => get_index(&current, *index)?,
        };
    }
    Ok(current)
}

fn write_path(cell: &Cell, segments: &[PathSegment], new_value: Value) -> RunResult<()> {
    let Some((last, prefix)) = segments.split_last() else {
        *cell.borrow_mut() = new_value;
        return Ok(());
    };
    let mut guard = cell.borrow_mut();
    let mut current: &mut Value = &mut guard;
    for segment in prefix {
        current = match segment {
            PathSegment::Property(key) => get_property_mut(current, key)?,
            PathSegment::Index(index) => get_index_mut(current, *index)?,
        };
    }
    match last {
        PathSegment::Property(key) => set_property(current, key, new_value),
        PathSegment::Index(index) => set_index(current, *index, new_value),
    }
}

/// Evaluates a compiled program body against one `data` binding. Not `Sync`/`Send`
/// by construction — a single execution is strictly single-threaded.
pub struct Executor<'f, R: ResourceTracker, Tr: VmTracer> {
    functions: &'f FunctionTable,
    tracker: R,
    tracer: Tr,
    scopes: ScopeStack,
    completion_message: Option<String>,
}

impl<'f, R: ResourceTracker, Tr: VmTracer> Executor<'f, R, Tr> {
    #[must_use]
    pub fn new(functions: &'f FunctionTable, tracker: R, tracer: Tr, data: Value) -> Self {
        let mut scopes = ScopeStack::new();
        scopes.declare("data", data);
        Self { functions, tracker, tracer, scopes, completion_message: None }
    }

    /// Runs `body` to completion, returning the final `data` value. Normal completion of
    /// the last top-level statement and an explicit `return` are treated identically
    ///; `break`/`continue` reaching here would mean the validator failed to do
    /// its job, since both are compile-time errors outside a loop.
    pub fn run(&mut self, body: &[Stmt]) -> RunResult<Value> {
        match self.exec_block(body)? {
            Flow::Normal | Flow::Return => {}
            Flow::Break | Flow::Continue => unreachable!("validator rejects break/continue outside a loop"),
        }
        let data = self.scopes.resolve("data").expect("the data binding is never removed");
        Ok(data.borrow().clone())
    }

    #[must_use]
    pub fn completion_message(&self) -> Option<&str> {
        self.completion_message.as_deref()
    }

    fn exec_block(&mut self, block: &[Stmt]) -> RunResult<Flow> {
        self.scopes.push();
        let result = self.exec_block_body(block);
        self.scopes.pop();
        result
    }

    fn exec_block_body(&mut self, block: &[Stmt]) -> RunResult<Flow> {
        for stmt in block {
            let flow = self.exec_stmt(stmt)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    /// Accounts one statement, fires the tracer, and runs the statement — attaching its
    /// source position to any error that escapes without one. This is the single choke point every statement passes through.
    fn exec_stmt(&mut self, stmt: &Stmt) -> RunResult<Flow> {
        self.tracker.account_statement().map_err(RunError::from)?;
        self.tracer.on_statement(stmt.position);
        self.exec_stmt_kind(stmt).map_err(|err| err.with_location_if_absent(stmt.position))
    }

    fn exec_stmt_kind(&mut self, stmt: &Stmt) -> RunResult<Flow> {
        match &stmt.kind {
            StmtKind::VarDecl { name, hint, init } => {
                let value = match init {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Null,
                };
                match hint {
                    Some(hint) => {
                        let coerced = coerce_to_type(value, hint.to_value_type(), name)?;
                        self.scopes.declare_typed(name.clone(), *hint, coerced);
                    }
                    None => {
                        self.scopes.declare(name.clone(), value);
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::Assignment { target, op, value } => {
                let rhs = self.eval_expr(value)?;
                self.exec_assignment(target, *op, rhs)?;
                Ok(Flow::Normal)
            }
            StmtKind::If { condition, then_block, else_ifs, else_block } => {
                if self.eval_expr(condition)?.is_truthy() {
                    return self.exec_block(then_block);
                }
                for else_if in else_ifs {
                    if self.eval_expr(&else_if.condition)?.is_truthy() {
                        return self.exec_block(&else_if.body);
                    }
                }
                match else_block {
                    Some(block) => self.exec_block(block),
                    None => Ok(Flow::Normal),
                }
            }
            StmtKind::Switch { scrutinee, cases, default_block } => {
                let scrutinee = self.eval_expr(scrutinee)?;
                for case in cases {
                    for comparand in &case.comparands {
                        let comparand = self.eval_expr(comparand)?;
                        if deep_eq(&scrutinee, &comparand) {
                            return self.exec_block(&case.body);
                        }
                    }
                }
                match default_block {
                    Some(block) => self.exec_block(block),
                    None => Ok(Flow::Normal),
                }
            }
            StmtKind::While { condition, body } => {
                loop {
                    if !self.eval_expr(condition)?.is_truthy() {
                        return Ok(Flow::Normal);
                    }
                    // Re-entering the loop body is itself an accounted statement, not just
                    // an accounted iteration — an empty-bodied `while true { }` must still
                    // trip `MaxStatements`, since there is no statement inside the body for
                    // `exec_stmt` to count on its own.
                    self.tracker.account_statement().map_err(RunError::from)?;
                    self.tracker.account_loop_iteration().map_err(RunError::from)?;
                    self.tracer.on_loop_iteration(stmt.position);
                    match self.exec_block(body)? {
                        Flow::Break => return Ok(Flow::Normal),
                        Flow::Return => return Ok(Flow::Return),
                        Flow::Continue | Flow::Normal => {}
                    }
                }
            }
            StmtKind::For { var, start, end, step, direction, body } => self.exec_for(var, start, end, step.as_ref(), *direction, body, stmt.position),
            StmtKind::ForEach { var, collection, body } => self.exec_foreach(var, collection, body, stmt.position),
            StmtKind::Return { message } => {
                self.completion_message = self.render_message(message.as_ref())?;
                Ok(Flow::Return)
            }
            StmtKind::Fail { message } => {
                let text = self.render_message(message.as_ref())?.unwrap_or_default();
                Err(RunError::new(MessageCode::ScriptFailure, vec![text]))
            }
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),
            StmtKind::ExprStmt(expr) => {
                self.eval_expr(expr)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn render_message(&mut self, message: Option<&Expr>) -> RunResult<Option<String>> {
        match message {
            Some(expr) => Ok(Some(self.eval_expr(expr)?.to_string())),
            None => Ok(None),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn exec_for(
        &mut self,
        var: &str,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        direction: ForDirection,
        body: &[Stmt],
        position: Position,
    ) -> RunResult<Flow> {
        let start_value = expect_number(&self.eval_expr(start)?, "for-loop start")?;
        let end_value = expect_number(&self.eval_expr(end)?, "for-loop end")?;
        let step_value = match step {
            Some(expr) => expect_number(&self.eval_expr(expr)?, "for-loop step")?,
            None => 1.0,
        };
        if step_value <= 0.0 || step_value.fract() != 0.0 {
            return Err(RunError::new(MessageCode::NonNegativeIntegerRequired, vec![crate::value::format_number(step_value)]));
        }

        self.scopes.push();
        let cell = self.scopes.declare(var.to_owned(), Value::Number(start_value));
        let mut current = start_value;
        let result = (|| -> RunResult<Flow> {
            loop {
                // Inclusive of `end` (see DESIGN.md: resolves a prose/example mismatch in
                // favor of the literal worked scenario, `for x from 1 to 5` visiting 5).
                let continues = match direction {
                    ForDirection::Ascending => current <= end_value,
                    ForDirection::Descending => current >= end_value,
                };
                if !continues {
                    return Ok(Flow::Normal);
                }
                *cell.borrow_mut() = Value::Number(current);
                self.tracker.account_statement().map_err(RunError::from)?;
                self.tracker.account_loop_iteration().map_err(RunError::from)?;
                self.tracer.on_loop_iteration(position);
                match self.exec_block(body)? {
                    Flow::Break => return Ok(Flow::Normal),
                    Flow::Return => return Ok(Flow::Return),
                    Flow::Continue | Flow::Normal => {}
                }
                current = match direction {
                    ForDirection::Ascending => current + step_value,
                    ForDirection::Descending => current - step_value,
                };
            }
        })();
        self.scopes.pop();
        result
    }

    fn exec_foreach(&mut self, var: &str, collection: &Expr, body: &[Stmt], position: Position) -> RunResult<Flow> {
        let collection = self.eval_expr(collection)?;
        let items = to_iterable(&collection)?;

        self.scopes.push();
        let cell = self.scopes.declare(var.to_owned(), Value::Null);
        let result = (|| -> RunResult<Flow> {
            for item in items {
                *cell.borrow_mut() = item;
                self.tracker.account_statement().map_err(RunError::from)?;
                self.tracker.account_loop_iteration().map_err(RunError::from)?;
                self.tracer.on_loop_iteration(position);
                match self.exec_block(body)? {
                    Flow::Break => return Ok(Flow::Normal),
                    Flow::Return => return Ok(Flow::Return),
                    Flow::Continue | Flow::Normal => {}
                }
            }
            Ok(Flow::Normal)
        })();
        self.scopes.pop();
        result
    }

    /// Resolves the assignment target's base cell and, for a nested target, the path of
    /// segments leading to the write site, then applies `op` (plain or compound) and
    /// writes the result back. For identifier targets
    /// carrying a type hint, the written value is `CoerceToType`-checked first.
    fn exec_assignment(&mut self, target: &AssignTarget, op: CompoundOp, rhs: Value) -> RunResult<()> {
        match target {
            AssignTarget::Identifier { name, position } => {
                let cell = self.resolve_cell(name, *position)?;
                let new_value = match op.as_binary_op() {
                    Some(binary_op) => evaluate_binary(binary_op, cell.borrow().clone(), rhs)?,
                    None => rhs,
                };
                let hint = self.scopes.resolve_hint(name).unwrap_or(TypeHint::Any);
                let coerced = coerce_to_type(new_value, hint.to_value_type(), name)?;
                *cell.borrow_mut() = coerced;
                Ok(())
            }
            AssignTarget::Property { object, key, .. } => {
                let (cell, mut segments) = self.collect_path(object)?;
                segments.push(PathSegment::Property(key.clone()));
                self.finish_write(&cell, segments, op, rhs)
            }
            AssignTarget::Index { object, index, .. } => {
                let (cell, mut segments) = self.collect_path(object)?;
                let index_value = expect_number(&self.eval_expr(index)?, "index")?;
                segments.push(PathSegment::Index(index_value));
                self.finish_write(&cell, segments, op, rhs)
            }
        }
    }

    fn finish_write(&mut self, cell: &Cell, segments: Vec<PathSegment>, op: CompoundOp, rhs: Value) -> RunResult<()> {
        let new_value = match op.as_binary_op() {
            Some(binary_op) => evaluate_binary(binary_op, read_path(cell, &segments)?, rhs)?,
            None => rhs,
        };
        write_path(cell, &segments, new_value)
    }

    fn resolve_cell(&self, name: &str, position: Position) -> RunResult<Cell> {
        self.scopes
            .resolve(name)
            .ok_or_else(|| RunError::new(MessageCode::RuntimeError, vec![format!("unknown identifier {name}")]).with_location_if_absent(position))
    }

    /// Walks down an lvalue-shaped expression (identifier, or a property/index chain
    /// rooted in one) to the variable cell it ultimately addresses, collecting the
    /// segments along the way. Used by both nested-assignment targets and by `++`/`--`,
    /// which take a bare expression operand rather than an `AssignTarget`.
    fn collect_path(&mut self, expr: &Expr) -> RunResult<(Cell, Vec<PathSegment>)> {
        match expr {
            Expr::Identifier { name, position } => Ok((self.resolve_cell(name, *position)?, Vec::new())),
            Expr::Property { object, key, .. } => {
                let (cell, mut segments) = self.collect_path(object)?;
                segments.push(PathSegment::Property(key.clone()));
                Ok((cell, segments))
            }
            Expr::Index { object, index, .. } => {
                let index_value = expect_number(&self.eval_expr(index)?, "index")?;
                let (cell, mut segments) = self.collect_path(object)?;
                segments.push(PathSegment::Index(index_value));
                Ok((cell, segments))
            }
            other => Err(RunError::new(MessageCode::RuntimeError, vec!["expression is not assignable".to_owned()])
                .with_location_if_absent(other.position())),
        }
    }

    fn eval_expr(&mut self, expr: &Expr) -> RunResult<Value> {
        match expr {
            Expr::Literal { value, .. } => Ok(value.clone()),
            Expr::Identifier { name, position } => Ok(self.resolve_cell(name, *position)?.borrow().clone()),
            Expr::Property { object, key, .. } => {
                let object = self.eval_expr(object)?;
                get_property(&object, key)
            }
            Expr::Index { object, index, .. } => {
                let object = self.eval_expr(object)?;
                let index = expect_number(&self.eval_expr(index)?, "index")?;
                get_index(&object, index)
            }
            Expr::Binary { op, lhs, rhs, .. } => self.eval_binary(*op, lhs, rhs),
            Expr::Unary { op, operand, .. } => self.eval_unary(*op, operand),
            Expr::TypeTest { operand, hint, .. } => {
                let value = self.eval_expr(operand)?;
                Ok(Value::Boolean(matches!(hint, TypeHint::Any) || value.value_type() == hint.to_value_type()))
            }
            Expr::Call { name, args, position } => self.eval_call(name, args, *position),
            Expr::Lambda(_) => Err(RunError::new(
                MessageCode::RuntimeError,
                vec!["a lambda literal may only be evaluated as a direct call argument".to_owned()],
            )),
            Expr::ArrayLiteral { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval_expr(element)?);
                }
                Ok(Value::Array(items))
            }
            Expr::ObjectLiteral { entries, .. } => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(key.clone(), self.eval_expr(value)?);
                }
                Ok(Value::Object(map))
            }
        }
    }

    /// `and`/`or` short-circuit and return the deciding operand unchanged rather than a
    /// coerced boolean; every other binary operator evaluates both sides eagerly.
    fn eval_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> RunResult<Value> {
        match op {
            BinaryOp::And => {
                let lhs = self.eval_expr(lhs)?;
                if lhs.is_truthy() { self.eval_expr(rhs) } else { Ok(lhs) }
            }
            BinaryOp::Or => {
                let lhs = self.eval_expr(lhs)?;
                if lhs.is_truthy() { Ok(lhs) } else { self.eval_expr(rhs) }
            }
            other => {
                let lhs = self.eval_expr(lhs)?;
                let rhs = self.eval_expr(rhs)?;
                evaluate_binary(other, lhs, rhs)
            }
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> RunResult<Value> {
        match op {
            UnaryOp::Neg | UnaryOp::Not => evaluate_unary(op, self.eval_expr(operand)?),
            UnaryOp::PreIncrement | UnaryOp::PreDecrement => {
                let (cell, segments) = self.collect_path(operand)?;
                let updated = evaluate_unary(op, read_path(&cell, &segments)?)?;
                write_path(&cell, &segments, updated.clone())?;
                Ok(updated)
            }
        }
    }

    fn eval_call(&mut self, name: &str, args: &[Expr], position: Position) -> RunResult<Value> {
        let entry = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| RunError::new(MessageCode::UnknownFunctionAtRuntime, vec![name.to_owned()]).with_location_if_absent(position))?;

        let mut call_args = Vec::with_capacity(args.len());
        for arg in args {
            if let Expr::Lambda(lambda) = arg {
                call_args.push(CallArg::Closure(Closure::new(lambda.clone(), &self.scopes)));
            } else {
                call_args.push(CallArg::Value(self.eval_expr(arg)?));
            }
        }

        self.tracker.enter_call().map_err(RunError::from)?;
        self.tracer.on_call(name, 0);
        let result = entry.implementation.call(&call_args, self).map_err(|err| err.with_location_if_absent(position));
        self.tracker.exit_call();
        result
    }
}

impl<'f, R: ResourceTracker, Tr: VmTracer> HostContext for Executor<'f, R, Tr> {
    /// Invokes `closure` by swapping in a fresh scope stack seeded from its captured
    /// environment plus its parameter bindings, evaluating its body expression, then
    /// restoring the caller's scope stack unconditionally — including on error, so a
    /// lambda that raises mid-body never leaves the executor's scopes corrupted.
    fn call_lambda(&mut self, closure: &Closure, args: &[Value]) -> RunResult<Value> {
        self.tracker.enter_call().map_err(RunError::from)?;
        self.tracer.on_call("<lambda>", 0);
        let caller_scopes = std::mem::replace(&mut self.scopes, closure.captured.clone().into_call_stack(&closure.lambda.params, args));
        let result = self.eval_expr(&closure.lambda.body);
        self.scopes = caller_scopes;
        self.tracker.exit_call();
        result
    }

    fn set_completion_message(&mut self, message: Option<String>) {
        self.completion_message = message;
    }

    fn poll_cancelled(&self) -> RunResult<()> {
        self.tracker.poll_cancelled().map_err(RunError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::{
        function_table::HostFn,
        linker::link,
        parser::parse,
        resource::{LimitedTracker, NoLimitTracker, ResourceLimits},
        signature::{Param, ParamType, Signature},
        tracer::NoopTracer,
    };
    use std::sync::Arc;

    fn run_script(source: &str, data: Value, functions: &FunctionTable) -> RunResult<Value> {
        let ast = parse(source).expect("source must parse");
        let diagnostics = link(&ast, functions);
        assert!(diagnostics.is_empty(), "unexpected link diagnostics: {diagnostics:?}");
        let mut executor = Executor::new(functions, NoLimitTracker, NoopTracer, data);
        executor.run(&ast.body)
    }

    #[test]
    fn returns_a_property_of_data() {
        let mut obj = IndexMap::new();
        obj.insert("name".to_owned(), Value::String("Alice".to_owned()));
        let result = run_script("return data.name", Value::Object(obj), &FunctionTable::new()).unwrap();
        assert_eq!(result, Value::String("Alice".to_owned()));
    }

    #[test]
    fn compound_assignment_through_a_property_path() {
        let mut obj = IndexMap::new();
        obj.insert("n".to_owned(), Value::Number(41.0));
        let result = run_script("data.n = data.n + 1", Value::Object(obj), &FunctionTable::new()).unwrap();
        let mut expected = IndexMap::new();
        expected.insert("n".to_owned(), Value::Number(42.0));
        assert_eq!(result, Value::Object(expected));
    }

    #[test]
    fn for_loop_appends_into_an_array() {
        let mut obj = IndexMap::new();
        obj.insert("items".to_owned(), Value::Array(vec![]));
        let mut functions = FunctionTable::new();
        functions.register_builtin(
            Signature::new("Append", vec![Param::required("items", ParamType::Array), Param::required("value", ParamType::Any)], ParamType::Array),
            |args, _ctx| {
                let Some(Value::Array(items)) = args[0].as_value().cloned() else { unreachable!() };
                let mut items = items;
                items.push(args[1].as_value().cloned().unwrap());
                Ok(Value::Array(items))
            },
        );
        let source = "for x from 1 to 5 step 1 ascending { data.items = Append(data.items, x) }";
        let result = run_script(source, Value::Object(obj), &functions).unwrap();
        let mut expected = IndexMap::new();
        expected.insert(
            "items".to_owned(),
            Value::Array((1..=5).map(|n| Value::Number(f64::from(n))).collect()),
        );
        assert_eq!(result, Value::Object(expected));
    }

    #[test]
    fn division_by_zero_carries_the_declaration_position() {
        let err = run_script("var x = 10 / 0", Value::Null, &FunctionTable::new()).unwrap_err();
        assert_eq!(err.code, MessageCode::DivisionByZero);
        assert_eq!(err.location.unwrap().line, 1);
    }

    #[test]
    fn statement_limit_is_enforced_regardless_of_loop_form() {
        let ast = parse("while true { }").expect("source must parse");
        let functions = FunctionTable::new();
        let diagnostics = link(&ast, &functions);
        assert!(diagnostics.is_empty());
        let tracker = LimitedTracker::new(ResourceLimits::new().max_statements(100), None);
        let mut executor = Executor::new(&functions, tracker, NoopTracer, Value::Null);
        let err = executor.run(&ast.body).unwrap_err();
        assert_eq!(err.code, MessageCode::StatementLimitExceeded);
    }

    #[test]
    fn type_hinted_declaration_rejects_a_mismatched_initializer() {
        let err = run_script(r#"var x: number = "hi""#, Value::Null, &FunctionTable::new()).unwrap_err();
        assert_eq!(err.code, MessageCode::InvalidType);
        assert_eq!(err.args[0], "x");
    }

    #[test]
    fn lambda_argument_is_invoked_through_call_depth_accounting() {
        let mut functions = FunctionTable::new();
        let implementation: HostFn = Arc::new(|args, ctx| {
            let closure = args[0].as_closure().expect("structurally checked by the linker");
            ctx.call_lambda(closure, &[Value::Number(10.0)])
        });
        functions.register_host(Signature::new("Invoke", vec![Param::required("f", ParamType::Lambda)], ParamType::Number), implementation);

        let result = run_script("return Invoke(x => x + 1)", Value::Null, &functions).unwrap();
        assert_eq!(result, Value::Number(11.0));
    }

    #[test]
    fn loop_variable_is_one_binding_mutated_across_iterations() {
        let mut functions = FunctionTable::new();
        let implementation: HostFn = Arc::new(|args, ctx| {
            let closure = args[0].as_closure().expect("structurally checked by the linker");
            ctx.call_lambda(closure, &[])
        });
        functions.register_host(Signature::new("Invoke", vec![Param::required("f", ParamType::Lambda)], ParamType::Number), implementation);

        // The loop variable cell is shared across iterations (not re-declared each time),
        // so a closure invoked on the final iteration observes that iteration's value.
        let source = "var last = 0\nfor i from 1 to 4 step 1 ascending { last = Invoke(() => i) }\nreturn last";
        let result = run_script(source, Value::Null, &functions).unwrap();
        assert_eq!(result, Value::Number(4.0));
    }

    #[test]
    fn pre_increment_writes_back_through_a_property_path() {
        let mut obj = IndexMap::new();
        obj.insert("n".to_owned(), Value::Number(1.0));
        let result = run_script("++data.n\nreturn data", Value::Object(obj), &FunctionTable::new()).unwrap();
        let mut expected = IndexMap::new();
        expected.insert("n".to_owned(), Value::Number(2.0));
        assert_eq!(result, Value::Object(expected));
    }
}
