//! Higher-order array combinators taking a lambda argument: `Map`, `Where`, `All`, `Any`, `Find`, `Reduce`, `SortBy`, `Each`.
//!
//! Grounded in the teacher's `builtins/map_filter.rs`-style bridge between a Python
//! callable argument and the VM's own call machinery: each of these pulls its lambda
//! argument out via [`CallArg::as_closure`] and drives it through
//! [`HostContext::call_lambda`], the same indirection every call site in the executor
//! goes through, so call-depth accounting applies to
//! lambda-bodied builtins exactly as it would to a user-written loop.

use crate::{
    errors::RunResult,
    function_table::{CallArg, FunctionTable, HostContext},
    signature::{Param, ParamType, Signature},
    stdlib::helpers::{array_at, domain_error, value_at},
    value::Value,
};

pub fn register(table: &mut FunctionTable) {
    table.register_builtin(
        Signature::new("Map", vec![Param::required("items", ParamType::Array), Param::required("transform", ParamType::Lambda)], ParamType::Array),
        map,
    );
    table.register_builtin(
        Signature::new("Where", vec![Param::required("items", ParamType::Array), Param::required("predicate", ParamType::Lambda)], ParamType::Array),
        where_,
    );
    table.register_builtin(
        Signature::new("All", vec![Param::required("items", ParamType::Array), Param::required("predicate", ParamType::Lambda)], ParamType::Boolean),
        all,
    );
    table.register_builtin(
        Signature::new("Any", vec![Param::required("items", ParamType::Array), Param::required("predicate", ParamType::Lambda)], ParamType::Boolean),
        any,
    );
    table.register_builtin(
        Signature::new("Find", vec![Param::required("items", ParamType::Array), Param::required("predicate", ParamType::Lambda)], ParamType::Any),
        find,
    );
    table.register_builtin(
        Signature::new(
            "Reduce",
            vec![Param::required("items", ParamType::Array), Param::required("combine", ParamType::Lambda), Param::required("initial", ParamType::Any)],
            ParamType::Any,
        ),
        reduce,
    );
    table.register_builtin(
        Signature::new("SortBy", vec![Param::required("items", ParamType::Array), Param::required("key", ParamType::Lambda)], ParamType::Array),
        sort_by,
    );
    table.register_builtin(
        Signature::new("Each", vec![Param::required("items", ParamType::Array), Param::required("action", ParamType::Lambda)], ParamType::Null),
        each,
    );
}

fn closure_at<'a>(args: &'a [CallArg], index: usize) -> &'a crate::scope::Closure {
    args[index].as_closure().expect("linker guarantees lambda positions carry a Closure")
}

fn map(args: &[CallArg], ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?.to_vec();
    let transform = closure_at(args, 1);
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(ctx.call_lambda(transform, &[item])?);
    }
    Ok(Value::Array(out))
}

fn where_(args: &[CallArg], ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?.to_vec();
    let predicate = closure_at(args, 1);
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if ctx.call_lambda(predicate, std::slice::from_ref(&item))?.is_truthy() {
            out.push(item);
        }
    }
    Ok(Value::Array(out))
}

fn all(args: &[CallArg], ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?.to_vec();
    let predicate = closure_at(args, 1);
    for item in items {
        if !ctx.call_lambda(predicate, std::slice::from_ref(&item))?.is_truthy() {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

fn any(args: &[CallArg], ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?.to_vec();
    let predicate = closure_at(args, 1);
    for item in items {
        if ctx.call_lambda(predicate, std::slice::from_ref(&item))?.is_truthy() {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}

/// Returns `null` when nothing matches, matching `GetProperty`-on-missing-key's own
/// "absence reads as null" convention rather than raising a domain error.
fn find(args: &[CallArg], ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?.to_vec();
    let predicate = closure_at(args, 1);
    for item in items {
        if ctx.call_lambda(predicate, std::slice::from_ref(&item))?.is_truthy() {
            return Ok(item);
        }
    }
    Ok(Value::Null)
}

fn reduce(args: &[CallArg], ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?.to_vec();
    let combine = closure_at(args, 1);
    let mut accumulator = value_at(args, 2).clone();
    for item in items {
        accumulator = ctx.call_lambda(combine, &[accumulator, item])?;
    }
    Ok(accumulator)
}

/// Stable sort by the lambda's per-element `Number` key; a key that doesn't evaluate to
/// a `Number` is a domain error rather than a silent fallback ordering.
fn sort_by(args: &[CallArg], ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?.to_vec();
    let key = closure_at(args, 1);
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let k = ctx.call_lambda(key, std::slice::from_ref(&item))?;
        let Value::Number(n) = k else {
            return Err(domain_error(
                crate::diagnostics::MessageCode::InvalidType,
                vec!["SortBy key".to_owned(), "Number".to_owned(), k.value_type().to_string()],
            ));
        };
        keyed.push((n, item));
    }
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(Value::Array(keyed.into_iter().map(|(_, item)| item).collect()))
}

fn each(args: &[CallArg], ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?.to_vec();
    let action = closure_at(args, 1);
    for item in items {
        ctx.call_lambda(action, std::slice::from_ref(&item))?;
    }
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::{linker::link, parser::parse};

    fn run(source: &str, functions: &FunctionTable) -> Value {
        let ast = parse(source).expect("parses");
        assert!(link(&ast, functions).is_empty(), "must link cleanly");
        let mut executor = crate::executor::Executor::new(functions, crate::resource::NoLimitTracker, crate::tracer::NoopTracer, Value::Null);
        executor.run(&ast.body).expect("runs")
    }

    fn table() -> FunctionTable {
        let mut table = FunctionTable::new();
        register(&mut table);
        table
    }

    #[test]
    fn map_transforms_each_element() {
        let result = run("return Map([1, 2, 3], x => x * 2)", &table());
        assert_eq!(result, Value::Array(vec![Value::Number(2.0), Value::Number(4.0), Value::Number(6.0)]));
    }

    #[test]
    fn where_keeps_only_matching_elements() {
        let result = run("return Where([1, 2, 3, 4], x => x % 2 == 0)", &table());
        assert_eq!(result, Value::Array(vec![Value::Number(2.0), Value::Number(4.0)]));
    }

    #[test]
    fn reduce_folds_left_to_right() {
        let result = run("return Reduce([1, 2, 3, 4], (acc, x) => acc + x, 0)", &table());
        assert_eq!(result, Value::Number(10.0));
    }

    #[test]
    fn find_returns_null_when_nothing_matches() {
        let result = run("return Find([1, 2, 3], x => x > 100)", &table());
        assert_eq!(result, Value::Null);
    }

    #[test]
    fn sort_by_orders_ascending_by_numeric_key() {
        let result = run(r#"return SortBy([{"n": 3}, {"n": 1}, {"n": 2}], item => item["n"])"#, &table());
        assert_eq!(
            result,
            Value::Array(vec![
                crate::value::from_json_str(r#"{"n":1}"#).unwrap(),
                crate::value::from_json_str(r#"{"n":2}"#).unwrap(),
                crate::value::from_json_str(r#"{"n":3}"#).unwrap(),
            ])
        );
    }

    #[test]
    fn all_is_true_for_an_empty_array() {
        let result = run("return All([], x => false)", &table());
        assert_eq!(result, Value::Boolean(true));
    }
}
