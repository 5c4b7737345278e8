//! Array manipulation builtins.
//!
//! Grounded in the teacher's `types::List` method surface (`push`, `extend`,
//! `reverse`, `index`) — the list operations a Python program reaches for via
//! methods (`list.append`, `+`, slicing) become free functions here since this
//! language has no method-call syntax, only function calls. Every
//! function here returns a *new* array rather than mutating its argument in place
//! — a script writes the result back onto `data` itself if it wants the
//! mutation to stick, the same way `Append`'s own doctest in §8 Scenario 3 does.

use crate::{
    errors::RunResult,
    function_table::{CallArg, FunctionTable, HostContext},
    signature::{Param, ParamType, Signature},
    stdlib::helpers::{array_at, number_at, opt_number_at, value_at},
    value::{Value, deep_eq},
};

pub fn register(table: &mut FunctionTable) {
    table.register_builtin(
        Signature::new("Append", vec![Param::required("items", ParamType::Array), Param::required("value", ParamType::Any)], ParamType::Array),
        append,
    );
    table.register_builtin(
        Signature::new("Prepend", vec![Param::required("items", ParamType::Array), Param::required("value", ParamType::Any)], ParamType::Array),
        prepend,
    );
    table.register_builtin(
        Signature::new("Concatenate", vec![Param::required("a", ParamType::Array), Param::required("b", ParamType::Array)], ParamType::Array),
        concatenate,
    );
    table.register_builtin(Signature::new("Flatten", vec![Param::required("items", ParamType::Array)], ParamType::Array), flatten);
    table.register_builtin(Signature::new("Length", vec![Param::required("items", ParamType::Array)], ParamType::Number), length);
    table.register_builtin(
        Signature::new(
            "Slice",
            vec![Param::required("items", ParamType::Array), Param::required("start", ParamType::Number), Param::optional("end", ParamType::Number)],
            ParamType::Array,
        ),
        slice,
    );
    table.register_builtin(Signature::new("Reverse", vec![Param::required("items", ParamType::Array)], ParamType::Array), reverse);
    table.register_builtin(
        Signature::new("IndexOf", vec![Param::required("items", ParamType::Array), Param::required("value", ParamType::Any)], ParamType::Number),
        index_of,
    );
    table.register_builtin(
        Signature::new("Contains", vec![Param::required("items", ParamType::Array), Param::required("value", ParamType::Any)], ParamType::Boolean),
        contains,
    );
    table.register_builtin(Signature::new("Distinct", vec![Param::required("items", ParamType::Array)], ParamType::Array), distinct);
    table.register_builtin(
        Signature::new("Join", vec![Param::required("items", ParamType::Array), Param::optional("separator", ParamType::String)], ParamType::String),
        join,
    );
}

fn append(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let mut items = array_at(args, 0, "items")?.to_vec();
    items.push(value_at(args, 1).clone());
    Ok(Value::Array(items))
}

fn prepend(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let mut items = vec![value_at(args, 1).clone()];
    items.extend_from_slice(array_at(args, 0, "items")?);
    Ok(Value::Array(items))
}

fn concatenate(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let mut items = array_at(args, 0, "a")?.to_vec();
    items.extend_from_slice(array_at(args, 1, "b")?);
    Ok(Value::Array(items))
}

/// One level deep only — a nested array's own nested arrays stay nested, matching
/// `Concatenate`'s shallow-copy documentation.
fn flatten(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Array(inner) => out.extend(inner.iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    Ok(Value::Array(out))
}

fn length(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::Number(array_at(args, 0, "items")?.len() as f64))
}

/// `start`/`end` follow `GetIndex`'s negative-wraps-from-end convention; `end`
/// defaults to the array's length (exclusive upper bound, Python-slice style).
fn slice(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?;
    let len = items.len() as i64;
    let start = resolve_bound(number_at(args, 1, "start")? as i64, len);
    let end = match opt_number_at(args, 2, "end")? {
        Some(n) => resolve_bound(n as i64, len),
        None => len,
    };
    let start = start.clamp(0, len) as usize;
    let end = end.clamp(0, len).max(start as i64) as usize;
    Ok(Value::Array(items[start..end].to_vec()))
}

fn resolve_bound(n: i64, len: i64) -> i64 {
    if n < 0 { n + len } else { n }
}

fn reverse(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let mut items = array_at(args, 0, "items")?.to_vec();
    items.reverse();
    Ok(Value::Array(items))
}

fn index_of(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?;
    let needle = value_at(args, 1);
    let found = items.iter().position(|item| deep_eq(item, needle));
    Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
}

fn contains(args: &[CallArg], ctx: &mut dyn HostContext) -> RunResult<Value> {
    match index_of(args, ctx)? {
        Value::Number(idx) => Ok(Value::Boolean(idx >= 0.0)),
        _ => unreachable!("index_of always returns a Number"),
    }
}

fn distinct(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?;
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !out.iter().any(|existing| deep_eq(existing, item)) {
            out.push(item.clone());
        }
    }
    Ok(Value::Array(out))
}

fn join(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?;
    let separator = crate::stdlib::helpers::opt_string_at(args, 1, "separator")?.unwrap_or(",");
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        match item {
            Value::String(s) => out.push_str(s),
            other => out.push_str(&other.to_string()),
        }
    }
    Ok(Value::String(out))
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
    fn append_adds_to_the_end_without_mutating_the_source() {
        let result = run("return Append([1, 2], 3)", &table());
        assert_eq!(result, Value::Array(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]));
    }

    #[test]
    fn slice_supports_negative_bounds() {
        let result = run("return Slice([1, 2, 3, 4, 5], -3, -1)", &table());
        assert_eq!(result, Value::Array(vec![Value::Number(3.0), Value::Number(4.0)]));
    }

    #[test]
    fn distinct_preserves_first_occurrence_order() {
        let result = run("return Distinct([1, 2, 1, 3, 2])", &table());
        assert_eq!(result, Value::Array(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]));
    }

    #[test]
    fn join_defaults_to_a_comma_separator() {
        let result = run(r#"return Join(["a", "b", "c"])"#, &table());
        assert_eq!(result, Value::String("a,b,c".to_owned()));
    }

    #[test]
    fn index_of_reports_absence_as_negative_one() {
        let result = run("return IndexOf([1, 2, 3], 9)", &table());
        assert_eq!(result, Value::Number(-1.0));
    }
}
