//! Numeric builtins: scalar math plus array aggregation.
//!
//! Grounded in the teacher's `modules/math_mod.rs` (wraps `f64::{abs, floor, ceil,
//! sqrt, pow}` one-to-one) — this crate's `Value::Number` is likewise always an `f64`
//!, so every function here is a thin, allocation-free wrapper
//! around the matching `f64` method, raising [`MessageCode::DivisionByZero`] or a
//! domain error the same way the binary `/` and `%` operators already do in
//! `operators.rs` rather than returning `NaN`/`inf` silently.

use crate::{
    diagnostics::MessageCode,
    errors::RunResult,
    function_table::{CallArg, FunctionTable, HostContext},
    signature::{Param, ParamType, Signature},
    stdlib::helpers::{array_at, domain_error, number_at},
    value::Value,
};

pub fn register(table: &mut FunctionTable) {
    table.register_builtin(Signature::new("Abs", vec![Param::required("value", ParamType::Number)], ParamType::Number), abs);
    table.register_builtin(Signature::new("Floor", vec![Param::required("value", ParamType::Number)], ParamType::Number), floor);
    table.register_builtin(Signature::new("Ceil", vec![Param::required("value", ParamType::Number)], ParamType::Number), ceil);
    table.register_builtin(Signature::new("Round", vec![Param::required("value", ParamType::Number)], ParamType::Number), round);
    table.register_builtin(
        Signature::new("Sqrt", vec![Param::required("value", ParamType::Number)], ParamType::Number),
        sqrt,
    );
    table.register_builtin(
        Signature::new("Pow", vec![Param::required("base", ParamType::Number), Param::required("exponent", ParamType::Number)], ParamType::Number),
        pow,
    );
    table.register_builtin(
        Signature::new("Min", vec![Param::required("a", ParamType::Number), Param::required("b", ParamType::Number)], ParamType::Number),
        min,
    );
    table.register_builtin(
        Signature::new("Max", vec![Param::required("a", ParamType::Number), Param::required("b", ParamType::Number)], ParamType::Number),
        max,
    );
    table.register_builtin(Signature::new("Sum", vec![Param::required("items", ParamType::Array)], ParamType::Number), sum);
    table.register_builtin(Signature::new("Average", vec![Param::required("items", ParamType::Array)], ParamType::Number), average);
    table.register_builtin(Signature::new("MinOf", vec![Param::required("items", ParamType::Array)], ParamType::Number), min_of);
    table.register_builtin(Signature::new("MaxOf", vec![Param::required("items", ParamType::Array)], ParamType::Number), max_of);
}

fn abs(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::Number(number_at(args, 0, "value")?.abs()))
}

fn floor(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::Number(number_at(args, 0, "value")?.floor()))
}

fn ceil(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::Number(number_at(args, 0, "value")?.ceil()))
}

fn round(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::Number(number_at(args, 0, "value")?.round()))
}

fn sqrt(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let value = number_at(args, 0, "value")?;
    if value < 0.0 {
        return Err(domain_error(MessageCode::InvalidType, vec!["value".to_owned(), "non-negative Number".to_owned(), "negative Number".to_owned()]));
    }
    Ok(Value::Number(value.sqrt()))
}

fn pow(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::Number(number_at(args, 0, "base")?.powf(number_at(args, 1, "exponent")?)))
}

fn min(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::Number(number_at(args, 0, "a")?.min(number_at(args, 1, "b")?)))
}

fn max(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::Number(number_at(args, 0, "a")?.max(number_at(args, 1, "b")?)))
}

fn numbers_of(items: &[Value], what: &str) -> RunResult<Vec<f64>> {
    items
        .iter()
        .map(|item| item.as_number().ok_or_else(|| domain_error(MessageCode::InvalidType, vec![what.to_owned(), "Number".to_owned(), item.value_type().to_string()])))
        .collect()
}

fn sum(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?;
    Ok(Value::Number(numbers_of(items, "items element")?.into_iter().sum()))
}

/// An empty array is an `InvalidType`-flavored domain error rather than `NaN`.
fn average(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?;
    let numbers = numbers_of(items, "items element")?;
    if numbers.is_empty() {
        return Err(domain_error(MessageCode::DivisionByZero, vec!["Average of an empty array".to_owned()]));
    }
    #[allow(clippy::cast_precision_loss)]
    let len = numbers.len() as f64;
    Ok(Value::Number(numbers.into_iter().sum::<f64>() / len))
}

fn min_of(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?;
    let numbers = numbers_of(items, "items element")?;
    numbers
        .into_iter()
        .reduce(f64::min)
        .map(Value::Number)
        .ok_or_else(|| domain_error(MessageCode::DivisionByZero, vec!["MinOf of an empty array".to_owned()]))
}

fn max_of(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let items = array_at(args, 0, "items")?;
    let numbers = numbers_of(items, "items element")?;
    numbers
        .into_iter()
        .reduce(f64::max)
        .map(Value::Number)
        .ok_or_else(|| domain_error(MessageCode::DivisionByZero, vec!["MaxOf of an empty array".to_owned()]))
}
