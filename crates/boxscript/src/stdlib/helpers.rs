//! Argument-extraction helpers shared by every stdlib submodule.
//!
//! The linker already guarantees arity and the lambda/non-lambda shape of each
//! position; what's left for a builtin to check itself is the runtime `Value`
//! type underneath each non-lambda argument.

use indexmap::IndexMap;

use crate::{
    diagnostics::MessageCode,
    errors::{RunError, RunResult},
    function_table::CallArg,
    value::Value,
};

fn invalid_type(what: &str, expected: &str, actual: &Value) -> RunError {
    RunError::new(MessageCode::InvalidType, vec![what.to_owned(), expected.to_owned(), actual.value_type().to_string()])
}

/// The plain `Value` at `args[index]`, or a `RuntimeError` if that position somehow
/// carries a lambda (the linker's structural check already rules this out for every
/// signature that reaches a builtin, so this is a defensive `unreachable!`-adjacent
/// path rather than a user-triggerable condition).
pub fn value_at<'a>(args: &'a [CallArg], index: usize) -> &'a Value {
    args[index].as_value().expect("linker guarantees non-lambda positions carry a Value")
}

pub fn number_at(args: &[CallArg], index: usize, what: &str) -> RunResult<f64> {
    value_at(args, index).as_number().ok_or_else(|| invalid_type(what, "Number", value_at(args, index)))
}

pub fn string_at<'a>(args: &'a [CallArg], index: usize, what: &str) -> RunResult<&'a str> {
    value_at(args, index).as_str().ok_or_else(|| invalid_type(what, "String", value_at(args, index)))
}

pub fn array_at<'a>(args: &'a [CallArg], index: usize, what: &str) -> RunResult<&'a [Value]> {
    match value_at(args, index) {
        Value::Array(items) => Ok(items),
        other => Err(invalid_type(what, "Array", other)),
    }
}

pub fn object_at<'a>(args: &'a [CallArg], index: usize, what: &str) -> RunResult<&'a IndexMap<String, Value>> {
    match value_at(args, index) {
        Value::Object(map) => Ok(map),
        other => Err(invalid_type(what, "Object", other)),
    }
}

/// `args[index]` as an integer index (truncating toward zero, matching
/// `operators::get_index`'s own `as i64` cast), or `None` if `index` is past the end
/// of `args` (used for trailing-optional-parameter builtins).
pub fn opt_number_at(args: &[CallArg], index: usize, what: &str) -> RunResult<Option<f64>> {
    if index >= args.len() { Ok(None) } else { Ok(Some(number_at(args, index, what)?)) }
}

pub fn opt_string_at<'a>(args: &'a [CallArg], index: usize, what: &str) -> RunResult<Option<&'a str>> {
    if index >= args.len() { Ok(None) } else { Ok(Some(string_at(args, index, what)?)) }
}

pub fn domain_error(code: MessageCode, args: Vec<String>) -> RunError {
    RunError::new(code, args)
}
