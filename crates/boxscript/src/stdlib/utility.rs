//! General-purpose utilities: type introspection, deep
//! clone/equal/diff, JSON in/out, UUID generation, coalescing, base64, a
//! cancellation-aware sleep, and cryptographically-sourced randomness.
//!
//! Grounded in the teacher's `builtins/` one-function-per-file organization for the
//! miscellaneous builtins that don't fit a single thematic module (`type`, `id`,
//! `repr`) and in `modules/` for the heavier ones (`json`, `uuid`, `base64`, `random`,
//! `time.sleep`). `RandomInt`/`RandomString`/`NewGuid` draw from `rand`'s
//! `thread_rng` — the same engine the teacher's `modules/random_mod.rs` wraps — which
//! is ChaCha-based and cryptographically secure, satisfying the spec's requirement
//! that these three builtins use a CSPRNG.

use std::time::Duration;

use base64::Engine as _;
use indexmap::IndexMap;
use rand::Rng;

use crate::{
    diagnostics::MessageCode,
    errors::RunResult,
    function_table::{CallArg, FunctionTable, HostContext},
    signature::{Param, ParamType, Signature},
    stdlib::helpers::{domain_error, number_at, opt_number_at, string_at, value_at},
    value::{self, Value, deep_eq},
};

pub fn register(table: &mut FunctionTable) {
    table.register_builtin(Signature::new("TypeOf", vec![Param::required("value", ParamType::Any)], ParamType::String), type_of);
    table.register_builtin(Signature::new("DeepClone", vec![Param::required("value", ParamType::Any)], ParamType::Any), deep_clone);
    table.register_builtin(
        Signature::new("DeepEqual", vec![Param::required("a", ParamType::Any), Param::required("b", ParamType::Any)], ParamType::Boolean),
        deep_equal,
    );
    table.register_builtin(
        Signature::new("Diff", vec![Param::required("a", ParamType::Object), Param::required("b", ParamType::Object)], ParamType::Object),
        diff,
    );
    table.register_builtin(Signature::new("ToJson", vec![Param::required("value", ParamType::Any)], ParamType::String), to_json);
    table.register_builtin(Signature::new("FromJson", vec![Param::required("text", ParamType::String)], ParamType::Any), from_json);
    table.register_builtin(Signature::new("NewGuid", vec![], ParamType::String), new_guid);
    table.register_builtin(
        Signature::new("Coalesce", vec![Param::required("a", ParamType::Any), Param::required("b", ParamType::Any)], ParamType::Any),
        coalesce,
    );
    table.register_builtin(Signature::new("Base64Encode", vec![Param::required("text", ParamType::String)], ParamType::String), base64_encode);
    table.register_builtin(Signature::new("Base64Decode", vec![Param::required("encoded", ParamType::String)], ParamType::String), base64_decode);
    table.register_builtin(Signature::new("Sleep", vec![Param::required("seconds", ParamType::Number)], ParamType::Null), sleep);
    table.register_builtin(
        Signature::new("RandomInt", vec![Param::required("min", ParamType::Number), Param::required("max", ParamType::Number)], ParamType::Number),
        random_int,
    );
    table.register_builtin(
        Signature::new("RandomString", vec![Param::required("length", ParamType::Number), Param::optional("alphabet", ParamType::String)], ParamType::String),
        random_string,
    );
}

fn type_of(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::String(value_at(args, 0).value_type().to_string().to_lowercase()))
}

fn deep_clone(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(value_at(args, 0).clone())
}

fn deep_equal(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::Boolean(deep_eq(value_at(args, 0), value_at(args, 1))))
}

/// A shallow, top-level key diff: `{"added": {...}, "removed": {...}, "changed": {...}}`,
/// each an object of the differing key/value pairs (`changed` reports `b`'s value).
/// Keys present and `deep_eq` in both are omitted entirely.
fn diff(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let a = crate::stdlib::helpers::object_at(args, 0, "a")?;
    let b = crate::stdlib::helpers::object_at(args, 1, "b")?;
    let mut added = IndexMap::new();
    let mut removed = IndexMap::new();
    let mut changed = IndexMap::new();
    for (key, a_value) in a {
        match b.get(key) {
            None => {
                removed.insert(key.clone(), a_value.clone());
            }
            Some(b_value) if !deep_eq(a_value, b_value) => {
                changed.insert(key.clone(), b_value.clone());
            }
            Some(_) => {}
        }
    }
    for (key, b_value) in b {
        if !a.contains_key(key) {
            added.insert(key.clone(), b_value.clone());
        }
    }
    let mut result = IndexMap::new();
    result.insert("added".to_owned(), Value::Object(added));
    result.insert("removed".to_owned(), Value::Object(removed));
    result.insert("changed".to_owned(), Value::Object(changed));
    Ok(Value::Object(result))
}

fn to_json(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::String(value::to_json_string(value_at(args, 0))))
}

fn from_json(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let text = string_at(args, 0, "text")?;
    value::from_json_str(text).map_err(|e| domain_error(MessageCode::JsonParseError, vec![e.to_string()]))
}

fn new_guid(_args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::String(uuid::Uuid::new_v4().to_string()))
}

/// Returns `a` unless it is `null`, in which case it returns `b`.
fn coalesce(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let a = value_at(args, 0);
    if matches!(a, Value::Null) { Ok(value_at(args, 1).clone()) } else { Ok(a.clone()) }
}

fn base64_encode(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let text = string_at(args, 0, "text")?;
    Ok(Value::String(base64::engine::general_purpose::STANDARD.encode(text.as_bytes())))
}

fn base64_decode(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let encoded = string_at(args, 0, "encoded")?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| domain_error(MessageCode::Base64DecodeError, vec![e.to_string()]))?;
    String::from_utf8(bytes)
        .map(Value::String)
        .map_err(|e| domain_error(MessageCode::Base64DecodeError, vec![e.to_string()]))
}

/// Sleeps in short slices, polling cancellation between each so a cancelled or
/// time-limited run doesn't block past its budget for the whole requested duration.
fn sleep(args: &[CallArg], ctx: &mut dyn HostContext) -> RunResult<Value> {
    const SLICE: Duration = Duration::from_millis(20);
    let seconds = number_at(args, 0, "seconds")?.max(0.0);
    let mut remaining = Duration::from_secs_f64(seconds);
    while remaining > Duration::ZERO {
        ctx.poll_cancelled()?;
        let slice = remaining.min(SLICE);
        std::thread::sleep(slice);
        remaining -= slice;
    }
    Ok(Value::Null)
}

fn random_int(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let min = number_at(args, 0, "min")?;
    let max = number_at(args, 1, "max")?;
    if max < min {
        return Err(domain_error(MessageCode::InvalidType, vec!["max".to_owned(), "Number >= min".to_owned(), max.to_string()]));
    }
    #[allow(clippy::cast_possible_truncation)]
    let (lo, hi) = (min.round() as i64, max.round() as i64);
    let value = rand::thread_rng().gen_range(lo..=hi);
    Ok(Value::Number(value as f64))
}

const DEFAULT_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn random_string(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let length = number_at(args, 0, "length")?;
    if length < 0.0 {
        return Err(domain_error(MessageCode::InvalidType, vec!["length".to_owned(), "non-negative Number".to_owned(), length.to_string()]));
    }
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let length = length as usize;
    let alphabet: Vec<char> = crate::stdlib::helpers::opt_string_at(args, 1, "alphabet")?.unwrap_or(DEFAULT_ALPHABET).chars().collect();
    if alphabet.is_empty() {
        return Err(domain_error(MessageCode::InvalidType, vec!["alphabet".to_owned(), "non-empty String".to_owned(), "empty String".to_owned()]));
    }
    let mut rng = rand::thread_rng();
    let out: String = (0..length).map(|_| alphabet[rng.gen_range(0..alphabet.len())]).collect();
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
    fn type_of_reports_the_lowercase_tag() {
        let t = table();
        assert_eq!(run("return TypeOf(5)", &t), Value::String("number".to_owned()));
        assert_eq!(run(r#"return TypeOf("x")"#, &t), Value::String("string".to_owned()));
        assert_eq!(run("return TypeOf(null)", &t), Value::String("null".to_owned()));
    }

    #[test]
    fn coalesce_falls_through_null() {
        let t = table();
        assert_eq!(run("return Coalesce(null, 5)", &t), Value::Number(5.0));
        assert_eq!(run("return Coalesce(3, 5)", &t), Value::Number(3.0));
    }

    #[test]
    fn base64_round_trips_through_encode_and_decode() {
        let t = table();
        let encoded = run(r#"return Base64Encode("hello")"#, &t);
        assert_eq!(encoded, Value::String("aGVsbG8=".to_owned()));
        assert_eq!(run(r#"return Base64Decode("aGVsbG8=")"#, &t), Value::String("hello".to_owned()));
    }

    #[test]
    fn diff_reports_added_removed_and_changed_keys() {
        let result = run(r#"return Diff({"a": 1, "b": 2}, {"b": 3, "c": 4})"#, &table());
        let Value::Object(obj) = result else { panic!("expected object") };
        assert_eq!(obj.get("added"), Some(&value::from_json_str(r#"{"c":4}"#).unwrap()));
        assert_eq!(obj.get("removed"), Some(&value::from_json_str(r#"{"a":1}"#).unwrap()));
        assert_eq!(obj.get("changed"), Some(&value::from_json_str(r#"{"b":3}"#).unwrap()));
    }

    #[test]
    fn to_json_and_from_json_round_trip_an_object() {
        let t = table();
        let json = run(r#"return ToJson({"a": 1})"#, &t);
        assert_eq!(json, Value::String("{\"a\":1}".to_owned()));
        let parsed = run(r#"return FromJson("{\"a\": 1}")"#, &t);
        assert_eq!(parsed, crate::value::from_json_str(r#"{"a":1}"#).unwrap());
    }

    #[test]
    fn random_int_stays_within_the_requested_bounds() {
        let result = run("return RandomInt(1, 1)", &table());
        assert_eq!(result, Value::Number(1.0));
    }
}
