//! The value model's operator, coercion, and container-access tables.
//!
//! Every function here is a pure, allocation-shy transform on `Value`s — no AST, no
//! scope, no execution context. Grounded in the teacher's `object.rs`/`py_hash.rs`
//! split between "operator semantics" and "identity/hashing", simplified: this
//! language's values are never aliased except through the scope cells in `scope.rs`,
//! so there is no reference-identity concept to speak of here, only structural
//! equality (`value::deep_eq`).

use crate::{
    ast::{BinaryOp, UnaryOp},
    diagnostics::MessageCode,
    errors::{RunError, RunResult},
    value::{Value, ValueType, deep_eq},
};

/// `EvaluateBinary` for every operator *except* `and`/`or`, which the executor handles
/// directly so it can short-circuit without evaluating the right operand at all
///. Passing `And`/`Or`
/// here is a caller bug, not a runtime condition a script can trigger.
pub fn evaluate_binary(op: BinaryOp, lhs: Value, rhs: Value) -> RunResult<Value> {
    match op {
        BinaryOp::Add => add(lhs, rhs),
        BinaryOp::Sub => numeric(lhs, rhs, |a, b| a - b),
        BinaryOp::Mul => numeric(lhs, rhs, |a, b| a * b),
        BinaryOp::Div => {
            let (a, b) = both_numbers(lhs, rhs)?;
            if b == 0.0 { Err(RunError::new(MessageCode::DivisionByZero, vec![])) } else { Ok(Value::Number(a / b)) }
        }
        BinaryOp::Mod => {
            let (a, b) = both_numbers(lhs, rhs)?;
            if b == 0.0 { Err(RunError::new(MessageCode::ModuloByZero, vec![])) } else { Ok(Value::Number(a % b)) }
        }
        BinaryOp::Lt => relational(lhs, rhs, |ord| ord.is_lt()),
        BinaryOp::Le => relational(lhs, rhs, |ord| ord.is_le()),
        BinaryOp::Gt => relational(lhs, rhs, |ord| ord.is_gt()),
        BinaryOp::Ge => relational(lhs, rhs, |ord| ord.is_ge()),
        BinaryOp::Eq => Ok(Value::Boolean(deep_eq(&lhs, &rhs))),
        BinaryOp::Ne => Ok(Value::Boolean(!deep_eq(&lhs, &rhs))),
        BinaryOp::And | BinaryOp::Or => unreachable!("logical operators short-circuit in the executor"),
    }
}

fn add(lhs: Value, rhs: Value) -> RunResult<Value> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
        (Value::Array(mut a), Value::Array(b)) => {
            a.extend(b);
            Ok(Value::Array(a))
        }
        (a, b) => Err(type_mismatch_for_arithmetic(&a, &b)),
    }
}

fn numeric(lhs: Value, rhs: Value, f: impl Fn(f64, f64) -> f64) -> RunResult<Value> {
    let (a, b) = both_numbers(lhs, rhs)?;
    Ok(Value::Number(f(a, b)))
}

fn both_numbers(lhs: Value, rhs: Value) -> RunResult<(f64, f64)> {
    match (&lhs, &rhs) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(type_mismatch_for_arithmetic(&lhs, &rhs)),
    }
}

fn type_mismatch_for_arithmetic(lhs: &Value, rhs: &Value) -> RunError {
    RunError::new(MessageCode::IncomparableTypes, vec![lhs.value_type().to_string(), rhs.value_type().to_string()])
}

fn relational(lhs: Value, rhs: Value, accept: impl Fn(std::cmp::Ordering) -> bool) -> RunResult<Value> {
    let ordering = match (&lhs, &rhs) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        _ => None,
    };
    match ordering {
        Some(ord) => Ok(Value::Boolean(accept(ord))),
        None => Err(RunError::new(
            MessageCode::IncomparableTypes,
            vec![lhs.value_type().to_string(), rhs.value_type().to_string()],
        )),
    }
}

/// `EvaluateUnary`. `++`/`--` return the incremented/decremented number; the
/// caller (compound-assignment lowering) is responsible for writing the result back
/// through the same access path the operand came from.
pub fn evaluate_unary(op: UnaryOp, value: Value) -> RunResult<Value> {
    match op {
        UnaryOp::Neg => match value {
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(not_a_number(&other)),
        },
        UnaryOp::Not => Ok(Value::Boolean(!value.is_truthy())),
        UnaryOp::PreIncrement => match value {
            Value::Number(n) => Ok(Value::Number(n + 1.0)),
            other => Err(not_a_number(&other)),
        },
        UnaryOp::PreDecrement => match value {
            Value::Number(n) => Ok(Value::Number(n - 1.0)),
            other => Err(not_a_number(&other)),
        },
    }
}

fn not_a_number(value: &Value) -> RunError {
    RunError::new(MessageCode::InvalidType, vec!["operand".to_owned(), "Number".to_owned(), value.value_type().to_string()])
}

/// `GetProperty(v, key)`.
pub fn get_property(value: &Value, key: &str) -> RunResult<Value> {
    match value {
        Value::Object(map) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
        Value::Null => Err(RunError::new(MessageCode::PropertyAccessOnNull, vec![key.to_owned()])),
        other => Err(RunError::new(
            MessageCode::PropertyAccessInvalidType,
            vec![key.to_owned(), other.value_type().to_string()],
        )),
    }
}

/// `GetIndex(v, idx)`. Negative indices wrap from the end on read.
pub fn get_index(value: &Value, index: f64) -> RunResult<Value> {
    match value {
        Value::Array(items) => {
            let idx = resolve_read_index(index, items.len())?;
            Ok(items[idx].clone())
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = resolve_read_index(index, chars.len())?;
            Ok(Value::String(chars[idx].to_string()))
        }
        Value::Object(_) => get_property(value, &format_index_as_key(index)),
        Value::Null => Err(RunError::new(MessageCode::IndexAccessOnNull, vec![])),
        other => Err(RunError::new(
            MessageCode::PropertyAccessInvalidType,
            vec![format_index_as_key(index), other.value_type().to_string()],
        )),
    }
}

fn format_index_as_key(index: f64) -> String {
    crate::value::format_number(index)
}

fn resolve_read_index(index: f64, len: usize) -> RunResult<usize> {
    let idx = index as i64;
    let resolved = if idx < 0 { idx + len as i64 } else { idx };
    if resolved < 0 || resolved as usize >= len {
        Err(RunError::new(MessageCode::IndexOutOfRange, vec![idx.to_string(), len.to_string()]))
    } else {
        Ok(resolved as usize)
    }
}

/// `SetProperty(v, key, newValue)`. Mutates `value` in place.
pub fn set_property(value: &mut Value, key: &str, new_value: Value) -> RunResult<()> {
    match value {
        Value::Object(map) => {
            map.insert(key.to_owned(), new_value);
            Ok(())
        }
        other => Err(RunError::new(
            MessageCode::SetPropertyOnNonObject,
            vec![key.to_owned(), other.value_type().to_string()],
        )),
    }
}

/// `SetIndex(v, idx, newValue)`. Negative indices are rejected on write.
pub fn set_index(value: &mut Value, index: f64, new_value: Value) -> RunResult<()> {
    let idx = index as i64;
    if idx < 0 {
        return Err(RunError::new(MessageCode::NegativeIndex, vec![idx.to_string()]));
    }
    match value {
        Value::Array(items) => {
            let idx = idx as usize;
            if idx >= items.len() {
                return Err(RunError::new(MessageCode::IndexOutOfRange, vec![idx.to_string(), items.len().to_string()]));
            }
            items[idx] = new_value;
            Ok(())
        }
        Value::Object(_) => set_property(value, &format_index_as_key(index), new_value),
        other => Err(RunError::new(MessageCode::SetIndexOnNonContainer, vec![other.value_type().to_string()])),
    }
}

/// Mutable navigation through an intermediate `Property` segment of an assignment
/// target's path (e.g. the `.a` in `data.a.b = 5`). Unlike `get_property`, an absent
/// key is auto-vivified to `Null` rather than treated as a successful read of `Null`:
/// the caller is about to recurse into it to reach a deeper write target, and the
/// placeholder lets the *next* navigation step (or the terminal `set_property`/
/// `set_index`) raise the spec-mandated error (`PropertyAccessOnNull`,
/// `SetPropertyOnNonObject`, …) for whatever turns out to be there — rather than this
/// function guessing which error applies before it knows how deep the path goes.
pub fn get_property_mut<'v>(value: &'v mut Value, key: &str) -> RunResult<&'v mut Value> {
    match value {
        Value::Object(map) => Ok(map.entry(key.to_owned()).or_insert(Value::Null)),
        Value::Null => Err(RunError::new(MessageCode::PropertyAccessOnNull, vec![key.to_owned()])),
        other => Err(RunError::new(
            MessageCode::PropertyAccessInvalidType,
            vec![key.to_owned(), other.value_type().to_string()],
        )),
    }
}

/// Mutable navigation through an intermediate `Index` segment of an assignment target's
/// path. Arrays are never auto-grown; an out-of-range index is
/// a genuine `IndexOutOfRange`, not something a placeholder can paper over.
pub fn get_index_mut<'v>(value: &'v mut Value, index: f64) -> RunResult<&'v mut Value> {
    match value {
        Value::Array(items) => {
            let idx = resolve_read_index(index, items.len())?;
            Ok(&mut items[idx])
        }
        Value::Object(_) => get_property_mut(value, &format_index_as_key(index)),
        Value::Null => Err(RunError::new(MessageCode::IndexAccessOnNull, vec![])),
        other => Err(RunError::new(MessageCode::SetIndexOnNonContainer, vec![other.value_type().to_string()])),
    }
}

/// `CoerceToType(v, expectedType, varName)`. `Any` always passes.
pub fn coerce_to_type(value: Value, expected: ValueType, var_name: &str) -> RunResult<Value> {
    if expected == ValueType::Any || value.value_type() == expected {
        Ok(value)
    } else {
        Err(RunError::new(
            MessageCode::InvalidType,
            vec![var_name.to_owned(), expected.to_string(), value.value_type().to_string()],
        ))
    }
}

/// `ToIterable(v)`. Objects yield `{ key, value }` pairs in insertion order.
pub fn to_iterable(value: &Value) -> RunResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        Value::Object(map) => Ok(map
            .iter()
            .map(|(k, v)| {
                let mut pair = indexmap::IndexMap::new();
                pair.insert("key".to_owned(), Value::String(k.clone()));
                pair.insert("value".to_owned(), v.clone());
                Value::Object(pair)
            })
            .collect()),
        other => Err(RunError::new(MessageCode::NotIterable, vec![other.value_type().to_string()])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn add_concatenates_strings_and_arrays() {
        assert_eq!(
            evaluate_binary(BinaryOp::Add, Value::String("a".into()), Value::String("b".into())).unwrap(),
            Value::String("ab".into())
        );
        assert_eq!(
            evaluate_binary(BinaryOp::Add, Value::Array(vec![Value::Number(1.0)]), Value::Array(vec![Value::Number(2.0)]))
                .unwrap(),
            Value::Array(vec![Value::Number(1.0), Value::Number(2.0)])
        );
    }

    #[test]
    fn division_by_zero_raises() {
        let err = evaluate_binary(BinaryOp::Div, Value::Number(1.0), Value::Number(0.0)).unwrap_err();
        assert_eq!(err.code, MessageCode::DivisionByZero);
    }

    #[test]
    fn relational_rejects_mixed_types() {
        let err = evaluate_binary(BinaryOp::Lt, Value::Number(1.0), Value::String("a".into())).unwrap_err();
        assert_eq!(err.code, MessageCode::IncomparableTypes);
    }

    #[test]
    fn negative_index_reads_from_end() {
        let arr = Value::Array(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]);
        assert_eq!(get_index(&arr, -1.0).unwrap(), Value::Number(3.0));
    }

    #[test]
    fn negative_index_rejected_on_write() {
        let mut arr = Value::Array(vec![Value::Number(1.0)]);
        let err = set_index(&mut arr, -1.0, Value::Number(9.0)).unwrap_err();
        assert_eq!(err.code, MessageCode::NegativeIndex);
    }

    #[test]
    fn get_property_on_null_raises() {
        let err = get_property(&Value::Null, "x").unwrap_err();
        assert_eq!(err.code, MessageCode::PropertyAccessOnNull);
    }

    #[test]
    fn coerce_any_always_passes() {
        assert_eq!(coerce_to_type(Value::Number(1.0), ValueType::Any, "x").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn get_property_mut_auto_vivifies_missing_key() {
        let mut obj = Value::Object(indexmap::IndexMap::new());
        let slot = get_property_mut(&mut obj, "a").unwrap();
        assert_eq!(*slot, Value::Null);
        *slot = Value::Number(1.0);
        assert_eq!(get_property(&obj, "a").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn get_index_mut_out_of_range_is_an_error_not_a_placeholder() {
        let mut arr = Value::Array(vec![Value::Number(1.0)]);
        let err = get_index_mut(&mut arr, 5.0).unwrap_err();
        assert_eq!(err.code, MessageCode::IndexOutOfRange);
    }
}
