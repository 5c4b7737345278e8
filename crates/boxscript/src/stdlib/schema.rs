//! Structural validation builtins: a lightweight
//! required-fields check plus full JSON-Schema validation for scripts that need more
//! than presence checking.
//!
//! Grounded in the teacher's `modules/json_mod.rs` bridge between the VM's `Value` and
//! `serde_json::Value`, extended here with the `jsonschema` crate (already in the
//! workspace dependency table for exactly this purpose) the way the pack's other
//! validation-heavy examples lean on it rather than hand-rolling a schema walker.

use crate::{
    diagnostics::MessageCode,
    errors::RunResult,
    function_table::{CallArg, FunctionTable, HostContext},
    signature::{Param, ParamType, Signature},
    stdlib::helpers::{array_at, domain_error, object_at, string_at},
    value::Value,
};

pub fn register(table: &mut FunctionTable) {
    table.register_builtin(
        Signature::new(
            "HasRequiredFields",
            vec![Param::required("subject", ParamType::Object), Param::required("fields", ParamType::Array)],
            ParamType::Boolean,
        ),
        has_required_fields,
    );
    table.register_builtin(
        Signature::new("MatchesSchema", vec![Param::required("subject", ParamType::Any), Param::required("schemaJson", ParamType::String)], ParamType::Boolean),
        matches_schema,
    );
    table.register_builtin(
        Signature::new("ValidateSchema", vec![Param::required("subject", ParamType::Any), Param::required("schemaJson", ParamType::String)], ParamType::Array),
        validate_schema,
    );
}

fn has_required_fields(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let subject = object_at(args, 0, "subject")?;
    let fields = array_at(args, 1, "fields")?;
    for field in fields {
        let Some(name) = field.as_str() else {
            return Err(domain_error(MessageCode::InvalidType, vec!["fields element".to_owned(), "String".to_owned(), field.value_type().to_string()]));
        };
        if !subject.contains_key(name) {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

fn compiled_schema(schema_json: &str) -> RunResult<jsonschema::Validator> {
    let schema = serde_json::from_str(schema_json).map_err(|e| domain_error(MessageCode::JsonParseError, vec![e.to_string()]))?;
    jsonschema::validator_for(&schema).map_err(|e| domain_error(MessageCode::SchemaValidationFailed, vec![e.to_string()]))
}

fn matches_schema(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let subject = crate::value::to_json_value(crate::stdlib::helpers::value_at(args, 0));
    let validator = compiled_schema(string_at(args, 1, "schemaJson")?)?;
    Ok(Value::Boolean(validator.is_valid(&subject)))
}

/// Returns every violation message as an array of strings rather than a single
/// boolean, for scripts that want to surface *why* a document failed validation.
fn validate_schema(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let subject = crate::value::to_json_value(crate::stdlib::helpers::value_at(args, 0));
    let validator = compiled_schema(string_at(args, 1, "schemaJson")?)?;
    let errors: Vec<Value> = validator.iter_errors(&subject).map(|e| Value::String(e.to_string())).collect();
    Ok(Value::Array(errors))
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
    fn has_required_fields_detects_a_missing_key() {
        let result = run(r#"return HasRequiredFields({"a": 1}, ["a", "b"])"#, &table());
        assert_eq!(result, Value::Boolean(false));
    }

    #[test]
    fn has_required_fields_passes_when_all_present() {
        let result = run(r#"return HasRequiredFields({"a": 1, "b": 2}, ["a", "b"])"#, &table());
        assert_eq!(result, Value::Boolean(true));
    }

    #[test]
    fn matches_schema_checks_the_type_keyword() {
        let result = run(r#"return MatchesSchema(5, "{\"type\": \"number\"}")"#, &table());
        assert_eq!(result, Value::Boolean(true));
    }

    #[test]
    fn validate_schema_reports_violations_for_a_mismatched_type() {
        let result = run(r#"return ValidateSchema("not a number", "{\"type\": \"number\"}")"#, &table());
        let Value::Array(errors) = result else { panic!("expected array") };
        assert!(!errors.is_empty());
    }
}
