//! End-to-end scenarios: compile real source text, execute it against a literal
//! `data` value, and assert on the result value, the completion message, and the
//! diagnostic list exactly the way a host embedding this engine would.

use std::sync::Arc;

use boxscript::function_table::{CallArg, FunctionTable, HostContext};
use boxscript::signature::{Param, ParamType, Signature};
use boxscript::value::Value;
use boxscript::{ExecutionContext, MessageCode, Pipeline, ResourceLimits};
use indexmap::IndexMap;

fn obj(pairs: &[(&str, Value)]) -> Value {
    let mut map = IndexMap::new();
    for (k, v) in pairs {
        map.insert((*k).to_owned(), v.clone());
    }
    Value::Object(map)
}

fn run(source: &str, data: Value) -> boxscript::pipeline::ExecutionOutcome {
    let program = Pipeline::compile(source, FunctionTable::new()).expect("compiles cleanly");
    Pipeline::execute(&program, data, &ExecutionContext::unlimited())
}

#[test]
fn returns_a_property_read_from_data() {
    let outcome = run("return data.name", obj(&[("name", Value::String("Alice".to_owned()))]));
    assert_eq!(outcome.value, Some(Value::String("Alice".to_owned())));
    assert!(outcome.diagnostics.is_empty());
}

#[test]
fn mutates_a_field_in_place_and_returns_the_same_data() {
    let outcome = run("data.n = data.n + 1", obj(&[("n", Value::Number(41.0))]));
    assert_eq!(outcome.value, Some(obj(&[("n", Value::Number(42.0))])));
}

#[test]
fn ascending_for_loop_with_step_builds_an_inclusive_range() {
    let source = "for x from 1 to 5 step 1 ascending { data.items = Append(data.items, x) }";
    let outcome = run(source, obj(&[("items", Value::Array(vec![]))]));
    let expected = Value::Array((1..=5).map(|n| Value::Number(f64::from(n))).collect());
    assert_eq!(outcome.value, Some(obj(&[("items", expected)])));
}

#[test]
fn division_by_zero_carries_the_declaration_line_as_its_location() {
    let program = Pipeline::compile("var x = 10 / 0", FunctionTable::new()).expect("compiles cleanly");
    let outcome = Pipeline::execute(&program, Value::Null, &ExecutionContext::unlimited());
    assert!(outcome.value.is_none());
    let diagnostic = outcome.diagnostics.iter().find(|d| d.code == MessageCode::DivisionByZero).expect("division by zero reported");
    let location = diagnostic.location.expect("runtime errors carry a source location");
    assert_eq!(location.line, 1);
}

#[test]
fn statement_limit_trips_after_exactly_the_configured_count() {
    let program = Pipeline::compile("while true { }", FunctionTable::new()).expect("compiles cleanly");
    let ctx = ExecutionContext::unlimited().with_limits(ResourceLimits::new().max_statements(100));
    let outcome = Pipeline::execute(&program, Value::Null, &ctx);
    assert!(outcome.value.is_none());
    assert!(outcome.diagnostics.iter().any(|d| d.code == MessageCode::StatementLimitExceeded));
}

#[test]
fn type_hint_violation_names_the_variable_and_both_types() {
    // The mismatch can only be known once the initializer expression is evaluated, so
    // this is a runtime diagnostic, not a compile-time one.
    let program = Pipeline::compile("var x: number = \"hi\"", FunctionTable::new()).expect("compiles cleanly");
    let outcome = Pipeline::execute(&program, Value::Null, &ExecutionContext::unlimited());
    assert!(outcome.value.is_none());
    let diagnostic = outcome.diagnostics.iter().find(|d| d.code == MessageCode::InvalidType).expect("InvalidType reported");
    assert!(diagnostic.args.iter().any(|a| a == "x"));
    assert!(diagnostic.args.iter().any(|a| a == "Number"));
    assert!(diagnostic.args.iter().any(|a| a == "String"));
}

#[test]
fn switch_falls_through_to_default_when_no_case_matches() {
    let source = r#"
        var result = ""
        switch data.code {
            case 1: result = "one"
            case 2, 3: result = "two-or-three"
            default: result = "other"
        }
        return result
    "#;
    let outcome = run(source, obj(&[("code", Value::Number(9.0))]));
    assert_eq!(outcome.value, Some(Value::String("other".to_owned())));

    let outcome = run(source, obj(&[("code", Value::Number(3.0))]));
    assert_eq!(outcome.value, Some(Value::String("two-or-three".to_owned())));
}

#[test]
fn foreach_iterates_object_entries_in_insertion_order() {
    let source = r#"
        var keys = []
        foreach entry in data {
            keys = Append(keys, entry.key)
        }
        return keys
    "#;
    let outcome = run(source, obj(&[("b", Value::Number(1.0)), ("a", Value::Number(2.0)), ("c", Value::Number(3.0))]));
    assert_eq!(
        outcome.value,
        Some(Value::Array(vec![Value::String("b".to_owned()), Value::String("a".to_owned()), Value::String("c".to_owned())]))
    );
}

#[test]
fn break_and_continue_interact_correctly_inside_a_while_loop() {
    let source = r#"
        var i = 0
        var total = 0
        while i < 10 {
            i = i + 1
            if i % 2 == 0 {
                continue
            }
            if i > 7 {
                break
            }
            total = total + i
        }
        return total
    "#;
    // odd numbers 1,3,5,7 summed before breaking at i == 9
    let outcome = run(source, Value::Null);
    assert_eq!(outcome.value, Some(Value::Number(16.0)));
}

#[test]
fn lambda_combinators_compose_map_and_where() {
    let source = r#"
        var doubled = Map(data.items, (x) => x * 2)
        var evens = Where(doubled, (x) => x % 4 == 0)
        return Sum(evens)
    "#;
    let outcome = run(source, obj(&[("items", Value::Array(vec![1.0, 2.0, 3.0, 4.0].into_iter().map(Value::Number).collect()))]));
    // doubled = [2,4,6,8]; evens divisible by 4 = [4,8]; sum = 12
    assert_eq!(outcome.value, Some(Value::Number(12.0)));
}

#[test]
fn fail_raises_script_failure_with_the_coerced_message() {
    let outcome = run(r#"fail "not allowed""#, Value::Null);
    assert!(outcome.value.is_none());
    let diagnostic = outcome.diagnostics.iter().find(|d| d.code == MessageCode::ScriptFailure).expect("ScriptFailure reported");
    assert!(diagnostic.args.iter().any(|a| a == "not allowed"));
}

#[test]
fn explicit_return_records_a_completion_message() {
    let outcome = run(r#"return "all good""#, Value::Null);
    assert_eq!(outcome.value, Some(Value::Null));
    assert_eq!(outcome.message.as_deref(), Some("all good"));
}

#[test]
fn negative_array_index_reads_from_the_end_but_rejects_writes() {
    let read_outcome = run("return data.items[-1]", obj(&[("items", Value::Array(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]))]));
    assert_eq!(read_outcome.value, Some(Value::Number(3.0)));

    let write_outcome = run("data.items[-1] = 9", obj(&[("items", Value::Array(vec![Value::Number(1.0)]))]));
    assert!(write_outcome.value.is_none());
    assert!(write_outcome.diagnostics.iter().any(|d| d.code == MessageCode::NegativeIndex));
}

#[test]
fn host_function_shadowing_a_builtin_emits_a_non_fatal_warning() {
    let mut host = FunctionTable::new();
    host.register_host(
        Signature::new("Abs", vec![Param::required("n", ParamType::Number)], ParamType::Number),
        Arc::new(|args: &[CallArg], _ctx: &mut dyn HostContext| Ok(args[0].as_value().cloned().unwrap_or(Value::Null))),
    );
    let program = Pipeline::compile("return Abs(-5)", host).expect("compiles cleanly");
    assert!(program.diagnostics().iter().any(|d| d.code == MessageCode::FunctionOverride));

    let outcome = Pipeline::execute(&program, Value::Null, &ExecutionContext::unlimited());
    // the overriding host implementation above is the identity function, not abs()
    assert_eq!(outcome.value, Some(Value::Number(-5.0)));
}

#[test]
fn host_function_is_reachable_from_script_source() {
    let mut host = FunctionTable::new();
    host.register_host(
        Signature::new("Greet", vec![Param::required("name", ParamType::String)], ParamType::String),
        Arc::new(|args: &[CallArg], _ctx: &mut dyn HostContext| {
            let name = args[0].as_value().and_then(Value::as_str).unwrap_or_default();
            Ok(Value::String(format!("Hello, {name}!")))
        }),
    );
    let program = Pipeline::compile(r#"return Greet(data.name)"#, host).expect("compiles cleanly");
    let outcome = Pipeline::execute(&program, obj(&[("name", Value::String("Bob".to_owned()))]), &ExecutionContext::unlimited());
    assert_eq!(outcome.value, Some(Value::String("Hello, Bob!".to_owned())));
}

#[test]
fn undeclared_variable_is_rejected_before_execution_ever_starts() {
    let diagnostics = Pipeline::compile("return x", FunctionTable::new()).unwrap_err();
    assert!(diagnostics.iter().any(|d| d.code == MessageCode::UndeclaredVariable));
}

#[test]
fn break_outside_a_loop_is_a_compile_time_error() {
    let diagnostics = Pipeline::compile("break", FunctionTable::new()).unwrap_err();
    assert!(diagnostics.iter().any(|d| d.code == MessageCode::BreakOutsideLoop));
}

#[test]
fn calling_an_undefined_function_is_caught_at_link_time() {
    let diagnostics = Pipeline::compile("return Frobnicate(data)", FunctionTable::new()).unwrap_err();
    assert!(diagnostics.iter().any(|d| d.code == MessageCode::UndefinedFunction));
}

#[test]
fn wrong_arity_is_caught_at_link_time_not_at_runtime() {
    let diagnostics = Pipeline::compile("return Abs(1, 2, 3)", FunctionTable::new()).unwrap_err();
    assert!(diagnostics.iter().any(|d| d.code == MessageCode::TooManyArguments));
}

#[test]
fn deep_equality_treats_two_nulls_as_equal_everywhere() {
    let outcome = run("return DeepEqual(null, null)", Value::Null);
    assert_eq!(outcome.value, Some(Value::Boolean(true)));

    let outcome = run("return null == null", Value::Null);
    assert_eq!(outcome.value, Some(Value::Boolean(true)));
}

#[test]
fn a_script_that_never_exceeds_limits_behaves_identically_with_limits_off() {
    let source = "for i from 1 to 50 step 1 ascending { data.sum = data.sum + i }\nreturn data.sum";
    let program = Pipeline::compile(source, FunctionTable::new()).expect("compiles cleanly");

    let unlimited = Pipeline::execute(&program, obj(&[("sum", Value::Number(0.0))]), &ExecutionContext::unlimited());
    let limited_ctx = ExecutionContext::unlimited().with_limits(
        ResourceLimits::new().max_statements(10_000).max_loop_iterations(10_000).max_call_depth(64),
    );
    let limited = Pipeline::execute(&program, obj(&[("sum", Value::Number(0.0))]), &limited_ctx);

    assert_eq!(unlimited.value, limited.value);
}

#[test]
fn compound_assignment_reads_through_the_same_path_it_writes() {
    let outcome = run("data.counters.hits += 5", obj(&[("counters", obj(&[("hits", Value::Number(10.0))]))]));
    assert_eq!(outcome.value, Some(obj(&[("counters", obj(&[("hits", Value::Number(15.0))]))])));
}

#[test]
fn a_successful_run_never_carries_an_error_severity_diagnostic() {
    let outcome = run("return data", Value::Null);
    assert!(outcome.diagnostics.iter().all(|d| d.severity != boxscript::Severity::Error));
}
