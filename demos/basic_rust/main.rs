use std::sync::Arc;

use boxscript::{
    ExecutionContext, FunctionTable, Pipeline,
    function_table::CallArg,
    signature::{Param, ParamType, Signature},
    value::{self, Value},
};

fn main() {
    // --- Basic execution ---
    let code = "data.sum = data.x + data.y";
    let program = Pipeline::compile(code, FunctionTable::new()).expect("compiles");
    let input = value::from_json_str(r#"{"x": 10, "y": 20}"#).expect("valid input");
    let outcome = Pipeline::execute(&program, input, &ExecutionContext::unlimited());
    let result = outcome.value.expect("runs to completion");
    assert_eq!(result, value::from_json_str(r#"{"x": 10, "y": 20, "sum": 30}"#).unwrap());
    println!("Basic: {result}");

    // --- Iterative Fibonacci ---
    // The language has no user-defined recursive functions (§1 Non-goals), so a script
    // that wants fib(n) reaches for a loop the same way a data-pipeline author would.
    let fib_code = r#"
var a = 0
var b = 1
for i from 0 to data.n - 1 {
    var next = a + b
    a = b
    b = next
}
return a
"#;
    let fib_program = Pipeline::compile(fib_code, FunctionTable::new()).expect("compiles");
    let fib_input = value::from_json_str(r#"{"n": 10}"#).unwrap();
    let fib_outcome = Pipeline::execute(&fib_program, fib_input, &ExecutionContext::unlimited());
    assert_eq!(fib_outcome.value, Some(Value::Number(55.0)));
    println!("Fibonacci(10): {:?}", fib_outcome.value);

    // --- Host functions ---
    // A host exposes capability outside the sandbox (network, disk, clock) as a
    // function the script calls like any builtin; the linker and executor treat it
    // identically to a stdlib function (§4.5, §4.6.1).
    let mut host_functions = FunctionTable::new();
    host_functions.register_host(
        Signature::new("FetchLength", vec![Param::required("url", ParamType::String)], ParamType::Number),
        Arc::new(|args: &[CallArg], _ctx| {
            let Some(Value::String(url)) = args[0].as_value() else {
                unreachable!("linker guarantees a String at this position");
            };
            // A real host would perform the fetch here; the demo simulates one.
            Ok(Value::Number(url.len() as f64))
        }),
    );

    let ext_code = "return FetchLength(data.url)";
    let ext_program = Pipeline::compile(ext_code, host_functions).expect("compiles");
    let ext_input = value::from_json_str(r#"{"url": "https://example.com"}"#).unwrap();
    let ext_outcome = Pipeline::execute(&ext_program, ext_input, &ExecutionContext::unlimited());
    println!("Host function result: {:?}", ext_outcome.value);

    println!("All examples passed.");
}
