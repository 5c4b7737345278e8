use std::{env, fs, process::ExitCode, time::Instant};

use boxscript::{ExecutionContext, FunctionTable, Pipeline, Value};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let file_path = if args.len() > 1 { &args[1] } else { "example.box" };
    let code = match read_file(file_path) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let data = match read_data_arg(args.get(2)) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let start = Instant::now();
    let program = match Pipeline::compile(&code, FunctionTable::new()) {
        Ok(program) => program,
        Err(diagnostics) => {
            let elapsed = start.elapsed();
            eprintln!("compilation failed after {elapsed:?}:");
            for diagnostic in &diagnostics {
                eprintln!("  {diagnostic}");
            }
            return ExitCode::FAILURE;
        }
    };
    for diagnostic in program.diagnostics() {
        eprintln!("{diagnostic}");
    }

    let outcome = Pipeline::execute(&program, data, &ExecutionContext::unlimited());
    let elapsed = start.elapsed();
    for diagnostic in &outcome.diagnostics {
        eprintln!("{diagnostic}");
    }

    match outcome.value {
        Some(value) => {
            eprintln!("success after {elapsed:?}");
            if let Some(message) = &outcome.message {
                eprintln!("message: {message}");
            }
            println!("{}", boxscript::value::to_json_string(&value));
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("failed after {elapsed:?}");
            ExitCode::FAILURE
        }
    }
}

fn read_data_arg(arg: Option<&String>) -> Result<Value, String> {
    let Some(path_or_json) = arg else {
        return boxscript::value::from_json_str("{}").map_err(|err| format!("invalid default data JSON: {err}"));
    };
    let text = fs::read_to_string(path_or_json).unwrap_or_else(|_| path_or_json.clone());
    boxscript::value::from_json_str(&text).map_err(|err| format!("invalid data JSON: {err}"))
}

fn read_file(file_path: &str) -> Result<String, String> {
    eprintln!("Reading file: {file_path}");
    match fs::metadata(file_path) {
        Ok(metadata) => {
            if !metadata.is_file() {
                return Err(format!("Error: {file_path} is not a file"));
            }
        }
        Err(err) => {
            return Err(format!("Error reading {file_path}: {err}"));
        }
    }
    match fs::read_to_string(file_path) {
        Ok(contents) => Ok(contents),
        Err(err) => Err(format!("Error reading file: {err}")),
    }
}
