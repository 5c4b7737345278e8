//! Regular-expression builtins.
//!
//! Grounded in the teacher's `modules/re.rs`, which builds a [`fancy_regex::Regex`]
//! from a pattern string and surfaces `search`/`findall`/`sub`/`split` as free
//! functions. Untrusted patterns can exhibit catastrophic backtracking, which the
//! teacher's own regex layer has no defense against — a script here is untrusted
//! input by definition, so every compiled pattern is built
//! through [`fancy_regex::RegexBuilder::backtrack_limit`] rather than the bare
//! `Regex::new` the teacher calls, and a pattern that blows the limit surfaces as
//! [`MessageCode::RegexBudgetExceeded`] instead of hanging the host thread.

use fancy_regex::{Regex, RegexBuilder};

use crate::{
    diagnostics::MessageCode,
    errors::RunResult,
    function_table::{CallArg, FunctionTable, HostContext},
    signature::{Param, ParamType, Signature},
    stdlib::helpers::{domain_error, string_at},
    value::Value,
};

/// Backtracking steps a single match attempt may take before it is treated as a
/// compute-budget violation rather than a legitimate (if slow) match. Chosen generously
/// above what any well-formed pattern needs on realistic input sizes, while still
/// bounding a pathological pattern like `(a+)+b` to a bounded number of host-thread
/// cycles per call.
const BACKTRACK_LIMIT: usize = 1_000_000;

pub fn register(table: &mut FunctionTable) {
    table.register_builtin(
        Signature::new("RegexMatch", vec![Param::required("pattern", ParamType::String), Param::required("subject", ParamType::String)], ParamType::Boolean),
        regex_match,
    );
    table.register_builtin(
        Signature::new("RegexFind", vec![Param::required("pattern", ParamType::String), Param::required("subject", ParamType::String)], ParamType::String),
        regex_find,
    );
    table.register_builtin(
        Signature::new("RegexFindAll", vec![Param::required("pattern", ParamType::String), Param::required("subject", ParamType::String)], ParamType::Array),
        regex_find_all,
    );
    table.register_builtin(
        Signature::new(
            "RegexReplace",
            vec![Param::required("pattern", ParamType::String), Param::required("subject", ParamType::String), Param::required("replacement", ParamType::String)],
            ParamType::String,
        ),
        regex_replace,
    );
    table.register_builtin(
        Signature::new(
            "RegexSplit",
            vec![Param::required("pattern", ParamType::String), Param::required("subject", ParamType::String)],
            ParamType::Array,
        ),
        regex_split,
    );
}

fn compile(pattern: &str) -> RunResult<Regex> {
    RegexBuilder::new(pattern)
        .backtrack_limit(BACKTRACK_LIMIT)
        .build()
        .map_err(|e| domain_error(MessageCode::RegexCompileError, vec![pattern.to_owned(), e.to_string()]))
}

fn budget_error(pattern: &str) -> crate::errors::RunError {
    domain_error(MessageCode::RegexBudgetExceeded, vec![pattern.to_owned()])
}

fn regex_match(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let pattern = string_at(args, 0, "pattern")?;
    let subject = string_at(args, 1, "subject")?;
    let regex = compile(pattern)?;
    let found = regex.is_match(subject).map_err(|_| budget_error(pattern))?;
    Ok(Value::Boolean(found))
}

/// The first match's full text, or `null` if nothing matched.
fn regex_find(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let pattern = string_at(args, 0, "pattern")?;
    let subject = string_at(args, 1, "subject")?;
    let regex = compile(pattern)?;
    match regex.find(subject).map_err(|_| budget_error(pattern))? {
        Some(m) => Ok(Value::String(m.as_str().to_owned())),
        None => Ok(Value::Null),
    }
}

fn regex_find_all(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let pattern = string_at(args, 0, "pattern")?;
    let subject = string_at(args, 1, "subject")?;
    let regex = compile(pattern)?;
    let mut out = Vec::new();
    for m in regex.find_iter(subject) {
        out.push(Value::String(m.map_err(|_| budget_error(pattern))?.as_str().to_owned()));
    }
    Ok(Value::Array(out))
}

/// `replacement` is inserted literally for every non-overlapping match — there is no
/// backreference expansion. Walks matches manually via `find_iter` rather
/// than a `Replacer`-based `replace_all`, the same shape the teacher's `do_sub` uses
/// around `captures_iter`.
fn regex_replace(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let pattern = string_at(args, 0, "pattern")?;
    let subject = string_at(args, 1, "subject")?;
    let replacement = string_at(args, 2, "replacement")?;
    let regex = compile(pattern)?;
    let mut out = String::with_capacity(subject.len());
    let mut last_end = 0usize;
    for found in regex.find_iter(subject) {
        let m = found.map_err(|_| budget_error(pattern))?;
        out.push_str(&subject[last_end..m.start()]);
        out.push_str(replacement);
        last_end = m.end();
    }
    out.push_str(&subject[last_end..]);
    Ok(Value::String(out))
}

fn regex_split(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let pattern = string_at(args, 0, "pattern")?;
    let subject = string_at(args, 1, "subject")?;
    let regex = compile(pattern)?;
    let mut out = Vec::new();
    let mut last_end = 0usize;
    for found in regex.find_iter(subject) {
        let m = found.map_err(|_| budget_error(pattern))?;
        out.push(Value::String(subject[last_end..m.start()].to_owned()));
        last_end = m.end();
    }
    out.push(Value::String(subject[last_end..].to_owned()));
    Ok(Value::Array(out))
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
    fn regex_match_checks_substring_presence() {
        let result = run(r#"return RegexMatch("\\d+", "order 42")"#, &table());
        assert_eq!(result, Value::Boolean(true));
    }

    #[test]
    fn regex_find_returns_null_when_nothing_matches() {
        let result = run(r#"return RegexFind("zzz", "order 42")"#, &table());
        assert_eq!(result, Value::Null);
    }

    #[test]
    fn regex_find_all_collects_every_match() {
        let result = run(r#"return RegexFindAll("\\d+", "a1 b22 c333")"#, &table());
        assert_eq!(result, Value::Array(vec![Value::String("1".to_owned()), Value::String("22".to_owned()), Value::String("333".to_owned())]));
    }

    #[test]
    fn regex_replace_substitutes_every_occurrence() {
        let result = run(r#"return RegexReplace("\\d+", "a1 b2", "#")"#, &table());
        assert_eq!(result, Value::String("a# b#".to_owned()));
    }

    #[test]
    fn regex_split_breaks_on_every_match() {
        let result = run(r#"return RegexSplit(",\\s*", "a, b,c")"#, &table());
        assert_eq!(result, Value::Array(vec![Value::String("a".to_owned()), Value::String("b".to_owned()), Value::String("c".to_owned())]));
    }

    #[test]
    fn an_invalid_pattern_raises_a_compile_error() {
        let ast = parse(r#"return RegexMatch("(", "x")"#).expect("parses");
        let t = table();
        assert!(link(&ast, &t).is_empty());
        let mut executor = crate::executor::Executor::new(&t, crate::resource::NoLimitTracker, crate::tracer::NoopTracer, Value::Null);
        let err = executor.run(&ast.body).expect_err("malformed pattern must fail");
        assert_eq!(err.code, MessageCode::RegexCompileError);
    }
}
