//! Date/time builtins: ISO-8601 formatting, component extraction,
//! and calendar unit arithmetic.
//!
//! Grounded in the teacher's `modules/datetime_mod.rs`, which exposes wall-clock time
//! to a sandboxed script through a handful of free functions rather than an object
//! with methods, for the same reason `array.rs` has no method syntax to hang off of
//!. Every timestamp a script sees or produces is a plain
//! ISO-8601 `String`;
//! `chrono` is used purely as the parsing/formatting engine underneath that string, the
//! same role it plays in the teacher's own `Cargo.toml` (`chrono`, default-features off,
//! `clock` + `std` only — this crate never needs `chrono`'s timezone database).

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

use crate::{
    diagnostics::MessageCode,
    errors::RunResult,
    function_table::{CallArg, FunctionTable, HostContext},
    signature::{Param, ParamType, Signature},
    stdlib::helpers::{domain_error, number_at, string_at},
    value::Value,
};

pub fn register(table: &mut FunctionTable) {
    table.register_builtin(Signature::new("NowIso8601", vec![], ParamType::String), now_iso8601);
    table.register_builtin(Signature::new("ParseTimestamp", vec![Param::required("iso8601", ParamType::String)], ParamType::Number), parse_timestamp);
    table.register_builtin(Signature::new("FromTimestamp", vec![Param::required("epochSeconds", ParamType::Number)], ParamType::String), from_timestamp);
    table.register_builtin(Signature::new("Year", vec![Param::required("iso8601", ParamType::String)], ParamType::Number), year);
    table.register_builtin(Signature::new("Month", vec![Param::required("iso8601", ParamType::String)], ParamType::Number), month);
    table.register_builtin(Signature::new("Day", vec![Param::required("iso8601", ParamType::String)], ParamType::Number), day);
    table.register_builtin(Signature::new("Hour", vec![Param::required("iso8601", ParamType::String)], ParamType::Number), hour);
    table.register_builtin(Signature::new("Minute", vec![Param::required("iso8601", ParamType::String)], ParamType::Number), minute);
    table.register_builtin(Signature::new("Second", vec![Param::required("iso8601", ParamType::String)], ParamType::Number), second);
    table.register_builtin(
        Signature::new("AddDays", vec![Param::required("iso8601", ParamType::String), Param::required("days", ParamType::Number)], ParamType::String),
        add_days,
    );
    table.register_builtin(
        Signature::new(
            "AddSeconds",
            vec![Param::required("iso8601", ParamType::String), Param::required("seconds", ParamType::Number)],
            ParamType::String,
        ),
        add_seconds,
    );
    table.register_builtin(
        Signature::new("DiffSeconds", vec![Param::required("a", ParamType::String), Param::required("b", ParamType::String)], ParamType::Number),
        diff_seconds,
    );
}

fn parse(iso8601: &str) -> RunResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(iso8601).map(|dt| dt.with_timezone(&Utc)).map_err(|_| domain_error(MessageCode::DateParseError, vec![iso8601.to_owned()]))
}

fn format(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

fn now_iso8601(_args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::String(format(Utc::now())))
}

fn parse_timestamp(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let dt = parse(string_at(args, 0, "iso8601")?)?;
    #[allow(clippy::cast_precision_loss)]
    Ok(Value::Number(dt.timestamp() as f64))
}

fn from_timestamp(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let epoch = number_at(args, 0, "epochSeconds")?;
    #[allow(clippy::cast_possible_truncation)]
    let seconds = epoch.trunc() as i64;
    let dt = Utc.timestamp_opt(seconds, 0).single().ok_or_else(|| domain_error(MessageCode::DateParseError, vec![epoch.to_string()]))?;
    Ok(Value::String(format(dt)))
}

fn year(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::Number(f64::from(parse(string_at(args, 0, "iso8601")?)?.year())))
}

fn month(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::Number(f64::from(parse(string_at(args, 0, "iso8601")?)?.month())))
}

fn day(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::Number(f64::from(parse(string_at(args, 0, "iso8601")?)?.day())))
}

fn hour(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::Number(f64::from(parse(string_at(args, 0, "iso8601")?)?.hour())))
}

fn minute(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::Number(f64::from(parse(string_at(args, 0, "iso8601")?)?.minute())))
}

fn second(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    Ok(Value::Number(f64::from(parse(string_at(args, 0, "iso8601")?)?.second())))
}

fn add_days(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let dt = parse(string_at(args, 0, "iso8601")?)?;
    let days = number_at(args, 1, "days")?;
    #[allow(clippy::cast_possible_truncation)]
    let delta = Duration::seconds((days * 86400.0).trunc() as i64);
    Ok(Value::String(format(dt + delta)))
}

fn add_seconds(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let dt = parse(string_at(args, 0, "iso8601")?)?;
    let seconds = number_at(args, 1, "seconds")?;
    #[allow(clippy::cast_possible_truncation)]
    let delta = Duration::seconds(seconds.trunc() as i64);
    Ok(Value::String(format(dt + delta)))
}

fn diff_seconds(args: &[CallArg], _ctx: &mut dyn HostContext) -> RunResult<Value> {
    let a = parse(string_at(args, 0, "a")?)?;
    let b = parse(string_at(args, 1, "b")?)?;
    #[allow(clippy::cast_precision_loss)]
    Ok(Value::Number((a - b).num_seconds() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::{linker::link, parser::parse as parse_source};

    fn run(source: &str, functions: &FunctionTable) -> Value {
        let ast = parse_source(source).expect("parses");
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
    fn year_month_day_extract_from_an_iso8601_string() {
        let t = table();
        assert_eq!(run(r#"return Year("2026-07-29T10:30:00Z")"#, &t), Value::Number(2026.0));
        assert_eq!(run(r#"return Month("2026-07-29T10:30:00Z")"#, &t), Value::Number(7.0));
        assert_eq!(run(r#"return Day("2026-07-29T10:30:00Z")"#, &t), Value::Number(29.0));
    }

    #[test]
    fn add_days_advances_the_calendar_date() {
        let result = run(r#"return AddDays("2026-01-31T00:00:00Z", 1)"#, &table());
        assert_eq!(result, Value::String("2026-02-01T00:00:00Z".to_owned()));
    }

    #[test]
    fn diff_seconds_is_positive_when_a_is_later() {
        let result = run(r#"return DiffSeconds("2026-01-01T00:01:00Z", "2026-01-01T00:00:00Z")"#, &table());
        assert_eq!(result, Value::Number(60.0));
    }

    #[test]
    fn malformed_timestamps_raise_a_date_parse_error() {
        let ast = parse_source(r#"return Year("not-a-date")"#).expect("parses");
        let t = table();
        assert!(link(&ast, &t).is_empty());
        let mut executor = crate::executor::Executor::new(&t, crate::resource::NoLimitTracker, crate::tracer::NoopTracer, Value::Null);
        let err = executor.run(&ast.body).expect_err("malformed timestamp must fail");
        assert_eq!(err.code, MessageCode::DateParseError);
    }
}
