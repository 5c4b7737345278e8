//! Diagnostic codes, severities, and the wire format the host ultimately sees.
//!
//! Every diagnostic carries a `JMXXXX` code whose first digit names the pipeline stage
//! that raised it: 1=lexer, 2=parser, 3=validator, 4=linker, 5=runtime. Within a stage,
//! the hundreds digit groups categories (e.g. all `51xx` codes are type/coercion errors,
//! all `59xx` codes are resource-limit/cancellation errors). Grounded in the teacher's
//! `ExcType` (a flat, `strum`-derived enum with one variant per condition) but reshaped
//! around a numeric code space instead of a Python exception class hierarchy, since this
//! language has no `try`/`except` and no notion of catching by supertype.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::ast::Position;

/// Severity of a single diagnostic. Compilation/linking only stop at `Error`; `Warning`
/// and `Info` are carried through and surfaced to the host alongside a successful result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// The pipeline subsystem a code belongs to, derived from the code's first digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Subsystem {
    Lexer,
    Parser,
    Validator,
    Linker,
    Runtime,
}

/// Every diagnosable condition in the system, tagged with its numeric `JMXXXX` code.
///
/// `strum`'s `Display`/`EnumString` give us the canonical name for free (mirroring how
/// the teacher derives `ExcType`'s string form), while `code()` and `default_severity()`
/// carry the numeric/severity metadata the spec's wire format requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum MessageCode {
    // --- 1xxx: lexer ---
    UnterminatedString,
    InvalidNumberLiteral,
    UnexpectedCharacter,

    // --- 2xxx: parser ---
    UnexpectedToken,
    ExpectedExpression,
    ExpectedStatement,

    // --- 3xxx: validator ---
    UndeclaredVariable,
    BreakOutsideLoop,
    ContinueOutsideLoop,
    UnreachableCode,
    ReservedNameCollision,
    ExcessiveLoopNesting,
    LambdaOutsideCallArgument,

    // --- 4xxx: linker ---
    UndefinedFunction,
    TooFewArguments,
    TooManyArguments,
    ExpectedLambdaArgument,
    UnexpectedLambdaArgument,
    FunctionOverride,

    // --- 51xx: runtime / type & coercion ---
    InvalidType,
    IncomparableTypes,
    NotIterable,

    // --- 52xx: runtime / arithmetic ---
    DivisionByZero,
    ModuloByZero,

    // --- 53xx: runtime / property & index access ---
    PropertyAccessOnNull,
    PropertyAccessInvalidType,
    IndexAccessOnNull,
    IndexOutOfRange,
    SetPropertyOnNonObject,
    SetIndexOnNonContainer,
    NegativeIndex,

    // --- 54xx: runtime / control flow & loops ---
    NonNegativeIntegerRequired,

    // --- 55xx: runtime / calls ---
    UnknownFunctionAtRuntime,

    // --- 56xx: runtime / script-raised ---
    ScriptFailure,

    // --- 58xx: runtime / standard-library-raised ---
    RegexCompileError,
    RegexBudgetExceeded,
    SchemaValidationFailed,
    JsonParseError,
    Base64DecodeError,
    DateParseError,
    PaddedLengthExceeded,

    // --- 59xx: runtime / resource limiter & cancellation ---
    StatementLimitExceeded,
    LoopIterationLimitExceeded,
    CallDepthLimitExceeded,
    ExecutionTimeLimitExceeded,
    CancelledByHost,

    // --- 5999: catch-all wrapper for a non-domain error the compiler's location
    // guard had to wrap.
    RuntimeError,
}

impl MessageCode {
    /// The four-digit decimal code, e.g. `JM5100`.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::UnterminatedString => 1001,
            Self::InvalidNumberLiteral => 1002,
            Self::UnexpectedCharacter => 1003,

            Self::UnexpectedToken => 2001,
            Self::ExpectedExpression => 2002,
            Self::ExpectedStatement => 2003,

            Self::UndeclaredVariable => 3001,
            Self::BreakOutsideLoop => 3002,
            Self::ContinueOutsideLoop => 3003,
            Self::UnreachableCode => 3004,
            Self::ReservedNameCollision => 3005,
            Self::ExcessiveLoopNesting => 3006,
            Self::LambdaOutsideCallArgument => 3007,

            Self::UndefinedFunction => 4001,
            Self::TooFewArguments => 4002,
            Self::TooManyArguments => 4003,
            Self::ExpectedLambdaArgument => 4004,
            Self::FunctionOverride => 4005,
            Self::UnexpectedLambdaArgument => 4006,

            Self::InvalidType => 5100,
            Self::IncomparableTypes => 5101,
            Self::NotIterable => 5102,

            Self::DivisionByZero => 5200,
            Self::ModuloByZero => 5201,

            Self::PropertyAccessOnNull => 5300,
            Self::PropertyAccessInvalidType => 5301,
            Self::IndexAccessOnNull => 5302,
            Self::IndexOutOfRange => 5303,
            Self::SetPropertyOnNonObject => 5304,
            Self::SetIndexOnNonContainer => 5305,
            Self::NegativeIndex => 5306,

            Self::NonNegativeIntegerRequired => 5400,

            Self::UnknownFunctionAtRuntime => 5500,

            Self::ScriptFailure => 5600,

            Self::RegexCompileError => 5800,
            Self::RegexBudgetExceeded => 5801,
            Self::SchemaValidationFailed => 5802,
            Self::JsonParseError => 5803,
            Self::Base64DecodeError => 5804,
            Self::DateParseError => 5805,
            Self::PaddedLengthExceeded => 5806,

            Self::StatementLimitExceeded => 5900,
            Self::LoopIterationLimitExceeded => 5901,
            Self::CallDepthLimitExceeded => 5902,
            Self::ExecutionTimeLimitExceeded => 5903,
            Self::CancelledByHost => 5904,
            Self::RuntimeError => 5999,
        }
    }

    /// The pipeline subsystem implied by the code's leading digit.
    #[must_use]
    pub const fn subsystem(self) -> Subsystem {
        match self.code() / 1000 {
            1 => Subsystem::Lexer,
            2 => Subsystem::Parser,
            3 => Subsystem::Validator,
            4 => Subsystem::Linker,
            _ => Subsystem::Runtime,
        }
    }

    /// The severity this condition is emitted at when the host provides no override.
    #[must_use]
    pub const fn default_severity(self) -> Severity {
        match self {
            Self::UnreachableCode | Self::FunctionOverride => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Default English message template. Positional placeholders `{0} {1} …` are bound
    /// to the diagnostic's `args` array.
    #[must_use]
    pub const fn default_template(self) -> &'static str {
        match self {
            Self::UnterminatedString => "unterminated string literal",
            Self::InvalidNumberLiteral => "invalid number literal {0}",
            Self::UnexpectedCharacter => "unexpected character {0}",

            Self::UnexpectedToken => "unexpected token: expected {0}, found {1}",
            Self::ExpectedExpression => "expected an expression, found {0}",
            Self::ExpectedStatement => "expected a statement, found {0}",

            Self::UndeclaredVariable => "undeclared variable {0}",
            Self::BreakOutsideLoop => "break statement outside of a loop",
            Self::ContinueOutsideLoop => "continue statement outside of a loop",
            Self::UnreachableCode => "unreachable code after {0}",
            Self::ReservedNameCollision => "{0} is a reserved name and cannot be declared",
            Self::ExcessiveLoopNesting => "loop nesting exceeds the maximum of {0}",
            Self::LambdaOutsideCallArgument => "a lambda literal may only appear as a direct call argument",

            Self::UndefinedFunction => "undefined function {0}",
            Self::TooFewArguments => "{0} requires at least {1} argument(s), got {2}",
            Self::TooManyArguments => "{0} accepts at most {1} argument(s), got {2}",
            Self::ExpectedLambdaArgument => "argument {0} of {1} must be a lambda literal",
            Self::UnexpectedLambdaArgument => "argument {0} of {1} must not be a lambda literal",
            Self::FunctionOverride => "host function {0} shadows a builtin of the same name",

            Self::InvalidType => "variable {0} expected type {1} but got {2}",
            Self::IncomparableTypes => "cannot compare {0} with {1}",
            Self::NotIterable => "value of type {0} is not iterable",

            Self::DivisionByZero => "division by zero",
            Self::ModuloByZero => "modulo by zero",

            Self::PropertyAccessOnNull => "cannot read property {0} of null",
            Self::PropertyAccessInvalidType => "cannot read property {0} of a {1} value",
            Self::IndexAccessOnNull => "cannot read index of null",
            Self::IndexOutOfRange => "index {0} is out of range for length {1}",
            Self::SetPropertyOnNonObject => "cannot set property {0} on a {1} value",
            Self::SetIndexOnNonContainer => "cannot set index on a {0} value",
            Self::NegativeIndex => "negative index {0} is not allowed when writing",

            Self::NonNegativeIntegerRequired => "for-loop step must be a strictly positive integer, got {0}",

            Self::UnknownFunctionAtRuntime => "call to unresolved function {0}",

            Self::ScriptFailure => "script failed: {0}",

            Self::RegexCompileError => "invalid regular expression {0}: {1}",
            Self::RegexBudgetExceeded => "regular expression {0} exceeded its matching time budget",
            Self::SchemaValidationFailed => "value does not satisfy schema: {0}",
            Self::JsonParseError => "invalid JSON: {0}",
            Self::Base64DecodeError => "invalid base-64 input: {0}",
            Self::DateParseError => "invalid ISO-8601 date/time {0}",
            Self::PaddedLengthExceeded => "pad width {0} exceeds the maximum of {1}",

            Self::StatementLimitExceeded => "statement limit of {0} exceeded",
            Self::LoopIterationLimitExceeded => "loop iteration limit of {0} exceeded",
            Self::CallDepthLimitExceeded => "call depth limit of {0} exceeded",
            Self::ExecutionTimeLimitExceeded => "execution time limit of {0:?} exceeded",
            Self::CancelledByHost => "execution was cancelled by the host",
            Self::RuntimeError => "{0}",
        }
    }
}

/// Host-supplied (or falling back to English) template lookup.
pub trait TemplateProvider {
    /// Returns a localized format string for `code`, or `None` to fall back to
    /// `MessageCode::default_template`.
    fn template_for(&self, code: MessageCode) -> Option<String>;
}

/// Applies positional placeholders `{0} {1} …` from `args` to `template`.
#[must_use]
pub fn format_template(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '{' {
            if let Some(end) = template[i..].find('}') {
                let digits = &template[i + 1..i + end];
                if let Ok(idx) = digits.parse::<usize>() {
                    if let Some(arg) = args.get(idx) {
                        out.push_str(arg);
                    }
                    for _ in 0..end {
                        chars.next();
                    }
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// A single line/column/length pointer into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
    pub length: u32,
}

impl From<Position> for Location {
    fn from(pos: Position) -> Self {
        Self { line: pos.line, column: pos.column, length: pos.length }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ln {}, Col {}", self.line, self.column)
    }
}

/// One diagnostic from any pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: MessageCode,
    pub severity: Severity,
    pub message: String,
    pub args: Vec<String>,
    pub location: Option<Location>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(code: MessageCode, args: Vec<String>) -> Self {
        let message = format_template(code.default_template(), &args);
        Self { code, severity: code.default_severity(), message, args, location: None }
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<Location>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Re-renders `message` using a host-supplied localization template, falling back to
    /// the built-in English one if the provider returns `None`.
    pub fn localize(&mut self, provider: &dyn TemplateProvider) {
        let template = provider.template_for(self.code).unwrap_or_else(|| self.code.default_template().to_owned());
        self.message = format_template(&template, &self.args);
    }

    /// The lower-cased subsystem name the structured wire form carries alongside the code.
    #[must_use]
    pub fn subsystem(&self) -> Subsystem {
        self.code.subsystem()
    }

    #[must_use]
    pub fn formatted_code(&self) -> String {
        format!("JM{:04}", self.code.code())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.formatted_code(), severity_label(self.severity), self.message)?;
        if let Some(loc) = self.location {
            write!(f, " ({loc})")?;
        }
        Ok(())
    }
}

const fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

/// True if any diagnostic in the slice is `Severity::Error`.
#[must_use]
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn formats_positional_placeholders() {
        let msg = format_template("{0} expected {1} but got {2}", &["x".into(), "Number".into(), "String".into()]);
        assert_eq!(msg, "x expected Number but got String");
    }

    #[test]
    fn code_ranges_map_to_subsystems() {
        assert_eq!(MessageCode::UndeclaredVariable.subsystem(), Subsystem::Validator);
        assert_eq!(MessageCode::DivisionByZero.subsystem(), Subsystem::Runtime);
        assert_eq!(MessageCode::UndefinedFunction.subsystem(), Subsystem::Linker);
    }

    #[test]
    fn warnings_never_block() {
        let diags = vec![Diagnostic::new(MessageCode::UnreachableCode, vec!["return".into()])];
        assert!(!has_errors(&diags));
    }

    #[test]
    fn errors_block() {
        let diags = vec![Diagnostic::new(MessageCode::UndeclaredVariable, vec!["x".into()])];
        assert!(has_errors(&diags));
    }
}
