//! Function signatures: the shape the linker checks call sites against. Grounded in the teacher's `signature.rs`, drastically
//! simplified: this language has no `*args`/`**kwargs`/keyword arguments, so there is no
//! binding algorithm to speak of, only a positional parameter list with a required
//! prefix and an optional suffix.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::ValueType;

/// The type a parameter (or return value) declares. A superset of `ValueType` with one
/// addition: `Lambda`, which `ValueType` has no corresponding variant for since a
/// lambda is never a runtime `Value` a script can hold in a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamType {
    Any,
    Boolean,
    Number,
    String,
    Array,
    Object,
    Null,
    Lambda,
}

impl ParamType {
    /// Whether a runtime `Value` of `actual` type satisfies this declared type.
    /// `Lambda` never matches a `Value` — lambda arguments are checked structurally at
    /// link time, never against an evaluated `Value` at call time.
    #[must_use]
    pub fn accepts(self, actual: ValueType) -> bool {
        match self {
            Self::Any => true,
            Self::Boolean => actual == ValueType::Boolean,
            Self::Number => actual == ValueType::Number,
            Self::String => actual == ValueType::String,
            Self::Array => actual == ValueType::Array,
            Self::Object => actual == ValueType::Object,
            Self::Null => actual == ValueType::Null,
            Self::Lambda => false,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Any => "Any",
            Self::Boolean => "Boolean",
            Self::Number => "Number",
            Self::String => "String",
            Self::Array => "Array",
            Self::Object => "Object",
            Self::Null => "Null",
            Self::Lambda => "Lambda",
        };
        f.write_str(name)
    }
}

/// One declared parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: &'static str,
    pub param_type: ParamType,
    pub required: bool,
}

impl Param {
    #[must_use]
    pub const fn required(name: &'static str, param_type: ParamType) -> Self {
        Self { name, param_type, required: true }
    }

    #[must_use]
    pub const fn optional(name: &'static str, param_type: ParamType) -> Self {
        Self { name, param_type, required: false }
    }
}

/// A callable's full declared shape.
///
/// `min_arity`/`max_arity` are derived once at construction rather than recomputed on
/// every link — a signature is built once per registration and linked against many
/// times, so this amortizes the scan over the parameter list.
#[derive(Debug, Clone)]
pub struct Signature {
    pub name: &'static str,
    pub params: Vec<Param>,
    pub return_type: ParamType,
    min_arity: usize,
    max_arity: usize,
}

impl Signature {
    #[must_use]
    pub fn new(name: &'static str, params: Vec<Param>, return_type: ParamType) -> Self {
        let min_arity = params.iter().take_while(|p| p.required).count();
        let max_arity = params.len();
        Self { name, params, return_type, min_arity, max_arity }
    }

    #[must_use]
    pub const fn min_arity(&self) -> usize {
        self.min_arity
    }

    #[must_use]
    pub const fn max_arity(&self) -> usize {
        self.max_arity
    }

    /// The declared type of the parameter at `index`, or `None` past the last parameter
    /// (a caller passing more arguments than `max_arity` is already a `TooManyArguments`
    /// diagnostic, so this is only consulted for in-range indices).
    #[must_use]
    pub fn param_type_at(&self, index: usize) -> Option<ParamType> {
        self.params.get(index).map(|p| p.param_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn arity_splits_on_required_prefix() {
        let sig = Signature::new(
            "Pad",
            vec![Param::required("value", ParamType::String), Param::optional("width", ParamType::Number)],
            ParamType::String,
        );
        assert_eq!(sig.min_arity(), 1);
        assert_eq!(sig.max_arity(), 2);
    }

    #[test]
    fn any_accepts_every_type() {
        assert!(ParamType::Any.accepts(ValueType::Null));
        assert!(ParamType::Any.accepts(ValueType::Object));
    }

    #[test]
    fn lambda_never_accepts_a_value_type() {
        assert!(!ParamType::Lambda.accepts(ValueType::Object));
    }
}
