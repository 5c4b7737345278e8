//! AST node types. Every statement and expression carries a source `Position`.
//!
//! No scope-resolution annotations are baked into identifiers at parse time; name
//! resolution is the validator's job, done as a separate pass over this tree.

use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueType};

/// A `(line, column, length)` pointer into the original source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub length: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, column: u32, length: u32) -> Self {
        Self { line, column, length }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeHint {
    Any,
    Boolean,
    Number,
    String,
    Array,
    Object,
    Null,
}

impl TypeHint {
    /// The `ValueType` this hint checks an actual value against.
    /// The two enums share every variant one-for-one; this is the single place that
    /// fact is encoded rather than leaving callers to match on both independently.
    #[must_use]
    pub const fn to_value_type(self) -> ValueType {
        match self {
            Self::Any => ValueType::Any,
            Self::Boolean => ValueType::Boolean,
            Self::Number => ValueType::Number,
            Self::String => ValueType::String,
            Self::Array => ValueType::Array,
            Self::Object => ValueType::Object,
            Self::Null => ValueType::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    PreIncrement,
    PreDecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompoundOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
}

impl CompoundOp {
    /// The binary operator a compound form reduces to, or `None` for plain `=`.
    #[must_use]
    pub const fn as_binary_op(self) -> Option<BinaryOp> {
        match self {
            Self::Assign => None,
            Self::AddAssign => Some(BinaryOp::Add),
            Self::SubAssign => Some(BinaryOp::Sub),
            Self::MulAssign => Some(BinaryOp::Mul),
            Self::DivAssign => Some(BinaryOp::Div),
            Self::ModAssign => Some(BinaryOp::Mod),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForDirection {
    Ascending,
    Descending,
}

/// The target of an assignment: an identifier, a property access, or an index access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssignTarget {
    Identifier { name: String, position: Position },
    Property { object: Box<Expr>, key: String, position: Position },
    Index { object: Box<Expr>, index: Box<Expr>, position: Position },
}

impl AssignTarget {
    #[must_use]
    pub const fn position(&self) -> Position {
        match self {
            Self::Identifier { position, .. } | Self::Property { position, .. } | Self::Index { position, .. } => {
                *position
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Box<Expr>,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Literal { value: Value, position: Position },
    Identifier { name: String, position: Position },
    Property { object: Box<Expr>, key: String, position: Position },
    Index { object: Box<Expr>, index: Box<Expr>, position: Position },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr>, position: Position },
    Unary { op: UnaryOp, operand: Box<Expr>, position: Position },
    TypeTest { operand: Box<Expr>, hint: TypeHint, position: Position },
    Call { name: String, args: Vec<Expr>, position: Position },
    Lambda(Lambda),
    ArrayLiteral { elements: Vec<Expr>, position: Position },
    ObjectLiteral { entries: Vec<(String, Expr)>, position: Position },
}

impl Expr {
    #[must_use]
    pub const fn position(&self) -> Position {
        match self {
            Self::Literal { position, .. }
            | Self::Identifier { position, .. }
            | Self::Property { position, .. }
            | Self::Index { position, .. }
            | Self::Binary { position, .. }
            | Self::Unary { position, .. }
            | Self::TypeTest { position, .. }
            | Self::Call { position, .. }
            | Self::ArrayLiteral { position, .. }
            | Self::ObjectLiteral { position, .. } => *position,
            Self::Lambda(lambda) => lambda.position,
        }
    }

    /// True if this expression is a lambda literal, used by the linker's structural
    /// obligation check for `Lambda`-typed parameters.
    #[must_use]
    pub const fn is_lambda_literal(&self) -> bool {
        matches!(self, Self::Lambda(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    pub comparands: Vec<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElseIf {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StmtKind {
    VarDecl { name: String, hint: Option<TypeHint>, init: Option<Expr> },
    Assignment { target: AssignTarget, op: CompoundOp, value: Expr },
    If { condition: Expr, then_block: Vec<Stmt>, else_ifs: Vec<ElseIf>, else_block: Option<Vec<Stmt>> },
    Switch { scrutinee: Expr, cases: Vec<SwitchCase>, default_block: Option<Vec<Stmt>> },
    While { condition: Expr, body: Vec<Stmt> },
    For { var: String, start: Expr, end: Expr, step: Option<Expr>, direction: ForDirection, body: Vec<Stmt> },
    ForEach { var: String, collection: Expr, body: Vec<Stmt> },
    Return { message: Option<Expr> },
    Fail { message: Option<Expr> },
    Break,
    Continue,
    ExprStmt(Expr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub position: Position,
}

/// A parsed, not-yet-validated program: the front end's sole output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstProgram {
    pub body: Vec<Stmt>,
}
