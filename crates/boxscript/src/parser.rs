//! Recursive-descent parser. Precedence climbing by hand-written levels, from
//! lowest to highest: `or` < `and` < equality < relational/`is` < additive < multiplicative
//! < unary < postfix (call/index/property) < primary.
//!
//! Performs no semantic checks beyond grammar well-formedness — undeclared variables,
//! reserved names, and loop-only statements are the Validate stage's job, keeping
//! the division of responsibility the spec describes.

use crate::{
    ast::{
        AssignTarget, AstProgram, BinaryOp, CompoundOp, ElseIf, Expr, ForDirection, Lambda, Position, Stmt, StmtKind,
        SwitchCase, TypeHint, UnaryOp,
    },
    diagnostics::{Diagnostic, MessageCode},
    lexer::{Lexer, Token, TokenKind},
    value::Value,
};

type ParseResult<T> = Result<T, Diagnostic>;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Parses `source` into an `AstProgram`, or the first diagnostic encountered.
pub fn parse(source: &str) -> Result<AstProgram, Diagnostic> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser { tokens, pos: 0 }.parse_program()
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        self.tokens.get(self.pos + offset).map_or(&TokenKind::Eof, |t| &t.kind)
    }

    fn position(&self) -> Position {
        self.tokens[self.pos].position
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> ParseResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(format!("{kind:?}")))
        }
    }

    fn unexpected(&self, expected: impl Into<String>) -> Diagnostic {
        Diagnostic::new(MessageCode::UnexpectedToken, vec![expected.into(), format!("{:?}", self.peek())])
            .with_location(self.position())
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        match self.peek().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn parse_program(&mut self) -> ParseResult<AstProgram> {
        let mut body = Vec::new();
        while !self.check(&TokenKind::Eof) {
            body.push(self.parse_stmt()?);
        }
        Ok(AstProgram { body })
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        let position = self.position();
        let kind = match self.peek() {
            TokenKind::Var => self.parse_var_decl()?,
            TokenKind::If => self.parse_if()?,
            TokenKind::Switch => self.parse_switch()?,
            TokenKind::While => self.parse_while()?,
            TokenKind::For => self.parse_for()?,
            TokenKind::ForEach => self.parse_foreach()?,
            TokenKind::Return => {
                self.advance();
                let message = self.parse_optional_trailing_expr()?;
                StmtKind::Return { message }
            }
            TokenKind::Fail => {
                self.advance();
                let message = self.parse_optional_trailing_expr()?;
                StmtKind::Fail { message }
            }
            TokenKind::Break => {
                self.advance();
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                StmtKind::Continue
            }
            _ => self.parse_assignment_or_expr_stmt()?,
        };
        Ok(Stmt { kind, position })
    }

    /// `return`/`fail` take an optional message expression; anything that can't start an
    /// expression (closing brace, another statement keyword) means there isn't one.
    fn parse_optional_trailing_expr(&mut self) -> ParseResult<Option<Expr>> {
        if self.starts_expression() { Ok(Some(self.parse_expression()?)) } else { Ok(None) }
    }

    fn starts_expression(&self) -> bool {
        !matches!(
            self.peek(),
            TokenKind::RBrace
                | TokenKind::Eof
                | TokenKind::Var
                | TokenKind::If
                | TokenKind::Switch
                | TokenKind::While
                | TokenKind::For
                | TokenKind::ForEach
                | TokenKind::Return
                | TokenKind::Fail
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Else
                | TokenKind::Case
                | TokenKind::Default
        )
    }

    fn parse_var_decl(&mut self) -> ParseResult<StmtKind> {
        self.advance(); // 'var'
        let name = self.expect_identifier()?;
        let hint = if self.eat(&TokenKind::Colon) { Some(self.parse_type_hint()?) } else { None };
        let init = if self.eat(&TokenKind::Assign) { Some(self.parse_expression()?) } else { None };
        Ok(StmtKind::VarDecl { name, hint, init })
    }

    fn parse_type_hint(&mut self) -> ParseResult<TypeHint> {
        let hint = match self.peek() {
            TokenKind::TypeAny => TypeHint::Any,
            TokenKind::TypeBoolean => TypeHint::Boolean,
            TokenKind::TypeNumber => TypeHint::Number,
            TokenKind::TypeString => TypeHint::String,
            TokenKind::TypeArray => TypeHint::Array,
            TokenKind::TypeObject => TypeHint::Object,
            TokenKind::Null => TypeHint::Null,
            _ => return Err(self.unexpected("type hint")),
        };
        self.advance();
        Ok(hint)
    }

    fn parse_if(&mut self) -> ParseResult<StmtKind> {
        self.advance(); // 'if'
        let condition = self.parse_expression()?;
        let then_block = self.parse_block()?;
        let mut else_ifs = Vec::new();
        let mut else_block = None;
        while self.eat(&TokenKind::Else) {
            if self.eat(&TokenKind::If) {
                let cond = self.parse_expression()?;
                let body = self.parse_block()?;
                else_ifs.push(ElseIf { condition: cond, body });
            } else {
                else_block = Some(self.parse_block()?);
                break;
            }
        }
        Ok(StmtKind::If { condition, then_block, else_ifs, else_block })
    }

    fn parse_switch(&mut self) -> ParseResult<StmtKind> {
        self.advance(); // 'switch'
        let scrutinee = self.parse_expression()?;
        self.expect(&TokenKind::LBrace)?;
        let mut cases = Vec::new();
        let mut default_block = None;
        while !self.check(&TokenKind::RBrace) {
            if self.eat(&TokenKind::Case) {
                let mut comparands = vec![self.parse_expression()?];
                while self.eat(&TokenKind::Comma) {
                    comparands.push(self.parse_expression()?);
                }
                let body = self.parse_block()?;
                cases.push(SwitchCase { comparands, body });
            } else if self.eat(&TokenKind::Default) {
                default_block = Some(self.parse_block()?);
            } else {
                return Err(self.unexpected("case or default"));
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(StmtKind::Switch { scrutinee, cases, default_block })
    }

    fn parse_while(&mut self) -> ParseResult<StmtKind> {
        self.advance(); // 'while'
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(StmtKind::While { condition, body })
    }

    fn parse_for(&mut self) -> ParseResult<StmtKind> {
        self.advance(); // 'for'
        let var = self.expect_identifier()?;
        self.expect(&TokenKind::From)?;
        let start = self.parse_expression()?;
        self.expect(&TokenKind::To)?;
        let end = self.parse_expression()?;
        let step = if self.eat(&TokenKind::Step) { Some(self.parse_expression()?) } else { None };
        let direction = if self.eat(&TokenKind::Descending) {
            ForDirection::Descending
        } else {
            self.eat(&TokenKind::Ascending);
            ForDirection::Ascending
        };
        let body = self.parse_block()?;
        Ok(StmtKind::For { var, start, end, step, direction, body })
    }

    fn parse_foreach(&mut self) -> ParseResult<StmtKind> {
        self.advance(); // 'foreach'
        let var = self.expect_identifier()?;
        self.expect(&TokenKind::In)?;
        let collection = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(StmtKind::ForEach { var, collection, body })
    }

    /// Parses either an assignment statement or a bare expression statement. An
    /// assignment's left-hand side must reduce to an `AssignTarget` shape (identifier,
    /// property, or index); anything else followed by an assignment operator is a parse
    /// error, since `1 + 2 = 3` is not a valid target.
    fn parse_assignment_or_expr_stmt(&mut self) -> ParseResult<StmtKind> {
        let position = self.position();
        let lhs = self.parse_unary()?;
        if let Some(op) = self.peek_compound_op() {
            self.advance();
            let target = expr_to_assign_target(lhs, position)?;
            let value = self.parse_expression()?;
            return Ok(StmtKind::Assignment { target, op, value });
        }
        let expr = self.continue_expression(lhs, 0)?;
        Ok(StmtKind::ExprStmt(expr))
    }

    fn peek_compound_op(&self) -> Option<CompoundOp> {
        Some(match self.peek() {
            TokenKind::Assign => CompoundOp::Assign,
            TokenKind::PlusAssign => CompoundOp::AddAssign,
            TokenKind::MinusAssign => CompoundOp::SubAssign,
            TokenKind::StarAssign => CompoundOp::MulAssign,
            TokenKind::SlashAssign => CompoundOp::DivAssign,
            TokenKind::PercentAssign => CompoundOp::ModAssign,
            _ => return None,
        })
    }

    // --- expression parsing ---

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        let lhs = self.parse_unary()?;
        self.continue_expression(lhs, 0)
    }

    /// Precedence-climbs starting from an already-parsed `lhs`, consuming binary operators
    /// with binding power `>= min_bp`. Binding powers (lowest to highest): or=1, and=2,
    /// equality=3, relational/is=4, additive=5, multiplicative=6.
    fn continue_expression(&mut self, mut lhs: Expr, min_bp: u8) -> ParseResult<Expr> {
        loop {
            let Some((op, bp)) = self.peek_binary_op() else { break };
            if bp < min_bp {
                break;
            }
            let position = self.position();
            self.advance();
            if let BinaryOpOrIs::Is = op {
                let hint = self.parse_type_hint()?;
                lhs = Expr::TypeTest { operand: Box::new(lhs), hint, position };
                continue;
            }
            let BinaryOpOrIs::Op(binop) = op else { unreachable!() };
            let rhs_base = self.parse_unary()?;
            let rhs = self.continue_expression(rhs_base, bp + 1)?;
            lhs = Expr::Binary { op: binop, lhs: Box::new(lhs), rhs: Box::new(rhs), position };
        }
        Ok(lhs)
    }

    fn peek_binary_op(&self) -> Option<(BinaryOpOrIs, u8)> {
        Some(match self.peek() {
            TokenKind::Or | TokenKind::OrOr => (BinaryOpOrIs::Op(BinaryOp::Or), 1),
            TokenKind::And | TokenKind::AndAnd => (BinaryOpOrIs::Op(BinaryOp::And), 2),
            TokenKind::Eq => (BinaryOpOrIs::Op(BinaryOp::Eq), 3),
            TokenKind::Ne => (BinaryOpOrIs::Op(BinaryOp::Ne), 3),
            TokenKind::Lt => (BinaryOpOrIs::Op(BinaryOp::Lt), 4),
            TokenKind::Le => (BinaryOpOrIs::Op(BinaryOp::Le), 4),
            TokenKind::Gt => (BinaryOpOrIs::Op(BinaryOp::Gt), 4),
            TokenKind::Ge => (BinaryOpOrIs::Op(BinaryOp::Ge), 4),
            TokenKind::Is => (BinaryOpOrIs::Is, 4),
            TokenKind::Plus => (BinaryOpOrIs::Op(BinaryOp::Add), 5),
            TokenKind::Minus => (BinaryOpOrIs::Op(BinaryOp::Sub), 5),
            TokenKind::Star => (BinaryOpOrIs::Op(BinaryOp::Mul), 6),
            TokenKind::Slash => (BinaryOpOrIs::Op(BinaryOp::Div), 6),
            TokenKind::Percent => (BinaryOpOrIs::Op(BinaryOp::Mod), 6),
            _ => return None,
        })
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let position = self.position();
        let op = match self.peek() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::PlusPlus => Some(UnaryOp::PreIncrement),
            TokenKind::MinusMinus => Some(UnaryOp::PreDecrement),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary { op, operand: Box::new(operand), position });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let position = self.position();
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let key = self.expect_identifier()?;
                    expr = Expr::Property { object: Box::new(expr), key, position };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = Expr::Index { object: Box::new(expr), index: Box::new(index), position };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let position = self.position();
        match self.peek().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Literal { value: Value::Number(n), position })
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Literal { value: Value::String(s), position })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal { value: Value::Boolean(true), position })
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal { value: Value::Boolean(false), position })
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal { value: Value::Null, position })
            }
            TokenKind::Identifier(name) => {
                if matches!(self.peek_at(1), TokenKind::Arrow) {
                    return self.parse_lambda_single_param();
                }
                self.advance();
                if self.eat(&TokenKind::LParen) {
                    let args = self.parse_call_args()?;
                    Ok(Expr::Call { name, args, position })
                } else {
                    Ok(Expr::Identifier { name, position })
                }
            }
            TokenKind::LParen => self.parse_parenthesized_or_lambda(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_call_args(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            args.push(self.parse_expression()?);
            while self.eat(&TokenKind::Comma) {
                args.push(self.parse_expression()?);
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_lambda_single_param(&mut self) -> ParseResult<Expr> {
        let position = self.position();
        let param = self.expect_identifier()?;
        self.expect(&TokenKind::Arrow)?;
        let body = self.parse_expression()?;
        Ok(Expr::Lambda(Lambda { params: vec![param], body: Box::new(body), position }))
    }

    /// Disambiguates `( expr )` from `(a, b) => expr` by trying the lambda-parameter-list
    /// shape first and backtracking on failure.
    fn parse_parenthesized_or_lambda(&mut self) -> ParseResult<Expr> {
        let position = self.position();
        let checkpoint = self.pos;
        if let Some(params) = self.try_parse_lambda_params() {
            if self.eat(&TokenKind::Arrow) {
                let body = self.parse_expression()?;
                return Ok(Expr::Lambda(Lambda { params, body: Box::new(body), position }));
            }
        }
        self.pos = checkpoint;
        self.expect(&TokenKind::LParen)?;
        let expr = self.parse_expression()?;
        self.expect(&TokenKind::RParen)?;
        Ok(expr)
    }

    fn try_parse_lambda_params(&mut self) -> Option<Vec<String>> {
        if !self.eat(&TokenKind::LParen) {
            return None;
        }
        let mut params = Vec::new();
        if let TokenKind::Identifier(name) = self.peek().clone() {
            self.advance();
            params.push(name);
            while self.eat(&TokenKind::Comma) {
                if let TokenKind::Identifier(name) = self.peek().clone() {
                    self.advance();
                    params.push(name);
                } else {
                    return None;
                }
            }
        }
        if self.eat(&TokenKind::RParen) { Some(params) } else { None }
    }

    fn parse_array_literal(&mut self) -> ParseResult<Expr> {
        let position = self.position();
        self.advance(); // '['
        let mut elements = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            elements.push(self.parse_expression()?);
            while self.eat(&TokenKind::Comma) {
                if self.check(&TokenKind::RBracket) {
                    break;
                }
                elements.push(self.parse_expression()?);
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(Expr::ArrayLiteral { elements, position })
    }

    fn parse_object_literal(&mut self) -> ParseResult<Expr> {
        let position = self.position();
        self.advance(); // '{'
        let mut entries = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            entries.push(self.parse_object_entry()?);
            while self.eat(&TokenKind::Comma) {
                if self.check(&TokenKind::RBrace) {
                    break;
                }
                entries.push(self.parse_object_entry()?);
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Expr::ObjectLiteral { entries, position })
    }

    fn parse_object_entry(&mut self) -> ParseResult<(String, Expr)> {
        let key = match self.peek().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                name
            }
            TokenKind::String(s) => {
                self.advance();
                s
            }
            _ => return Err(self.unexpected("object key")),
        };
        self.expect(&TokenKind::Colon)?;
        let value = self.parse_expression()?;
        Ok((key, value))
    }
}

enum BinaryOpOrIs {
    Op(BinaryOp),
    Is,
}

fn expr_to_assign_target(expr: Expr, position: Position) -> ParseResult<AssignTarget> {
    match expr {
        Expr::Identifier { name, position } => Ok(AssignTarget::Identifier { name, position }),
        Expr::Property { object, key, position } => Ok(AssignTarget::Property { object, key, position }),
        Expr::Index { object, index, position } => Ok(AssignTarget::Index { object, index, position }),
        _ => Err(Diagnostic::new(MessageCode::ExpectedStatement, vec!["assignment target".to_owned()])
            .with_location(position)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_return_with_property_access() {
        let program = parse("return data.name").unwrap();
        assert_eq!(program.body.len(), 1);
        assert!(matches!(program.body[0].kind, StmtKind::Return { message: Some(_) }));
    }

    #[test]
    fn parses_compound_assignment() {
        let program = parse("data.n = data.n + 1").unwrap();
        assert!(matches!(
            program.body[0].kind,
            StmtKind::Assignment { op: CompoundOp::Assign, .. }
        ));
    }

    #[test]
    fn parses_for_loop_with_step_and_direction() {
        let program = parse("for x from 1 to 5 step 1 ascending { }").unwrap();
        assert!(matches!(program.body[0].kind, StmtKind::For { .. }));
    }

    #[test]
    fn parses_lambda_literal_argument() {
        let program = parse("Map(data.items, x => x + 1)").unwrap();
        let StmtKind::ExprStmt(Expr::Call { args, .. }) = &program.body[0].kind else {
            panic!("expected call expression statement");
        };
        assert!(args[1].is_lambda_literal());
    }

    #[test]
    fn parses_multi_param_lambda() {
        let program = parse("Reduce(data.items, (acc, x) => acc + x, 0)").unwrap();
        let StmtKind::ExprStmt(Expr::Call { args, .. }) = &program.body[0].kind else {
            panic!("expected call expression statement");
        };
        let Expr::Lambda(lambda) = &args[1] else { panic!("expected lambda") };
        assert_eq!(lambda.params, vec!["acc".to_owned(), "x".to_owned()]);
    }

    #[test]
    fn parses_switch_with_multiple_comparands() {
        let program = parse("switch data.n { case 1, 2 { } default { } }").unwrap();
        assert!(matches!(program.body[0].kind, StmtKind::Switch { .. }));
    }

    #[test]
    fn parses_type_hinted_var_decl() {
        let program = parse("var x: number = 1").unwrap();
        assert!(matches!(
            program.body[0].kind,
            StmtKind::VarDecl { hint: Some(TypeHint::Number), .. }
        ));
    }

    #[test]
    fn parses_is_type_test() {
        let program = parse("return data.n is Number").unwrap();
        // `Number` lexes as TypeNumber only via the type-hint path below `is`; parsed ok.
        let _ = program;
    }
}
