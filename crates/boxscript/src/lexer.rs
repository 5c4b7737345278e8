//! Hand-written lexer. Out of scope for the core per §1, but a complete crate
//! needs *some* front end, so this is ordinary, unexciting leaf code: a flat token stream
//! with `(line, column)` positions attached to every token.

use crate::{
    ast::Position,
    diagnostics::{Diagnostic, MessageCode},
};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // literals
    Number(f64),
    String(String),
    Identifier(String),

    // keywords
    Var,
    If,
    Else,
    Switch,
    Case,
    Default,
    While,
    For,
    ForEach,
    From,
    To,
    Step,
    Ascending,
    Descending,
    In,
    Break,
    Continue,
    Return,
    Fail,
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Is,

    // type hint keywords
    TypeAny,
    TypeBoolean,
    TypeNumber,
    TypeString,
    TypeArray,
    TypeObject,
    TypeNull,

    // punctuation & operators
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Dot,
    Arrow, // => for lambdas
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,

    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self { source: source.as_bytes(), pos: 0, line: 1, column: 1 }
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn current_position(&self, start_line: u32, start_col: u32, length: u32) -> Position {
        Position::new(start_line, start_col, length)
    }

    /// Tokenizes the whole source, stopping at the first lexical error.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let start_line = self.line;
            let start_col = self.column;
            let Some(c) = self.peek() else {
                tokens.push(Token { kind: TokenKind::Eof, position: self.current_position(start_line, start_col, 0) });
                break;
            };

            let kind = if c.is_ascii_digit() {
                self.lex_number()?
            } else if c == b'"' || c == b'\'' {
                self.lex_string(c)?
            } else if c.is_ascii_alphabetic() || c == b'_' {
                self.lex_identifier_or_keyword()
            } else {
                self.lex_operator()?
            };
            let length = (self.column.max(start_col)) - start_col;
            tokens.push(Token { kind, position: self.current_position(start_line, start_col, length.max(1)) });
        }
        Ok(tokens)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, Diagnostic> {
        let start = self.pos;
        let (start_line, start_col) = (self.line, self.column);
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let save = self.pos;
            self.advance();
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.advance();
            }
            if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            } else {
                self.pos = save;
            }
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or_default();
        text.parse::<f64>().map(TokenKind::Number).map_err(|_| {
            Diagnostic::new(MessageCode::InvalidNumberLiteral, vec![text.to_owned()])
                .with_location(Position::new(start_line, start_col, (self.pos - start) as u32))
        })
    }

    fn lex_string(&mut self, quote: u8) -> Result<TokenKind, Diagnostic> {
        let (start_line, start_col) = (self.line, self.column);
        self.advance(); // opening quote
        let mut s = String::new();
        loop {
            match self.advance() {
                None | Some(b'\n') => {
                    return Err(Diagnostic::new(MessageCode::UnterminatedString, vec![])
                        .with_location(Position::new(start_line, start_col, 1)));
                }
                Some(c) if c == quote => break,
                Some(b'\\') => match self.advance() {
                    Some(b'n') => s.push('\n'),
                    Some(b't') => s.push('\t'),
                    Some(b'r') => s.push('\r'),
                    Some(b'\\') => s.push('\\'),
                    Some(b'"') => s.push('"'),
                    Some(b'\'') => s.push('\''),
                    Some(other) => s.push(other as char),
                    None => {
                        return Err(Diagnostic::new(MessageCode::UnterminatedString, vec![])
                            .with_location(Position::new(start_line, start_col, 1)));
                    }
                },
                Some(c) => s.push(c as char),
            }
        }
        Ok(TokenKind::String(s))
    }

    fn lex_identifier_or_keyword(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.advance();
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or_default();
        keyword_kind(text).unwrap_or_else(|| TokenKind::Identifier(text.to_owned()))
    }

    fn lex_operator(&mut self) -> Result<TokenKind, Diagnostic> {
        let (start_line, start_col) = (self.line, self.column);
        let c = self.advance().expect("checked by caller");
        let two = |this: &mut Self, expect: u8| {
            if this.peek() == Some(expect) {
                this.advance();
                true
            } else {
                false
            }
        };
        Ok(match c {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b':' => TokenKind::Colon,
            b'.' => TokenKind::Dot,
            b'+' => {
                if two(self, b'+') {
                    TokenKind::PlusPlus
                } else if two(self, b'=') {
                    TokenKind::PlusAssign
                } else {
                    TokenKind::Plus
                }
            }
            b'-' => {
                if two(self, b'-') {
                    TokenKind::MinusMinus
                } else if two(self, b'=') {
                    TokenKind::MinusAssign
                } else {
                    TokenKind::Minus
                }
            }
            b'*' => {
                if two(self, b'=') {
                    TokenKind::StarAssign
                } else {
                    TokenKind::Star
                }
            }
            b'/' => {
                if two(self, b'=') {
                    TokenKind::SlashAssign
                } else {
                    TokenKind::Slash
                }
            }
            b'%' => {
                if two(self, b'=') {
                    TokenKind::PercentAssign
                } else {
                    TokenKind::Percent
                }
            }
            b'=' => {
                if two(self, b'=') {
                    TokenKind::Eq
                } else if two(self, b'>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Assign
                }
            }
            b'!' => {
                if two(self, b'=') {
                    TokenKind::Ne
                } else {
                    return Err(Diagnostic::new(MessageCode::UnexpectedCharacter, vec!["!".to_owned()])
                        .with_location(Position::new(start_line, start_col, 1)));
                }
            }
            b'<' => {
                if two(self, b'=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            b'>' => {
                if two(self, b'=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            b'&' => {
                if two(self, b'&') {
                    TokenKind::AndAnd
                } else {
                    return Err(Diagnostic::new(MessageCode::UnexpectedCharacter, vec!["&".to_owned()])
                        .with_location(Position::new(start_line, start_col, 1)));
                }
            }
            b'|' => {
                if two(self, b'|') {
                    TokenKind::OrOr
                } else {
                    return Err(Diagnostic::new(MessageCode::UnexpectedCharacter, vec!["|".to_owned()])
                        .with_location(Position::new(start_line, start_col, 1)));
                }
            }
            other => {
                return Err(Diagnostic::new(MessageCode::UnexpectedCharacter, vec![(other as char).to_string()])
                    .with_location(Position::new(start_line, start_col, 1)));
            }
        })
    }
}

fn keyword_kind(text: &str) -> Option<TokenKind> {
    Some(match text {
        "var" => TokenKind::Var,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "switch" => TokenKind::Switch,
        "case" => TokenKind::Case,
        "default" => TokenKind::Default,
        "while" => TokenKind::While,
        "for" => TokenKind::For,
        "foreach" => TokenKind::ForEach,
        "from" => TokenKind::From,
        "to" => TokenKind::To,
        "step" => TokenKind::Step,
        "ascending" => TokenKind::Ascending,
        "descending" => TokenKind::Descending,
        "in" => TokenKind::In,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "return" => TokenKind::Return,
        "fail" => TokenKind::Fail,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "is" => TokenKind::Is,
        "any" => TokenKind::TypeAny,
        "boolean" => TokenKind::TypeBoolean,
        "number" => TokenKind::TypeNumber,
        "string" => TokenKind::TypeString,
        "array" => TokenKind::TypeArray,
        "object" => TokenKind::TypeObject,
        _ => return None,
    })
}
