//! Token definitions for the clockwork lexer.

use crate::span::Span;

/// All token types in clockwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Dot,
    Comma,
    Colon,
    Semicolon,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Bang,
    Equal,
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Literals
    Identifier,
    Integer,
    Float,
    String,

    // Keywords
    Null,
    True,
    False,
    And,
    Or,
    If,
    Else,
    While,
    For,
    Let,
    Mut,
    Func,
    Return,
    Print,

    // Special
    Eof,
}

impl TokenKind {
    /// Check if this identifier is a keyword and return the corresponding kind.
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        match ident {
            "null" => Some(TokenKind::Null),
            "true" => Some(TokenKind::True),
            "false" => Some(TokenKind::False),
            "and" => Some(TokenKind::And),
            "or" => Some(TokenKind::Or),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "while" => Some(TokenKind::While),
            "for" => Some(TokenKind::For),
            "let" => Some(TokenKind::Let),
            "mut" => Some(TokenKind::Mut),
            "func" => Some(TokenKind::Func),
            "return" => Some(TokenKind::Return),
            "print" => Some(TokenKind::Print),
            _ => None,
        }
    }
}

/// Radix tag carried by integer literal tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberBase {
    #[default]
    Decimal,
    Binary,
    Octal,
    Hex,
}

impl NumberBase {
    pub fn radix(self) -> u32 {
        match self {
            NumberBase::Decimal => 10,
            NumberBase::Binary => 2,
            NumberBase::Octal => 8,
            NumberBase::Hex => 16,
        }
    }

    /// Length of the literal prefix (`0b`, `0o`, `0x`).
    pub fn prefix_len(self) -> usize {
        match self {
            NumberBase::Decimal => 0,
            _ => 2,
        }
    }
}

/// A token: its kind, the source slice it covers, and where that slice lives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub base: NumberBase,
    pub lexeme: &'src str,
    pub span: Span,
}

impl<'src> Token<'src> {
    pub fn new(kind: TokenKind, lexeme: &'src str, span: Span) -> Self {
        Self {
            kind,
            base: NumberBase::Decimal,
            lexeme,
            span,
        }
    }

    pub fn with_base(mut self, base: NumberBase) -> Self {
        self.base = base;
        self
    }

    pub fn eof(position: usize, line: u32, column: u32) -> Self {
        Self::new(
            TokenKind::Eof,
            "",
            Span::new(position, position, line, column),
        )
    }

    pub fn line(&self) -> u32 {
        self.span.line
    }
}
