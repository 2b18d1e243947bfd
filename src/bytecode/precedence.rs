//! Operator precedence and the Pratt rule table.

use crate::lexer::TokenKind;

/// Operator precedence levels (higher = tighter binding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None = 0,
    Assignment = 1, // =
    Or = 2,         // or
    And = 3,        // and
    Equality = 4,   // == !=
    Comparison = 5, // < > <= >=
    Term = 6,       // + -
    Factor = 7,     // * /
    Unary = 8,      // ! -
    Call = 9,
    Primary = 10,
}

impl Precedence {
    pub fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call => Precedence::Primary,
            Precedence::Primary => Precedence::Primary,
        }
    }
}

/// Parse functions a rule can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFn {
    Grouping,
    Unary,
    Binary,
    Number,
    String,
    Literal,
    Variable,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseRule {
    pub prefix: Option<ParseFn>,
    pub infix: Option<ParseFn>,
    pub precedence: Precedence,
}

impl ParseRule {
    const fn new(prefix: Option<ParseFn>, infix: Option<ParseFn>, precedence: Precedence) -> Self {
        Self {
            prefix,
            infix,
            precedence,
        }
    }
}

pub fn get_rule(kind: TokenKind) -> ParseRule {
    use ParseFn as F;
    use Precedence as P;

    match kind {
        TokenKind::LeftParen => ParseRule::new(Some(F::Grouping), None, P::None),
        TokenKind::Minus => ParseRule::new(Some(F::Unary), Some(F::Binary), P::Term),
        TokenKind::Plus => ParseRule::new(None, Some(F::Binary), P::Term),
        TokenKind::Star | TokenKind::Slash => ParseRule::new(None, Some(F::Binary), P::Factor),
        TokenKind::Bang => ParseRule::new(Some(F::Unary), None, P::None),
        TokenKind::EqualEqual | TokenKind::BangEqual => {
            ParseRule::new(None, Some(F::Binary), P::Equality)
        }
        TokenKind::Less | TokenKind::LessEqual | TokenKind::Greater | TokenKind::GreaterEqual => {
            ParseRule::new(None, Some(F::Binary), P::Comparison)
        }
        TokenKind::Identifier => ParseRule::new(Some(F::Variable), None, P::None),
        TokenKind::String => ParseRule::new(Some(F::String), None, P::None),
        TokenKind::Integer | TokenKind::Float => ParseRule::new(Some(F::Number), None, P::None),
        TokenKind::And => ParseRule::new(None, Some(F::And), P::And),
        TokenKind::Or => ParseRule::new(None, Some(F::Or), P::Or),
        TokenKind::Null | TokenKind::True | TokenKind::False => {
            ParseRule::new(Some(F::Literal), None, P::None)
        }
        _ => ParseRule::new(None, None, P::None),
    }
}
