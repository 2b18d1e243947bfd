//! Expression compilation: Pratt parsing straight to bytecode.

use crate::bytecode::compiler::Compiler;
use crate::bytecode::instruction::OpCode;
use crate::bytecode::precedence::{get_rule, ParseFn, Precedence};
use crate::bytecode::value::Value;
use crate::lexer::TokenKind;

impl<'src, 'h> Compiler<'src, 'h> {
    /// Compile an expression; its value is left on the stack.
    pub(crate) fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    /// Parse anything that binds at least as tightly as `precedence`.
    pub(crate) fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = get_rule(self.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };

        let can_assign = precedence <= Precedence::Assignment;
        self.apply(prefix, can_assign);

        while precedence <= get_rule(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = get_rule(self.previous.kind).infix {
                self.apply(infix, can_assign);
            }
        }

        if can_assign && self.match_token(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn apply(&mut self, rule: ParseFn, can_assign: bool) {
        match rule {
            ParseFn::Grouping => self.grouping(),
            ParseFn::Unary => self.unary(),
            ParseFn::Binary => self.binary(),
            ParseFn::Number => self.number(),
            ParseFn::String => self.string(),
            ParseFn::Literal => self.literal(),
            ParseFn::Variable => self.variable(can_assign),
            ParseFn::And => self.and(),
            ParseFn::Or => self.or(),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);

        match operator {
            TokenKind::Bang => self.emit_op(OpCode::Not),
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            _ => {}
        }
    }

    fn binary(&mut self) {
        let operator = self.previous.kind;
        let rule = get_rule(operator);
        self.parse_precedence(rule.precedence.next());

        let op = match operator {
            TokenKind::Plus => OpCode::Add,
            TokenKind::Minus => OpCode::Subtract,
            TokenKind::Star => OpCode::Multiply,
            TokenKind::Slash => OpCode::Divide,
            TokenKind::EqualEqual => OpCode::Equal,
            TokenKind::BangEqual => OpCode::NotEqual,
            TokenKind::Less => OpCode::Less,
            TokenKind::LessEqual => OpCode::LessEqual,
            TokenKind::Greater => OpCode::Greater,
            TokenKind::GreaterEqual => OpCode::GreaterEqual,
            _ => return,
        };
        self.emit_op(op);
    }

    /// `a and b`: if `a` is falsey it is the result, otherwise `b` is.
    fn and(&mut self) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalseNoPop);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And.next());
        self.patch_jump(end_jump);
    }

    /// `a or b`: if `a` is truthy it is the result, otherwise `b` is.
    fn or(&mut self) {
        let end_jump = self.emit_jump(OpCode::JumpIfTrueNoPop);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::Or.next());
        self.patch_jump(end_jump);
    }

    fn literal(&mut self) {
        match self.previous.kind {
            TokenKind::Null => self.emit_op(OpCode::Null),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::False => self.emit_op(OpCode::False),
            _ => {}
        }
    }

    fn number(&mut self) {
        let token = self.previous;
        let digits: String = token.lexeme[token.base.prefix_len()..]
            .chars()
            .filter(|c| *c != '_')
            .collect();

        let value = match token.kind {
            TokenKind::Float => match digits.parse::<f64>() {
                Ok(n) => Value::Float(n),
                Err(_) => {
                    self.error("Invalid number literal.");
                    return;
                }
            },
            _ => match i64::from_str_radix(&digits, token.base.radix()) {
                Ok(n) => Value::Int(n),
                Err(_) => {
                    self.error("Integer literal too large.");
                    return;
                }
            },
        };
        self.emit_constant(value);
    }

    fn string(&mut self) {
        let lexeme = self.previous.lexeme;
        let body = &lexeme[1..lexeme.len() - 1];
        match unescape(body) {
            Ok(chars) => self.intern_constant(&chars),
            Err(bad) => self.error(&format!("Unknown escape sequence '\\{}'.", bad)),
        }
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.previous.lexeme;
        self.named_variable(name, can_assign);
    }

    fn named_variable(&mut self, name: &str, can_assign: bool) {
        let (get_op, set_op, arg) = match self.resolve_local(name) {
            Some(slot) => (OpCode::GetLocal, OpCode::SetLocal, slot),
            None => {
                let index = self.identifier_constant(name);
                (OpCode::GetGlobal, OpCode::SetGlobal, index)
            }
        };

        if can_assign && self.match_token(TokenKind::Equal) {
            self.expression();
            self.emit_op_arg(set_op, arg);
        } else {
            self.emit_op_arg(get_op, arg);
        }
    }
}

/// Process backslash escapes. On failure returns the character after the
/// offending backslash.
fn unescape(raw: &str) -> Result<String, char> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => return Err(other),
            None => return Err(' '),
        }
    }

    Ok(out)
}
