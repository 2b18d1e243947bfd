//! Single-pass compiler: source text straight to bytecode.
//!
//! There is no AST. The compiler pulls tokens from the scanner one at a time
//! and every grammar production emits its bytecode as soon as it is parsed.
//! Expressions use a Pratt parser (`compiler_exprs.rs`), statements a
//! recursive-descent driver (`compiler_stmts.rs`).
//!
//! Locals live in stack slots resolved at compile time; globals are looked
//! up by name at run time through the constant pool.

use crate::bytecode::chunk::Chunk;
use crate::bytecode::instruction::OpCode;
use crate::bytecode::object::Heap;
use crate::bytecode::value::Value;
use crate::error::{CompileError, CompileErrors, ErrorLocation, LexerError};
use crate::lexer::{Scanner, Token, TokenKind};

/// Local slots are addressed by a one-byte operand.
pub const MAX_LOCALS: usize = u8::MAX as usize + 1;

/// Marks a local that is declared but whose initializer is still being compiled.
const UNINITIALIZED: i32 = -1;

/// Compile `source` into a chunk, interning strings in `heap`.
pub fn compile(source: &str, heap: &mut Heap) -> Result<Chunk, CompileErrors> {
    Compiler::new(source, heap).compile()
}

/// A local variable tracked during compilation.
#[derive(Debug, Clone)]
pub(crate) struct Local<'src> {
    pub name: &'src str,
    pub depth: i32,
}

/// Compiler state, threaded through every parse method.
pub struct Compiler<'src, 'h> {
    scanner: Scanner<'src>,
    heap: &'h mut Heap,
    chunk: Chunk,
    pub(crate) current: Token<'src>,
    pub(crate) previous: Token<'src>,
    /// Local variables in scope, innermost last.
    pub(crate) locals: Vec<Local<'src>>,
    /// Current scope depth (0 = global).
    pub(crate) scope_depth: i32,
    errors: Vec<CompileError>,
    /// Suppresses further diagnostics until the next statement boundary.
    pub(crate) panic_mode: bool,
}

impl<'src, 'h> Compiler<'src, 'h> {
    pub fn new(source: &'src str, heap: &'h mut Heap) -> Self {
        Self {
            scanner: Scanner::new(source),
            heap,
            chunk: Chunk::new(),
            current: Token::eof(0, 1, 1),
            previous: Token::eof(0, 1, 1),
            locals: Vec::new(),
            scope_depth: 0,
            errors: Vec::new(),
            panic_mode: false,
        }
    }

    /// Compile the whole source. Parsing always runs to the end so that every
    /// independent error is reported; any error fails the compile.
    pub fn compile(mut self) -> Result<Chunk, CompileErrors> {
        self.advance();
        while !self.match_token(TokenKind::Eof) {
            self.declaration();
        }
        self.emit_op(OpCode::Return);

        if self.errors.is_empty() {
            Ok(self.chunk)
        } else {
            Err(CompileErrors(self.errors))
        }
    }

    // ===== Token plumbing =====

    /// Move to the next token, reporting and skipping lexer errors.
    pub(crate) fn advance(&mut self) {
        self.previous = self.current;
        loop {
            match self.scanner.scan_token() {
                Ok(token) => {
                    self.current = token;
                    break;
                }
                Err(err) => self.lexer_error(&err),
            }
        }
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    pub(crate) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.check(kind) {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    // ===== Diagnostics =====

    pub(crate) fn error(&mut self, message: &str) {
        let token = self.previous;
        self.error_at(&token, message);
    }

    pub(crate) fn error_at_current(&mut self, message: &str) {
        let token = self.current;
        self.error_at(&token, message);
    }

    fn error_at(&mut self, token: &Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;

        let location = match token.kind {
            TokenKind::Eof => ErrorLocation::End,
            _ => ErrorLocation::At(token.lexeme.to_string()),
        };
        self.errors
            .push(CompileError::new(token.line(), location, message));
    }

    fn lexer_error(&mut self, err: &LexerError) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.errors.push(CompileError::new(
            err.span().line,
            ErrorLocation::Unknown,
            err.to_string(),
        ));
    }

    /// Skip tokens until something that looks like a statement boundary.
    pub(crate) fn synchronize(&mut self) {
        self.panic_mode = false;

        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Let
                | TokenKind::Mut
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Print
                | TokenKind::Func
                | TokenKind::Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    // ===== Chunk helpers =====

    pub(crate) fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line();
        self.chunk.write_byte(byte, line);
    }

    pub(crate) fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op as u8);
    }

    pub(crate) fn emit_op_arg(&mut self, op: OpCode, arg: u8) {
        self.emit_op(op);
        self.emit_byte(arg);
    }

    pub(crate) fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_op_arg(OpCode::Constant, index);
    }

    /// Add a constant, reporting a full pool. Returns index 0 on failure so
    /// emission can carry on; the compile is already marked failed.
    pub(crate) fn make_constant(&mut self, value: Value) -> u8 {
        match self.chunk.add_constant(value) {
            Some(index) => index,
            None => {
                self.error("Too many constants in one chunk.");
                0
            }
        }
    }

    /// Intern an identifier's name and store it in the constant pool.
    pub(crate) fn identifier_constant(&mut self, name: &str) -> u8 {
        let name = self.heap.intern(name);
        self.make_constant(Value::string(name))
    }

    pub(crate) fn intern_constant(&mut self, chars: &str) {
        let string = self.heap.intern(chars);
        self.emit_constant(Value::string(string));
    }

    /// Emit a forward jump with a placeholder operand; returns the operand's offset.
    pub(crate) fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.chunk.current_offset() - 2
    }

    pub(crate) fn patch_jump(&mut self, offset: usize) {
        if !self.chunk.patch_jump(offset) {
            self.error("Too much code to jump over.");
        }
    }

    pub(crate) fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);

        // +2 covers the operand bytes about to be written.
        let offset = self.chunk.current_offset() - loop_start + 2;
        let offset = match u16::try_from(offset) {
            Ok(offset) => offset,
            Err(_) => {
                self.error("Loop body too large.");
                0
            }
        };
        for byte in offset.to_be_bytes() {
            self.emit_byte(byte);
        }
    }

    pub(crate) fn current_offset(&self) -> usize {
        self.chunk.current_offset()
    }

    // ===== Scope management =====

    pub(crate) fn begin_scope(&mut self) {
        self.scope_depth += 1;
    }

    pub(crate) fn end_scope(&mut self) {
        self.scope_depth -= 1;
        while let Some(local) = self.locals.last() {
            if local.depth <= self.scope_depth {
                break;
            }
            self.emit_op(OpCode::Pop);
            self.locals.pop();
        }
    }

    pub(crate) fn add_local(&mut self, name: &'src str) {
        if self.locals.len() >= MAX_LOCALS {
            self.error("Too many variables in scope.");
            return;
        }
        self.locals.push(Local {
            name,
            depth: UNINITIALIZED,
        });
    }

    /// Record a new local in the current scope. Globals are late bound and
    /// need no declaration.
    pub(crate) fn declare_variable(&mut self) {
        if self.scope_depth == 0 {
            return;
        }

        let name = self.previous.lexeme;
        let duplicate = self
            .locals
            .iter()
            .rev()
            .take_while(|local| local.depth == UNINITIALIZED || local.depth >= self.scope_depth)
            .any(|local| local.name == name);
        if duplicate {
            self.error("Already a variable with this name in this scope.");
        }

        self.add_local(name);
    }

    pub(crate) fn mark_initialized(&mut self) {
        let depth = self.scope_depth;
        if let Some(local) = self.locals.last_mut() {
            local.depth = depth;
        }
    }

    /// Innermost local named `name`, searching from the most recent declaration.
    pub(crate) fn resolve_local(&mut self, name: &str) -> Option<u8> {
        let (slot, depth) = self
            .locals
            .iter()
            .enumerate()
            .rev()
            .find(|(_, local)| local.name == name)
            .map(|(slot, local)| (slot, local.depth))?;

        if depth == UNINITIALIZED {
            self.error("Can not read local variable in its own initializer.");
        }
        // MAX_LOCALS keeps every slot within a byte.
        u8::try_from(slot).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn compile_ok(source: &str) -> Chunk {
        let mut heap = Heap::new();
        compile(source, &mut heap).expect("compiles")
    }

    fn compile_err(source: &str) -> Vec<String> {
        let mut heap = Heap::new();
        compile(source, &mut heap)
            .expect_err("fails to compile")
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    fn ops(chunk: &Chunk) -> Vec<OpCode> {
        let mut ops = Vec::new();
        let mut offset = 0;
        while offset < chunk.code.len() {
            let op = OpCode::from_u8(chunk.code[offset]).expect("valid opcode");
            ops.push(op);
            offset += 1 + op.operand_size();
        }
        ops
    }

    #[test]
    fn test_empty_source_is_just_return() {
        let chunk = compile_ok("");
        assert_eq!(chunk.code, vec![OpCode::Return as u8]);
    }

    #[test]
    fn test_precedence_emission_order() {
        let chunk = compile_ok("print 1 + 2 * 3;");
        assert_eq!(
            ops(&chunk),
            vec![
                OpCode::Constant,
                OpCode::Constant,
                OpCode::Constant,
                OpCode::Multiply,
                OpCode::Add,
                OpCode::Print,
                OpCode::Return,
            ]
        );
        assert_eq!(chunk.code.len(), chunk.lines.len());
    }

    #[test]
    fn test_locals_use_slots() {
        let chunk = compile_ok("{ let a = 1; let b = a; }");
        assert_eq!(
            ops(&chunk),
            vec![
                OpCode::Constant,
                OpCode::GetLocal,
                OpCode::Pop,
                OpCode::Pop,
                OpCode::Return,
            ]
        );
        // `b = a` reads slot 0
        assert_eq!(chunk.code[3], 0);
    }

    #[test]
    fn test_globals_use_names() {
        let chunk = compile_ok("let a = 1; a = 2;");
        assert_eq!(
            ops(&chunk),
            vec![
                OpCode::Constant,
                OpCode::DefineGlobal,
                OpCode::Constant,
                OpCode::SetGlobal,
                OpCode::Pop,
                OpCode::Return,
            ]
        );
        assert_eq!(chunk.constants[0].to_string(), "a");
    }

    #[test]
    fn test_if_else_jumps_are_patched() {
        let chunk = compile_ok("if (true) print 1; else print 2;");
        assert_eq!(
            ops(&chunk),
            vec![
                OpCode::True,
                OpCode::JumpIfFalse,
                OpCode::Constant,
                OpCode::Print,
                OpCode::Jump,
                OpCode::Constant,
                OpCode::Print,
                OpCode::Return,
            ]
        );
        // then-branch is CONSTANT, PRINT, JUMP = 2 + 1 + 3 bytes
        assert_eq!(chunk.read_u16(2), 6);
        // else-branch is CONSTANT, PRINT = 3 bytes
        assert_eq!(chunk.read_u16(8), 3);
    }

    #[test]
    fn test_while_loop_jumps_back_to_condition() {
        let chunk = compile_ok("while (false) print 1;");
        // 0 FALSE, 1 JUMP_IF_FALSE, 4 CONSTANT, 6 PRINT, 7 LOOP, 10 RETURN
        assert_eq!(chunk.code[7], OpCode::Loop as u8);
        assert_eq!(chunk.read_u16(8), 10);
        assert_eq!(chunk.read_u16(2), 6);
    }

    #[test]
    fn test_own_initializer_is_rejected() {
        assert_eq!(
            compile_err("{ let x = x; }"),
            vec!["[line 1] Error at 'x': Can not read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        assert_eq!(
            compile_err("{ let a = 1; mut a = 2; }"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
        compile_ok("{ let a = 1; { let a = 2; } }");
        compile_ok("let a = 1; let a = 2;");
    }

    #[test]
    fn test_error_locations() {
        assert_eq!(
            compile_err("print 1"),
            vec!["[line 1] Error at end: Expect ';' after value."]
        );
        assert_eq!(
            compile_err("1 + ;"),
            vec!["[line 1] Error at ';': Expect expression."]
        );
        assert_eq!(
            compile_err("print @;"),
            vec!["[line 1] Error: Unexpected character '@'."]
        );
    }

    #[test]
    fn test_panic_mode_reports_one_error_per_statement() {
        let errors = compile_err("print 1 +;\nprint (2;\nprint 3;");
        assert_eq!(
            errors,
            vec![
                "[line 1] Error at ';': Expect expression.",
                "[line 2] Error at ';': Expect ')' after expression.",
            ]
        );
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert_eq!(
            compile_err("let a = 1; let b = 2; a + b = 3;"),
            vec!["[line 1] Error at '=': Invalid assignment target."]
        );
    }

    #[test]
    fn test_too_many_constants() {
        let source: String = (0..300).map(|i| format!("{};", i)).collect();
        let errors = compile_err(&source);
        assert_eq!(
            errors[0],
            "[line 1] Error at '256': Too many constants in one chunk."
        );
        assert!(errors
            .iter()
            .all(|e| e.ends_with("Too many constants in one chunk.")));
    }

    #[test]
    fn test_too_many_locals() {
        let body: String = (0..257).map(|i| format!("let v{} = null;", i)).collect();
        let errors = compile_err(&format!("{{{}}}", body));
        assert_eq!(
            errors,
            vec!["[line 1] Error at 'v256': Too many variables in scope."]
        );
    }

    #[test]
    fn test_loop_body_too_large() {
        let body = "print true;".repeat(40_000);
        let source = format!("while (true) {{ {} }}", body);
        let errors = compile_err(&source);
        assert!(errors.iter().any(|e| e.ends_with("Loop body too large.")));
    }

    #[test]
    fn test_forward_jump_too_far() {
        let body = "print true;".repeat(40_000);
        let source = format!("if (true) {{ {} }}", body);
        assert_eq!(
            compile_err(&source),
            vec!["[line 1] Error at '}': Too much code to jump over."]
        );
    }
}
