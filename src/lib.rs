//! clockwork: a small dynamically-typed scripting language.
//!
//! Source text is compiled in a single pass to bytecode, which a stack-based
//! virtual machine then executes. Globals and interned strings live in the
//! VM and persist across calls, which is what the REPL relies on.

#![allow(clippy::new_without_default)]
#![allow(clippy::len_without_is_empty)]

pub mod bytecode;
pub mod config;
pub mod error;
pub mod lexer;
pub mod repl;
pub mod span;

use std::path::Path;

pub use bytecode::VM;
pub use config::VmConfig;
pub use error::{CompileErrors, InterpretError, RuntimeError};

/// Run a program in a fresh VM.
pub fn interpret(source: &str) -> Result<(), InterpretError> {
    VM::new().interpret(source)
}

/// Read a file and run it in `vm`.
pub fn run_file(vm: &mut VM, path: &Path) -> Result<(), InterpretError> {
    let source = std::fs::read_to_string(path).map_err(|source| InterpretError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    vm.interpret(&source)
}

/// Compile source code to bytecode without executing.
pub fn compile(source: &str) -> Result<bytecode::Chunk, CompileErrors> {
    let mut heap = bytecode::Heap::new();
    bytecode::compile(source, &mut heap)
}

/// Compile source code and return its disassembly.
pub fn disassemble(source: &str) -> Result<String, CompileErrors> {
    let chunk = compile(source)?;
    Ok(bytecode::disassemble_chunk(&chunk, "code"))
}
