//! Bytecode compiler and virtual machine for clockwork.
//!
//! # Architecture
//!
//! - `instruction`: OpCode definitions for the bytecode instruction set
//! - `chunk`: Bytecode chunks containing instructions, line table and constant pool
//! - `value`, `object`: runtime values and the heap that owns strings
//! - `table`: open-addressed hash table used for interning and globals
//! - `compiler`: single-pass compiler from source text to a chunk
//! - `vm`: Stack-based virtual machine for executing bytecode
//! - `disassembler`: Debug output for bytecode inspection

pub mod chunk;
pub mod compiler;
mod compiler_exprs;
mod compiler_stmts;
pub mod disassembler;
pub mod instruction;
pub mod object;
pub mod precedence;
pub mod table;
pub mod value;
pub mod vm;

pub use chunk::Chunk;
pub use compiler::{compile, Compiler};
pub use disassembler::{disassemble_chunk, disassemble_instruction};
pub use instruction::OpCode;
pub use object::{Heap, ObjString, Object};
pub use table::Table;
pub use value::Value;
pub use vm::VM;
