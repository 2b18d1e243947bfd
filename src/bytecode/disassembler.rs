//! Bytecode disassembler for debugging.

use std::fmt::Write;

use crate::bytecode::chunk::Chunk;
use crate::bytecode::instruction::OpCode;

/// Disassemble a whole chunk under a `== name ==` header.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut output = String::new();
    writeln!(output, "== {} ==", name).unwrap();

    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = disassemble_instruction(chunk, offset, &mut output);
    }

    output
}

/// Disassemble the instruction at `offset` and return the next instruction's offset.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, output: &mut String) -> usize {
    write!(output, "{:04} ", offset).unwrap();

    // Line number, or | if same as previous
    let line = chunk.get_line(offset);
    if offset > 0 && line == chunk.get_line(offset - 1) {
        output.push_str("   | ");
    } else {
        write!(output, "{:4} ", line).unwrap();
    }

    let byte = chunk.code[offset];
    let Some(opcode) = OpCode::from_u8(byte) else {
        writeln!(output, "Unknown opcode {}", byte).unwrap();
        return offset + 1;
    };

    let name = opcode.name();
    let next = offset + 1 + opcode.operand_size();
    if next > chunk.code.len() {
        writeln!(output, "{} <truncated>", name).unwrap();
        return chunk.code.len();
    }

    match opcode {
        OpCode::Constant | OpCode::DefineGlobal | OpCode::GetGlobal | OpCode::SetGlobal => {
            let index = chunk.code[offset + 1];
            match chunk.constants.get(index as usize) {
                Some(value) => {
                    writeln!(output, "{:<16} {:4} '{}'", name, index, value).unwrap();
                }
                None => {
                    writeln!(output, "{:<16} {:4} <invalid>", name, index).unwrap();
                }
            }
        }

        OpCode::GetLocal | OpCode::SetLocal => {
            let slot = chunk.code[offset + 1];
            writeln!(output, "{:<16} {:4}", name, slot).unwrap();
        }

        OpCode::Jump | OpCode::JumpIfFalse | OpCode::JumpIfFalseNoPop | OpCode::JumpIfTrueNoPop => {
            let jump = chunk.read_u16(offset + 1) as usize;
            writeln!(output, "{:<16} {:4} -> {}", name, offset, next + jump).unwrap();
        }

        OpCode::Loop => {
            let jump = chunk.read_u16(offset + 1) as usize;
            let target = next as isize - jump as isize;
            writeln!(output, "{:<16} {:4} -> {}", name, offset, target).unwrap();
        }

        _ => {
            writeln!(output, "{}", name).unwrap();
        }
    }

    next
}
