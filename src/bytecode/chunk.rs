//! Bytecode chunk containing instructions and constants.

use crate::bytecode::instruction::OpCode;
use crate::bytecode::value::Value;

/// Constant operands are one byte wide.
pub const MAX_CONSTANTS: usize = u8::MAX as usize + 1;

/// A chunk of bytecode containing instructions and metadata.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    /// The bytecode instructions.
    pub code: Vec<u8>,
    /// Source line of every byte in `code`.
    pub lines: Vec<u32>,
    /// The constant pool.
    pub constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a raw byte to the chunk.
    pub fn write_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Write an opcode to the chunk.
    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write_byte(op as u8, line);
    }

    /// Write a 16-bit value to the chunk (big-endian).
    pub fn write_u16(&mut self, value: u16, line: u32) {
        for byte in value.to_be_bytes() {
            self.write_byte(byte, line);
        }
    }

    /// Read a 16-bit value from the chunk at offset.
    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.code[offset], self.code[offset + 1]])
    }

    /// Add a constant to the pool and return its index, or `None` if the
    /// pool is already full. Nothing is written in that case.
    pub fn add_constant(&mut self, value: Value) -> Option<u8> {
        let index = u8::try_from(self.constants.len()).ok()?;
        self.constants.push(value);
        Some(index)
    }

    /// Get the current offset in the code.
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Point the jump operand at `offset` to the current end of the chunk.
    /// Returns `false`, leaving the placeholder, if the distance does not fit
    /// in 16 bits.
    pub fn patch_jump(&mut self, offset: usize) -> bool {
        let distance = self.code.len() - offset - 2;
        match u16::try_from(distance) {
            Ok(distance) => {
                self.patch_u16(offset, distance);
                true
            }
            Err(_) => false,
        }
    }

    /// Patch a u16 value at the given offset.
    pub fn patch_u16(&mut self, offset: usize, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.code[offset] = hi;
        self.code[offset + 1] = lo;
    }

    /// Get the line number at a given offset.
    pub fn get_line(&self, offset: usize) -> u32 {
        self.lines.get(offset).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chunk_basics() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write_byte(0, 1);
        chunk.write_op(OpCode::Return, 2);

        assert_eq!(chunk.code.len(), 3);
        assert_eq!(chunk.lines, vec![1, 1, 2]);
        assert_eq!(chunk.code[0], OpCode::Constant as u8);
        assert_eq!(chunk.get_line(2), 2);
        assert_eq!(chunk.get_line(99), 0);
    }

    #[test]
    fn test_u16_is_big_endian() {
        let mut chunk = Chunk::new();
        chunk.write_u16(0x1234, 1);
        assert_eq!(chunk.code, vec![0x12, 0x34]);
        assert_eq!(chunk.read_u16(0), 0x1234);
    }

    #[test]
    fn test_constant_pool_caps_at_256() {
        let mut chunk = Chunk::new();
        for i in 0..MAX_CONSTANTS {
            assert_eq!(chunk.add_constant(Value::Int(i as i64)), Some(i as u8));
        }
        assert_eq!(chunk.add_constant(Value::Null), None);
        assert_eq!(chunk.constants.len(), MAX_CONSTANTS);
    }

    #[test]
    fn test_jump_patching() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::JumpIfFalse, 1);
        let jump_offset = chunk.current_offset();
        chunk.write_u16(0xFFFF, 1); // Placeholder

        chunk.write_op(OpCode::Pop, 1);
        chunk.write_op(OpCode::Pop, 1);

        assert!(chunk.patch_jump(jump_offset));
        // Should jump over 2 Pop instructions (2 bytes)
        assert_eq!(chunk.read_u16(jump_offset), 2);
    }

    #[test]
    fn test_jump_too_far() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Jump, 1);
        chunk.write_u16(0xFFFF, 1);
        for _ in 0..=u16::MAX as usize {
            chunk.write_op(OpCode::Pop, 1);
        }
        assert!(!chunk.patch_jump(1));
        assert_eq!(chunk.read_u16(1), 0xFFFF);
    }
}
