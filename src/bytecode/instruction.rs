//! Bytecode instruction definitions for the clockwork VM.

/// Opcodes for the bytecode virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // ============ Constants & Stack ============
    /// Load a constant from the constant pool: CONSTANT <index:u8>
    Constant = 0,
    /// Push null onto the stack
    Null,
    /// Push true onto the stack
    True,
    /// Push false onto the stack
    False,
    /// Pop the top value from the stack
    Pop,

    // ============ Variables ============
    /// Get a local variable: GET_LOCAL <slot:u8>
    GetLocal,
    /// Set a local variable: SET_LOCAL <slot:u8>
    SetLocal,
    /// Define a global variable: DEFINE_GLOBAL <name_index:u8>
    DefineGlobal,
    /// Get a global variable: GET_GLOBAL <name_index:u8>
    GetGlobal,
    /// Set a global variable: SET_GLOBAL <name_index:u8>
    SetGlobal,

    // ============ Comparison ============
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,

    // ============ Arithmetic ============
    Add,
    Subtract,
    Multiply,
    Divide,

    // ============ Unary ============
    /// Logical not: !a
    Not,
    /// Negate a number: -a
    Negate,

    /// Pop and print the top of the stack
    Print,

    // ============ Control Flow ============
    /// Unconditional forward jump: JUMP <offset:u16>
    Jump,
    /// Pop, then jump if falsey: JUMP_IF_FALSE <offset:u16>
    JumpIfFalse,
    /// Jump if falsey, leaving the value: JUMP_IF_FALSE_NO_POP <offset:u16>
    JumpIfFalseNoPop,
    /// Jump if truthy, leaving the value: JUMP_IF_TRUE_NO_POP <offset:u16>
    JumpIfTrueNoPop,
    /// Backward jump: LOOP <offset:u16>
    Loop,

    /// Stop execution
    Return,
}

const ALL_OPCODES: [OpCode; 29] = [
    OpCode::Constant,
    OpCode::Null,
    OpCode::True,
    OpCode::False,
    OpCode::Pop,
    OpCode::GetLocal,
    OpCode::SetLocal,
    OpCode::DefineGlobal,
    OpCode::GetGlobal,
    OpCode::SetGlobal,
    OpCode::Equal,
    OpCode::NotEqual,
    OpCode::Less,
    OpCode::Greater,
    OpCode::LessEqual,
    OpCode::GreaterEqual,
    OpCode::Add,
    OpCode::Subtract,
    OpCode::Multiply,
    OpCode::Divide,
    OpCode::Not,
    OpCode::Negate,
    OpCode::Print,
    OpCode::Jump,
    OpCode::JumpIfFalse,
    OpCode::JumpIfFalseNoPop,
    OpCode::JumpIfTrueNoPop,
    OpCode::Loop,
    OpCode::Return,
];

impl OpCode {
    /// Get the number of operand bytes for this opcode.
    pub fn operand_size(self) -> usize {
        match self {
            // 1 byte operand
            OpCode::Constant
            | OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::DefineGlobal
            | OpCode::GetGlobal
            | OpCode::SetGlobal => 1,

            // 2 byte operand (big-endian)
            OpCode::Jump
            | OpCode::JumpIfFalse
            | OpCode::JumpIfFalseNoPop
            | OpCode::JumpIfTrueNoPop
            | OpCode::Loop => 2,

            _ => 0,
        }
    }

    /// Convert from u8 to OpCode.
    pub fn from_u8(byte: u8) -> Option<OpCode> {
        ALL_OPCODES.get(byte as usize).copied()
    }

    /// Upper-case mnemonic used by the disassembler.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Constant => "OP_CONSTANT",
            OpCode::Null => "OP_NULL",
            OpCode::True => "OP_TRUE",
            OpCode::False => "OP_FALSE",
            OpCode::Pop => "OP_POP",
            OpCode::GetLocal => "OP_GET_LOCAL",
            OpCode::SetLocal => "OP_SET_LOCAL",
            OpCode::DefineGlobal => "OP_DEFINE_GLOBAL",
            OpCode::GetGlobal => "OP_GET_GLOBAL",
            OpCode::SetGlobal => "OP_SET_GLOBAL",
            OpCode::Equal => "OP_EQUAL",
            OpCode::NotEqual => "OP_NOT_EQUAL",
            OpCode::Less => "OP_LESS",
            OpCode::Greater => "OP_GREATER",
            OpCode::LessEqual => "OP_LESS_EQUAL",
            OpCode::GreaterEqual => "OP_GREATER_EQUAL",
            OpCode::Add => "OP_ADD",
            OpCode::Subtract => "OP_SUBTRACT",
            OpCode::Multiply => "OP_MULTIPLY",
            OpCode::Divide => "OP_DIVIDE",
            OpCode::Not => "OP_NOT",
            OpCode::Negate => "OP_NEGATE",
            OpCode::Print => "OP_PRINT",
            OpCode::Jump => "OP_JUMP",
            OpCode::JumpIfFalse => "OP_JUMP_IF_FALSE",
            OpCode::JumpIfFalseNoPop => "OP_JUMP_IF_FALSE_NO_POP",
            OpCode::JumpIfTrueNoPop => "OP_JUMP_IF_TRUE_NO_POP",
            OpCode::Loop => "OP_LOOP",
            OpCode::Return => "OP_RETURN",
        }
    }
}
