//! Stack-based virtual machine for executing bytecode.

use std::fmt::Write;
use std::rc::Rc;

use crate::bytecode::chunk::Chunk;
use crate::bytecode::compiler::compile;
use crate::bytecode::disassembler::{disassemble_chunk, disassemble_instruction};
use crate::bytecode::instruction::OpCode;
use crate::bytecode::object::{hash_string, Heap, ObjString};
use crate::bytecode::table::Table;
use crate::bytecode::value::Value;
use crate::config::VmConfig;
use crate::error::{InterpretError, RuntimeError};

/// Result type for VM operations.
pub type VMResult<T> = Result<T, RuntimeError>;

/// The virtual machine. Globals and heap objects persist across calls to
/// [`VM::interpret`], so one VM can serve a whole REPL session.
pub struct VM {
    config: VmConfig,
    chunk: Chunk,
    /// Offset of the next byte to execute in `chunk.code`.
    ip: usize,
    stack: Vec<Value>,
    globals: Table,
    heap: Heap,
    /// Captured output lines; `None` means print to stdout.
    output: Option<Vec<String>>,
}

impl VM {
    /// Create a new VM.
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            stack: Vec::with_capacity(config.stack_max),
            config,
            chunk: Chunk::new(),
            ip: 0,
            globals: Table::new(),
            heap: Heap::new(),
            output: None,
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Compile and run `source`. On a runtime error the stack is cleared and
    /// the VM stays usable; globals defined before the error are kept.
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        let chunk = compile(source, &mut self.heap)?;

        if self.config.print_code {
            let listing = disassemble_chunk(&chunk, "code");
            self.write_debug(&listing);
        }

        self.chunk = chunk;
        self.ip = 0;

        if let Err(err) = self.run() {
            self.reset_stack();
            return Err(err.into());
        }
        Ok(())
    }

    /// Send `print` output to an in-memory buffer instead of stdout.
    pub fn capture_output(&mut self) {
        self.output = Some(Vec::new());
    }

    /// Drain the captured output lines.
    pub fn take_output(&mut self) -> Vec<String> {
        self.output.as_mut().map(std::mem::take).unwrap_or_default()
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Value of the global called `name`, if defined.
    pub fn global(&self, name: &str) -> Option<&Value> {
        let key = self
            .heap
            .strings()
            .find_key_by_content(name, hash_string(name))?;
        self.globals.find(&key)
    }

    /// Names of all defined globals, sorted.
    pub fn globals(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .globals
            .iter()
            .map(|(key, _)| key.as_str().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    fn reset_stack(&mut self) {
        self.stack.clear();
    }

    /// Main execution loop.
    fn run(&mut self) -> VMResult<()> {
        loop {
            if self.config.trace_execution {
                self.trace_instruction();
            }

            let byte = self.read_byte()?;
            let Some(opcode) = OpCode::from_u8(byte) else {
                return Err(RuntimeError::UnknownOpcode {
                    opcode: byte,
                    line: self.current_line(),
                });
            };

            match opcode {
                OpCode::Constant => {
                    let value = self.read_constant()?;
                    self.push(value)?;
                }

                OpCode::Null => self.push(Value::Null)?,
                OpCode::True => self.push(Value::Bool(true))?,
                OpCode::False => self.push(Value::Bool(false))?,

                OpCode::Pop => {
                    self.pop()?;
                }

                OpCode::GetLocal => {
                    let slot = self.read_byte()? as usize;
                    let value = match self.stack.get(slot) {
                        Some(value) => value.clone(),
                        None => return Err(self.malformed("local slot out of range")),
                    };
                    self.push(value)?;
                }

                OpCode::SetLocal => {
                    let slot = self.read_byte()? as usize;
                    if slot >= self.stack.len() {
                        return Err(self.malformed("local slot out of range"));
                    }
                    let value = self.peek(0)?.clone();
                    self.stack[slot] = value;
                }

                OpCode::DefineGlobal => {
                    let name = self.read_string()?;
                    let value = self.peek(0)?.clone();
                    self.globals.insert(name, value);
                    self.pop()?;
                }

                OpCode::GetGlobal => {
                    let name = self.read_string()?;
                    let value = match self.globals.find(&name) {
                        Some(value) => value.clone(),
                        None => {
                            return Err(RuntimeError::undefined_variable(
                                name.as_str(),
                                self.current_line(),
                            ))
                        }
                    };
                    self.push(value)?;
                }

                OpCode::SetGlobal => {
                    let name = self.read_string()?;
                    let value = self.peek(0)?.clone();
                    if self.globals.insert(Rc::clone(&name), value) {
                        // Assignment never creates a global.
                        self.globals.remove(&name);
                        return Err(RuntimeError::undefined_variable(
                            name.as_str(),
                            self.current_line(),
                        ));
                    }
                }

                OpCode::Equal => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.push(Value::Bool(a == b))?;
                }
                OpCode::NotEqual => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.push(Value::Bool(a != b))?;
                }

                OpCode::Less => self.comparison_op(|a, b| a < b)?,
                OpCode::Greater => self.comparison_op(|a, b| a > b)?,
                OpCode::LessEqual => self.comparison_op(|a, b| a <= b)?,
                OpCode::GreaterEqual => self.comparison_op(|a, b| a >= b)?,

                OpCode::Add => self.add()?,
                OpCode::Subtract => self.arithmetic_op(i64::checked_sub, |a, b| a - b)?,
                OpCode::Multiply => self.arithmetic_op(i64::checked_mul, |a, b| a * b)?,
                OpCode::Divide => self.arithmetic_op(|_, _| None, |a, b| a / b)?,

                OpCode::Not => {
                    let value = self.pop()?;
                    self.push(Value::Bool(value.is_falsey()))?;
                }

                OpCode::Negate => {
                    if !self.peek(0)?.is_number() {
                        return Err(RuntimeError::NumberOperand {
                            line: self.current_line(),
                        });
                    }
                    let negated = match self.pop()? {
                        Value::Int(n) => n
                            .checked_neg()
                            .map(Value::Int)
                            .unwrap_or(Value::Float(-(n as f64))),
                        Value::Float(n) => Value::Float(-n),
                        _ => return Err(self.malformed("negate of non-number")),
                    };
                    self.push(negated)?;
                }

                OpCode::Print => {
                    let value = self.pop()?;
                    self.write_line(value.to_string());
                }

                OpCode::Jump => {
                    let offset = self.read_u16()? as usize;
                    self.ip += offset;
                }

                OpCode::JumpIfFalse => {
                    let offset = self.read_u16()? as usize;
                    if self.pop()?.is_falsey() {
                        self.ip += offset;
                    }
                }

                OpCode::JumpIfFalseNoPop => {
                    let offset = self.read_u16()? as usize;
                    if self.peek(0)?.is_falsey() {
                        self.ip += offset;
                    }
                }

                OpCode::JumpIfTrueNoPop => {
                    let offset = self.read_u16()? as usize;
                    if !self.peek(0)?.is_falsey() {
                        self.ip += offset;
                    }
                }

                OpCode::Loop => {
                    let offset = self.read_u16()? as usize;
                    self.ip = match self.ip.checked_sub(offset) {
                        Some(ip) => ip,
                        None => return Err(self.malformed("loop jumps before start of chunk")),
                    };
                }

                OpCode::Return => return Ok(()),
            }
        }
    }

    // ===== Instruction decoding =====

    fn read_byte(&mut self) -> VMResult<u8> {
        let byte = match self.chunk.code.get(self.ip) {
            Some(byte) => *byte,
            None => return Err(self.malformed("ran past end of chunk")),
        };
        self.ip += 1;
        Ok(byte)
    }

    fn read_u16(&mut self) -> VMResult<u16> {
        let hi = self.read_byte()?;
        let lo = self.read_byte()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    fn read_constant(&mut self) -> VMResult<Value> {
        let index = self.read_byte()? as usize;
        match self.chunk.constants.get(index) {
            Some(value) => Ok(value.clone()),
            None => Err(self.malformed("constant index out of range")),
        }
    }

    fn read_string(&mut self) -> VMResult<Rc<ObjString>> {
        match self.read_constant()?.as_string() {
            Some(name) => Ok(Rc::clone(name)),
            None => Err(self.malformed("variable name is not a string")),
        }
    }

    /// Source line of the instruction currently executing.
    fn current_line(&self) -> u32 {
        self.chunk.get_line(self.ip.saturating_sub(1))
    }

    fn malformed(&self, message: &str) -> RuntimeError {
        RuntimeError::malformed(message, self.current_line())
    }

    // ===== Stack =====

    fn push(&mut self, value: Value) -> VMResult<()> {
        if self.stack.len() >= self.config.stack_max {
            return Err(RuntimeError::StackOverflow {
                line: self.current_line(),
            });
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> VMResult<Value> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => Err(self.malformed("stack underflow")),
        }
    }

    fn peek(&self, distance: usize) -> VMResult<&Value> {
        let index = self.stack.len().checked_sub(1 + distance);
        match index.and_then(|i| self.stack.get(i)) {
            Some(value) => Ok(value),
            None => Err(self.malformed("stack underflow")),
        }
    }

    // ===== Operators =====

    /// Operand types are checked before anything is popped.
    fn check_number_operands(&self) -> VMResult<()> {
        if self.peek(0)?.is_number() && self.peek(1)?.is_number() {
            Ok(())
        } else {
            Err(RuntimeError::NumberOperands {
                line: self.current_line(),
            })
        }
    }

    fn pop_numbers(&mut self) -> VMResult<(Value, Value)> {
        let b = self.pop()?;
        let a = self.pop()?;
        Ok((a, b))
    }

    /// Int op Int stays an Int unless it overflows (or `int_op` declines);
    /// anything else is computed in f64.
    fn arithmetic_op(
        &mut self,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> VMResult<()> {
        self.check_number_operands()?;
        let (a, b) = self.pop_numbers()?;

        let result = if let (Value::Int(x), Value::Int(y)) = (&a, &b) {
            int_op(*x, *y).map(Value::Int)
        } else {
            None
        };
        let result = match result {
            Some(value) => value,
            None => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Value::Float(float_op(x, y)),
                _ => return Err(self.malformed("arithmetic on non-numbers")),
            },
        };

        self.push(result)
    }

    fn comparison_op(&mut self, op: fn(f64, f64) -> bool) -> VMResult<()> {
        self.check_number_operands()?;
        let (a, b) = self.pop_numbers()?;

        match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => self.push(Value::Bool(op(x, y))),
            _ => Err(self.malformed("comparison of non-numbers")),
        }
    }

    fn add(&mut self) -> VMResult<()> {
        let both_strings = self.peek(0)?.is_string() && self.peek(1)?.is_string();
        if both_strings {
            let b = self.pop()?;
            let a = self.pop()?;
            let result = match (a.as_string(), b.as_string()) {
                (Some(a), Some(b)) => self.heap.concat(a, b),
                _ => return Err(self.malformed("concatenation of non-strings")),
            };
            return self.push(Value::string(result));
        }

        let both_numbers = self.peek(0)?.is_number() && self.peek(1)?.is_number();
        if !both_numbers {
            return Err(RuntimeError::AddOperands {
                line: self.current_line(),
            });
        }
        self.arithmetic_op(i64::checked_add, |a, b| a + b)
    }

    // ===== Output =====

    fn write_line(&mut self, line: String) {
        match &mut self.output {
            Some(lines) => lines.push(line),
            None => println!("{}", line),
        }
    }

    fn write_debug(&mut self, text: &str) {
        for line in text.lines() {
            self.write_line(line.to_string());
        }
    }

    fn trace_instruction(&mut self) {
        if self.ip >= self.chunk.code.len() {
            return;
        }

        let mut text = String::from("          ");
        for slot in &self.stack {
            write!(text, "[ {} ]", slot).unwrap();
        }
        text.push('\n');
        disassemble_instruction(&self.chunk, self.ip, &mut text);
        self.write_debug(&text);
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}
