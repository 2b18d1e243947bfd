//! Runtime limits and debug switches for the VM.

/// Default operand stack capacity, in values.
pub const DEFAULT_STACK_MAX: usize = 256;

/// VM configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Maximum number of values on the operand stack.
    pub stack_max: usize,
    /// Print the stack and each instruction before it executes.
    pub trace_execution: bool,
    /// Print the disassembled chunk after every successful compile.
    pub print_code: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_max: DEFAULT_STACK_MAX,
            trace_execution: false,
            print_code: false,
        }
    }
}

impl VmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack_max(mut self, stack_max: usize) -> Self {
        self.stack_max = stack_max;
        self
    }

    pub fn with_trace_execution(mut self, enabled: bool) -> Self {
        self.trace_execution = enabled;
        self
    }

    pub fn with_print_code(mut self, enabled: bool) -> Self {
        self.print_code = enabled;
        self
    }
}
