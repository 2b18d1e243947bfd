//! Line-oriented REPL.
//!
//! One VM lives for the whole session, so globals defined on one line are
//! visible on the next. Input is buffered while braces are unbalanced.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::config::VmConfig;
use crate::error::InterpretError;
use crate::VM;

const HISTORY_FILE: &str = ".clockwork_history";
const PROMPT: &str = "> ";
const CONTINUATION_PROMPT: &str = "... ";

/// What the read loop should do after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplAction {
    Continue,
    Exit,
}

pub struct Repl {
    vm: VM,
    history: Vec<String>,
    history_file: PathBuf,
    multiline_buffer: String,
    brace_balance: i32,
}

impl Repl {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        let mut repl = Self {
            vm: VM::with_config(config),
            history: Vec::new(),
            history_file: Self::history_path(),
            multiline_buffer: String::new(),
            brace_balance: 0,
        };
        repl.load_history();
        repl
    }

    fn history_path() -> PathBuf {
        match dirs::home_dir() {
            Some(home) => home.join(HISTORY_FILE),
            None => PathBuf::from(HISTORY_FILE),
        }
    }

    fn load_history(&mut self) {
        if let Ok(content) = std::fs::read_to_string(&self.history_file) {
            self.history.extend(
                content
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(str::to_string),
            );
        }
    }

    fn save_history(&self) {
        let _ = std::fs::write(&self.history_file, self.history.join("\n"));
    }

    pub fn vm(&self) -> &VM {
        &self.vm
    }

    pub fn vm_mut(&mut self) -> &mut VM {
        &mut self.vm
    }

    pub fn is_multiline(&self) -> bool {
        !self.multiline_buffer.is_empty()
    }

    /// Read lines from stdin until EOF or `.exit`.
    pub fn run(&mut self) {
        println!("clockwork {}", env!("CARGO_PKG_VERSION"));
        println!("Type .help for available commands.");

        let stdin = io::stdin();
        let mut input = stdin.lock();

        loop {
            let prompt = if self.is_multiline() {
                CONTINUATION_PROMPT
            } else {
                PROMPT
            };
            print!("{}", prompt);
            let _ = io::stdout().flush();

            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) => {
                    println!();
                    break;
                }
                Ok(_) => {
                    if self.handle_line(line.trim_end_matches(&['\n', '\r'][..])) == ReplAction::Exit {
                        break;
                    }
                }
                Err(err) => {
                    eprintln!("{}", format!("Could not read input: {}", err).red());
                    break;
                }
            }
        }

        self.save_history();
    }

    /// Feed one line of input.
    pub fn handle_line(&mut self, line: &str) -> ReplAction {
        if self.is_multiline() {
            self.multiline_buffer.push('\n');
            self.multiline_buffer.push_str(line);
            self.brace_balance += count_braces(line);
            if self.brace_balance <= 0 {
                let code = std::mem::take(&mut self.multiline_buffer);
                self.brace_balance = 0;
                self.history.push(code.clone());
                self.execute(&code);
            }
            return ReplAction::Continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ReplAction::Continue;
        }

        if trimmed.starts_with('.') {
            self.history.push(trimmed.to_string());
            return self.handle_command(trimmed);
        }

        let balance = count_braces(line);
        if balance > 0 {
            self.multiline_buffer = line.to_string();
            self.brace_balance = balance;
            return ReplAction::Continue;
        }

        self.history.push(line.to_string());
        self.execute(line);
        ReplAction::Continue
    }

    fn handle_command(&mut self, line: &str) -> ReplAction {
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            ".help" => self.cmd_help(),
            ".vars" => self.cmd_vars(),
            ".history" => self.cmd_history(),
            ".clear" => self.cmd_clear(),
            ".load" if argument.is_empty() => println!("Usage: .load <file>"),
            ".load" => self.cmd_load(Path::new(argument)),
            ".disasm" if argument.is_empty() => println!("Usage: .disasm <code>"),
            ".disasm" => self.cmd_disasm(argument),
            ".exit" => return ReplAction::Exit,
            _ => println!(
                "Unknown command: {}. Type .help for available commands.",
                command
            ),
        }
        ReplAction::Continue
    }

    fn cmd_help(&self) {
        println!();
        println!(".help           Show this help message");
        println!(".vars           List global variables and their values");
        println!(".history        Show command history");
        println!(".clear          Start over with a fresh VM");
        println!(".load <file>    Run a file in this session");
        println!(".disasm <code>  Show the bytecode for a snippet");
        println!(".exit           Leave the REPL (Ctrl+D also works)");
        println!();
    }

    fn cmd_vars(&self) {
        let names = self.vm.globals();
        if names.is_empty() {
            println!("No variables defined.");
            return;
        }
        for name in names {
            if let Some(value) = self.vm.global(&name) {
                println!("  {} = {}", name, value);
            }
        }
    }

    fn cmd_history(&self) {
        for (i, entry) in self.history.iter().enumerate() {
            println!("{:4}  {}", i + 1, entry);
        }
    }

    fn cmd_clear(&mut self) {
        self.vm = VM::with_config(self.vm.config().clone());
        self.multiline_buffer.clear();
        self.brace_balance = 0;
        println!("Environment reset.");
    }

    fn cmd_load(&mut self, path: &Path) {
        if let Err(err) = crate::run_file(&mut self.vm, path) {
            report(&err);
        }
    }

    fn cmd_disasm(&self, code: &str) {
        match crate::disassemble(code) {
            Ok(listing) => print!("{}", listing),
            Err(errors) => report(&InterpretError::Compile(errors)),
        }
    }

    fn execute(&mut self, code: &str) {
        if let Err(err) = self.vm.interpret(code) {
            report(&err);
        }
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

fn report(err: &InterpretError) {
    eprintln!("{}", err.to_string().red());
}

/// Net `{` minus `}` in `s`, ignoring braces inside string literals and
/// comments. A block comment left open on this line hides the rest of it.
pub fn count_braces(s: &str) -> i32 {
    let mut balance = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut comment_depth = 0;
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if comment_depth > 0 {
            match (c, chars.peek().copied()) {
                ('*', Some('/')) => {
                    chars.next();
                    comment_depth -= 1;
                }
                ('/', Some('*')) => {
                    chars.next();
                    comment_depth += 1;
                }
                _ => {}
            }
        } else if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else {
            match (c, chars.peek().copied()) {
                ('/', Some('/')) => break,
                ('/', Some('*')) => {
                    chars.next();
                    comment_depth = 1;
                }
                ('"', _) => in_string = true,
                ('{', _) => balance += 1,
                ('}', _) => balance -= 1,
                _ => {}
            }
        }
    }
    balance
}

/// Start an interactive session with the given configuration.
pub fn run_repl(config: VmConfig) {
    Repl::with_config(config).run();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Value;
    use pretty_assertions::assert_eq;

    fn repl() -> Repl {
        let mut repl = Repl {
            vm: VM::new(),
            history: Vec::new(),
            history_file: PathBuf::from(HISTORY_FILE),
            multiline_buffer: String::new(),
            brace_balance: 0,
        };
        repl.vm.capture_output();
        repl
    }

    #[test]
    fn test_count_braces() {
        assert_eq!(count_braces("{"), 1);
        assert_eq!(count_braces("{ { }"), 1);
        assert_eq!(count_braces("}"), -1);
        assert_eq!(count_braces("print \"{\";"), 0);
        assert_eq!(count_braces("print \"a\\\"{\";"), 0);
        assert_eq!(count_braces("print 1; // {"), 0);
        assert_eq!(count_braces("/* { /* { */ } */ {"), 1);
        assert_eq!(count_braces("{ /* }"), 1);
    }

    #[test]
    fn test_brace_in_comment_does_not_start_block() {
        let mut repl = repl();
        repl.handle_line("print 1; // {");
        assert!(!repl.is_multiline());
        assert_eq!(repl.vm_mut().take_output(), vec!["1"]);
    }

    #[test]
    fn test_globals_persist_between_lines() {
        let mut repl = repl();
        repl.handle_line("let a = 1;");
        repl.handle_line("print a + 1;");
        assert_eq!(repl.vm_mut().take_output(), vec!["2"]);
    }

    #[test]
    fn test_multiline_block() {
        let mut repl = repl();
        repl.handle_line("let total = 0;");
        repl.handle_line("for (let i = 0; i < 3; i = i + 1) {");
        assert!(repl.is_multiline());
        repl.handle_line("  total = total + i;");
        assert!(repl.vm_mut().take_output().is_empty());
        repl.handle_line("}");
        assert!(!repl.is_multiline());
        assert_eq!(repl.vm().global("total"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_error_keeps_session_alive() {
        let mut repl = repl();
        repl.handle_line("let a = 10;");
        repl.handle_line("print 1 + \"x\";");
        repl.handle_line("print a;");
        assert_eq!(repl.vm_mut().take_output(), vec!["10"]);
        assert_eq!(repl.vm().stack_len(), 0);
    }

    #[test]
    fn test_commands() {
        let mut repl = repl();
        repl.handle_line("let a = 1;");
        assert_eq!(repl.handle_line(".vars"), ReplAction::Continue);
        assert_eq!(repl.handle_line(".clear"), ReplAction::Continue);
        assert_eq!(repl.vm().global("a"), None);
        assert_eq!(repl.handle_line(".nope"), ReplAction::Continue);
        assert_eq!(repl.handle_line(".exit"), ReplAction::Exit);
        assert_eq!(repl.history.len(), 5);
    }

    #[test]
    fn test_load_missing_file_is_reported() {
        let mut repl = repl();
        assert_eq!(
            repl.handle_line(".load /definitely/not/here.cw"),
            ReplAction::Continue
        );
        assert_eq!(repl.vm().stack_len(), 0);
    }
}
