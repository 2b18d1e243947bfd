//! clockwork CLI: run a file, evaluate a string or start the REPL.

use std::env;
use std::path::Path;
use std::process;

use colored::Colorize;

use clockwork::{InterpretError, VmConfig, VM};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit status for command-line usage errors.
const EXIT_USAGE: i32 = 64;

/// CLI command to execute.
enum Command {
    /// Run a script file
    Run { file: String },
    /// Evaluate a string
    Eval { code: String },
    /// Start the REPL
    Repl,
    Help,
    Version,
}

/// CLI options parsed from arguments.
struct Options {
    command: Command,
    config: VmConfig,
}

fn print_usage() {
    eprintln!("clockwork {}", VERSION);
    eprintln!();
    eprintln!("Usage: clockwork [options] [script]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -e <code>        Evaluate code");
    eprintln!("  --disassemble    Print the bytecode of each compiled chunk");
    eprintln!("  --trace          Trace the stack and every instruction while running");
    eprintln!("  --version        Print the version");
    eprintln!("  --help, -h       Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  clockwork                     Start interactive REPL");
    eprintln!("  clockwork script.cw           Run a script file");
    eprintln!("  clockwork -e 'print 1 + 2;'   Evaluate code directly");
}

fn usage_error(message: &str) -> ! {
    eprintln!("{}", message.red());
    print_usage();
    process::exit(EXIT_USAGE);
}

fn parse_args(args: &[String]) -> Options {
    let mut options = Options {
        command: Command::Repl,
        config: VmConfig::default(),
    };
    let mut target: Option<Command> = None;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "-h" | "--help" => return Options {
                command: Command::Help,
                ..options
            },
            "--version" => return Options {
                command: Command::Version,
                ..options
            },
            "--disassemble" => options.config.print_code = true,
            "--trace" => options.config.trace_execution = true,
            "-e" => {
                i += 1;
                let Some(code) = args.get(i) else {
                    usage_error("-e requires code to evaluate");
                };
                if target.is_some() {
                    usage_error("Only one script or -e expression may be given");
                }
                target = Some(Command::Eval { code: code.clone() });
            }
            flag if flag.starts_with('-') => {
                usage_error(&format!("Unknown option: {}", flag));
            }
            file => {
                if target.is_some() {
                    usage_error(&format!("Unexpected argument: {}", file));
                }
                target = Some(Command::Run {
                    file: file.to_string(),
                });
            }
        }
        i += 1;
    }

    if let Some(command) = target {
        options.command = command;
    }
    options
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let options = parse_args(&args);

    match options.command {
        Command::Help => print_usage(),
        Command::Version => println!("clockwork {}", VERSION),
        Command::Repl => clockwork::repl::run_repl(options.config),
        Command::Run { file } => {
            let mut vm = VM::with_config(options.config);
            exit_on_error(clockwork::run_file(&mut vm, Path::new(&file)));
        }
        Command::Eval { code } => {
            let mut vm = VM::with_config(options.config);
            exit_on_error(vm.interpret(&code));
        }
    }
}

fn exit_on_error(result: Result<(), InterpretError>) {
    if let Err(err) = result {
        eprintln!("{}", err.to_string().red());
        process::exit(err.exit_code());
    }
}
