//! End-to-end programs run through the public API.

use std::path::Path;

use clockwork::{InterpretError, RuntimeError, VM};
use pretty_assertions::assert_eq;

fn run(source: &str) -> Vec<String> {
    let mut vm = VM::new();
    vm.capture_output();
    vm.interpret(source).expect("program runs");
    vm.take_output()
}

fn compile_messages(source: &str) -> Vec<String> {
    match clockwork::compile(source) {
        Ok(_) => panic!("expected a compile error"),
        Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
    }
}

#[test]
fn test_precedence() {
    assert_eq!(run("print 1 + 2 * 3;"), vec!["7"]);
    assert_eq!(run("print (1 + 2) * 3;"), vec!["9"]);
    assert_eq!(run("print -2 * 3 + 10 / 4;"), vec!["-3.5"]);
    assert_eq!(run("print 1 < 2 == true;"), vec!["true"]);
    assert_eq!(run("print !(1 > 2) and 3 >= 3;"), vec!["true"]);
}

#[test]
fn test_literals_and_printing() {
    assert_eq!(
        run("print null; print true; print 0x1F; print 0b101; print 1_000; print 2.5;"),
        vec!["null", "true", "31", "5", "1000", "2.5"]
    );
    assert_eq!(run("print \"tab\\there\";"), vec!["tab\there"]);
}

#[test]
fn test_string_equality_uses_interning() {
    assert_eq!(
        run("let a = \"ab\"; let b = \"a\" + \"b\"; print a == b; print a != \"ba\";"),
        vec!["true", "true"]
    );
}

#[test]
fn test_mixed_number_equality() {
    assert_eq!(run("print 1 == 1.0; print 2 != 2.5;"), vec!["true", "true"]);
}

#[test]
fn test_block_shadowing() {
    assert_eq!(
        run("let a = 1; { let a = 2; print a; } print a;"),
        vec!["2", "1"]
    );
}

#[test]
fn test_nested_locals_and_assignment() {
    let source = "
        {
            let a = 1;
            {
                mut b = a + 1;
                b = b * 10;
                a = b;
            }
            print a;
        }
    ";
    assert_eq!(run(source), vec!["20"]);
}

#[test]
fn test_own_initializer_is_a_compile_error() {
    assert_eq!(
        compile_messages("{ let a = a; }"),
        vec!["[line 1] Error at 'a': Can not read local variable in its own initializer."]
    );
}

#[test]
fn test_control_flow() {
    assert_eq!(
        run("if (1 > 2) print 1; else print 2;"),
        vec!["2"]
    );
    assert_eq!(
        run("if (false) { print 1; } else { print 2; }"),
        vec!["2"]
    );
    assert_eq!(run("if (true) print 1;"), vec!["1"]);
    assert_eq!(
        run("let i = 0; while (i < 3) { print i; i = i + 1; }"),
        vec!["0", "1", "2"]
    );
    assert_eq!(
        run("for (let i = 0; i < 3; i = i + 1) print i * i;"),
        vec!["0", "1", "4"]
    );
}

#[test]
fn test_short_circuit_keeps_operand() {
    assert_eq!(
        run("print null or \"fallback\"; print false and undefined_name; print 0 and 5;"),
        vec!["fallback", "false", "5"]
    );
}

#[test]
fn test_add_type_error_leaves_vm_usable() {
    let mut vm = VM::new();
    vm.capture_output();

    let err = vm.interpret("1 + \"a\";").expect_err("type error");
    assert_eq!(
        err.to_string(),
        "Operands must be two numbers or two strings.\n[line 1] in script"
    );
    assert_eq!(err.exit_code(), 2);
    assert_eq!(vm.stack_len(), 0);

    vm.interpret("print 1 + 1;").expect("vm still works");
    assert_eq!(vm.take_output(), vec!["2"]);
}

#[test]
fn test_runtime_error_reports_line() {
    let mut vm = VM::new();
    vm.capture_output();
    let err = vm
        .interpret("let a = 1;\nprint a;\n-\"x\";")
        .expect_err("negating a string fails");
    match err {
        InterpretError::Runtime(RuntimeError::NumberOperand { line }) => assert_eq!(line, 3),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(vm.take_output(), vec!["1"]);
}

#[test]
fn test_globals_persist_across_calls() {
    let mut vm = VM::new();
    vm.capture_output();
    vm.interpret("let greeting = \"hi\";").expect("defines");
    vm.interpret("greeting = greeting + \"!\";").expect("assigns");
    vm.interpret("print greeting;").expect("prints");
    assert_eq!(vm.take_output(), vec!["hi!"]);
    assert_eq!(vm.globals(), vec!["greeting".to_string()]);
}

#[test]
fn test_assigning_undefined_global_fails() {
    let mut vm = VM::new();
    let err = vm.interpret("missing = 1;").expect_err("undefined");
    assert_eq!(
        err.to_string(),
        "Undefined variable 'missing'.\n[line 1] in script"
    );
    assert!(vm.global("missing").is_none());
}

#[test]
fn test_compile_errors_are_all_reported() {
    let mut vm = VM::new();
    let err = vm.interpret("print ;\nlet = 2;").expect_err("two errors");
    assert_eq!(err.exit_code(), 1);
    assert_eq!(
        err.to_string(),
        "[line 1] Error at ';': Expect expression.\n\
         [line 2] Error at '=': Expect variable name."
    );
}

#[test]
fn test_run_file_missing() {
    let mut vm = VM::new();
    let err = clockwork::run_file(&mut vm, Path::new("/no/such/dir/prog.cw"))
        .expect_err("missing file");
    assert_eq!(err.exit_code(), 1);
    assert!(err
        .to_string()
        .starts_with("Could not open file \"/no/such/dir/prog.cw\": "));
}

#[test]
fn test_disassemble_api() {
    let listing = clockwork::disassemble("print 1;").expect("compiles");
    assert_eq!(
        listing,
        "== code ==\n\
         0000    1 OP_CONSTANT         0 '1'\n\
         0002    | OP_PRINT\n\
         0003    | OP_RETURN\n"
    );
}
