//! Ferrite: a statically-typed, Rust-like language with a bytecode VM.
//!
//! This is the library root that exports all modules.
//!
//! # Pipeline
//!
//! Source text → [`parser::Parser`] → AST → [`types::TypeChecker`] →
//! [`bytecode::Compiler`] → (instructions, constants, function table) →
//! [`bytecode::VM`] → result [`bytecode::Value`].

#![allow(clippy::module_inception)]
#![allow(clippy::result_large_err)]
#![allow(clippy::new_without_default)]

pub mod ast;
pub mod bytecode;
pub mod error;
pub mod parser;
pub mod span;
pub mod types;

use bytecode::{BytecodeModule, Value};
use error::FerriteError;

/// Parse source code into an AST without executing.
pub fn parse(source: &str) -> Result<ast::Program, Vec<error::ParserError>> {
    parser::Parser::new(source).parse()
}

/// Type check a program without executing.
pub fn type_check(source: &str) -> Result<(), FerriteError> {
    let program = parse(source).map_err(first_parse_error)?;
    types::TypeChecker::new()
        .check(&program)
        .map_err(first_type_error)
}

/// Compile source code to bytecode without executing.
pub fn compile(source: &str) -> Result<BytecodeModule, FerriteError> {
    let program = parse(source).map_err(first_parse_error)?;
    types::TypeChecker::new()
        .check(&program)
        .map_err(first_type_error)?;
    let module = bytecode::Compiler::new().compile(&program)?;
    Ok(module)
}

/// Run a Ferrite program and return the entry function's value.
pub fn run(source: &str) -> Result<Option<Value>, FerriteError> {
    run_with_options(source, true, false)
}

/// Run a Ferrite program with optional type checking and disassembly.
pub fn run_with_options(
    source: &str,
    type_check: bool,
    disassemble: bool,
) -> Result<Option<Value>, FerriteError> {
    let program = parse(source).map_err(first_parse_error)?;

    if type_check {
        types::TypeChecker::new()
            .check(&program)
            .map_err(first_type_error)?;
    }

    let module = bytecode::Compiler::new().compile(&program)?;
    if disassemble {
        bytecode::print_disassembly(&module);
        println!("---");
    }

    let mut vm = bytecode::VM::new(module)?;
    vm.run()?;
    Ok(vm.result())
}

fn first_parse_error(mut errors: Vec<error::ParserError>) -> FerriteError {
    // Callers that want the full list use `parse` directly.
    FerriteError::Parser(errors.remove(0))
}

fn first_type_error(mut errors: Vec<error::TypeError>) -> FerriteError {
    FerriteError::Type(errors.remove(0))
}
