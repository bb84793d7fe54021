//! Ferrite CLI: compile and execute a source file.

use std::env;
use std::fs;
use std::process;

use ferrite::bytecode::{Compiler, VM};
use ferrite::parser::Parser;
use ferrite::types::TypeChecker;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI options parsed from arguments.
struct Options {
    file: String,
    type_check: bool,
    disassemble: bool,
}

fn print_usage() {
    eprintln!("Ferrite {} - Ferrite compiler and VM", VERSION);
    eprintln!();
    eprintln!("Usage: ferrite [options] <script.fe>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --no-type-check Skip type checking");
    eprintln!("  --disassemble   Print bytecode before executing");
    eprintln!("  --help, -h      Show this help message");
}

fn parse_args(args: &[String]) -> Option<Options> {
    let mut file = None;
    let mut type_check = true;
    let mut disassemble = false;

    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return None,
            "--no-type-check" => type_check = false,
            "--disassemble" => disassemble = true,
            _ if arg.starts_with('-') => {
                eprintln!("Unknown option: {}", arg);
                return None;
            }
            _ => {
                if file.is_some() {
                    eprintln!("Only one script file may be given");
                    return None;
                }
                file = Some(arg.clone());
            }
        }
    }

    Some(Options {
        file: file?,
        type_check,
        disassemble,
    })
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let Some(options) = parse_args(&args) else {
        print_usage();
        process::exit(1);
    };

    let source = match fs::read_to_string(&options.file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Failed to read '{}': {}", options.file, err);
            process::exit(1);
        }
    };

    let program = match Parser::new(&source).parse() {
        Ok(program) => program,
        Err(errors) => {
            for err in &errors {
                eprintln!("Parse error: {}", err);
            }
            process::exit(1);
        }
    };

    if options.type_check {
        if let Err(errors) = TypeChecker::new().check(&program) {
            for err in &errors {
                eprintln!("Type error: {}", err);
            }
            process::exit(1);
        }
    }

    let module = match Compiler::new().compile(&program) {
        Ok(module) => module,
        Err(err) => {
            eprintln!("Compile error: {}", err);
            process::exit(1);
        }
    };

    if options.disassemble {
        ferrite::bytecode::print_disassembly(&module);
        println!("---");
    }

    let mut vm = match VM::new(module) {
        Ok(vm) => vm,
        Err(err) => {
            eprintln!("Load error: {}", err);
            process::exit(1);
        }
    };

    if let Err(err) = vm.run() {
        eprintln!("Runtime error: {}", err);
        process::exit(1);
    }

    match vm.result() {
        Some(value) => println!("{}", value),
        None => println!("(no value)"),
    }
}
