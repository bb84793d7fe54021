//! Bytecode module for the Ferrite VM.
//!
//! # Architecture
//!
//! - `value`: runtime value representation
//! - `instruction`: OpCode definitions, instruction records, and the debug
//!   wire encoding
//! - `function_table`: name → entry metadata for compiled functions
//! - `module`: a compiled unit (instructions + constants + function table)
//! - `compiler`: transforms a type-checked AST into a module
//! - `vm`: stack-based virtual machine executing a module
//! - `disassembler`: debug output for bytecode inspection

pub mod compiler;
pub mod disassembler;
pub mod function_table;
pub mod instruction;
pub mod module;
pub mod value;
pub mod vm;

pub use compiler::Compiler;
pub use disassembler::{disassemble_module, print_disassembly};
pub use function_table::{FunctionInfo, FunctionTable};
pub use instruction::{Instruction, OpCode};
pub use module::BytecodeModule;
pub use value::Value;
pub use vm::VM;
