//! A compiled unit of bytecode.

use crate::bytecode::function_table::FunctionTable;
use crate::bytecode::instruction::Instruction;
use crate::bytecode::value::Value;

/// Everything the VM needs to execute a program: the instruction stream,
/// the constant pool, and the function table. All three are immutable for
/// the VM's lifetime.
#[derive(Debug, Clone, Default)]
pub struct BytecodeModule {
    pub instructions: Vec<Instruction>,
    pub constants: Vec<Value>,
    pub function_table: FunctionTable,
}
