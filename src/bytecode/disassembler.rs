//! Bytecode disassembler for debugging.

use std::collections::HashMap;
use std::fmt::Write;

use crate::bytecode::instruction::OpCode;
use crate::bytecode::module::BytecodeModule;

/// Disassemble a compiled module into human-readable output.
pub fn disassemble_module(module: &BytecodeModule) -> String {
    let mut output = String::new();

    let mut headers: HashMap<usize, String> = HashMap::new();
    for (index, (name, info)) in module.function_table.iter().enumerate() {
        headers.insert(
            info.entry_pc,
            format!(
                "== {} (#{}, params: {}, locals: {}) ==",
                name, index, info.num_params, info.num_locals
            ),
        );
    }

    for (pc, instr) in module.instructions.iter().enumerate() {
        if let Some(header) = headers.get(&pc) {
            writeln!(&mut output, "{}", header).unwrap();
        }

        write!(&mut output, "{:04} {}", pc, instr.opcode).unwrap();
        if instr.opcode.has_operand() {
            write!(&mut output, " {}", instr.operand).unwrap();
            match instr.opcode {
                OpCode::PushStr => {
                    if let Some(constant) = module.constants.get(instr.operand) {
                        write!(&mut output, " ; \"{}\"", constant).unwrap();
                    }
                }
                OpCode::PushI32 => {
                    write!(&mut output, " ; {}", instr.operand as u32 as i32).unwrap();
                }
                OpCode::Call => {
                    if let Some((name, _)) = module.function_table.get_index(instr.operand) {
                        write!(&mut output, " ; {}", name).unwrap();
                    }
                }
                _ => {}
            }
        }
        writeln!(&mut output).unwrap();
    }

    output
}

/// Print a module's disassembly to stdout.
pub fn print_disassembly(module: &BytecodeModule) {
    print!("{}", disassemble_module(module));
}
