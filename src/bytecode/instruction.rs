//! Bytecode instruction definitions for the Ferrite VM.

use std::fmt;

use crate::error::LoadError;

/// Opcodes for the bytecode virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // ============ Stack ============
    /// Push an integer literal: PUSH_I32 <value>
    PushI32 = 0,
    /// Push a boolean: PUSH_BOOL <0|1>
    PushBool,
    /// Push a constant-pool string: PUSH_STR <index>
    PushStr,
    /// Pop the top value from the stack
    Pop,
    /// Duplicate the top value on the stack
    Dup,
    /// Exchange the top two values
    Swap,

    // ============ Locals ============
    /// Load a local: LOAD <slot>
    Load,
    /// Pop a value into a local: STORE <slot>
    Store,
    /// Push a reference aliasing a local: LOAD_REF <slot>
    LoadRef,
    /// Pop a reference, then a value, and write through the reference
    StoreRef,

    // ============ Arithmetic ============
    /// Add two i32: a + b
    AddI32,
    /// Subtract: a - b
    SubI32,
    /// Multiply: a * b
    MulI32,
    /// Divide: a / b (faults on zero divisor)
    DivI32,
    /// Negate: -a
    NegI32,

    // ============ Comparison ============
    /// Equal: a == b
    EqI32,
    /// Not equal: a != b
    NeI32,
    /// Less than: a < b
    LtI32,
    /// Greater than: a > b
    GtI32,
    /// Less or equal: a <= b
    LeI32,
    /// Greater or equal: a >= b
    GeI32,

    // ============ Logical ============
    /// Eager boolean and (short-circuiting is compiled via jumps)
    And,
    /// Eager boolean or
    Or,
    /// Boolean not
    Not,

    // ============ Control ============
    /// Unconditional jump to an absolute instruction index: JMP <target>
    Jmp,
    /// Pop a bool, jump if true: JMP_IF <target>
    JmpIf,
    /// Pop a bool, jump if false: JMP_IF_NOT <target>
    JmpIfNot,
    /// Call a function by table index: CALL <index>
    Call,
    /// Return without a value
    Ret,
    /// Pop the return value and return it to the caller
    RetVal,

    // ============ References ============
    /// Pop a value, push a reference to a fresh slot holding it
    Borrow,
    /// Runtime twin of BORROW; the distinction is a type-checker artifact
    BorrowMut,
    /// Pop a reference, push the pointee
    Deref,
    /// Runtime twin of DEREF
    DerefMut,
}

impl OpCode {
    /// Whether the instruction carries an operand.
    pub fn has_operand(self) -> bool {
        matches!(
            self,
            OpCode::PushI32
                | OpCode::PushBool
                | OpCode::PushStr
                | OpCode::Load
                | OpCode::Store
                | OpCode::LoadRef
                | OpCode::Jmp
                | OpCode::JmpIf
                | OpCode::JmpIfNot
                | OpCode::Call
        )
    }

    /// Convert from u8 to OpCode.
    pub fn from_u8(byte: u8) -> Option<OpCode> {
        if byte <= OpCode::DerefMut as u8 {
            Some(unsafe { std::mem::transmute::<u8, OpCode>(byte) })
        } else {
            None
        }
    }

    /// Canonical mnemonic, as shown by the disassembler.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::PushI32 => "PUSH_I32",
            OpCode::PushBool => "PUSH_BOOL",
            OpCode::PushStr => "PUSH_STR",
            OpCode::Pop => "POP",
            OpCode::Dup => "DUP",
            OpCode::Swap => "SWAP",
            OpCode::Load => "LOAD",
            OpCode::Store => "STORE",
            OpCode::LoadRef => "LOAD_REF",
            OpCode::StoreRef => "STORE_REF",
            OpCode::AddI32 => "ADD_I32",
            OpCode::SubI32 => "SUB_I32",
            OpCode::MulI32 => "MUL_I32",
            OpCode::DivI32 => "DIV_I32",
            OpCode::NegI32 => "NEG_I32",
            OpCode::EqI32 => "EQ_I32",
            OpCode::NeI32 => "NE_I32",
            OpCode::LtI32 => "LT_I32",
            OpCode::GtI32 => "GT_I32",
            OpCode::LeI32 => "LE_I32",
            OpCode::GeI32 => "GE_I32",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::Not => "NOT",
            OpCode::Jmp => "JMP",
            OpCode::JmpIf => "JMP_IF",
            OpCode::JmpIfNot => "JMP_IF_NOT",
            OpCode::Call => "CALL",
            OpCode::Ret => "RET",
            OpCode::RetVal => "RET_VAL",
            OpCode::Borrow => "BORROW",
            OpCode::BorrowMut => "BORROW_MUT",
            OpCode::Deref => "DEREF",
            OpCode::DerefMut => "DEREF_MUT",
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op as u8
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A single bytecode instruction.
///
/// Jump operands are absolute instruction indices; `CALL` operands index the
/// function table; `PUSH_STR` operands index the constant pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub operand: usize,
}

impl Instruction {
    /// Create an instruction with no operand.
    pub fn new(opcode: OpCode) -> Self {
        Self { opcode, operand: 0 }
    }

    /// Create an instruction with an operand.
    pub fn with_operand(opcode: OpCode, operand: usize) -> Self {
        Self { opcode, operand }
    }

    /// Serialize a stream of instructions: one opcode byte each, followed by
    /// the operand as a little-endian platform word where the opcode takes
    /// one. This encoding is a debugging aid, not a stable format.
    pub fn encode(instructions: &[Instruction]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(instructions.len());
        for instr in instructions {
            buf.push(instr.opcode as u8);
            if instr.opcode.has_operand() {
                buf.extend_from_slice(&instr.operand.to_le_bytes());
            }
        }
        buf
    }

    /// Decode a stream produced by [`Instruction::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Vec<Instruction>, LoadError> {
        let mut instructions = Vec::new();
        let mut offset = 0;

        while offset < bytes.len() {
            let byte = bytes[offset];
            offset += 1;

            let opcode = OpCode::from_u8(byte).ok_or(LoadError::UnknownOpcode(byte))?;
            let operand = if opcode.has_operand() {
                let end = offset + std::mem::size_of::<usize>();
                let word = bytes
                    .get(offset..end)
                    .and_then(|s| s.try_into().ok())
                    .ok_or(LoadError::Truncated)?;
                offset = end;
                usize::from_le_bytes(word)
            } else {
                0
            };

            instructions.push(Instruction { opcode, operand });
        }

        Ok(instructions)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.opcode.has_operand() {
            write!(f, "{} {}", self.opcode, self.operand)
        } else {
            write!(f, "{}", self.opcode)
        }
    }
}
