//! Stack-based virtual machine for executing Ferrite bytecode.
//!
//! # Frame layout
//!
//! The frame pointer `fp` indexes the current function's locals region in
//! the unified `memory` vector. The two prologue slots sit just below it:
//! `memory[fp - 2]` holds the saved return pc and `memory[fp - 1]` the saved
//! caller fp, both as `Int`. The entry frame starts at `fp == 0` with no
//! prologue, which is how returns recognize the entry function.

use crate::bytecode::function_table::FunctionTable;
use crate::bytecode::instruction::{Instruction, OpCode};
use crate::bytecode::module::BytecodeModule;
use crate::bytecode::value::Value;
use crate::error::{LoadError, RuntimeError};

/// Maximum operand stack depth.
const STACK_MAX: usize = 65536;

/// Result type for VM operations.
pub type VMResult<T> = Result<T, RuntimeError>;

/// The virtual machine.
///
/// `instructions`, `constants`, and `function_table` are immutable for the
/// VM's lifetime; all mutable state lives on the instance. Execution is
/// single-threaded and deterministic.
pub struct VM {
    instructions: Vec<Instruction>,
    constants: Vec<Value>,
    function_table: FunctionTable,

    /// Unified frame store: prologues, locals, and borrow cells.
    memory: Vec<Value>,
    /// Operand stack.
    stack: Vec<Value>,
    pc: usize,
    fp: usize,
    result: Option<Value>,
    running: bool,
    returned_from_entry: bool,

    steps: u64,
    step_limit: Option<u64>,
}

impl VM {
    /// Load a module and prepare to run `main`.
    ///
    /// Preflight validation rejects a module with no zero-parameter `main`,
    /// an entry pc outside the stream, or any jump, constant, or call
    /// operand out of range.
    pub fn new(module: BytecodeModule) -> Result<Self, LoadError> {
        let BytecodeModule {
            instructions,
            constants,
            function_table,
        } = module;

        let entry = function_table
            .get("main")
            .copied()
            .ok_or(LoadError::MissingEntry)?;
        if entry.num_params != 0 {
            return Err(LoadError::EntryArity(entry.num_params));
        }

        for (name, info) in function_table.iter() {
            if info.entry_pc >= instructions.len() {
                return Err(LoadError::BadEntryPc {
                    name: name.clone(),
                    entry_pc: info.entry_pc,
                });
            }
        }

        for (pc, instr) in instructions.iter().enumerate() {
            match instr.opcode {
                OpCode::Jmp | OpCode::JmpIf | OpCode::JmpIfNot => {
                    if instr.operand >= instructions.len() {
                        return Err(LoadError::JumpOutOfRange {
                            target: instr.operand,
                            pc,
                        });
                    }
                }
                OpCode::PushStr => {
                    if instr.operand >= constants.len() {
                        return Err(LoadError::ConstantOutOfRange {
                            index: instr.operand,
                            pc,
                        });
                    }
                }
                OpCode::Call => {
                    if instr.operand >= function_table.len() {
                        return Err(LoadError::FunctionOutOfRange {
                            index: instr.operand,
                            pc,
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            pc: entry.entry_pc,
            memory: vec![Value::Int(0); entry.num_locals],
            stack: Vec::new(),
            fp: 0,
            result: None,
            running: true,
            returned_from_entry: false,
            steps: 0,
            step_limit: None,
            instructions,
            constants,
            function_table,
        })
    }

    /// Cap the number of executed instructions, as a guard against runaway
    /// loops. Off by default.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// Execute to completion or fault.
    pub fn run(&mut self) -> VMResult<()> {
        while self.running && self.pc < self.instructions.len() {
            if let Some(limit) = self.step_limit {
                self.steps += 1;
                if self.steps > limit {
                    return Err(RuntimeError::StepLimitExceeded { limit, pc: self.pc });
                }
            }

            let instr = self.instructions[self.pc].clone();
            self.execute(&instr)?;

            // Jump handlers set pc to target - 1 (wrapping at zero); this
            // increment lands exactly on the target.
            self.pc = self.pc.wrapping_add(1);
        }

        // Entry returned without a value: the result is whatever the
        // operand stack has on top, if anything.
        if self.result.is_none() {
            self.result = self.stack.last().cloned();
        }
        Ok(())
    }

    /// The entry function's value, once `run` has finished.
    pub fn result(&self) -> Option<Value> {
        self.result.clone()
    }

    pub fn returned_from_entry(&self) -> bool {
        self.returned_from_entry
    }

    // ===== Dispatch =====

    fn execute(&mut self, instr: &Instruction) -> VMResult<()> {
        match instr.opcode {
            OpCode::PushI32 => self.push(Value::Int(instr.operand as u32 as i32))?,
            OpCode::PushBool => self.push(Value::Bool(instr.operand != 0))?,
            OpCode::PushStr => {
                // Validated during preflight.
                let value = self.constants[instr.operand].clone();
                self.push(value)?;
            }

            OpCode::Pop => {
                self.pop()?;
            }
            OpCode::Dup => {
                let value = self.peek()?.clone();
                self.push(value)?;
            }
            OpCode::Swap => {
                let len = self.stack.len();
                if len < 2 {
                    return Err(RuntimeError::StackUnderflow { pc: self.pc });
                }
                self.stack.swap(len - 1, len - 2);
            }

            OpCode::Load => {
                let value = self.read_memory(self.fp + instr.operand)?.clone();
                self.push(value)?;
            }
            OpCode::Store => {
                let value = self.pop()?;
                self.write_memory(self.fp + instr.operand, value)?;
            }
            OpCode::LoadRef => {
                let slot = self.fp + instr.operand;
                if slot >= self.memory.len() {
                    return Err(RuntimeError::MemoryOutOfBounds { slot, pc: self.pc });
                }
                self.push(Value::Ref(slot))?;
            }
            OpCode::StoreRef => {
                let slot = self.pop_ref()?;
                let value = self.pop()?;
                self.write_memory(slot, value)?;
            }

            OpCode::AddI32 => self.binary_i32(|a, b| Ok(a.wrapping_add(b)))?,
            OpCode::SubI32 => self.binary_i32(|a, b| Ok(a.wrapping_sub(b)))?,
            OpCode::MulI32 => self.binary_i32(|a, b| Ok(a.wrapping_mul(b)))?,
            OpCode::DivI32 => {
                let pc = self.pc;
                self.binary_i32(move |a, b| {
                    if b == 0 {
                        Err(RuntimeError::DivisionByZero { pc })
                    } else {
                        Ok(a.wrapping_div(b))
                    }
                })?;
            }
            OpCode::NegI32 => {
                let a = self.pop_int()?;
                self.push(Value::Int(a.wrapping_neg()))?;
            }

            OpCode::EqI32 => self.compare_i32(|a, b| a == b)?,
            OpCode::NeI32 => self.compare_i32(|a, b| a != b)?,
            OpCode::LtI32 => self.compare_i32(|a, b| a < b)?,
            OpCode::GtI32 => self.compare_i32(|a, b| a > b)?,
            OpCode::LeI32 => self.compare_i32(|a, b| a <= b)?,
            OpCode::GeI32 => self.compare_i32(|a, b| a >= b)?,

            OpCode::And => {
                let b = self.pop_bool()?;
                let a = self.pop_bool()?;
                self.push(Value::Bool(a && b))?;
            }
            OpCode::Or => {
                let b = self.pop_bool()?;
                let a = self.pop_bool()?;
                self.push(Value::Bool(a || b))?;
            }
            OpCode::Not => {
                let a = self.pop_bool()?;
                self.push(Value::Bool(!a))?;
            }

            OpCode::Jmp => self.jump(instr.operand),
            OpCode::JmpIf => {
                if self.pop_bool()? {
                    self.jump(instr.operand);
                }
            }
            OpCode::JmpIfNot => {
                if !self.pop_bool()? {
                    self.jump(instr.operand);
                }
            }

            OpCode::Call => self.call(instr.operand)?,
            OpCode::Ret => self.ret(None)?,
            OpCode::RetVal => {
                let value = self.pop()?;
                self.ret(Some(value))?;
            }

            OpCode::Borrow | OpCode::BorrowMut => {
                // Capture by value in a fresh slot; aliasing of locals goes
                // through LOAD_REF instead.
                let value = self.pop()?;
                self.memory.push(value);
                self.push(Value::Ref(self.memory.len() - 1))?;
            }
            OpCode::Deref | OpCode::DerefMut => {
                let slot = self.pop_ref()?;
                let value = self.read_memory(slot)?.clone();
                self.push(value)?;
            }
        }
        Ok(())
    }

    // ===== Control flow =====

    fn jump(&mut self, target: usize) {
        self.pc = target.wrapping_sub(1);
    }

    fn call(&mut self, index: usize) -> VMResult<()> {
        let info = match self.function_table.get_index(index) {
            Some((_, info)) => *info,
            None => {
                return Err(RuntimeError::BadFunctionIndex {
                    index,
                    pc: self.pc,
                })
            }
        };

        if self.stack.len() < info.num_params {
            return Err(RuntimeError::StackUnderflow { pc: self.pc });
        }

        // Prologue first, then the locals region.
        let base = self.memory.len();
        self.memory.push(Value::Int((self.pc + 1) as i32));
        self.memory.push(Value::Int(self.fp as i32));

        let new_fp = base + 2;
        self.memory.resize(new_fp + info.num_locals, Value::Int(0));

        // Arguments pop off last-first; the first declared parameter lands
        // at local offset 0.
        for offset in (0..info.num_params).rev() {
            let value = self.pop()?;
            self.memory[new_fp + offset] = value;
        }

        self.fp = new_fp;
        self.jump(info.entry_pc);
        Ok(())
    }

    fn ret(&mut self, value: Option<Value>) -> VMResult<()> {
        if self.fp == 0 {
            // Returning from the entry function halts the machine.
            if let Some(value) = value {
                self.result = Some(value);
            }
            self.running = false;
            self.returned_from_entry = true;
            return Ok(());
        }

        let saved_pc = self.frame_slot(self.fp - 2)?;
        let saved_fp = self.frame_slot(self.fp - 1)?;

        // Drop the frame, its prologue, and any borrow cells made after it.
        self.memory.truncate(self.fp - 2);
        self.fp = saved_fp;
        self.pc = saved_pc.wrapping_sub(1);

        if let Some(value) = value {
            self.push(value)?;
        }
        Ok(())
    }

    fn frame_slot(&self, slot: usize) -> VMResult<usize> {
        match self.memory.get(slot) {
            Some(Value::Int(n)) if *n >= 0 => Ok(*n as usize),
            _ => Err(RuntimeError::CorruptedFrame { pc: self.pc }),
        }
    }

    // ===== Stack and memory =====

    fn push(&mut self, value: Value) -> VMResult<()> {
        if self.stack.len() >= STACK_MAX {
            return Err(RuntimeError::StackOverflow { pc: self.pc });
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> VMResult<Value> {
        self.stack
            .pop()
            .ok_or(RuntimeError::StackUnderflow { pc: self.pc })
    }

    fn peek(&self) -> VMResult<&Value> {
        self.stack
            .last()
            .ok_or(RuntimeError::StackUnderflow { pc: self.pc })
    }

    fn pop_int(&mut self) -> VMResult<i32> {
        match self.pop()? {
            Value::Int(n) => Ok(n),
            other => Err(RuntimeError::TypeMismatch {
                expected: "i32",
                found: other.type_name(),
                pc: self.pc,
            }),
        }
    }

    fn pop_bool(&mut self) -> VMResult<bool> {
        match self.pop()? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::TypeMismatch {
                expected: "bool",
                found: other.type_name(),
                pc: self.pc,
            }),
        }
    }

    fn pop_ref(&mut self) -> VMResult<usize> {
        match self.pop()? {
            Value::Ref(slot) => Ok(slot),
            other => Err(RuntimeError::TypeMismatch {
                expected: "ref",
                found: other.type_name(),
                pc: self.pc,
            }),
        }
    }

    /// Pops the right-hand side first, then the left.
    fn binary_i32<F>(&mut self, op: F) -> VMResult<()>
    where
        F: FnOnce(i32, i32) -> VMResult<i32>,
    {
        let b = self.pop_int()?;
        let a = self.pop_int()?;
        let result = op(a, b)?;
        self.push(Value::Int(result))
    }

    fn compare_i32<F>(&mut self, op: F) -> VMResult<()>
    where
        F: FnOnce(i32, i32) -> bool,
    {
        let b = self.pop_int()?;
        let a = self.pop_int()?;
        self.push(Value::Bool(op(a, b)))
    }

    fn read_memory(&self, slot: usize) -> VMResult<&Value> {
        self.memory
            .get(slot)
            .ok_or(RuntimeError::MemoryOutOfBounds { slot, pc: self.pc })
    }

    fn write_memory(&mut self, slot: usize, value: Value) -> VMResult<()> {
        let pc = self.pc;
        match self.memory.get_mut(slot) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(RuntimeError::MemoryOutOfBounds { slot, pc }),
        }
    }
}
