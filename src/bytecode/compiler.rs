//! Bytecode compiler: transforms a type-checked AST into a module.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Expr, ExprKind, FunctionDecl, Program, Stmt, StmtKind, UnaryOp};
use crate::bytecode::function_table::{FunctionInfo, FunctionTable};
use crate::bytecode::instruction::{Instruction, OpCode};
use crate::bytecode::module::BytecodeModule;
use crate::bytecode::value::Value;
use crate::error::CompileError;

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// The bytecode compiler.
///
/// Emits one flat instruction stream for the whole program. Jump operands
/// are absolute instruction indices; every function's code ends in `RET` or
/// `RET_VAL`, with a bare `RET` appended as the fall-through return.
pub struct Compiler {
    instructions: Vec<Instruction>,
    constants: Vec<Value>,
    function_table: FunctionTable,
    /// Which functions produce a value, by declared return type.
    returns_value: HashMap<String, bool>,
    /// Locals of the function currently being compiled.
    locals: Vec<Local>,
    scope_depth: u32,
    /// Next frame slot; slots are never reused, so this ends up as the
    /// function's num_locals.
    next_slot: usize,
}

/// A local variable in a scope.
#[derive(Debug, Clone)]
struct Local {
    name: String,
    depth: u32,
    slot: usize,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
            constants: Vec::new(),
            function_table: FunctionTable::new(),
            returns_value: HashMap::new(),
            locals: Vec::new(),
            scope_depth: 0,
            next_slot: 0,
        }
    }

    /// Compile a program. The first declared parameter of each function
    /// occupies local slot 0, the rest follow in declaration order.
    pub fn compile(&mut self, program: &Program) -> CompileResult<BytecodeModule> {
        // First pass: table entries in declaration order, so calls can
        // reference functions declared later in the file.
        for func in &program.functions {
            let info = FunctionInfo {
                entry_pc: 0,
                num_params: func.params.len(),
                num_locals: 0,
            };
            if !self.function_table.insert(func.name.clone(), info) {
                return Err(CompileError::DuplicateFunction(func.name.clone(), func.span));
            }
            self.returns_value
                .insert(func.name.clone(), func.return_type.is_some());
        }

        for func in &program.functions {
            self.compile_function(func)?;
        }

        Ok(BytecodeModule {
            instructions: std::mem::take(&mut self.instructions),
            constants: std::mem::take(&mut self.constants),
            function_table: std::mem::take(&mut self.function_table),
        })
    }

    fn compile_function(&mut self, func: &FunctionDecl) -> CompileResult<()> {
        self.locals.clear();
        self.scope_depth = 0;
        self.next_slot = 0;

        let entry_pc = self.instructions.len();

        for param in &func.params {
            self.declare_local(param.name.clone());
        }

        for stmt in &func.body {
            self.compile_statement(stmt)?;
        }

        // Fall-through return; jumps past the last statement land here.
        self.emit(OpCode::Ret);

        if let Some(info) = self.function_table.get_mut(&func.name) {
            info.entry_pc = entry_pc;
            info.num_locals = self.next_slot;
        }
        Ok(())
    }

    // ===== Statements =====

    fn compile_statement(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.compile_expression(expr)?;
                if self.expression_leaves_value(expr) {
                    self.emit(OpCode::Pop);
                }
                Ok(())
            }

            StmtKind::Let {
                name, initializer, ..
            } => {
                self.compile_expression(initializer)?;
                let slot = self.declare_local(name.clone());
                self.emit_with(OpCode::Store, slot);
                Ok(())
            }

            StmtKind::Block(statements) => {
                self.begin_scope();
                for stmt in statements {
                    self.compile_statement(stmt)?;
                }
                self.end_scope();
                Ok(())
            }

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.compile_expression(condition)?;
                let else_jump = self.emit_jump(OpCode::JmpIfNot);

                self.compile_statement(then_branch)?;

                if let Some(else_branch) = else_branch {
                    let end_jump = self.emit_jump(OpCode::Jmp);
                    self.patch_jump(else_jump);
                    self.compile_statement(else_branch)?;
                    self.patch_jump(end_jump);
                } else {
                    self.patch_jump(else_jump);
                }
                Ok(())
            }

            StmtKind::While { condition, body } => {
                let loop_start = self.instructions.len();

                self.compile_expression(condition)?;
                let exit_jump = self.emit_jump(OpCode::JmpIfNot);

                self.compile_statement(body)?;
                self.emit_with(OpCode::Jmp, loop_start);

                self.patch_jump(exit_jump);
                Ok(())
            }

            StmtKind::Return(value) => {
                match value {
                    Some(expr) => {
                        self.compile_expression(expr)?;
                        if self.expression_leaves_value(expr) {
                            self.emit(OpCode::RetVal);
                        } else {
                            // A call to a value-less function in tail
                            // position leaves nothing to return.
                            self.emit(OpCode::Ret);
                        }
                    }
                    None => self.emit(OpCode::Ret),
                }
                Ok(())
            }
        }
    }

    // ===== Expressions =====

    fn compile_expression(&mut self, expr: &Expr) -> CompileResult<()> {
        match &expr.kind {
            ExprKind::IntLiteral(n) => {
                self.emit_with(OpCode::PushI32, *n as u32 as usize);
                Ok(())
            }

            ExprKind::BoolLiteral(b) => {
                self.emit_with(OpCode::PushBool, usize::from(*b));
                Ok(())
            }

            ExprKind::StringLiteral(s) => {
                let index = self.add_constant(Value::Str(Rc::new(s.clone())));
                self.emit_with(OpCode::PushStr, index);
                Ok(())
            }

            ExprKind::Variable(name) => {
                let slot = self
                    .resolve_local(name)
                    .ok_or_else(|| CompileError::UndefinedVariable(name.clone(), expr.span))?;
                self.emit_with(OpCode::Load, slot);
                Ok(())
            }

            ExprKind::Unary { operator, operand } => {
                self.compile_expression(operand)?;
                self.emit(match operator {
                    UnaryOp::Negate => OpCode::NegI32,
                    UnaryOp::Not => OpCode::Not,
                });
                Ok(())
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            } => {
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                self.emit(binary_opcode(*operator));
                Ok(())
            }

            ExprKind::LogicalAnd { left, right } => {
                // left false: skip right, produce false
                self.compile_expression(left)?;
                let false_jump = self.emit_jump(OpCode::JmpIfNot);
                self.compile_expression(right)?;
                let end_jump = self.emit_jump(OpCode::Jmp);
                self.patch_jump(false_jump);
                self.emit_with(OpCode::PushBool, 0);
                self.patch_jump(end_jump);
                Ok(())
            }

            ExprKind::LogicalOr { left, right } => {
                // left true: skip right, produce true
                self.compile_expression(left)?;
                let true_jump = self.emit_jump(OpCode::JmpIf);
                self.compile_expression(right)?;
                let end_jump = self.emit_jump(OpCode::Jmp);
                self.patch_jump(true_jump);
                self.emit_with(OpCode::PushBool, 1);
                self.patch_jump(end_jump);
                Ok(())
            }

            ExprKind::Borrow {
                is_mut,
                expr: inner,
            } => {
                let mut target = inner.as_ref();
                while let ExprKind::Grouping(grouped) = &target.kind {
                    target = grouped.as_ref();
                }

                if let ExprKind::Variable(name) = &target.kind {
                    // Borrowing a named local aliases its slot, so writes
                    // through the reference are visible in the local.
                    let slot = self
                        .resolve_local(name)
                        .ok_or_else(|| CompileError::UndefinedVariable(name.clone(), target.span))?;
                    self.emit_with(OpCode::LoadRef, slot);
                } else {
                    // Borrowing any other expression captures its value in a
                    // fresh slot.
                    self.compile_expression(inner)?;
                    self.emit(if *is_mut {
                        OpCode::BorrowMut
                    } else {
                        OpCode::Borrow
                    });
                }
                Ok(())
            }

            ExprKind::Deref(inner) => {
                self.compile_expression(inner)?;
                self.emit(OpCode::Deref);
                Ok(())
            }

            ExprKind::Grouping(inner) => self.compile_expression(inner),

            ExprKind::Call { callee, arguments } => {
                let ExprKind::Variable(name) = &callee.kind else {
                    return Err(CompileError::new(
                        "only named functions are callable",
                        callee.span,
                    ));
                };
                let index = self
                    .function_table
                    .index_of(name)
                    .ok_or_else(|| CompileError::UndefinedFunction(name.clone(), callee.span))?;

                // Arguments push left to right; the last one ends on top.
                for arg in arguments {
                    self.compile_expression(arg)?;
                }
                self.emit_with(OpCode::Call, index);
                Ok(())
            }

            ExprKind::Assign { target, value } => {
                match &target.kind {
                    ExprKind::Variable(name) => {
                        self.compile_expression(value)?;
                        // Keep a copy: assignment is an expression.
                        self.emit(OpCode::Dup);
                        let slot = self.resolve_local(name).ok_or_else(|| {
                            CompileError::UndefinedVariable(name.clone(), target.span)
                        })?;
                        self.emit_with(OpCode::Store, slot);
                    }
                    ExprKind::Deref(place) => {
                        self.compile_expression(value)?;
                        self.emit(OpCode::Dup);
                        self.compile_expression(place)?;
                        self.emit(OpCode::StoreRef);
                    }
                    _ => {
                        return Err(CompileError::new(
                            "invalid assignment target",
                            target.span,
                        ));
                    }
                }
                Ok(())
            }
        }
    }

    /// Whether evaluating `expr` leaves a value on the operand stack.
    /// Calls to functions without a return type leave nothing.
    fn expression_leaves_value(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Call { callee, .. } => match &callee.kind {
                ExprKind::Variable(name) => {
                    self.returns_value.get(name).copied().unwrap_or(true)
                }
                _ => true,
            },
            ExprKind::Grouping(inner) => self.expression_leaves_value(inner),
            _ => true,
        }
    }

    // ===== Scope management =====

    fn begin_scope(&mut self) {
        self.scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.scope_depth -= 1;
        // Bindings go out of scope; their slots stay retired.
        while let Some(local) = self.locals.last() {
            if local.depth <= self.scope_depth {
                break;
            }
            self.locals.pop();
        }
    }

    fn declare_local(&mut self, name: String) -> usize {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.locals.push(Local {
            name,
            depth: self.scope_depth,
            slot,
        });
        slot
    }

    fn resolve_local(&self, name: &str) -> Option<usize> {
        self.locals
            .iter()
            .rev()
            .find(|local| local.name == name)
            .map(|local| local.slot)
    }

    // ===== Bytecode emission =====

    fn emit(&mut self, opcode: OpCode) {
        self.instructions.push(Instruction::new(opcode));
    }

    fn emit_with(&mut self, opcode: OpCode, operand: usize) {
        self.instructions
            .push(Instruction::with_operand(opcode, operand));
    }

    /// Emit a jump with a placeholder target; patch it later.
    fn emit_jump(&mut self, opcode: OpCode) -> usize {
        self.emit_with(opcode, usize::MAX);
        self.instructions.len() - 1
    }

    /// Point the jump at `at` to the next instruction to be emitted.
    fn patch_jump(&mut self, at: usize) {
        let target = self.instructions.len();
        self.instructions[at].operand = target;
    }

    fn add_constant(&mut self, value: Value) -> usize {
        if let Some(index) = self.constants.iter().position(|c| c == &value) {
            return index;
        }
        self.constants.push(value);
        self.constants.len() - 1
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

fn binary_opcode(operator: crate::ast::BinaryOp) -> OpCode {
    use crate::ast::BinaryOp;
    match operator {
        BinaryOp::Add => OpCode::AddI32,
        BinaryOp::Subtract => OpCode::SubI32,
        BinaryOp::Multiply => OpCode::MulI32,
        BinaryOp::Divide => OpCode::DivI32,
        BinaryOp::Equal => OpCode::EqI32,
        BinaryOp::NotEqual => OpCode::NeI32,
        BinaryOp::Less => OpCode::LtI32,
        BinaryOp::LessEqual => OpCode::LeI32,
        BinaryOp::Greater => OpCode::GtI32,
        BinaryOp::GreaterEqual => OpCode::GeI32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn compile(source: &str) -> BytecodeModule {
        let program = Parser::new(source).parse().expect("parse error");
        Compiler::new().compile(&program).expect("compile error")
    }

    fn ops(module: &BytecodeModule) -> Vec<OpCode> {
        module.instructions.iter().map(|i| i.opcode).collect()
    }

    #[test]
    fn test_let_binding() {
        let module = compile("fn main() { let x: i32 = 42; }");
        assert_eq!(
            ops(&module),
            vec![OpCode::PushI32, OpCode::Store, OpCode::Ret]
        );
        assert_eq!(module.instructions[0].operand, 42);
        assert_eq!(module.instructions[1].operand, 0);

        let info = module.function_table.get("main").unwrap();
        assert_eq!(info.entry_pc, 0);
        assert_eq!(info.num_params, 0);
        assert_eq!(info.num_locals, 1);
    }

    #[test]
    fn test_locals_flattened_across_scopes() {
        let module = compile(
            r#"
            fn main() {
                let x: i32 = 1;
                {
                    let y: i32 = 2;
                    { let z: i32 = 3; }
                }
                let w: i32 = 4;
            }
            "#,
        );
        assert_eq!(module.function_table.get("main").unwrap().num_locals, 4);
        // w gets its own slot, after the retired y and z.
        let stores: Vec<usize> = module
            .instructions
            .iter()
            .filter(|i| i.opcode == OpCode::Store)
            .map(|i| i.operand)
            .collect();
        assert_eq!(stores, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_parameters_occupy_first_slots() {
        let module = compile(
            r#"
            fn add(x: i32, y: i32) -> i32 { return x + y; }
            fn main() { }
            "#,
        );
        let info = module.function_table.get("add").unwrap();
        assert_eq!(info.num_params, 2);
        assert_eq!(info.num_locals, 2);
        // x at slot 0, y at slot 1
        assert_eq!(module.instructions[0].opcode, OpCode::Load);
        assert_eq!(module.instructions[0].operand, 0);
        assert_eq!(module.instructions[1].operand, 1);
    }

    #[test]
    fn test_call_operand_is_table_index() {
        let module = compile(
            r#"
            fn main() { helper(); }
            fn helper() { }
            "#,
        );
        let call = module
            .instructions
            .iter()
            .find(|i| i.opcode == OpCode::Call)
            .unwrap();
        assert_eq!(call.operand, module.function_table.index_of("helper").unwrap());
    }

    #[test]
    fn test_call_without_value_is_not_popped() {
        let module = compile(
            r#"
            fn main() { helper(); answer(); }
            fn helper() { }
            fn answer() -> i32 { return 42; }
            "#,
        );
        // Only the value-producing call gets a POP.
        let pops = ops(&module).iter().filter(|op| **op == OpCode::Pop).count();
        assert_eq!(pops, 1);
    }

    #[test]
    fn test_if_else_jump_targets() {
        let module = compile(
            r#"
            fn main() -> i32 {
                if true { return 1; } else { return 2; }
            }
            "#,
        );
        let instructions = &module.instructions;
        let else_jump = &instructions[1];
        assert_eq!(else_jump.opcode, OpCode::JmpIfNot);
        // The else target is past the then-branch and its skip jump.
        assert_eq!(instructions[else_jump.operand - 1].opcode, OpCode::Jmp);
        assert!(else_jump.operand < instructions.len());
        // Every jump lands inside the stream.
        for instr in instructions {
            if matches!(instr.opcode, OpCode::Jmp | OpCode::JmpIf | OpCode::JmpIfNot) {
                assert!(instr.operand < instructions.len());
            }
        }
    }

    #[test]
    fn test_while_jumps_back_to_condition() {
        let module = compile(
            r#"
            fn main() {
                let mut x: i32 = 0;
                while x < 10 { x = x + 1; }
            }
            "#,
        );
        let back_jump = module
            .instructions
            .iter()
            .rfind(|i| i.opcode == OpCode::Jmp)
            .unwrap();
        // The loop re-enters at the condition's first instruction.
        assert_eq!(module.instructions[back_jump.operand].opcode, OpCode::Load);
    }

    #[test]
    fn test_string_constants_deduplicated() {
        let module = compile(
            r#"
            fn main() {
                let a: str = "hi";
                let b: str = "hi";
                let c: str = "other";
            }
            "#,
        );
        assert_eq!(module.constants.len(), 2);
    }

    #[test]
    fn test_borrow_of_local_aliases() {
        let module = compile(
            r#"
            fn main() {
                let mut x: i32 = 1;
                let r: &mut i32 = &mut x;
            }
            "#,
        );
        assert!(ops(&module).contains(&OpCode::LoadRef));
        assert!(!ops(&module).contains(&OpCode::BorrowMut));
    }

    #[test]
    fn test_borrow_of_expression_captures() {
        let module = compile(
            r#"
            fn main() {
                let x: i32 = 1;
                let r: &i32 = &(x + 1);
            }
            "#,
        );
        assert!(ops(&module).contains(&OpCode::Borrow));
    }

    #[test]
    fn test_assignment_leaves_value_then_statement_pops() {
        let module = compile(
            r#"
            fn main() {
                let mut x: i32 = 0;
                x = 5;
            }
            "#,
        );
        let sequence = ops(&module);
        // value, DUP, STORE, then the statement-level POP
        let dup_at = sequence.iter().position(|op| *op == OpCode::Dup).unwrap();
        assert_eq!(sequence[dup_at + 1], OpCode::Store);
        assert_eq!(sequence[dup_at + 2], OpCode::Pop);
    }

    #[test]
    fn test_deref_assignment_uses_store_ref() {
        let module = compile(
            r#"
            fn main() {
                let mut x: i32 = 1;
                let r: &mut i32 = &mut x;
                *r = 7;
            }
            "#,
        );
        assert!(ops(&module).contains(&OpCode::StoreRef));
    }

    #[test]
    fn test_logical_and_short_circuits() {
        let module = compile("fn main() { let b: bool = false && true; }");
        let sequence = ops(&module);
        assert!(sequence.contains(&OpCode::JmpIfNot));
        // The eager AND opcode is never emitted for source &&.
        assert!(!sequence.contains(&OpCode::And));
    }

    #[test]
    fn test_functions_end_with_return() {
        let module = compile(
            r#"
            fn first() { }
            fn second() -> i32 { return 1; }
            fn main() { }
            "#,
        );
        for (name, info) in module.function_table.iter() {
            let end = module
                .function_table
                .iter()
                .map(|(_, other)| other.entry_pc)
                .filter(|pc| *pc > info.entry_pc)
                .min()
                .unwrap_or(module.instructions.len());
            let last = &module.instructions[end - 1];
            assert!(
                matches!(last.opcode, OpCode::Ret | OpCode::RetVal),
                "function {} does not end in a return",
                name
            );
        }
    }

    #[test]
    fn test_duplicate_function_rejected() {
        let program = Parser::new("fn f() { } fn f() { }").parse().unwrap();
        let err = Compiler::new().compile(&program).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateFunction(name, _) if name == "f"));
    }

    #[test]
    fn test_negative_literal_via_negation() {
        let module = compile("fn main() -> i32 { return -5; }");
        let sequence = ops(&module);
        assert_eq!(sequence[0], OpCode::PushI32);
        assert_eq!(sequence[1], OpCode::NegI32);
    }
}
