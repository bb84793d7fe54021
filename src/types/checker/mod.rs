//! Type checker for Ferrite.
//!
//! A program only reaches the bytecode compiler when `check` succeeds.
//! Errors accumulate across statements so one pass reports everything.

mod expressions;
mod statements;

use crate::ast::{FunctionDecl, Program};
use crate::error::TypeError;
use crate::types::environment::{FunctionSig, TypeEnvironment, VariableInfo};
use crate::types::type_repr::Type;

pub(crate) type TypeResult<T> = Result<T, TypeError>;

/// The type checker verifies type correctness of Ferrite programs.
pub struct TypeChecker {
    pub(crate) env: TypeEnvironment,
    pub(crate) errors: Vec<TypeError>,
    /// Declared return type of the function currently being checked.
    pub(crate) current_return: Type,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self {
            env: TypeEnvironment::new(),
            errors: Vec::new(),
            current_return: Type::Unit,
        }
    }

    /// Type check a complete program.
    pub fn check(&mut self, program: &Program) -> Result<(), Vec<TypeError>> {
        // First pass: collect signatures so calls can reference functions
        // declared later in the file.
        for func in &program.functions {
            let sig = FunctionSig {
                params: func
                    .params
                    .iter()
                    .map(|p| Type::from_annotation(&p.ty))
                    .collect(),
                return_type: func
                    .return_type
                    .as_ref()
                    .map(Type::from_annotation)
                    .unwrap_or(Type::Unit),
                span: func.span,
            };
            if !self.env.define_function(func.name.clone(), sig) {
                self.errors
                    .push(TypeError::DuplicateFunction(func.name.clone(), func.span));
            }
        }

        // Second pass: check every body.
        for func in &program.functions {
            self.check_function(func);
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    fn check_function(&mut self, func: &FunctionDecl) {
        self.current_return = func
            .return_type
            .as_ref()
            .map(Type::from_annotation)
            .unwrap_or(Type::Unit);

        self.env.push_scope();
        for param in &func.params {
            self.env.declare(
                param.name.clone(),
                VariableInfo::new(Type::from_annotation(&param.ty), param.is_mut),
            );
        }

        for stmt in &func.body {
            self.check_stmt_collect(stmt);
        }
        self.env.pop_scope();
    }

    /// Check a statement, recording rather than propagating its error.
    pub(crate) fn check_stmt_collect(&mut self, stmt: &crate::ast::Stmt) {
        if let Err(err) = self.check_stmt(stmt) {
            self.errors.push(err);
        }
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}
