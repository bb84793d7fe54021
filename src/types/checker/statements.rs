//! Statement checking.

use crate::ast::{Expr, ExprKind, Stmt, StmtKind};
use crate::error::TypeError;
use crate::types::environment::{BorrowRecord, VariableInfo};
use crate::types::type_repr::Type;

use super::{TypeChecker, TypeResult};

impl TypeChecker {
    pub(crate) fn check_stmt(&mut self, stmt: &Stmt) -> TypeResult<()> {
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.check_expr(expr)?;
                Ok(())
            }

            StmtKind::Let {
                is_mut,
                name,
                ty,
                initializer,
            } => {
                let declared = Type::from_annotation(ty);
                let init_ty = self.check_expr(initializer)?;
                if !init_ty.is_assignable_to(&declared) {
                    // Record the mismatch but still declare the binding so
                    // later statements do not cascade into undefined-variable
                    // errors.
                    self.errors.push(TypeError::mismatch(
                        declared.to_string(),
                        init_ty.to_string(),
                        initializer.span,
                    ));
                }

                let mut info = VariableInfo::new(declared, *is_mut);
                info.borrow = borrow_record(initializer);
                self.env.declare(name.clone(), info);
                Ok(())
            }

            StmtKind::Block(statements) => {
                self.env.push_scope();
                for stmt in statements {
                    self.check_stmt_collect(stmt);
                }
                self.env.pop_scope();
                Ok(())
            }

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_condition(condition);
                self.check_stmt_collect(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_stmt_collect(else_branch);
                }
                Ok(())
            }

            StmtKind::While { condition, body } => {
                self.check_condition(condition);
                self.check_stmt_collect(body);
                Ok(())
            }

            StmtKind::Return(value) => {
                let ty = match value {
                    Some(expr) => self.check_expr(expr)?,
                    None => Type::Unit,
                };
                if !ty.is_assignable_to(&self.current_return) {
                    let span = value.as_ref().map(|e| e.span).unwrap_or(stmt.span);
                    return Err(TypeError::mismatch(
                        self.current_return.to_string(),
                        ty.to_string(),
                        span,
                    ));
                }
                Ok(())
            }
        }
    }

    fn check_condition(&mut self, condition: &Expr) {
        match self.check_expr(condition) {
            Ok(ty) => {
                if !ty.is_assignable_to(&Type::Bool) {
                    self.errors.push(TypeError::mismatch(
                        "bool",
                        ty.to_string(),
                        condition.span,
                    ));
                }
            }
            Err(err) => self.errors.push(err),
        }
    }
}

/// The borrow a binding would hold if initialized from `expr`: a direct
/// `&x` / `&mut x` of a named local, looking through grouping.
fn borrow_record(expr: &Expr) -> Option<BorrowRecord> {
    if let ExprKind::Borrow {
        is_mut,
        expr: inner,
    } = &expr.kind
    {
        let mut target = inner.as_ref();
        while let ExprKind::Grouping(grouped) = &target.kind {
            target = grouped.as_ref();
        }
        if let ExprKind::Variable(name) = &target.kind {
            return Some(BorrowRecord {
                target: name.clone(),
                is_mut: *is_mut,
            });
        }
    }
    None
}
