//! Expression checking.

use crate::ast::{Expr, ExprKind, UnaryOp};
use crate::error::TypeError;
use crate::span::Span;
use crate::types::type_repr::Type;

use super::{TypeChecker, TypeResult};

impl TypeChecker {
    pub(crate) fn check_expr(&mut self, expr: &Expr) -> TypeResult<Type> {
        match &expr.kind {
            ExprKind::IntLiteral(_) => Ok(Type::I32),
            ExprKind::BoolLiteral(_) => Ok(Type::Bool),
            ExprKind::StringLiteral(_) => Ok(Type::Str),

            ExprKind::Variable(name) => self.check_variable(name, expr.span),

            ExprKind::Unary { operator, operand } => {
                let ty = self.check_expr(operand)?;
                let expected = match operator {
                    UnaryOp::Negate => Type::I32,
                    UnaryOp::Not => Type::Bool,
                };
                if !ty.is_assignable_to(&expected) {
                    return Err(TypeError::mismatch(
                        expected.to_string(),
                        ty.to_string(),
                        operand.span,
                    ));
                }
                Ok(expected)
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            } => {
                let left_ty = self.check_expr(left)?;
                let right_ty = self.check_expr(right)?;
                if !left_ty.is_assignable_to(&Type::I32) {
                    return Err(TypeError::mismatch("i32", left_ty.to_string(), left.span));
                }
                if !right_ty.is_assignable_to(&Type::I32) {
                    return Err(TypeError::mismatch("i32", right_ty.to_string(), right.span));
                }
                Ok(if operator.is_comparison() {
                    Type::Bool
                } else {
                    Type::I32
                })
            }

            ExprKind::LogicalAnd { left, right } | ExprKind::LogicalOr { left, right } => {
                for operand in [left, right] {
                    let ty = self.check_expr(operand)?;
                    if !ty.is_assignable_to(&Type::Bool) {
                        return Err(TypeError::mismatch(
                            "bool",
                            ty.to_string(),
                            operand.span,
                        ));
                    }
                }
                Ok(Type::Bool)
            }

            ExprKind::Borrow {
                is_mut,
                expr: inner,
            } => self.check_borrow(*is_mut, inner, expr.span),

            ExprKind::Deref(inner) => {
                let ty = self.check_expr(inner)?;
                match ty {
                    Type::Ref(pointee) | Type::MutRef(pointee) => Ok(*pointee),
                    Type::Unknown => Ok(Type::Unknown),
                    other => Err(TypeError::NotAReference(other.to_string(), expr.span)),
                }
            }

            ExprKind::Grouping(inner) => self.check_expr(inner),

            ExprKind::Call { callee, arguments } => {
                let ExprKind::Variable(name) = &callee.kind else {
                    return Err(TypeError::NotCallable(callee.span));
                };
                let sig = self
                    .env
                    .get_function(name)
                    .cloned()
                    .ok_or_else(|| TypeError::UndefinedFunction(name.clone(), callee.span))?;

                if arguments.len() != sig.params.len() {
                    return Err(TypeError::WrongArity {
                        expected: sig.params.len(),
                        got: arguments.len(),
                        span: expr.span,
                    });
                }
                for (arg, param) in arguments.iter().zip(&sig.params) {
                    let arg_ty = self.check_expr(arg)?;
                    if !arg_ty.is_assignable_to(param) {
                        return Err(TypeError::mismatch(
                            param.to_string(),
                            arg_ty.to_string(),
                            arg.span,
                        ));
                    }
                }
                Ok(sig.return_type)
            }

            ExprKind::Assign { target, value } => self.check_assignment(target, value),
        }
    }

    fn check_variable(&mut self, name: &str, span: Span) -> TypeResult<Type> {
        let info = self
            .env
            .get(name)
            .ok_or_else(|| TypeError::UndefinedVariable(name.to_string(), span))?;
        if info.borrow.is_some() && !info.borrow_valid {
            return Err(TypeError::InvalidatedBorrow(name.to_string(), span));
        }
        Ok(info.ty.clone())
    }

    fn check_borrow(&mut self, is_mut: bool, inner: &Expr, span: Span) -> TypeResult<Type> {
        let mut target = inner;
        while let ExprKind::Grouping(grouped) = &target.kind {
            target = grouped.as_ref();
        }

        let pointee = if let ExprKind::Variable(name) = &target.kind {
            let info = self
                .env
                .get(name)
                .ok_or_else(|| TypeError::UndefinedVariable(name.clone(), target.span))?;
            if info.borrow.is_some() && !info.borrow_valid {
                return Err(TypeError::InvalidatedBorrow(name.clone(), target.span));
            }
            if is_mut && !info.is_mut {
                return Err(TypeError::MutBorrowOfImmutable(name.clone(), span));
            }
            let ty = info.ty.clone();
            // A unique borrow excludes every other borrow of the same
            // storage; a shared borrow excludes only unique ones.
            self.env.invalidate_borrows_of(name, !is_mut);
            ty
        } else {
            self.check_expr(inner)?
        };

        Ok(if is_mut {
            Type::MutRef(Box::new(pointee))
        } else {
            Type::Ref(Box::new(pointee))
        })
    }

    fn check_assignment(&mut self, target: &Expr, value: &Expr) -> TypeResult<Type> {
        let value_ty = self.check_expr(value)?;

        match &target.kind {
            ExprKind::Variable(name) => {
                let info = self
                    .env
                    .get(name)
                    .ok_or_else(|| TypeError::UndefinedVariable(name.clone(), target.span))?;
                if !info.is_mut {
                    return Err(TypeError::AssignToImmutable(name.clone(), target.span));
                }
                let var_ty = info.ty.clone();
                if !value_ty.is_assignable_to(&var_ty) {
                    return Err(TypeError::mismatch(
                        var_ty.to_string(),
                        value_ty.to_string(),
                        value.span,
                    ));
                }
                self.env.invalidate_borrows_of(name, false);
                Ok(var_ty)
            }

            ExprKind::Deref(inner) => {
                let ref_ty = self.check_expr(inner)?;
                match ref_ty {
                    Type::MutRef(pointee) => {
                        if !value_ty.is_assignable_to(&pointee) {
                            return Err(TypeError::mismatch(
                                pointee.to_string(),
                                value_ty.to_string(),
                                value.span,
                            ));
                        }
                        Ok(*pointee)
                    }
                    Type::Ref(_) => Err(TypeError::general(
                        "cannot assign through a shared reference",
                        target.span,
                    )),
                    Type::Unknown => Ok(Type::Unknown),
                    other => Err(TypeError::NotAReference(other.to_string(), inner.span)),
                }
            }

            _ => Err(TypeError::InvalidAssignmentTarget(target.span)),
        }
    }
}
