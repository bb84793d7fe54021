//! Expression parsing via precedence climbing.
//!
//! Lowest to highest: assignment, logical-or, logical-and, equality,
//! comparison, term, factor, unary, call, primary.

use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::error::ParserError;

use super::core::{ParseResult, Parser};

impl Parser {
    pub(crate) fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let start = self.here();
        let expr = self.logical_or()?;

        self.skip_whitespace();
        // A bare `=`; `==` belongs to the equality level below.
        if !self.starts_with("==") && self.matches("=") {
            let value = self.assignment()?;
            match expr.kind {
                ExprKind::Variable(_) | ExprKind::Deref(_) => {}
                _ => return Err(ParserError::InvalidAssignmentTarget(expr.span)),
            }
            return Ok(Expr::new(
                ExprKind::Assign {
                    target: Box::new(expr),
                    value: Box::new(value),
                },
                self.span_from(start),
            ));
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> ParseResult<Expr> {
        let start = self.here();
        let mut expr = self.logical_and()?;

        loop {
            self.skip_whitespace();
            if self.matches("||") {
                let right = self.logical_and()?;
                expr = Expr::new(
                    ExprKind::LogicalOr {
                        left: Box::new(expr),
                        right: Box::new(right),
                    },
                    self.span_from(start),
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> ParseResult<Expr> {
        let start = self.here();
        let mut expr = self.equality()?;

        loop {
            self.skip_whitespace();
            if self.matches("&&") {
                let right = self.equality()?;
                expr = Expr::new(
                    ExprKind::LogicalAnd {
                        left: Box::new(expr),
                        right: Box::new(right),
                    },
                    self.span_from(start),
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let start = self.here();
        let mut expr = self.comparison()?;

        loop {
            self.skip_whitespace();
            let operator = if self.matches("==") {
                BinaryOp::Equal
            } else if self.matches("!=") {
                BinaryOp::NotEqual
            } else {
                break;
            };

            let right = self.comparison()?;
            expr = self.binary(expr, operator, right, start);
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let start = self.here();
        let mut expr = self.term()?;

        loop {
            self.skip_whitespace();
            // Two-character operators before their one-character prefixes.
            let operator = if self.matches("<=") {
                BinaryOp::LessEqual
            } else if self.matches(">=") {
                BinaryOp::GreaterEqual
            } else if self.matches("<") {
                BinaryOp::Less
            } else if self.matches(">") {
                BinaryOp::Greater
            } else {
                break;
            };

            let right = self.term()?;
            expr = self.binary(expr, operator, right, start);
        }

        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let start = self.here();
        let mut expr = self.factor()?;

        loop {
            self.skip_whitespace();
            let operator = if self.matches("+") {
                BinaryOp::Add
            } else if !self.starts_with("->") && self.matches("-") {
                BinaryOp::Subtract
            } else {
                break;
            };

            let right = self.factor()?;
            expr = self.binary(expr, operator, right, start);
        }

        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let start = self.here();
        let mut expr = self.unary()?;

        loop {
            self.skip_whitespace();
            let operator = if self.matches("*") {
                BinaryOp::Multiply
            } else if self.matches("/") {
                BinaryOp::Divide
            } else {
                break;
            };

            let right = self.unary()?;
            expr = self.binary(expr, operator, right, start);
        }

        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        self.skip_whitespace();
        let start = self.here();

        if self.matches("-") {
            let operand = Box::new(self.unary()?);
            return Ok(Expr::new(
                ExprKind::Unary {
                    operator: UnaryOp::Negate,
                    operand,
                },
                self.span_from(start),
            ));
        }

        if !self.starts_with("!=") && self.matches("!") {
            let operand = Box::new(self.unary()?);
            return Ok(Expr::new(
                ExprKind::Unary {
                    operator: UnaryOp::Not,
                    operand,
                },
                self.span_from(start),
            ));
        }

        // A single `&`; in operand position `&&x` is a borrow of a borrow.
        if self.matches("&") {
            self.skip_whitespace();
            let is_mut = self.match_keyword("mut");
            let expr = Box::new(self.unary()?);
            return Ok(Expr::new(
                ExprKind::Borrow { is_mut, expr },
                self.span_from(start),
            ));
        }

        if self.matches("*") {
            let expr = Box::new(self.unary()?);
            return Ok(Expr::new(ExprKind::Deref(expr), self.span_from(start)));
        }

        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let start = self.here();
        let mut expr = self.primary()?;

        loop {
            self.skip_whitespace();
            if self.matches("(") {
                let mut arguments = Vec::new();
                self.skip_whitespace();
                if self.peek() != Some(')') {
                    loop {
                        arguments.push(self.expression()?);
                        self.skip_whitespace();
                        if !self.matches(",") {
                            break;
                        }
                    }
                }
                self.expect_str(")")?;

                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        arguments,
                    },
                    self.span_from(start),
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        self.skip_whitespace();
        let start = self.here();

        let Some(c) = self.peek() else {
            return Err(ParserError::UnexpectedEof(self.span_here()));
        };

        if c.is_ascii_digit() {
            let value = self.consume_integer()?;
            return Ok(Expr::new(ExprKind::IntLiteral(value), self.span_from(start)));
        }

        if self.match_keyword("true") {
            return Ok(Expr::new(
                ExprKind::BoolLiteral(true),
                self.span_from(start),
            ));
        }
        if self.match_keyword("false") {
            return Ok(Expr::new(
                ExprKind::BoolLiteral(false),
                self.span_from(start),
            ));
        }

        if c == '"' {
            let value = self.consume_string()?;
            return Ok(Expr::new(
                ExprKind::StringLiteral(value),
                self.span_from(start),
            ));
        }

        if c.is_alphabetic() || c == '_' {
            let name = self.consume_identifier()?;
            return Ok(Expr::new(ExprKind::Variable(name), self.span_from(start)));
        }

        if self.matches("(") {
            let expr = Box::new(self.expression()?);
            self.skip_whitespace();
            self.expect_str(")")?;
            return Ok(Expr::new(ExprKind::Grouping(expr), self.span_from(start)));
        }

        Err(ParserError::unexpected_token(
            "expression",
            self.found_here(),
            self.span_here(),
        ))
    }

    fn binary(
        &self,
        left: Expr,
        operator: BinaryOp,
        right: Expr,
        start: super::core::Cursor,
    ) -> Expr {
        Expr::new(
            ExprKind::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
            self.span_from(start),
        )
    }
}
