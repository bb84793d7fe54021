//! Statement parsing: let, if, while, return, blocks.

use crate::ast::{Stmt, StmtKind};
use crate::error::ParserError;

use super::core::{ParseResult, Parser};

impl Parser {
    pub(crate) fn statement(&mut self) -> ParseResult<Stmt> {
        self.skip_whitespace();

        if self.peek_keyword("let") {
            self.let_statement()
        } else if self.peek_keyword("if") {
            self.if_statement()
        } else if self.peek_keyword("while") {
            self.while_statement()
        } else if self.peek_keyword("return") {
            self.return_statement()
        } else if self.peek() == Some('{') {
            self.block_statement()
        } else {
            self.expression_statement()
        }
    }

    fn let_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.here();
        self.match_keyword("let");
        self.skip_whitespace();

        let is_mut = self.match_keyword("mut");
        self.skip_whitespace();

        let name = self.consume_identifier()?;
        self.skip_whitespace();

        self.expect_str(":")?;
        let ty = self.parse_type()?;
        self.skip_whitespace();

        self.expect_str("=")?;
        let initializer = self.expression()?;
        self.skip_whitespace();
        self.expect_str(";")?;

        Ok(Stmt::new(
            StmtKind::Let {
                is_mut,
                name,
                ty,
                initializer,
            },
            self.span_from(start),
        ))
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.here();
        self.match_keyword("if");

        // Parentheses around the condition are ordinary grouping.
        let condition = self.expression()?;
        let then_branch = Box::new(self.block_statement()?);

        self.skip_whitespace();
        let else_branch = if self.match_keyword("else") {
            self.skip_whitespace();
            if self.peek_keyword("if") {
                Some(Box::new(self.if_statement()?))
            } else {
                Some(Box::new(self.block_statement()?))
            }
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            self.span_from(start),
        ))
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.here();
        self.match_keyword("while");

        let condition = self.expression()?;
        let body = Box::new(self.block_statement()?);

        Ok(Stmt::new(
            StmtKind::While { condition, body },
            self.span_from(start),
        ))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.here();
        self.match_keyword("return");
        self.skip_whitespace();

        let value = if self.peek() == Some(';') {
            None
        } else {
            Some(self.expression()?)
        };
        self.skip_whitespace();
        self.expect_str(";")?;

        Ok(Stmt::new(StmtKind::Return(value), self.span_from(start)))
    }

    fn block_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.here();
        let statements = self.block()?;
        Ok(Stmt::new(StmtKind::Block(statements), self.span_from(start)))
    }

    /// Parse a braced statement list with per-statement error recovery.
    pub(crate) fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.skip_whitespace();
        self.expect_str("{")?;

        let mut statements = Vec::new();
        loop {
            self.skip_whitespace();
            if self.at_end() {
                return Err(ParserError::UnexpectedEof(self.span_here()));
            }
            if self.peek() == Some('}') {
                break;
            }

            let before = self.here();
            match self.statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                    if self.here().pos == before.pos {
                        self.advance();
                    }
                }
            }
        }

        self.expect_str("}")?;
        Ok(statements)
    }

    /// Parse an expression statement. A block-final expression without a
    /// trailing `;` is a tail expression and desugars to `return`.
    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.here();
        let expr = self.expression()?;
        self.skip_whitespace();

        if self.matches(";") {
            return Ok(Stmt::new(StmtKind::Expression(expr), self.span_from(start)));
        }
        if self.peek() == Some('}') {
            return Ok(Stmt::new(
                StmtKind::Return(Some(expr)),
                self.span_from(start),
            ));
        }

        Err(ParserError::unexpected_token(
            "';'",
            self.found_here(),
            self.span_here(),
        ))
    }
}
