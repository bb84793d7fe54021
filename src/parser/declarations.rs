//! Function declaration parsing.

use crate::ast::{FunctionDecl, Parameter};
use crate::error::ParserError;

use super::core::{ParseResult, Parser};

impl Parser {
    /// Parse one `fn` declaration.
    pub(crate) fn function(&mut self) -> ParseResult<FunctionDecl> {
        self.skip_whitespace();
        let start = self.here();

        if !self.match_keyword("fn") {
            return Err(ParserError::unexpected_token(
                "'fn'",
                self.found_here(),
                self.span_here(),
            ));
        }
        self.skip_whitespace();

        let name = self.consume_identifier()?;
        self.skip_whitespace();

        self.expect_str("(")?;
        let params = self.parameters()?;
        self.expect_str(")")?;
        self.skip_whitespace();

        let return_type = if self.matches("->") {
            Some(self.parse_type()?)
        } else {
            None
        };

        let body = self.block()?;

        Ok(FunctionDecl {
            name,
            params,
            return_type,
            body,
            span: self.span_from(start),
        })
    }

    fn parameters(&mut self) -> ParseResult<Vec<Parameter>> {
        let mut params = Vec::new();

        self.skip_whitespace();
        if self.peek() == Some(')') {
            return Ok(params);
        }

        loop {
            self.skip_whitespace();
            let start = self.here();

            let is_mut = self.match_keyword("mut");
            self.skip_whitespace();

            let name = self.consume_identifier()?;
            self.skip_whitespace();

            self.expect_str(":")?;
            let ty = self.parse_type()?;

            params.push(Parameter {
                is_mut,
                name,
                ty,
                span: self.span_from(start),
            });

            self.skip_whitespace();
            if !self.matches(",") {
                break;
            }
        }

        Ok(params)
    }
}
