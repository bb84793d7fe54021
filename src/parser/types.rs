//! Type annotation parsing.

use crate::ast::{TypeAnnotation, TypeKind};
use crate::error::ParserError;

use super::core::{ParseResult, Parser};

impl Parser {
    /// Parse a type: `&` `mut`? type | `i32` | `bool` | `str`.
    pub(crate) fn parse_type(&mut self) -> ParseResult<TypeAnnotation> {
        self.skip_whitespace();
        let start = self.here();

        if self.matches("&") {
            self.skip_whitespace();
            let is_mut = self.match_keyword("mut");
            let inner = Box::new(self.parse_type()?);
            let kind = if is_mut {
                TypeKind::MutRef(inner)
            } else {
                TypeKind::Ref(inner)
            };
            return Ok(TypeAnnotation::new(kind, self.span_from(start)));
        }

        if self.match_keyword("i32") {
            return Ok(TypeAnnotation::new(TypeKind::I32, self.span_from(start)));
        }
        if self.match_keyword("bool") {
            return Ok(TypeAnnotation::new(TypeKind::Bool, self.span_from(start)));
        }
        if self.match_keyword("str") {
            return Ok(TypeAnnotation::new(TypeKind::Str, self.span_from(start)));
        }

        Err(ParserError::unexpected_token(
            "type",
            self.found_here(),
            self.span_here(),
        ))
    }
}
