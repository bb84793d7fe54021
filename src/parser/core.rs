//! Core parser struct and cursor helpers.

use crate::ast::Program;
use crate::error::ParserError;
use crate::span::Span;

pub type ParseResult<T> = Result<T, ParserError>;

/// Reserved words that can never be identifiers.
pub(crate) const KEYWORDS: &[&str] = &[
    "fn", "let", "mut", "if", "else", "while", "true", "false", "i32", "bool", "str", "return",
];

/// Keywords that may start a statement; used as synchronization points
/// during error recovery.
const SYNC_KEYWORDS: &[&str] = &["fn", "let", "if", "else", "while", "return"];

/// A saved cursor position, used to build spans.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor {
    pub pos: usize,
    pub line: usize,
    pub column: usize,
}

/// The parser for Ferrite source text.
pub struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    pub(crate) errors: Vec<ParserError>,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            errors: Vec::new(),
        }
    }

    /// Parse a complete program.
    ///
    /// On malformed input the parser records the error, synchronizes to the
    /// next `;` or statement keyword, and resumes, so several errors can be
    /// reported in one pass. Recovery always makes progress: parsing
    /// terminates on every input.
    pub fn parse(&mut self) -> Result<Program, Vec<ParserError>> {
        let mut functions = Vec::new();

        self.skip_whitespace();
        while !self.at_end() {
            let before = self.pos;
            match self.function() {
                Ok(func) => functions.push(func),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                    if self.pos == before {
                        self.advance();
                    }
                }
            }
            self.skip_whitespace();
        }

        if self.errors.is_empty() {
            Ok(Program::new(functions))
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    // ===== Cursor manipulation =====

    pub(crate) fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    pub(crate) fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// Check whether the source at the cursor starts with `s`, without
    /// consuming anything.
    pub(crate) fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    /// Consume `s` if the source starts with it.
    pub(crate) fn matches(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            for _ in s.chars() {
                self.advance();
            }
            true
        } else {
            false
        }
    }

    /// Check for keyword `kw` at the cursor: prefix match plus a
    /// word-boundary check on the following character.
    pub(crate) fn peek_keyword(&self, kw: &str) -> bool {
        self.starts_with(kw)
            && !matches!(self.peek_at(kw.chars().count()), Some(c) if c.is_alphanumeric() || c == '_')
    }

    /// Consume keyword `kw` if present at a word boundary.
    pub(crate) fn match_keyword(&mut self, kw: &str) -> bool {
        if self.peek_keyword(kw) {
            for _ in kw.chars() {
                self.advance();
            }
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_str(&mut self, s: &str) -> ParseResult<()> {
        if self.matches(s) {
            Ok(())
        } else {
            Err(ParserError::unexpected_token(
                format!("'{}'", s),
                self.found_here(),
                self.span_here(),
            ))
        }
    }

    /// Describe the character at the cursor for error messages.
    pub(crate) fn found_here(&self) -> String {
        match self.peek() {
            Some(c) => format!("'{}'", c),
            None => "end of input".to_string(),
        }
    }

    // ===== Whitespace and comments =====

    /// Skip spaces, tabs, newlines, and `//` line comments.
    pub(crate) fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r' | '\n') => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while self.peek().is_some() && self.peek() != Some('\n') {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    // ===== Token consumption =====

    pub(crate) fn consume_identifier(&mut self) -> ParseResult<String> {
        let start = self.here();
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            _ => {
                return Err(ParserError::unexpected_token(
                    "identifier",
                    self.found_here(),
                    self.span_here(),
                ));
            }
        }

        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }

        if KEYWORDS.contains(&name.as_str()) {
            return Err(ParserError::unexpected_token(
                "identifier",
                format!("keyword '{}'", name),
                self.span_from(start),
            ));
        }

        Ok(name)
    }

    pub(crate) fn consume_integer(&mut self) -> ParseResult<i32> {
        let start = self.here();
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }

        digits
            .parse::<i32>()
            .map_err(|_| ParserError::InvalidNumber(digits.clone(), self.span_from(start)))
    }

    /// Consume a double-quoted string literal. A backslash consumes the next
    /// character verbatim, so `\"` yields a quote without terminating.
    pub(crate) fn consume_string(&mut self) -> ParseResult<String> {
        let start = self.here();
        self.expect_str("\"")?;

        let mut value = String::new();
        loop {
            match self.advance() {
                None => return Err(ParserError::UnterminatedString(self.span_from(start))),
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some(c) => value.push(c),
                    None => return Err(ParserError::UnterminatedString(self.span_from(start))),
                },
                Some(c) => value.push(c),
            }
        }

        Ok(value)
    }

    // ===== Error recovery =====

    /// Skip forward until just past the next `;`, or until a statement
    /// keyword at a word boundary.
    pub(crate) fn synchronize(&mut self) {
        while !self.at_end() {
            if self.peek() == Some(';') {
                self.advance();
                return;
            }
            for kw in SYNC_KEYWORDS {
                if self.peek_keyword(kw) {
                    return;
                }
            }
            self.advance();
        }
    }

    // ===== Spans =====

    pub(crate) fn here(&self) -> Cursor {
        Cursor {
            pos: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    pub(crate) fn span_from(&self, start: Cursor) -> Span {
        Span::new(start.pos, self.pos, start.line, start.column)
    }

    pub(crate) fn span_here(&self) -> Span {
        Span::new(self.pos, self.pos, self.line, self.column)
    }
}
