//! Line-oriented lexical analyzer for the Jack language.
//!
//! The lexer pulls one physical line at a time from a buffered reader and
//! hands out tokens lazily with a single token of lookahead: `has_next`
//! scans and holds the next token, `advance` commits it as the current one.
//! Block comments may span lines, so "inside a comment" is carried from one
//! line to the next.

use crate::error::CompileError;
use crate::token::{Keyword, Span, SpannedToken, Token, is_symbol};
use std::io::{BufRead, Lines};

/// Jack language lexer over a stream of source lines.
pub struct Lexer<R> {
    lines: Lines<R>,
    line: Vec<char>,
    line_no: usize,
    pos: usize,
    /// Where the currently open block comment started, if any.
    open_comment: Option<Span>,
    peeked: Option<SpannedToken>,
    current: Option<SpannedToken>,
}

impl<'a> Lexer<&'a [u8]> {
    /// Create a lexer over in-memory source text.
    pub fn from_source(source: &'a str) -> Self {
        Self::new(source.as_bytes())
    }
}

impl<R: BufRead> Lexer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: Vec::new(),
            line_no: 0,
            pos: 0,
            open_comment: None,
            peeked: None,
            current: None,
        }
    }

    /// Check whether another token follows, scanning it if necessary.
    ///
    /// Does not consume the token; repeated calls are idempotent.
    pub fn has_next(&mut self) -> Result<bool, CompileError> {
        if self.peeked.is_none() {
            self.peeked = self.scan()?;
        }
        Ok(self.peeked.is_some())
    }

    /// The token after the current one, without consuming it.
    pub fn peek(&mut self) -> Result<Option<&SpannedToken>, CompileError> {
        self.has_next()?;
        Ok(self.peeked.as_ref())
    }

    /// Commit the next token as the current one.
    ///
    /// At end of input the current token becomes `None`.
    pub fn advance(&mut self) -> Result<Option<&SpannedToken>, CompileError> {
        self.has_next()?;
        self.current = self.peeked.take();
        Ok(self.current.as_ref())
    }

    /// The most recently committed token.
    pub fn current(&self) -> Option<&SpannedToken> {
        self.current.as_ref()
    }

    /// Position just past the last character read, for end-of-input errors.
    pub fn position(&self) -> Span {
        Span::new(self.line_no.max(1), self.pos + 1)
    }

    /// Load the next physical line. Returns `false` at end of input.
    fn next_line(&mut self) -> Result<bool, CompileError> {
        match self.lines.next() {
            None => Ok(false),
            Some(Err(source)) => Err(CompileError::Read {
                line: self.line_no + 1,
                source,
            }),
            Some(Ok(text)) => {
                self.line_no += 1;
                self.line = text.chars().collect();
                self.pos = 0;
                Ok(true)
            }
        }
    }

    fn at(&self, offset: usize) -> Option<char> {
        self.line.get(self.pos + offset).copied()
    }

    fn span_here(&self) -> Span {
        Span::new(self.line_no, self.pos + 1)
    }

    /// Skip whitespace, comments and blank lines, then read one token.
    fn scan(&mut self) -> Result<Option<SpannedToken>, CompileError> {
        loop {
            if self.pos >= self.line.len() {
                if self.next_line()? {
                    continue;
                }
                if let Some(start) = self.open_comment {
                    return Err(CompileError::lexical(start, "unterminated block comment"));
                }
                return Ok(None);
            }

            if self.open_comment.is_some() {
                self.skip_block_comment();
                continue;
            }

            let c = self.line[self.pos];
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }

            if c == '/' {
                match self.at(1) {
                    Some('/') => {
                        self.pos = self.line.len();
                        continue;
                    }
                    Some('*') => {
                        self.open_comment = Some(self.span_here());
                        self.pos += 2;
                        continue;
                    }
                    _ => {}
                }
            }

            return self.read_token().map(Some);
        }
    }

    /// Advance to just past the closing `*/`, or to the end of the line.
    fn skip_block_comment(&mut self) {
        while self.pos < self.line.len() {
            if self.line[self.pos] == '*' && self.at(1) == Some('/') {
                self.pos += 2;
                self.open_comment = None;
                return;
            }
            self.pos += 1;
        }
    }

    fn read_token(&mut self) -> Result<SpannedToken, CompileError> {
        let span = self.span_here();
        let c = self.line[self.pos];

        if is_symbol(c) {
            self.pos += 1;
            return Ok(SpannedToken::new(Token::Symbol(c), span));
        }

        if c.is_ascii_digit() {
            return Ok(SpannedToken::new(self.read_integer(), span));
        }

        if c == '"' {
            return self.read_string(span);
        }

        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(SpannedToken::new(self.read_word(), span));
        }

        Err(CompileError::lexical(
            span,
            format!("unexpected character '{}'", c),
        ))
    }

    fn read_integer(&mut self) -> Token {
        let mut value: u32 = 0;
        while let Some(digit) = self.at(0).and_then(|c| c.to_digit(10)) {
            value = value.saturating_mul(10).saturating_add(digit);
            self.pos += 1;
        }
        Token::IntegerConstant(value)
    }

    /// String literals end at the next quote on the same line; no escapes.
    fn read_string(&mut self, span: Span) -> Result<SpannedToken, CompileError> {
        let start = self.pos + 1;
        let Some(len) = self.line[start..].iter().position(|&c| c == '"') else {
            self.pos = self.line.len();
            return Err(CompileError::lexical(span, "unterminated string constant"));
        };

        let value: String = self.line[start..start + len].iter().collect();
        self.pos = start + len + 1;
        Ok(SpannedToken::new(Token::StringConstant(value), span))
    }

    fn read_word(&mut self) -> Token {
        let start = self.pos;
        while self
            .at(0)
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }

        let word: String = self.line[start..self.pos].iter().collect();
        match Keyword::parse_keyword(&word) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Identifier(word),
        }
    }
}
