//! Error types and diagnostics for the Jack compiler.

use crate::token::Span;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort compilation of a single unit.
#[derive(Debug, Error)]
pub enum CompileError {
    /// No token pattern matches at the current position.
    #[error("Lexical error at {span}: {message}")]
    Lexical { span: Span, message: String },

    /// The current token does not fit the grammar at this point.
    #[error("Syntax error at {span}: expected {expected}, got {found}")]
    Syntax {
        span: Span,
        expected: String,
        found: String,
    },

    /// Name declared twice in the same scope.
    #[error("Duplicate definition of '{name}' at {span}")]
    DuplicateSymbol { name: String, span: Span },

    /// Variable used but never declared.
    #[error("Undefined variable '{name}' at {span}")]
    UndefinedSymbol { name: String, span: Span },

    /// Internal invariant violated.
    #[error("Precondition failed: {message}")]
    Precondition { message: String },

    /// The VM writer was asked to emit an illegal operand.
    #[error("Invalid VM operand: {message}")]
    InvalidOperand { message: String },

    /// The underlying reader failed while fetching a source line.
    #[error("Read error at line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    /// File I/O error.
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    pub fn lexical(span: Span, message: impl Into<String>) -> Self {
        Self::Lexical {
            span,
            message: message.into(),
        }
    }

    pub fn syntax(span: Span, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::Syntax {
            span,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn duplicate_symbol(name: impl Into<String>, span: Span) -> Self {
        Self::DuplicateSymbol {
            name: name.into(),
            span,
        }
    }

    pub fn undefined_symbol(name: impl Into<String>, span: Span) -> Self {
        Self::UndefinedSymbol {
            name: name.into(),
            span,
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    pub fn invalid_operand(message: impl Into<String>) -> Self {
        Self::InvalidOperand {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Get the source location of this error, if any.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Lexical { span, .. }
            | CompileError::Syntax { span, .. }
            | CompileError::DuplicateSymbol { span, .. }
            | CompileError::UndefinedSymbol { span, .. } => Some(*span),
            CompileError::Read { line, .. } => Some(Span::new(*line, 1)),
            CompileError::Precondition { .. }
            | CompileError::InvalidOperand { .. }
            | CompileError::Io { .. } => None,
        }
    }
}

/// Diagnostic formatter that points at the offending source line.
pub struct Diagnostic<'a> {
    error: &'a CompileError,
    source: Option<&'a str>,
    filename: Option<&'a str>,
}

impl<'a> Diagnostic<'a> {
    pub fn new(error: &'a CompileError) -> Self {
        Self {
            error,
            source: None,
            filename: None,
        }
    }

    pub fn with_source(mut self, source: &'a str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_filename(mut self, filename: &'a str) -> Self {
        self.filename = Some(filename);
        self
    }
}

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filename = self.filename.unwrap_or("<input>");
        writeln!(f, "error: {}", self.error)?;

        let Some(span) = self.error.span() else {
            return Ok(());
        };
        writeln!(f, "  --> {}:{}:{}", filename, span.line, span.column)?;

        if let Some(source) = self.source
            && let Some(line) = span.line.checked_sub(1).and_then(|n| source.lines().nth(n))
        {
            writeln!(f, "   |")?;
            writeln!(f, "{:3} | {}", span.line, line)?;
            writeln!(
                f,
                "   | {:>width$}^",
                "",
                width = span.column.saturating_sub(1)
            )?;
        }

        Ok(())
    }
}
