//! Two-level symbol table for the Jack compiler.
//!
//! The symbol table maintains two scopes:
//! - **Class scope**: `static` and `field` variables, persists across subroutines
//! - **Subroutine scope**: `argument` and `local` variables, reset per subroutine
//!
//! Lookup is subroutine-first, allowing local variables to shadow class-level ones.

use crate::error::CompileError;
use crate::token::Span;
use crate::vm_writer::Segment;
use std::collections::HashMap;
use std::fmt;

/// Declared type of a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Char,
    Boolean,
    ClassName(String),
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
            Type::Char => f.write_str("char"),
            Type::Boolean => f.write_str("boolean"),
            Type::ClassName(name) => f.write_str(name),
        }
    }
}

/// The kind of symbol, determining its VM segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Class-level static variable → `static` segment
    Static,
    /// Class-level field variable → `this` segment
    Field,
    /// Subroutine argument → `argument` segment
    Argument,
    /// Subroutine local variable → `local` segment
    Local,
}

impl SymbolKind {
    #[inline]
    pub fn segment(self) -> Segment {
        match self {
            SymbolKind::Static => Segment::Static,
            SymbolKind::Field => Segment::This,
            SymbolKind::Argument => Segment::Argument,
            SymbolKind::Local => Segment::Local,
        }
    }

    #[inline]
    pub fn is_class_level(self) -> bool {
        matches!(self, SymbolKind::Static | SymbolKind::Field)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Static => "static",
            SymbolKind::Field => "field",
            SymbolKind::Argument => "argument",
            SymbolKind::Local => "local",
        }
    }
}

/// A symbol entry in the symbol table.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub symbol_type: Type,
    pub kind: SymbolKind,
    /// Position within its kind, starting at 0.
    pub index: u16,
}

impl Symbol {
    #[inline]
    pub fn segment(&self) -> Segment {
        self.kind.segment()
    }
}

/// Two-level symbol table for one compiled class.
#[derive(Debug, Default)]
pub struct SymbolTable {
    class_scope: HashMap<String, Symbol>,
    subroutine_scope: HashMap<String, Symbol>,
    static_count: u16,
    field_count: u16,
    argument_count: u16,
    local_count: u16,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start compiling a new subroutine.
    ///
    /// Clears subroutine-level symbols and resets argument/local counters.
    /// Class-level symbols remain accessible.
    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
        self.argument_count = 0;
        self.local_count = 0;
    }

    /// Define a new symbol in the scope its kind belongs to.
    ///
    /// Returns the assigned index, or an error if the name already exists
    /// in that scope or the kind has run out of indices.
    pub fn define(
        &mut self,
        name: &str,
        symbol_type: Type,
        kind: SymbolKind,
        span: Span,
    ) -> Result<u16, CompileError> {
        let scope = if kind.is_class_level() {
            &mut self.class_scope
        } else {
            &mut self.subroutine_scope
        };

        if scope.contains_key(name) {
            return Err(CompileError::duplicate_symbol(name, span));
        }

        let counter = match kind {
            SymbolKind::Static => &mut self.static_count,
            SymbolKind::Field => &mut self.field_count,
            SymbolKind::Argument => &mut self.argument_count,
            SymbolKind::Local => &mut self.local_count,
        };
        let index = *counter;
        *counter = index.checked_add(1).ok_or_else(|| {
            CompileError::invalid_operand(format!(
                "too many {} variables at {} (limit {})",
                kind.as_str(),
                span,
                u16::MAX
            ))
        })?;

        scope.insert(
            name.to_string(),
            Symbol {
                name: name.to_string(),
                symbol_type,
                kind,
                index,
            },
        );

        Ok(index)
    }

    /// Look up a symbol by name, subroutine scope first.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }

    /// Storage kind of `name`; `None` when it is not declared.
    pub fn kind_of(&self, name: &str) -> Option<SymbolKind> {
        self.lookup(name).map(|s| s.kind)
    }

    pub fn type_of(&self, name: &str) -> Option<&Type> {
        self.lookup(name).map(|s| &s.symbol_type)
    }

    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.lookup(name).map(|s| s.index)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Number of symbols of a given kind defined so far.
    pub fn var_count(&self, kind: SymbolKind) -> u16 {
        match kind {
            SymbolKind::Static => self.static_count,
            SymbolKind::Field => self.field_count,
            SymbolKind::Argument => self.argument_count,
            SymbolKind::Local => self.local_count,
        }
    }
}
