//! Diagnostic parse-tree trace.
//!
//! A nested-tag document mirroring the productions the engine walks through,
//! with identifiers annotated by their role and symbol-table resolution.
//! The trace has no influence on the generated VM code.

use crate::symbol_table::SymbolKind;
use crate::token::{Token, xml_escape};

/// What an identifier names at the point it appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierRole {
    ClassName,
    SubroutineName,
    VarName,
}

impl IdentifierRole {
    fn as_str(self) -> &'static str {
        match self {
            IdentifierRole::ClassName => "className",
            IdentifierRole::SubroutineName => "subroutineName",
            IdentifierRole::VarName => "varName",
        }
    }
}

/// An identifier occurrence to be recorded in the trace.
#[derive(Debug, Clone, Copy)]
pub struct IdentifierUse<'a> {
    pub name: &'a str,
    pub role: IdentifierRole,
    /// Resolved storage kind and index, when the name is a variable.
    pub binding: Option<(SymbolKind, u16)>,
    /// `true` at the declaration, `false` at a use.
    pub defined: bool,
}

#[derive(Debug, Default)]
pub struct TraceWriter {
    output: String,
    indent: usize,
}

impl TraceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.output.push_str("  ");
        }
    }

    pub fn open_tag(&mut self, tag: &str) {
        self.write_indent();
        self.output.push('<');
        self.output.push_str(tag);
        self.output.push_str(">\n");
        self.indent += 1;
    }

    pub fn close_tag(&mut self, tag: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.write_indent();
        self.output.push_str("</");
        self.output.push_str(tag);
        self.output.push_str(">\n");
    }

    /// Write a keyword, symbol or constant as a terminal element.
    pub fn token(&mut self, token: &Token) {
        let tag = token.kind().as_str();
        self.write_indent();
        self.output.push('<');
        self.output.push_str(tag);
        self.output.push_str("> ");
        self.output.push_str(&token.xml_value());
        self.output.push_str(" </");
        self.output.push_str(tag);
        self.output.push_str(">\n");
    }

    pub fn identifier(&mut self, ident: IdentifierUse<'_>) {
        self.write_indent();
        self.output.push_str("<identifier category=\"");
        self.output.push_str(ident.role.as_str());
        self.output.push('"');
        if let Some((kind, index)) = ident.binding {
            self.output.push_str(" kind=\"");
            self.output.push_str(kind.as_str());
            self.output.push_str("\" index=\"");
            self.output.push_str(&index.to_string());
            self.output.push('"');
        }
        self.output
            .push_str(if ident.defined { " defined> " } else { " used> " });
        self.output.push_str(&xml_escape(ident.name));
        self.output.push_str(" </identifier>\n");
    }

    pub fn into_output(self) -> String {
        self.output
    }
}
