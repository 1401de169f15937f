//! VM command emitter for the Jack compiler.
//!
//! Segments and arithmetic commands are closed enums, so only operands the
//! VM knows about can be requested. The writer still validates what the
//! types cannot express: `constant` is push-only, `pointer` has two cells
//! and `temp` has eight.

use crate::error::CompileError;
use std::fmt;

/// VM memory segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }

    /// Highest legal index for fixed-size segments.
    fn max_index(self) -> Option<u16> {
        match self {
            Segment::Pointer => Some(1),
            Segment::Temp => Some(7),
            _ => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arithmetic and logical VM commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Add => "add",
            Command::Sub => "sub",
            Command::Neg => "neg",
            Command::Eq => "eq",
            Command::Gt => "gt",
            Command::Lt => "lt",
            Command::And => "and",
            Command::Or => "or",
            Command::Not => "not",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write a u16 value to a string buffer without allocation.
#[inline]
fn write_u16(n: u16, buf: &mut String) {
    if n == 0 {
        buf.push('0');
        return;
    }
    let mut digits = [0u8; 5]; // Max 5 digits for u16 (65535)
    let mut i = 0;
    let mut num = n;
    while num > 0 {
        digits[i] = (num % 10) as u8;
        num /= 10;
        i += 1;
    }
    while i > 0 {
        i -= 1;
        buf.push((b'0' + digits[i]) as char);
    }
}

/// VM command writer that owns the unit's output buffer.
///
/// Every instruction becomes one line, appended in request order.
#[derive(Debug)]
pub struct VMWriter {
    output: String,
}

impl VMWriter {
    /// Default initial capacity (8KB).
    const DEFAULT_CAPACITY: usize = 8192;

    pub fn new() -> Self {
        Self {
            output: String::with_capacity(Self::DEFAULT_CAPACITY),
        }
    }

    fn check_index(segment: Segment, index: u16) -> Result<(), CompileError> {
        match segment.max_index() {
            Some(max) if index > max => Err(CompileError::invalid_operand(format!(
                "index {} out of range for segment {} (0-{})",
                index, segment, max
            ))),
            _ => Ok(()),
        }
    }

    fn write_memory(&mut self, op: &str, segment: Segment, index: u16) {
        self.output.push_str(op);
        self.output.push(' ');
        self.output.push_str(segment.as_str());
        self.output.push(' ');
        write_u16(index, &mut self.output);
        self.output.push('\n');
    }

    fn write_named(&mut self, op: &str, name: &str, count: Option<u16>) {
        self.output.push_str(op);
        self.output.push(' ');
        self.output.push_str(name);
        if let Some(count) = count {
            self.output.push(' ');
            write_u16(count, &mut self.output);
        }
        self.output.push('\n');
    }

    pub fn write_push(&mut self, segment: Segment, index: u16) -> Result<(), CompileError> {
        Self::check_index(segment, index)?;
        self.write_memory("push", segment, index);
        Ok(())
    }

    pub fn write_pop(&mut self, segment: Segment, index: u16) -> Result<(), CompileError> {
        if segment == Segment::Constant {
            return Err(CompileError::invalid_operand("cannot pop to constant segment"));
        }
        Self::check_index(segment, index)?;
        self.write_memory("pop", segment, index);
        Ok(())
    }

    #[inline]
    pub fn write_arithmetic(&mut self, cmd: Command) {
        self.output.push_str(cmd.as_str());
        self.output.push('\n');
    }

    #[inline]
    pub fn write_label(&mut self, label: &str) {
        self.write_named("label", label, None);
    }

    #[inline]
    pub fn write_goto(&mut self, label: &str) {
        self.write_named("goto", label, None);
    }

    #[inline]
    pub fn write_if_goto(&mut self, label: &str) {
        self.write_named("if-goto", label, None);
    }

    #[inline]
    pub fn write_call(&mut self, name: &str, num_args: u16) {
        self.write_named("call", name, Some(num_args));
    }

    #[inline]
    pub fn write_function(&mut self, name: &str, num_locals: u16) {
        self.write_named("function", name, Some(num_locals));
    }

    #[inline]
    pub fn write_return(&mut self) {
        self.output.push_str("return\n");
    }

    /// Consume the writer and return the generated VM code.
    pub fn into_output(self) -> String {
        self.output
    }
}

impl Default for VMWriter {
    fn default() -> Self {
        Self::new()
    }
}
