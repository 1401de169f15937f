//! Branch label generation.
//!
//! Labels are keyed by class, subroutine and construct kind, each key with
//! its own occurrence counter. The class and subroutine names are part of
//! the label text, so labels stay unique across the whole class.

use crate::error::CompileError;
use std::collections::HashMap;
use std::str::FromStr;

/// Control constructs that need a pair of branch labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlFlow {
    If,
    While,
}

impl ControlFlow {
    /// Base names of the (first, second) label of a pair.
    fn bases(self) -> (&'static str, &'static str) {
        match self {
            ControlFlow::If => ("IF_FALSE", "IF_END"),
            ControlFlow::While => ("WHILE_EXP", "WHILE_END"),
        }
    }
}

impl FromStr for ControlFlow {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "if" => Ok(ControlFlow::If),
            "while" => Ok(ControlFlow::While),
            other => Err(CompileError::precondition(format!(
                "unknown control construct '{}', expected 'if' or 'while'",
                other
            ))),
        }
    }
}

/// The two labels of one `if` or `while`.
///
/// For `if` these are the false-branch and end labels; for `while` the loop
/// start and loop end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPair {
    pub first: String,
    pub second: String,
}

#[derive(Debug, Default)]
pub struct LabelGenerator {
    counters: HashMap<(String, String, ControlFlow), u32>,
}

impl LabelGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next label pair for `kind` inside `class.subroutine`.
    pub fn next_pair(
        &mut self,
        class_name: &str,
        subroutine_name: &str,
        kind: ControlFlow,
    ) -> Result<LabelPair, CompileError> {
        if class_name.is_empty() || subroutine_name.is_empty() {
            return Err(CompileError::precondition(
                "label requested outside of a class subroutine",
            ));
        }

        let counter = self
            .counters
            .entry((class_name.to_string(), subroutine_name.to_string(), kind))
            .or_insert(0);
        let n = *counter;
        *counter += 1;

        let (first, second) = kind.bases();
        Ok(LabelPair {
            first: format!("{}.{}${}{}", class_name, subroutine_name, first, n),
            second: format!("{}.{}${}{}", class_name, subroutine_name, second, n),
        })
    }
}
