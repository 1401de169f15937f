//! Jack Compiler - single-pass Jack to VM code compiler.
//!
//! This crate compiles Jack source code to VM code for the nand2tetris
//! virtual machine. Parsing and code generation happen in one pass over a
//! lazily tokenised line stream; no syntax tree is built.
//!
//! - Fail-fast compilation per class, with source-located errors
//! - Optional parse-tree trace for diagnostics
//! - Parallel file processing
//!
//! # Usage
//!
//! ```no_run
//! use jack_compiler::{compile_file, compile_directory, compile_file_with_options, CompileOptions};
//! use std::path::Path;
//!
//! // Compile a single file
//! let result = compile_file(Path::new("Main.jack"));
//!
//! // Compile a directory
//! let results = compile_directory(Path::new("Square/"));
//!
//! // Also record the parse-tree trace
//! let options = CompileOptions { trace: true };
//! let result = compile_file_with_options(Path::new("Main.jack"), options);
//! ```

pub mod engine;
pub mod error;
pub mod label;
pub mod lexer;
pub mod symbol_table;
pub mod token;
pub mod trace;
pub mod vm_writer;

use log::{debug, info, warn};
use rayon::prelude::*;
use std::fs;
use std::io::BufRead;
use std::path::Path;

// Re-export key types
pub use engine::{CompilationEngine, CompiledUnit, SubroutineKind};
pub use error::{CompileError, Diagnostic};
pub use label::{ControlFlow, LabelGenerator, LabelPair};
pub use lexer::Lexer;
pub use symbol_table::{Symbol, SymbolKind, SymbolTable, Type};
pub use vm_writer::{Command, Segment, VMWriter};

/// Result of compiling a single Jack file.
#[derive(Debug)]
pub struct CompileResult {
    /// The unit name (file stem) that was compiled.
    pub filename: String,
    /// The source text, kept for rendering diagnostics. Empty when the
    /// unit was compiled from a stream.
    pub source: String,
    /// The generated VM code (empty if an error occurred).
    pub vm_code: String,
    /// The parse-tree trace, when requested and compilation succeeded.
    pub trace: Option<String>,
    /// The error that aborted compilation, if any.
    pub error: Option<CompileError>,
}

impl CompileResult {
    /// Check if the compilation was successful.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Render the error, if any, with file position and source excerpt.
    pub fn diagnostic(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        let mut diagnostic = Diagnostic::new(error).with_filename(&self.filename);
        if !self.source.is_empty() {
            diagnostic = diagnostic.with_source(&self.source);
        }
        Some(diagnostic.to_string())
    }

    fn failed(filename: &str, source: String, error: CompileError) -> Self {
        warn!("{}: {}", filename, error);
        Self {
            filename: filename.to_string(),
            source,
            vm_code: String::new(),
            trace: None,
            error: Some(error),
        }
    }
}

/// Compilation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Produce the parse-tree trace alongside the VM code (default: false).
    pub trace: bool,
}

/// Compile a single Jack file.
pub fn compile_file(path: &Path) -> CompileResult {
    compile_file_with_options(path, CompileOptions::default())
}

/// Compile a single Jack file with custom options.
pub fn compile_file_with_options(path: &Path, options: CompileOptions) -> CompileResult {
    let filename = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => return CompileResult::failed(&filename, String::new(), CompileError::io(path, e)),
    };

    compile_source_with_options(&source, &filename, options)
}

/// Compile Jack source code directly.
pub fn compile_source(source: &str, filename: &str) -> CompileResult {
    compile_source_with_options(source, filename, CompileOptions::default())
}

/// Compile Jack source code with custom options.
pub fn compile_source_with_options(
    source: &str,
    filename: &str,
    options: CompileOptions,
) -> CompileResult {
    let mut result = compile_reader(source.as_bytes(), filename, options);
    result.source = source.to_string();
    result
}

/// Compile Jack source pulled line by line from any buffered reader.
pub fn compile_reader<R: BufRead>(
    reader: R,
    filename: &str,
    options: CompileOptions,
) -> CompileResult {
    let mut engine = CompilationEngine::new(Lexer::new(reader));
    if options.trace {
        engine = engine.with_trace();
    }

    match engine.compile() {
        Ok(unit) => {
            if unit.class_name != filename {
                warn!(
                    "{}: class '{}' does not match its file name",
                    filename, unit.class_name
                );
            }
            debug!(
                "{}: compiled {} VM lines",
                filename,
                unit.vm_code.lines().count()
            );
            CompileResult {
                filename: filename.to_string(),
                source: String::new(),
                vm_code: unit.vm_code,
                trace: unit.trace,
                error: None,
            }
        }
        Err(error) => CompileResult::failed(filename, String::new(), error),
    }
}

/// Compile all Jack files in a directory.
pub fn compile_directory(dir: &Path) -> Vec<CompileResult> {
    compile_directory_with_options(dir, CompileOptions::default())
}

/// Compile all Jack files in a directory with custom options.
pub fn compile_directory_with_options(dir: &Path, options: CompileOptions) -> Vec<CompileResult> {
    let mut jack_files: Vec<_> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "jack"))
            .collect(),
        Err(e) => {
            let name = dir.to_string_lossy();
            return vec![CompileResult::failed(&name, String::new(), CompileError::io(dir, e))];
        }
    };

    info!("{}: found {} .jack files", dir.display(), jack_files.len());
    if jack_files.is_empty() {
        return Vec::new();
    }
    jack_files.sort();

    // Units share nothing, so they compile independently.
    jack_files
        .par_iter()
        .map(|path| compile_file_with_options(path, options))
        .collect()
}

/// Write a compile result to `<filename><suffix>.vm` in `output_dir`, plus
/// `<filename><suffix>.xml` when a trace was produced.
pub fn write_result(
    result: &CompileResult,
    output_dir: &Path,
    suffix: &str,
) -> Result<(), CompileError> {
    if let Some(error) = &result.error {
        return Err(CompileError::precondition(format!(
            "refusing to write failed unit {}: {}",
            result.filename, error
        )));
    }

    let vm_path = output_dir.join(format!("{}{}.vm", result.filename, suffix));
    fs::write(&vm_path, &result.vm_code).map_err(|e| CompileError::io(&vm_path, e))?;
    debug!("wrote {}", vm_path.display());

    if let Some(trace) = &result.trace {
        let xml_path = output_dir.join(format!("{}{}.xml", result.filename, suffix));
        fs::write(&xml_path, trace).map_err(|e| CompileError::io(&xml_path, e))?;
        debug!("wrote {}", xml_path.display());
    }
    Ok(())
}
