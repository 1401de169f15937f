//! Jack Compiler CLI - Compiles Jack files to VM code.
//!
//! Usage:
//!     JackCompiler <file.jack | directory>
//!     JackCompiler --enable-parse-tree --suffix .out <file.jack | directory>

use clap::Parser as ClapParser;
use jack_compiler::{
    CompileOptions, compile_directory_with_options, compile_file_with_options, write_result,
};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(ClapParser, Debug)]
#[command(name = "JackCompiler")]
#[command(version = "2.0.0")]
#[command(about = "Single-pass Jack to VM code compiler")]
#[command(author = "nand2tetris")]
struct Args {
    /// Input file or directory
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory (defaults to input directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Appended to each output file stem, e.g. `Main.out.vm`
    #[arg(short, long, default_value = "")]
    suffix: String,

    /// Also write the parse-tree trace as `<name><suffix>.xml`
    #[arg(short = 'p', long = "enable-parse-tree")]
    enable_parse_tree: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // RUST_LOG overrides the -v level.
    if let Err(e) = SimpleLogger::new()
        .with_level(level_for(args.verbose))
        .env()
        .init()
    {
        eprintln!("Warning: logger unavailable: {}", e);
    }

    let options = CompileOptions {
        trace: args.enable_parse_tree,
    };

    let (results, output_dir) = if args.input.is_file() {
        let result = compile_file_with_options(&args.input, options);
        let output_dir = args.output.unwrap_or_else(|| {
            args.input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        });
        (vec![result], output_dir)
    } else if args.input.is_dir() {
        let results = compile_directory_with_options(&args.input, options);
        let output_dir = args.output.unwrap_or_else(|| args.input.clone());
        (results, output_dir)
    } else {
        eprintln!("Error: Input not found: {}", args.input.display());
        return ExitCode::from(2);
    };

    if results.is_empty() {
        eprintln!("Error: No .jack files found in {}", args.input.display());
        return ExitCode::from(2);
    }

    let mut has_errors = false;

    for result in &results {
        if let Some(diagnostic) = result.diagnostic() {
            has_errors = true;
            eprint!("{}", diagnostic);
            continue;
        }

        match write_result(result, &output_dir, &args.suffix) {
            Ok(()) => {
                println!(
                    "Compiled {}.jack -> {}{}.vm",
                    result.filename, result.filename, args.suffix
                );
            }
            Err(e) => {
                eprintln!("Error writing {}{}.vm: {}", result.filename, args.suffix, e);
                has_errors = true;
            }
        }
    }

    if has_errors {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
