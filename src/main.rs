// dart-spec-parser: check Dart files against the language grammar

use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use crossterm::style::Stylize;
use tracing_subscriber::EnvFilter;

use dart_spec_parser::{check_bytes, Diagnostic, ParseOptions, Verdict, DEFAULT_MAX_NESTING_DEPTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn enabled(self) -> bool {
        match self {
            ColorChoice::Auto => std::io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

/// Check Dart source files for syntactic conformance.
#[derive(Debug, Parser)]
#[command(name = "dart-spec-parser", version)]
struct Args {
    /// Announce each file before checking it and enable debug logging
    #[arg(long)]
    verbose: bool,

    /// Deepest nesting of expressions, statements and types to accept
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_NESTING_DEPTH)]
    max_depth: usize,

    /// When to color diagnostics
    #[arg(long, value_enum, value_name = "WHEN", default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Dart files to check
    files: Vec<PathBuf>,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.files.is_empty() {
        eprintln!("Expected a file path as argument.");
        std::process::exit(1);
    }

    let options = ParseOptions {
        max_nesting_depth: args.max_depth,
    };
    let color = args.color.enabled();

    let mut failed = false;
    for path in &args.files {
        let id = path.display().to_string();
        if args.verbose {
            eprintln!(">>> Parsing file: {}", id);
        }

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                eprintln!("{}: {}", id, err);
                failed = true;
                continue;
            }
        };

        if let Verdict::Rejected(diagnostic) = check_bytes(&id, bytes, &options) {
            report(&diagnostic, color);
            failed = true;
        }
    }

    std::process::exit(if failed { 1 } else { 0 });
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn report(diagnostic: &Diagnostic, color: bool) {
    if color {
        let prefix = format!("{}:{}:", diagnostic.source_id, diagnostic.location);
        eprintln!("{} {}", prefix.bold().red(), diagnostic.message);
    } else {
        eprintln!("{}", diagnostic);
    }
}
