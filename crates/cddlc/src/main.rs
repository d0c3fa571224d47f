//! The CDDL front-end CLI.
//!
//! `cddlc <FILE>` parses a CDDL file and, on success, prints a structured
//! dump of the syntax tree followed by the re-serialized text (which is
//! byte-identical to the input). Options:
//!
//! - `--json` - print the tree as JSON instead of the debug dump
//! - `--check` - parse only; print nothing on success
//!
//! Exit code 0 on success, non-zero on a parse error.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use cddl_common::error::ParserError;

#[derive(Parser)]
#[command(name = "cddlc", version, about = "Parse CDDL and print its syntax tree")]
struct Cli {
    /// Path to the CDDL file to parse
    file: PathBuf,

    /// Print the tree as JSON instead of the debug dump
    #[arg(long)]
    json: bool,

    /// Parse only; print nothing on success
    #[arg(long)]
    check: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

/// Read the file, parse it, and print the requested output.
fn run(cli: &Cli) -> Result<(), String> {
    let source = std::fs::read_to_string(&cli.file)
        .map_err(|e| format!("Failed to read '{}': {}", cli.file.display(), e))?;

    let tree = match cddl_parser::parse(&source) {
        Ok(tree) => tree,
        Err(error) => {
            report_error(&source, &error);
            return Err(format!("Failed to parse '{}'.", cli.file.display()));
        }
    };

    if cli.check {
        return Ok(());
    }

    if cli.json {
        let dump = serde_json::to_string_pretty(&tree)
            .map_err(|e| format!("Failed to encode the tree as JSON: {}", e))?;
        println!("{dump}");
        return Ok(());
    }

    println!("Abstract syntax tree (AST)");
    println!("--------------------");
    println!("{tree:#?}");
    println!();
    println!("AST re-serialization");
    println!("--------------------");
    print!("{}", tree.serialize());

    Ok(())
}

/// Render a parse error against the source using ariadne.
fn report_error(source: &str, error: &ParserError) {
    let start = error.span.start as usize;
    // Errors at end of input have nothing to label; the error's own caret
    // diagnostic already names the spot.
    if start >= source.len() {
        eprintln!("error: {}", error);
        return;
    }
    let end = (error.span.end as usize).max(start + 1);

    use ariadne::{Label, Report, ReportKind, Source};
    let _ = Report::<std::ops::Range<usize>>::build(ReportKind::Error, start..end)
        .with_message("Parse error")
        .with_label(Label::new(start..end).with_message(&error.message))
        .finish()
        .eprint(Source::from(source));
}
