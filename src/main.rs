//! P16 Assembler CLI
//!
//! Command-line tool for assembling P16 source files and optionally
//! emitting a redstone `.schem` schematic of the compiled ROM pages.

use clap::{Parser, ValueEnum};
use p16_asm::{
    schem, Dialect, HumanFormatter, JsonFormatter, OutputFormatter, ShortFormatter,
};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;

/// Two-pass multi-page assembler for the P16 nibble-addressed ISA.
///
/// Compiles line-oriented P16 assembly into per-page hex nibble streams
/// and, with `--schem`, places the result as redstone signal sources in
/// a Sponge schematic.
#[derive(Parser, Debug)]
#[command(name = "p16as")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file(s) to assemble
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "human")]
    format: OutputFormat,

    /// Write the active ROM pages to this .schem file
    #[arg(long)]
    schem: Option<PathBuf>,

    /// ROM pages to place in the schematic, e.g. `1-3,8` (default 1-15)
    #[arg(long)]
    pages: Option<String>,

    /// Use a custom dialect table file instead of the built-in P16 tables
    #[arg(long)]
    dialect: Option<PathBuf>,

    /// Show the label/address map
    #[arg(short, long)]
    labels: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (only output essential info)
    #[arg(short, long)]
    quiet: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable page listing
    Human,
    /// JSON output
    Json,
    /// Compact tab-separated output
    Short,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("p16_asm=debug")
            .init();
    }

    let dialect = match load_dialect(&args) {
        Ok(dialect) => dialect,
        Err(e) => {
            eprintln!("Error loading dialect: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.schem.is_some() && args.files.len() > 1 {
        eprintln!("Error: --schem expects a single input file");
        return ExitCode::FAILURE;
    }

    let mut success = true;

    for path in &args.files {
        match assemble_file(path, &dialect, &args) {
            Ok(()) => {}
            Err(e) => {
                if !args.quiet {
                    eprintln!("Error assembling {}: {}", path.display(), e);
                }
                success = false;
            }
        }
    }

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn load_dialect(args: &Args) -> Result<Dialect, Box<dyn std::error::Error>> {
    match &args.dialect {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(Dialect::from_json(&text)?)
        }
        None => Ok(Dialect::p16().clone()),
    }
}

fn assemble_file(
    path: &PathBuf,
    dialect: &Dialect,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    let output = p16_asm::assemble_with_dialect(&source, dialect)?;

    let rendered = match args.format {
        OutputFormat::Human => HumanFormatter {
            verbose: args.labels || args.verbose,
            quiet: args.quiet,
        }
        .format_output(&output, &path.display().to_string()),
        OutputFormat::Json => JsonFormatter { pretty: !args.quiet }
            .format_output(&output, &path.display().to_string()),
        OutputFormat::Short => {
            ShortFormatter.format_output(&output, &path.display().to_string())
        }
    };
    print!("{}", rendered);
    if matches!(args.format, OutputFormat::Json) {
        println!();
    }

    // Human output already lists warnings; mirror them for the other
    // formats so they are never silently dropped.
    if !matches!(args.format, OutputFormat::Human) && !args.quiet {
        for warning in &output.warnings {
            eprintln!("warning: {}", warning);
        }
    }

    if let Some(schem_path) = &args.schem {
        let active = match &args.pages {
            Some(spec) => parse_pages(spec)?,
            None => schem::default_active_pages(),
        };
        schem::save_schematic(schem_path, &output, &active)?;
        if !args.quiet {
            eprintln!("Schematic saved to {}", schem_path.display());
        }
    }

    Ok(())
}

/// Parse a page selection like `1-3,8,12`.
fn parse_pages(spec: &str) -> Result<BTreeSet<u8>, String> {
    let mut pages = BTreeSet::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: u8 = lo.trim().parse().map_err(|_| bad_page(part))?;
                let hi: u8 = hi.trim().parse().map_err(|_| bad_page(part))?;
                if lo > hi || hi > 15 {
                    return Err(bad_page(part));
                }
                pages.extend(lo..=hi);
            }
            None => {
                let page: u8 = part.parse().map_err(|_| bad_page(part))?;
                if page > 15 {
                    return Err(bad_page(part));
                }
                pages.insert(page);
            }
        }
    }
    if pages.is_empty() {
        return Err("page selection is empty".to_string());
    }
    Ok(pages)
}

fn bad_page(part: &str) -> String {
    format!("bad page selection `{}`: pages are 0-15", part)
}
