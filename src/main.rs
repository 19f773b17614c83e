//! index-notation command line interface
//!
//! Usage:
//!   idxn [OPTIONS] <STATEMENT>
//!   idxn --help
//!
//! Examples:
//!   idxn "A(i,j) = B(i,k) * C(k,j)"                     # Lower to concrete notation
//!   idxn --emit=reduction "a(i) = B(i,j) * c(j)"          # Stop at reduction notation
//!   idxn -d i:64 -d j:32 --emit=domains "a(i) = B(i,j)"   # Show index variable ranges
//!   idxn --zero "C(i)" "a(i) = (B(i) + C(i)) * D(i)"      # Propagate a known zero

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use index_notation::frontend::{self, TensorEnv};
use index_notation::ir::{Datatype, Dimension, Format, IndexStmt};
use index_notation::transform::PipelineConfig;
use index_notation::utils::{NotationError, PrettyPrint};
use log::{debug, info};

/// index-notation - Tensor index notation lowering
#[derive(Parser, Debug)]
#[command(name = "idxn")]
#[command(author = "index-notation Contributors")]
#[command(version)]
#[command(about = "Classify and lower tensor index notation", long_about = None)]
struct Cli {
    /// Statement to process, e.g. "A(i,j) = B(i,k) * C(k,j)"
    #[arg(value_name = "STATEMENT")]
    statement: String,

    /// Range of an index variable (NAME:SIZE, repeatable)
    #[arg(short, long = "dim", value_name = "NAME:SIZE")]
    dims: Vec<String>,

    /// Storage format of a tensor (NAME:LETTERS, e.g. B:ds)
    #[arg(short, long = "format", value_name = "NAME:LETTERS")]
    formats: Vec<String>,

    /// Component type of a tensor (NAME:TYPE, e.g. B:int32)
    #[arg(short = 't', long = "type", value_name = "NAME:TYPE")]
    types: Vec<String>,

    /// Component type of tensors without an explicit one
    #[arg(long, default_value = "float64")]
    default_type: String,

    /// Access known to be zero (repeatable)
    #[arg(short, long = "zero", value_name = "ACCESS")]
    zeros: Vec<String>,

    /// What to emit
    #[arg(long, default_value = "concrete")]
    emit: EmitKind,

    /// Print statements over multiple lines
    #[arg(short, long)]
    pretty: bool,

    /// Skip the dialect check after each pass
    #[arg(long)]
    no_verify: bool,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitKind {
    /// Parsed statement and its dialect
    Einsum,
    /// Reduction notation
    Reduction,
    /// Concrete notation
    Concrete,
    /// Range of every index variable
    Domains,
    /// All stages (for debugging)
    All,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    info!("index-notation v{}", index_notation::VERSION);

    let mut env = build_env(&cli)?;
    let stmt = frontend::parse(&cli.statement, &mut env)
        .inspect_err(|e| show_source_error(&cli.statement, e))
        .with_context(|| format!("Failed to parse '{}'", cli.statement))?;
    debug!("Parsed: {}", stmt);

    let zeroed = cli
        .zeros
        .iter()
        .map(|source| {
            frontend::parse_access(source, &mut env)
                .with_context(|| format!("Failed to parse zero access '{}'", source))
        })
        .collect::<Result<Vec<_>>>()?;

    let emit = |label: &str, stmt: &IndexStmt| {
        let text = if cli.pretty { stmt.pretty() } else { stmt.to_string() };
        if matches!(cli.emit, EmitKind::All) {
            println!("// {}", label);
        }
        println!("{}", text);
    };

    match cli.emit {
        EmitKind::Einsum => {
            emit("einsum", &stmt);
            print_dialect(&stmt);
        }
        EmitKind::Domains => print_domains(&stmt)?,
        EmitKind::Reduction => {
            let lowered = index_notation::lower(&stmt, config(&cli, PipelineConfig::to_reduction(), zeroed))?;
            emit("reduction", &lowered.stmt);
        }
        EmitKind::Concrete => {
            let lowered = index_notation::lower(&stmt, config(&cli, PipelineConfig::to_concrete(), zeroed))?;
            emit("concrete", &lowered.stmt);
        }
        EmitKind::All => {
            emit("einsum", &stmt);
            print_dialect(&stmt);
            let reduction =
                index_notation::lower(&stmt, config(&cli, PipelineConfig::to_reduction(), zeroed.clone()))?;
            emit("reduction", &reduction.stmt);
            let concrete = index_notation::lower(&stmt, config(&cli, PipelineConfig::to_concrete(), zeroed))?;
            emit("concrete", &concrete.stmt);
            info!("Applied: {}", concrete.applied_transforms.join(", "));
            print_domains(&stmt)?;
        }
    }

    Ok(())
}

fn config(cli: &Cli, base: PipelineConfig, zeroed: Vec<index_notation::ir::Access>) -> PipelineConfig {
    let mut config = base.with_zeroed(zeroed);
    config.verify = !cli.no_verify;
    config
}

fn build_env(cli: &Cli) -> Result<TensorEnv> {
    let mut env = TensorEnv::new();
    env.set_default_datatype(parse_datatype(&cli.default_type)?);

    for arg in &cli.dims {
        let (name, size) = split_pair(arg)?;
        let size: usize = size
            .parse()
            .with_context(|| format!("Invalid size in '{}'", arg))?;
        env.set_dimension(name, Dimension::Fixed(size));
    }
    for arg in &cli.formats {
        let (name, letters) = split_pair(arg)?;
        let format = Format::from_letters(letters)
            .ok_or_else(|| anyhow!("Invalid format '{}': use 'd' and 's' per mode", letters))?;
        env.set_format(name, format);
    }
    for arg in &cli.types {
        let (name, ty) = split_pair(arg)?;
        env.set_datatype(name, parse_datatype(ty)?);
    }
    Ok(env)
}

fn split_pair(arg: &str) -> Result<(&str, &str)> {
    arg.split_once(':')
        .ok_or_else(|| anyhow!("Expected NAME:VALUE, found '{}'", arg))
}

fn parse_datatype(name: &str) -> Result<Datatype> {
    name.parse::<Datatype>().map_err(|e| anyhow!(e))
}

/// Point at the offending token of a one-line statement.
fn show_source_error(source: &str, error: &NotationError) {
    let span = match error {
        NotationError::Lexer(e) => e.span,
        NotationError::Parse(e) => e.span,
        _ => return,
    };
    if span.start.line == 1 && !source.contains('\n') {
        eprintln!("  {}\n  {}", source, span.caret_line());
    }
}

fn print_dialect(stmt: &IndexStmt) {
    match index_notation::analysis::classify(stmt) {
        Some(dialect) => println!("// {} notation", dialect),
        None => println!("// no dialect"),
    }
}

fn print_domains(stmt: &IndexStmt) -> Result<()> {
    let domains = stmt
        .index_var_domains()
        .context("Failed to compute index variable domains")?;
    for (var, dimension) in domains {
        println!("{}: {}", var, dimension);
    }
    Ok(())
}
