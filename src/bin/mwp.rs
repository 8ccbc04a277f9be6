//! mwp: certify polynomial growth bounds of C functions
//!
//! Usage: mwp FILE [--out PATH] [--no-save] [--fin] [--strict] [--loops] [-v]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mwp::analysis::{self, AnalysisOptions};
use mwp::result::AnalysisReport;
use mwp::serialize::{default_output_path, save_result};

#[derive(Parser, Debug)]
#[command(name = "mwp", version, about = "mwp-bound analysis of C programs")]
struct Cli {
    /// C source file to analyze
    file: PathBuf,

    /// Where to save the result (default: output/<file>.json)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Do not save the result
    #[arg(long)]
    no_save: bool,

    /// Run to completion even when no bound exists
    #[arg(long)]
    fin: bool,

    /// Skip functions with unsupported syntax
    #[arg(long)]
    strict: bool,

    /// Analyze loops separately instead of whole functions
    #[arg(long)]
    loops: bool,

    /// Use the bounded-iteration rule for compatible for loops
    #[arg(long)]
    bounded_for: bool,

    /// Iteration cap for loop fixpoints
    #[arg(long, default_value_t = 10_000)]
    fixpoint_limit: usize,

    /// Print nothing but errors
    #[arg(short, long)]
    silent: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> AnalysisOptions {
        AnalysisOptions {
            fin: self.fin,
            strict: self.strict,
            fixpoint_limit: self.fixpoint_limit,
            bounded_for: self.bounded_for,
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = if cli.silent {
        EnvFilter::new("error")
    } else {
        match cli.verbose {
            0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> mwp::Result<()> {
    let source = fs::read_to_string(&cli.file)?;
    let program = mwp::parse(&source)?;
    info!("parsed {} ({} functions)", cli.file.display(), program.functions.len());

    let options = cli.options();
    let mut report = if cli.loops {
        analysis::analyze_loops(&program, &options)?
    } else {
        analysis::analyze_program(&program, &options)?
    };
    report.program.name = program_name(&cli.file);
    report.program.n_lines = source.lines().count();

    if !cli.silent {
        print_report(&report);
    }
    report.log();

    if !cli.no_save {
        let out = cli
            .out
            .clone()
            .unwrap_or_else(|| default_output_path(&cli.file));
        save_result(&out, &report)?;
    }
    Ok(())
}

fn program_name(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

fn print_report(report: &AnalysisReport) {
    for result in report.relations.values() {
        println!("{}", result);
    }
    for result in report.loops.values() {
        println!("{}", result);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
