//! splc command line

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::debug;
use splc::backend::Value;
use splc::utils::Error;
use splc::{CompileOptions, Session};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// splc - semantic checker and reference runner
#[derive(Parser, Debug)]
#[command(name = "splc")]
#[command(version = "0.1.0")]
#[command(about = "Type checker, coherence checker and reference evaluator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print diagnostics as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Specializations allowed per generic definition
    #[arg(long, global = true, value_name = "N", default_value_t = 4096)]
    instantiation_limit: usize,

    /// Leave unconstrained integer literals undefaulted
    #[arg(long, global = true)]
    no_numeric_defaulting: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a source file for errors
    Check {
        /// Input source file
        input: PathBuf,
    },
    /// Check a source file and plan its specializations
    Build {
        /// Input source file
        input: PathBuf,

        /// Print every specialization as JSON
        #[arg(long)]
        emit_instances: bool,
    },
    /// Check a source file and evaluate its main function
    Run {
        /// Input source file
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match execute(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> anyhow::Result<ExitCode> {
    let options = CompileOptions {
        instantiation_limit: cli.instantiation_limit,
        numeric_defaulting: !cli.no_numeric_defaulting,
    };
    let mut session = Session::new(options);

    let input = match &cli.command {
        Commands::Check { input } | Commands::Build { input, .. } | Commands::Run { input } => input,
    };
    let source = read_source(input)?;
    let name = input.display().to_string();
    debug!("compiling {}", name);

    let compilation = match session.compile(&name, &source) {
        Ok(compilation) => compilation,
        Err(err) => return Ok(report(&session, &err, cli.json)),
    };

    match &cli.command {
        Commands::Check { .. } => {}
        Commands::Build { emit_instances, .. } => {
            if *emit_instances {
                let plan = serde_json::to_string_pretty(&compilation.analysis.plan)
                    .context("serializing the instance plan")?;
                println!("{}", plan);
            }
        }
        Commands::Run { .. } => {
            let mut out = io::stdout();
            match splc::run(&compilation, &mut out) {
                Ok(Value::Unit) => {}
                Ok(value) => writeln!(out, "{}", value).context("writing the result")?,
                Err(err) => {
                    out.flush().context("flushing program output")?;
                    return Ok(report(&session, &err, cli.json));
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Print a diagnostic and pick the failing exit code
fn report(session: &Session, err: &Error, json: bool) -> ExitCode {
    let diagnostic = session.render(err);
    if json {
        println!("{}", diagnostic.to_json());
    } else {
        eprintln!("{}", diagnostic);
    }
    ExitCode::FAILURE
}
