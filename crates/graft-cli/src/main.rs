// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! graftgen: generate Go implementations of mapping interfaces.
//!
//! Reads a JSON model of one package, plans every method of the requested
//! interfaces and writes the generated file next to the model.

mod command;
mod error;
mod logger;
mod output;

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::{debug, info, warn};

use graft_emit::EmitOptions;
use graft_plan::{display::dump, PlanConfig};

use crate::error::CliError;

#[derive(Parser)]
#[command(name = "graftgen", version, about = "Generate Go mapping code from interface declarations")]
struct Cli {
    /// Interfaces to implement (comma separated)
    #[arg(long, value_delimiter = ',', required = true)]
    interface: Vec<String>,

    /// Package directory
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Model file [default: <dir>/graft.json]
    #[arg(long)]
    model: Option<PathBuf>,

    /// Output file, relative to --dir
    #[arg(long, default_value = "graft_gen.go")]
    output: PathBuf,

    /// Free functions allowed as converters (comma separated, default: all exported)
    #[arg(long = "custom-funcs", value_delimiter = ',')]
    custom_funcs: Vec<String>,

    /// Label every generated statement with its plan path
    #[arg(long)]
    debug: bool,

    /// Print the mapping plan instead of writing Go code
    #[arg(long = "dump-ir")]
    dump_ir: bool,

    /// Log level [default: $GRAFT_LOG, else warn]
    #[arg(long = "log-level", value_parser = ["off", "error", "warn", "info", "debug", "trace"])]
    log_level: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    output::init();
    let env_level = std::env::var(logger::LOG_ENV).ok();
    logger::init(logger::resolve_level(cli.log_level.as_deref(), env_level.as_deref()));

    if let Err(e) = run(&cli) {
        eprintln!("{}: {}", output::error_label(), e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let model_path = cli.model.clone().unwrap_or_else(|| cli.dir.join("graft.json"));
    let program = graft_model::from_path(&model_path)?;
    debug!(
        "loaded package {} from {}",
        program.package,
        model_path.display()
    );

    let config = PlanConfig::new(cli.interface.iter().cloned()).with_custom_funcs(cli.custom_funcs.iter().cloned());
    let plan = graft_plan::plan(&program, &config)?;
    for diagnostic in &plan.diagnostics {
        warn!("{diagnostic}");
    }

    if cli.dump_ir {
        print!("{}", dump(&plan, &program));
        return Ok(());
    }

    let options = EmitOptions {
        debug: cli.debug,
        command: command::canonical(&cli.interface, &cli.output, &cli.dir, cli.debug, &cli.custom_funcs),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let source = graft_emit::emit(&plan, &program, &options);
    let path = cli.dir.join(&cli.output);
    write(&path, &source)?;
    info!(
        "wrote {} ({}, {})",
        output::file_path(&path.display().to_string()),
        output::count(plan.interfaces.len(), "interface"),
        output::count(plan.helpers.len(), "helper")
    );
    Ok(())
}

fn write(path: &Path, source: &str) -> Result<(), CliError> {
    std::fs::write(path, source).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}
