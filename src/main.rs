//! wsconf
//!
//! Resolves layered workstation settings and reports where they came from.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use tracing::debug;
use tracing_subscriber::FmtSubscriber;
use workstation_config::cli::inspect::{render_files, render_paths};
use workstation_config::cli::show::{ShowArgs, run_show};
use workstation_config::cli::validate::run_validate;
use workstation_config::cli::{Cli, Command};

fn init_logging(cli: &Cli) -> Result<()> {
    let level = cli.log_level();
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)
                .with_context(|| format!("Failed to open log file '{}'", filename))?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let loader = cli.loader()?;
    debug!(
        environment = %loader.layout().environment(),
        home = %loader.layout().home().display(),
        "Resolved tier layout"
    );

    match cli.command {
        None => run_show(&loader, &ShowArgs::default()),
        Some(Command::Show(ref args)) => run_show(&loader, args),
        Some(Command::Validate(ref args)) => {
            if !run_validate(&loader, args)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Paths) => {
            print!("{}", render_paths(loader.layout()));
            Ok(())
        }
        Some(Command::Files) => {
            print!("{}", render_files(&loader));
            Ok(())
        }
    }
}
