//! CLI command definitions for wsconf
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod inspect;
pub mod show;
pub mod validate;

use crate::config::{
    ConfigLoader, LoadStrategy, LoaderOptions, TEAM_DIR_VAR, TierLayout, resolve_environment,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use show::ShowArgs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use validate::ValidateArgs;

/// Parsing strategy for directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StrategyArg {
    /// Parallel once a directory holds more than a handful of files
    #[default]
    Auto,
    Sequential,
    Parallel,
}

impl From<StrategyArg> for LoadStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Auto => LoadStrategy::Auto,
            StrategyArg::Sequential => LoadStrategy::Sequential,
            StrategyArg::Parallel => LoadStrategy::Parallel,
        }
    }
}

/// Layered workstation settings resolver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Home directory to resolve tiers against (default: current user's home)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Environment name (overrides WORKSTATION_ENV and friends)
    #[arg(short, long, global = true)]
    pub env: Option<String>,

    /// Team tier root (overrides WORKSTATION_TEAM_DIR)
    #[arg(long, global = true)]
    pub team_dir: Option<PathBuf>,

    /// Parsing strategy
    #[arg(long, value_enum, default_value_t = StrategyArg::Auto, global = true)]
    pub strategy: StrategyArg,

    /// Descend into category subdirectories up to this depth
    #[arg(long, global = true)]
    pub depth: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved settings (default if no subcommand given)
    Show(ShowArgs),

    /// Check every config fragment for structural problems
    Validate(ValidateArgs),

    /// List tier directories in precedence order
    Paths,

    /// List every file a load would read, in merge order
    Files,
}

impl Cli {
    /// Resolve the tier layout, letting flags override the environment.
    pub fn layout(&self) -> Result<TierLayout> {
        let home = match &self.home {
            Some(home) => home.clone(),
            None => dirs::home_dir().context("Could not determine the home directory")?,
        };
        let environment = match &self.env {
            Some(env) => env.clone(),
            None => resolve_environment(|name| std::env::var(name).ok()),
        };
        let team_dir = self.team_dir.clone().or_else(|| {
            std::env::var(TEAM_DIR_VAR)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        });
        Ok(TierLayout::new(home, &environment, team_dir.as_deref()))
    }

    /// Log level for the subscriber: DEBUG with `--verbose`, INFO otherwise.
    pub fn log_level(&self) -> Level {
        if self.verbose { Level::DEBUG } else { Level::INFO }
    }

    /// Build a loader from flags and `WORKSTATION_*` overrides.
    pub fn loader(&self) -> Result<ConfigLoader> {
        let mut options = LoaderOptions::from_env();
        options.strategy = self.strategy.into();
        if self.depth.is_some() {
            options.recursive_depth = self.depth;
        }
        let cache = Arc::new(options.build_cache());
        Ok(ConfigLoader::new(self.layout()?, cache, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::parse_from([
            "wsconf",
            "--home",
            "/tmp/home",
            "--env",
            "ci",
            "--strategy",
            "parallel",
            "validate",
            "--strict",
        ]);
        assert_eq!(cli.home, Some(PathBuf::from("/tmp/home")));
        assert_eq!(cli.strategy, StrategyArg::Parallel);
        assert!(matches!(cli.command, Some(Command::Validate(ref a)) if a.strict));

        let layout = cli.layout().unwrap();
        assert_eq!(layout.environment(), "ci");
        assert_eq!(layout.home(), PathBuf::from("/tmp/home").as_path());
    }

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::parse_from(["wsconf"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.log, "2");
    }

    #[test]
    fn test_log_level_shows_summaries_by_default() {
        assert_eq!(Cli::parse_from(["wsconf"]).log_level(), Level::INFO);
        assert_eq!(Cli::parse_from(["wsconf", "-v"]).log_level(), Level::DEBUG);
    }
}
