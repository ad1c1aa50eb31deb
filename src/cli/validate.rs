//! Validate command: report structural problems in config fragments.

use crate::config::{
    Category, ConfigLoader, LoadReport, Settings, SettingsTree, ValidationReport, Validator,
};
use crate::format::format_validation_markdown;
use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

/// Arguments for the validate command.
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {
    /// Treat a missing `system` directory as an error
    #[arg(long)]
    pub strict: bool,

    /// Validate a single config root instead of every tier
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Exit non-zero on warnings as well as errors
    #[arg(long)]
    pub deny_warnings: bool,
}

/// Build the report for the validate command.
///
/// Per-file rules run first, then cross-file checks on the settings the
/// same files materialize into.
pub fn collect_report(loader: &ConfigLoader, args: &ValidateArgs) -> Result<ValidationReport> {
    let validator = Validator::new(args.strict);
    let (mut report, settings) = match args.dir {
        Some(ref dir) => (validator.validate_root(dir), load_root(loader, dir)?),
        None => (validator.validate_layout(loader.layout()), loader.load()?),
    };
    validator.validate_settings(&settings, &mut report);
    Ok(report)
}

/// Materialize the settings of a single config root.
fn load_root(loader: &ConfigLoader, root: &Path) -> Result<Settings> {
    let mut tree = SettingsTree::new();
    let mut load_report = LoadReport::default();
    for category in Category::ALL {
        loader.load_directory(
            &root.join(category.dir_name()),
            category,
            &mut tree,
            &mut load_report,
        )?;
    }
    Ok(Settings::from_tree(&tree, loader.layout().environment()))
}

/// Run the validate command. Returns `true` when the check passed.
pub fn run_validate(loader: &ConfigLoader, args: &ValidateArgs) -> Result<bool> {
    let report = collect_report(loader, args)?;
    print!("{}", format_validation_markdown(&report));

    let passed = !report.has_errors() && !(args.deny_warnings && report.warning_count() > 0);
    if passed {
        println!("\nOK");
    }
    Ok(passed)
}
