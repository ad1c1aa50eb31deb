//! Show command: print the resolved settings.

use crate::config::{ConfigLoader, Settings};
use crate::format::{OutputFormat, format_load_report, format_settings, format_value};
use anyhow::{Result, bail};
use clap::Args;

/// Arguments for the show command.
#[derive(Args, Debug, Default)]
pub struct ShowArgs {
    /// Output format: yaml, json, markdown
    #[arg(short, long, default_value = "yaml")]
    pub format: OutputFormat,

    /// Print a single dotted key (e.g. `system.core.timeouts.install`)
    #[arg(short, long)]
    pub key: Option<String>,

    /// Print the raw merged tree instead of typed settings
    #[arg(long)]
    pub raw: bool,

    /// Append a summary of loaded and skipped files
    #[arg(long)]
    pub report: bool,
}

/// Render the show command output.
pub fn render_show(loader: &ConfigLoader, args: &ShowArgs) -> Result<String> {
    let (tree, report) = loader.load_tree()?;

    let mut out = if let Some(ref key) = args.key {
        match tree.get(key) {
            Some(value) => format_value(value, args.format)?,
            None => bail!("Key '{}' not found", key),
        }
    } else if args.raw {
        match args.format {
            OutputFormat::Json => serde_json::to_string_pretty(&tree)?,
            OutputFormat::Yaml | OutputFormat::Markdown => serde_yaml::to_string(&tree)?,
        }
    } else {
        let settings = Settings::from_tree(&tree, loader.layout().environment());
        format_settings(&settings, args.format)?
    };

    if args.report {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&format_load_report(&report));
    }
    Ok(out)
}

/// Run the show command.
pub fn run_show(loader: &ConfigLoader, args: &ShowArgs) -> Result<()> {
    let out = render_show(loader, args)?;
    print!("{}", out);
    if !out.ends_with('\n') {
        println!();
    }
    Ok(())
}
