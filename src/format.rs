//! Output formatting for the CLI: JSON, YAML and markdown summaries.

use crate::config::{LoadReport, Settings, SettingValue, Severity, ValidationReport};
use anyhow::Result;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!(
                "Invalid format '{}'. Valid options: yaml, json, markdown",
                s
            )),
        }
    }
}

/// Render materialized settings.
pub fn format_settings(settings: &Settings, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => Ok(serde_yaml::to_string(settings)?),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(settings)?),
        OutputFormat::Markdown => Ok(format_settings_markdown(settings)),
    }
}

/// Render a single raw value.
pub fn format_value(value: &SettingValue, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml | OutputFormat::Markdown => Ok(serde_yaml::to_string(value)?),
    }
}

/// Summarize settings as markdown.
pub fn format_settings_markdown(settings: &Settings) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Settings ({})\n\n", settings.environment()));

    let system = settings.system();
    md.push_str("## System\n");
    md.push_str(&format!(
        "- **timeouts**: install {}s, download {}s, health check {}s\n",
        system.timeouts.install, system.timeouts.download, system.timeouts.health_check
    ));
    md.push_str(&format!(
        "- **max_concurrent_installs**: {}\n",
        system.max_concurrent_installs
    ));
    md.push_str(&format!("- **log_level**: {}\n", system.log_level));
    if let Some(ref shell) = system.shell {
        md.push_str(&format!("- **shell**: {}\n", shell));
    }
    md.push('\n');

    md.push_str(&format!(
        "## Applications ({})\n\n",
        settings.all_applications().len()
    ));
    for app in settings.all_applications() {
        let marker = if app.default { " (default)" } else { "" };
        md.push_str(&format!("- `{}`{}", app.name, marker));
        if !app.description.is_empty() {
            md.push_str(&format!(": {}", app.description));
        }
        md.push('\n');
    }

    if !settings.environments().is_empty() {
        md.push_str(&format!(
            "\n## Environments ({})\n\n",
            settings.environments().len()
        ));
        for env in settings.environments() {
            md.push_str(&format!("- `{}`", env.name));
            if let Some(ref version) = env.version {
                md.push_str(&format!(" {}", version));
            }
            md.push('\n');
        }
    }

    if !settings.desktop().is_empty() {
        md.push_str(&format!("\n## Desktop ({})\n\n", settings.desktop().len()));
        for spec in settings.desktop() {
            md.push_str(&format!("- `{}`\n", spec.name));
        }
    }

    md
}

/// Summarize a validation report as markdown.
pub fn format_validation_markdown(report: &ValidationReport) -> String {
    let mut md = String::new();

    md.push_str(&format!(
        "# Validation: {} file(s), {} error(s), {} warning(s)\n",
        report.files_checked,
        report.error_count(),
        report.warning_count()
    ));

    for severity in [Severity::Error, Severity::Warning] {
        let findings: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.severity == severity)
            .collect();
        if findings.is_empty() {
            continue;
        }
        let title = match severity {
            Severity::Error => "Errors",
            Severity::Warning => "Warnings",
        };
        md.push_str(&format!("\n## {}\n\n", title));
        for finding in findings {
            md.push_str(&format!(
                "- `{}` **{}**: {}\n",
                finding.file.display(),
                finding.field,
                finding.message
            ));
        }
    }

    md
}

/// One-paragraph summary of what a load read.
pub fn format_load_report(report: &LoadReport) -> String {
    let mut md = format!(
        "Loaded {} file(s) ({} from cache), skipped {}\n",
        report.loaded.len(),
        report.cache_hits(),
        report.skipped.len()
    );
    for skipped in &report.skipped {
        md.push_str(&format!(
            "- skipped `{}` [{}]: {}\n",
            skipped.path.display(),
            skipped.code,
            skipped.reason
        ));
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("yml".parse::<OutputFormat>(), Ok(OutputFormat::Yaml));
        assert_eq!("md".parse::<OutputFormat>(), Ok(OutputFormat::Markdown));
        assert!("toml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_validation_markdown_groups_by_severity() {
        let mut report = ValidationReport::default();
        report.files_checked = 2;
        report.warning(Path::new("a.yaml"), "x", "advisory");
        report.error(Path::new("b.yaml"), "name", "name is required");

        let md = format_validation_markdown(&report);
        assert!(md.starts_with("# Validation: 2 file(s), 1 error(s), 1 warning(s)"));
        let errors_at = md.find("## Errors").unwrap();
        let warnings_at = md.find("## Warnings").unwrap();
        assert!(errors_at < warnings_at);
        assert!(md.contains("- `b.yaml` **name**: name is required"));
    }

    #[test]
    fn test_settings_markdown_defaults() {
        let settings = Settings::default();
        let md = format_settings_markdown(&settings);
        assert!(md.contains("## Applications (0)"));
        assert!(!md.contains("## Desktop"));
    }
}
