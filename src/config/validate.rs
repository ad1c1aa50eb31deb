//! Structural validation of config fragments.
//!
//! Walks tier roots, parses every fragment on its own and applies
//! per-category rules. Findings accumulate in a [`ValidationReport`]; nothing
//! here stops at the first problem, and nothing touches the settings tree.

use super::files::list_files;
use super::loader::parse_document;
use super::tiers::{Category, Tier, TierLayout};
use super::types::{PLATFORMS, Settings};
use super::value::SettingValue;
use crate::error::{ConfigError, ConfigResult};
use regex_lite::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};

/// Install methods known to the installer.
pub const KNOWN_INSTALL_METHODS: &[&str] = &[
    "apt", "dnf", "pacman", "zypper", "brew", "snap", "flatpak", "appimage", "curlpipe", "mise",
    "docker", "pip", "npm", "cargo", "go", "winget", "choco", "scoop", "download", "script",
];

static PLAUSIBLE_METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9_-]*$").expect("install method pattern is valid")
});

/// Finding severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One structural problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub file: PathBuf,
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

/// Accumulated findings from a validation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
    pub files_checked: usize,
}

impl ValidationReport {
    pub fn error(&mut self, file: &Path, field: &str, message: impl Into<String>) {
        self.push(file, field, message, Severity::Error);
    }

    pub fn warning(&mut self, file: &Path, field: &str, message: impl Into<String>) {
        self.push(file, field, message, Severity::Warning);
    }

    fn push(&mut self, file: &Path, field: &str, message: impl Into<String>, severity: Severity) {
        self.findings.push(Finding {
            file: file.to_path_buf(),
            field: field.to_string(),
            message: message.into(),
            severity,
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Fold another report into this one.
    pub fn extend(&mut self, other: ValidationReport) {
        self.findings.extend(other.findings);
        self.files_checked += other.files_checked;
    }

    /// Fail only when at least one error exists; warnings never fail.
    pub fn into_result(self) -> ConfigResult<ValidationReport> {
        if self.has_errors() {
            Err(ConfigError::Validation {
                errors: self.error_count(),
                warnings: self.warning_count(),
            })
        } else {
            Ok(self)
        }
    }
}

/// Validation pass over one or more tier roots.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    strict: bool,
}

impl Validator {
    /// In strict mode a missing `system` directory is an error.
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Validate every existing tier root of `layout`.
    ///
    /// Tier roots that do not exist are skipped; the strict `system`
    /// requirement applies to the shipped defaults only.
    pub fn validate_layout(&self, layout: &TierLayout) -> ValidationReport {
        let mut report = ValidationReport::default();
        for tier in Tier::ALL {
            let root = layout.root(tier);
            if !root.is_dir() {
                debug!(tier = %tier, path = %root.display(), "Tier root not present");
                continue;
            }
            self.check_root(&root, self.strict && tier == Tier::Default, &mut report);
        }
        info!(
            files = report.files_checked,
            errors = report.error_count(),
            warnings = report.warning_count(),
            "Validation finished"
        );
        report
    }

    /// Validate a single tier root (the directory holding `system/`,
    /// `applications/`, ...).
    pub fn validate_root(&self, root: &Path) -> ValidationReport {
        let mut report = ValidationReport::default();
        if !root.is_dir() {
            report.error(root, "<directory>", "config root does not exist");
            return report;
        }
        self.check_root(root, self.strict, &mut report);
        report
    }

    fn check_root(&self, root: &Path, require_system: bool, report: &mut ValidationReport) {
        for category in Category::ALL {
            let dir = root.join(category.dir_name());
            let files = match list_files(&dir) {
                Ok(files) => files,
                Err(err) if err.is_not_found() => {
                    let message = format!("{} directory is missing", category);
                    if require_system && category == Category::System {
                        report.error(&dir, "<directory>", message);
                    } else {
                        report.warning(&dir, "<directory>", message);
                    }
                    continue;
                }
                Err(err) => {
                    report.warning(&dir, "<directory>", format!("cannot list directory: {}", err));
                    continue;
                }
            };
            for name in files {
                self.validate_file(&dir.join(name), category, report);
            }
        }
    }

    /// Parse one fragment and apply the rules for its category.
    pub fn validate_file(&self, path: &Path, category: Category, report: &mut ValidationReport) {
        report.files_checked += 1;

        let document = match std::fs::read(path)
            .map_err(|e| ConfigError::io(path, e))
            .and_then(|bytes| parse_document(&bytes, path))
        {
            Ok(document) => document,
            Err(err) => {
                report.error(path, "<file>", err.to_string());
                return;
            }
        };
        let Some(fields) = document.as_map() else {
            report.error(path, "<file>", "top level must be a mapping");
            return;
        };

        match category {
            Category::Applications => check_application(path, fields, report),
            Category::Environments => check_environment(path, fields, report),
            Category::System | Category::Desktop => check_non_empty(path, fields, report),
        }
    }

    /// Cross-file checks on materialized settings.
    pub fn validate_settings(&self, settings: &Settings, report: &mut ValidationReport) {
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        for app in settings.all_applications() {
            *seen.entry(app.name.as_str()).or_default() += 1;
        }
        for (name, count) in seen.into_iter().filter(|(_, c)| *c > 1) {
            report.warning(
                Path::new("applications"),
                "name",
                format!("application '{}' is defined by {} files", name, count),
            );
        }
    }
}

fn non_empty_str<'a>(fields: &'a BTreeMap<String, SettingValue>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(SettingValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn require_string(
    path: &Path,
    fields: &BTreeMap<String, SettingValue>,
    key: &str,
    report: &mut ValidationReport,
) {
    match fields.get(key) {
        None => report.error(path, key, format!("{} is required", key)),
        Some(SettingValue::String(s)) if s.trim().is_empty() => {
            report.error(path, key, format!("{} must not be empty", key))
        }
        Some(SettingValue::String(_)) => {}
        Some(other) => report.error(
            path,
            key,
            format!("{} must be a string, found {}", key, other.kind()),
        ),
    }
}

/// Known methods pass, plausible unknown ones warn, anything else errors.
fn check_install_method(path: &Path, field: &str, method: &str, report: &mut ValidationReport) {
    let method = method.trim();
    if method.is_empty() {
        report.error(path, field, "install_method must not be empty");
    } else if KNOWN_INSTALL_METHODS.contains(&method) {
        // ok
    } else if PLAUSIBLE_METHOD_RE.is_match(method) {
        report.warning(path, field, format!("unrecognized install method '{}'", method));
    } else {
        report.error(path, field, format!("invalid install method '{}'", method));
    }
}

fn platform_blocks(
    fields: &BTreeMap<String, SettingValue>,
) -> Vec<(String, &BTreeMap<String, SettingValue>)> {
    let mut blocks = Vec::new();
    for platform in PLATFORMS {
        if let Some(block) = fields.get(platform).and_then(SettingValue::as_map) {
            blocks.push((platform.to_string(), block));
        }
        if let Some(block) = fields
            .get("platforms")
            .and_then(|p| p.get(platform))
            .and_then(SettingValue::as_map)
        {
            blocks.push((format!("platforms.{}", platform), block));
        }
    }
    blocks
}

fn has_platform_keys(fields: &BTreeMap<String, SettingValue>) -> bool {
    fields.contains_key("platforms") || PLATFORMS.iter().any(|p| fields.contains_key(*p))
}

fn check_application(path: &Path, fields: &BTreeMap<String, SettingValue>, report: &mut ValidationReport) {
    require_string(path, fields, "name", report);
    require_string(path, fields, "description", report);

    if let Some(value) = fields.get("install_method") {
        match value.as_str() {
            Some(method) => check_install_method(path, "install_method", method, report),
            None => report.error(path, "install_method", "install_method must be a string"),
        }
    }

    if !has_platform_keys(fields) {
        return;
    }

    let mut usable = 0;
    for (label, block) in platform_blocks(fields) {
        let method = non_empty_str(block, "install_method");
        let command = non_empty_str(block, "install_command");
        match (method, command) {
            (Some(method), Some(_)) => {
                check_install_method(path, &format!("{}.install_method", label), method, report);
                usable += 1;
            }
            (None, _) => report.warning(
                path,
                &format!("{}.install_method", label),
                "platform block has no install_method",
            ),
            (_, None) => report.warning(
                path,
                &format!("{}.install_command", label),
                "platform block has no install_command",
            ),
        }
    }
    if usable == 0 {
        report.error(
            path,
            "platforms",
            "at least one of linux, macos or windows must define install_method and install_command",
        );
    }
}

fn check_environment(path: &Path, fields: &BTreeMap<String, SettingValue>, report: &mut ValidationReport) {
    if let Some(value) = fields.get("install_method") {
        match value.as_str() {
            Some(method) if method.trim().is_empty() => {
                report.error(path, "install_method", "install_method must not be empty")
            }
            Some(_) => {}
            None => report.error(path, "install_method", "install_method must be a string"),
        }
    }
}

fn check_non_empty(path: &Path, fields: &BTreeMap<String, SettingValue>, report: &mut ValidationReport) {
    if fields.is_empty() {
        report.warning(path, "<file>", "file defines no settings");
        return;
    }
    for (key, value) in fields {
        if value.is_empty() {
            report.warning(path, key, format!("{} is empty", key));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn full_root(temp: &TempDir) -> PathBuf {
        let root = temp.path().join("config");
        for category in Category::ALL {
            std::fs::create_dir_all(root.join(category.dir_name())).unwrap();
        }
        root
    }

    #[test]
    fn test_application_requires_name_and_description() {
        let temp = TempDir::new().unwrap();
        let root = full_root(&temp);
        write(&root, "applications/bad.yaml", "name: \"\"\ncategory: tools\n");

        let report = Validator::new(false).validate_root(&root);
        let fields: Vec<_> = report.errors().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "description"]);
    }

    #[test]
    fn test_platform_block_rules() {
        let temp = TempDir::new().unwrap();
        let root = full_root(&temp);
        write(
            &root,
            "applications/ok.yaml",
            "name: git\ndescription: vc\nlinux:\n  install_method: apt\n  install_command: git\n",
        );
        write(
            &root,
            "applications/custom.yaml",
            "name: tool\ndescription: t\nmacos:\n  install_method: nix\n  install_command: tool\n",
        );
        write(
            &root,
            "applications/broken.yaml",
            "name: x\ndescription: y\nwindows:\n  install_method: winget\n",
        );
        write(
            &root,
            "applications/weird.yaml",
            "name: w\ndescription: w\nplatforms:\n  linux:\n    install_method: \"rm -rf\"\n    install_command: w\n",
        );

        let report = Validator::new(false).validate_root(&root);
        let errors: Vec<_> = report
            .errors()
            .map(|f| (f.file.file_name().unwrap().to_str().unwrap(), f.field.as_str()))
            .collect();
        assert!(errors.contains(&("broken.yaml", "platforms")));
        assert!(errors.contains(&("weird.yaml", "platforms.linux.install_method")));
        assert!(!errors.iter().any(|(f, _)| *f == "ok.yaml" || *f == "custom.yaml"));

        let warnings: Vec<_> = report.warnings().map(|f| f.message.as_str()).collect();
        assert!(warnings.contains(&"unrecognized install method 'nix'"));
    }

    #[test]
    fn test_environment_install_method() {
        let temp = TempDir::new().unwrap();
        let root = full_root(&temp);
        write(&root, "environments/node.yaml", "install_method: \"  \"\n");
        write(&root, "environments/go.yaml", "version: \"1.22\"\n");

        let report = Validator::new(false).validate_root(&root);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.files_checked, 2);
    }

    #[test]
    fn test_system_and_desktop_non_empty() {
        let temp = TempDir::new().unwrap();
        let root = full_root(&temp);
        write(&root, "system/core.yaml", "{}\n");
        write(&root, "desktop/gnome.yaml", "theme: \"\"\n");

        let report = Validator::new(false).validate_root(&root);
        assert!(!report.has_errors());
        assert_eq!(report.warning_count(), 2);
    }

    #[test]
    fn test_unparseable_file_is_error() {
        let temp = TempDir::new().unwrap();
        let root = full_root(&temp);
        write(&root, "system/empty.yaml", "");
        write(&root, "system/broken.yaml", "a: [b\n");

        let report = Validator::new(false).validate_root(&root);
        assert_eq!(report.error_count(), 2);
        assert!(report.into_result().is_err());
    }

    #[test]
    fn test_missing_directories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("config");
        std::fs::create_dir_all(root.join("applications")).unwrap();

        let lenient = Validator::new(false).validate_root(&root);
        assert!(!lenient.has_errors());
        assert_eq!(lenient.warning_count(), 3);

        let strict = Validator::new(true).validate_root(&root);
        assert_eq!(strict.error_count(), 1);
        assert_eq!(strict.warning_count(), 2);
        assert!(strict.errors().next().unwrap().file.ends_with("system"));
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let mut report = ValidationReport::default();
        report.warning(Path::new("a.yaml"), "x", "advisory");
        let report = report.into_result().unwrap();
        assert_eq!(report.warning_count(), 1);
    }
}
