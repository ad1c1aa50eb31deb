//! Typed settings materialized from the merged tree.
//!
//! [`Settings::from_tree`] is the only way in: it reads the generic
//! [`SettingsTree`] without mutating it, projects each fragment through serde
//! and fills defaults for anything left unset.

use super::merge::{SettingsTree, deep_merge_all};
use super::tiers::Category;
use super::value::SettingValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

/// Platform blocks recognized on application descriptors.
pub const PLATFORMS: [&str; 3] = ["linux", "macos", "windows"];

/// Timeouts, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default = "default_install_timeout")]
    pub install: u64,

    #[serde(default = "default_download_timeout")]
    pub download: u64,

    #[serde(default = "default_health_check_timeout")]
    pub health_check: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            install: default_install_timeout(),
            download: default_download_timeout(),
            health_check: default_health_check_timeout(),
        }
    }
}

impl Timeouts {
    pub fn install_duration(&self) -> Duration {
        Duration::from_secs(self.install)
    }

    pub fn download_duration(&self) -> Duration {
        Duration::from_secs(self.download)
    }

    pub fn health_check_duration(&self) -> Duration {
        Duration::from_secs(self.health_check)
    }
}

fn default_install_timeout() -> u64 {
    600 // 10 minutes
}

fn default_download_timeout() -> u64 {
    300 // 5 minutes
}

fn default_health_check_timeout() -> u64 {
    30
}

/// Settings merged from every `system/` fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSettings {
    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(default = "default_max_concurrent_installs")]
    pub max_concurrent_installs: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub shell: Option<String>,

    /// Keys without a typed field.
    #[serde(flatten)]
    pub extra: BTreeMap<String, SettingValue>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            max_concurrent_installs: default_max_concurrent_installs(),
            log_level: default_log_level(),
            shell: None,
            extra: BTreeMap::new(),
        }
    }
}

fn default_max_concurrent_installs() -> usize {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Install instructions for one platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInstall {
    #[serde(default)]
    pub install_method: String,

    #[serde(default)]
    pub install_command: String,

    #[serde(default)]
    pub uninstall_command: Option<String>,

    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// An installable application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub category: Option<String>,

    /// Installed by default when no explicit selection is made.
    #[serde(default)]
    pub default: bool,

    #[serde(default)]
    pub install_method: Option<String>,

    #[serde(default)]
    pub install_command: Option<String>,

    #[serde(default)]
    pub uninstall_command: Option<String>,

    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub linux: Option<PlatformInstall>,

    #[serde(default)]
    pub macos: Option<PlatformInstall>,

    #[serde(default)]
    pub windows: Option<PlatformInstall>,
}

impl Application {
    /// Install instructions for `platform` (`linux`, `macos`, `windows`).
    pub fn platform(&self, platform: &str) -> Option<&PlatformInstall> {
        match platform {
            "linux" => self.linux.as_ref(),
            "macos" => self.macos.as_ref(),
            "windows" => self.windows.as_ref(),
            _ => None,
        }
    }

    /// True if the application can be installed on `platform`, either
    /// through a platform block or a top-level install command.
    pub fn supports(&self, platform: &str) -> bool {
        self.platform(platform).is_some()
            || self
                .install_command
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty())
    }
}

/// A language or toolchain environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub install_method: Option<String>,

    #[serde(default)]
    pub install_command: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub tools: Vec<String>,

    #[serde(default)]
    pub default: bool,
}

/// Desktop environment tweaks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesktopSpec {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub platform: Option<String>,

    #[serde(flatten)]
    pub settings: BTreeMap<String, SettingValue>,
}

/// The materialized settings handed to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Settings {
    environment: String,
    system: SystemSettings,
    applications: Vec<Application>,
    environments: Vec<EnvironmentSpec>,
    desktop: Vec<DesktopSpec>,
    #[serde(skip)]
    tree: SettingsTree,
}

impl Settings {
    /// Project a merged tree into typed settings.
    ///
    /// Fragments that do not fit their typed shape are logged and left out;
    /// the raw values stay reachable through [`get`](Self::get).
    pub fn from_tree(tree: &SettingsTree, environment: &str) -> Self {
        // Each system file must project on its own; survivors are folded
        // in file-key order.
        let system_groups = tree
            .category_groups(Category::System)
            .into_iter()
            .filter_map(|(file, fields)| {
                let group = SettingValue::Map(fields);
                project::<SystemSettings>(&format!("system.{}", file), group.clone())
                    .map(|_| group)
            });
        let system =
            project::<SystemSettings>("system", deep_merge_all(system_groups)).unwrap_or_default();

        let applications = project_groups(tree, Category::Applications, |app: &mut Application, file| {
            if app.name.trim().is_empty() {
                app.name = file.to_string();
            }
        });
        let environments = project_groups(tree, Category::Environments, |env: &mut EnvironmentSpec, file| {
            if env.name.trim().is_empty() {
                env.name = file.to_string();
            }
        });
        let desktop = project_groups(tree, Category::Desktop, |spec: &mut DesktopSpec, file| {
            if spec.name.trim().is_empty() {
                spec.name = file.to_string();
            }
        });

        Self {
            environment: environment.to_string(),
            system,
            applications,
            environments,
            desktop,
            tree: tree.clone(),
        }
    }

    /// The environment these settings were resolved for.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn system(&self) -> &SystemSettings {
        &self.system
    }

    pub fn all_applications(&self) -> &[Application] {
        &self.applications
    }

    /// Applications flagged `default: true`.
    pub fn default_applications(&self) -> Vec<&Application> {
        self.applications.iter().filter(|a| a.default).collect()
    }

    pub fn application(&self, name: &str) -> Option<&Application> {
        self.applications.iter().find(|a| a.name == name)
    }

    pub fn applications_for_platform(&self, platform: &str) -> Vec<&Application> {
        self.applications
            .iter()
            .filter(|a| a.supports(platform))
            .collect()
    }

    pub fn environments(&self) -> &[EnvironmentSpec] {
        &self.environments
    }

    pub fn desktop(&self) -> &[DesktopSpec] {
        &self.desktop
    }

    /// Raw value for a dotted key such as `system.core.timeouts.install`.
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.tree.get(key)
    }

    /// The merged tree these settings were projected from.
    pub fn tree(&self) -> &SettingsTree {
        &self.tree
    }
}

fn project<T: DeserializeOwned>(label: &str, value: SettingValue) -> Option<T> {
    let json = match serde_json::to_value(&value) {
        Ok(json) => json,
        Err(err) => {
            warn!(fragment = %label, "Could not convert settings fragment: {}", err);
            return None;
        }
    };
    match serde_json::from_value(json) {
        Ok(typed) => Some(typed),
        Err(err) => {
            warn!(fragment = %label, "Settings fragment does not match its expected shape: {}", err);
            None
        }
    }
}

/// Project every file group of `category`, in file-key order.
fn project_groups<T: DeserializeOwned>(
    tree: &SettingsTree,
    category: Category,
    fill: impl Fn(&mut T, &str),
) -> Vec<T> {
    tree.category_groups(category)
        .into_iter()
        .filter_map(|(file, fields)| {
            let label = format!("{}.{}", category, file);
            let mut typed: T = project(&label, SettingValue::Map(fields))?;
            fill(&mut typed, &file);
            Some(typed)
        })
        .collect()
}
