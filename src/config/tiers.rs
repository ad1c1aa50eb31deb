//! Tier and directory resolution.
//!
//! Computes the ordered list of physical directories to scan. Resolution is a
//! pure function of (home directory, environment name, team override); whether
//! a directory actually exists is decided later by the enumerator.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::{is_valid_config_path, is_valid_environment_name};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variables consulted for the environment name, in priority order.
pub const ENVIRONMENT_VARS: [&str; 4] = ["WORKSTATION_ENV", "WSCONF_ENV", "APP_ENV", "ENVIRONMENT"];

/// Environment name used when none of [`ENVIRONMENT_VARS`] is set.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Environment variable overriding the team tier root.
pub const TEAM_DIR_VAR: &str = "WORKSTATION_TEAM_DIR";

/// Subdirectory of a base tier holding its per-environment variants.
pub const ENVIRONMENT_SUBDIR: &str = "env";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Shipped defaults (lowest priority)
    Default = 0,
    DefaultEnvironment = 1,
    /// Team-wide overrides
    Team = 2,
    TeamEnvironment = 3,
    /// User overrides
    User = 4,
    /// User overrides for the active environment (highest priority)
    UserEnvironment = 5,
}

impl Tier {
    /// All tiers in precedence order, lowest first.
    pub const ALL: [Tier; 6] = [
        Tier::Default,
        Tier::DefaultEnvironment,
        Tier::Team,
        Tier::TeamEnvironment,
        Tier::User,
        Tier::UserEnvironment,
    ];

    /// True for the per-environment variants.
    pub fn is_environment(self) -> bool {
        matches!(
            self,
            Tier::DefaultEnvironment | Tier::TeamEnvironment | Tier::UserEnvironment
        )
    }

    /// The base tier an environment variant belongs to.
    pub fn base(self) -> Tier {
        match self {
            Tier::Default | Tier::DefaultEnvironment => Tier::Default,
            Tier::Team | Tier::TeamEnvironment => Tier::Team,
            Tier::User | Tier::UserEnvironment => Tier::User,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Default => write!(f, "default"),
            Tier::DefaultEnvironment => write!(f, "default-environment"),
            Tier::Team => write!(f, "team"),
            Tier::TeamEnvironment => write!(f, "team-environment"),
            Tier::User => write!(f, "user"),
            Tier::UserEnvironment => write!(f, "user-environment"),
        }
    }
}

/// Logical directory category, processed in this order inside every tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    System,
    Environments,
    Applications,
    Desktop,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::System,
        Category::Environments,
        Category::Applications,
        Category::Desktop,
    ];

    /// Directory name under a tier root; also the first segment of tree keys.
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::System => "system",
            Category::Environments => "environments",
            Category::Applications => "applications",
            Category::Desktop => "desktop",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        Category::ALL.into_iter().find(|c| c.dir_name() == name)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// One physical directory to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierDirectory {
    pub tier: Tier,
    pub category: Category,
    pub path: PathBuf,
}

/// Tier roots for a given home directory and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierLayout {
    home: PathBuf,
    environment: String,
    default_root: PathBuf,
    team_root: PathBuf,
    user_root: PathBuf,
}

impl TierLayout {
    /// Resolve tier roots. Performs no I/O.
    ///
    /// An unsafe environment name falls back to [`DEFAULT_ENVIRONMENT`] and an
    /// unsafe team override is ignored.
    pub fn new(home: impl Into<PathBuf>, environment: &str, team_override: Option<&Path>) -> Self {
        let home = home.into();

        let environment = if is_valid_environment_name(environment) {
            environment.to_string()
        } else {
            warn!(
                environment = %environment,
                "Rejected unsafe environment name, using '{}'",
                DEFAULT_ENVIRONMENT
            );
            DEFAULT_ENVIRONMENT.to_string()
        };

        let team_root = match team_override {
            Some(dir) if is_valid_config_path(dir) => dir.to_path_buf(),
            Some(dir) => {
                warn!(path = %dir.display(), "Rejected unsafe team directory override");
                home.join(".workstation").join("team")
            }
            None => home.join(".workstation").join("team"),
        };

        Self {
            default_root: home.join(".local").join("share").join("workstation").join("config"),
            user_root: home.join(".workstation").join("config"),
            team_root,
            environment,
            home,
        }
    }

    /// Discover the layout from the process environment.
    pub fn discover() -> ConfigResult<Self> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        let environment = resolve_environment(|name| std::env::var(name).ok());
        let team_override = std::env::var(TEAM_DIR_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        Ok(Self::new(home, &environment, team_override.as_deref()))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// The active environment name.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Root directory of a tier.
    pub fn root(&self, tier: Tier) -> PathBuf {
        let base = match tier.base() {
            Tier::Team => &self.team_root,
            Tier::User => &self.user_root,
            _ => &self.default_root,
        };
        if tier.is_environment() {
            base.join(ENVIRONMENT_SUBDIR).join(&self.environment)
        } else {
            base.clone()
        }
    }

    /// Directory of one category inside one tier.
    pub fn directory(&self, tier: Tier, category: Category) -> PathBuf {
        self.root(tier).join(category.dir_name())
    }

    /// All tier/category directories in precedence order.
    pub fn directories(&self) -> Vec<TierDirectory> {
        Tier::ALL
            .into_iter()
            .flat_map(|tier| {
                Category::ALL.into_iter().map(move |category| TierDirectory {
                    tier,
                    category,
                    path: self.directory(tier, category),
                })
            })
            .collect()
    }
}

/// Pick the environment name from the first non-empty variable in
/// [`ENVIRONMENT_VARS`]. `lookup` abstracts `std::env::var` for tests.
pub fn resolve_environment(lookup: impl Fn(&str) -> Option<String>) -> String {
    ENVIRONMENT_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}
