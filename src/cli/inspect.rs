//! `paths` and `files` commands: show where settings come from.

use crate::config::{ConfigLoader, TierLayout};

/// Render tier directories in precedence order, marking which exist.
pub fn render_paths(layout: &TierLayout) -> String {
    let mut out = format!("environment: {}\n", layout.environment());
    for dir in layout.directories() {
        let marker = if dir.path.is_dir() { "+" } else { "-" };
        out.push_str(&format!(
            "{} {:<18} {:<12} {}\n",
            marker,
            dir.tier.to_string(),
            dir.category.to_string(),
            dir.path.display()
        ));
    }
    out
}

/// Render every file a load would read, in merge order.
pub fn render_files(loader: &ConfigLoader) -> String {
    let planned = loader.planned_files();
    if planned.is_empty() {
        return "No config files found\n".to_string();
    }
    let mut out = String::new();
    for (dir, path) in planned {
        out.push_str(&format!("{:<18} {}\n", dir.tier.to_string(), path.display()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileCache, LoaderOptions};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_render_paths_lists_all_directories() {
        let temp = TempDir::new().unwrap();
        let layout = TierLayout::new(temp.path(), "staging", None);
        let out = render_paths(&layout);
        assert!(out.starts_with("environment: staging\n"));
        // header + 6 tiers x 4 categories
        assert_eq!(out.lines().count(), 25);
    }

    #[test]
    fn test_render_files_in_merge_order() {
        let temp = TempDir::new().unwrap();
        let layout = TierLayout::new(temp.path(), "development", None);
        let user = layout.directory(crate::config::Tier::User, crate::config::Category::System);
        let default =
            layout.directory(crate::config::Tier::Default, crate::config::Category::System);
        fs::create_dir_all(&user).unwrap();
        fs::create_dir_all(&default).unwrap();
        fs::write(user.join("core.yaml"), "a: 1\n").unwrap();
        fs::write(default.join("core.yaml"), "a: 0\n").unwrap();

        let loader = ConfigLoader::new(
            layout,
            Arc::new(FileCache::default()),
            LoaderOptions::default(),
        );
        let out = render_files(&loader);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(&default.display().to_string()));
        assert!(lines[1].contains(&user.display().to_string()));
    }
}
