//! Settings accumulator and deep merge.
//!
//! The accumulator is last-writer-wins per dotted key: a higher tier's value
//! replaces the lower tier's value whole, mappings included. [`deep_merge`]
//! is only used to fold sibling `system/` files into one typed projection.

use super::tiers::Category;
use super::value::SettingValue;
use serde::Serialize;
use std::collections::BTreeMap;

/// Deep merge two values, with `overlay` taking precedence over `base`.
///
/// - Mappings are merged recursively: keys in overlay override keys in base
/// - Lists, strings, numbers and booleans are replaced entirely
pub fn deep_merge(base: SettingValue, overlay: SettingValue) -> SettingValue {
    match (base, overlay) {
        (SettingValue::Map(mut base_map), SettingValue::Map(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = if let Some(base_value) = base_map.remove(&key) {
                    deep_merge(base_value, overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged_value);
            }
            SettingValue::Map(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge multiple mappings in order, with later values taking precedence.
pub fn deep_merge_all(values: impl IntoIterator<Item = SettingValue>) -> SettingValue {
    values
        .into_iter()
        .fold(SettingValue::Map(BTreeMap::new()), deep_merge)
}

/// Build the `{category}.{file}` prefix for a fragment.
pub fn namespace(category: Category, file_key: &str) -> String {
    format!("{}.{}", category.dir_name(), file_key)
}

/// Flat accumulator of dotted keys (`{category}.{file}.{key}`) to values.
///
/// Keys are kept sorted so serialization is byte-for-byte stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SettingsTree {
    entries: BTreeMap<String, SettingValue>,
}

impl SettingsTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single key, replacing any earlier value.
    pub fn set(&mut self, key: impl Into<String>, value: SettingValue) {
        self.entries.insert(key.into(), value);
    }

    /// Fold every top-level key of a parsed fragment in under `prefix`.
    ///
    /// Non-mapping documents contribute nothing; the loader rejects them
    /// before they get here.
    pub fn merge_document(&mut self, prefix: &str, document: &SettingValue) -> usize {
        let Some(map) = document.as_map() else {
            return 0;
        };
        for (key, value) in map {
            self.set(format!("{}.{}", prefix, key), value.clone());
        }
        map.len()
    }

    /// Look up a dotted key, descending into mapping values when the key
    /// reaches below a stored entry (`system.core.timeouts.install`).
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        if let Some(value) = self.entries.get(key) {
            return Some(value);
        }
        let mut split = key.len();
        while let Some(pos) = key[..split].rfind('.') {
            if let Some(value) = self.entries.get(&key[..pos]) {
                return value.get_path(&key[pos + 1..]);
            }
            split = pos;
        }
        None
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Group entries of one category by file key.
    ///
    /// Returns `file -> { key -> value }` with both levels sorted.
    pub fn category_groups(
        &self,
        category: Category,
    ) -> BTreeMap<String, BTreeMap<String, SettingValue>> {
        let prefix = format!("{}.", category.dir_name());
        let mut groups: BTreeMap<String, BTreeMap<String, SettingValue>> = BTreeMap::new();
        for (key, value) in self.entries.range(prefix.clone()..) {
            let Some(rest) = key.strip_prefix(&prefix) else {
                break;
            };
            let Some((file, field)) = rest.split_once('.') else {
                continue;
            };
            groups
                .entry(file.to_string())
                .or_default()
                .insert(field.to_string(), value.clone());
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> SettingValue {
        SettingValue::Integer(n)
    }

    fn map(pairs: &[(&str, SettingValue)]) -> SettingValue {
        SettingValue::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_merge_simple_objects() {
        let base = map(&[("a", int(1)), ("b", int(2))]);
        let overlay = map(&[("b", int(3)), ("c", int(4))]);
        let result = deep_merge(base, overlay);
        assert_eq!(result, map(&[("a", int(1)), ("b", int(3)), ("c", int(4))]));
    }

    #[test]
    fn test_merge_nested_objects() {
        let base = map(&[(
            "timeouts",
            map(&[("install", int(600)), ("download", int(300))]),
        )]);
        let overlay = map(&[("timeouts", map(&[("install", int(900))]))]);
        let result = deep_merge(base, overlay);
        assert_eq!(
            result.get_path("timeouts.install"),
            Some(&SettingValue::Integer(900))
        );
        assert_eq!(
            result.get_path("timeouts.download"),
            Some(&SettingValue::Integer(300))
        );
    }

    #[test]
    fn test_lists_replaced_not_merged() {
        let base = map(&[("items", SettingValue::List(vec![int(1), int(2)]))]);
        let overlay = map(&[("items", SettingValue::List(vec![int(3)]))]);
        let result = deep_merge(base, overlay);
        assert_eq!(
            result.get("items"),
            Some(&SettingValue::List(vec![int(3)]))
        );
    }

    #[test]
    fn test_overlay_replaces_object_with_primitive() {
        let base = map(&[("value", map(&[("nested", true.into())]))]);
        let overlay = map(&[("value", int(42))]);
        assert_eq!(deep_merge(base, overlay), map(&[("value", int(42))]));
    }

    #[test]
    fn test_merge_all() {
        let values = vec![
            map(&[("a", int(1))]),
            map(&[("b", int(2))]),
            map(&[("a", int(3)), ("c", int(4))]),
        ];
        assert_eq!(
            deep_merge_all(values),
            map(&[("a", int(3)), ("b", int(2)), ("c", int(4))])
        );
    }

    #[test]
    fn test_tree_last_writer_wins() {
        let mut tree = SettingsTree::new();
        tree.merge_document("applications.a", &map(&[("x", "default".into())]));
        tree.merge_document("applications.a", &map(&[("x", "override".into())]));
        assert_eq!(tree.len(), 1);
        assert_eq!(
            tree.get("applications.a.x"),
            Some(&SettingValue::from("override"))
        );
    }

    #[test]
    fn test_tree_replaces_mapping_values() {
        let mut tree = SettingsTree::new();
        tree.merge_document(
            "system.core",
            &map(&[(
                "timeouts",
                map(&[("install", int(600)), ("download", int(300))]),
            )]),
        );
        tree.merge_document(
            "system.core",
            &map(&[("timeouts", map(&[("install", int(900))]))]),
        );
        assert_eq!(
            tree.get("system.core.timeouts"),
            Some(&map(&[("install", int(900))]))
        );
        assert!(tree.get("system.core.timeouts.download").is_none());
    }

    #[test]
    fn test_tree_get_descends() {
        let mut tree = SettingsTree::new();
        tree.merge_document(
            "system.core",
            &map(&[("timeouts", map(&[("install", int(60))]))]),
        );
        assert_eq!(
            tree.get("system.core.timeouts.install"),
            Some(&SettingValue::Integer(60))
        );
        assert!(tree.get("system.core.timeouts.nope").is_none());
        assert!(tree.get("system.other").is_none());
    }

    #[test]
    fn test_category_groups() {
        let mut tree = SettingsTree::new();
        tree.merge_document("applications.git", &map(&[("name", "git".into())]));
        tree.merge_document("applications.curl", &map(&[("name", "curl".into())]));
        tree.merge_document("system.core", &map(&[("shell", "zsh".into())]));

        let groups = tree.category_groups(Category::Applications);
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["curl", "git"]);
        assert_eq!(groups["git"]["name"], SettingValue::from("git"));
        assert_eq!(tree.category_groups(Category::Desktop).len(), 0);
    }
}
