//! Generic value tree produced by parsing a YAML fragment.
//!
//! YAML documents are converted into a small closed set of variants so the
//! rest of the engine never has to inspect `serde_yaml::Value` directly.
//! Nulls mean "not specified" and are dropped during conversion.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node in the settings tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<SettingValue>),
    Map(BTreeMap<String, SettingValue>),
}

impl SettingValue {
    /// Convert a parsed YAML value. Returns `None` for null.
    pub fn from_yaml(value: serde_yaml::Value) -> Option<Self> {
        use serde_yaml::Value as Yaml;

        match value {
            Yaml::Null => None,
            Yaml::Bool(b) => Some(SettingValue::Bool(b)),
            Yaml::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(SettingValue::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    Some(SettingValue::Float(f))
                } else {
                    // u64 beyond i64::MAX
                    Some(SettingValue::String(n.to_string()))
                }
            }
            Yaml::String(s) => Some(SettingValue::String(s)),
            Yaml::Sequence(items) => Some(SettingValue::List(
                items.into_iter().filter_map(SettingValue::from_yaml).collect(),
            )),
            Yaml::Mapping(mapping) => {
                let mut map = BTreeMap::new();
                for (key, value) in mapping {
                    let Some(key) = yaml_key_to_string(&key) else {
                        continue;
                    };
                    if let Some(value) = SettingValue::from_yaml(value) {
                        map.insert(key, value);
                    }
                }
                Some(SettingValue::Map(map))
            }
            Yaml::Tagged(tagged) => SettingValue::from_yaml(tagged.value),
        }
    }

    /// Short name of the variant, used in validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SettingValue::Bool(_) => "boolean",
            SettingValue::Integer(_) | SettingValue::Float(_) => "number",
            SettingValue::String(_) => "string",
            SettingValue::List(_) => "list",
            SettingValue::Map(_) => "mapping",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SettingValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, SettingValue>> {
        match self {
            SettingValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SettingValue]> {
        match self {
            SettingValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a child of a mapping.
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Descend through nested mappings along a dotted path.
    pub fn get_path(&self, dotted: &str) -> Option<&SettingValue> {
        if dotted.is_empty() {
            return Some(self);
        }
        dotted.split('.').try_fold(self, |node, part| node.get(part))
    }

    /// True for empty strings, lists and mappings.
    pub fn is_empty(&self) -> bool {
        match self {
            SettingValue::String(s) => s.trim().is_empty(),
            SettingValue::List(items) => items.is_empty(),
            SettingValue::Map(map) => map.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        SettingValue::String(s.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(s: String) -> Self {
        SettingValue::String(s)
    }
}

impl From<i64> for SettingValue {
    fn from(i: i64) -> Self {
        SettingValue::Integer(i)
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        SettingValue::Bool(b)
    }
}

/// Mapping keys must be scalars; anything else is dropped.
fn yaml_key_to_string(key: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Bool(b) => Some(b.to_string()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Tagged(tagged) => yaml_key_to_string(&tagged.value),
        _ => None,
    }
}
