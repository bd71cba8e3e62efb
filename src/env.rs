//! Environment variable lookup and key-to-variable name mapping.

use std::collections::HashMap;

/// Source of environment variables.
///
/// Lookups are live: a variable exported after the store was built is seen
/// by the next read.
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed in-memory environment.
#[derive(Debug, Default, Clone)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// Ordered substring replacements applied to derived variable names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvKeyReplacer {
    pairs: Vec<(String, String)>,
}

impl EnvKeyReplacer {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            pairs: vec![(from.into(), to.into())],
        }
    }

    /// Add another replacement, applied after the existing ones.
    pub fn and(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.pairs.push((from.into(), to.into()));
        self
    }

    pub fn apply(&self, name: &str) -> String {
        self.pairs
            .iter()
            .filter(|(from, _)| !from.is_empty())
            .fold(name.to_string(), |acc, (from, to)| acc.replace(from.as_str(), to))
    }
}

/// Derives the variable name an automatically-bound key reads.
///
/// `app.name` with prefix `MYAPP` and replacer `.` → `_` maps to
/// `MYAPP_APP_NAME`. Without a replacer the dot survives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvKeyMapper {
    pub prefix: Option<String>,
    pub replacer: Option<EnvKeyReplacer>,
}

impl EnvKeyMapper {
    pub fn env_name(&self, key: &str) -> String {
        let merged = match self.prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}_{key}"),
            _ => key.to_string(),
        }
        .to_uppercase();
        match &self.replacer {
            Some(replacer) => replacer.apply(&merged),
            None => merged,
        }
    }
}
