//! Loading policy and the option functions that build it.
//!
//! ```
//! use tierconf::options::{self, LoadPolicy};
//!
//! let policy = LoadPolicy::from_options([
//!     options::with_config_name("app"),
//!     options::with_config_paths([".", "/etc/myapp"]),
//!     options::with_automatic_env(true),
//!     options::with_env_prefix("MYAPP"),
//!     options::with_env_key_replacer(".", "_"),
//! ]);
//! assert_eq!(policy.config_name, "app");
//! ```

use crate::env::{EnvKeyMapper, EnvKeyReplacer};
use crate::format::ConfigFormat;
use crate::notifier::ChangeCallback;
use crate::watcher::ChangeEvent;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default debounce window for file change events.
pub const DEFAULT_WATCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// How a [`crate::Store`] finds its file, reads the environment and reacts
/// to changes. Immutable once a store holds it.
#[derive(Clone)]
pub struct LoadPolicy {
    /// Directories searched in order; first match wins.
    pub search_paths: Vec<PathBuf>,
    /// Base file name without extension.
    pub config_name: String,
    /// Format hint, used for extension-less files and tried first.
    pub config_type: ConfigFormat,
    /// Explicit file, bypassing the search.
    pub config_file: Option<PathBuf>,
    pub watch: bool,
    pub watch_debounce: Duration,
    pub automatic_env: bool,
    pub env_prefix: Option<String>,
    pub env_key_replacer: Option<EnvKeyReplacer>,
    /// Treat set-but-empty variables as present.
    pub allow_empty_env: bool,
    pub on_change: Option<ChangeCallback>,
    pub debug: bool,
}

impl Default for LoadPolicy {
    fn default() -> Self {
        Self {
            search_paths: vec![PathBuf::from("."), PathBuf::from("./config")],
            config_name: "config".to_string(),
            config_type: ConfigFormat::Yaml,
            config_file: None,
            watch: false,
            watch_debounce: DEFAULT_WATCH_DEBOUNCE,
            automatic_env: false,
            env_prefix: None,
            env_key_replacer: None,
            allow_empty_env: false,
            on_change: None,
            debug: false,
        }
    }
}

impl fmt::Debug for LoadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadPolicy")
            .field("search_paths", &self.search_paths)
            .field("config_name", &self.config_name)
            .field("config_type", &self.config_type)
            .field("config_file", &self.config_file)
            .field("watch", &self.watch)
            .field("watch_debounce", &self.watch_debounce)
            .field("automatic_env", &self.automatic_env)
            .field("env_prefix", &self.env_prefix)
            .field("env_key_replacer", &self.env_key_replacer)
            .field("allow_empty_env", &self.allow_empty_env)
            .field("on_change", &self.on_change.as_ref().map(|_| "<callback>"))
            .field("debug", &self.debug)
            .finish()
    }
}

impl LoadPolicy {
    /// Apply options left to right on top of the defaults.
    pub fn from_options(options: impl IntoIterator<Item = ConfigOption>) -> Self {
        options
            .into_iter()
            .fold(Self::default(), |mut policy, option| {
                option.apply(&mut policy);
                policy
            })
    }

    pub(crate) fn env_mapper(&self) -> EnvKeyMapper {
        EnvKeyMapper {
            prefix: self.env_prefix.clone(),
            replacer: self.env_key_replacer.clone(),
        }
    }
}

/// A single named adjustment to a [`LoadPolicy`].
pub struct ConfigOption(Box<dyn FnOnce(&mut LoadPolicy) + Send>);

impl ConfigOption {
    pub fn new(f: impl FnOnce(&mut LoadPolicy) + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn apply(self, policy: &mut LoadPolicy) {
        (self.0)(policy)
    }
}

impl fmt::Debug for ConfigOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConfigOption")
    }
}

/// Replace the search path list.
pub fn with_config_paths<I, P>(paths: I) -> ConfigOption
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let paths: Vec<PathBuf> = paths.into_iter().map(|p| expand_home(p.as_ref())).collect();
    ConfigOption::new(move |policy| policy.search_paths = paths)
}

pub fn with_config_name(name: impl Into<String>) -> ConfigOption {
    let name = name.into();
    ConfigOption::new(move |policy| policy.config_name = name)
}

/// Unknown format names leave the current hint untouched.
pub fn with_config_type(format: &str) -> ConfigOption {
    let parsed = ConfigFormat::from_str(format);
    if parsed.is_none() {
        tracing::warn!(format, "Unknown config type, keeping previous format");
    }
    ConfigOption::new(move |policy| {
        if let Some(format) = parsed {
            policy.config_type = format;
        }
    })
}

pub fn with_config_format(format: ConfigFormat) -> ConfigOption {
    ConfigOption::new(move |policy| policy.config_type = format)
}

/// Read exactly this file instead of searching.
pub fn with_config_file(path: impl AsRef<Path>) -> ConfigOption {
    let path = expand_home(path.as_ref());
    ConfigOption::new(move |policy| policy.config_file = Some(path))
}

pub fn with_watch_config(enabled: bool) -> ConfigOption {
    ConfigOption::new(move |policy| policy.watch = enabled)
}

pub fn with_watch_debounce(window: Duration) -> ConfigOption {
    ConfigOption::new(move |policy| policy.watch_debounce = window)
}

pub fn with_automatic_env(enabled: bool) -> ConfigOption {
    ConfigOption::new(move |policy| policy.automatic_env = enabled)
}

pub fn with_env_prefix(prefix: impl Into<String>) -> ConfigOption {
    let prefix = prefix.into();
    ConfigOption::new(move |policy| {
        policy.env_prefix = (!prefix.is_empty()).then_some(prefix);
    })
}

pub fn with_env_key_replacer(from: impl Into<String>, to: impl Into<String>) -> ConfigOption {
    let replacer = EnvKeyReplacer::new(from, to);
    ConfigOption::new(move |policy| policy.env_key_replacer = Some(replacer))
}

pub fn with_env_replacer(replacer: EnvKeyReplacer) -> ConfigOption {
    ConfigOption::new(move |policy| policy.env_key_replacer = Some(replacer))
}

pub fn with_allow_empty_env(allow: bool) -> ConfigOption {
    ConfigOption::new(move |policy| policy.allow_empty_env = allow)
}

/// The policy-level change callback. Separate from callbacks registered
/// later through [`crate::Store::on_config_change`].
pub fn with_on_config_change<F>(callback: F) -> ConfigOption
where
    F: Fn(&ChangeEvent) + Send + Sync + 'static,
{
    let callback: ChangeCallback = Arc::new(callback);
    ConfigOption::new(move |policy| policy.on_change = Some(callback))
}

pub fn with_debug(enabled: bool) -> ConfigOption {
    ConfigOption::new(move |policy| policy.debug = enabled)
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}
