//! Layered configuration.
//!
//! A [`Store`] merges four sources into one view of dot-separated,
//! case-insensitive keys: environment variables, explicit overrides, a
//! config file (YAML, JSON, TOML, properties, env or INI) and registered
//! defaults. Values come back through typed getters, serde decoding or
//! detached sub-stores, and the file can be watched for changes.
//!
//! ```no_run
//! use tierconf::{Store, options};
//!
//! let store = Store::new([
//!     options::with_config_name("app"),
//!     options::with_config_paths(["/etc/app", "."]),
//!     options::with_automatic_env(true),
//!     options::with_env_prefix("app"),
//!     options::with_env_key_replacer(".", "_"),
//! ])?;
//! store.set_default("server.port", 8080);
//!
//! // APP_SERVER_PORT beats the file, which beats the default.
//! let port = store.get_u32("server.port");
//! # Ok::<(), tierconf::ConfigError>(())
//! ```

pub mod cli;
pub mod de;
pub mod duration;
pub mod env;
pub mod error;
pub mod format;
pub mod global;
pub mod key;
pub mod logging;
pub mod merge;
pub mod notifier;
pub mod options;
pub mod source;
pub mod store;
pub mod value;
pub mod watcher;

pub use env::{EnvKeyReplacer, EnvSource, MapEnv, ProcessEnv};
pub use error::{CoerceError, ConfigError, ConfigResult, DecodeError};
pub use format::ConfigFormat;
pub use notifier::{ChangeCallback, WatchState};
pub use options::{ConfigOption, LoadPolicy};
pub use source::{FileSource, FsSource};
pub use store::{Collaborators, Layer, Resolved, Store};
pub use value::{Table, Value};
pub use watcher::{ChangeEvent, ChangeOp, EventSink, FileWatcher, NotifyWatcher, WatchGuard};
