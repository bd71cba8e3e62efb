//! Process-wide store.
//!
//! Explicit [`Store`] handles are the primary API. This module is a thin
//! façade for applications that want one shared configuration without
//! threading a handle everywhere:
//!
//! ```no_run
//! use tierconf::{global, options};
//!
//! global::init([options::with_config_name("app"), options::with_automatic_env(true)])?;
//! let port = global::get_u32("server.port");
//! # Ok::<(), tierconf::ConfigError>(())
//! ```
//!
//! [`init`] runs once; later calls return the first result. A failed
//! first `init` still installs a store (defaults, overrides and env keep
//! working) so the façade never panics. [`init_with_config`] replaces the
//! instance on success and leaves it alone on failure.

use crate::error::ConfigResult;
use crate::options::{ConfigOption, LoadPolicy};
use crate::store::{Collaborators, Store};
use crate::value::{Table, Value};
use crate::watcher::ChangeEvent;
use arc_swap::ArcSwapOption;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::warn;

static INSTANCE: ArcSwapOption<Store> = ArcSwapOption::const_empty();

/// Result of the first `init`, once it has run.
static INIT: Mutex<Option<ConfigResult<()>>> = Mutex::new(None);

fn install_from(policy: LoadPolicy, slot: &mut Option<ConfigResult<()>>) -> Arc<Store> {
    let (store, error) = Store::open_lenient(policy, Collaborators::default());
    let store = Arc::new(store);
    INSTANCE.store(Some(Arc::clone(&store)));

    let result = match error {
        Some(e) => {
            warn!("Global config loaded without its file: {}", e);
            Err(e)
        }
        None => Ok(()),
    };
    *slot = Some(result);
    store
}

/// Build and install the global store. Only the first call has any
/// effect; every call returns the first call's result.
pub fn init(options: impl IntoIterator<Item = ConfigOption>) -> ConfigResult<()> {
    let mut slot = INIT.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(ref result) = *slot {
        return result.clone();
    }
    install_from(LoadPolicy::from_options(options), &mut slot);
    slot.clone().unwrap_or(Ok(()))
}

/// Build a store and swap it in, regardless of earlier `init` calls. On
/// error the current instance is kept.
pub fn init_with_config(options: impl IntoIterator<Item = ConfigOption>) -> ConfigResult<()> {
    let mut slot = INIT.lock().unwrap_or_else(PoisonError::into_inner);
    let store = Store::new(options)?;
    INSTANCE.store(Some(Arc::new(store)));
    slot.get_or_insert(Ok(()));
    Ok(())
}

/// Install a caller-built store as the global instance.
pub fn install(store: Store) {
    let mut slot = INIT.lock().unwrap_or_else(PoisonError::into_inner);
    INSTANCE.store(Some(Arc::new(store)));
    slot.get_or_insert(Ok(()));
}

/// The global store, initialised with default options on first use.
pub fn instance() -> Arc<Store> {
    if let Some(store) = INSTANCE.load_full() {
        return store;
    }
    let mut slot = INIT.lock().unwrap_or_else(PoisonError::into_inner);
    match INSTANCE.load_full() {
        Some(store) => store,
        None => install_from(LoadPolicy::default(), &mut slot),
    }
}

#[cfg(test)]
pub(crate) fn reset() {
    let mut slot = INIT.lock().unwrap_or_else(PoisonError::into_inner);
    INSTANCE.store(None);
    *slot = None;
}

pub fn get(key: &str) -> Option<Value> {
    instance().get(key)
}

pub fn get_string(key: &str) -> String {
    instance().get_string(key)
}

pub fn get_bool(key: &str) -> bool {
    instance().get_bool(key)
}

pub fn get_int(key: &str) -> i64 {
    instance().get_int(key)
}

pub fn get_i32(key: &str) -> i32 {
    instance().get_i32(key)
}

pub fn get_i64(key: &str) -> i64 {
    instance().get_i64(key)
}

pub fn get_uint(key: &str) -> u64 {
    instance().get_uint(key)
}

pub fn get_u32(key: &str) -> u32 {
    instance().get_u32(key)
}

pub fn get_u64(key: &str) -> u64 {
    instance().get_u64(key)
}

pub fn get_f64(key: &str) -> f64 {
    instance().get_f64(key)
}

pub fn get_duration(key: &str) -> Duration {
    instance().get_duration(key)
}

pub fn get_string_slice(key: &str) -> Vec<String> {
    instance().get_string_slice(key)
}

pub fn get_string_map(key: &str) -> Table {
    instance().get_string_map(key)
}

pub fn get_string_map_string(key: &str) -> BTreeMap<String, String> {
    instance().get_string_map_string(key)
}

pub fn set(key: &str, value: impl Into<Value>) {
    instance().set(key, value)
}

pub fn set_default(key: &str, value: impl Into<Value>) {
    instance().set_default(key, value)
}

pub fn is_set(key: &str) -> bool {
    instance().is_set(key)
}

pub fn bind_env(key: &str, env_name: &str) {
    instance().bind_env(key, env_name)
}

pub fn register_alias(alias: &str, canonical: &str) {
    instance().register_alias(alias, canonical)
}

pub fn all_keys() -> Vec<String> {
    instance().all_keys()
}

pub fn all_settings() -> Table {
    instance().all_settings()
}

pub fn unmarshal<T: DeserializeOwned>() -> ConfigResult<T> {
    instance().unmarshal()
}

pub fn unmarshal_key<T: DeserializeOwned>(key: &str) -> ConfigResult<T> {
    instance().unmarshal_key(key)
}

pub fn write_config() -> ConfigResult<()> {
    instance().write_config()
}

pub fn config_file_used() -> Option<PathBuf> {
    instance().config_file_used().map(PathBuf::from)
}

pub fn on_config_change<F>(callback: F)
where
    F: Fn(&ChangeEvent) + Send + Sync + 'static,
{
    instance().on_config_change(callback)
}

pub fn debug() {
    instance().debug()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::options;
    use tempfile::TempDir;

    /// The registry is process-wide; serialise tests that touch it.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn locked() -> std::sync::MutexGuard<'static, ()> {
        let guard = TEST_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        reset();
        guard
    }

    fn yaml_file(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_init_runs_once() {
        let _guard = locked();
        let temp = TempDir::new().unwrap();
        let good = yaml_file(&temp, "good.yaml", "name: first\n");

        init([options::with_config_file(&good)]).unwrap();
        assert_eq!(get_string("name"), "first");

        let other = yaml_file(&temp, "other.yaml", "name: second\n");
        init([options::with_config_file(&other)]).unwrap();
        assert_eq!(get_string("name"), "first");
        assert_eq!(config_file_used(), Some(good));
    }

    #[test]
    fn test_failed_init_is_sticky_but_usable() {
        let _guard = locked();
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.yaml");

        let first = init([options::with_config_file(&missing)]).unwrap_err();
        assert!(matches!(first, ConfigError::Io { .. }));

        let good = yaml_file(&temp, "good.yaml", "a: 1\n");
        let second = init([options::with_config_file(&good)]).unwrap_err();
        assert!(matches!(second, ConfigError::Io { .. }));

        set("k", "v");
        assert_eq!(get_string("k"), "v");
    }

    #[test]
    fn test_init_with_config_replaces() {
        let _guard = locked();
        let temp = TempDir::new().unwrap();
        let first = yaml_file(&temp, "first.yaml", "level: info\n");
        let second = yaml_file(&temp, "second.yaml", "level: debug\n");

        init([options::with_config_file(&first)]).unwrap();
        init_with_config([options::with_config_file(&second)]).unwrap();
        assert_eq!(get_string("level"), "debug");

        let bad = yaml_file(&temp, "bad.json", "{ nope");
        assert!(init_with_config([options::with_config_file(&bad)]).is_err());
        assert_eq!(get_string("level"), "debug");
    }

    #[test]
    fn test_init_with_config_satisfies_init() {
        let _guard = locked();
        let temp = TempDir::new().unwrap();
        let path = yaml_file(&temp, "app.yaml", "x: 1\n");
        init_with_config([options::with_config_file(&path)]).unwrap();

        let missing = temp.path().join("missing.yaml");
        init([options::with_config_file(&missing)]).unwrap();
        assert_eq!(get_i64("x"), 1);
    }

    #[test]
    fn test_install_and_delegations() {
        let _guard = locked();
        let store = Store::default();
        store.set_default("server.port", 8080);
        install(store);

        assert_eq!(get_u32("server.port"), 8080);
        set("server.port", "9090");
        assert_eq!(get_int("server.port"), 9090);
        assert!(is_set("server.port"));

        register_alias("port", "server.port");
        assert_eq!(get_u64("port"), 9090);
        assert_eq!(all_keys(), vec!["server.port"]);

        #[derive(serde::Deserialize)]
        struct Server {
            port: u16,
        }
        let server: Server = unmarshal_key("server").unwrap();
        assert_eq!(server.port, 9090);
    }

    #[test]
    fn test_instance_lazily_initialises() {
        let _guard = locked();
        set_default("lazy", true);
        assert!(get_bool("lazy"));
        assert!(Arc::ptr_eq(&instance(), &instance()));
    }
}
