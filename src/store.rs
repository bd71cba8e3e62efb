//! The layered key-value store.
//!
//! A [`Store`] resolves every key through four layers, highest first:
//!
//! 1. Environment variables (bound keys, or every key under automatic env)
//! 2. Overrides written with [`Store::set`]
//! 3. The config file located by the [`LoadPolicy`]
//! 4. Defaults written with [`Store::set_default`]
//!
//! A non-map value in a higher layer that sits on a key's path shadows the
//! whole subtree below it in lower layers. Map-valued results are deep
//! merged across the layers, so `get("server")` sees `server.port` from the
//! file next to `server.host` from the defaults.
//!
//! `Store` is a cheap handle: clones share the same state. Reads and writes
//! are safe from any thread. The file layer is swapped atomically on reload
//! so readers never observe a half-applied file.

use crate::env::{EnvKeyMapper, EnvSource, ProcessEnv};
use crate::error::{CoerceError, ConfigError, ConfigResult};
use crate::format::ConfigFormat;
use crate::key::{self, Search};
use crate::merge::merge_all;
use crate::notifier::{ChangeCallback, ChangeNotifier, WatchState};
use crate::options::{ConfigOption, LoadPolicy};
use crate::source::{FileSource, FsSource, format_for};
use crate::value::{Table, Value, insensitivise_table};
use crate::watcher::{ChangeEvent, EventSink, FileWatcher, NotifyWatcher, WatchGuard};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Which layer answered a lookup, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Default = 0,
    File = 1,
    Override = 2,
    Environment = 3,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Default => write!(f, "default"),
            Layer::File => write!(f, "file"),
            Layer::Override => write!(f, "override"),
            Layer::Environment => write!(f, "environment"),
        }
    }
}

/// A resolved value and the layer it came from.
///
/// For map values `layer` is the highest layer holding the map; the value
/// itself is merged from every layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub layer: Layer,
    pub value: Value,
}

/// Pluggable I/O used when opening a store.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn FileSource>,
    pub watcher: Arc<dyn FileWatcher>,
    pub env: Arc<dyn EnvSource>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            source: Arc::new(FsSource),
            watcher: Arc::new(NotifyWatcher),
            env: Arc::new(ProcessEnv),
        }
    }
}

impl Collaborators {
    pub fn with_source(mut self, source: impl FileSource + 'static) -> Self {
        self.source = Arc::new(source);
        self
    }

    pub fn with_watcher(mut self, watcher: impl FileWatcher + 'static) -> Self {
        self.watcher = Arc::new(watcher);
        self
    }

    pub fn with_env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Mutable layers. Guarded together so alias moves are atomic.
#[derive(Debug, Default)]
struct Tables {
    overrides: Table,
    defaults: Table,
    /// alias → canonical key
    aliases: HashMap<String, String>,
    /// key → environment variable name
    env_bindings: BTreeMap<String, String>,
}

impl Tables {
    /// Follow alias links to the canonical key.
    fn real_key(&self, key: &str) -> String {
        let mut current = key.to_string();
        for _ in 0..=self.aliases.len() {
            match self.aliases.get(&current) {
                Some(next) => current = next.clone(),
                None => break,
            }
        }
        current
    }
}

struct Inner {
    policy: Arc<LoadPolicy>,
    env_mapper: EnvKeyMapper,
    tables: RwLock<Tables>,
    file: ArcSwap<Table>,
    config_file: Option<PathBuf>,
    file_format: ConfigFormat,
    notifier: ChangeNotifier,
    env: Arc<dyn EnvSource>,
    source: Arc<dyn FileSource>,
    watch_guard: Mutex<Option<Box<dyn WatchGuard>>>,
}

/// Layered configuration store.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Default for Store {
    /// An empty in-memory store reading the process environment.
    fn default() -> Self {
        Self::from_table(Table::new())
    }
}

impl Store {
    // === Construction ===

    /// Build a store from options, using the filesystem and process env.
    ///
    /// A config file that cannot be found is not an error: the store starts
    /// with an empty file layer. Any other load failure is returned.
    pub fn new(options: impl IntoIterator<Item = ConfigOption>) -> ConfigResult<Self> {
        Self::with_policy(LoadPolicy::from_options(options))
    }

    pub fn with_policy(policy: LoadPolicy) -> ConfigResult<Self> {
        Self::open(policy, Collaborators::default())
    }

    pub fn open(policy: LoadPolicy, collaborators: Collaborators) -> ConfigResult<Self> {
        match Self::open_lenient(policy, collaborators) {
            (store, None) => Ok(store),
            (_, Some(e)) => Err(e),
        }
    }

    /// Like [`Store::open`], but always yields a usable store. On a load
    /// error the file layer is empty and the error is returned alongside.
    pub fn open_lenient(
        policy: LoadPolicy,
        collaborators: Collaborators,
    ) -> (Self, Option<ConfigError>) {
        let (file, config_file, format, error) = match collaborators.source.locate(&policy) {
            Ok(path) => {
                let format = format_for(&path, policy.config_type);
                match collaborators.source.read(&path, format) {
                    Ok(table) => {
                        info!("Loaded {} config from {}", format, path.display());
                        (table, Some(path), format, None)
                    }
                    Err(e) => (Table::new(), None, format, Some(e)),
                }
            }
            Err(e) if e.is_not_found() => {
                debug!("{}; continuing without a config file", e);
                (Table::new(), None, policy.config_type, None)
            }
            Err(e) => (Table::new(), None, policy.config_type, Some(e)),
        };

        let watch = policy.watch;
        let store = Self::assemble(policy, &collaborators, file, config_file, format);

        match (&store.inner.config_file, &error) {
            (Some(path), None) if watch => {
                store.start_watch(path.clone(), collaborators.watcher.as_ref());
            }
            (None, None) if watch => {
                warn!("Config watching requested but no config file was loaded");
            }
            _ => {}
        }

        (store, error)
    }

    /// A detached store whose file layer is `table`. No search, no watch,
    /// no environment overlay.
    pub fn from_table(table: Table) -> Self {
        let policy = LoadPolicy::default();
        let format = policy.config_type;
        Self::assemble(policy, &Collaborators::default(), table, None, format)
    }

    fn assemble(
        policy: LoadPolicy,
        collaborators: &Collaborators,
        file: Table,
        config_file: Option<PathBuf>,
        file_format: ConfigFormat,
    ) -> Self {
        let notifier = ChangeNotifier::new(policy.on_change.clone(), policy.debug);
        let env_mapper = policy.env_mapper();
        Self {
            inner: Arc::new(Inner {
                policy: Arc::new(policy),
                env_mapper,
                tables: RwLock::new(Tables::default()),
                file: ArcSwap::from_pointee(insensitivise_table(file)),
                config_file,
                file_format,
                notifier,
                env: Arc::clone(&collaborators.env),
                source: Arc::clone(&collaborators.source),
                watch_guard: Mutex::new(None),
            }),
        }
    }

    fn start_watch(&self, path: PathBuf, watcher: &dyn FileWatcher) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let sink: EventSink = Box::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                Store { inner }.handle_change(&event);
            }
        });

        match watcher.watch(&path, self.inner.policy.watch_debounce, sink) {
            Ok(guard) => {
                *self
                    .inner
                    .watch_guard
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(guard);
                self.inner.notifier.mark_watching(path);
            }
            Err(e) => warn!("Config watching disabled: {}", e),
        }
    }

    /// Reload on writes, then notify. Parse failures keep the old layer.
    fn handle_change(&self, event: &ChangeEvent) {
        if event.requires_reload()
            && let Err(e) = self.reload()
        {
            error!("Failed to reload config: {}. Keeping previous values.", e);
        }
        self.inner.notifier.dispatch(event);
    }

    // === Locks ===

    fn read_tables(&self) -> RwLockReadGuard<'_, Tables> {
        self.inner
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_tables(&self) -> RwLockWriteGuard<'_, Tables> {
        self.inner
            .tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // === Resolution ===

    /// Resolve a key and report the layer that answered.
    pub fn lookup(&self, key: &str) -> Option<Resolved> {
        let tables = self.read_tables();
        let key = tables.real_key(&key::normalize(key));
        let resolved = self.lookup_in(&tables, &key);
        if self.inner.policy.debug {
            match &resolved {
                Some(r) => debug!(key = %key, layer = %r.layer, "Resolved config key"),
                None => debug!(key = %key, "Config key not set"),
            }
        }
        resolved
    }

    fn lookup_in(&self, tables: &Tables, key: &str) -> Option<Resolved> {
        if key.is_empty() {
            return None;
        }
        if let Some(value) = self.env_value(tables, key) {
            return Some(Resolved {
                layer: Layer::Environment,
                value,
            });
        }

        let path = key::segments(key);
        let file = self.inner.file.load();
        let layers = [
            (Layer::Override, &tables.overrides),
            (Layer::File, &**file),
            (Layer::Default, &tables.defaults),
        ];
        for (layer, table) in layers {
            match key::search(table, &path) {
                Search::Found(Value::Map(_)) => {
                    return Some(Resolved {
                        layer,
                        value: Value::Map(self.merged_subtree(tables, &file, key, &path)),
                    });
                }
                Search::Found(value) => {
                    return Some(Resolved {
                        layer,
                        value: value.clone(),
                    });
                }
                Search::Shadowed => return None,
                Search::Missing => {}
            }
        }

        // A parent whose only children are bound env vars.
        let prefix = format!("{key}.");
        let env_children = tables
            .env_bindings
            .keys()
            .any(|bound| bound.starts_with(&prefix) && self.env_value(tables, bound).is_some());
        env_children.then(|| Resolved {
            layer: Layer::Environment,
            value: Value::Map(self.merged_subtree(tables, &file, key, &path)),
        })
    }

    /// Defaults < file < overrides, before any env overlay.
    fn merged_layers(tables: &Tables, file: &Table) -> Table {
        merge_all([
            tables.defaults.clone(),
            file.clone(),
            tables.overrides.clone(),
        ])
    }

    fn merged_subtree(&self, tables: &Tables, file: &Table, key: &str, path: &[String]) -> Table {
        let merged = Self::merged_layers(tables, file);
        let mut subtree = match key::search(&merged, path) {
            Search::Found(Value::Map(table)) => table.clone(),
            _ => Table::new(),
        };

        let mut leaves = Vec::new();
        key::flatten_keys(&subtree, key, &mut leaves);
        let prefix = format!("{key}.");
        leaves.extend(
            tables
                .env_bindings
                .keys()
                .filter(|bound| bound.starts_with(&prefix))
                .cloned(),
        );

        for leaf in leaves {
            if let Some(value) = self.env_value(tables, &leaf) {
                let relative = key::segments(&leaf[prefix.len()..]);
                key::insert(&mut subtree, &relative, value);
            }
        }
        subtree
    }

    /// Environment variable name consulted for `key`, if any.
    fn env_name(&self, tables: &Tables, key: &str) -> Option<String> {
        match tables.env_bindings.get(key) {
            Some(name) => Some(name.clone()),
            None if self.inner.policy.automatic_env => Some(self.inner.env_mapper.env_name(key)),
            None => None,
        }
    }

    fn env_value(&self, tables: &Tables, key: &str) -> Option<Value> {
        let name = self.env_name(tables, key)?;
        let raw = self.inner.env.var(&name)?;
        if raw.is_empty() && !self.inner.policy.allow_empty_env {
            return None;
        }
        Some(Value::String(raw))
    }

    /// Value for `key`, or `None` if no layer sets it.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lookup(key).map(|resolved| resolved.value)
    }

    /// True if any layer holds a value for `key`. Env-enabled keys count
    /// only when the variable is present.
    pub fn is_set(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    // === Writes ===

    /// Set an override. Beats the file and defaults, not the environment.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let mut tables = self.write_tables();
        let key = tables.real_key(&key::normalize(key));
        if key.is_empty() {
            return;
        }
        key::insert(
            &mut tables.overrides,
            &key::segments(&key),
            value.into().insensitivise(),
        );
    }

    /// Set a default, the lowest layer.
    pub fn set_default(&self, key: &str, value: impl Into<Value>) {
        let mut tables = self.write_tables();
        let key = tables.real_key(&key::normalize(key));
        if key.is_empty() {
            return;
        }
        key::insert(
            &mut tables.defaults,
            &key::segments(&key),
            value.into().insensitivise(),
        );
    }

    /// Read `key` from the environment variable `env_name`, used verbatim.
    pub fn bind_env(&self, key: &str, env_name: &str) {
        let mut tables = self.write_tables();
        let key = tables.real_key(&key::normalize(key));
        if key.is_empty() || env_name.is_empty() {
            return;
        }
        tables.env_bindings.insert(key, env_name.to_string());
    }

    /// Read `key` from the variable derived by the prefix and replacer.
    pub fn bind_env_auto(&self, key: &str) {
        let name = self.inner.env_mapper.env_name(&key::normalize(key));
        self.bind_env(key, &name);
    }

    /// Make `alias` another name for `canonical`.
    ///
    /// Values already stored under the alias move to the canonical key
    /// unless it is set in the same layer. Aliases that would form a cycle
    /// are refused.
    pub fn register_alias(&self, alias: &str, canonical: &str) {
        let alias = key::normalize(alias);
        let canonical = key::normalize(canonical);
        if alias.is_empty() || canonical.is_empty() {
            return;
        }

        let mut tables = self.write_tables();
        if alias == canonical || tables.real_key(&canonical) == alias {
            warn!(alias = %alias, canonical = %canonical, "Refusing alias that would create a cycle");
            return;
        }

        let from = key::segments(&alias);
        let to = key::segments(&canonical);
        move_value(&mut tables.overrides, &from, &to);
        move_value(&mut tables.defaults, &from, &to);

        let mut file = (**self.inner.file.load()).clone();
        if move_value(&mut file, &from, &to) {
            self.inner.file.store(Arc::new(file));
        }

        if let Some(name) = tables.env_bindings.remove(&alias) {
            tables.env_bindings.entry(canonical.clone()).or_insert(name);
        }
        tables.aliases.insert(alias, canonical);
    }

    // === Typed getters ===

    fn coerce<T: Default>(&self, key: &str, f: impl FnOnce(&Value) -> Result<T, CoerceError>) -> T {
        self.get(key)
            .and_then(|value| f(&value).ok())
            .unwrap_or_default()
    }

    pub fn get_string(&self, key: &str) -> String {
        self.coerce(key, Value::coerce_string)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.coerce(key, Value::coerce_bool)
    }

    pub fn get_int(&self, key: &str) -> i64 {
        self.get_i64(key)
    }

    pub fn get_i32(&self, key: &str) -> i32 {
        self.coerce(key, |v| {
            v.coerce_i64()
                .and_then(|i| i32::try_from(i).map_err(|_| CoerceError::new("int", "i32")))
        })
    }

    pub fn get_i64(&self, key: &str) -> i64 {
        self.coerce(key, Value::coerce_i64)
    }

    pub fn get_uint(&self, key: &str) -> u64 {
        self.get_u64(key)
    }

    pub fn get_u32(&self, key: &str) -> u32 {
        self.coerce(key, |v| {
            v.coerce_u64()
                .and_then(|u| u32::try_from(u).map_err(|_| CoerceError::new("int", "u32")))
        })
    }

    pub fn get_u64(&self, key: &str) -> u64 {
        self.coerce(key, Value::coerce_u64)
    }

    pub fn get_f64(&self, key: &str) -> f64 {
        self.coerce(key, Value::coerce_f64)
    }

    pub fn get_duration(&self, key: &str) -> Duration {
        self.coerce(key, Value::coerce_duration)
    }

    pub fn get_time(&self, key: &str) -> DateTime<Utc> {
        self.coerce(key, Value::coerce_time)
    }

    pub fn get_string_slice(&self, key: &str) -> Vec<String> {
        self.coerce(key, Value::coerce_string_slice)
    }

    pub fn get_int_slice(&self, key: &str) -> Vec<i64> {
        self.coerce(key, Value::coerce_int_slice)
    }

    pub fn get_string_map(&self, key: &str) -> Table {
        self.coerce(key, Value::coerce_string_map)
    }

    pub fn get_string_map_string(&self, key: &str) -> BTreeMap<String, String> {
        self.coerce(key, Value::coerce_string_map_string)
    }

    pub fn get_string_map_string_slice(&self, key: &str) -> BTreeMap<String, Vec<String>> {
        self.coerce(key, Value::coerce_string_map_string_slice)
    }

    // === Snapshots ===

    /// Every key visible in any layer, sorted. Includes env-bound keys.
    pub fn all_keys(&self) -> Vec<String> {
        let tables = self.read_tables();
        let file = self.inner.file.load();
        let merged = Self::merged_layers(&tables, &file);

        let mut leaves = Vec::new();
        key::flatten_keys(&merged, "", &mut leaves);
        let mut keys: BTreeSet<String> = leaves.into_iter().collect();

        for bound in tables.env_bindings.keys() {
            if key::search(&merged, &key::segments(bound)) != Search::Shadowed {
                keys.insert(bound.clone());
            }
        }
        keys.into_iter().collect()
    }

    /// Every resolved setting as a nested table.
    pub fn all_settings(&self) -> Table {
        let mut settings = Table::new();
        for key in self.all_keys() {
            if let Some(value) = self.get(&key) {
                key::insert(&mut settings, &key::segments(&key), value);
            }
        }
        settings
    }

    /// Decode every setting into `T`.
    pub fn unmarshal<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        Ok(T::deserialize(Value::Map(self.all_settings()))?)
    }

    /// Decode the subtree (or scalar) at `key` into `T`. A missing key
    /// decodes from an empty map.
    pub fn unmarshal_key<T: DeserializeOwned>(&self, key: &str) -> ConfigResult<T> {
        let value = self.get(key).unwrap_or_else(|| Value::Map(Table::new()));
        Ok(T::deserialize(value)?)
    }

    /// A detached store rooted at `prefix`. `None` unless `prefix`
    /// resolves to a map. Later changes to either store are not shared.
    pub fn sub(&self, prefix: &str) -> Option<Store> {
        match self.get(prefix)? {
            Value::Map(table) => Some(Store::from_table(table)),
            _ => None,
        }
    }

    // === File I/O ===

    /// Re-read the loaded config file and swap it in.
    pub fn reload(&self) -> ConfigResult<()> {
        let Some(ref path) = self.inner.config_file else {
            return Err(ConfigError::NotFound {
                name: self.inner.policy.config_name.clone(),
                searched: self.inner.policy.search_paths.clone(),
            });
        };
        let mut table = insensitivise_table(self.inner.source.read(path, self.inner.file_format)?);

        let tables = self.read_tables();
        for (alias, canonical) in &tables.aliases {
            move_value(&mut table, &key::segments(alias), &key::segments(canonical));
        }
        self.inner.file.store(Arc::new(table));
        info!("Reloaded config from {}", path.display());
        Ok(())
    }

    /// Path of the loaded config file, if one was found.
    pub fn config_file_used(&self) -> Option<&Path> {
        self.inner.config_file.as_deref()
    }

    /// Write all settings over the loaded config file. With no file
    /// loaded, writes `<first search path>/<name>.<ext>`.
    pub fn write_config(&self) -> ConfigResult<()> {
        self.write_to(&self.write_target(), false)
    }

    /// Like [`Store::write_config`] but refuses to overwrite.
    pub fn safe_write_config(&self) -> ConfigResult<()> {
        self.write_to(&self.write_target(), true)
    }

    /// Write all settings to `path`, format chosen by its extension.
    pub fn write_config_as(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        self.write_to(path.as_ref(), false)
    }

    pub fn safe_write_config_as(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        self.write_to(path.as_ref(), true)
    }

    fn write_target(&self) -> PathBuf {
        if let Some(ref path) = self.inner.config_file {
            return path.clone();
        }
        let policy = &self.inner.policy;
        let dir = policy
            .search_paths
            .first()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("."));
        dir.join(format!(
            "{}.{}",
            policy.config_name,
            policy.config_type.extension()
        ))
    }

    fn write_to(&self, path: &Path, safe: bool) -> ConfigResult<()> {
        let format = format_for(path, self.inner.policy.config_type);
        let text = format.serialize(path, &self.all_settings())?;

        if safe {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::AlreadyExists => ConfigError::AlreadyExists(path.to_path_buf()),
                    _ => ConfigError::write(path, e),
                })?;
            file.write_all(text.as_bytes())
                .map_err(|e| ConfigError::write(path, e))?;
        } else {
            std::fs::write(path, text).map_err(|e| ConfigError::write(path, e))?;
        }
        info!("Wrote {} config to {}", format, path.display());
        Ok(())
    }

    // === Change notification ===

    /// Register a callback for config file changes. Callbacks are
    /// additive and cannot be removed.
    pub fn on_config_change<F>(&self, callback: F)
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let callback: ChangeCallback = Arc::new(callback);
        self.inner.notifier.register(callback);
    }

    /// Receive config file change events on a channel.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.notifier.subscribe()
    }

    pub fn watch_state(&self) -> WatchState {
        self.inner.notifier.state()
    }

    /// Join outstanding change callbacks. Returns how many panicked.
    pub fn wait_for_callbacks(&self) -> usize {
        self.inner.notifier.wait_for_callbacks()
    }

    pub fn policy(&self) -> &LoadPolicy {
        &self.inner.policy
    }

    // === Diagnostics ===

    /// Human-readable dump of every layer.
    pub fn debug_report(&self) -> String {
        let tables = self.read_tables();
        let file = self.inner.file.load();
        let file_label = self
            .inner
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".to_string());
        format!(
            "Aliases:\n{:#?}\nOverride:\n{:#?}\nFile ({}):\n{:#?}\nEnv bindings:\n{:#?}\nDefaults:\n{:#?}\n",
            tables.aliases, tables.overrides, file_label, **file, tables.env_bindings, tables.defaults,
        )
    }

    /// Log [`Store::debug_report`] at info level.
    pub fn debug(&self) {
        info!("{}", self.debug_report());
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("config_file", &self.inner.config_file)
            .field("policy", &self.inner.policy)
            .field("notifier", &self.inner.notifier)
            .finish()
    }
}

/// Move the value at `from` to `to` unless `to` is already set. Returns
/// whether `from` held a value.
fn move_value(table: &mut Table, from: &[String], to: &[String]) -> bool {
    let Some(value) = key::remove(table, from) else {
        return false;
    };
    if matches!(key::search(table, to), Search::Missing) {
        key::insert(table, to, value);
    }
    true
}
