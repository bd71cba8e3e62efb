//! Integration tests for layered resolution against real config files.

mod common;

use common::write_file;
use serde::Deserialize;
use std::time::Duration;
use tempfile::TempDir;
use tierconf::{Collaborators, ConfigError, Layer, LoadPolicy, MapEnv, Store, Value, options};

const APP_YAML: &str = r#"
app:
  name: demo
  debug: false
database:
  host: localhost
  port: 5432
  pool:
    max: 10
    timeout: 30s
features:
  - search
  - export
"#;

fn open_yaml(dir: &TempDir, body: &str, env: MapEnv) -> Store {
    let path = write_file(dir, "config.yaml", body);
    Store::open(
        LoadPolicy::from_options([options::with_config_file(&path)]),
        Collaborators::default().with_env(env),
    )
    .expect("Failed to open store")
}

#[test]
fn test_set_beats_file_and_default() {
    let temp = TempDir::new().unwrap();
    let store = open_yaml(&temp, APP_YAML, MapEnv::new());
    store.set_default("database.host", "default-host");

    assert_eq!(store.get_string("database.host"), "localhost");
    store.set("database.host", "runtime-host");
    assert_eq!(store.get_string("database.host"), "runtime-host");
}

#[test]
fn test_default_only_key_is_set() {
    let temp = TempDir::new().unwrap();
    let store = open_yaml(&temp, APP_YAML, MapEnv::new());
    store.set_default("cache.ttl", "5m");

    assert!(store.is_set("cache.ttl"));
    assert_eq!(store.get_duration("cache.ttl"), Duration::from_secs(300));
    assert_eq!(store.lookup("cache.ttl").unwrap().layer, Layer::Default);
    assert!(!store.is_set("cache.size"));
}

#[test]
fn test_priority_env_over_set_over_default() {
    let env = MapEnv::new().with_var("APP_MODE", "env");
    let store = Store::open(LoadPolicy::default(), Collaborators::default().with_env(env)).unwrap();

    store.set_default("mode", "default");
    assert_eq!(store.get_string("mode"), "default");
    store.set("mode", "runtime");
    assert_eq!(store.get_string("mode"), "runtime");
    store.bind_env("mode", "APP_MODE");
    assert_eq!(store.get_string("mode"), "env");
}

#[test]
fn test_bind_env_reads_process_environment() {
    // Unique name so parallel tests never collide.
    let var = "TIERCONF_IT_CUSTOM_TOKEN";
    unsafe {
        std::env::set_var(var, "secret-token-123");
    }

    let temp = TempDir::new().unwrap();
    let store = Store::new([options::with_config_paths([temp.path()])]).unwrap();
    store.bind_env("api.token", var);
    assert_eq!(store.get_string("api.token"), "secret-token-123");
    assert_eq!(store.get_string("API.Token"), "secret-token-123");

    unsafe {
        std::env::remove_var(var);
    }
    assert!(!store.is_set("api.token"));
}

#[test]
fn test_automatic_env_prefix_and_replacer() {
    let env = MapEnv::new()
        .with_var("SVC_DATABASE_PORT", "6543")
        .with_var("SVC_APP_NAME", "");
    let temp = TempDir::new().unwrap();
    let path = write_file(&temp, "config.yaml", APP_YAML);
    let store = Store::open(
        LoadPolicy::from_options([
            options::with_config_file(&path),
            options::with_automatic_env(true),
            options::with_env_prefix("svc"),
            options::with_env_key_replacer(".", "_"),
        ]),
        Collaborators::default().with_env(env),
    )
    .unwrap();

    assert_eq!(store.get_i64("database.port"), 6543);
    assert_eq!(store.lookup("database.port").unwrap().layer, Layer::Environment);
    // Empty variables count as unset.
    assert_eq!(store.get_string("app.name"), "demo");
}

#[test]
fn test_alias_either_direction() {
    let temp = TempDir::new().unwrap();
    let store = open_yaml(&temp, APP_YAML, MapEnv::new());
    store.register_alias("db.addr", "database.host");

    store.set("db.addr", "10.0.0.1");
    assert_eq!(store.get_string("database.host"), "10.0.0.1");

    store.set("database.host", "10.0.0.2");
    assert_eq!(store.get_string("db.addr"), "10.0.0.2");
    assert!(store.is_set("db.addr"));
}

#[test]
fn test_all_keys_never_counts_alias_twice() {
    let temp = TempDir::new().unwrap();
    let store = open_yaml(&temp, APP_YAML, MapEnv::new());
    let before = store.all_keys().len();

    store.register_alias("verbose", "app.debug");
    store.set("verbose", true);
    assert_eq!(store.all_keys().len(), before);

    store.set("extra.key", 1);
    store.set_default("other.key", 2);
    assert_eq!(store.all_keys().len(), before + 2);
    assert!(!store.all_keys().contains(&"verbose".to_string()));
}

#[test]
fn test_all_keys_reflects_file() {
    let temp = TempDir::new().unwrap();
    let store = open_yaml(&temp, APP_YAML, MapEnv::new());
    assert_eq!(
        store.all_keys(),
        vec![
            "app.debug",
            "app.name",
            "database.host",
            "database.pool.max",
            "database.pool.timeout",
            "database.port",
            "features",
        ]
    );
}

#[test]
fn test_sub_scopes_to_prefix() {
    let temp = TempDir::new().unwrap();
    let store = open_yaml(&temp, APP_YAML, MapEnv::new());

    let db = store.sub("database").expect("database is a map");
    assert_eq!(db.get_string("host"), "localhost");
    assert_eq!(db.get_i64("pool.max"), 10);

    // Detached snapshot: neither side sees the other's writes.
    store.set("database.host", "changed");
    db.set("port", 1);
    assert_eq!(db.get_string("host"), "localhost");
    assert_eq!(store.get_i64("database.port"), 5432);
}

#[test]
fn test_write_config_round_trip() {
    let temp = TempDir::new().unwrap();
    let store = open_yaml(&temp, APP_YAML, MapEnv::new());
    store.set("database.port", 7777);
    store.set("app.tags", vec!["a", "b"]);
    store.write_config().unwrap();

    let path = temp.path().join("config.yaml");
    let fresh = Store::new([options::with_config_file(&path)]).unwrap();
    assert_eq!(fresh.get_i64("database.port"), 7777);
    assert_eq!(fresh.get_string_slice("app.tags"), vec!["a", "b"]);
    assert_eq!(fresh.get_string("database.host"), "localhost");
}

#[test]
fn test_write_config_as_other_formats() {
    let temp = TempDir::new().unwrap();
    let store = open_yaml(&temp, APP_YAML, MapEnv::new());

    for name in ["out.json", "out.toml"] {
        let path = temp.path().join(name);
        store.write_config_as(&path).unwrap();
        let fresh = Store::new([options::with_config_file(&path)]).unwrap();
        assert_eq!(fresh.get_string("app.name"), "demo", "{name}");
        assert_eq!(fresh.get_i64("database.pool.max"), 10, "{name}");
    }
}

#[test]
fn test_write_config_as_flat_formats() {
    let temp = TempDir::new().unwrap();
    let store = open_yaml(&temp, APP_YAML, MapEnv::new());
    store.set("app.name", "demo app");

    for name in ["out.env", "out.properties", "out.ini"] {
        let path = temp.path().join(name);
        store.write_config_as(&path).unwrap();
        let fresh = Store::new([options::with_config_file(&path)]).unwrap();
        assert_eq!(fresh.all_keys(), store.all_keys(), "{name}");
        assert_eq!(fresh.get_string("app.name"), "demo app", "{name}");
        assert_eq!(fresh.get_i64("database.pool.max"), 10, "{name}");
        assert_eq!(
            fresh.get_duration("database.pool.timeout"),
            Duration::from_secs(30),
            "{name}"
        );
        assert_eq!(fresh.get_string_slice("features"), vec!["search", "export"], "{name}");
    }
}

#[test]
fn test_toml_datetime_is_a_time() {
    let temp = TempDir::new().unwrap();
    let path = write_file(&temp, "config.toml", "started = 1979-05-27T07:32:00Z\n");
    let store = Store::new([options::with_config_file(&path)]).unwrap();

    assert_eq!(store.all_keys(), vec!["started"]);
    assert_eq!(store.get_time("started").timestamp(), 296638320);
    assert_eq!(store.get_string("started"), "1979-05-27T07:32:00+00:00");
}

#[test]
fn test_unmarshal_camel_case_keys() {
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Db {
        max_connections: u32,
    }
    let temp = TempDir::new().unwrap();
    let store = open_yaml(&temp, "db:\n  maxConnections: 10\n", MapEnv::new());
    let db: Db = store.unmarshal_key("db").unwrap();
    assert_eq!(db.max_connections, 10);
}

#[test]
fn test_safe_write_does_not_clobber() {
    let temp = TempDir::new().unwrap();
    let store = open_yaml(&temp, APP_YAML, MapEnv::new());
    let err = store.safe_write_config().unwrap_err();
    assert!(matches!(err, ConfigError::AlreadyExists(_)));

    let fresh = temp.path().join("fresh.yaml");
    store.safe_write_config_as(&fresh).unwrap();
    assert!(fresh.is_file());
}

#[test]
fn test_search_paths_and_formats() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write_file(&second, "service.toml", "[server]\nport = 9000\n");

    let store = Store::new([
        options::with_config_paths([first.path(), second.path()]),
        options::with_config_name("service"),
    ])
    .unwrap();
    assert_eq!(store.get_i64("server.port"), 9000);
    assert_eq!(
        store.config_file_used(),
        Some(second.path().join("service.toml").as_path())
    );
}

#[test]
fn test_properties_and_ini_files() {
    let temp = TempDir::new().unwrap();
    let props = write_file(&temp, "app.properties", "server.port=8081\nname = demo\n");
    let store = Store::new([options::with_config_file(&props)]).unwrap();
    assert_eq!(store.get_i64("server.port"), 8081);
    assert_eq!(store.get_string("name"), "demo");

    let ini = write_file(&temp, "app.ini", "[server]\nport = 8082\n");
    let store = Store::new([options::with_config_file(&ini)]).unwrap();
    assert_eq!(store.get_i64("server.port"), 8082);
}

#[derive(Debug, Deserialize)]
struct AppConfig {
    app: App,
    database: Database,
    features: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct App {
    name: String,
    debug: bool,
}

#[derive(Debug, Deserialize)]
struct Database {
    host: String,
    port: u16,
    pool: Pool,
}

#[derive(Debug, Deserialize)]
struct Pool {
    max: u32,
    #[serde(with = "tierconf::duration")]
    timeout: Duration,
}

#[test]
fn test_unmarshal_whole_config() {
    let temp = TempDir::new().unwrap();
    let env = MapEnv::new().with_var("DEBUG_FLAG", "true");
    let store = open_yaml(&temp, APP_YAML, env);
    store.bind_env("app.debug", "DEBUG_FLAG");

    let config: AppConfig = store.unmarshal().unwrap();
    assert_eq!(config.app.name, "demo");
    assert!(config.app.debug);
    assert_eq!(config.database.host, "localhost");
    assert_eq!(config.database.port, 5432);
    assert_eq!(config.database.pool.max, 10);
    assert_eq!(config.database.pool.timeout, Duration::from_secs(30));
    assert_eq!(config.features, vec!["search", "export"]);
}

#[test]
fn test_unmarshal_key_missing_uses_serde_defaults() {
    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Cache {
        size: u32,
    }
    let store = Store::default();
    let cache: Cache = store.unmarshal_key("cache").unwrap();
    assert_eq!(cache.size, 0);
}

#[test]
fn test_unmarshal_type_mismatch() {
    let temp = TempDir::new().unwrap();
    let store = open_yaml(&temp, APP_YAML, MapEnv::new());
    let err = store.unmarshal_key::<Database>("app").unwrap_err();
    assert!(matches!(err, ConfigError::Decode(_)));
}

#[test]
fn test_get_returns_merged_map() {
    let temp = TempDir::new().unwrap();
    let store = open_yaml(&temp, APP_YAML, MapEnv::new());
    store.set_default("database.user", "admin");

    let Some(Value::Map(db)) = store.get("database") else {
        panic!("database should resolve to a map");
    };
    assert_eq!(db["host"], Value::from("localhost"));
    assert_eq!(db["user"], Value::from("admin"));
}

#[test]
fn test_malformed_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    let path = write_file(&temp, "config.yaml", "a: [unclosed\n");
    let err = Store::new([options::with_config_file(&path)]).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));

    let (store, err) = Store::open_lenient(
        LoadPolicy::from_options([options::with_config_file(&path)]),
        Collaborators::default(),
    );
    assert!(err.is_some());
    store.set("still", "usable");
    assert_eq!(store.get_string("still"), "usable");
}
