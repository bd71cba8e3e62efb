//! Config file formats: detection, parsing and serialization.
//!
//! Structured formats go through their serde crates and env files through
//! `dotenvy`. Java properties and INI are read line by line. In all three
//! flat formats a dotted key names a nested path and a JSON array value
//! (`tags=["a","b"]`) is read back as a list.

use crate::error::ConfigError;
use crate::key;
use crate::value::{Table, Value};
use std::fmt;
use std::path::Path;

/// File format of a config source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    #[default]
    Yaml,
    Json,
    Toml,
    Properties,
    Env,
    Ini,
    Hcl,
}

impl ConfigFormat {
    /// Every format, in search order.
    pub const ALL: [ConfigFormat; 7] = [
        ConfigFormat::Yaml,
        ConfigFormat::Json,
        ConfigFormat::Toml,
        ConfigFormat::Properties,
        ConfigFormat::Env,
        ConfigFormat::Ini,
        ConfigFormat::Hcl,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim_start_matches('.').to_lowercase().as_str() {
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            "toml" => Some(ConfigFormat::Toml),
            "properties" | "props" | "prop" => Some(ConfigFormat::Properties),
            "env" | "dotenv" => Some(ConfigFormat::Env),
            "ini" => Some(ConfigFormat::Ini),
            "hcl" | "tfvars" => Some(ConfigFormat::Hcl),
            _ => None,
        }
    }

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
    }

    /// File extensions recognised for this format; the first is canonical.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ConfigFormat::Yaml => &["yaml", "yml"],
            ConfigFormat::Json => &["json"],
            ConfigFormat::Toml => &["toml"],
            ConfigFormat::Properties => &["properties", "props", "prop"],
            ConfigFormat::Env => &["env", "dotenv"],
            ConfigFormat::Ini => &["ini"],
            ConfigFormat::Hcl => &["hcl", "tfvars"],
        }
    }

    pub fn extension(&self) -> &'static str {
        self.extensions()[0]
    }

    /// Parse file contents into a lowercase-keyed table.
    pub fn parse(&self, path: &Path, content: &str) -> Result<Table, ConfigError> {
        let parse_err = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format: *self,
            message,
        };

        let root: Value = match self {
            ConfigFormat::Yaml => {
                if content.trim().is_empty() {
                    return Ok(Table::new());
                }
                serde_yaml::from_str::<serde_json::Value>(content)
                    .map(Value::from)
                    .map_err(|e| parse_err(e.to_string()))?
            }
            ConfigFormat::Json => serde_json::from_str::<serde_json::Value>(content)
                .map(Value::from)
                .map_err(|e| parse_err(e.to_string()))?,
            ConfigFormat::Toml => content
                .parse::<toml::Table>()
                .map(|table| Value::from(toml::Value::Table(table)))
                .map_err(|e| parse_err(e.to_string()))?,
            ConfigFormat::Properties => Value::Map(parse_flat(content, None).map_err(parse_err)?),
            ConfigFormat::Env => Value::Map(parse_env(content).map_err(parse_err)?),
            ConfigFormat::Ini => Value::Map(parse_flat(content, Some('[')).map_err(parse_err)?),
            ConfigFormat::Hcl => return Err(ConfigError::UnsupportedFormat(self.to_string())),
        };

        match root.insensitivise() {
            Value::Map(table) => Ok(table),
            Value::Nil => Ok(Table::new()),
            other => Err(parse_err(format!(
                "top level must be a mapping, found {}",
                other.kind()
            ))),
        }
    }

    /// Serialize a settings snapshot in this format.
    pub fn serialize(&self, path: &Path, settings: &Table) -> Result<String, ConfigError> {
        match self {
            ConfigFormat::Yaml => {
                serde_yaml::to_string(settings).map_err(|e| ConfigError::write(path, e))
            }
            ConfigFormat::Json => {
                serde_json::to_string_pretty(settings).map_err(|e| ConfigError::write(path, e))
            }
            ConfigFormat::Toml => {
                toml::to_string_pretty(settings).map_err(|e| ConfigError::write(path, e))
            }
            ConfigFormat::Properties => write_flat(path, settings, "=", false),
            ConfigFormat::Env => write_flat(path, settings, "=", true),
            ConfigFormat::Ini => write_ini(path, settings),
            ConfigFormat::Hcl => Err(ConfigError::UnsupportedFormat(self.to_string())),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Parse `key=value` / `key: value` lines. With `section` set, `[name]`
/// headers prefix the following keys.
fn parse_flat(content: &str, section: Option<char>) -> Result<Table, String> {
    let mut table = Table::new();
    let mut prefix = String::new();

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') || line.starts_with('!') {
            continue;
        }
        if section.is_some() && line.starts_with('[') {
            let name = line
                .strip_prefix('[')
                .and_then(|l| l.strip_suffix(']'))
                .ok_or_else(|| format!("line {}: unterminated section header", lineno + 1))?;
            prefix = key::normalize(name);
            continue;
        }
        let split = line
            .find(['=', ':'])
            .ok_or_else(|| format!("line {}: expected key=value", lineno + 1))?;
        let (k, v) = line.split_at(split);
        let v = unquote(v[1..].trim());
        let full = if prefix.is_empty() {
            key::normalize(k)
        } else {
            format!("{}.{}", prefix, key::normalize(k))
        };
        if full.is_empty() {
            return Err(format!("line {}: empty key", lineno + 1));
        }
        key::insert(&mut table, &key::segments(&full), flat_value(v.to_string()));
    }

    Ok(table)
}

/// Parse a dotenv file. `$VAR` references are expanded by `dotenvy` from
/// earlier lines and the process environment.
fn parse_env(content: &str) -> Result<Table, String> {
    let mut table = Table::new();
    for item in dotenvy::from_read_iter(content.as_bytes()) {
        let (name, raw) = item.map_err(|e| e.to_string())?;
        let full = key::normalize(&name);
        if full.is_empty() {
            continue;
        }
        key::insert(&mut table, &key::segments(&full), flat_value(raw));
    }
    Ok(table)
}

fn unquote(v: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = v.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner;
        }
    }
    v
}

/// A JSON array becomes a list; everything else stays text.
fn flat_value(raw: String) -> Value {
    let trimmed = raw.trim();
    if trimmed.starts_with('[')
        && trimmed.ends_with(']')
        && let Ok(list @ serde_json::Value::Array(_)) =
            serde_json::from_str::<serde_json::Value>(trimmed)
    {
        return Value::from(list);
    }
    Value::String(raw)
}

/// Inverse of [`flat_value`]. Lines cannot hold newlines outside env quoting.
fn render_flat(path: &Path, name: &str, value: &Value, env: bool) -> Result<String, ConfigError> {
    let text = match value {
        Value::List(_) => serde_json::to_string(value).map_err(|e| ConfigError::write(path, e))?,
        other => other.to_string(),
    };
    if env {
        return Ok(env_quote(&text));
    }
    if text.contains('\n') {
        return Err(ConfigError::write(
            path,
            format!("{name}: multi-line values cannot be written as properties or ini"),
        ));
    }
    Ok(text)
}

fn env_quote(text: &str) -> String {
    let bare = text
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_-./:@+,".contains(c));
    if bare {
        text.to_string()
    } else if !text.contains(['\'', '\n']) {
        format!("'{text}'")
    } else {
        let mut quoted = String::with_capacity(text.len() + 2);
        quoted.push('"');
        for c in text.chars() {
            match c {
                '\\' | '"' | '$' => {
                    quoted.push('\\');
                    quoted.push(c);
                }
                '\n' => quoted.push_str("\\n"),
                _ => quoted.push(c),
            }
        }
        quoted.push('"');
        quoted
    }
}

/// Env files keep the dots so keys read back to the same path.
fn write_flat(path: &Path, settings: &Table, sep: &str, env: bool) -> Result<String, ConfigError> {
    let mut keys = Vec::new();
    key::flatten_keys(settings, "", &mut keys);
    let mut out = String::new();
    for k in keys {
        let value = match key::search(settings, &key::segments(&k)) {
            key::Search::Found(Value::Map(_)) => continue,
            key::Search::Found(v) => render_flat(path, &k, v, env)?,
            _ => continue,
        };
        let name = if env { k.to_uppercase() } else { k };
        out.push_str(&format!("{name}{sep}{value}\n"));
    }
    Ok(out)
}

fn write_ini(path: &Path, settings: &Table) -> Result<String, ConfigError> {
    let mut out = String::new();
    let (sections, top): (Vec<_>, Vec<_>) = settings
        .iter()
        .partition(|(_, v)| matches!(v, Value::Map(m) if !m.is_empty()));

    for (k, v) in top {
        if matches!(v, Value::Map(_) | Value::Nil) {
            continue;
        }
        out.push_str(&format!("{k} = {}\n", render_flat(path, k, v, false)?));
    }
    for (name, section) in sections {
        if let Value::Map(table) = section {
            out.push_str(&format!("\n[{name}]\n"));
            out.push_str(&write_flat(path, table, " = ", false)?);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn p() -> PathBuf {
        PathBuf::from("test")
    }

    #[test]
    fn test_from_str_aliases() {
        assert_eq!(ConfigFormat::from_str("yml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_str(".JSON"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_str("dotenv"), Some(ConfigFormat::Env));
        assert_eq!(ConfigFormat::from_str("xml"), None);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("conf/app.toml")),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(ConfigFormat::from_path(Path::new("conf/app")), None);
    }

    #[test]
    fn test_parse_yaml_lowercases_keys() {
        let table = ConfigFormat::Yaml
            .parse(&p(), "Server:\n  Port: 8080\n  Host: localhost\n")
            .unwrap();
        let server = table["server"].as_map().unwrap();
        assert_eq!(server["port"], Value::Int(8080));
        assert_eq!(server["host"], Value::from("localhost"));
    }

    #[test]
    fn test_parse_empty_yaml() {
        assert!(ConfigFormat::Yaml.parse(&p(), "   \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_toml() {
        let table = ConfigFormat::Toml
            .parse(&p(), "debug = true\n[database]\nport = 5432\n")
            .unwrap();
        assert_eq!(table["debug"], Value::Bool(true));
        assert_eq!(table["database"].as_map().unwrap()["port"], Value::Int(5432));
    }

    #[test]
    fn test_parse_properties() {
        let table = ConfigFormat::Properties
            .parse(&p(), "# comment\napp.name = demo\napp.port: 80\n")
            .unwrap();
        let app = table["app"].as_map().unwrap();
        assert_eq!(app["name"], Value::from("demo"));
        assert_eq!(app["port"], Value::from("80"));
    }

    #[test]
    fn test_parse_env_file() {
        let table = ConfigFormat::Env
            .parse(&p(), "export TOKEN=\"abc\"\nDEBUG=1 # inline\nAPP.NAME='demo app'\n")
            .unwrap();
        assert_eq!(table["token"], Value::from("abc"));
        assert_eq!(table["debug"], Value::from("1"));
        assert_eq!(table["app"].as_map().unwrap()["name"], Value::from("demo app"));
    }

    #[test]
    fn test_parse_env_escapes_and_multiline() {
        let table = ConfigFormat::Env
            .parse(&p(), "GREETING=\"say \\\"hi\\\"\"\nMOTD=\"line one\nline two\"\n")
            .unwrap();
        assert_eq!(table["greeting"], Value::from("say \"hi\""));
        assert_eq!(table["motd"], Value::from("line one\nline two"));
    }

    #[test]
    fn test_parse_env_error_is_parse_error() {
        let err = ConfigFormat::Env.parse(&p(), "NOT A VALID LINE\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: ConfigFormat::Env, .. }));
    }

    #[test]
    fn test_flat_json_array_is_a_list() {
        let table = ConfigFormat::Properties
            .parse(&p(), "tags=[\"a\",\"b\"]\nnote=[not json\n")
            .unwrap();
        assert_eq!(table["tags"], Value::from(vec!["a", "b"]));
        assert_eq!(table["note"], Value::from("[not json"));
    }

    #[test]
    fn test_parse_ini_sections() {
        let table = ConfigFormat::Ini
            .parse(&p(), "top = 1\n[Database]\nhost = db\n")
            .unwrap();
        assert_eq!(table["top"], Value::from("1"));
        assert_eq!(table["database"].as_map().unwrap()["host"], Value::from("db"));
    }

    #[test]
    fn test_parse_error_carries_format() {
        let err = ConfigFormat::Json.parse(&p(), "{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: ConfigFormat::Json, .. }));
    }

    #[test]
    fn test_top_level_scalar_rejected() {
        let err = ConfigFormat::Yaml.parse(&p(), "just a string").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_hcl_unsupported() {
        let err = ConfigFormat::Hcl.parse(&p(), "a = 1").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_serialize_yaml_reparses() {
        let mut settings = Table::new();
        key::insert(&mut settings, &key::segments("app.name"), Value::from("demo"));
        key::insert(&mut settings, &key::segments("app.port"), Value::Int(8080));
        let text = ConfigFormat::Yaml.serialize(&p(), &settings).unwrap();
        let parsed = ConfigFormat::Yaml.parse(&p(), &text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_parse_toml_datetimes() {
        let table = ConfigFormat::Toml
            .parse(&p(), "started = 1979-05-27T07:32:00Z\nbirthday = 1979-05-27\n")
            .unwrap();
        match &table["started"] {
            Value::Time(t) => assert_eq!(t.timestamp(), 296638320),
            other => panic!("expected a time, got {other:?}"),
        }
        assert_eq!(table["birthday"], Value::from("1979-05-27"));
    }

    #[test]
    fn test_serialize_env_keeps_paths() {
        let mut settings = Table::new();
        key::insert(&mut settings, &key::segments("app.name"), Value::from("demo"));
        key::insert(&mut settings, &key::segments("app.motto"), Value::from("it's $fine"));
        key::insert(&mut settings, &key::segments("app.tags"), Value::from(vec!["a", "b"]));
        let text = ConfigFormat::Env.serialize(&p(), &settings).unwrap();
        assert_eq!(
            text,
            "APP.MOTTO=\"it's \\$fine\"\nAPP.NAME=demo\nAPP.TAGS='[\"a\",\"b\"]'\n"
        );
        assert_eq!(ConfigFormat::Env.parse(&p(), &text).unwrap(), settings);
    }

    #[test]
    fn test_serialize_properties_rejects_multiline() {
        let mut settings = Table::new();
        key::insert(&mut settings, &key::segments("motd"), Value::from("a\nb"));
        let err = ConfigFormat::Properties.serialize(&p(), &settings).unwrap_err();
        assert!(matches!(err, ConfigError::Write { .. }));
    }
}
