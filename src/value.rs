//! Dynamically-typed configuration values.
//!
//! Every layer stores [`Value`] trees. Conversions out of a `Value` come in
//! two flavours:
//! - strict `coerce_*` methods returning `Result<_, CoerceError>`
//! - the zero-value getters on [`crate::Store`], which wrap the strict ones
//!
//! Coercion is deliberately loose in the same places a config file is loose:
//! `"8080"` is a valid integer, `"true"` a valid bool, `"30s"` a duration.

use crate::error::CoerceError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// Nested table of values keyed by lowercase segment.
pub type Table = BTreeMap<String, Value>;

/// A configuration value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Not specified. Never satisfies a lookup.
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Duration(Duration),
    Time(DateTime<Utc>),
    List(Vec<Value>),
    Map(Table),
}

impl Value {
    /// Name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Duration(_) => "duration",
            Value::Time(_) => "time",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_map(&self) -> Option<&Table> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Build a value from anything serde can serialize.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, CoerceError> {
        serde_json::to_value(value)
            .map(Value::from)
            .map_err(|_| CoerceError::new("serializable", "value"))
    }

    /// Lowercase every map key, recursively.
    pub(crate) fn insensitivise(self) -> Self {
        match self {
            Value::Map(map) => Value::Map(insensitivise_table(map)),
            Value::List(items) => Value::List(items.into_iter().map(Value::insensitivise).collect()),
            other => other,
        }
    }

    pub fn coerce_string(&self) -> Result<String, CoerceError> {
        match self {
            Value::Nil => Ok(String::new()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::String(s) => Ok(s.clone()),
            Value::Duration(d) => Ok(humantime::format_duration(*d).to_string()),
            Value::Time(t) => Ok(t.to_rfc3339()),
            other => Err(CoerceError::new(other.kind(), "string")),
        }
    }

    pub fn coerce_bool(&self) -> Result<bool, CoerceError> {
        match self {
            Value::Nil => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Float(f) => Ok(*f != 0.0),
            Value::Duration(d) => Ok(!d.is_zero()),
            Value::String(s) => parse_bool(s.trim()).ok_or(CoerceError::new("string", "bool")),
            other => Err(CoerceError::new(other.kind(), "bool")),
        }
    }

    pub fn coerce_i64(&self) -> Result<i64, CoerceError> {
        match self {
            Value::Nil => Ok(0),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Int(i) => Ok(*i),
            Value::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
            Value::Duration(d) => {
                i64::try_from(d.as_nanos()).map_err(|_| CoerceError::new("duration", "int"))
            }
            Value::String(s) => parse_int(s.trim()).ok_or(CoerceError::new("string", "int")),
            other => Err(CoerceError::new(other.kind(), "int")),
        }
    }

    /// Negative numbers are rejected rather than wrapped.
    pub fn coerce_u64(&self) -> Result<u64, CoerceError> {
        let signed = self
            .coerce_i64()
            .map_err(|_| CoerceError::new(self.kind(), "uint"))?;
        u64::try_from(signed).map_err(|_| CoerceError::new(self.kind(), "uint"))
    }

    pub fn coerce_f64(&self) -> Result<f64, CoerceError> {
        match self {
            Value::Nil => Ok(0.0),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| CoerceError::new("string", "float")),
            other => Err(CoerceError::new(other.kind(), "float")),
        }
    }

    /// Integers and unit-less strings are nanoseconds; strings with units
    /// use the humantime grammar (`30s`, `1h30m`, `500ms`).
    pub fn coerce_duration(&self) -> Result<Duration, CoerceError> {
        match self {
            Value::Nil => Ok(Duration::ZERO),
            Value::Duration(d) => Ok(*d),
            Value::Int(i) => u64::try_from(*i)
                .map(Duration::from_nanos)
                .map_err(|_| CoerceError::new("int", "duration")),
            Value::Float(f) if *f >= 0.0 && f.is_finite() => Ok(Duration::from_nanos(*f as u64)),
            Value::String(s) => parse_duration(s.trim()).ok_or(CoerceError::new("string", "duration")),
            other => Err(CoerceError::new(other.kind(), "duration")),
        }
    }

    /// Integers are unix seconds.
    pub fn coerce_time(&self) -> Result<DateTime<Utc>, CoerceError> {
        match self {
            Value::Nil => Ok(DateTime::<Utc>::default()),
            Value::Time(t) => Ok(*t),
            Value::Int(secs) => Utc
                .timestamp_opt(*secs, 0)
                .single()
                .ok_or(CoerceError::new("int", "time")),
            Value::String(s) => parse_time(s.trim()).ok_or(CoerceError::new("string", "time")),
            other => Err(CoerceError::new(other.kind(), "time")),
        }
    }

    /// A plain string splits on whitespace.
    pub fn coerce_string_slice(&self) -> Result<Vec<String>, CoerceError> {
        match self {
            Value::Nil => Ok(Vec::new()),
            Value::List(items) => items.iter().map(Value::coerce_string).collect(),
            Value::String(s) => Ok(s.split_whitespace().map(str::to_string).collect()),
            other => Err(CoerceError::new(other.kind(), "string slice")),
        }
    }

    pub fn coerce_int_slice(&self) -> Result<Vec<i64>, CoerceError> {
        match self {
            Value::Nil => Ok(Vec::new()),
            Value::List(items) => items.iter().map(Value::coerce_i64).collect(),
            Value::String(s) => s
                .split_whitespace()
                .map(|part| parse_int(part).ok_or(CoerceError::new("string", "int slice")))
                .collect(),
            other => Err(CoerceError::new(other.kind(), "int slice")),
        }
    }

    /// JSON object strings are accepted too, mirroring what env vars carry.
    pub fn coerce_string_map(&self) -> Result<Table, CoerceError> {
        match self {
            Value::Nil => Ok(Table::new()),
            Value::Map(map) => Ok(map.clone()),
            Value::String(s) => match serde_json::from_str::<serde_json::Value>(s) {
                Ok(json @ serde_json::Value::Object(_)) => match Value::from(json).insensitivise() {
                    Value::Map(map) => Ok(map),
                    _ => Err(CoerceError::new("string", "string map")),
                },
                _ => Err(CoerceError::new("string", "string map")),
            },
            other => Err(CoerceError::new(other.kind(), "string map")),
        }
    }

    pub fn coerce_string_map_string(&self) -> Result<BTreeMap<String, String>, CoerceError> {
        self.coerce_string_map()?
            .iter()
            .map(|(k, v)| Ok((k.clone(), v.coerce_string()?)))
            .collect()
    }

    pub fn coerce_string_map_string_slice(
        &self,
    ) -> Result<BTreeMap<String, Vec<String>>, CoerceError> {
        self.coerce_string_map()?
            .iter()
            .map(|(k, v)| {
                let items = match v {
                    Value::List(_) => v.coerce_string_slice()?,
                    scalar => vec![scalar.coerce_string()?],
                };
                Ok((k.clone(), items))
            })
            .collect()
    }
}

pub(crate) fn insensitivise_table(map: Table) -> Table {
    map.into_iter()
        .map(|(k, v)| (k.to_lowercase(), v.insensitivise()))
        .collect()
}

/// Accepts the spellings config files and env vars tend to use.
fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" | "yes" | "YES" | "on" | "ON" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" | "no" | "NO" | "off" | "OFF" | "" => {
            Some(false)
        }
        _ => None,
    }
}

fn parse_int(s: &str) -> Option<i64> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(oct) = digits.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()?
    } else if let Some(bin) = digits.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()?
    } else {
        digits.replace('_', "").parse::<i64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

pub(crate) fn parse_duration(s: &str) -> Option<Duration> {
    if s.is_empty() {
        return Some(Duration::ZERO);
    }
    if let Ok(nanos) = s.parse::<u64>() {
        return Some(Duration::from_nanos(nanos));
    }
    humantime::parse_duration(s).ok()
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_rfc2822(s) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            scalar => write!(f, "{}", scalar.coerce_string().unwrap_or_default()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Duration(d) => {
                serializer.serialize_str(&humantime::format_duration(*d).to_string())
            }
            Value::Time(t) => serializer.serialize_str(&t.to_rfc3339()),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// TOML datetimes with an offset become [`Value::Time`]. Local dates and
/// times have no instant, so they stay as their RFC 3339 text.
impl From<toml::Value> for Value {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Int(i),
            toml::Value::Float(f) => Value::Float(f),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => {
                let text = dt.to_string();
                match dt.offset {
                    Some(_) => DateTime::parse_from_rfc3339(&text)
                        .map(|t| Value::Time(t.with_timezone(&Utc)))
                        .unwrap_or(Value::String(text)),
                    None => Value::String(text),
                }
            }
            toml::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            toml::Value::Table(table) => {
                Value::Map(table.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(i: $t) -> Self {
                Value::Int(i64::from(i))
            }
        })*
    };
}
from_signed!(i8, i16, i32, i64, u8, u16, u32);

impl From<isize> for Value {
    fn from(i: isize) -> Self {
        Value::Int(i as i64)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        i64::try_from(u).map_or(Value::Float(u as f64), Value::Int)
    }
}

impl From<usize> for Value {
    fn from(u: usize) -> Self {
        Value::from(u as u64)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f64::from(f))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Value::Duration(d)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Time(t)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Nil, Into::into)
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(map: BTreeMap<String, T>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(map: HashMap<String, T>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Value>> From<HashMap<&str, T>> for Value {
    fn from(map: HashMap<&str, T>) -> Self {
        Value::Map(
            map.into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}
