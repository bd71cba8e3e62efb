//! Weakly-typed serde deserializer over [`Value`].
//!
//! Config sources are loose about types (env vars are always strings), so
//! typed requests coerce: a field declared `u16` accepts `8080` and
//! `"8080"`, a `Vec<String>` accepts `"a,b,c"`. Shapes that cannot be
//! reconciled (a map into a string, `"abc"` into an integer) fail.

use crate::error::DecodeError;
use crate::value::{Table, Value};
use serde::de::value::{MapAccessDeserializer, MapDeserializer, SeqDeserializer};
use serde::de::{self, IntoDeserializer, Unexpected, Visitor};
use serde::forward_to_deserialize_any;

impl Value {
    fn unexpected(&self) -> Unexpected<'_> {
        match self {
            Value::Nil => Unexpected::Unit,
            Value::Bool(b) => Unexpected::Bool(*b),
            Value::Int(i) => Unexpected::Signed(*i),
            Value::Float(f) => Unexpected::Float(*f),
            Value::String(s) => Unexpected::Str(s),
            Value::Duration(_) => Unexpected::Other("duration"),
            Value::Time(_) => Unexpected::Other("time"),
            Value::List(_) => Unexpected::Seq,
            Value::Map(_) => Unexpected::Map,
        }
    }

    fn invalid(&self, expected: &str) -> DecodeError {
        de::Error::invalid_type(self.unexpected(), &expected)
    }
}

impl<'de> IntoDeserializer<'de, DecodeError> for Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

fn visit_list<'de, V: Visitor<'de>>(items: Vec<Value>, visitor: V) -> Result<V::Value, DecodeError> {
    let mut seq = SeqDeserializer::<_, DecodeError>::new(items.into_iter());
    let value = visitor.visit_seq(&mut seq)?;
    seq.end()?;
    Ok(value)
}

fn visit_table<'de, V: Visitor<'de>>(
    table: Table,
    visitor: V,
) -> Result<V::Value, DecodeError> {
    let mut map = MapDeserializer::<_, DecodeError>::new(table.into_iter());
    let value = visitor.visit_map(&mut map)?;
    map.end()?;
    Ok(value)
}

/// The declared name matching `key`: exact first, then case-insensitive.
fn declared_name(key: &str, names: &'static [&'static str]) -> Option<&'static str> {
    names.iter().copied().find(|name| *name == key).or_else(|| {
        let lower = key.to_lowercase();
        names
            .iter()
            .copied()
            .find(|name| name.to_lowercase() == lower)
    })
}

fn declared_keys(table: Table, names: &'static [&'static str]) -> Table {
    table
        .into_iter()
        .map(|(key, value)| match declared_name(&key, names) {
            Some(name) => (name.to_string(), value),
            None => (key, value),
        })
        .collect()
}

impl<'de> de::Deserializer<'de> for Value {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Value::Nil => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Int(i) => visitor.visit_i64(i),
            Value::Float(f) => visitor.visit_f64(f),
            Value::String(s) => visitor.visit_string(s),
            scalar @ (Value::Duration(_) | Value::Time(_)) => {
                let text = scalar.coerce_string().map_err(|e| DecodeError::new(e.to_string()))?;
                visitor.visit_string(text)
            }
            Value::List(items) => visit_list(items, visitor),
            Value::Map(table) => visit_table(table, visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.coerce_bool() {
            Ok(b) => visitor.visit_bool(b),
            Err(_) => Err(self.invalid("a boolean")),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.coerce_i64() {
            Ok(i) => visitor.visit_i64(i),
            Err(_) => Err(self.invalid("an integer")),
        }
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.coerce_u64() {
            Ok(u) => visitor.visit_u64(u),
            Err(_) => Err(self.invalid("an unsigned integer")),
        }
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.coerce_f64() {
            Ok(f) => visitor.visit_f64(f),
            Err(_) => Err(self.invalid("a float")),
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.coerce_string() {
            Ok(s) => visitor.visit_string(s),
            Err(_) => Err(self.invalid("a string")),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Value::Nil => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        visitor.visit_newtype_struct(self)
    }

    /// Comma-separated strings split into sequences; other scalars become a
    /// one-element sequence.
    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Value::List(items) => visit_list(items, visitor),
            Value::Nil => visit_list(Vec::new(), visitor),
            Value::String(s) if s.trim().is_empty() => visit_list(Vec::new(), visitor),
            Value::String(s) => visit_list(
                s.split(',')
                    .map(|part| Value::String(part.trim().to_string()))
                    .collect(),
                visitor,
            ),
            Value::Map(_) => Err(self.invalid("a sequence")),
            scalar => visit_list(vec![scalar], visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Value::Map(table) => visit_table(table, visitor),
            Value::Nil => visit_table(Default::default(), visitor),
            other => Err(other.invalid("a map")),
        }
    }

    /// Keys are stored lowercased, so they are matched against the
    /// declared field names without regard to case.
    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match self {
            Value::Map(table) => visit_table(declared_keys(table, fields), visitor),
            other => other.deserialize_map(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match self {
            Value::String(s) => {
                let variant = declared_name(&s, variants).map_or(s, str::to_string);
                visitor.visit_enum(variant.into_deserializer())
            }
            Value::Map(table) if table.len() == 1 => visitor.visit_enum(MapAccessDeserializer::new(
                MapDeserializer::new(declared_keys(table, variants).into_iter()),
            )),
            other => Err(other.invalid("an enum variant")),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bytes byte_buf identifier
    }
}
