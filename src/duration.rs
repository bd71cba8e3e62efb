//! Serde helper for `std::time::Duration` fields.
//!
//! ```
//! use serde::Deserialize;
//! use std::time::Duration;
//!
//! #[derive(Deserialize)]
//! struct Http {
//!     #[serde(with = "tierconf::duration")]
//!     timeout: Duration,
//! }
//!
//! let store = tierconf::Store::default();
//! store.set("http.timeout", "1m");
//! let http: Http = store.unmarshal_key("http").unwrap();
//! assert_eq!(http.timeout, Duration::from_secs(60));
//! ```
//!
//! Accepts `"30s"`-style strings and integer nanoseconds. Serializes to the
//! string form.

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::fmt;
use std::time::Duration;

pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    deserializer.deserialize_any(DurationVisitor)
}

struct DurationVisitor;

impl Visitor<'_> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a duration string like \"30s\" or integer nanoseconds")
    }

    fn visit_u64<E: de::Error>(self, nanos: u64) -> Result<Duration, E> {
        Ok(Duration::from_nanos(nanos))
    }

    fn visit_i64<E: de::Error>(self, nanos: i64) -> Result<Duration, E> {
        u64::try_from(nanos)
            .map(Duration::from_nanos)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(nanos), &self))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Duration, E> {
        crate::value::parse_duration(s.trim())
            .ok_or_else(|| E::invalid_value(de::Unexpected::Str(s), &self))
    }
}
