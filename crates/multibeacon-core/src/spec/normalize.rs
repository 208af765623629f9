//! Converts the loosely typed `/eth/v1/config/spec` tree into [`SpecValue`]s.
//!
//! Beacon nodes return every configuration leaf as a string. The key name decides how a
//! string is interpreted; the first matching rule wins:
//!
//! 1. keys starting with `DOMAIN_` holding hex become a [`DomainType`]
//! 2. keys ending with `_FORK_VERSION` holding hex become a [`Version`]
//! 3. `0x`-prefixed hex values become raw bytes
//! 4. keys ending with `_TIME` holding a non-zero integer become a UTC timestamp
//! 5. keys starting with `SECONDS_PER_`, and `GENESIS_DELAY`, holding a non-negative
//!    integer become a duration
//! 6. `"0"` and other positive decimal integers become `Uint`
//! 7. anything else stays a string
//!
//! A rule whose parse fails falls through to the next one. Array elements are
//! interpreted with an empty key, so only the value-based rules apply to them.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::time::Duration;

use super::{SpecMap, SpecValue};
use crate::types::{DomainType, Version};

/// Normalizes a whole tree. A top-level string is interpreted with an empty key.
#[must_use]
pub fn normalize(tree: &Value) -> SpecValue {
    normalize_keyed("", tree)
}

/// Normalizes the members of a JSON object, keeping every key.
#[must_use]
pub fn normalize_map(map: &Map<String, Value>) -> SpecMap {
    map.iter().map(|(key, value)| (key.clone(), normalize_keyed(key, value))).collect()
}

/// Applies the same rules to an already typed tree. Typed leaves pass through, so
/// `renormalize(normalize(v)) == normalize(v)`.
#[must_use]
pub fn renormalize(value: SpecValue) -> SpecValue {
    renormalize_keyed("", value)
}

fn normalize_keyed(key: &str, value: &Value) -> SpecValue {
    match value {
        Value::String(s) => parse_string(key, s),
        Value::Array(items) => {
            SpecValue::List(items.iter().map(|v| normalize_keyed("", v)).collect())
        }
        Value::Object(map) => SpecValue::Map(normalize_map(map)),
        Value::Number(n) => SpecValue::Number(n.clone()),
        Value::Bool(b) => SpecValue::Bool(*b),
        Value::Null => SpecValue::Null,
    }
}

fn renormalize_keyed(key: &str, value: SpecValue) -> SpecValue {
    match value {
        SpecValue::String(s) => parse_string(key, &s),
        SpecValue::List(items) => {
            SpecValue::List(items.into_iter().map(|v| renormalize_keyed("", v)).collect())
        }
        SpecValue::Map(map) => SpecValue::Map(
            map.into_iter()
                .map(|(k, v)| {
                    let v = renormalize_keyed(&k, v);
                    (k, v)
                })
                .collect(),
        ),
        typed => typed,
    }
}

fn decode_hex(value: &str) -> Option<Vec<u8>> {
    hex::decode(value.strip_prefix("0x").unwrap_or(value)).ok()
}

fn parse_string(key: &str, value: &str) -> SpecValue {
    if key.starts_with("DOMAIN_") {
        if let Some(bytes) = decode_hex(value) {
            return SpecValue::Domain(DomainType::from_slice(&bytes));
        }
    }

    if key.ends_with("_FORK_VERSION") {
        if let Some(bytes) = decode_hex(value) {
            return SpecValue::Version(Version::from_slice(&bytes));
        }
    }

    if let Some(hex) = value.strip_prefix("0x") {
        if let Ok(bytes) = hex::decode(hex) {
            return SpecValue::Bytes(bytes);
        }
    }

    if key.ends_with("_TIME") {
        if let Ok(secs) = value.parse::<i64>() {
            if secs != 0 {
                if let Some(time) = DateTime::<Utc>::from_timestamp(secs, 0) {
                    return SpecValue::Time(time);
                }
            }
        }
    }

    if key.starts_with("SECONDS_PER_") || key == "GENESIS_DELAY" {
        if let Some(secs) = value.parse::<i64>().ok().and_then(|s| u64::try_from(s).ok()) {
            return SpecValue::Duration(Duration::from_secs(secs));
        }
    }

    if value == "0" {
        return SpecValue::Uint(0);
    }
    // Unsigned values never carry a sign.
    if !value.starts_with('+') {
        if let Ok(v) = value.parse::<u64>() {
            if v != 0 {
                return SpecValue::Uint(v);
            }
        }
    }

    SpecValue::String(value.to_owned())
}
