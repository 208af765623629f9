//! Chain configuration: typed values, the normalizer and the process-wide cache.

pub mod cache;
pub mod normalize;

pub use cache::{CacheState, SpecCache, SpecSource};
pub use normalize::{normalize, normalize_map, renormalize};

use chrono::{DateTime, Utc};
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::{collections::BTreeMap, fmt, time::Duration};

use crate::types::{DomainType, Version};

/// A normalized chain configuration, keyed by configuration name.
pub type SpecMap = BTreeMap<String, SpecValue>;

/// One strongly typed chain configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecValue {
    Bytes(Vec<u8>),
    Domain(DomainType),
    Version(Version),
    Time(DateTime<Utc>),
    Duration(Duration),
    Uint(u64),
    String(String),
    /// Non-string JSON leaves are kept as they were.
    Number(serde_json::Number),
    Bool(bool),
    Null,
    List(Vec<SpecValue>),
    Map(SpecMap),
}

impl SpecValue {
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Uint(v) => Some(*v),
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Duration(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Time(t) => Some(*t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_domain_type(&self) -> Option<DomainType> {
        match self {
            Self::Domain(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_version(&self) -> Option<Version> {
        match self {
            Self::Version(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[SpecValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&SpecMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Display for SpecValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Self::Domain(d) => write!(f, "{d}"),
            Self::Version(v) => write!(f, "{v}"),
            Self::Time(t) => write!(f, "{}", t.to_rfc3339()),
            Self::Duration(d) => write!(f, "{}s", d.as_secs()),
            Self::Uint(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null => f.write_str("null"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Serializes back into Beacon API conventions: byte values as `0x` hex, integers as
/// decimal strings, times as Unix seconds and durations as whole seconds.
impl Serialize for SpecValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bytes(_) | Self::Domain(_) | Self::Version(_) => {
                serializer.collect_str(self)
            }
            Self::Time(t) => serializer.collect_str(&t.timestamp()),
            Self::Duration(d) => serializer.collect_str(&d.as_secs()),
            Self::Uint(v) => serializer.collect_str(v),
            Self::String(s) => serializer.serialize_str(s),
            Self::Number(n) => n.serialize(serializer),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Null => serializer.serialize_unit(),
            Self::List(items) => items.serialize(serializer),
            Self::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}
