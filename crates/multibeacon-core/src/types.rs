//! Shared data types for Beacon API responses and request options.
//!
//! Integers in Beacon API JSON are encoded as quoted decimal strings (`"12345"`), so the
//! numeric fields below go through [`quoted_u64`] for both directions.

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, time::Duration};

/// Response metadata: every top-level envelope field other than `data`, plus the
/// consensus version header when the node sent one.
pub type Metadata = HashMap<String, serde_json::Value>;

/// A decoded Beacon API response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub data: T,
    pub metadata: Metadata,
}

impl<T> ApiResponse<T> {
    /// Wraps `data` with empty metadata.
    #[must_use]
    pub fn new(data: T) -> Self {
        Self { data, metadata: Metadata::new() }
    }

    #[must_use]
    pub fn with_metadata(data: T, metadata: Metadata) -> Self {
        Self { data, metadata }
    }

    /// Maps the payload while keeping the metadata.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse { data: f(self.data), metadata: self.metadata }
    }
}

/// Four-byte signing domain type (e.g. `DOMAIN_BEACON_PROPOSER`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DomainType(pub [u8; 4]);

/// Four-byte fork version (e.g. `ALTAIR_FORK_VERSION`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Version(pub [u8; 4]);

/// Copies up to four bytes into a zeroed array, truncating longer input.
fn copy_tag(bytes: &[u8]) -> [u8; 4] {
    let mut tag = [0u8; 4];
    let len = bytes.len().min(4);
    tag[..len].copy_from_slice(&bytes[..len]);
    tag
}

impl DomainType {
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(copy_tag(bytes))
    }
}

impl Version {
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(copy_tag(bytes))
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// A pending partial withdrawal from the Electra beacon state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPartialWithdrawal {
    #[serde(with = "quoted_u64")]
    pub validator_index: u64,
    /// Amount in Gwei.
    #[serde(with = "quoted_u64")]
    pub amount: u64,
    #[serde(with = "quoted_u64")]
    pub withdrawable_epoch: u64,
}

/// A pending consolidation from the Electra beacon state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConsolidation {
    #[serde(with = "quoted_u64")]
    pub source_index: u64,
    #[serde(with = "quoted_u64")]
    pub target_index: u64,
}

/// Options shared by every request.
#[derive(Debug, Clone, Default)]
pub struct CommonOpts {
    /// Per-attempt timeout. Falls back to the client's configured timeout when `None`.
    pub timeout: Option<Duration>,
}

/// Options for the chain spec request.
#[derive(Debug, Clone, Default)]
pub struct SpecOpts {
    pub common: CommonOpts,
}

/// Options for the pending partial withdrawals request.
#[derive(Debug, Clone, Default)]
pub struct PendingPartialWithdrawalsOpts {
    pub common: CommonOpts,
    /// State identifier: `head`, `genesis`, `finalized`, `justified`, a slot or a state root.
    pub state: String,
}

/// Options for the pending consolidations request.
#[derive(Debug, Clone, Default)]
pub struct PendingConsolidationsOpts {
    pub common: CommonOpts,
    /// State identifier: `head`, `genesis`, `finalized`, `justified`, a slot or a state root.
    pub state: String,
}

impl PendingPartialWithdrawalsOpts {
    #[must_use]
    pub fn for_state(state: impl Into<String>) -> Self {
        Self { common: CommonOpts::default(), state: state.into() }
    }
}

impl PendingConsolidationsOpts {
    #[must_use]
    pub fn for_state(state: impl Into<String>) -> Self {
        Self { common: CommonOpts::default(), state: state.into() }
    }
}

/// Serde adapter for Beacon API quoted integers. Bare JSON numbers are accepted on input.
pub mod quoted_u64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Quoted {
            Str(String),
            Num(u64),
        }

        match Quoted::deserialize(deserializer)? {
            Quoted::Str(s) => s.parse().map_err(de::Error::custom),
            Quoted::Num(n) => Ok(n),
        }
    }
}
