//! Beacon API response envelope decoding.
//!
//! Every Beacon API JSON response wraps its payload as `{"data": ..., ...}`. The other
//! top-level fields (`execution_optimistic`, `finalized`, `dependent_root`, ...) are
//! returned as metadata alongside the decoded payload.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
    types::{ApiResponse, Metadata},
    upstream::UpstreamError,
};

/// Metadata key under which the `Eth-Consensus-Version` header is stored.
pub const VERSION_METADATA_KEY: &str = "version";

/// Decodes an envelope into its `data` payload and metadata.
///
/// # Errors
///
/// Returns [`UpstreamError::InvalidResponse`] if the body is not a JSON object, has no
/// `data` field, or `data` does not match `T`.
pub fn decode_response<T: DeserializeOwned>(
    body: &[u8],
    consensus_version: Option<&str>,
) -> Result<ApiResponse<T>, UpstreamError> {
    let mut envelope: Map<String, Value> = serde_json::from_slice(body)
        .map_err(|e| UpstreamError::InvalidResponse(format!("malformed envelope: {e}")))?;

    let data = envelope
        .remove("data")
        .ok_or_else(|| UpstreamError::InvalidResponse("response has no data field".to_string()))?;

    let data = serde_json::from_value(data)
        .map_err(|e| UpstreamError::InvalidResponse(format!("unexpected data: {e}")))?;

    let mut metadata: Metadata = envelope.into_iter().collect();
    if let Some(version) = consensus_version {
        metadata.insert(VERSION_METADATA_KEY.to_string(), Value::String(version.to_string()));
    }

    Ok(ApiResponse::with_metadata(data, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PendingConsolidation;
    use serde_json::json;

    #[test]
    fn test_metadata_collected_from_envelope() {
        let body = json!({
            "execution_optimistic": false,
            "finalized": true,
            "data": [{ "source_index": "12", "target_index": "34" }],
        });

        let response: ApiResponse<Vec<PendingConsolidation>> =
            decode_response(body.to_string().as_bytes(), Some("electra")).unwrap();

        assert_eq!(
            response.data,
            vec![PendingConsolidation { source_index: 12, target_index: 34 }]
        );
        assert_eq!(response.metadata.get("execution_optimistic"), Some(&json!(false)));
        assert_eq!(response.metadata.get("finalized"), Some(&json!(true)));
        assert_eq!(response.metadata.get(VERSION_METADATA_KEY), Some(&json!("electra")));
        assert!(!response.metadata.contains_key("data"));
    }

    #[test]
    fn test_missing_data_rejected() {
        let result = decode_response::<Vec<PendingConsolidation>>(br#"{"finalized":true}"#, None);
        assert!(
            matches!(result, Err(UpstreamError::InvalidResponse(msg)) if msg.contains("no data"))
        );
    }

    #[test]
    fn test_malformed_body_rejected() {
        let result = decode_response::<Map<String, Value>>(b"<html>bad gateway</html>", None);
        assert!(matches!(result, Err(UpstreamError::InvalidResponse(_))));

        let result = decode_response::<Map<String, Value>>(b"[1,2]", None);
        assert!(matches!(result, Err(UpstreamError::InvalidResponse(_))));
    }

    #[test]
    fn test_mismatched_data_rejected() {
        let result = decode_response::<Vec<PendingConsolidation>>(br#"{"data":{"a":1}}"#, None);
        assert!(matches!(result, Err(UpstreamError::InvalidResponse(msg)) if msg.contains("data")));
    }

    #[test]
    fn test_no_version_without_header() {
        let response = decode_response::<Map<String, Value>>(br#"{"data":{}}"#, None).unwrap();
        assert!(response.metadata.is_empty());
    }
}
