use multibeacon_core::{config::UpstreamProvider, types::Metadata};
use serde::Serialize;
use serde_json::{Map, Value};

pub fn print_success(message: &str) {
    println!("[SUCCESS] {message}");
}

pub fn print_error(message: &str) {
    eprintln!("[ERROR] {message}");
}

pub fn print_info(message: &str) {
    println!("[INFO] {message}");
}

/// Parses a `name=url` upstream argument.
///
/// # Errors
///
/// Returns a message clap shows to the user when the argument is malformed.
pub fn parse_upstream(arg: &str) -> Result<UpstreamProvider, String> {
    let (name, address) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=url, got '{arg}'"))?;

    if name.is_empty() || address.is_empty() {
        return Err(format!("expected name=url, got '{arg}'"));
    }

    Ok(UpstreamProvider {
        name: name.to_string(),
        address: address.to_string(),
        timeout_seconds: 10,
    })
}

/// Renders a response the way the Beacon API returns it: metadata fields next to `data`.
///
/// # Errors
///
/// Returns an error if `data` cannot be serialized.
pub fn render_response<T: Serialize>(data: &T, metadata: &Metadata) -> serde_json::Result<String> {
    let mut envelope = Map::new();
    envelope.insert("data".to_string(), serde_json::to_value(data)?);
    for (key, value) in metadata {
        envelope.insert(key.clone(), value.clone());
    }
    serde_json::to_string_pretty(&Value::Object(envelope))
}
