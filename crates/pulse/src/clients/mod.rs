//! HTTP adapters for the external capabilities
//!
//! Each adapter implements one of the service traits and translates HTTP
//! failures into that trait's error type.

pub mod http_embeddings;
pub mod http_index;
pub mod http_language_model;

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub use http_embeddings::HttpEmbeddingModel;
pub use http_index::HttpVectorIndex;
pub use http_language_model::HttpLanguageModel;

/// One pooled client, shared by every adapter
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
  Client::builder().timeout(timeout).build()
}

/// Join a base URL and a path without doubling or dropping the slash
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
  format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Service error code from a failure body: `__type`, `code` or `error` when
/// the body is JSON, otherwise the body itself
pub(crate) fn error_code(body: &str) -> String {
  serde_json::from_str::<Value>(body)
    .ok()
    .and_then(|value| {
      ["__type", "code", "error"]
        .iter()
        .find_map(|field| value.get(*field).and_then(Value::as_str).map(str::to_string))
    })
    .unwrap_or_else(|| body.trim().to_string())
}
