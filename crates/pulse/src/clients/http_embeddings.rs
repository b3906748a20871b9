use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error_code;
use crate::services::embeddings::{EmbeddingError, EmbeddingModel};

/// Embedding model behind a JSON endpoint
pub struct HttpEmbeddingModel {
  client: Client,
  url: String,
  model: String,
  dimension: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
  input_text: &'a str,
  model: &'a str,
  dimensions: usize,
}

#[derive(Deserialize)]
struct EmbedResponse {
  embedding: Vec<f32>,
}

impl HttpEmbeddingModel {
  pub fn new(client: Client, url: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
    Self { client, url: url.into(), model: model.into(), dimension }
  }
}

#[async_trait]
impl EmbeddingModel for HttpEmbeddingModel {
  async fn invoke(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    let request = EmbedRequest { input_text: text, model: &self.model, dimensions: self.dimension };
    tracing::debug!(url = %self.url, chars = text.chars().count(), "embedding request");

    let response = self
      .client
      .post(&self.url)
      .json(&request)
      .send()
      .await
      .map_err(|e| EmbeddingError::other(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(classify_failure(status.as_u16(), &body));
    }

    let parsed: EmbedResponse =
      response.json().await.map_err(|e| EmbeddingError::other(format!("bad embedding body: {e}")))?;
    Ok(parsed.embedding)
  }
}

/// Map a failed response onto the three embedding failure kinds
pub fn classify_failure(status: u16, body: &str) -> EmbeddingError {
  let code = error_code(body);
  let message = format!("HTTP {status}: {code}");

  if status == 429 || code.contains("Throttling") {
    EmbeddingError::throttled(message)
  } else if matches!(status, 400 | 413 | 422) || code.contains("Validation") {
    EmbeddingError::validation(message)
  } else {
    EmbeddingError::other(message)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_throttling_is_recognized_by_status_or_code() {
    assert!(matches!(classify_failure(429, ""), EmbeddingError::Throttled { .. }));
    assert!(matches!(
      classify_failure(400, r#"{"__type":"ThrottlingException"}"#),
      EmbeddingError::Throttled { .. }
    ));
  }

  #[test]
  fn test_rejected_input_is_validation() {
    assert!(matches!(classify_failure(413, "too large"), EmbeddingError::Validation { .. }));
    assert!(matches!(
      classify_failure(500, r#"{"code":"ValidationException"}"#),
      EmbeddingError::Validation { .. }
    ));
  }

  #[test]
  fn test_everything_else_is_other() {
    assert!(matches!(classify_failure(503, "unavailable"), EmbeddingError::Other { .. }));
  }

  #[test]
  fn test_request_body_shape() {
    let request = EmbedRequest { input_text: "hi", model: "titan", dimensions: 1024 };
    assert_eq!(
      serde_json::to_value(&request).unwrap(),
      serde_json::json!({ "inputText": "hi", "model": "titan", "dimensions": 1024 })
    );
  }
}
