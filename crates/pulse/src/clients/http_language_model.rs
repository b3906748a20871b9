use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::endpoint;
use crate::models::analysis::AnalysisOutput;
use crate::services::analyst::Summarizer;
use crate::services::language_model::{
  LanguageModelError, ANALYST_SYSTEM_PROMPT, QUERY_REWRITE_SYSTEM_PROMPT,
};
use crate::services::rewrite::QueryRewriter;

/// Structured-output language model gateway, used for both rewriting and summarizing
pub struct HttpLanguageModel {
  client: Client,
  base_url: String,
}

#[derive(Serialize)]
struct PromptRequest<'a> {
  system_prompt: &'a str,
  prompt: String,
}

impl HttpLanguageModel {
  pub fn new(client: Client, base_url: impl Into<String>) -> Self {
    Self { client, base_url: base_url.into() }
  }

  async fn generate(&self, path: &str, request: &PromptRequest<'_>) -> Result<Value, LanguageModelError> {
    let url = endpoint(&self.base_url, path);
    tracing::debug!(%url, prompt_chars = request.prompt.len(), "language model call");

    let response = self
      .client
      .post(&url)
      .json(request)
      .send()
      .await
      .map_err(|e| LanguageModelError::transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(LanguageModelError::status(status.as_u16(), body));
    }

    response.json().await.map_err(|e| LanguageModelError::invalid_response(e.to_string()))
  }
}

fn rewrite_request(query: &str) -> PromptRequest<'static> {
  PromptRequest { system_prompt: QUERY_REWRITE_SYSTEM_PROMPT, prompt: format!("Original query: {query}") }
}

fn summarize_request(query: &str, search_results: &str) -> PromptRequest<'static> {
  PromptRequest {
    system_prompt: ANALYST_SYSTEM_PROMPT,
    prompt: format!("{query}\n\nSearch results:\n{search_results}"),
  }
}

#[async_trait]
impl QueryRewriter for HttpLanguageModel {
  async fn rewrite(&self, query: &str) -> Result<Value, LanguageModelError> {
    self.generate("rewrite", &rewrite_request(query)).await
  }
}

#[async_trait]
impl Summarizer for HttpLanguageModel {
  async fn summarize(
    &self,
    query: &str,
    search_results: &str,
  ) -> Result<AnalysisOutput, LanguageModelError> {
    let value = self.generate("summarize", &summarize_request(query, search_results)).await?;
    serde_json::from_value(value).map_err(|e| LanguageModelError::invalid_response(e.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_rewrite_request_wraps_query() {
    let request = rewrite_request("how was the food?");
    assert_eq!(request.prompt, "Original query: how was the food?");
    assert_eq!(request.system_prompt, QUERY_REWRITE_SYSTEM_PROMPT);
  }

  #[test]
  fn test_summarize_request_carries_results_block() {
    let request = summarize_request("food?", "[abc12] Game A | Q | cold");
    assert!(request.prompt.starts_with("food?\n\n"));
    assert!(request.prompt.ends_with("[abc12] Game A | Q | cold"));
  }
}
