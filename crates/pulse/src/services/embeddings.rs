//! Embedding generation for survey text
//!
//! Wraps an external embedding model with the retry policy ingestion relies on:
//! throttling and unclassified failures back off exponentially, validation
//! failures give up immediately, and nothing ever raises to the caller.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure kinds reported by an embedding model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
  /// Rate limited by the service; worth retrying after a pause
  #[error("Embedding request throttled: {message}")]
  Throttled { message: String },

  /// The input was rejected; retrying the same text cannot succeed
  #[error("Embedding input rejected: {message}")]
  Validation { message: String },

  /// Anything else (network, 5xx, malformed response); treated as transient
  #[error("Embedding request failed: {message}")]
  Other { message: String },
}

impl EmbeddingError {
  pub fn throttled(message: impl Into<String>) -> Self {
    Self::Throttled { message: message.into() }
  }

  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation { message: message.into() }
  }

  pub fn other(message: impl Into<String>) -> Self {
    Self::Other { message: message.into() }
  }

  pub fn is_retriable(&self) -> bool {
    !matches!(self, Self::Validation { .. })
  }
}

/// External embedding model: UTF-8 text in, fixed-dimension vector out
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
  async fn invoke(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Exponential backoff: attempt `n` (0-based) waits `base_delay * 2^n`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub base_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self { max_attempts: 5, base_delay: Duration::from_secs(1) }
  }
}

impl RetryPolicy {
  pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
    Self { max_attempts: max_attempts.max(1), base_delay }
  }

  pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
    self.base_delay.saturating_mul(1u32 << attempt.min(16))
  }
}

/// Turns text into vectors through a shared model handle
pub struct EmbeddingGenerator {
  model: Arc<dyn EmbeddingModel>,
  dimension: usize,
  policy: RetryPolicy,
  detailed_logs: bool,
}

impl EmbeddingGenerator {
  pub fn new(model: Arc<dyn EmbeddingModel>, dimension: usize) -> Self {
    Self { model, dimension, policy: RetryPolicy::default(), detailed_logs: false }
  }

  pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
    self.policy = policy;
    self
  }

  /// Log every throttle, retry and rejection per text id
  pub fn with_detailed_logs(mut self, detailed_logs: bool) -> Self {
    self.detailed_logs = detailed_logs;
    self
  }

  pub fn dimension(&self) -> usize {
    self.dimension
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    self.policy
  }

  fn zero_vector(&self) -> Vec<f32> {
    vec![0.0; self.dimension]
  }

  /// Single attempt. Empty text yields a zero vector without calling the model.
  pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    if text.is_empty() {
      return Ok(self.zero_vector());
    }
    self.model.invoke(text).await
  }

  /// Embed with retries. `None` means the text could not be embedded; the
  /// failure has already been absorbed and the caller should skip the row.
  pub async fn embed_with_retry(&self, text: &str, text_id: &str) -> Option<Vec<f32>> {
    if text.is_empty() {
      return Some(self.zero_vector());
    }

    let max_attempts = self.policy.max_attempts;
    for attempt in 0..max_attempts {
      match self.model.invoke(text).await {
        Ok(embedding) => return Some(embedding),
        Err(EmbeddingError::Validation { message }) => {
          if self.detailed_logs {
            bentley::warn!("Validation error for {text_id}: {}", preview(&message));
          }
          return None;
        }
        Err(EmbeddingError::Throttled { .. }) => {
          let wait = self.policy.delay_for_attempt(attempt);
          if self.detailed_logs {
            bentley::debug!(
              "Rate limit hit for {text_id}, retry {}/{max_attempts}, waiting {:?}...",
              attempt + 1,
              wait
            );
          }
          tokio::time::sleep(wait).await;
        }
        Err(EmbeddingError::Other { message }) => {
          if self.detailed_logs {
            bentley::debug!(
              "Error for {text_id}: {}, retry {}/{max_attempts}",
              preview(&message),
              attempt + 1
            );
          }
          if attempt + 1 < max_attempts {
            tokio::time::sleep(self.policy.delay_for_attempt(attempt)).await;
          }
        }
      }
    }

    if self.detailed_logs {
      bentley::warn!("Giving up on {text_id} after {max_attempts} attempts");
    }
    None
  }
}

fn preview(message: &str) -> String {
  message.chars().take(100).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::time::Instant;

  fn generator(mock: MockEmbeddingModel) -> EmbeddingGenerator {
    EmbeddingGenerator::new(Arc::new(mock), 4)
  }

  #[test]
  fn test_backoff_doubles_per_attempt() {
    let policy = RetryPolicy::default();
    let delays: Vec<u64> = (0..5).map(|a| policy.delay_for_attempt(a).as_secs()).collect();
    assert_eq!(delays, vec![1, 2, 4, 8, 16]);
  }

  #[test]
  fn test_validation_is_not_retriable() {
    assert!(!EmbeddingError::validation("too long").is_retriable());
    assert!(EmbeddingError::throttled("slow down").is_retriable());
    assert!(EmbeddingError::other("boom").is_retriable());
  }

  #[tokio::test]
  async fn test_empty_text_returns_zero_vector_without_calling_model() {
    let mut mock = MockEmbeddingModel::new();
    mock.expect_invoke().times(0);
    let generator = generator(mock);

    assert_eq!(generator.embed("").await.unwrap(), vec![0.0; 4]);
    assert_eq!(generator.embed_with_retry("", "row_0").await, Some(vec![0.0; 4]));
  }

  #[tokio::test]
  async fn test_embed_passes_model_errors_through() {
    let mut mock = MockEmbeddingModel::new();
    mock.expect_invoke().times(1).returning(|_| Err(EmbeddingError::other("offline")));

    let result = generator(mock).embed("hello").await;
    assert_eq!(result, Err(EmbeddingError::other("offline")));
  }

  #[tokio::test]
  async fn test_success_on_first_attempt() {
    let mut mock = MockEmbeddingModel::new();
    mock
      .expect_invoke()
      .withf(|text| text == "great food")
      .times(1)
      .returning(|_| Ok(vec![0.1, 0.2, 0.3, 0.4]));

    let embedding = generator(mock).embed_with_retry("great food", "eventA_0").await;
    assert_eq!(embedding, Some(vec![0.1, 0.2, 0.3, 0.4]));
  }

  #[tokio::test(start_paused = true)]
  async fn test_throttling_exhausts_attempts_with_exponential_backoff() {
    let mut mock = MockEmbeddingModel::new();
    mock
      .expect_invoke()
      .times(5)
      .returning(|_| Err(EmbeddingError::throttled("ThrottlingException")));

    let start = Instant::now();
    let embedding = generator(mock).embed_with_retry("text", "eventA_3").await;

    assert_eq!(embedding, None);
    // 1 + 2 + 4 + 8 + 16 seconds of backoff
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(31), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(32), "elapsed {elapsed:?}");
  }

  #[tokio::test(start_paused = true)]
  async fn test_throttling_then_success() {
    let mut mock = MockEmbeddingModel::new();
    let mut sequence = mockall::Sequence::new();
    mock
      .expect_invoke()
      .times(2)
      .in_sequence(&mut sequence)
      .returning(|_| Err(EmbeddingError::throttled("ThrottlingException")));
    mock.expect_invoke().times(1).in_sequence(&mut sequence).returning(|_| Ok(vec![1.0; 4]));

    let start = Instant::now();
    let embedding = generator(mock).embed_with_retry("text", "eventA_4").await;

    assert_eq!(embedding, Some(vec![1.0; 4]));
    assert!(start.elapsed() >= Duration::from_secs(3));
  }

  #[tokio::test(start_paused = true)]
  async fn test_validation_fails_immediately() {
    let mut mock = MockEmbeddingModel::new();
    mock
      .expect_invoke()
      .times(1)
      .returning(|_| Err(EmbeddingError::validation("ValidationException: too long")));

    let start = Instant::now();
    let embedding = generator(mock).with_detailed_logs(true).embed_with_retry("x", "k").await;

    assert_eq!(embedding, None);
    assert_eq!(start.elapsed(), Duration::ZERO);
  }

  #[tokio::test(start_paused = true)]
  async fn test_other_errors_skip_the_final_sleep() {
    let mut mock = MockEmbeddingModel::new();
    mock.expect_invoke().times(5).returning(|_| Err(EmbeddingError::other("connection reset")));

    let start = Instant::now();
    let embedding = generator(mock).embed_with_retry("text", "eventA_5").await;

    assert_eq!(embedding, None);
    // 1 + 2 + 4 + 8 seconds; no wait after the last attempt
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(15), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(16), "elapsed {elapsed:?}");
  }

  #[tokio::test(start_paused = true)]
  async fn test_custom_policy_limits_attempts() {
    let mut mock = MockEmbeddingModel::new();
    mock.expect_invoke().times(2).returning(|_| Err(EmbeddingError::throttled("slow")));

    let generator = generator(mock).with_retry_policy(RetryPolicy::new(2, Duration::from_millis(10)));
    assert_eq!(generator.embed_with_retry("text", "id").await, None);
  }
}
