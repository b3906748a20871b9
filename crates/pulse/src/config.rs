//! Runtime settings, taken from flags or environment variables

use clap::Args;
use std::time::Duration;

use crate::services::embeddings::RetryPolicy;

#[derive(Args, Debug, Clone, PartialEq)]
pub struct Settings {
  /// Embedding model endpoint
  #[arg(long, env = "PULSE_EMBEDDING_URL", default_value = "http://127.0.0.1:8081/embed")]
  pub embedding_url: String,

  /// Embedding model identifier sent with each request
  #[arg(long, env = "PULSE_EMBEDDING_MODEL", default_value = "amazon.titan-embed-text-v2:0")]
  pub embedding_model: String,

  /// Length of every embedding vector
  #[arg(long, env = "PULSE_EMBEDDING_DIMENSION", default_value_t = 1024)]
  pub embedding_dimension: usize,

  /// Attempts per text before an embedding is given up on
  #[arg(long, env = "PULSE_EMBEDDING_RETRIES", default_value_t = 5)]
  pub embedding_retries: u32,

  /// Log every embedding retry and rejection
  #[arg(long, env = "PULSE_DETAILED_LOGS", default_value_t = false)]
  pub detailed_logs: bool,

  /// Vector index endpoint
  #[arg(long, env = "PULSE_INDEX_URL", default_value = "http://127.0.0.1:8082")]
  pub index_url: String,

  #[arg(long, env = "PULSE_VECTOR_BUCKET", default_value = "survey-analysis-vectors")]
  pub vector_bucket: String,

  #[arg(long, env = "PULSE_VECTOR_INDEX", default_value = "survey-responses")]
  pub vector_index: String,

  /// Language model endpoint used for query rewriting and summaries
  #[arg(long, env = "PULSE_LLM_URL", default_value = "http://127.0.0.1:8083")]
  pub llm_url: String,

  /// Per-request HTTP timeout in seconds
  #[arg(long, env = "PULSE_HTTP_TIMEOUT", default_value_t = 600)]
  pub http_timeout: u64,
}

impl Settings {
  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy::new(self.embedding_retries, Duration::from_secs(1))
  }

  pub fn http_timeout(&self) -> Duration {
    Duration::from_secs(self.http_timeout)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;
  use serial_test::serial;

  #[derive(Parser)]
  struct Harness {
    #[command(flatten)]
    settings: Settings,
  }

  const VARS: [&str; 3] = ["PULSE_EMBEDDING_DIMENSION", "PULSE_VECTOR_INDEX", "PULSE_DETAILED_LOGS"];

  fn clear_env() {
    for var in VARS {
      std::env::remove_var(var);
    }
  }

  #[test]
  #[serial]
  fn test_defaults() {
    clear_env();
    let settings = Harness::parse_from(["pulse"]).settings;

    assert_eq!(settings.embedding_dimension, 1024);
    assert_eq!(settings.embedding_model, "amazon.titan-embed-text-v2:0");
    assert_eq!(settings.vector_bucket, "survey-analysis-vectors");
    assert_eq!(settings.vector_index, "survey-responses");
    assert!(!settings.detailed_logs);
    assert_eq!(settings.retry_policy().max_attempts, 5);
    assert_eq!(settings.http_timeout(), Duration::from_secs(600));
  }

  #[test]
  #[serial]
  fn test_environment_overrides_defaults() {
    clear_env();
    std::env::set_var("PULSE_EMBEDDING_DIMENSION", "256");
    std::env::set_var("PULSE_VECTOR_INDEX", "staging");
    std::env::set_var("PULSE_DETAILED_LOGS", "true");

    let settings = Harness::parse_from(["pulse"]).settings;
    clear_env();

    assert_eq!(settings.embedding_dimension, 256);
    assert_eq!(settings.vector_index, "staging");
    assert!(settings.detailed_logs);
  }

  #[test]
  #[serial]
  fn test_flags_win_over_environment() {
    clear_env();
    std::env::set_var("PULSE_VECTOR_INDEX", "from-env");

    let settings = Harness::parse_from(["pulse", "--vector-index", "from-flag"]).settings;
    clear_env();

    assert_eq!(settings.vector_index, "from-flag");
  }
}
