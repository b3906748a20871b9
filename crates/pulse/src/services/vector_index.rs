//! Vector index access with batching and failure policy
//!
//! `VectorIndex` is the raw service surface. `VectorIndexGateway` sits in
//! front of it and owns batch sizes, top-k clamping and which failures are
//! absorbed versus reported.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

use super::filter::Filter;
use crate::models::search::SearchHit;
use crate::models::survey::{vector_key, ResponseMetadata, VectorRecord};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
  #[error("Index resource not found: {message}")]
  NotFound { message: String },

  #[error("Index service error: {message}")]
  Service { message: String },

  #[error("Index request failed: {message}")]
  Transport { message: String },

  #[error("Invalid index response: {message}")]
  InvalidResponse { message: String },
}

impl IndexError {
  pub fn not_found(message: impl Into<String>) -> Self {
    Self::NotFound { message: message.into() }
  }

  pub fn service(message: impl Into<String>) -> Self {
    Self::Service { message: message.into() }
  }

  pub fn transport(message: impl Into<String>) -> Self {
    Self::Transport { message: message.into() }
  }

  pub fn invalid_response(message: impl Into<String>) -> Self {
    Self::InvalidResponse { message: message.into() }
  }
}

/// An upsert batch failed. Everything before it is already stored.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Upsert failed after {written} records were written: {source}")]
pub struct UpsertFailure {
  pub written: usize,
  #[source]
  pub source: IndexError,
}

/// A nearest-neighbor query as sent to the index
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
  pub vector: Vec<f32>,
  pub top_k: usize,
  pub filter: Option<Filter>,
}

/// A raw match; the index may omit the distance
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatch {
  pub key: String,
  pub distance: Option<f64>,
  pub metadata: ResponseMetadata,
}

/// Keyed vector store with metadata and filtered cosine queries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorIndex: Send + Sync {
  /// Return the subset of `keys` that are stored
  async fn get_vectors(&self, keys: &[String]) -> Result<Vec<String>, IndexError>;

  async fn put_vectors(&self, records: &[VectorRecord]) -> Result<(), IndexError>;

  async fn delete_vectors(&self, keys: &[String]) -> Result<(), IndexError>;

  async fn query_vectors(&self, request: &QueryRequest) -> Result<Vec<IndexMatch>, IndexError>;
}

/// Per-call ceilings imposed by the index service
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchLimits {
  pub existence: usize,
  pub upsert: usize,
  pub delete: usize,
  pub max_top_k: usize,
}

impl Default for BatchLimits {
  fn default() -> Self {
    Self { existence: 100, upsert: 500, delete: 500, max_top_k: 100 }
  }
}

pub struct VectorIndexGateway {
  index: Arc<dyn VectorIndex>,
  limits: BatchLimits,
}

impl VectorIndexGateway {
  pub fn new(index: Arc<dyn VectorIndex>) -> Self {
    Self { index, limits: BatchLimits::default() }
  }

  pub fn with_limits(mut self, limits: BatchLimits) -> Self {
    self.limits = limits;
    self
  }

  pub fn limits(&self) -> BatchLimits {
    self.limits
  }

  /// Keys among `keys` that already exist. A failed batch counts as "none
  /// present", so those rows get re-embedded and overwritten.
  pub async fn existing_keys(&self, keys: &[String]) -> HashSet<String> {
    let mut existing = HashSet::new();

    for batch in keys.chunks(self.limits.existence.max(1)) {
      match self.index.get_vectors(batch).await {
        Ok(found) => existing.extend(found),
        Err(e) => {
          bentley::warn!("Existence check failed for {} keys: {e}", batch.len());
        }
      }
    }

    existing
  }

  /// Write records in batches, stopping at the first failed batch
  pub async fn upsert(&self, records: &[VectorRecord]) -> Result<usize, UpsertFailure> {
    let mut written = 0;

    for batch in records.chunks(self.limits.upsert.max(1)) {
      self
        .index
        .put_vectors(batch)
        .await
        .map_err(|source| UpsertFailure { written, source })?;
      written += batch.len();
    }

    Ok(written)
  }

  /// Delete keys in batches. A batch that is not found is skipped; any other
  /// failure stops deletion. Returns the number of keys in successful batches.
  pub async fn delete(&self, keys: &[String]) -> usize {
    let mut deleted = 0;

    for batch in keys.chunks(self.limits.delete.max(1)) {
      match self.index.delete_vectors(batch).await {
        Ok(()) => deleted += batch.len(),
        Err(IndexError::NotFound { message }) => {
          bentley::verbose!("Skipping delete batch of {}: {message}", batch.len());
        }
        Err(e) => {
          bentley::error!("Delete stopped after {deleted} keys: {e}");
          break;
        }
      }
    }

    deleted
  }

  /// Delete every `{source}_{i}` key for `i` below `max_count`
  pub async fn purge_source(&self, source_name: &str, max_count: usize) -> usize {
    let keys: Vec<String> = (0..max_count).map(|i| vector_key(source_name, i)).collect();
    let deleted = self.delete(&keys).await;
    bentley::info!("Purged {deleted} keys for source '{source_name}'");
    deleted
  }

  /// Nearest neighbors for `vector`, most similar first. Failures are logged
  /// and produce an empty result.
  pub async fn query(
    &self,
    vector: Vec<f32>,
    top_k: usize,
    filters: &BTreeMap<String, String>,
    exclude_uids: &[String],
  ) -> Vec<SearchHit> {
    let request = QueryRequest {
      vector,
      top_k: top_k.min(self.limits.max_top_k),
      filter: Filter::for_query(filters, exclude_uids),
    };

    match self.index.query_vectors(&request).await {
      Ok(matches) => matches
        .into_iter()
        .map(|m| SearchHit::from_match(m.metadata, m.distance.unwrap_or(1.0)))
        .collect(),
      Err(e) => {
        bentley::error!("Vector query failed: {e}");
        Vec::new()
      }
    }
  }
}
