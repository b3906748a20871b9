//! Survey rows in, embedded vectors out
//!
//! Keys are deterministic (`{source}_{row_offset + i}`), so re-running a chunk
//! only embeds rows the index does not already hold.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use super::embeddings::EmbeddingGenerator;
use super::ids::generate_uid;
use super::vector_index::{UpsertFailure, VectorIndexGateway};
use crate::models::survey::{vector_key, SurveyRow, VectorRecord};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
  #[error(transparent)]
  Upsert(#[from] UpsertFailure),
}

/// Counters for one ingestion call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
  pub source_name: String,
  pub started_at: DateTime<Utc>,
  /// Rows left after the text filter and the `max_rows` cap
  pub candidates: usize,
  pub skipped_existing: usize,
  pub processed: usize,
  pub failed: usize,
  pub elapsed: Duration,
}

impl IngestReport {
  fn new(source_name: &str, started_at: DateTime<Utc>) -> Self {
    Self {
      source_name: source_name.to_string(),
      started_at,
      candidates: 0,
      skipped_existing: 0,
      processed: 0,
      failed: 0,
      elapsed: Duration::ZERO,
    }
  }

  pub fn success_rate(&self) -> f64 {
    let attempted = self.processed + self.failed;
    if attempted == 0 {
      return 0.0;
    }
    self.processed as f64 / attempted as f64 * 100.0
  }

  pub fn rows_per_second(&self) -> f64 {
    let seconds = self.elapsed.as_secs_f64();
    if seconds > 0.0 {
      self.processed as f64 / seconds
    } else {
      0.0
    }
  }
}

pub struct IngestionPipeline {
  generator: Arc<EmbeddingGenerator>,
  gateway: Arc<VectorIndexGateway>,
}

impl IngestionPipeline {
  pub fn new(generator: Arc<EmbeddingGenerator>, gateway: Arc<VectorIndexGateway>) -> Self {
    Self { generator, gateway }
  }

  /// Embed and upsert the free-text rows of one chunk.
  ///
  /// Per-row embedding failures are counted and skipped. A failed upsert
  /// batch is returned as an error; retrying the whole call is safe.
  pub async fn ingest(
    &self,
    rows: &[SurveyRow],
    source_name: &str,
    max_rows: usize,
    row_offset: usize,
  ) -> Result<IngestReport, IngestError> {
    let started = Instant::now();
    let mut report = IngestReport::new(source_name, Utc::now());

    let mut candidates = free_text_rows(rows);
    if candidates.len() > max_rows {
      bentley::info!(
        "Limiting {source_name} to {max_rows} rows ({} dropped)",
        candidates.len() - max_rows
      );
      candidates.truncate(max_rows);
    }
    report.candidates = candidates.len();
    bentley::info!("Processing {} text responses from {source_name}", candidates.len());

    let keyed: Vec<(String, &SurveyRow)> = candidates
      .into_iter()
      .enumerate()
      .map(|(i, row)| (vector_key(source_name, row_offset + i), row))
      .collect();

    let keys: Vec<String> = keyed.iter().map(|(key, _)| key.clone()).collect();
    let existing = self.gateway.existing_keys(&keys).await;
    let pending: Vec<(String, &SurveyRow)> =
      keyed.into_iter().filter(|(key, _)| !existing.contains(key)).collect();
    report.skipped_existing = report.candidates - pending.len();

    if pending.is_empty() {
      bentley::info!("All {} rows from {source_name} are already indexed", report.candidates);
      report.elapsed = started.elapsed();
      return Ok(report);
    }
    if report.skipped_existing > 0 {
      bentley::info!(
        "Skipping {} existing rows, embedding {} new",
        report.skipped_existing,
        pending.len()
      );
    }

    let mut records = Vec::with_capacity(pending.len());
    for (key, row) in pending {
      let text = row.text().unwrap_or_default();
      match self.generator.embed_with_retry(text, &key).await {
        Some(embedding) => {
          let metadata = row.metadata(generate_uid(), source_name);
          records.push(VectorRecord { key, embedding, metadata });
          report.processed += 1;
        }
        None => report.failed += 1,
      }
    }

    if !records.is_empty() {
      let written = self.gateway.upsert(&records).await?;
      bentley::verbose!("Upserted {written} vectors for {source_name}");
    }

    report.elapsed = started.elapsed();
    log_summary(&report);
    Ok(report)
  }
}

/// Rows with a non-empty answer. When any row carries a question type, only
/// free-text rows are kept.
fn free_text_rows(rows: &[SurveyRow]) -> Vec<&SurveyRow> {
  let typed = rows.iter().any(|row| row.question_type.is_some());
  rows
    .iter()
    .filter(|row| row.text().is_some())
    .filter(|row| !typed || row.is_free_text())
    .collect()
}

fn log_summary(report: &IngestReport) {
  let seconds = report.elapsed.as_secs_f64();
  bentley::event!(
    bentley::Level::Success,
    "Ingested {}: {} processed, {} failed ({:.1}% success) in {:.1}s ({:.1} min), {:.1} rows/sec",
    report.source_name,
    report.processed,
    report.failed,
    report.success_rate(),
    seconds,
    seconds / 60.0,
    report.rows_per_second()
  );
}
