//! Multi-query retrieval
//!
//! A question is expanded into several search queries which run in order.
//! Every query excludes the uids the session has already returned, including
//! those from earlier searches, so each one contributes only responses the
//! session has not seen yet. The merged
//! hits are ranked, cut at the relevance floor and labelled with short
//! citation ids for the summarizer.

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::embeddings::EmbeddingGenerator;
use super::ids::IdAllocator;
use super::language_model::LanguageModelError;
use super::rewrite::{expansion_from_value, QueryRewriter, MAX_EXPANDED_QUERIES};
use super::vector_index::VectorIndexGateway;
use crate::models::search::{CitableResult, SearchHit};

/// Minimum similarity a hit needs to be kept
pub const RELEVANCE_FLOOR: f64 = 0.15;

const RESULTS_HEADER: &str = "id | Event | Question | Response\n";

/// Conditions that end a retrieval session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalError {
  #[error("Query expansion produced no queries")]
  EmptyExpansion,

  #[error("Query expansion was malformed: {detail}")]
  MalformedExpansion { detail: String },

  #[error("Failed to generate search queries: {source}")]
  RewriteFailed {
    #[source]
    source: LanguageModelError,
  },

  #[error("No matching responses found")]
  NoResults,

  #[error("No matching responses at or above similarity {floor}")]
  BelowThreshold { floor: f64 },
}

impl RetrievalError {
  pub fn malformed(detail: impl Into<String>) -> Self {
    Self::MalformedExpansion { detail: detail.into() }
  }

  /// Text shown to whoever asked the question
  pub fn user_message(&self) -> String {
    match self {
      Self::EmptyExpansion => {
        "Error: query expansion must produce a non-empty list of search queries.".to_string()
      }
      Self::MalformedExpansion { .. } => {
        "Error: invalid query expansion. Expected a list of query strings.".to_string()
      }
      Self::RewriteFailed { source } => format!("Failed to generate search queries: {source}"),
      Self::NoResults => "No matching responses found.".to_string(),
      Self::BelowThreshold { floor } => {
        format!("No matching responses found with similarity >= {floor}.")
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOptions {
  pub top_k_per_query: usize,
  pub relevance_floor: f64,
  /// Metadata field -> required value, applied to every query
  pub filters: BTreeMap<String, String>,
  pub max_queries: usize,
}

impl Default for RetrievalOptions {
  fn default() -> Self {
    Self {
      top_k_per_query: 100,
      relevance_floor: RELEVANCE_FLOOR,
      filters: BTreeMap::new(),
      max_queries: MAX_EXPANDED_QUERIES,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Expanding,
  Searching,
  Merging,
  Formatting,
  Done,
  Failed,
}

/// State owned by one question: the stage of the current search, every
/// citable table produced so far and the uids already returned. Citation ids
/// are unique across all tables.
#[derive(Debug, Clone)]
pub struct RetrievalSession {
  id: Uuid,
  stage: Stage,
  tables: Vec<Vec<CitableResult>>,
  citation_ids: IdAllocator,
  /// Returned uids in the order they arrived; sent as the exclusion list
  seen_uids: Vec<String>,
  seen: HashSet<String>,
}

impl Default for RetrievalSession {
  fn default() -> Self {
    Self::new()
  }
}

impl RetrievalSession {
  pub fn new() -> Self {
    Self {
      id: Uuid::new_v4(),
      stage: Stage::Expanding,
      tables: Vec::new(),
      citation_ids: IdAllocator::for_citations(),
      seen_uids: Vec::new(),
      seen: HashSet::new(),
    }
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn stage(&self) -> Stage {
    self.stage
  }

  pub fn tables(&self) -> &[Vec<CitableResult>] {
    &self.tables
  }

  /// Every stored result, in search order
  pub fn results(&self) -> impl Iterator<Item = &CitableResult> {
    self.tables.iter().flatten()
  }

  /// Uids returned by any search in this session
  pub fn seen_uids(&self) -> &[String] {
    &self.seen_uids
  }

  /// Record `uid` as returned; false if the session already holds it.
  /// Hits without a uid cannot be tracked and always count as new.
  fn mark_seen(&mut self, uid: &str) -> bool {
    if uid.is_empty() {
      return true;
    }
    if !self.seen.insert(uid.to_string()) {
      return false;
    }
    self.seen_uids.push(uid.to_string());
    true
  }

  pub fn is_empty(&self) -> bool {
    self.tables.iter().all(Vec::is_empty)
  }

  /// First stored result carrying `citation_id`
  pub fn find(&self, citation_id: &str) -> Option<&CitableResult> {
    self.results().find(|result| result.citation_id == citation_id)
  }

  /// Label hits with fresh citation ids and keep them for resolution
  pub fn store(&mut self, hits: Vec<SearchHit>) -> &[CitableResult] {
    let table: Vec<CitableResult> = hits
      .into_iter()
      .map(|hit| CitableResult { citation_id: self.citation_ids.next_id(), hit })
      .collect();
    self.tables.push(table);
    self.tables.last().map(Vec::as_slice).unwrap_or_default()
  }
}

/// Formatted block plus the session holding its citation table
#[derive(Debug, Clone)]
pub struct Retrieval {
  pub formatted: String,
  pub session: RetrievalSession,
}

pub struct MultiQueryRetriever {
  rewriter: Arc<dyn QueryRewriter>,
  generator: Arc<EmbeddingGenerator>,
  gateway: Arc<VectorIndexGateway>,
  options: RetrievalOptions,
}

impl MultiQueryRetriever {
  pub fn new(
    rewriter: Arc<dyn QueryRewriter>,
    generator: Arc<EmbeddingGenerator>,
    gateway: Arc<VectorIndexGateway>,
  ) -> Self {
    Self { rewriter, generator, gateway, options: RetrievalOptions::default() }
  }

  pub fn with_options(mut self, options: RetrievalOptions) -> Self {
    self.options = options;
    self
  }

  pub fn options(&self) -> &RetrievalOptions {
    &self.options
  }

  /// Run one question in a new session
  pub async fn retrieve(&self, query: &str) -> Result<Retrieval, RetrievalError> {
    let mut session = RetrievalSession::new();
    let formatted = self.search(&mut session, query).await?;
    Ok(Retrieval { formatted, session })
  }

  /// Expand, search, merge and format one question inside `session`
  pub async fn search(
    &self,
    session: &mut RetrievalSession,
    query: &str,
  ) -> Result<String, RetrievalError> {
    let result = self.run_stages(session, query).await;
    session.stage = if result.is_ok() { Stage::Done } else { Stage::Failed };
    if let Err(e) = &result {
      bentley::info!("multi-query search ended: {}", e.user_message());
    }
    result
  }

  async fn run_stages(
    &self,
    session: &mut RetrievalSession,
    query: &str,
  ) -> Result<String, RetrievalError> {
    session.stage = Stage::Expanding;
    let queries = self.expand(query).await?;

    session.stage = Stage::Searching;
    let (hits, successful_queries) = self.search_queries(session, &queries).await;

    session.stage = Stage::Merging;
    let ranked = self.merge(hits)?;

    session.stage = Stage::Formatting;
    let table = session.store(ranked);
    let formatted = format!(
      "Found {} unique responses across {successful_queries} queries:\n\n{}",
      table.len(),
      format_results(table)
    );
    bentley::info!(
      "multi-query search: {} unique responses across {successful_queries} queries",
      table.len()
    );
    Ok(formatted)
  }

  async fn expand(&self, query: &str) -> Result<Vec<Value>, RetrievalError> {
    let raw = self.rewriter.rewrite(query).await.map_err(|source| {
      bentley::warn!("Query rewrite failed: {source}");
      RetrievalError::RewriteFailed { source }
    })?;
    expansion_from_value(raw, self.options.max_queries)
  }

  /// Run the expanded queries in order, excluding every uid the session has
  /// already returned. Returns all novel hits and the number of queries that
  /// produced any.
  async fn search_queries(
    &self,
    session: &mut RetrievalSession,
    queries: &[Value],
  ) -> (Vec<SearchHit>, usize) {
    let mut hits = Vec::new();
    let mut successful_queries = 0;

    for query in queries {
      let Some(text) = query.as_str().filter(|q| !q.trim().is_empty()) else {
        continue;
      };

      let Some(vector) = self.generator.embed_with_retry(text, "search query").await else {
        bentley::warn!("Search failed for query '{text}'");
        continue;
      };

      let mut found = self
        .gateway
        .query(vector, self.options.top_k_per_query, &self.options.filters, &session.seen_uids)
        .await;
      // the index should already have excluded these
      found.retain(|hit| session.mark_seen(&hit.uid));

      if found.is_empty() {
        bentley::verbose!("Query returned no new results: '{text}'");
        continue;
      }

      successful_queries += 1;
      bentley::verbose!(
        "Query {successful_queries}: {} new results (total unique: {})",
        found.len(),
        session.seen_uids.len()
      );
      hits.extend(found);
    }

    bentley::info!(
      "Multi-query search complete: {successful_queries} queries executed, {} unique responses found",
      hits.len()
    );
    (hits, successful_queries)
  }

  fn merge(&self, hits: Vec<SearchHit>) -> Result<Vec<SearchHit>, RetrievalError> {
    if hits.is_empty() {
      return Err(RetrievalError::NoResults);
    }
    let ranked = rank_and_floor(hits, self.options.relevance_floor);
    if ranked.is_empty() {
      return Err(RetrievalError::BelowThreshold { floor: self.options.relevance_floor });
    }
    Ok(ranked)
  }
}

/// Sort by similarity, highest first, and drop hits below `floor`
pub fn rank_and_floor(mut hits: Vec<SearchHit>, floor: f64) -> Vec<SearchHit> {
  hits.sort_by(|a, b| {
    b.similarity_score.partial_cmp(&a.similarity_score).unwrap_or(Ordering::Equal)
  });
  hits.retain(|hit| hit.similarity_score >= floor);
  hits
}

/// Line-oriented block for a text-only summarizer: a header, then
/// `[id] event | question | text` per result
pub fn format_results(results: &[CitableResult]) -> String {
  if results.is_empty() {
    return String::new();
  }

  let mut lines = vec![RESULTS_HEADER.to_string()];
  lines.extend(results.iter().map(|r| {
    format!("[{}] {} | {} | {}", r.citation_id, r.hit.event_name, r.hit.question, r.hit.text_answer)
  }));
  lines.join("\n")
}
