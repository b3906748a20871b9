//! Summarizer output and the citation-resolved responses built from it

use serde::{Deserialize, Serialize};

/// A theme identified by the summarizer, backed by cited rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
  pub name: String,
  pub summary: String,
  #[serde(default)]
  pub supporting_citations: Vec<String>,
}

/// Structured output of the summarization capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
  pub summary: String,
  #[serde(default)]
  pub themes: Vec<Theme>,
}

/// A citation resolved back to the row it refers to, one per (theme, citation) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitedResponse {
  pub theme: String,
  pub citation_id: String,
  pub response_id: String,
  pub source_name: String,
  pub event_name: String,
  pub response_text: String,
  pub question: String,
  pub similarity_score: f64,
  pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationExcerpt {
  pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTheme {
  pub name: String,
  pub summary: String,
  pub supporting_citations: Vec<CitationExcerpt>,
}

/// Summary with every resolvable citation replaced by its excerpt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedResponse {
  pub summary: String,
  pub themes: Vec<EnrichedTheme>,
}
