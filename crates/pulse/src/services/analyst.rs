//! Question answering: retrieve, summarize, then resolve citations

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::citations::resolve_citations;
use super::language_model::LanguageModelError;
use super::retrieval::{MultiQueryRetriever, RetrievalError};
use crate::models::analysis::{
  AnalysisOutput, CitationExcerpt, CitedResponse, EnrichedResponse, EnrichedTheme,
};
use crate::models::search::CitableResult;

/// Turns a question and a formatted result block into themes with citations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
  async fn summarize(
    &self,
    query: &str,
    search_results: &str,
  ) -> Result<AnalysisOutput, LanguageModelError>;
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalystError {
  #[error(transparent)]
  Retrieval(#[from] RetrievalError),

  #[error("Summarization failed: {0}")]
  Summarize(#[from] LanguageModelError),
}

impl AnalystError {
  pub fn user_message(&self) -> String {
    match self {
      Self::Retrieval(e) => e.user_message(),
      Self::Summarize(e) => format!("Summarization failed: {e}"),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
  pub session_id: Uuid,
  pub query: String,
  pub response: EnrichedResponse,
  pub cited_responses: Vec<CitedResponse>,
  pub cited_count: usize,
  pub search_results: Vec<CitableResult>,
}

pub struct Analyst {
  retriever: Arc<MultiQueryRetriever>,
  summarizer: Arc<dyn Summarizer>,
}

impl Analyst {
  pub fn new(retriever: Arc<MultiQueryRetriever>, summarizer: Arc<dyn Summarizer>) -> Self {
    Self { retriever, summarizer }
  }

  pub async fn answer(&self, query: &str) -> Result<AnalysisReport, AnalystError> {
    let retrieval = self.retriever.retrieve(query).await?;
    let output = self.summarizer.summarize(query, &retrieval.formatted).await?;

    let cited_responses = resolve_citations(&output, &retrieval.session);
    let response = build_enriched_response(&output, &cited_responses);
    bentley::info!(
      "Answered with {} themes and {} citations",
      response.themes.len(),
      cited_responses.len()
    );

    Ok(AnalysisReport {
      session_id: retrieval.session.id(),
      query: query.to_string(),
      response,
      cited_count: cited_responses.len(),
      cited_responses,
      search_results: retrieval.session.results().cloned().collect(),
    })
  }
}

/// Replace citation ids with excerpts. Ids that did not resolve, or resolved
/// to an empty excerpt, are left out of the theme.
pub fn build_enriched_response(output: &AnalysisOutput, cited: &[CitedResponse]) -> EnrichedResponse {
  let excerpts: HashMap<&str, &str> =
    cited.iter().map(|c| (c.citation_id.as_str(), c.excerpt.as_str())).collect();

  EnrichedResponse {
    summary: output.summary.clone(),
    themes: output
      .themes
      .iter()
      .map(|theme| EnrichedTheme {
        name: theme.name.clone(),
        summary: theme.summary.clone(),
        supporting_citations: theme
          .supporting_citations
          .iter()
          .filter_map(|id| excerpts.get(id.as_str()).filter(|e| !e.is_empty()))
          .map(|excerpt| CitationExcerpt { excerpt: excerpt.to_string() })
          .collect(),
      })
      .collect(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::analysis::Theme;
  use crate::models::survey::ResponseMetadata;
  use crate::services::embeddings::{EmbeddingGenerator, MockEmbeddingModel};
  use crate::services::rewrite::MockQueryRewriter;
  use crate::services::vector_index::{IndexMatch, MockVectorIndex, VectorIndexGateway};
  use serde_json::json;

  fn retriever(matches: Vec<IndexMatch>) -> Arc<MultiQueryRetriever> {
    let mut rewriter = MockQueryRewriter::new();
    rewriter.expect_rewrite().returning(|_| Ok(json!({ "queries": ["cold food"] })));
    let mut model = MockEmbeddingModel::new();
    model.expect_invoke().returning(|_| Ok(vec![1.0]));
    let mut index = MockVectorIndex::new();
    index.expect_query_vectors().returning(move |_| Ok(matches.clone()));

    Arc::new(MultiQueryRetriever::new(
      Arc::new(rewriter),
      Arc::new(EmbeddingGenerator::new(Arc::new(model), 1)),
      Arc::new(VectorIndexGateway::new(Arc::new(index))),
    ))
  }

  fn index_match(uid: &str, text: &str) -> IndexMatch {
    IndexMatch {
      key: format!("eventA_{uid}"),
      distance: Some(0.2),
      metadata: ResponseMetadata {
        uid: uid.to_string(),
        text_answer: text.to_string(),
        response_id: format!("resp-{uid}"),
        ..Default::default()
      },
    }
  }

  fn cited(citation_id: &str, excerpt: &str) -> CitedResponse {
    CitedResponse {
      theme: "T".to_string(),
      citation_id: citation_id.to_string(),
      response_id: "r".to_string(),
      source_name: "s".to_string(),
      event_name: "e".to_string(),
      response_text: excerpt.to_string(),
      question: "q".to_string(),
      similarity_score: 0.5,
      excerpt: excerpt.to_string(),
    }
  }

  #[test]
  fn test_enriched_response_keeps_only_resolved_excerpts() {
    let output = AnalysisOutput {
      summary: "overall".to_string(),
      themes: vec![Theme {
        name: "Food".to_string(),
        summary: "cold".to_string(),
        supporting_citations: vec!["abc12".to_string(), "ghost".to_string(), "empty".to_string()],
      }],
    };
    let enriched =
      build_enriched_response(&output, &[cited("abc12", "Food was cold"), cited("empty", "")]);

    assert_eq!(enriched.summary, "overall");
    assert_eq!(
      enriched.themes[0].supporting_citations,
      vec![CitationExcerpt { excerpt: "Food was cold".to_string() }]
    );
  }

  #[tokio::test]
  async fn test_answer_resolves_citations_from_the_block_it_summarized() {
    let mut summarizer = MockSummarizer::new();
    summarizer.expect_summarize().times(1).returning(|_, block| {
      // cite whichever id the block assigned to the first result
      let start = block.find("\n[").map(|i| i + 2).unwrap_or(0);
      let id = block[start..start + 5].to_string();
      Ok(AnalysisOutput {
        summary: "Food complaints".to_string(),
        themes: vec![Theme {
          name: "Food".to_string(),
          summary: "cold".to_string(),
          supporting_citations: vec![id, "bogus".to_string()],
        }],
      })
    });

    let analyst = Analyst::new(
      retriever(vec![index_match("a", "Food was cold"), index_match("b", "Food was late")]),
      Arc::new(summarizer),
    );
    let report = analyst.answer("what about the food?").await.unwrap();

    assert_eq!(report.cited_count, 1);
    assert_eq!(report.cited_responses[0].response_id, "resp-a");
    assert_eq!(report.search_results.len(), 2);
    assert_eq!(report.response.themes[0].supporting_citations.len(), 1);
  }

  #[tokio::test]
  async fn test_retrieval_failure_skips_summarization() {
    let mut summarizer = MockSummarizer::new();
    summarizer.expect_summarize().times(0);

    let analyst = Analyst::new(retriever(Vec::new()), Arc::new(summarizer));
    let error = analyst.answer("anything").await.unwrap_err();

    assert_eq!(error, AnalystError::Retrieval(RetrievalError::NoResults));
    assert_eq!(error.user_message(), "No matching responses found.");
  }

  #[tokio::test]
  async fn test_summarizer_failure_is_reported() {
    let mut summarizer = MockSummarizer::new();
    summarizer
      .expect_summarize()
      .returning(|_, _| Err(LanguageModelError::status(500, "internal")));

    let analyst = Analyst::new(retriever(vec![index_match("a", "fine")]), Arc::new(summarizer));
    let error = analyst.answer("anything").await.unwrap_err();
    assert!(matches!(error, AnalystError::Summarize(_)));
  }
}
