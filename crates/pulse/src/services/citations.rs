//! Maps citation ids chosen by the summarizer back to stored results

use crate::models::analysis::{AnalysisOutput, CitedResponse, Theme};
use crate::models::search::CitableResult;

use super::retrieval::RetrievalSession;

/// One `CitedResponse` per (theme, citation) pair whose id is found in
/// `results`. Unknown ids are dropped; the first result with a given id wins.
pub fn resolve(themes: &[Theme], results: &[CitableResult]) -> Vec<CitedResponse> {
  if results.is_empty() {
    return Vec::new();
  }

  themes
    .iter()
    .flat_map(|theme| {
      theme.supporting_citations.iter().filter_map(move |citation_id| {
        results.iter().find(|r| &r.citation_id == citation_id).map(|r| cite(theme, r))
      })
    })
    .collect()
}

/// Resolve every theme of `output` against all tables stored in `session`
pub fn resolve_citations(output: &AnalysisOutput, session: &RetrievalSession) -> Vec<CitedResponse> {
  let results: Vec<CitableResult> = session.results().cloned().collect();
  let cited = resolve(&output.themes, &results);

  let requested: usize = output.themes.iter().map(|t| t.supporting_citations.len()).sum();
  if cited.len() < requested {
    bentley::verbose!("Dropped {} unresolvable citations", requested - cited.len());
  }
  cited
}

fn cite(theme: &Theme, result: &CitableResult) -> CitedResponse {
  let hit = &result.hit;
  CitedResponse {
    theme: theme.name.clone(),
    citation_id: result.citation_id.clone(),
    response_id: hit.response_id.clone(),
    source_name: hit.csv_source.clone(),
    event_name: hit.event_name.clone(),
    response_text: hit.text_answer.clone(),
    question: hit.question.clone(),
    similarity_score: hit.similarity_score,
    excerpt: hit.text_answer.clone(),
  }
}
