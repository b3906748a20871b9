//! Query-time results

use serde::{Deserialize, Serialize};

use super::survey::ResponseMetadata;

/// One nearest-neighbor match, derived at query time and never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
  pub uid: String,
  /// `1 - distance`; higher is more similar
  pub similarity_score: f64,
  pub text_answer: String,
  pub question: String,
  pub event_name: String,
  pub event_code: String,
  pub question_type: String,
  pub nps_group: String,
  pub response_id: String,
  pub csv_source: String,
}

impl SearchHit {
  /// Convert an index match into a hit, turning distance into similarity
  pub fn from_match(metadata: ResponseMetadata, distance: f64) -> Self {
    Self {
      uid: metadata.uid,
      similarity_score: 1.0 - distance,
      text_answer: metadata.text_answer,
      question: metadata.question,
      event_name: metadata.event_name,
      event_code: metadata.event_code,
      question_type: metadata.question_type,
      nps_group: metadata.nps_group,
      response_id: metadata.response_id,
      csv_source: metadata.csv_source,
    }
  }
}

/// A hit labelled with a short id that a summarizer can cite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitableResult {
  pub citation_id: String,
  #[serde(flatten)]
  pub hit: SearchHit,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_distance_converts_to_similarity() {
    let metadata = ResponseMetadata { uid: "abc1234".to_string(), ..Default::default() };
    let hit = SearchHit::from_match(metadata, 0.25);

    assert_eq!(hit.uid, "abc1234");
    assert!((hit.similarity_score - 0.75).abs() < f64::EPSILON);
  }

  #[test]
  fn test_citable_result_serializes_flat() {
    let hit = SearchHit::from_match(ResponseMetadata::default(), 0.5);
    let citable = CitableResult { citation_id: "Ab3x9".to_string(), hit };
    let value = serde_json::to_value(&citable).unwrap();

    assert_eq!(value["citation_id"], "Ab3x9");
    assert_eq!(value["similarity_score"], 0.5);
  }
}
