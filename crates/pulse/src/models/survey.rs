//! Survey rows and the vector records built from them

use serde::{Deserialize, Deserializer, Serialize};

/// Per-field character budgets that keep a record under the index's metadata ceiling
pub const QUESTION_CHAR_LIMIT: usize = 300;
pub const TEXT_ANSWER_CHAR_LIMIT: usize = 1500;
pub const EVENT_NAME_CHAR_LIMIT: usize = 100;

/// Question type value that marks a free-text answer
pub const FREE_TEXT_QUESTION_TYPE: &str = "Text";

/// One row of a survey export. Column names follow the export's upper-case headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyRow {
  #[serde(rename = "TEXT_ANSWER", default, deserialize_with = "scalar_as_string")]
  pub text_answer: Option<String>,
  #[serde(rename = "QUESTION", default, deserialize_with = "scalar_as_string")]
  pub question: Option<String>,
  #[serde(rename = "EVENTNAME", default, deserialize_with = "scalar_as_string")]
  pub event_name: Option<String>,
  #[serde(rename = "EVENTCODE", default, deserialize_with = "scalar_as_string")]
  pub event_code: Option<String>,
  #[serde(rename = "QUESTION_TYPE", default, deserialize_with = "scalar_as_string")]
  pub question_type: Option<String>,
  #[serde(rename = "NPS_GROUP", default, deserialize_with = "scalar_as_string")]
  pub nps_group: Option<String>,
  #[serde(rename = "RESPONSEID", default, deserialize_with = "scalar_as_string")]
  pub response_id: Option<String>,
}

impl SurveyRow {
  /// Build a free-text row with just an answer, mostly useful in tests and tools
  pub fn free_text(answer: impl Into<String>) -> Self {
    Self {
      text_answer: Some(answer.into()),
      question_type: Some(FREE_TEXT_QUESTION_TYPE.to_string()),
      ..Self::default()
    }
  }

  /// The answer text, if the row has a non-empty one
  pub fn text(&self) -> Option<&str> {
    self.text_answer.as_deref().filter(|t| !t.is_empty())
  }

  pub fn is_free_text(&self) -> bool {
    self.question_type.as_deref() == Some(FREE_TEXT_QUESTION_TYPE)
  }

  /// Metadata stored next to the vector, with every bounded field truncated
  pub fn metadata(&self, uid: String, source_name: &str) -> ResponseMetadata {
    ResponseMetadata {
      uid,
      text_answer: truncate_chars(field(&self.text_answer), TEXT_ANSWER_CHAR_LIMIT),
      question: truncate_chars(field(&self.question), QUESTION_CHAR_LIMIT),
      event_name: truncate_chars(field(&self.event_name), EVENT_NAME_CHAR_LIMIT),
      event_code: field(&self.event_code).to_string(),
      question_type: field(&self.question_type).to_string(),
      nps_group: field(&self.nps_group).to_string(),
      response_id: field(&self.response_id).to_string(),
      csv_source: source_name.to_string(),
    }
  }
}

fn field(value: &Option<String>) -> &str {
  value.as_deref().unwrap_or("")
}

/// Accept strings, numbers and booleans for any column; null becomes `None`
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<serde_json::Value>::deserialize(deserializer)?;
  Ok(match value {
    None | Some(serde_json::Value::Null) => None,
    Some(serde_json::Value::String(s)) => Some(s),
    Some(other) => Some(other.to_string()),
  })
}

/// Keep at most `limit` characters (not bytes) of `value`
pub fn truncate_chars(value: &str, limit: usize) -> String {
  match value.char_indices().nth(limit) {
    Some((byte_index, _)) => value[..byte_index].to_string(),
    None => value.to_string(),
  }
}

/// Deterministic key for a row: `{source_name}_{absolute_row_index}`
pub fn vector_key(source_name: &str, absolute_index: usize) -> String {
  format!("{source_name}_{absolute_index}")
}

/// Metadata attached to every vector in the index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
  #[serde(default)]
  pub uid: String,
  #[serde(default)]
  pub text_answer: String,
  #[serde(default)]
  pub question: String,
  #[serde(default)]
  pub event_name: String,
  #[serde(default)]
  pub event_code: String,
  #[serde(default)]
  pub question_type: String,
  #[serde(default)]
  pub nps_group: String,
  #[serde(default)]
  pub response_id: String,
  #[serde(default)]
  pub csv_source: String,
}

/// A (key, vector, metadata) triple ready for upsert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
  pub key: String,
  pub embedding: Vec<f32>,
  pub metadata: ResponseMetadata,
}
