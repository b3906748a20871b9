//! Query expansion: one user question becomes several search queries

use async_trait::async_trait;
use serde_json::Value;

use super::language_model::LanguageModelError;
use super::retrieval::RetrievalError;

/// Upper bound on expanded queries per search
pub const MAX_EXPANDED_QUERIES: usize = 10;

/// Produces diversified search queries for a question. The output is returned
/// raw; `expansion_from_value` decides whether it is usable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryRewriter: Send + Sync {
  async fn rewrite(&self, query: &str) -> Result<Value, LanguageModelError>;
}

/// Validate rewriter output.
///
/// Accepts a bare list or `{"queries": [...]}`. Empty or null output is
/// `EmptyExpansion`; anything that is not a list, or a list without a
/// single string in it, is `MalformedExpansion`. Entries beyond `max_queries`
/// are dropped. Individual non-string entries are kept here and skipped
/// when searching.
pub fn expansion_from_value(value: Value, max_queries: usize) -> Result<Vec<Value>, RetrievalError> {
  let entries = match value {
    Value::Null => return Err(RetrievalError::EmptyExpansion),
    Value::Array(entries) => entries,
    Value::Object(mut object) => match object.remove("queries") {
      Some(Value::Array(entries)) => entries,
      Some(Value::Null) | None => return Err(RetrievalError::EmptyExpansion),
      Some(other) => return Err(RetrievalError::malformed(format!("queries is {}", kind(&other)))),
    },
    other => return Err(RetrievalError::malformed(format!("expected a list, got {}", kind(&other)))),
  };

  if entries.is_empty() {
    return Err(RetrievalError::EmptyExpansion);
  }
  if !entries.iter().any(Value::is_string) {
    return Err(RetrievalError::malformed("no query strings in expansion"));
  }

  let mut entries = entries;
  if entries.len() > max_queries {
    bentley::verbose!("Expansion returned {} queries, keeping {max_queries}", entries.len());
    entries.truncate(max_queries);
  }
  Ok(entries)
}

fn kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "a list",
    Value::Object(_) => "an object",
  }
}
