//! Metadata filter expressions for index queries
//!
//! Filters stay a typed tree until they reach an index adapter, which renders
//! them to whatever syntax the service expects. `to_json` produces the
//! operator style used by the HTTP index (`$and`, `$nin`).

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
  Equals { field: String, value: String },
  NotIn { field: String, values: Vec<String> },
  And(Vec<Filter>),
}

impl Filter {
  pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
    Self::Equals { field: field.into(), value: value.into() }
  }

  pub fn not_in(field: impl Into<String>, values: Vec<String>) -> Self {
    Self::NotIn { field: field.into(), values }
  }

  /// Conjoin clauses: none yields no filter, a single clause is passed unwrapped
  pub fn compose(mut clauses: Vec<Filter>) -> Option<Filter> {
    match clauses.len() {
      0 => None,
      1 => clauses.pop(),
      _ => Some(Filter::And(clauses)),
    }
  }

  /// Equality clauses for every non-empty `filters` value, plus `uid NOT IN exclude_uids`
  pub fn for_query(filters: &BTreeMap<String, String>, exclude_uids: &[String]) -> Option<Filter> {
    let mut clauses: Vec<Filter> = filters
      .iter()
      .filter(|(_, value)| !value.is_empty())
      .map(|(field, value)| Filter::equals(field.as_str(), value.as_str()))
      .collect();

    if !exclude_uids.is_empty() {
      clauses.push(Filter::not_in("uid", exclude_uids.to_vec()));
    }

    Self::compose(clauses)
  }

  pub fn to_json(&self) -> Value {
    match self {
      Filter::Equals { field, value } => {
        let mut object = Map::new();
        object.insert(field.clone(), Value::String(value.clone()));
        Value::Object(object)
      }
      Filter::NotIn { field, values } => {
        let mut object = Map::new();
        object.insert(field.clone(), json!({ "$nin": values }));
        Value::Object(object)
      }
      Filter::And(clauses) => {
        json!({ "$and": clauses.iter().map(Filter::to_json).collect::<Vec<_>>() })
      }
    }
  }

  /// Evaluate against a metadata object; missing fields never equal anything
  pub fn matches(&self, metadata: &Value) -> bool {
    match self {
      Filter::Equals { field, value } => {
        metadata.get(field).and_then(Value::as_str).map(|v| v == value).unwrap_or(false)
      }
      Filter::NotIn { field, values } => metadata
        .get(field)
        .and_then(Value::as_str)
        .map(|v| !values.iter().any(|excluded| excluded == v))
        .unwrap_or(true),
      Filter::And(clauses) => clauses.iter().all(|clause| clause.matches(metadata)),
    }
  }
}
