//! Short random identifiers for index records and citations

use rand::distr::{Alphanumeric, SampleString};
use std::collections::HashSet;

/// Length of the opaque `uid` stored with every vector
pub const UID_LENGTH: usize = 7;

/// Length of the ephemeral ids handed to the summarizer
pub const CITATION_ID_LENGTH: usize = 5;

/// Random `[A-Za-z0-9]` string of the given length
pub fn random_id(length: usize) -> String {
  Alphanumeric.sample_string(&mut rand::rng(), length)
}

/// Fresh uid for a new vector record. Index-wide uniqueness is not checked.
pub fn generate_uid() -> String {
  random_id(UID_LENGTH)
}

/// Hands out random ids that never repeat within one allocator
#[derive(Debug, Clone)]
pub struct IdAllocator {
  length: usize,
  issued: HashSet<String>,
}

impl IdAllocator {
  pub fn new(length: usize) -> Self {
    Self { length, issued: HashSet::new() }
  }

  pub fn for_citations() -> Self {
    Self::new(CITATION_ID_LENGTH)
  }

  /// Draw ids until one has not been issued before
  pub fn next_id(&mut self) -> String {
    loop {
      let candidate = random_id(self.length);
      if self.issued.insert(candidate.clone()) {
        return candidate;
      }
    }
  }

  pub fn issued(&self) -> usize {
    self.issued.len()
  }
}
