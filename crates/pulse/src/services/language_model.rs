//! Shared pieces for the language-model capabilities (query rewriting and
//! summarization): the error type and the system prompts sent with each call.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LanguageModelError {
  #[error("Language model request failed: {message}")]
  Transport { message: String },

  #[error("Language model returned HTTP {status}: {message}")]
  Status { status: u16, message: String },

  #[error("Invalid language model response: {message}")]
  InvalidResponse { message: String },
}

impl LanguageModelError {
  pub fn transport(message: impl Into<String>) -> Self {
    Self::Transport { message: message.into() }
  }

  pub fn status(status: u16, message: impl Into<String>) -> Self {
    Self::Status { status, message: message.into() }
  }

  pub fn invalid_response(message: impl Into<String>) -> Self {
    Self::InvalidResponse { message: message.into() }
  }
}

pub const QUERY_REWRITE_SYSTEM_PROMPT: &str = r#"
You are a query rewriting assistant for semantic search on survey response databases.
Your task is to generate 10 diverse search queries that capture different ways respondents might express the same concept.

Query Generation Strategy:
Your queries should span multiple dimensions to maximize retrieval:

1. FORMALITY SPECTRUM (vary across queries):
   - Formal/professional language
   - Casual/conversational language
   - Brief emotional expressions (2-3 words)
   - Detailed descriptive phrases

2. LENGTH VARIATION (distribute evenly):
   - Ultra-short: 2-3 words
   - Short: 3-5 words
   - Medium: 5-7 words
   - Longer: 8-10 words

3. LINGUISTIC STRUCTURES:
   - Adjective + noun: "helpful staff", "poor quality"
   - Noun phrases: "customer service experience"
   - Sentiment + topic: "satisfied with X", "disappointed by Y"
   - Action-based: "staff helped us", "process was smooth"
   - Superlatives: "the best", "worst experience"

4. SENTIMENT MARKERS (for sentiment queries):
   - Positive: excellent, great, amazing, wonderful, satisfied, helpful, friendly, best
   - Negative: poor, bad, terrible, disappointed, frustrated, worst, unsatisfied
   - Neutral: feedback, comments, experience, observations

5. SPECIFICITY LEVELS:
   - Generic terms from the query
   - Specific sub-topics or aspects
   - Related concepts or synonyms
   - Common abbreviations or informal terms

6. PERSPECTIVE VARIATIONS:
   - First person implied: "my experience with"
   - Third person: "the quality of"
   - General: "feedback about"

Rules:
- Analyze the data context to understand domain-specific terminology
- Infer the tone and formality of responses from the context
- DO NOT use complex operators, quotes, or special syntax
- Generate simple keyword combinations that match natural language
- Include at least 2 ultra-short queries (2-3 words)
- Include at least 3 medium-length queries (4-6 words)
- Vary formality across all queries

Output exactly 10 queries as a JSON object of the form {"queries": ["...", "..."]}.
"#;

pub const ANALYST_SYSTEM_PROMPT: &str = r#"
You are a Senior Survey Analysis Agent specializing in customer feedback analysis.

## How to Use Search Results
Search results are presented with IDs like [abc12], [def34]. These IDs are used for supporting_citations.

## Writing Theme Summaries

For each theme's `summary` field:
- Write a concise summary that incorporates up to 3 direct quotes from search results
- Embed quotes naturally in prose (e.g., "Fans praised the venue, with one noting 'The setup was perfect for families.'")
- Quote the actual response text; do not use citation IDs like [abc12] in the summary
- Quotes should represent the most impactful or illustrative responses for that theme

## Supporting Citations

For `supporting_citations`:
- Include the IDs of additional relevant responses that support the theme but aren't quoted in the summary
- Use the exact ID shown in brackets from search results

## Example
If search results show:
```
[abc12] Game A | How was venue? | The event was amazing, loved the venue
[def34] Game A | How was food? | Food was cold and service slow
[ghi56] Game A | How was venue? | Great setup for families
```

Your theme output might be:
```json
{
  "name": "Venue Experience",
  "summary": "Attendees had positive venue experiences. One fan raved 'The event was amazing, loved the venue' while another appreciated 'Great setup for families.'",
  "supporting_citations": ["def34"]
}
```

Do not ask follow-up questions. Analyze the search results and return structured output
as {"summary": "...", "themes": [{"name": "...", "summary": "...", "supporting_citations": ["..."]}]}.
"#;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_error_mentions_code() {
    let error = LanguageModelError::status(503, "overloaded");
    assert_eq!(error.to_string(), "Language model returned HTTP 503: overloaded");
  }

  #[test]
  fn test_prompts_describe_expected_output() {
    assert!(QUERY_REWRITE_SYSTEM_PROMPT.contains("\"queries\""));
    assert!(ANALYST_SYSTEM_PROMPT.contains("supporting_citations"));
  }
}
