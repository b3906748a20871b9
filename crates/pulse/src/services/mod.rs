pub mod analyst;
pub mod citations;
pub mod embeddings;
pub mod filter;
pub mod ids;
pub mod ingestion;
pub mod language_model;
pub mod retrieval;
pub mod rewrite;
pub mod vector_index;
