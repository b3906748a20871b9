//! Pulse - Survey Response Retrieval
//!
//! Turns free-text survey answers into searchable vectors and answers
//! questions over them: each question is expanded into several search
//! queries, every query returns only responses the earlier ones did not, and
//! the ranked results carry short citation ids that a summary can point back
//! to.
//!
//! The embedding model, the vector index and the language model are external
//! services reached through the traits in [`services`]; [`clients`] holds
//! their HTTP adapters.

pub mod cli;
pub mod clients;
pub mod config;
pub mod models;
pub mod services;
