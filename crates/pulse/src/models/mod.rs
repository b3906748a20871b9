//! Data models shared by ingestion and retrieval

pub mod analysis;
pub mod search;
pub mod survey;
