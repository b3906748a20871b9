use anyhow::{anyhow, Context, Result};
use colored::*;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::display::{display_analysis, display_ingest_report};
use super::input::{read_rows, source_name_for};
use crate::clients::{build_http_client, HttpEmbeddingModel, HttpLanguageModel, HttpVectorIndex};
use crate::config::Settings;
use crate::services::analyst::Analyst;
use crate::services::embeddings::EmbeddingGenerator;
use crate::services::ingestion::IngestionPipeline;
use crate::services::retrieval::{MultiQueryRetriever, RetrievalOptions};
use crate::services::vector_index::VectorIndexGateway;

/// Long-lived clients, built once per process and shared by every command
pub struct Runtime {
  generator: Arc<EmbeddingGenerator>,
  gateway: Arc<VectorIndexGateway>,
  language_model: Arc<HttpLanguageModel>,
}

impl Runtime {
  pub fn new(settings: &Settings) -> Result<Self> {
    let client = build_http_client(settings.http_timeout()).context("Failed to create HTTP client")?;

    let model = HttpEmbeddingModel::new(
      client.clone(),
      settings.embedding_url.as_str(),
      settings.embedding_model.as_str(),
      settings.embedding_dimension,
    );
    let generator = EmbeddingGenerator::new(Arc::new(model), settings.embedding_dimension)
      .with_retry_policy(settings.retry_policy())
      .with_detailed_logs(settings.detailed_logs);

    let index = HttpVectorIndex::new(
      client.clone(),
      settings.index_url.as_str(),
      settings.vector_bucket.as_str(),
      settings.vector_index.as_str(),
    );

    Ok(Self {
      generator: Arc::new(generator),
      gateway: Arc::new(VectorIndexGateway::new(Arc::new(index))),
      language_model: Arc::new(HttpLanguageModel::new(client, settings.llm_url.as_str())),
    })
  }

  pub fn pipeline(&self) -> IngestionPipeline {
    IngestionPipeline::new(self.generator.clone(), self.gateway.clone())
  }

  pub fn retriever(&self, options: RetrievalOptions) -> MultiQueryRetriever {
    MultiQueryRetriever::new(self.language_model.clone(), self.generator.clone(), self.gateway.clone())
      .with_options(options)
  }

  pub fn analyst(&self, options: RetrievalOptions) -> Analyst {
    Analyst::new(Arc::new(self.retriever(options)), self.language_model.clone())
  }
}

/// Parse a `field=value` metadata filter
pub fn parse_filter(raw: &str) -> Result<(String, String)> {
  let (field, value) =
    raw.split_once('=').ok_or_else(|| anyhow!("Filter '{raw}' must look like field=value"))?;
  let field = field.trim();
  if field.is_empty() {
    return Err(anyhow!("Filter '{raw}' has an empty field name"));
  }
  Ok((field.to_string(), value.trim().to_string()))
}

pub fn retrieval_options(top_k: usize, filters: Vec<(String, String)>) -> RetrievalOptions {
  RetrievalOptions {
    top_k_per_query: top_k,
    filters: filters.into_iter().collect::<BTreeMap<_, _>>(),
    ..RetrievalOptions::default()
  }
}

pub async fn ingest(
  runtime: &Runtime,
  file: &Path,
  source: Option<String>,
  start_row: usize,
  end_row: Option<usize>,
  max_rows: Option<usize>,
) -> Result<()> {
  let source_name = match source {
    Some(name) => name,
    None => source_name_for(file)?,
  };
  let rows = read_rows(file, start_row, end_row)?;
  let max_rows = max_rows.unwrap_or(rows.len());

  bentley::announce(&format!("Ingesting {} rows of {source_name} from row {start_row}", rows.len()));
  let report = runtime.pipeline().ingest(&rows, &source_name, max_rows, start_row).await?;

  display_ingest_report(&report);
  Ok(())
}

pub async fn search(runtime: &Runtime, query: &str, options: RetrievalOptions) -> Result<()> {
  match runtime.retriever(options).retrieve(query).await {
    Ok(retrieval) => println!("{}", retrieval.formatted),
    Err(e) => println!("{}", e.user_message().yellow()),
  }
  Ok(())
}

pub async fn ask(runtime: &Runtime, query: &str, options: RetrievalOptions, json: bool) -> Result<()> {
  let report = match runtime.analyst(options).answer(query).await {
    Ok(report) => report,
    Err(e) => {
      println!("{}", e.user_message().yellow());
      return Ok(());
    }
  };

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    display_analysis(&report);
  }
  Ok(())
}

pub async fn purge(runtime: &Runtime, source: &str, max_count: usize) -> Result<()> {
  let deleted = runtime.gateway.purge_source(source, max_count).await;
  println!("{} Deleted {} vectors for {}", "✓".green(), deleted, source.cyan());
  Ok(())
}
