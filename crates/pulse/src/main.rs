use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use pulse::cli::commands::{self, Runtime};
use pulse::config::Settings;

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "Pulse - Survey Response Retrieval\nSemantic search and cited summaries over free-text survey answers")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), ", courtesy of Kernelle Software"))]
struct Cli {
  #[command(flatten)]
  settings: Settings,

  /// Show HTTP-level tracing
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

/// Options shared by the query commands
#[derive(Args)]
struct QueryOptions {
  /// Results requested per expanded query (the index caps this at 100)
  #[arg(long, default_value_t = 100)]
  top_k: usize,

  /// Metadata filter applied to every query, as field=value (repeatable)
  #[arg(long = "filter", value_parser = commands::parse_filter)]
  filters: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum Command {
  /// Embed the free-text answers of a JSON-lines survey export
  Ingest {
    /// Row file, one JSON object per line
    file: PathBuf,
    /// Source name used in vector keys (defaults to the file stem)
    #[arg(long)]
    source: Option<String>,
    /// First row to read; also the offset for vector keys
    #[arg(long, default_value_t = 0)]
    start_row: usize,
    /// Row to stop before
    #[arg(long)]
    end_row: Option<usize>,
    /// Cap on free-text rows embedded from this chunk
    #[arg(long)]
    max_rows: Option<usize>,
  },
  /// Run a multi-query search and print the citable result block
  Search {
    query: String,
    #[command(flatten)]
    options: QueryOptions,
  },
  /// Answer a question with themes and resolved citations
  Ask {
    query: String,
    #[command(flatten)]
    options: QueryOptions,
    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
  },
  /// Delete the vectors of one source
  Purge {
    source: String,
    /// Number of row keys to delete, starting from row 0
    #[arg(long, default_value_t = 1000)]
    max_count: usize,
  },
}

async fn handle(runtime: &Runtime, command: Command) -> Result<()> {
  match command {
    Command::Ingest { file, source, start_row, end_row, max_rows } => {
      commands::ingest(runtime, &file, source, start_row, end_row, max_rows).await
    }
    Command::Search { query, options } => {
      commands::search(runtime, &query, commands::retrieval_options(options.top_k, options.filters))
        .await
    }
    Command::Ask { query, options, json } => {
      let options = commands::retrieval_options(options.top_k, options.filters);
      commands::ask(runtime, &query, options, json).await
    }
    Command::Purge { source, max_count } => commands::purge(runtime, &source, max_count).await,
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("pulse=debug,reqwest=warn,hyper=warn,warn")
  } else {
    EnvFilter::new("pulse=warn,reqwest=error,hyper=error,error")
  };
  tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

  let runtime = Runtime::new(&cli.settings)?;
  handle(&runtime, cli.command).await
}
