//! Display formatting utilities for CLI output

use colored::*;

use crate::services::analyst::AnalysisReport;
use crate::services::ingestion::IngestReport;

/// Wrap text to fit within a specified width
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
  let mut lines = Vec::new();

  for paragraph in text.split('\n') {
    if paragraph.trim().is_empty() {
      lines.push(String::new());
      continue;
    }

    let mut current_line = String::new();
    for word in paragraph.split_whitespace() {
      if current_line.is_empty() {
        current_line = word.to_string();
      } else if current_line.chars().count() + 1 + word.chars().count() <= width {
        current_line.push(' ');
        current_line.push_str(word);
      } else {
        lines.push(std::mem::take(&mut current_line));
        current_line = word.to_string();
      }
    }

    if !current_line.is_empty() {
      lines.push(current_line);
    }
  }

  lines
}

pub fn display_ingest_report(report: &IngestReport) {
  println!("{} {}", "Source:".bold(), report.source_name.cyan());
  println!("  candidates        {}", report.candidates);
  println!("  already indexed   {}", report.skipped_existing);
  println!("  embedded          {}", report.processed.to_string().green());
  if report.failed > 0 {
    println!("  failed            {}", report.failed.to_string().red());
  } else {
    println!("  failed            0");
  }
  println!("  elapsed           {:.1}s ({:.1} rows/sec)", report.elapsed.as_secs_f64(), report.rows_per_second());
}

pub fn display_analysis(report: &AnalysisReport) {
  for line in wrap_text(&report.response.summary, 80) {
    println!("{line}");
  }

  for theme in &report.response.themes {
    println!();
    println!("{}", theme.name.bold().cyan());
    for line in wrap_text(&theme.summary, 78) {
      println!("  {line}");
    }
    for citation in &theme.supporting_citations {
      for (i, line) in wrap_text(&citation.excerpt, 74).iter().enumerate() {
        let marker = if i == 0 { "›" } else { " " };
        println!("    {} {}", marker.dimmed(), line.italic());
      }
    }
  }

  println!();
  println!(
    "{} {} cited of {} retrieved responses",
    "Citations:".bold(),
    report.cited_count.to_string().yellow(),
    report.search_results.len()
  );
}
