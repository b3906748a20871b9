//! Survey row files: one JSON object per line, export column names

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::models::survey::SurveyRow;

/// Read rows `[start_row, end_row)` of a JSON-lines file. Blank lines are not
/// rows. An `end_row` past the end of the file reads to the end.
pub fn read_rows(path: &Path, start_row: usize, end_row: Option<usize>) -> Result<Vec<SurveyRow>> {
  if let Some(end) = end_row {
    if end < start_row {
      return Err(anyhow!("end row {end} is before start row {start_row}"));
    }
  }

  let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
  let mut rows = Vec::new();
  let mut row_index = 0;

  for (line_number, line) in BufReader::new(file).lines().enumerate() {
    let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
    if line.trim().is_empty() {
      continue;
    }
    if end_row.is_some_and(|end| row_index >= end) {
      break;
    }
    if row_index >= start_row {
      let row: SurveyRow = serde_json::from_str(&line)
        .with_context(|| format!("{}:{}: invalid survey row", path.display(), line_number + 1))?;
      rows.push(row);
    }
    row_index += 1;
  }

  Ok(rows)
}

/// Source name for a file: its stem, so `eventA.jsonl` keys as `eventA_<n>`
pub fn source_name_for(path: &Path) -> Result<String> {
  path
    .file_stem()
    .and_then(|stem| stem.to_str())
    .filter(|stem| !stem.is_empty())
    .map(str::to_string)
    .ok_or_else(|| anyhow!("Cannot derive a source name from {}", path.display()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;
  use tempfile::NamedTempFile;

  fn rows_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
      writeln!(file, "{line}").unwrap();
    }
    file
  }

  #[test]
  fn test_reads_requested_range() {
    let file = rows_file(&[
      r#"{"TEXT_ANSWER":"zero"}"#,
      r#"{"TEXT_ANSWER":"one"}"#,
      "",
      r#"{"TEXT_ANSWER":"two"}"#,
      r#"{"TEXT_ANSWER":"three"}"#,
    ]);

    let rows = read_rows(file.path(), 1, Some(3)).unwrap();
    let answers: Vec<&str> = rows.iter().filter_map(|r| r.text()).collect();
    assert_eq!(answers, vec!["one", "two"]);
  }

  #[test]
  fn test_open_ended_range_reads_to_the_end() {
    let file = rows_file(&[r#"{"TEXT_ANSWER":"a"}"#, r#"{"TEXT_ANSWER":"b"}"#]);
    assert_eq!(read_rows(file.path(), 0, None).unwrap().len(), 2);
    assert_eq!(read_rows(file.path(), 1, Some(100)).unwrap().len(), 1);
  }

  #[test]
  fn test_malformed_line_reports_its_position() {
    let file = rows_file(&[r#"{"TEXT_ANSWER":"a"}"#, "not json"]);
    let error = read_rows(file.path(), 0, None).unwrap_err();
    assert!(format!("{error}").contains(":2:"));
  }

  #[test]
  fn test_malformed_lines_outside_the_range_are_ignored() {
    let file = rows_file(&["not json", r#"{"TEXT_ANSWER":"ok"}"#]);
    assert_eq!(read_rows(file.path(), 1, None).unwrap().len(), 1);
  }

  #[test]
  fn test_inverted_range_is_rejected() {
    let file = rows_file(&[]);
    assert!(read_rows(file.path(), 5, Some(2)).is_err());
  }

  #[test]
  fn test_source_name_is_file_stem() {
    assert_eq!(source_name_for(Path::new("/data/eventA.jsonl")).unwrap(), "eventA");
    assert!(source_name_for(Path::new("/")).is_err());
  }
}
