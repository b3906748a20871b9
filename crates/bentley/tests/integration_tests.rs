use bentley::*;

#[test]
fn test_basic_logging_functions() {
  // Test that basic logging functions can be called without panicking
  info("Test info message");
  warn("Test warning message");
  error("Test error message");
  debug("Test debug message");
  verbose("Test verbose message");
  success("Test success message");
}

#[test]
fn test_multiline_messages() {
  let multiline_msg = "First line\nSecond line\nThird line";
  info(multiline_msg);
  warn(multiline_msg);
  error(multiline_msg);
  debug(multiline_msg);
  success(multiline_msg);
}

#[test]
fn test_macros_accept_format_arguments() {
  let processed = 3;
  let failed = 1;
  bentley::info!("processed {processed} rows, {failed} failed");
  bentley::warn!("{} of {} rows failed", failed, processed + failed);
  bentley::event!(Level::Info, "elapsed {:.1}s", 0.25);
}

#[test]
fn test_render_event_contains_message() {
  let lines = render_event(Level::Success, "ingestion finished\n3 rows");
  assert_eq!(lines.len(), 2);
  assert!(lines[0].contains("ingestion finished"));
  assert!(lines[1].contains("3 rows"));
}

#[test]
fn test_banner_line() {
  assert_eq!(banner_line(5, '~'), "~~~~~");
  assert_eq!(banner_line(0, '='), "");
}

#[test]
fn test_as_banner_wraps_message() {
  use std::cell::RefCell;

  let captured = RefCell::new(Vec::new());
  as_banner(|line| captured.borrow_mut().push(line.to_string()), "hello", Some(3), Some('*'));

  assert_eq!(captured.into_inner(), vec!["***", "hello", "***"]);
}
