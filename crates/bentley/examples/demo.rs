use bentley::*;

fn main() {
  announce("pulse ingestion demo");

  info("Checking for existing vectors...");
  verbose("Batch 1/3: 100 keys");
  debug("Rate limit hit for eventA_7, retry 1/5, waiting 1s...");
  warn("Validation error for eventA_9: input too long");
  error("Error uploading vectors: service unavailable");
  success("Uploaded 98 vectors");

  let multiline = "Embedding generation complete for eventA\n98/100 rows\n2 failed";
  info(multiline);

  bentley::event!(Level::Success, "Average speed: {:.1} rows/second", 12.5);

  flourish("done");
}
