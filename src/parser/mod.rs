pub mod extract;
pub mod fields;
pub mod segments;

use extract::ExtractionResult;

/// Two-pass pipeline: raw description → segments → extracted record.
pub fn process_description(raw: &str) -> ExtractionResult {
    extract::extract_all(segments::segments(raw))
}
