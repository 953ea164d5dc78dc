//! The single gate deciding whether a string may be placed into generated
//! statement text as a structural name.
//!
//! Table and column names always flow through [`validate_identifier`]
//! before interpolation; literal values go through `store::params` instead.

use lazy_static::lazy_static;
use regex::Regex;

use super::errors::CleaningError;

lazy_static! {
    // Letters, digits and underscores only, and no leading digit so every
    // accepted name also round-trips through the predicate tokenizer's word
    // grammar unchanged.
    static ref IDENTIFIER_RE: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid");
}

/// Return the identifier unchanged if it matches the grammar in full.
pub fn validate_identifier(raw: &str) -> Result<&str, CleaningError> {
    if IDENTIFIER_RE.is_match(raw) {
        Ok(raw)
    } else {
        Err(CleaningError::Validation(format!(
            "illegal identifier (letters, digits and underscores only, not starting with a digit): {}",
            raw
        )))
    }
}

/// Backtick-quote a validated identifier for statement text.
pub fn quote(name: &str) -> String {
    format!("`{}`", name)
}
