//! Keyword & location analyzer.
//!
//! Turns free-text item reports into a set of high-signal lowercase tokens
//! and scores the distance between named areas. Both halves are pure and
//! deterministic; the matching engine is their only real consumer.
//!
//! Extraction contract:
//!   • strip punctuation, collapse whitespace, lowercase
//!   • drop stopwords (English + Kinyarwanda)
//!   • always retain color/brand lexicon tokens, any length
//!   • otherwise retain tokens of length ≥ 3
//!   • deduplicate, preserving first-seen order
//!   • empty input ⇒ empty set

mod lexicon;
mod location;
mod stopwords;

pub use lexicon::{is_brand, is_color, is_lexicon_token, BRANDS, COLORS};
pub use location::area_distance;
pub use stopwords::{is_stopword, STOPWORDS};

use crate::types::Category;

/// Minimum length for non-lexicon tokens.
const MIN_TOKEN_LEN: usize = 3;

/// Replace punctuation with spaces, keeping alphanumerics intact so model
/// names like "13 pro" and "a52" survive.
fn strip_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect()
}

/// Extract the keyword set from free text. The category hint is accepted for
/// parity with item ingest call sites; extraction itself is category-blind.
pub fn extract_keywords(text: &str, _category: Option<Category>) -> Vec<String> {
    let cleaned = strip_punctuation(&text.to_lowercase());

    let mut seen = Vec::new();
    for token in cleaned.split_whitespace() {
        if is_stopword(token) {
            continue;
        }
        if !is_lexicon_token(token) && token.chars().count() < MIN_TOKEN_LEN {
            continue;
        }
        if !seen.iter().any(|t| t == token) {
            seen.push(token.to_string());
        }
    }
    seen
}

/// Shared-token count between two keyword sets, for the overlap bonus.
pub fn keyword_overlap(a: &[String], b: &[String]) -> usize {
    a.iter().filter(|token| b.contains(token)).count()
}
