//! Heuristic extraction of product search criteria from free text.
//!
//! Three independent matchers run over the raw user utterance: category,
//! price ceiling and product-type keyword. None of them depends on the
//! others or on any state, so [`extract`] is deterministic for a given input.

use regex::Regex;
use std::sync::LazyLock;

use cartbot_core::types::SearchCriteria;

/// Closed set of catalog categories recognised in user text.
pub const CATEGORIES: &[&str] = &["electronics", "books", "clothing", "home", "sports", "toys"];

/// Closed set of product-type keywords used as the free-text query.
pub const PRODUCT_KEYWORDS: &[&str] = &["laptop", "phone", "book", "shirt", "etc"];

// =============================================================================
// Compiled patterns (compiled once, reused across calls)
// =============================================================================

fn alternation(words: &[&str]) -> String {
    let alts: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    format!(r"(?i)(?:{})", alts.join("|"))
}

static CATEGORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&alternation(CATEGORIES)).expect("Invalid category regex"));

static PRODUCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&alternation(PRODUCT_KEYWORDS)).expect("Invalid product regex"));

static MAX_PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:under|below|less than)\s?\$?(\d+)").expect("Invalid price regex")
});

// =============================================================================
// Extractors
// =============================================================================

/// First category keyword in `text`, lower-cased.
pub fn extract_category(text: &str) -> Option<String> {
    CATEGORY_RE
        .find(text)
        .map(|m| m.as_str().to_lowercase())
}

/// Integer following the first "under", "below" or "less than".
///
/// A number too large for `i64` yields `None`. Zero is passed through.
pub fn extract_max_price(text: &str) -> Option<i64> {
    let caps = MAX_PRICE_RE.captures(text)?;
    let digits = caps.get(1)?.as_str();
    match digits.parse::<i64>() {
        Ok(price) => Some(price),
        Err(e) => {
            tracing::debug!(digits, error = %e, "Price ceiling out of range, ignoring");
            None
        }
    }
}

/// First product-type keyword in `text`, exactly as the user typed it.
pub fn extract_query_term(text: &str) -> Option<String> {
    PRODUCT_RE.find(text).map(|m| m.as_str().to_string())
}

/// Derive search criteria from a user utterance.
pub fn extract(text: &str) -> SearchCriteria {
    SearchCriteria {
        query: extract_query_term(text),
        category: extract_category(text),
        max_price: extract_max_price(text),
    }
}

// =============================================================================
// Tests
// =============================================================================
