//! Basket Suggestion Engine
//!
//! Proposes goods to add to a basket. Three strategies share one query surface:
//! exact association statistics over the corpus, lookup in the frequent itemset
//! index, and the habits of the employee serving the check.

mod engine;
mod matching;
mod types;

pub use engine::SuggestionEngine;
pub use matching::{collect_candidates, is_subsequence};
pub use types::*;

use crate::errors::DomainError;

/// Result type for suggestion operations
pub type SuggestionResult<T> = Result<T, DomainError>;

/// Exact suggestions need confidence strictly above this
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.05;

/// Maximum suggestions to return
pub const DEFAULT_MAX_SUGGESTIONS: usize = 10;

/// Indexed scans stop once this many distinct candidates are collected
pub const DEFAULT_CANDIDATE_CAP: usize = 100;
