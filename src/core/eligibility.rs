//! Eligibility filtering
//!
//! Keeps incidental selections (punctuation, prose) from reaching the lookup
//! service: a term must look like domain vocabulary or be a known entry.

pub mod filter;
pub mod heuristics;

pub use filter::{is_eligible, EligibilityFilter, DEFAULT_MIN_TERM_LEN};
pub use heuristics::{
    medical_heuristics, ContainsRule, Heuristic, PatternRule, SuffixRule, TermHeuristic,
};
