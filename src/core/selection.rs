//! Selection capture and normalization
//!
//! Turns the host's ambient selection into an explicit `SelectionSnapshot`
//! and derives the normalized lookup key from it.

pub mod extractor;
pub mod normalize;

pub use extractor::{capture_selection, DEFAULT_MAX_TOKENS};
pub use normalize::normalize_term;
