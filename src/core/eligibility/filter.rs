use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

use super::heuristics::{medical_heuristics, Heuristic, PatternRule, TermHeuristic};
use crate::core::lookup::KnownTerms;
use crate::shared::error::AppResult;
use crate::shared::settings::LookupSettings;

/// Shortest term (in graphemes) ever considered for lookup
pub const DEFAULT_MIN_TERM_LEN: usize = 3;

/// Decides whether a normalized term is worth a lookup
#[derive(Debug, Clone)]
pub struct EligibilityFilter {
    heuristics: Vec<Heuristic>,
    min_len: usize,
}

impl EligibilityFilter {
    pub fn new(heuristics: Vec<Heuristic>, min_len: usize) -> Self {
        Self { heuristics, min_len }
    }

    /// Built-in medical heuristics with the default minimum length
    pub fn medical() -> Self {
        Self::new(medical_heuristics(), DEFAULT_MIN_TERM_LEN)
    }

    /// Medical heuristics plus any configured extra patterns
    pub fn from_settings(settings: &LookupSettings) -> AppResult<Self> {
        let mut filter = Self::medical();
        filter.min_len = settings.min_term_len;
        for pattern in &settings.extra_patterns {
            filter.heuristics.push(PatternRule::new(pattern)?.into());
        }
        Ok(filter)
    }

    pub fn with_heuristic(mut self, heuristic: impl Into<Heuristic>) -> Self {
        self.heuristics.push(heuristic.into());
        self
    }

    pub fn heuristics(&self) -> &[Heuristic] {
        &self.heuristics
    }

    pub fn matches_heuristics(&self, term: &str) -> bool {
        self.heuristics.iter().any(|h| h.matches(term))
    }

    pub fn is_eligible(&self, term: &str, known: &dyn KnownTerms) -> bool {
        // Terms below the minimum are never eligible, even if known
        if term.graphemes(true).count() < self.min_len {
            return false;
        }
        self.matches_heuristics(term) || known.has_entry(term)
    }
}

impl Default for EligibilityFilter {
    fn default() -> Self {
        Self::medical()
    }
}

static DEFAULT_FILTER: OnceLock<EligibilityFilter> = OnceLock::new();

/// Eligibility check with the built-in medical filter
pub fn is_eligible(term: &str, known: &dyn KnownTerms) -> bool {
    DEFAULT_FILTER
        .get_or_init(EligibilityFilter::medical)
        .is_eligible(term, known)
}
