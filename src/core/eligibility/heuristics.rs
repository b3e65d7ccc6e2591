//! Pluggable "looks like a domain term" predicates
//!
//! Uses enum_dispatch for static dispatch over the closed set of rule kinds.

use enum_dispatch::enum_dispatch;
use regex::{Regex, RegexBuilder};
use crate::shared::error::AppResult;

#[enum_dispatch]
pub trait TermHeuristic: Send + Sync {
    /// Whether the (normalized) term satisfies this rule
    fn matches(&self, term: &str) -> bool;

    /// Human-readable form of the rule, for logs
    fn describe(&self) -> String;
}

/// Matches terms ending with a morphological suffix
#[derive(Debug, Clone)]
pub struct SuffixRule {
    suffix: String,
}

impl SuffixRule {
    pub fn new(suffix: &str) -> Self {
        Self { suffix: suffix.to_lowercase() }
    }
}

impl TermHeuristic for SuffixRule {
    fn matches(&self, term: &str) -> bool {
        term.to_lowercase().ends_with(&self.suffix)
    }

    fn describe(&self) -> String {
        format!("*{}", self.suffix)
    }
}

/// Matches terms containing a domain-indicative fragment anywhere
#[derive(Debug, Clone)]
pub struct ContainsRule {
    fragment: String,
}

impl ContainsRule {
    pub fn new(fragment: &str) -> Self {
        Self { fragment: fragment.to_lowercase() }
    }
}

impl TermHeuristic for ContainsRule {
    fn matches(&self, term: &str) -> bool {
        term.to_lowercase().contains(&self.fragment)
    }

    fn describe(&self) -> String {
        format!("*{}*", self.fragment)
    }
}

/// Case-insensitive regex rule, used for user-configured patterns
#[derive(Debug, Clone)]
pub struct PatternRule {
    regex: Regex,
}

impl PatternRule {
    pub fn new(pattern: &str) -> AppResult<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(1 << 20)
            .build()?;
        Ok(Self { regex })
    }
}

impl TermHeuristic for PatternRule {
    fn matches(&self, term: &str) -> bool {
        self.regex.is_match(term)
    }

    fn describe(&self) -> String {
        format!("/{}/i", self.regex.as_str())
    }
}

#[enum_dispatch(TermHeuristic)]
#[derive(Debug, Clone)]
pub enum Heuristic {
    Suffix(SuffixRule),
    Contains(ContainsRule),
    Pattern(PatternRule),
}

const MEDICAL_SUFFIXES: [&str; 8] = [
    "ology", // cardiology, neurology
    "itis",  // arthritis, hepatitis
    "osis",  // fibrosis, cirrhosis
    "pathy", // neuropathy, myopathy
    "emia",  // anemia, hyperemia
    "uria",  // hematuria, proteinuria
    "gram",  // electrocardiogram, mammogram
    "scopy", // endoscopy, colonoscopy
];

const MEDICAL_FRAGMENTS: [&str; 8] = [
    "cardia", // bradycardia, tachycardia
    "cardio", // cardiovascular
    "neuro",
    "gastro",
    "pulmon",
    "renal",
    "hepat",
    "dermat",
];

/// Built-in medical vocabulary heuristics
pub fn medical_heuristics() -> Vec<Heuristic> {
    MEDICAL_SUFFIXES
        .iter()
        .map(|s| Heuristic::from(SuffixRule::new(s)))
        .chain(MEDICAL_FRAGMENTS.iter().map(|f| Heuristic::from(ContainsRule::new(f))))
        .collect()
}
