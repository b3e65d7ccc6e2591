//! Lookup collaborators
//!
//! The explanation source is opaque to the session: anything that can turn a
//! normalized term into an `ExplanationRecord` (or fail) plugs in here.

pub mod remote;

use async_trait::async_trait;
use std::sync::Arc;
use crate::shared::error::AppResult;
use crate::shared::types::ExplanationRecord;

pub use remote::RemoteLookupService;

/// Source of explanations. May be slow and may fail.
#[async_trait]
pub trait LookupService: Send + Sync {
    async fn lookup(&self, term: &str) -> AppResult<ExplanationRecord>;
}

/// Synchronous membership check consulted by the eligibility filter
pub trait KnownTerms: Send + Sync {
    fn has_entry(&self, term: &str) -> bool;
}

#[async_trait]
impl<T: LookupService + ?Sized> LookupService for Arc<T> {
    async fn lookup(&self, term: &str) -> AppResult<ExplanationRecord> {
        (**self).lookup(term).await
    }
}

impl<T: KnownTerms + ?Sized> KnownTerms for Arc<T> {
    fn has_entry(&self, term: &str) -> bool {
        (**self).has_entry(term)
    }
}

/// Known-terms source with no entries; eligibility then rests on heuristics alone
pub struct NoKnownTerms;

impl KnownTerms for NoKnownTerms {
    fn has_entry(&self, _term: &str) -> bool {
        false
    }
}

/// Generic explanation shown in place of content when a lookup fails
pub fn fallback_explanation(term: &str) -> ExplanationRecord {
    let message = format!("{} is a medical term. Explanation temporarily unavailable.", term);
    ExplanationRecord {
        simple: message.clone(),
        detailed: message.clone(),
        expert: message,
        related: Vec::new(),
        category: "general".to_string(),
    }
}
