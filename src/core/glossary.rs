//! In-memory term glossary
//!
//! Serves both as the known-terms source for eligibility and as a local
//! lookup service. Keys are stored normalized.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

use crate::core::lookup::{KnownTerms, LookupService};
use crate::core::selection::normalize_term;
use crate::shared::error::{AppError, AppResult};
use crate::shared::types::ExplanationRecord;

#[derive(Debug, Clone, Default)]
pub struct TermGlossary {
    entries: HashMap<String, ExplanationRecord>,
}

fn record(simple: &str, detailed: &str, expert: &str, related: &[&str], category: &str) -> ExplanationRecord {
    ExplanationRecord {
        simple: simple.to_string(),
        detailed: detailed.to_string(),
        expert: expert.to_string(),
        related: related.iter().map(|s| s.to_string()).collect(),
        category: category.to_string(),
    }
}

impl TermGlossary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Glossary seeded with the bundled cardiology entries
    pub fn builtin() -> Self {
        let mut glossary = Self::new();
        glossary.insert(
            "hemodynamic",
            record(
                "Related to blood flow and pressure in your circulatory system.",
                "Hemodynamic refers to the physical properties that govern blood flow through the cardiovascular system, including pressure, flow rate, and resistance.",
                "Hemodynamic parameters include cardiac output, systemic vascular resistance, central venous pressure, and mean arterial pressure, all crucial for maintaining adequate tissue perfusion.",
                &["cardiac output", "blood pressure", "circulation"],
                "cardiology",
            ),
        );
        glossary.insert(
            "myocardial infarction",
            record(
                "Heart attack - when blood flow to part of the heart muscle is blocked.",
                "Myocardial infarction occurs when coronary artery blockage prevents oxygen-rich blood from reaching heart muscle, causing tissue death.",
                "MI results from coronary thrombosis, typically due to atherosclerotic plaque rupture, leading to cardiomyocyte necrosis and potential complications including arrhythmias, heart failure, and mechanical complications.",
                &["coronary artery", "atherosclerosis", "cardiac enzymes"],
                "cardiology",
            ),
        );
        glossary.insert(
            "bradycardia",
            record(
                "Slow heart rate, usually below 60 beats per minute.",
                "Bradycardia is a slower than normal heart rate, which can be normal in athletes or indicate underlying cardiac conduction problems.",
                "Bradycardia may result from SA node dysfunction, AV blocks, or increased vagal tone. Clinical significance depends on hemodynamic stability and underlying etiology.",
                &["heart rate", "conduction system", "arrhythmia"],
                "cardiology",
            ),
        );
        glossary.insert(
            "electrocardiogram",
            record(
                "A test that records the electrical activity of your heart, also called an ECG or EKG.",
                "An electrocardiogram measures the electrical impulses that cause your heart to beat, helping diagnose heart rhythm problems and damage.",
                "ECG records cardiac electrical activity via surface electrodes, displaying P waves (atrial depolarization), QRS complexes (ventricular depolarization), and T waves (ventricular repolarization).",
                &["cardiac rhythm", "heart block", "ST elevation"],
                "cardiology",
            ),
        );
        glossary
    }

    /// Parse a JSON object mapping terms to explanation records
    pub fn from_json_str(json: &str) -> AppResult<Self> {
        let raw: HashMap<String, ExplanationRecord> = serde_json::from_str(json)?;
        let mut glossary = Self::new();
        for (term, record) in raw {
            glossary.insert(&term, record);
        }
        Ok(glossary)
    }

    pub async fn load(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path).await
            .map_err(|e| AppError::Io(format!("Failed to read glossary {}: {}", path.display(), e)))?;
        let glossary = Self::from_json_str(&content)?;
        log::info!("[TermGlossary] Loaded {} terms from {}", glossary.len(), path.display());
        Ok(glossary)
    }

    /// Add or replace an entry. Empty keys are ignored.
    pub fn insert(&mut self, term: &str, record: ExplanationRecord) {
        let key = normalize_term(term);
        if key.is_empty() {
            log::warn!("[TermGlossary] Ignoring entry with empty term");
            return;
        }
        self.entries.insert(key, record);
    }

    /// Merge another glossary in; its entries win on conflict
    pub fn extend(&mut self, other: TermGlossary) {
        self.entries.extend(other.entries);
    }

    pub fn get(&self, term: &str) -> Option<&ExplanationRecord> {
        self.entries.get(&normalize_term(term))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stand-in record for eligible terms the glossary has no entry for
    pub fn placeholder(term: &str) -> ExplanationRecord {
        ExplanationRecord {
            simple: format!("{} is a medical term. (This would be explained by AI in the real app)", term),
            detailed: format!("{} is a medical term. (Detailed explanation would be provided by AI in the real app)", term),
            expert: format!("{} is a medical term. (Expert-level explanation would be provided by AI in the real app)", term),
            related: Vec::new(),
            category: "general".to_string(),
        }
    }
}

impl KnownTerms for TermGlossary {
    fn has_entry(&self, term: &str) -> bool {
        self.entries.contains_key(term) || self.get(term).is_some()
    }
}

#[async_trait]
impl LookupService for TermGlossary {
    async fn lookup(&self, term: &str) -> AppResult<ExplanationRecord> {
        match self.get(term) {
            Some(record) => Ok(record.clone()),
            None => {
                log::debug!("[TermGlossary] No entry for '{}', using placeholder", term);
                Ok(Self::placeholder(term))
            }
        }
    }
}
