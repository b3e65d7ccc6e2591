use std::sync::OnceLock;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::core::lookup::LookupService;
use crate::shared::error::{AppError, AppResult};
use crate::shared::types::ExplanationRecord;

// Shared so every service instance reuses one connection pool
static CLIENT: OnceLock<Client> = OnceLock::new();

fn get_client() -> &'static Client {
    CLIENT.get_or_init(|| {
        Client::builder()
            .user_agent(concat!("smart-lookup/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new())
    })
}

/// Explanation service backed by an HTTP endpoint serving
/// `ExplanationRecord` JSON at `{base_url}/terms/{term}`.
#[derive(Debug, Clone)]
pub struct RemoteLookupService {
    base_url: String,
}

impl RemoteLookupService {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn term_url(&self, term: &str) -> String {
        format!("{}/terms/{}", self.base_url, urlencoding::encode(term))
    }
}

#[async_trait]
impl LookupService for RemoteLookupService {
    async fn lookup(&self, term: &str) -> AppResult<ExplanationRecord> {
        let url = self.term_url(term);
        log::debug!("[RemoteLookup] GET {}", url);

        let response = get_client().get(&url).send().await.map_err(|e| {
            log::warn!("[RemoteLookup] Network error for '{}': {}", term, e);
            AppError::from(e)
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Term '{}' not found", term)));
        }

        if !status.is_success() {
            return Err(AppError::Network(format!(
                "Lookup endpoint returned error: {}",
                status
            )));
        }

        response.json::<ExplanationRecord>().await.map_err(|e| {
            log::warn!("[RemoteLookup] Parse error for '{}': {}", term, e);
            AppError::Parse(format!("Failed to parse explanation: {}", e))
        })
    }
}
