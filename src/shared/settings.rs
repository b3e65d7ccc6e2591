use serde::{Deserialize, Serialize};
use ts_rs::TS;
use tokio::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use directories::ProjectDirs;

use super::error::{AppError, AppResult};
use super::types::{Difficulty, PopupSize};
use crate::config::PopupLayout;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export, export_to = "settings.ts")]
pub struct LookupSettings {
    pub enabled: bool,
    pub debounce_ms: u64,
    pub settle_delay_ms: u64,
    pub resize_debounce_ms: u64,
    pub lookup_timeout_ms: Option<u64>,
    pub max_selection_tokens: usize,
    pub min_term_len: usize,
    pub popup: PopupSettings,
    pub default_difficulty: Difficulty,
    /// Extra "looks like a term" regex patterns, on top of the built-in heuristics
    pub extra_patterns: Vec<String>,
    pub remote_base_url: Option<String>,
    #[ts(type = "string | null")]
    pub glossary_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export, export_to = "settings.ts")]
pub struct PopupSettings {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    pub gap: f64,
}

impl Default for PopupSettings {
    fn default() -> Self {
        let layout = PopupLayout::default();
        Self {
            width: layout.size.width,
            height: layout.size.height,
            margin: layout.margin,
            gap: layout.gap,
        }
    }
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 200,
            settle_delay_ms: 10,
            resize_debounce_ms: 150,
            lookup_timeout_ms: Some(5_000),
            max_selection_tokens: 3,
            min_term_len: 3,
            popup: PopupSettings::default(),
            default_difficulty: Difficulty::Simple,
            extra_patterns: Vec::new(),
            remote_base_url: None,
            glossary_path: None,
        }
    }
}

impl LookupSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn lookup_timeout(&self) -> Option<Duration> {
        self.lookup_timeout_ms.map(Duration::from_millis)
    }

    pub fn popup_layout(&self) -> PopupLayout {
        PopupLayout {
            size: PopupSize {
                width: self.popup.width,
                height: self.popup.height,
            },
            margin: self.popup.margin,
            gap: self.popup.gap,
        }
    }

    /// Reject values that would make the pipeline misbehave
    pub fn validate(&self) -> AppResult<()> {
        if self.debounce_ms == 0 {
            return Err(AppError::Config("debounce_ms must be greater than zero".to_string()));
        }
        if self.max_selection_tokens == 0 {
            return Err(AppError::Config("max_selection_tokens must be at least 1".to_string()));
        }
        if self.popup.width <= 0.0 || self.popup.height <= 0.0 {
            return Err(AppError::Config(format!(
                "popup size must be positive, got {}x{}",
                self.popup.width, self.popup.height
            )));
        }
        if self.popup.margin < 0.0 || self.popup.gap < 0.0 {
            return Err(AppError::Config("popup margin and gap must not be negative".to_string()));
        }
        Ok(())
    }

    pub fn get_settings_path() -> AppResult<PathBuf> {
        ProjectDirs::from("com", "studymate", "smart-lookup")
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .ok_or_else(|| AppError::Config("Failed to determine config directory".to_string()))
    }

    /// Load from the per-user config directory, writing defaults on first run
    pub async fn load() -> AppResult<Self> {
        let path = Self::get_settings_path()?;
        Self::load_from(&path).await
    }

    pub async fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            let settings = Self::default();
            settings.save_to(path).await?;
            log::info!("[Settings] Wrote default settings to {}", path.display());
            return Ok(settings);
        }

        let content = fs::read_to_string(path).await
            .map_err(|e| AppError::Io(format!("Failed to read settings file: {}", e)))?;

        let settings: Self = serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub async fn save(&self) -> AppResult<()> {
        let path = Self::get_settings_path()?;
        self.save_to(&path).await
    }

    pub async fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await
                .map_err(|e| AppError::Io(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)?;

        fs::write(path, content).await
            .map_err(|e| AppError::Io(format!("Failed to write settings file: {}", e)))
    }
}
