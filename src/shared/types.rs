use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Bounding rectangle of a selection, in viewport coordinates.
///
/// Always normalized: `width`/`height` are non-negative and
/// `bottom`/`right` agree with them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "lookup.ts")]
pub struct SelectionRect {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub width: f64,
    pub height: f64,
}

impl SelectionRect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self::from_edges(top, left, top + height, left + width)
    }

    /// Build from raw edges, swapping inverted edges so the size is never negative
    pub fn from_edges(top: f64, left: f64, bottom: f64, right: f64) -> Self {
        let (top, bottom) = if bottom < top { (bottom, top) } else { (top, bottom) };
        let (left, right) = if right < left { (right, left) } else { (left, right) };
        Self {
            top,
            left,
            bottom,
            right,
            width: right - left,
            height: bottom - top,
        }
    }

    /// Re-derive a consistent rectangle from `top`/`left`/`bottom`/`right`.
    pub fn normalized(&self) -> Self {
        Self::from_edges(self.top, self.left, self.bottom, self.right)
    }
}

/// A validated selection: trimmed non-empty text plus its geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "lookup.ts")]
pub struct SelectionSnapshot {
    pub text: String,
    pub rect: SelectionRect,
}

/// Visible area of the host document
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "lookup.ts")]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }

    pub fn with_scroll(mut self, scroll_x: f64, scroll_y: f64) -> Self {
        self.scroll_x = scroll_x;
        self.scroll_y = scroll_y;
        self
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

/// Top-left corner of the popup, in document coordinates (viewport + scroll)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "lookup.ts")]
pub struct PopupPosition {
    pub top: f64,
    pub left: f64,
}

impl PopupPosition {
    /// Whether a document-coordinate point falls inside a popup of `size` placed here
    pub fn contains(&self, x: f64, y: f64, size: PopupSize) -> bool {
        x >= self.left
            && x <= self.left + size.width
            && y >= self.top
            && y <= self.top + size.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "lookup.ts")]
pub struct PopupSize {
    pub width: f64,
    pub height: f64,
}

impl Default for PopupSize {
    fn default() -> Self {
        Self {
            width: 320.0,
            height: 200.0,
        }
    }
}

/// Explanation content for one term, as returned by a lookup service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "lookup.ts")]
pub struct ExplanationRecord {
    pub simple: String,
    #[serde(default)]
    pub detailed: String,
    #[serde(default)]
    pub expert: String,
    #[serde(default)]
    pub related: Vec<String>,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "general".to_string()
}

impl Default for ExplanationRecord {
    fn default() -> Self {
        Self {
            simple: String::new(),
            detailed: String::new(),
            expert: String::new(),
            related: Vec::new(),
            category: default_category(),
        }
    }
}

impl ExplanationRecord {
    /// Text for the requested tier, falling back to the simple tier when empty
    pub fn text_for(&self, difficulty: Difficulty) -> &str {
        let text = match difficulty {
            Difficulty::Simple => &self.simple,
            Difficulty::Detailed => &self.detailed,
            Difficulty::Expert => &self.expert,
        };
        if text.trim().is_empty() {
            &self.simple
        } else {
            text
        }
    }
}

/// Explanation tier chosen by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "lookup.ts")]
pub enum Difficulty {
    #[default]
    Simple,
    Detailed,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Simple, Difficulty::Detailed, Difficulty::Expert];

    /// Audience label shown next to the tier selector
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Simple => "Student",
            Difficulty::Detailed => "Resident",
            Difficulty::Expert => "Attending",
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = crate::shared::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" | "basic" | "student" => Ok(Difficulty::Simple),
            "detailed" | "resident" => Ok(Difficulty::Detailed),
            "expert" | "attending" => Ok(Difficulty::Expert),
            other => Err(crate::shared::error::AppError::Validation(format!(
                "Unknown difficulty: {}",
                other
            ))),
        }
    }
}

/// Display state of a lookup session
// Adjacently tagged for the display sink
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(tag = "state", content = "payload")]
#[ts(export, export_to = "lookup.ts")]
pub enum LookupSessionState {
    #[default]
    Idle,
    PendingDebounce {
        term: String,
        rect: SelectionRect,
    },
    Loading {
        term: String,
    },
    Displayed {
        term: String,
        explanation: ExplanationRecord,
        position: PopupPosition,
    },
    Error {
        term: String,
        explanation: ExplanationRecord,
        position: PopupPosition,
    },
}

impl LookupSessionState {
    pub fn term(&self) -> Option<&str> {
        match self {
            LookupSessionState::Idle => None,
            LookupSessionState::PendingDebounce { term, .. }
            | LookupSessionState::Loading { term }
            | LookupSessionState::Displayed { term, .. }
            | LookupSessionState::Error { term, .. } => Some(term),
        }
    }

    /// Popup position when an overlay is on screen
    pub fn position(&self) -> Option<PopupPosition> {
        match self {
            LookupSessionState::Displayed { position, .. }
            | LookupSessionState::Error { position, .. } => Some(*position),
            _ => None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.position().is_some()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, LookupSessionState::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            LookupSessionState::Idle => "Idle",
            LookupSessionState::PendingDebounce { .. } => "PendingDebounce",
            LookupSessionState::Loading { .. } => "Loading",
            LookupSessionState::Displayed { .. } => "Displayed",
            LookupSessionState::Error { .. } => "Error",
        }
    }
}

/// Render-ready popup content for the current tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "lookup.ts")]
pub struct PopupView {
    pub term: String,
    pub text: String,
    pub difficulty: Difficulty,
    pub difficulty_label: String,
    pub category: String,
    pub related: Vec<String>,
    pub position: PopupPosition,
    pub is_fallback: bool,
}

impl PopupView {
    /// Project a visible session state onto the chosen tier. `None` when nothing is shown.
    pub fn from_state(state: &LookupSessionState, difficulty: Difficulty) -> Option<Self> {
        let (term, explanation, position, is_fallback) = match state {
            LookupSessionState::Displayed { term, explanation, position } => {
                (term, explanation, position, false)
            }
            LookupSessionState::Error { term, explanation, position } => {
                (term, explanation, position, true)
            }
            _ => return None,
        };

        let text = explanation.text_for(difficulty);
        Some(Self {
            term: term.clone(),
            text: if text.is_empty() {
                "No explanation available".to_string()
            } else {
                text.to_string()
            },
            difficulty,
            difficulty_label: difficulty.label().to_string(),
            category: explanation.category.clone(),
            related: explanation.related.clone(),
            position: *position,
            is_fallback,
        })
    }
}
