//! Host selection access
//!
//! The host environment owns the "current selection". The core only reads it
//! through `SelectionSource`, and only asks it to clear after a dismissal.

use std::sync::{Arc, Mutex, MutexGuard};
use crate::shared::types::SelectionRect;

/// Selection state as reported by the host, before validation
#[derive(Debug, Clone, PartialEq)]
pub struct RawSelection {
    pub text: String,
    /// Viewport-relative bounding box of the selected range
    pub rect: SelectionRect,
    pub collapsed: bool,
}

pub trait SelectionSource: Send + Sync {
    /// Current selection, or `None` when the host has no selection range
    fn read_selection(&self) -> Option<RawSelection>;

    /// Drop the host's selection (used when the reader dismisses the popup)
    fn clear_selection(&self);
}

/// In-memory selection host, for embedding and for tests
#[derive(Clone, Default)]
pub struct StaticSelection {
    current: Arc<Mutex<Option<RawSelection>>>,
}

impl StaticSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str, rect: SelectionRect) -> Self {
        let host = Self::new();
        host.set_text(text, rect);
        host
    }

    fn slot(&self) -> MutexGuard<'_, Option<RawSelection>> {
        match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("[StaticSelection] Mutex poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }

    pub fn set(&self, selection: RawSelection) {
        *self.slot() = Some(selection);
    }

    pub fn set_text(&self, text: &str, rect: SelectionRect) {
        self.set(RawSelection {
            text: text.to_string(),
            rect,
            collapsed: text.is_empty(),
        });
    }

    pub fn clear(&self) {
        *self.slot() = None;
    }

    pub fn has_selection(&self) -> bool {
        self.slot().is_some()
    }
}

impl SelectionSource for StaticSelection {
    fn read_selection(&self) -> Option<RawSelection> {
        self.slot().clone()
    }

    fn clear_selection(&self) {
        self.clear();
    }
}
