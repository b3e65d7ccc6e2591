//! Popup layout configuration
//!
//! Centralized overlay geometry shared by the solver, the controller and the settings.

use serde::{Deserialize, Serialize};
use crate::shared::types::PopupSize;

/// Popup footprint plus the spacing rules used when placing it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopupLayout {
    pub size: PopupSize,
    /// Minimum distance kept from every viewport edge
    pub margin: f64,
    /// Distance between the selection and the popup
    pub gap: f64,
}

impl PopupLayout {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: PopupSize { width, height },
            ..Self::default()
        }
    }

    /// Smallest viewport that fits the popup with margins on every side
    pub fn min_viewport(&self) -> (f64, f64) {
        (
            self.size.width + 2.0 * self.margin,
            self.size.height + 2.0 * self.margin,
        )
    }
}

impl Default for PopupLayout {
    fn default() -> Self {
        Self {
            size: PopupSize::default(),
            margin: 16.0,
            gap: 8.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_viewport() {
        assert_eq!(PopupLayout::default().min_viewport(), (352.0, 232.0));
    }

    #[test]
    fn test_new_keeps_default_spacing() {
        let layout = PopupLayout::new(280.0, 180.0);
        assert_eq!(layout.margin, 16.0);
        assert_eq!(layout.gap, 8.0);
        assert_eq!(layout.size.width, 280.0);
    }
}
