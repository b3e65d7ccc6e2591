//! Popup position solver
//!
//! Places the popup centered above the selection and clamps it into the
//! viewport. Each rule runs once, in order, so placement never oscillates.

use crate::config::PopupLayout;
use crate::shared::types::{PopupPosition, PopupSize, SelectionRect, Viewport};

/// Solve with the default margin (16px) and gap (8px)
pub fn solve_position(
    selection: &SelectionRect,
    popup_width: f64,
    popup_height: f64,
    viewport: &Viewport,
) -> PopupPosition {
    let layout = PopupLayout {
        size: PopupSize {
            width: popup_width,
            height: popup_height,
        },
        ..PopupLayout::default()
    };
    solve_position_with(selection, &layout, viewport)
}

/// Compute the popup's top-left corner in document coordinates.
///
/// When the viewport is smaller than the popup plus margins, the
/// minimum-margin edge wins and the popup may overflow on the far side.
pub fn solve_position_with(
    selection: &SelectionRect,
    layout: &PopupLayout,
    viewport: &Viewport,
) -> PopupPosition {
    let PopupLayout { size, margin, gap } = *layout;
    let (sx, sy) = (viewport.scroll_x, viewport.scroll_y);

    let min_left = sx + margin;
    let max_left = sx + viewport.width - margin - size.width;
    let min_top = sy + margin;
    let max_top = sy + viewport.height - margin - size.height;

    // Centered on the selection, `gap` above it
    let above = selection.top + sy - size.height - gap;
    let below = selection.bottom + sy + gap;
    let mut left = selection.left + sx + selection.width / 2.0 - size.width / 2.0;

    if left > max_left {
        left = max_left;
    }
    if left < min_left {
        left = min_left;
    }

    let mut top = above;
    if top < min_top {
        // A selection inside the top margin would put `below` above the margin too
        top = below.max(min_top);
    }

    if top > max_top {
        top = above;
        if top < min_top {
            top = min_top;
        } else if top > max_top {
            // Selection hugs the bottom edge: pull the popup up into view
            top = max_top.max(min_top);
        }
    }

    PopupPosition { top, left }
}
