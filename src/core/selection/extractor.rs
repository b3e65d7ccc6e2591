use crate::shared::types::SelectionSnapshot;
use crate::system::host::SelectionSource;

/// Most tokens a lookup-worthy selection may contain
pub const DEFAULT_MAX_TOKENS: usize = 3;

/// Read the host's current selection and validate it.
///
/// Returns `None` for no selection, a collapsed selection, blank text, or
/// text with more than `max_tokens` whitespace-delimited tokens. Only call
/// this after the triggering input event has committed.
pub fn capture_selection(source: &dyn SelectionSource, max_tokens: usize) -> Option<SelectionSnapshot> {
    let raw = source.read_selection()?;

    if raw.collapsed {
        return None;
    }

    let text = raw.text.trim();
    if text.is_empty() {
        return None;
    }

    // Lookups target single terms and short phrases, not paragraphs
    if text.split_whitespace().count() > max_tokens {
        return None;
    }

    Some(SelectionSnapshot {
        text: text.to_string(),
        rect: raw.rect.normalized(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::SelectionRect;
    use crate::system::host::{RawSelection, StaticSelection};

    fn rect() -> SelectionRect {
        SelectionRect::new(100.0, 200.0, 80.0, 16.0)
    }

    #[test]
    fn test_no_selection() {
        let host = StaticSelection::new();
        assert!(capture_selection(&host, DEFAULT_MAX_TOKENS).is_none());
    }

    #[test]
    fn test_collapsed_selection() {
        let host = StaticSelection::new();
        host.set(RawSelection {
            text: "bradycardia".to_string(),
            rect: rect(),
            collapsed: true,
        });
        assert!(capture_selection(&host, DEFAULT_MAX_TOKENS).is_none());
    }

    #[test]
    fn test_blank_selection() {
        let host = StaticSelection::with_text("  \n ", rect());
        assert!(capture_selection(&host, DEFAULT_MAX_TOKENS).is_none());
    }

    #[test]
    fn test_trims_text() {
        let host = StaticSelection::with_text("  myocardial infarction ", rect());
        let snapshot = capture_selection(&host, DEFAULT_MAX_TOKENS).unwrap();
        assert_eq!(snapshot.text, "myocardial infarction");
        assert_eq!(snapshot.rect, rect());
    }

    #[test]
    fn test_token_limit() {
        let host = StaticSelection::with_text("acute coronary syndrome", rect());
        assert!(capture_selection(&host, DEFAULT_MAX_TOKENS).is_some());

        for text in [
            "the patient presents with bradycardia",
            "one two three four",
            "a\tb\nc d e",
        ] {
            host.set_text(text, rect());
            assert!(capture_selection(&host, DEFAULT_MAX_TOKENS).is_none(), "accepted {:?}", text);
        }
    }

    #[test]
    fn test_rect_normalized() {
        let host = StaticSelection::new();
        host.set(RawSelection {
            text: "angina".to_string(),
            rect: SelectionRect {
                top: 50.0,
                left: 90.0,
                bottom: 30.0,
                right: 10.0,
                width: -80.0,
                height: -20.0,
            },
            collapsed: false,
        });
        let snapshot = capture_selection(&host, DEFAULT_MAX_TOKENS).unwrap();
        assert_eq!(snapshot.rect.width, 80.0);
        assert_eq!(snapshot.rect.height, 20.0);
        assert_eq!(snapshot.rect.top, 30.0);
    }
}
