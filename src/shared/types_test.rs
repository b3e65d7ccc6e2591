//! Test to trigger ts-rs bindings export
//! Run with: cargo test export_bindings

#[cfg(test)]
mod tests {
    use crate::shared::events::*;
    use crate::shared::types::*;
    use ts_rs::TS;

    #[test]
    fn export_bindings() {
        // Types consumed by the overlay renderer
        LookupSessionState::export().expect("Failed to export LookupSessionState");
        PopupView::export().expect("Failed to export PopupView");
        LookupEvent::export().expect("Failed to export LookupEvent");

        let decl = LookupSessionState::decl();
        assert!(decl.contains("PendingDebounce"));
    }
}
