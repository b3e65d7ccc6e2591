use serde::{Serialize, Deserialize};
use ts_rs::TS;
use super::types::LookupSessionState;

/// Why a session returned to `Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "events.ts")]
pub enum CloseReason {
    Escape,
    OutsideClick,
    CloseControl,
    EmptySelection,
    Ineligible,
    SelectionLost,
    Disabled,
    Shutdown,
}

impl CloseReason {
    /// Whether the close came from the reader dismissing the popup
    pub fn is_dismissal(&self) -> bool {
        matches!(
            self,
            CloseReason::Escape | CloseReason::OutsideClick | CloseReason::CloseControl
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "event", content = "payload")] // Tagged enum for easier frontend parsing
#[ts(export, export_to = "events.ts")]
pub enum LookupEvent {
    #[serde(rename = "lookup://state")]
    StateChanged(LookupSessionState),

    #[serde(rename = "lookup://closed")]
    Closed(CloseReason),
}

impl LookupEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LookupEvent::StateChanged(_) => "lookup://state",
            LookupEvent::Closed(_) => "lookup://closed",
        }
    }
}
