// Module declarations - public items are re-exported below
pub mod config;
pub mod core;
pub mod shared;
pub mod system;

pub use crate::config::PopupLayout;
pub use crate::core::controller::{ControllerOptions, InputEvent, Key, SmartLookup};
pub use crate::core::debounce::{CancelHandle, Debouncer};
pub use crate::core::eligibility::{is_eligible, EligibilityFilter, Heuristic, TermHeuristic};
pub use crate::core::glossary::TermGlossary;
pub use crate::core::lookup::{fallback_explanation, KnownTerms, LookupService, NoKnownTerms, RemoteLookupService};
pub use crate::core::position::{solve_position, solve_position_with};
pub use crate::core::selection::{capture_selection, normalize_term};
pub use crate::core::session::{LookupSession, SessionOptions};
pub use crate::shared::emit::{ChannelSink, DisplaySink};
pub use crate::shared::events::{CloseReason, LookupEvent};
pub use crate::shared::settings::LookupSettings;
pub use crate::shared::types::{
    Difficulty, ExplanationRecord, LookupSessionState, PopupPosition, PopupSize, PopupView,
    SelectionRect, SelectionSnapshot, Viewport,
};
pub use crate::shared::{AppError, AppResult};
pub use crate::system::{RawSelection, SelectionSource, StaticSelection};
