//! Input-event front end for a lookup session
//!
//! Hosts forward raw pointer, touch, keyboard, and resize events here.
//! Selection-ending events are settled before the host selection is read,
//! so a burst of them produces one capture.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;

use crate::core::debounce::Debouncer;
use crate::core::lookup::{KnownTerms, LookupService};
use crate::core::selection::{capture_selection, DEFAULT_MAX_TOKENS};
use crate::core::session::{LookupSession, SessionOptions};
use crate::shared::emit::DisplaySink;
use crate::shared::error::AppResult;
use crate::shared::events::CloseReason;
use crate::shared::settings::LookupSettings;
use crate::shared::types::{Difficulty, LookupSessionState, PopupView, Viewport};
use crate::system::host::SelectionSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Escape,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Other(String),
}

impl Key {
    pub fn is_arrow(&self) -> bool {
        matches!(
            self,
            Key::ArrowLeft | Key::ArrowRight | Key::ArrowUp | Key::ArrowDown
        )
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Key::Escape,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            other => Key::Other(other.to_string()),
        }
    }
}

/// Raw host input relevant to lookups. Click coordinates are document coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputEvent {
    MouseUp,
    #[serde(rename_all = "camelCase")]
    TouchEnd { active_touches: u32 },
    DoubleClick,
    KeyUp { key: Key, shift: bool },
    KeyDown { key: Key },
    Click { x: f64, y: f64 },
    CloseControl,
    Resize(Viewport),
}

#[derive(Clone)]
pub struct ControllerOptions {
    pub session: SessionOptions,
    pub settle_delay: Duration,
    pub resize_debounce: Duration,
    pub max_tokens: usize,
    pub enabled: bool,
    pub difficulty: Difficulty,
}

impl ControllerOptions {
    pub fn from_settings(settings: &LookupSettings) -> AppResult<Self> {
        Ok(Self {
            session: SessionOptions::from_settings(settings)?,
            settle_delay: settings.settle_delay(),
            resize_debounce: settings.resize_debounce(),
            max_tokens: settings.max_selection_tokens,
            enabled: settings.enabled,
            difficulty: settings.default_difficulty,
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn DisplaySink>) -> Self {
        self.session = self.session.with_sink(sink);
        self
    }
}

impl Default for ControllerOptions {
    fn default() -> Self {
        let settings = LookupSettings::default();
        Self {
            session: SessionOptions::default(),
            settle_delay: settings.settle_delay(),
            resize_debounce: settings.resize_debounce(),
            max_tokens: DEFAULT_MAX_TOKENS,
            enabled: settings.enabled,
            difficulty: settings.default_difficulty,
        }
    }
}

struct Inner {
    session: LookupSession,
    host: Arc<dyn SelectionSource>,
    max_tokens: usize,
    enabled: Mutex<bool>,
    difficulty: Mutex<Difficulty>,
}

fn lock_flag<'a, T>(slot: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("[SmartLookup] Mutex poisoned in {}, recovering...", what);
            poisoned.into_inner()
        }
    }
}

impl Inner {
    fn is_enabled(&self) -> bool {
        *lock_flag(&self.enabled, "is_enabled")
    }

    /// Settle delay elapsed: read the committed selection
    fn capture(&self) {
        if !self.is_enabled() {
            return;
        }
        let snapshot = capture_selection(self.host.as_ref(), self.max_tokens);
        self.session.on_selection(snapshot);
    }

    fn reposition(&self) {
        let live = capture_selection(self.host.as_ref(), self.max_tokens).map(|s| s.rect);
        self.session.reposition(live);
    }
}

/// Selection-driven lookup popup controller
pub struct SmartLookup {
    inner: Arc<Inner>,
    settle: Debouncer<()>,
    resize: Debouncer<()>,
}

impl SmartLookup {
    pub fn new(
        service: Arc<dyn LookupService>,
        known: Arc<dyn KnownTerms>,
        host: Arc<dyn SelectionSource>,
        settings: &LookupSettings,
    ) -> AppResult<Self> {
        let options = ControllerOptions::from_settings(settings)?;
        Ok(Self::with_options(service, known, host, options))
    }

    pub fn with_options(
        service: Arc<dyn LookupService>,
        known: Arc<dyn KnownTerms>,
        host: Arc<dyn SelectionSource>,
        options: ControllerOptions,
    ) -> Self {
        let inner = Arc::new(Inner {
            session: LookupSession::new(service, known, options.session),
            host,
            max_tokens: options.max_tokens,
            enabled: Mutex::new(options.enabled),
            difficulty: Mutex::new(options.difficulty),
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let settle = Debouncer::new("settle", options.settle_delay, move |()| {
            if let Some(inner) = weak.upgrade() {
                inner.capture();
            }
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let resize = Debouncer::new("resize", options.resize_debounce, move |()| {
            if let Some(inner) = weak.upgrade() {
                inner.reposition();
            }
        });

        Self { inner, settle, resize }
    }

    pub fn handle_event(&self, event: InputEvent) {
        match event {
            InputEvent::MouseUp | InputEvent::DoubleClick => self.schedule_capture(),
            InputEvent::TouchEnd { active_touches } => {
                // Fingers still down means a scroll or pinch, not a selection
                if active_touches == 0 {
                    self.schedule_capture();
                }
            }
            InputEvent::KeyUp { key, shift } => {
                if shift && key.is_arrow() {
                    self.schedule_capture();
                }
            }
            InputEvent::KeyDown { key: Key::Escape } => {
                self.dismiss(CloseReason::Escape);
            }
            InputEvent::KeyDown { .. } => {}
            InputEvent::Click { x, y } => {
                if let Some(position) = self.inner.session.state().position() {
                    let size = self.inner.session.layout().size;
                    if !position.contains(x, y, size) {
                        self.dismiss(CloseReason::OutsideClick);
                    }
                }
            }
            InputEvent::CloseControl => {
                self.dismiss(CloseReason::CloseControl);
            }
            InputEvent::Resize(viewport) => {
                self.inner.session.set_viewport(viewport);
                if self.inner.session.is_visible() {
                    self.resize.trigger(());
                }
            }
        }
    }

    fn schedule_capture(&self) {
        if !self.is_enabled() {
            log::debug!("[SmartLookup] Disabled, ignoring selection event");
            return;
        }
        self.settle.trigger(());
    }

    /// Reader-initiated close. Clears the host selection so it does not reopen.
    fn dismiss(&self, reason: CloseReason) {
        self.settle.cancel();
        self.resize.cancel();
        if self.inner.session.close(reason) && reason.is_dismissal() {
            self.inner.host.clear_selection();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }

    pub fn set_enabled(&self, enabled: bool) {
        *lock_flag(&self.inner.enabled, "set_enabled") = enabled;
        log::info!("[SmartLookup] {}", if enabled { "Enabled" } else { "Disabled" });
        if !enabled {
            self.settle.cancel();
            self.resize.cancel();
            self.inner.session.close(CloseReason::Disabled);
        }
    }

    /// Flip the enabled flag, returning the new value
    pub fn toggle(&self) -> bool {
        let enabled = !self.is_enabled();
        self.set_enabled(enabled);
        enabled
    }

    pub fn difficulty(&self) -> Difficulty {
        *lock_flag(&self.inner.difficulty, "difficulty")
    }

    /// Switch the tier shown. Never triggers a lookup.
    pub fn set_difficulty(&self, difficulty: Difficulty) {
        *lock_flag(&self.inner.difficulty, "set_difficulty") = difficulty;
    }

    pub fn popup_view(&self, difficulty: Difficulty) -> Option<PopupView> {
        self.inner.session.popup_view(difficulty)
    }

    /// Popup content at the current tier
    pub fn current_view(&self) -> Option<PopupView> {
        self.popup_view(self.difficulty())
    }

    pub fn state(&self) -> LookupSessionState {
        self.inner.session.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<LookupSessionState> {
        self.inner.session.subscribe()
    }

    pub fn session(&self) -> &LookupSession {
        &self.inner.session
    }

    pub fn shutdown(&self) {
        self.settle.cancel();
        self.resize.cancel();
        self.inner.session.close(CloseReason::Shutdown);
    }
}
