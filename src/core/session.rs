//! Lookup session state machine
//!
//! One session drives one popup. Snapshots are debounced into lookups, and
//! lookup results are placed with the position solver. A newer snapshot
//! always supersedes older work: superseded lookups keep running but their
//! results are dropped by the request-id guard.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;

use crate::config::PopupLayout;
use crate::core::debounce::Debouncer;
use crate::core::eligibility::EligibilityFilter;
use crate::core::lookup::{fallback_explanation, KnownTerms, LookupService};
use crate::core::position::solve_position_with;
use crate::core::selection::{normalize_term, DEFAULT_MAX_TOKENS};
use crate::shared::emit::{emit_event, DisplaySink};
use crate::shared::error::{AppError, AppResult};
use crate::shared::events::{CloseReason, LookupEvent};
use crate::shared::settings::LookupSettings;
use crate::shared::types::{
    Difficulty, ExplanationRecord, LookupSessionState, PopupView, SelectionRect,
    SelectionSnapshot, Viewport,
};

/// Tunables for a session
#[derive(Clone)]
pub struct SessionOptions {
    pub filter: EligibilityFilter,
    pub layout: PopupLayout,
    pub debounce: Duration,
    pub lookup_timeout: Option<Duration>,
    /// Snapshots with more whitespace tokens than this are never looked up
    pub max_tokens: usize,
    pub viewport: Viewport,
    pub sink: Option<Arc<dyn DisplaySink>>,
}

impl SessionOptions {
    pub fn from_settings(settings: &LookupSettings) -> AppResult<Self> {
        settings.validate()?;
        Ok(Self {
            filter: EligibilityFilter::from_settings(settings)?,
            layout: settings.popup_layout(),
            debounce: settings.debounce(),
            lookup_timeout: settings.lookup_timeout(),
            max_tokens: settings.max_selection_tokens,
            ..Self::default()
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn DisplaySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        let settings = LookupSettings::default();
        Self {
            filter: EligibilityFilter::medical(),
            layout: settings.popup_layout(),
            debounce: settings.debounce(),
            lookup_timeout: settings.lookup_timeout(),
            max_tokens: DEFAULT_MAX_TOKENS,
            viewport: Viewport::default(),
            sink: None,
        }
    }
}

/// Arguments carried by the debounce timer
struct PendingLookup {
    request: u64,
    term: String,
    rect: SelectionRect,
}

struct SessionCore {
    state: LookupSessionState,
    /// Bumped by every accepted snapshot and every close
    request: u64,
    /// Selection geometry the current popup is anchored to
    anchor: Option<SelectionRect>,
}

struct Shared {
    core: Mutex<SessionCore>,
    viewport: Mutex<Viewport>,
    service: Arc<dyn LookupService>,
    known: Arc<dyn KnownTerms>,
    filter: EligibilityFilter,
    layout: PopupLayout,
    lookup_timeout: Option<Duration>,
    max_tokens: usize,
    state_tx: watch::Sender<LookupSessionState>,
    sink: Option<Arc<dyn DisplaySink>>,
    /// Sink events queued under the core lock, delivered after it is released
    outbox: Mutex<VecDeque<LookupEvent>>,
    draining: AtomicBool,
}

impl Shared {
    fn lock_core(&self) -> MutexGuard<'_, SessionCore> {
        match self.core.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("[LookupSession] Mutex poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }

    fn current_viewport(&self) -> Viewport {
        match self.viewport.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                log::warn!("[LookupSession] Viewport mutex poisoned, recovering...");
                *poisoned.into_inner()
            }
        }
    }

    fn lock_outbox(&self) -> MutexGuard<'_, VecDeque<LookupEvent>> {
        match self.outbox.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("[LookupSession] Outbox mutex poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }

    /// Commit a transition. Called with the core lock held so the queued
    /// events keep the order the transitions happened in.
    fn publish(&self, core: &mut SessionCore, state: LookupSessionState) {
        log::debug!("[LookupSession] {} -> {}", core.state.name(), state.name());
        core.state = state.clone();
        self.state_tx.send_replace(state.clone());
        self.queue(LookupEvent::StateChanged(state));
    }

    fn queue(&self, event: LookupEvent) {
        if self.sink.is_some() {
            self.lock_outbox().push_back(event);
        }
    }

    /// Deliver queued events to the sink. Must be called without the core
    /// lock held: sinks may call back into the session. A nested or
    /// concurrent call leaves delivery to the caller already draining.
    fn flush(&self) {
        let Some(sink) = self.sink.as_deref() else {
            return;
        };
        loop {
            if self.draining.swap(true, Ordering::AcqRel) {
                return;
            }
            loop {
                let next = self.lock_outbox().pop_front();
                match next {
                    Some(event) => emit_event(Some(sink), event),
                    None => break,
                }
            }
            self.draining.store(false, Ordering::Release);
            if self.lock_outbox().is_empty() {
                return;
            }
        }
    }

    /// Debounce timer fired: move to `Loading` and issue the lookup
    fn fire(self: &Arc<Self>, pending: PendingLookup) {
        {
            let mut core = self.lock_core();
            if core.request != pending.request
                || !matches!(core.state, LookupSessionState::PendingDebounce { .. })
            {
                log::debug!("[LookupSession] Timer for '{}' superseded", pending.term);
                return;
            }
            core.anchor = Some(pending.rect);
            self.publish(
                &mut core,
                LookupSessionState::Loading {
                    term: pending.term.clone(),
                },
            );
        }
        self.flush();

        log::info!("[LookupSession] Looking up '{}'", pending.term);

        let service = Arc::clone(&self.service);
        let timeout = self.lookup_timeout;
        let session = Arc::downgrade(self);
        let PendingLookup { request, term, .. } = pending;

        tokio::spawn(async move {
            // Inner task so a panicking service still resolves the session
            let lookup_term = term.clone();
            let lookup = tokio::spawn(async move {
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, service.lookup(&lookup_term))
                        .await
                        .map_err(AppError::from)
                        .and_then(|result| result),
                    None => service.lookup(&lookup_term).await,
                }
            });
            let result = match lookup.await {
                Ok(result) => result,
                Err(e) => Err(AppError::Unknown(format!("Lookup task failed: {}", e))),
            };
            resolve_weak(&session, request, &term, result);
        });
    }

    /// Apply a lookup result if it still belongs to the current `Loading` state
    fn resolve(&self, request: u64, term: &str, result: AppResult<ExplanationRecord>) {
        self.apply_result(request, term, result);
        self.flush();
    }

    fn apply_result(&self, request: u64, term: &str, result: AppResult<ExplanationRecord>) {
        let viewport = self.current_viewport();
        let mut core = self.lock_core();

        let current = matches!(
            &core.state,
            LookupSessionState::Loading { term: loading } if loading == term
        );
        if core.request != request || !current {
            log::debug!("[LookupSession] Dropping stale result for '{}'", term);
            return;
        }

        let rect = core.anchor.unwrap_or_default();
        let position = solve_position_with(&rect, &self.layout, &viewport);

        let state = match result {
            Ok(explanation) => LookupSessionState::Displayed {
                term: term.to_string(),
                explanation,
                position,
            },
            Err(e) => {
                log::warn!("[LookupSession] Lookup for '{}' failed: {}", term, e);
                LookupSessionState::Error {
                    term: term.to_string(),
                    explanation: fallback_explanation(term),
                    position,
                }
            }
        };
        self.publish(&mut core, state);
    }
}

fn resolve_weak(
    session: &Weak<Shared>,
    request: u64,
    term: &str,
    result: AppResult<ExplanationRecord>,
) {
    match session.upgrade() {
        Some(shared) => shared.resolve(request, term, result),
        None => log::debug!("[LookupSession] Session gone, discarding result for '{}'", term),
    }
}

/// Debounced, stale-safe lookup state machine
pub struct LookupSession {
    shared: Arc<Shared>,
    debouncer: Debouncer<PendingLookup>,
}

impl LookupSession {
    pub fn new(
        service: Arc<dyn LookupService>,
        known: Arc<dyn KnownTerms>,
        options: SessionOptions,
    ) -> Self {
        let (state_tx, _) = watch::channel(LookupSessionState::Idle);
        let shared = Arc::new(Shared {
            core: Mutex::new(SessionCore {
                state: LookupSessionState::Idle,
                request: 0,
                anchor: None,
            }),
            viewport: Mutex::new(options.viewport),
            service,
            known,
            filter: options.filter,
            layout: options.layout,
            lookup_timeout: options.lookup_timeout,
            max_tokens: options.max_tokens,
            state_tx,
            sink: options.sink,
            outbox: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
        });

        let weak = Arc::downgrade(&shared);
        let debouncer = Debouncer::new("lookup", options.debounce, move |pending: PendingLookup| {
            if let Some(shared) = weak.upgrade() {
                shared.fire(pending);
            }
        });

        Self { shared, debouncer }
    }

    /// Feed a freshly captured selection. Returns whether a lookup was scheduled.
    pub fn on_selection(&self, snapshot: Option<SelectionSnapshot>) -> bool {
        let Some(snapshot) = snapshot else {
            self.close(CloseReason::EmptySelection);
            return false;
        };

        // Snapshots may be built by hosts directly, bypassing capture_selection
        if snapshot.text.split_whitespace().count() > self.shared.max_tokens {
            log::debug!("[LookupSession] Selection too long for lookup");
            self.close(CloseReason::Ineligible);
            return false;
        }

        let term = normalize_term(&snapshot.text);
        if term.is_empty() {
            self.close(CloseReason::EmptySelection);
            return false;
        }

        if !self.shared.filter.is_eligible(&term, self.shared.known.as_ref()) {
            log::debug!("[LookupSession] '{}' is not eligible", term);
            self.close(CloseReason::Ineligible);
            return false;
        }

        {
            let mut core = self.shared.lock_core();
            core.request = core.request.wrapping_add(1);
            let request = core.request;
            self.shared.publish(
                &mut core,
                LookupSessionState::PendingDebounce {
                    term: term.clone(),
                    rect: snapshot.rect,
                },
            );
            // Triggered under the core lock so timers are armed in request order
            self.debouncer.trigger(PendingLookup {
                request,
                term,
                rect: snapshot.rect,
            });
        }
        self.shared.flush();
        true
    }

    /// Return to `Idle`, cancelling the timer and orphaning any in-flight lookup.
    /// Returns whether the session was doing anything.
    pub fn close(&self, reason: CloseReason) -> bool {
        self.debouncer.cancel();

        let mut core = self.shared.lock_core();
        core.request = core.request.wrapping_add(1);
        core.anchor = None;
        if core.state.is_idle() {
            return false;
        }

        log::info!("[LookupSession] Closing ({:?})", reason);
        self.shared.publish(&mut core, LookupSessionState::Idle);
        self.shared.queue(LookupEvent::Closed(reason));
        drop(core);
        self.shared.flush();
        true
    }

    /// Re-anchor a visible popup to the live selection. Closes with
    /// `SelectionLost` when the selection is gone.
    pub fn reposition(&self, live: Option<SelectionRect>) -> bool {
        let Some(rect) = live else {
            if self.is_visible() {
                self.close(CloseReason::SelectionLost);
            }
            return false;
        };

        let viewport = self.shared.current_viewport();
        let mut core = self.shared.lock_core();
        if !core.state.is_visible() {
            return false;
        }

        let solved = solve_position_with(&rect, &self.shared.layout, &viewport);
        core.anchor = Some(rect);

        let mut next = core.state.clone();
        match &mut next {
            LookupSessionState::Displayed { position, .. }
            | LookupSessionState::Error { position, .. } => {
                if *position == solved {
                    return true;
                }
                *position = solved;
            }
            _ => return false,
        }
        self.shared.publish(&mut core, next);
        drop(core);
        self.shared.flush();
        true
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        match self.shared.viewport.lock() {
            Ok(mut guard) => *guard = viewport,
            Err(poisoned) => {
                log::warn!("[LookupSession] Viewport mutex poisoned, recovering...");
                *poisoned.into_inner() = viewport;
            }
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.shared.current_viewport()
    }

    pub fn state(&self) -> LookupSessionState {
        self.shared.state_tx.borrow().clone()
    }

    pub fn is_visible(&self) -> bool {
        self.shared.state_tx.borrow().is_visible()
    }

    /// Receiver that observes every published transition
    pub fn subscribe(&self) -> watch::Receiver<LookupSessionState> {
        self.shared.state_tx.subscribe()
    }

    pub fn popup_view(&self, difficulty: Difficulty) -> Option<PopupView> {
        PopupView::from_state(&self.shared.state_tx.borrow(), difficulty)
    }

    pub fn layout(&self) -> PopupLayout {
        self.shared.layout
    }
}

impl Drop for LookupSession {
    fn drop(&mut self) {
        self.debouncer.cancel();
        let mut core = self.shared.lock_core();
        core.request = core.request.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lookup::NoKnownTerms;
    use crate::shared::emit::ChannelSink;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;
    use tokio::time::sleep;

    struct MockService {
        calls: AtomicUsize,
        terms: Mutex<Vec<String>>,
        delay: Duration,
        fail: bool,
    }

    impl MockService {
        fn new(delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                terms: Mutex::new(Vec::new()),
                delay: Duration::from_millis(delay_ms),
                fail: false,
            })
        }

        fn failing(delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                terms: Mutex::new(Vec::new()),
                delay: Duration::from_millis(delay_ms),
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn terms(&self) -> Vec<String> {
            self.terms.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LookupService for MockService {
        async fn lookup(&self, term: &str) -> AppResult<ExplanationRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.terms.lock().unwrap().push(term.to_string());
            sleep(self.delay).await;
            if self.fail {
                return Err(AppError::Network("service unavailable".to_string()));
            }
            Ok(ExplanationRecord {
                simple: format!("{} explained", term),
                category: "cardiology".to_string(),
                ..ExplanationRecord::default()
            })
        }
    }

    fn snapshot(text: &str) -> Option<SelectionSnapshot> {
        Some(SelectionSnapshot {
            text: text.to_string(),
            rect: SelectionRect::new(300.0, 500.0, 80.0, 20.0),
        })
    }

    fn session(service: Arc<MockService>) -> LookupSession {
        LookupSession::new(service, Arc::new(NoKnownTerms), SessionOptions::default())
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_eligible_selection_is_displayed() {
        let service = MockService::new(50);
        let session = session(service.clone());

        assert!(session.on_selection(snapshot("Bradycardia")));
        assert_eq!(session.state().name(), "PendingDebounce");
        assert_eq!(session.state().term(), Some("bradycardia"));

        sleep(ms(199)).await;
        assert_eq!(session.state().name(), "PendingDebounce");
        assert_eq!(service.calls(), 0);

        sleep(ms(2)).await;
        assert_eq!(session.state().name(), "Loading");
        assert_eq!(service.calls(), 1);

        sleep(ms(50)).await;
        match session.state() {
            LookupSessionState::Displayed { term, explanation, position } => {
                assert_eq!(term, "bradycardia");
                assert_eq!(explanation.simple, "bradycardia explained");
                // Centered above the selection: 540 - 160, 300 - 200 - 8
                assert_eq!(position.left, 380.0);
                assert_eq!(position.top, 92.0);
            }
            other => panic!("expected Displayed, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ineligible_selection_never_looks_up() {
        let service = MockService::new(0);
        let session = session(service.clone());

        assert!(!session.on_selection(snapshot("xyz123")));
        sleep(ms(1_000)).await;

        assert!(session.state().is_idle());
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_selections_collapse_into_one_lookup() {
        let service = MockService::new(10);
        let session = session(service.clone());

        for text in ["cardiology", "neurology", "gastritis", "nephrosis"] {
            session.on_selection(snapshot(text));
            sleep(ms(50)).await;
        }
        sleep(ms(500)).await;

        assert_eq!(service.calls(), 1);
        assert_eq!(service.terms(), vec!["nephrosis".to_string()]);
        assert_eq!(session.state().term(), Some("nephrosis"));
    }

    struct Known(&'static [&'static str]);

    impl KnownTerms for Known {
        fn has_entry(&self, term: &str) -> bool {
            self.0.iter().any(|known| *known == term)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_result_is_dropped() {
        let service = MockService::new(500);
        let session = LookupSession::new(
            service.clone(),
            Arc::new(Known(&["angina"])),
            SessionOptions::default(),
        );

        session.on_selection(snapshot("bradycardia"));
        // bradycardia lookup in flight from t=200 to t=700
        sleep(ms(300)).await;
        session.on_selection(snapshot("angina"));
        sleep(ms(450)).await;

        // t=750: bradycardia resolved at 700 but angina is loading
        match session.state() {
            LookupSessionState::Loading { term } => assert_eq!(term, "angina"),
            other => panic!("expected Loading, got {:?}", other),
        }

        sleep(ms(1_000)).await;
        match session.state() {
            LookupSessionState::Displayed { term, explanation, .. } => {
                assert_eq!(term, "angina");
                assert_eq!(explanation.simple, "angina explained");
            }
            other => panic!("expected Displayed, got {:?}", other),
        }
        assert_eq!(service.terms(), vec!["bradycardia".to_string(), "angina".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_during_loading_discards_result() {
        let service = MockService::new(300);
        let session = session(service.clone());

        session.on_selection(snapshot("bradycardia"));
        sleep(ms(250)).await;
        assert_eq!(session.state().name(), "Loading");

        assert!(session.close(CloseReason::Escape));
        sleep(ms(1_000)).await;

        assert!(session.state().is_idle());
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_during_debounce_cancels_lookup() {
        let service = MockService::new(0);
        let session = session(service.clone());

        session.on_selection(snapshot("bradycardia"));
        sleep(ms(100)).await;
        session.close(CloseReason::OutsideClick);
        sleep(ms(1_000)).await;

        assert!(session.state().is_idle());
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_shows_fallback() {
        let service = MockService::failing(20);
        let session = session(service.clone());

        session.on_selection(snapshot("bradycardia"));
        sleep(ms(300)).await;

        match session.state() {
            LookupSessionState::Error { term, explanation, .. } => {
                assert_eq!(term, "bradycardia");
                assert_eq!(
                    explanation.simple,
                    "bradycardia is a medical term. Explanation temporarily unavailable."
                );
                assert_eq!(explanation.category, "general");
            }
            other => panic!("expected Error, got {:?}", other),
        }
        // Not retried
        sleep(ms(5_000)).await;
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_shows_fallback() {
        let service = MockService::new(60_000);
        let session = session(service.clone());

        session.on_selection(snapshot("bradycardia"));
        sleep(ms(5_100)).await;
        assert_eq!(session.state().name(), "Loading");

        sleep(ms(200)).await;
        assert_eq!(session.state().name(), "Error");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_timeout_waits_for_slow_service() {
        let service = MockService::new(60_000);
        let options = SessionOptions {
            lookup_timeout: None,
            ..SessionOptions::default()
        };
        let session = LookupSession::new(service, Arc::new(NoKnownTerms), options);

        session.on_selection(snapshot("bradycardia"));
        sleep(ms(30_000)).await;
        assert_eq!(session.state().name(), "Loading");

        sleep(ms(31_000)).await;
        assert_eq!(session.state().name(), "Displayed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_selection_after_display_restarts() {
        let service = MockService::new(0);
        let session = session(service.clone());

        session.on_selection(snapshot("bradycardia"));
        sleep(ms(250)).await;
        assert_eq!(session.state().name(), "Displayed");

        session.on_selection(snapshot("gastritis"));
        assert_eq!(session.state().name(), "PendingDebounce");

        session.on_selection(None);
        assert!(session.state().is_idle());

        sleep(ms(500)).await;
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reposition_follows_live_selection() {
        let service = MockService::new(0);
        let session = session(service.clone());

        assert!(!session.reposition(Some(SelectionRect::new(0.0, 0.0, 10.0, 10.0))));

        session.on_selection(snapshot("bradycardia"));
        sleep(ms(250)).await;
        let before = session.state().position().unwrap();

        session.set_viewport(Viewport::new(400.0, 600.0));
        assert!(session.reposition(Some(SelectionRect::new(300.0, 300.0, 80.0, 20.0))));
        let after = session.state().position().unwrap();
        assert_ne!(before, after);
        assert_eq!(after.left, 64.0);
        assert_eq!(after.top, 92.0);

        assert!(!session.reposition(None));
        assert!(session.state().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transitions_reach_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service = MockService::new(0);
        let options = SessionOptions::default().with_sink(Arc::new(ChannelSink::new(tx)));
        let session = LookupSession::new(service, Arc::new(NoKnownTerms), options);

        session.on_selection(snapshot("bradycardia"));
        sleep(ms(250)).await;
        session.close(CloseReason::CloseControl);

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(match event {
                LookupEvent::StateChanged(state) => state.name().to_string(),
                LookupEvent::Closed(reason) => format!("Closed({:?})", reason),
            });
        }
        assert_eq!(
            names,
            vec!["PendingDebounce", "Loading", "Displayed", "Idle", "Closed(CloseControl)"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_observes_latest_state() {
        let service = MockService::new(0);
        let session = session(service);
        let mut rx = session.subscribe();

        session.on_selection(snapshot("bradycardia"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().name(), "PendingDebounce");

        sleep(ms(250)).await;
        assert!(rx.borrow().is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_lookup() {
        let service = MockService::new(0);
        let session = session(service.clone());

        session.on_selection(snapshot("bradycardia"));
        drop(session);
        sleep(ms(1_000)).await;

        assert_eq!(service.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_known_terms_make_plain_words_eligible() {
        let service = MockService::new(0);
        let session = LookupSession::new(
            service.clone(),
            Arc::new(Known(&["angina"])),
            SessionOptions::default(),
        );

        assert!(session.on_selection(snapshot("Angina")));
        sleep(ms(250)).await;
        assert_eq!(session.state().term(), Some("angina"));
        assert_eq!(service.calls(), 1);

        // Too short even if known
        assert!(!session.on_selection(snapshot("ab")));
    }

    struct PanickingService;

    #[async_trait]
    impl LookupService for PanickingService {
        async fn lookup(&self, term: &str) -> AppResult<ExplanationRecord> {
            panic!("lookup backend crashed on '{}'", term)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_service_shows_fallback() {
        let session = LookupSession::new(
            Arc::new(PanickingService),
            Arc::new(NoKnownTerms),
            SessionOptions::default(),
        );

        session.on_selection(snapshot("bradycardia"));
        sleep(ms(10_000)).await;

        match session.state() {
            LookupSessionState::Error { term, explanation, .. } => {
                assert_eq!(term, "bradycardia");
                assert_eq!(explanation, fallback_explanation("bradycardia"));
            }
            other => panic!("expected Error, got {:?}", other),
        }
    }

    /// Renderer-like sink that dismisses the popup as soon as it is shown
    #[derive(Default)]
    struct ClosingSink {
        session: Mutex<Option<Arc<LookupSession>>>,
        seen: Mutex<Vec<String>>,
    }

    impl DisplaySink for ClosingSink {
        fn emit(&self, event: &LookupEvent) {
            let name = match event {
                LookupEvent::StateChanged(state) => state.name().to_string(),
                LookupEvent::Closed(reason) => format!("Closed({:?})", reason),
            };
            self.seen.lock().unwrap().push(name);

            if let LookupEvent::StateChanged(LookupSessionState::Displayed { .. }) = event {
                let session = self.session.lock().unwrap().clone();
                if let Some(session) = session {
                    assert!(session.close(CloseReason::CloseControl));
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_may_call_back_into_session() {
        let sink = Arc::new(ClosingSink::default());
        let session = Arc::new(LookupSession::new(
            MockService::new(0),
            Arc::new(NoKnownTerms),
            SessionOptions::default().with_sink(sink.clone()),
        ));
        *sink.session.lock().unwrap() = Some(Arc::clone(&session));

        session.on_selection(snapshot("bradycardia"));
        sleep(ms(300)).await;

        assert!(session.state().is_idle());
        assert_eq!(
            *sink.seen.lock().unwrap(),
            vec!["PendingDebounce", "Loading", "Displayed", "Idle", "Closed(CloseControl)"]
        );
        sink.session.lock().unwrap().take();
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlong_snapshot_is_rejected() {
        let service = MockService::new(0);
        let session = session(service.clone());

        assert!(!session.on_selection(snapshot("acute viral hepatitis b")));
        sleep(ms(500)).await;

        assert!(session.state().is_idle());
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_selections_leave_a_live_timer() {
        let terms = [
            "cardiology", "neurology", "gastritis", "nephrosis",
            "bradycardia", "hepatitis", "anemia", "mammogram",
        ];
        for _ in 0..20 {
            let options = SessionOptions {
                debounce: ms(5),
                ..SessionOptions::default()
            };
            let session = Arc::new(LookupSession::new(
                MockService::new(0),
                Arc::new(NoKnownTerms),
                options,
            ));

            let tasks: Vec<_> = terms
                .iter()
                .map(|&text| {
                    let session = Arc::clone(&session);
                    tokio::spawn(async move {
                        session.on_selection(snapshot(text));
                    })
                })
                .collect();
            for task in tasks {
                task.await.unwrap();
            }

            sleep(ms(100)).await;
            assert_eq!(session.state().name(), "Displayed");
        }
    }
}
