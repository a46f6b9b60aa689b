//! The sync controller: owns the parameters, coalesces edits, talks to the
//! server and publishes what the page should show.
//!
//! All mutation happens on the browser's single thread, driven by three kinds
//! of event: UI calls, the debounce timer firing, and transport events. The
//! controller state is a single-owner `RefCell`; borrows are always released
//! before calling out to the transport, the history or the view listener.
//!
//! Slider edits are debounced: each one replaces the pending timer, so only
//! the last edit of a burst produces a request. The request is built when the
//! timer fires, from whatever the parameters are at that moment. Override
//! toggles skip the timer and go out immediately.

use crate::config::SyncConfig;
use crate::error::{ProtocolError, StartupError};
use crate::overrides::OverrideSet;
use crate::params::{checked_amount, checked_level, RecipeParameters};
use crate::protocol::{parse_snapshot, RecipeRequest};
use crate::scale::{clamp_level, format_time_budget, minutes_to_level};
use crate::snapshot::RecipeSnapshot;
use crate::timer::Scheduler;
use crate::transport::{
    ConnectionState, Connector, SessionEvent, SessionEventSink, TransportSession,
};
use crate::url_state::{decode, page_url, socket_url};
use log::{debug, error, warn};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use url::Url;

/// Where committed parameters are written so the page stays shareable.
pub trait HistorySink {
    /// Replace the current entry's URL (path and query) without navigating.
    fn replace_url(&self, url: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No snapshot has arrived yet.
    Loading,
    Ready,
}

/// Everything the presentation layer needs for one render.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub phase: SyncPhase,
    pub connection: ConnectionState,
    pub params: RecipeParameters,
    /// Last accepted snapshot. Kept through disconnects and bad frames.
    pub snapshot: Option<Rc<RecipeSnapshot>>,
    /// A slider edit is waiting for its quiet period to end.
    pub dirty: bool,
    pub last_error: Option<String>,
}

impl ViewState {
    pub fn minutes(&self) -> f64 {
        self.params.minutes()
    }

    pub fn time_budget_label(&self) -> String {
        format_time_budget(self.minutes())
    }

    pub fn measure(&self) -> &str {
        self.snapshot
            .as_deref()
            .map(|s| s.measure_unit.as_str())
            .unwrap_or("")
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(
            self.connection,
            ConnectionState::Exhausted | ConnectionState::Closed
        )
    }
}

pub type ViewListener = Rc<dyn Fn(ViewState)>;

struct ControllerState<H> {
    params: RecipeParameters,
    snapshot: Option<Rc<RecipeSnapshot>>,
    connection: ConnectionState,
    debounce: Option<H>,
    dirty: bool,
    last_error: Option<String>,
    last_url: Option<String>,
}

struct Shared<C: Connector, S: Scheduler> {
    config: SyncConfig,
    page_path: String,
    scheduler: S,
    history: Box<dyn HistorySink>,
    listener: ViewListener,
    session: TransportSession<C, S>,
    state: RefCell<ControllerState<S::Handle>>,
}

pub struct SyncController<C: Connector, S: Scheduler> {
    shared: Rc<Shared<C, S>>,
}

impl<C: Connector, S: Scheduler> SyncController<C, S> {
    /// Build a controller. Nothing is sent or opened until [`start`](Self::start).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        params: RecipeParameters,
        page_path: impl Into<String>,
        socket_url: impl Into<String>,
        connector: C,
        scheduler: S,
        history: Box<dyn HistorySink>,
        config: SyncConfig,
        listener: ViewListener,
    ) -> Self {
        let page_path = page_path.into();
        let socket_url = socket_url.into();

        let shared = Rc::new_cyclic(|weak: &Weak<Shared<C, S>>| {
            let weak = weak.clone();
            let sink: SessionEventSink = Rc::new(move |event: SessionEvent| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_session_event(event);
                }
            });

            Shared {
                config,
                page_path,
                scheduler: scheduler.clone(),
                history,
                listener,
                session: TransportSession::new(socket_url, connector, scheduler, config, sink),
                state: RefCell::new(ControllerState {
                    params,
                    snapshot: None,
                    connection: ConnectionState::Closed,
                    debounce: None,
                    dirty: false,
                    last_error: None,
                    last_url: None,
                }),
            }
        });

        Self { shared }
    }

    /// Decode the parameters and socket endpoint from a page URL.
    pub fn for_page(
        page: &Url,
        connector: C,
        scheduler: S,
        history: Box<dyn HistorySink>,
        config: SyncConfig,
        listener: ViewListener,
    ) -> Result<Self, StartupError> {
        let params = decode(page)?;
        let socket = socket_url(page)?;
        Ok(Self::new(
            params,
            page.path(),
            socket.as_str(),
            connector,
            scheduler,
            history,
            config,
            listener,
        ))
    }

    /// Publish the initial (loading) view and open the connection. The first
    /// request goes out as soon as the connection reports ready.
    pub fn start(&self) {
        self.shared.publish();
        self.shared.session.open();
    }

    pub fn params(&self) -> RecipeParameters {
        self.shared.state.borrow().params.clone()
    }

    pub fn view(&self) -> ViewState {
        self.shared.view()
    }

    pub fn connection(&self) -> ConnectionState {
        self.shared.session.state()
    }

    pub fn set_amount(&self, value: f64) {
        match checked_amount(value) {
            Ok(amount) => {
                self.shared.state.borrow_mut().params.amount = amount;
                Shared::schedule_request(&self.shared);
                self.shared.publish();
            }
            Err(e) => warn!("ignoring amount {}: {}", value, e),
        }
    }

    pub fn set_time_level(&self, value: f64) {
        match checked_level(value) {
            Ok(level) => {
                self.shared.state.borrow_mut().params.time_level = level;
                Shared::schedule_request(&self.shared);
                self.shared.publish();
            }
            Err(e) => warn!("ignoring time level {}: {}", value, e),
        }
    }

    /// Add `name` to the build-from-scratch set, or take it out if present,
    /// and request immediately.
    pub fn toggle_override(&self, name: &str) {
        self.shared.update_overrides(|overrides| {
            overrides.toggle(name);
        });
    }

    /// Build `name` from scratch. No request if it already was.
    pub fn add_override(&self, name: &str) {
        self.shared.update_overrides(|overrides| {
            overrides.add(name);
        });
    }

    /// Buy `name` again. No request if it was not being built.
    pub fn remove_override(&self, name: &str) {
        self.shared.update_overrides(|overrides| {
            overrides.remove(name);
        });
    }

    /// JSON for the current parameters, exactly as it would be sent now.
    pub fn build_request_payload(&self) -> Result<String, ProtocolError> {
        self.shared.payload()
    }

    pub fn on_server_message(&self, raw: &str) {
        self.shared.on_server_message(raw);
    }

    /// Stop the connection and any pending request. Idempotent.
    pub fn close(&self) {
        {
            let mut state = self.shared.state.borrow_mut();
            state.debounce = None;
            state.dirty = false;
        }
        self.shared.session.close();
    }
}

impl<C: Connector, S: Scheduler> Drop for SyncController<C, S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: Connector, S: Scheduler> Shared<C, S> {
    fn view(&self) -> ViewState {
        let state = self.state.borrow();
        ViewState {
            phase: if state.snapshot.is_some() {
                SyncPhase::Ready
            } else {
                SyncPhase::Loading
            },
            connection: state.connection,
            params: state.params.clone(),
            snapshot: state.snapshot.clone(),
            dirty: state.dirty,
            last_error: state.last_error.clone(),
        }
    }

    fn publish(&self) {
        let view = self.view();
        (self.listener)(view);
    }

    fn payload(&self) -> Result<String, ProtocolError> {
        let state = self.state.borrow();
        RecipeRequest::from_params(&state.params).to_json()
    }

    /// Replace any pending request timer with a fresh one.
    fn schedule_request(this: &Rc<Self>) {
        let weak = Rc::downgrade(this);
        let mut state = this.state.borrow_mut();
        state.debounce = None;
        state.debounce = Some(this.scheduler.schedule(
            this.config.debounce_ms,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.flush_debounced();
                }
            }),
        ));
        state.dirty = true;
    }

    fn flush_debounced(&self) {
        {
            let mut state = self.state.borrow_mut();
            if !state.dirty {
                return;
            }
            state.dirty = false;
        }
        self.dispatch("debounce");
        self.publish();
    }

    /// Cancel any pending debounced request; the caller is about to send the
    /// current parameters anyway.
    fn cancel_pending(&self) {
        let mut state = self.state.borrow_mut();
        state.debounce = None;
        state.dirty = false;
    }

    fn update_overrides(&self, change: impl FnOnce(&mut OverrideSet)) {
        let changed = {
            let mut state = self.state.borrow_mut();
            let before = state.params.overrides.clone();
            change(&mut state.params.overrides);
            before != state.params.overrides
        };
        if !changed {
            return;
        }
        self.cancel_pending();
        self.dispatch("override");
        self.publish();
    }

    /// Send the current parameters and record them in the page URL.
    fn dispatch(&self, reason: &str) {
        let (payload, url) = {
            let state = self.state.borrow();
            (
                RecipeRequest::from_params(&state.params).to_json(),
                page_url(&self.page_path, &state.params),
            )
        };

        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                error!("could not encode request: {}", e);
                return;
            }
        };

        let url_changed = {
            let mut state = self.state.borrow_mut();
            if state.last_url.as_deref() == Some(url.as_str()) {
                false
            } else {
                state.last_url = Some(url.clone());
                true
            }
        };
        if url_changed {
            debug!("rewriting location to {}", url);
            self.history.replace_url(&url);
        }

        debug!("sending ({}): {}", reason, payload);
        self.session.send(&payload);
    }

    fn on_session_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Ready => {
                self.cancel_pending();
                self.dispatch("connection ready");
                self.publish();
            }
            SessionEvent::Message(raw) => self.on_server_message(&raw),
            SessionEvent::StateChanged(connection) => {
                self.state.borrow_mut().connection = connection;
                self.publish();
            }
            SessionEvent::Failed(e) => {
                self.state.borrow_mut().last_error = Some(e.to_string());
                self.publish();
            }
        }
    }

    /// Replace the snapshot wholesale, or keep the old one if the frame is bad.
    ///
    /// The server's amount and budget win over the sliders unless an edit is
    /// still waiting to be sent; that edit is newer than the request this
    /// frame answers.
    fn on_server_message(&self, raw: &str) {
        let snapshot = match parse_snapshot(raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("discarding server frame: {}", e);
                self.state.borrow_mut().last_error = Some(e.to_string());
                self.publish();
                return;
            }
        };

        {
            let mut state = self.state.borrow_mut();
            if state.dirty {
                debug!("keeping local edits over server echo");
            } else {
                match checked_amount(snapshot.amount) {
                    Ok(amount) => state.params.amount = amount,
                    Err(e) => warn!("server amount ignored: {}", e),
                }
                if let Some(minutes) = snapshot.minutes {
                    state.params.time_level = clamp_level(minutes_to_level(minutes));
                }
            }
            debug!(
                "snapshot for {} ({} ingredients, {} step groups)",
                snapshot.recipe_name,
                snapshot.ingredients.len(),
                snapshot.directions.len()
            );
            state.snapshot = Some(Rc::new(snapshot));
            state.last_error = None;
        }
        self.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::level_to_minutes;
    use crate::testing::{FakeConnector, ManualScheduler, RecordingHistory};
    use serde_json::Value;

    const COOKIES_PAGE: &str = "https://example.com/recipe/chocolate-chip-cookies?amount=12&timelimit=60&ingredientsToBuild=flour";

    const COOKIES_SNAPSHOT: &str = r#"{
        "version": "v0.1.0",
        "recipe": "chocolate chip cookies",
        "measure": "batches",
        "amount": 12,
        "totalCost": "Lose $2.30",
        "totalTime": "3 days, 2 hours",
        "graph": "graphviz/cookies.png",
        "ingredients": [
            {"name": "flour", "amount": "1 ½ cups", "cost": "$1.00", "scratchTime": "+2 hours", "scratchCost": "Save $1.00"},
            {"name": "eggs", "amount": "2 whole", "cost": "$0.50", "scratchTime": "+6 months", "scratchCost": "Lose $30.00"}
        ],
        "directions": [
            {"name": "cookies", "totalTime": "1 hour", "texts": ["Mix.", "Bake."]}
        ]
    }"#;

    struct Harness {
        controller: SyncController<FakeConnector, ManualScheduler>,
        connector: FakeConnector,
        scheduler: ManualScheduler,
        history: RecordingHistory,
        views: Rc<RefCell<Vec<ViewState>>>,
    }

    impl Harness {
        fn new(page: &str) -> Self {
            let connector = FakeConnector::new();
            let scheduler = ManualScheduler::new();
            let history = RecordingHistory::new();
            let views = Rc::new(RefCell::new(Vec::new()));
            let sink = views.clone();
            let controller = SyncController::for_page(
                &Url::parse(page).unwrap(),
                connector.clone(),
                scheduler.clone(),
                Box::new(history.clone()),
                SyncConfig::default(),
                Rc::new(move |view: ViewState| sink.borrow_mut().push(view)),
            )
            .unwrap();
            Self {
                controller,
                connector,
                scheduler,
                history,
                views,
            }
        }

        /// Started and connected, with the initial request already sent.
        fn connected(page: &str) -> Self {
            let harness = Self::new(page);
            harness.controller.start();
            harness.connector.open_latest();
            harness
        }

        fn sent(&self) -> Vec<Value> {
            self.connector
                .sent()
                .iter()
                .map(|raw| serde_json::from_str(raw).unwrap())
                .collect()
        }

        fn last_view(&self) -> ViewState {
            self.views.borrow().last().cloned().unwrap()
        }
    }

    #[test]
    fn first_request_goes_out_when_connection_opens() {
        let h = Harness::new(COOKIES_PAGE);
        h.controller.start();
        assert_eq!(h.last_view().phase, SyncPhase::Loading);
        assert!(h.sent().is_empty());
        assert_eq!(h.connector.last_url().as_deref(), Some("wss://example.com/ws/chocolate-chip-cookies"));

        h.connector.open_latest();
        let sent = h.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["recipe"], "chocolate chip cookies");
        assert_eq!(sent[0]["ingredientsToBuild"], serde_json::json!({"flour": {}}));
        assert_eq!(sent[0]["amount"], 12.0);
        assert!((sent[0]["minutes"].as_f64().unwrap() - 60.0).abs() < 1e-6);

        assert_eq!(
            h.history.urls(),
            ["/recipe/chocolate-chip-cookies?amount=12&timelimit=60&ingredientsToBuild=flour"]
        );
    }

    #[test]
    fn snapshot_replaces_view_without_touching_url() {
        let h = Harness::connected(COOKIES_PAGE);
        let urls_before = h.history.urls();

        h.connector.deliver(COOKIES_SNAPSHOT);
        let view = h.last_view();
        assert_eq!(view.phase, SyncPhase::Ready);
        assert_eq!(view.params.amount, 12.0);
        assert_eq!(view.measure(), "batches");

        let snapshot = view.snapshot.unwrap();
        assert_eq!(snapshot.ingredients.len(), 2);
        assert_eq!(snapshot.directions[0].instruction_lines, ["Mix.", "Bake."]);
        assert_eq!(h.history.urls(), urls_before);
    }

    #[test]
    fn slider_burst_sends_one_request_with_last_value() {
        let h = Harness::connected(COOKIES_PAGE);
        let before = h.sent().len();

        for level in [5.0, 6.0, 7.0, 8.0, 9.0] {
            h.controller.set_time_level(level);
            h.scheduler.advance(20);
        }
        assert_eq!(h.sent().len(), before);
        assert_eq!(h.scheduler.live_timers(), 1);

        // 20ms already elapsed since the last edit.
        h.scheduler.advance(229);
        assert_eq!(h.sent().len(), before);
        h.scheduler.advance(1);

        let sent = h.sent();
        assert_eq!(sent.len(), before + 1);
        let minutes = sent.last().unwrap()["minutes"].as_f64().unwrap();
        assert!((minutes - level_to_minutes(9.0)).abs() < 1e-9);

        h.scheduler.advance(10_000);
        assert_eq!(h.sent().len(), before + 1);
    }

    #[test]
    fn debounced_request_reads_parameters_at_fire_time() {
        let h = Harness::connected(COOKIES_PAGE);
        h.controller.set_amount(3.0);
        h.scheduler.advance(100);
        h.controller.set_time_level(2.0);
        h.scheduler.advance(250);

        let last = h.sent().last().cloned().unwrap();
        assert_eq!(last["amount"], 3.0);
        assert!((last["minutes"].as_f64().unwrap() - 3.24).abs() < 1e-9);
        assert_eq!(
            h.history.urls().last().unwrap(),
            "/recipe/chocolate-chip-cookies?amount=3&timelimit=3&ingredientsToBuild=flour"
        );
    }

    #[test]
    fn toggle_sends_immediately_and_supersedes_pending_edit() {
        let h = Harness::connected(COOKIES_PAGE);
        let before = h.sent().len();

        h.controller.set_amount(5.0);
        h.controller.toggle_override("Eggs");

        let sent = h.sent();
        assert_eq!(sent.len(), before + 1);
        let last = sent.last().unwrap();
        assert_eq!(last["amount"], 5.0);
        assert_eq!(last["ingredientsToBuild"], serde_json::json!({"flour": {}, "eggs": {}}));

        h.scheduler.advance(1_000);
        assert_eq!(h.sent().len(), before + 1);

        h.controller.toggle_override("eggs");
        let last = h.sent().last().cloned().unwrap();
        assert_eq!(last["ingredientsToBuild"], serde_json::json!({"flour": {}}));
    }

    #[test]
    fn unchanged_overrides_do_not_send() {
        let h = Harness::connected(COOKIES_PAGE);
        let before = h.sent().len();
        h.controller.add_override("FLOUR ");
        h.controller.remove_override("butter");
        h.controller.toggle_override("   ");
        assert_eq!(h.sent().len(), before);

        h.controller.remove_override("flour");
        assert_eq!(h.sent().len(), before + 1);
        assert!(h.controller.params().overrides.is_empty());
    }

    #[test]
    fn malformed_frame_keeps_previous_snapshot() {
        let h = Harness::connected(COOKIES_PAGE);
        h.connector.deliver(COOKIES_SNAPSHOT);
        let good = h.last_view().snapshot.unwrap();

        h.connector.deliver("{\"recipe\": 42}");
        let view = h.last_view();
        assert!(Rc::ptr_eq(view.snapshot.as_ref().unwrap(), &good));
        assert_eq!(view.phase, SyncPhase::Ready);
        assert!(view.last_error.is_some());
    }

    #[test]
    fn frame_without_amount_keeps_slider_and_snapshot() {
        let h = Harness::connected(COOKIES_PAGE);
        h.connector.deliver(COOKIES_SNAPSHOT);
        let good = h.last_view().snapshot.unwrap();

        h.connector.deliver(r#"{"recipe":"chocolate chip cookies"}"#);
        let view = h.last_view();
        assert_eq!(view.params.amount, 12.0);
        assert!(Rc::ptr_eq(view.snapshot.as_ref().unwrap(), &good));
        assert!(view.last_error.is_some());
    }

    #[test]
    fn server_echo_overwrites_idle_sliders() {
        let h = Harness::connected(COOKIES_PAGE);
        h.controller.set_amount(20.0);
        h.scheduler.advance(250);

        h.connector
            .deliver(r#"{"recipe":"chocolate chip cookies","amount":24,"measure":"cookies","minutes":120}"#);
        let params = h.controller.params();
        assert_eq!(params.amount, 24.0);
        assert!((params.time_level - minutes_to_level(120.0)).abs() < 1e-9);
    }

    #[test]
    fn server_echo_does_not_clobber_pending_edit() {
        let h = Harness::connected(COOKIES_PAGE);
        h.controller.set_amount(7.0);
        h.connector.deliver(COOKIES_SNAPSHOT);

        let view = h.last_view();
        assert_eq!(view.params.amount, 7.0);
        assert!(view.dirty);
        assert!(view.snapshot.is_some());

        h.scheduler.advance(250);
        assert_eq!(h.sent().last().unwrap()["amount"], 7.0);
    }

    #[test]
    fn edits_while_reconnecting_are_sent_on_ready() {
        let h = Harness::connected(COOKIES_PAGE);
        let before = h.sent().len();
        h.connector.drop_latest();
        assert_eq!(h.last_view().connection, ConnectionState::Reconnecting);

        h.controller.set_amount(30.0);
        h.scheduler.advance(250);
        assert_eq!(h.sent().len(), before);

        h.scheduler.advance(u64::from(SyncConfig::default().reconnect_delay_ms));
        h.connector.open_latest();
        let sent = h.sent();
        assert_eq!(sent.len(), before + 1);
        assert_eq!(sent.last().unwrap()["amount"], 30.0);
    }

    #[test]
    fn exhaustion_keeps_last_snapshot() {
        let h = Harness::connected(COOKIES_PAGE);
        h.connector.deliver(COOKIES_SNAPSHOT);
        h.connector.drop_latest();

        h.scheduler.advance(10 * 60_000);
        let view = h.last_view();
        assert_eq!(view.connection, ConnectionState::Exhausted);
        assert!(view.is_disconnected());
        assert!(view.snapshot.is_some());
        assert!(view.last_error.unwrap().contains("gave up"));

        // Still editable locally.
        h.controller.set_amount(2.0);
        assert_eq!(h.controller.params().amount, 2.0);
    }

    #[test]
    fn out_of_range_input_is_clamped_or_ignored() {
        let h = Harness::connected(COOKIES_PAGE);
        h.controller.set_time_level(99.0);
        assert_eq!(h.controller.params().time_level, 30.0);
        h.controller.set_amount(f64::NAN);
        assert_eq!(h.controller.params().amount, 12.0);
        h.controller.set_amount(-4.0);
        assert_eq!(h.controller.params().amount, 0.0);
    }

    #[test]
    fn payload_reflects_current_parameters() {
        let h = Harness::new(COOKIES_PAGE);
        h.controller.set_amount(4.0);
        let payload: Value = serde_json::from_str(&h.controller.build_request_payload().unwrap()).unwrap();
        assert_eq!(payload["amount"], 4.0);
        assert_eq!(payload["recipe"], "chocolate chip cookies");
    }

    #[test]
    fn close_cancels_pending_request() {
        let h = Harness::connected(COOKIES_PAGE);
        let before = h.sent().len();
        h.controller.set_amount(9.0);
        h.controller.close();
        h.scheduler.advance(10_000);

        assert_eq!(h.sent().len(), before);
        assert_eq!(h.scheduler.live_timers(), 0);
        assert!(h.connector.latest_closed());
        assert_eq!(h.controller.connection(), ConnectionState::Closed);
    }

    #[test]
    fn view_labels_budget() {
        let h = Harness::new(COOKIES_PAGE);
        assert_eq!(h.controller.view().time_budget_label(), "1 hrs");
        assert!((h.controller.view().minutes() - 60.0).abs() < 1e-9);
    }
}
