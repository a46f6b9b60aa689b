//! Persistent, self-reconnecting connection to the recipe server.
//!
//! ```text
//!  Closed --open()--> Connecting --opened--> Open
//!                         |                   |
//!                  failed/timeout          dropped
//!                         v                   v
//!                     Reconnecting <----------+
//!                     |          |
//!               opened|          |out of attempts
//!                     v          v
//!                    Open     Exhausted
//! ```
//!
//! A clean close from the server (1000, 1001 or 1005) takes `Open` straight
//! to `Closed` without a retry.
//!
//! Every connection attempt gets a generation number. Socket callbacks carry
//! the generation they were created for and are ignored once it is stale, so
//! a late `close` from a socket we already gave up on cannot count twice.

use crate::config::SyncConfig;
use crate::error::TransportError;
use crate::timer::Scheduler;
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// What a raw socket reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Opened,
    Message(String),
    Closed { code: u16, reason: String },
    Error(String),
}

pub type SocketEventSink = Rc<dyn Fn(SocketEvent)>;

pub trait Socket: 'static {
    fn send(&self, text: &str) -> Result<(), TransportError>;

    /// Must be idempotent and must stop further events from this socket.
    fn close(&self);
}

/// Opens raw sockets. The browser implementation wraps `web_sys::WebSocket`.
pub trait Connector: 'static {
    type Socket: Socket;

    fn connect(&self, url: &str, sink: SocketEventSink) -> Result<Self::Socket, TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never opened, or closed by the owner.
    Closed,
    Connecting,
    Open,
    Reconnecting,
    /// Ran out of reconnection attempts. Only an explicit `open()` leaves this.
    Exhausted,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Closed => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Exhausted => "disconnected",
        }
    }
}

/// Close codes after which the server does not want us back: normal
/// closure, going away, and no status.
const CLEAN_CLOSE_CODES: [u16; 3] = [1000, 1001, 1005];

fn is_clean_close(code: u16) -> bool {
    CLEAN_CLOSE_CODES.contains(&code)
}

/// What the session reports to its owner.
#[derive(Debug)]
pub enum SessionEvent {
    /// The connection just opened. Fired once per open transition.
    Ready,
    Message(String),
    StateChanged(ConnectionState),
    Failed(TransportError),
}

pub type SessionEventSink = Rc<dyn Fn(SessionEvent)>;

struct SessionState<K, H> {
    status: ConnectionState,
    socket: Option<K>,
    generation: u64,
    reconnects: u32,
    /// Either the per-attempt timeout or the delay before the next attempt.
    timer: Option<H>,
}

struct Shared<C: Connector, S: Scheduler> {
    url: String,
    connector: C,
    scheduler: S,
    config: SyncConfig,
    sink: SessionEventSink,
    state: RefCell<SessionState<C::Socket, S::Handle>>,
}

/// Owned handle to the connection. Dropping it closes the socket and cancels
/// any pending reconnect.
pub struct TransportSession<C: Connector, S: Scheduler> {
    shared: Rc<Shared<C, S>>,
}

impl<C: Connector, S: Scheduler> TransportSession<C, S> {
    /// Nothing is opened until [`TransportSession::open`] is called.
    pub fn new(
        url: impl Into<String>,
        connector: C,
        scheduler: S,
        config: SyncConfig,
        sink: SessionEventSink,
    ) -> Self {
        Self {
            shared: Rc::new(Shared {
                url: url.into(),
                connector,
                scheduler,
                config,
                sink,
                state: RefCell::new(SessionState {
                    status: ConnectionState::Closed,
                    socket: None,
                    generation: 0,
                    reconnects: 0,
                    timer: None,
                }),
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state.borrow().status
    }

    /// Start connecting. A no-op while already connecting or open; from
    /// `Exhausted` it starts over with a fresh attempt budget.
    pub fn open(&self) {
        {
            let mut state = self.shared.state.borrow_mut();
            match state.status {
                ConnectionState::Connecting
                | ConnectionState::Open
                | ConnectionState::Reconnecting => return,
                ConnectionState::Closed | ConnectionState::Exhausted => {}
            }
            state.reconnects = 0;
        }
        Shared::connect(&self.shared, ConnectionState::Connecting);
    }

    /// Fire-and-forget. Frames sent while not open are dropped; the owner
    /// re-sends current state on the next `Ready`.
    pub fn send(&self, text: &str) {
        let state = self.shared.state.borrow();
        match (&state.status, &state.socket) {
            (ConnectionState::Open, Some(socket)) => {
                if let Err(e) = socket.send(text) {
                    warn!("{}", e);
                }
            }
            (status, _) => debug!("dropping frame while {:?}", status),
        }
    }

    /// Tear the connection down and stop reconnecting.
    pub fn close(&self) {
        let socket = {
            let mut state = self.shared.state.borrow_mut();
            state.status = ConnectionState::Closed;
            state.generation += 1;
            state.timer = None;
            state.socket.take()
        };
        if let Some(socket) = socket {
            socket.close();
        }
    }
}

impl<C: Connector, S: Scheduler> Drop for TransportSession<C, S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: Connector, S: Scheduler> Shared<C, S> {
    fn emit(&self, events: Vec<SessionEvent>) {
        for event in events {
            (self.sink)(event);
        }
    }

    fn connect(this: &Rc<Self>, status: ConnectionState) {
        let generation = {
            let mut state = this.state.borrow_mut();
            state.generation += 1;
            state.status = status;
            state.timer = None;
            state.generation
        };
        this.emit(vec![SessionEvent::StateChanged(status)]);

        let weak = Rc::downgrade(this);
        let sink: SocketEventSink = Rc::new(move |event: SocketEvent| {
            if let Some(shared) = weak.upgrade() {
                Shared::on_socket_event(&shared, generation, event);
            }
        });

        debug!("connecting to {} (generation {})", this.url, generation);
        match this.connector.connect(&this.url, sink) {
            Ok(socket) => {
                let stale = {
                    let mut state = this.state.borrow_mut();
                    if state.generation != generation {
                        Some(socket)
                    } else {
                        state.socket = Some(socket);
                        if state.status != ConnectionState::Open {
                            let weak = Rc::downgrade(this);
                            state.timer = Some(this.scheduler.schedule(
                                this.config.reconnect_timeout_ms,
                                Box::new(move || Shared::on_attempt_timeout(&weak, generation)),
                            ));
                        }
                        None
                    }
                };
                // Opened and failed again before `connect` even returned.
                if let Some(socket) = stale {
                    socket.close();
                }
            }
            Err(e) => Shared::attempt_failed(this, generation, e),
        }
    }

    fn on_attempt_timeout(weak: &Weak<Self>, generation: u64) {
        let Some(this) = weak.upgrade() else {
            return;
        };
        let attempt = this.state.borrow().reconnects;
        Shared::attempt_failed(&this, generation, TransportError::Timeout { attempt });
    }

    fn on_socket_event(this: &Rc<Self>, generation: u64, event: SocketEvent) {
        if this.state.borrow().generation != generation {
            debug!("ignoring {:?} from stale connection", event);
            return;
        }

        match event {
            SocketEvent::Opened => {
                {
                    let mut state = this.state.borrow_mut();
                    state.status = ConnectionState::Open;
                    state.reconnects = 0;
                    state.timer = None;
                }
                info!("connected to {}", this.url);
                this.emit(vec![
                    SessionEvent::StateChanged(ConnectionState::Open),
                    SessionEvent::Ready,
                ]);
            }
            SocketEvent::Message(text) => {
                if this.state.borrow().status == ConnectionState::Open {
                    this.emit(vec![SessionEvent::Message(text)]);
                }
            }
            SocketEvent::Closed { code, .. } if is_clean_close(code) => {
                Shared::closed_by_server(this, generation, code);
            }
            SocketEvent::Closed { code, reason } => {
                let e = TransportError::Connect {
                    url: this.url.clone(),
                    reason: format!("closed with code {} {}", code, reason),
                };
                Shared::attempt_failed(this, generation, e);
            }
            SocketEvent::Error(reason) => {
                let e = TransportError::Connect {
                    url: this.url.clone(),
                    reason,
                };
                Shared::attempt_failed(this, generation, e);
            }
        }
    }

    /// The server ended the connection on purpose. Stay closed until the
    /// owner calls `open()` again.
    fn closed_by_server(this: &Rc<Self>, generation: u64, code: u16) {
        let socket = {
            let mut state = this.state.borrow_mut();
            if state.generation != generation || state.status == ConnectionState::Closed {
                return;
            }
            state.generation += 1;
            state.status = ConnectionState::Closed;
            state.timer = None;
            state.socket.take()
        };
        if let Some(socket) = socket {
            socket.close();
        }
        info!("{} closed the connection (code {}); not reconnecting", this.url, code);
        this.emit(vec![SessionEvent::StateChanged(ConnectionState::Closed)]);
    }

    /// The current attempt (or live connection) is gone. Schedule the next
    /// attempt or give up.
    fn attempt_failed(this: &Rc<Self>, generation: u64, cause: TransportError) {
        let (socket, next) = {
            let mut state = this.state.borrow_mut();
            if state.generation != generation || state.status == ConnectionState::Closed {
                return;
            }
            // Invalidate every callback of the failed socket.
            state.generation += 1;
            state.timer = None;
            let socket = state.socket.take();

            if state.reconnects >= this.config.max_reconnect_attempts {
                state.status = ConnectionState::Exhausted;
                (socket, None)
            } else {
                state.reconnects += 1;
                state.status = ConnectionState::Reconnecting;
                let weak = Rc::downgrade(this);
                let retry_generation = state.generation;
                state.timer = Some(this.scheduler.schedule(
                    this.config.reconnect_delay_ms,
                    Box::new(move || {
                        if let Some(shared) = weak.upgrade() {
                            let current = shared.state.borrow().generation;
                            if current == retry_generation {
                                Shared::connect(&shared, ConnectionState::Reconnecting);
                            }
                        }
                    }),
                ));
                (socket, Some(state.reconnects))
            }
        };
        if let Some(socket) = socket {
            socket.close();
        }

        match next {
            Some(attempt) => {
                info!(
                    "{}; reconnecting (attempt {}/{})",
                    cause, attempt, this.config.max_reconnect_attempts
                );
                this.emit(vec![SessionEvent::StateChanged(ConnectionState::Reconnecting)]);
            }
            None => {
                let attempts = this.config.max_reconnect_attempts;
                error!("{}; giving up after {} reconnection attempts", cause, attempts);
                this.emit(vec![
                    SessionEvent::StateChanged(ConnectionState::Exhausted),
                    SessionEvent::Failed(TransportError::Exhausted { attempts }),
                ]);
            }
        }
    }
}
