//! In-memory stand-ins for the browser: a manual clock and a scripted socket.

use crate::controller::HistorySink;
use crate::error::TransportError;
use crate::timer::{Scheduler, Task};
use crate::transport::{Connector, Socket, SocketEvent, SocketEventSink};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

struct Pending {
    due_ms: u64,
    seq: u64,
    cancelled: Rc<Cell<bool>>,
    task: Task,
}

#[derive(Default)]
struct Clock {
    now_ms: u64,
    next_seq: u64,
    pending: Vec<Pending>,
}

/// Scheduler whose time only moves when a test calls [`ManualScheduler::advance`].
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<RefCell<Clock>>,
}

pub struct ManualHandle {
    cancelled: Rc<Cell<bool>>,
}

impl Drop for ManualHandle {
    fn drop(&mut self) {
        self.cancelled.set(true);
    }
}

impl Scheduler for ManualScheduler {
    type Handle = ManualHandle;

    fn schedule(&self, delay_ms: u32, task: Task) -> ManualHandle {
        let cancelled = Rc::new(Cell::new(false));
        let mut clock = self.clock.borrow_mut();
        let seq = clock.next_seq;
        clock.next_seq += 1;
        let due_ms = clock.now_ms + u64::from(delay_ms);
        clock.pending.push(Pending {
            due_ms,
            seq,
            cancelled: cancelled.clone(),
            task,
        });
        ManualHandle { cancelled }
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.borrow().now_ms
    }

    /// Timers that are scheduled and not cancelled.
    pub fn live_timers(&self) -> usize {
        self.clock
            .borrow()
            .pending
            .iter()
            .filter(|p| !p.cancelled.get())
            .count()
    }

    /// Move time forward, firing due tasks in order. Tasks may schedule more.
    pub fn advance(&self, ms: u64) {
        let target = self.clock.borrow().now_ms + ms;
        loop {
            let next = {
                let mut clock = self.clock.borrow_mut();
                clock.pending.retain(|p| !p.cancelled.get());
                let idx = clock
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.due_ms <= target)
                    .min_by_key(|(_, p)| (p.due_ms, p.seq))
                    .map(|(idx, _)| idx);
                idx.map(|idx| {
                    let pending = clock.pending.remove(idx);
                    clock.now_ms = pending.due_ms;
                    pending.task
                })
            };
            match next {
                Some(task) => task(),
                None => break,
            }
        }
        self.clock.borrow_mut().now_ms = target;
    }
}

#[derive(Default)]
struct SocketLog {
    sent: Vec<String>,
    closed: bool,
}

#[derive(Clone)]
pub struct FakeSocket {
    log: Rc<RefCell<SocketLog>>,
}

impl Socket for FakeSocket {
    fn send(&self, text: &str) -> Result<(), TransportError> {
        self.log.borrow_mut().sent.push(text.to_string());
        Ok(())
    }

    fn close(&self) {
        self.log.borrow_mut().closed = true;
    }
}

struct Attempt {
    url: String,
    sink: SocketEventSink,
    log: Rc<RefCell<SocketLog>>,
}

/// Connector that records every attempt and lets the test drive its events.
#[derive(Clone, Default)]
pub struct FakeConnector {
    attempts: Rc<RefCell<Vec<Attempt>>>,
    refuse: Rc<Cell<bool>>,
}

impl Connector for FakeConnector {
    type Socket = FakeSocket;

    fn connect(&self, url: &str, sink: SocketEventSink) -> Result<FakeSocket, TransportError> {
        if self.refuse.get() {
            return Err(TransportError::Connect {
                url: url.to_string(),
                reason: "refused".to_string(),
            });
        }
        let log = Rc::new(RefCell::new(SocketLog::default()));
        self.attempts.borrow_mut().push(Attempt {
            url: url.to_string(),
            sink,
            log: log.clone(),
        });
        Ok(FakeSocket { log })
    }
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `connect` fail synchronously from now on.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.set(refuse);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.borrow().len()
    }

    pub fn last_url(&self) -> Option<String> {
        self.attempts.borrow().last().map(|a| a.url.clone())
    }

    fn emit_latest(&self, event: SocketEvent) {
        let sink = self.attempts.borrow().last().map(|a| a.sink.clone());
        if let Some(sink) = sink {
            sink(event);
        }
    }

    pub fn open_latest(&self) {
        self.emit_latest(SocketEvent::Opened);
    }

    pub fn drop_latest(&self) {
        self.emit_latest(SocketEvent::Closed {
            code: 1006,
            reason: "abnormal closure".to_string(),
        });
    }

    /// Server-initiated close with a code that asks us not to come back.
    pub fn close_latest_cleanly(&self, code: u16) {
        self.emit_latest(SocketEvent::Closed {
            code,
            reason: "bye".to_string(),
        });
    }

    pub fn error_latest(&self) {
        self.emit_latest(SocketEvent::Error("network unreachable".to_string()));
    }

    pub fn deliver(&self, text: &str) {
        self.emit_latest(SocketEvent::Message(text.to_string()));
    }

    /// Frames written to every socket so far, oldest first.
    pub fn sent(&self) -> Vec<String> {
        self.attempts
            .borrow()
            .iter()
            .flat_map(|a| a.log.borrow().sent.clone())
            .collect()
    }

    pub fn latest_closed(&self) -> bool {
        self.attempts
            .borrow()
            .last()
            .map(|a| a.log.borrow().closed)
            .unwrap_or(false)
    }
}

/// History that just remembers what it was asked to show.
#[derive(Clone, Default)]
pub struct RecordingHistory {
    urls: Rc<RefCell<Vec<String>>>,
}

impl RecordingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.borrow().clone()
    }
}

impl HistorySink for RecordingHistory {
    fn replace_url(&self, url: &str) {
        self.urls.borrow_mut().push(url.to_string());
    }
}
