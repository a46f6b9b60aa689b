//! Cancellable one-shot timers.
//!
//! The engine never calls `setTimeout` directly. It asks a [`Scheduler`] for a
//! handle and keeps it; replacing or dropping the handle cancels the task.
//! In the browser this is `gloo_timers::callback::Timeout`, which already
//! clears its timer on drop.

use gloo_timers::callback::Timeout;

pub type Task = Box<dyn FnOnce()>;

pub trait Scheduler: Clone + 'static {
    /// Dropping the handle before the task fires must cancel it.
    type Handle: 'static;

    fn schedule(&self, delay_ms: u32, task: Task) -> Self::Handle;
}

/// Browser event-loop timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlooScheduler;

impl Scheduler for GlooScheduler {
    type Handle = Timeout;

    fn schedule(&self, delay_ms: u32, task: Task) -> Timeout {
        Timeout::new(delay_ms, task)
    }
}
