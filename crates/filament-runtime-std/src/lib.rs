//! Standard host services backed by Rust's `std` library.
//!
//! This crate provides a concrete implementation of the scheduling seam
//! defined in `filament-core`. Applications construct a [`StdHost`] and
//! pump it from their event loop: wake requests recorded by the
//! [`StdHostScheduler`] are serviced as flushes, with microtask-like
//! immediate work always drained ahead of frame-synced work.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use filament_core::{HostScheduler, RenderAdapter, Runtime, StateChange};

/// Scheduler backend that records wake requests and optionally notifies a
/// host waker, so event loops can sleep until the runtime has work.
pub struct StdHostScheduler {
    immediate_requested: AtomicBool,
    frame_requested: AtomicBool,
    waker: RwLock<Option<Arc<dyn Fn() + Send + Sync + 'static>>>,
}

impl StdHostScheduler {
    pub fn new() -> Self {
        Self {
            immediate_requested: AtomicBool::new(false),
            frame_requested: AtomicBool::new(false),
            waker: RwLock::new(None),
        }
    }

    /// Returns whether an immediate wakeup was requested since the last call.
    pub fn take_immediate_request(&self) -> bool {
        self.immediate_requested.swap(false, Ordering::SeqCst)
    }

    /// Returns whether a frame wakeup was requested since the last call.
    pub fn take_frame_request(&self) -> bool {
        self.frame_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker invoked whenever either kind of wakeup is armed.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self.waker.write().unwrap() = Some(Arc::new(waker));
    }

    /// Clears any registered waker.
    pub fn clear_waker(&self) {
        *self.waker.write().unwrap() = None;
    }

    fn wake(&self) {
        let waker = self.waker.read().unwrap().clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdHostScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdHostScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdHostScheduler")
            .field(
                "immediate_requested",
                &self.immediate_requested.load(Ordering::SeqCst),
            )
            .field(
                "frame_requested",
                &self.frame_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl HostScheduler for StdHostScheduler {
    fn schedule_immediate(&self) {
        self.immediate_requested.store(true, Ordering::SeqCst);
        self.wake();
    }

    fn schedule_frame(&self) {
        self.frame_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Render adapter that mirrors accepted state writes onto the `log` facade;
/// useful for headless hosts and debugging sessions.
#[derive(Debug, Default)]
pub struct LogRenderAdapter;

impl RenderAdapter for LogRenderAdapter {
    fn state_changed(&self, change: &StateChange) {
        log::debug!(
            "state change: component={} hook={}",
            change.component_id,
            change.hook_index
        );
    }
}

/// Convenience container bundling a runtime with the standard scheduler.
#[derive(Clone)]
pub struct StdHost {
    scheduler: Arc<StdHostScheduler>,
    runtime: Runtime,
}

impl StdHost {
    pub fn new() -> Self {
        let scheduler = Arc::new(StdHostScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        Self { scheduler, runtime }
    }

    /// Same as [`new`](Self::new) but mirrors state writes to the log.
    pub fn with_logging() -> Self {
        let host = Self::new();
        host.runtime.set_render_adapter(Rc::new(LogRenderAdapter));
        host
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn scheduler(&self) -> &Arc<StdHostScheduler> {
        &self.scheduler
    }

    /// Services all outstanding wake requests once: every pending immediate
    /// flush first, then at most one frame flush. Returns whether any flush
    /// ran.
    pub fn pump(&self) -> bool {
        let mut flushed = false;
        while self.scheduler.take_immediate_request() {
            self.runtime.flush_immediate();
            flushed = true;
        }
        if self.scheduler.take_frame_request() {
            self.runtime.flush_frame();
            flushed = true;
        }
        flushed
    }

    /// Pumps until the runtime goes quiet or the iteration budget runs out.
    /// Returns true when the runtime settled.
    pub fn run_until_settled(&self, max_iterations: usize) -> bool {
        for _ in 0..max_iterations {
            let flushed = self.pump();
            if !flushed && !self.runtime.has_scheduled_work() {
                return true;
            }
        }
        !self.runtime.has_scheduled_work()
    }
}

impl Default for StdHost {
    fn default() -> Self {
        Self::new()
    }
}
