//! Host abstraction for waking the update scheduler.
//!
//! The runtime never sleeps or spins on its own: when work is enqueued it
//! asks the host for a wakeup through this trait and the host calls back
//! into [`crate::Runtime::flush_immediate`] or [`crate::Runtime::flush_frame`]
//! at the matching point of its event loop. This keeps the scheduler
//! portable across browsers, native frame loops, and headless test hosts.

/// Wakes the host on behalf of the update scheduler.
///
/// Implementations only record the wake request; the actual flush is driven
/// by the host thread that owns the runtime. They must be safe to share
/// across threads so event sources can request wakeups from anywhere.
pub trait HostScheduler: Send + Sync {
    /// Request a wakeup ahead of frame-synced work (microtask-like).
    fn schedule_immediate(&self);

    /// Request a wakeup at the host's next frame boundary.
    ///
    /// All non-immediate priorities share one pending frame request, so
    /// repeated calls before the flush are expected and must be cheap.
    fn schedule_frame(&self);
}
