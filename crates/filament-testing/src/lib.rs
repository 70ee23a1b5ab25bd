//! Testing harness for Filament hook runtimes.
//!
//! [`TestHost`] drives a runtime the way a renderer would, without an event
//! loop: it mounts components from plain closures, keeps their update
//! callbacks alive, counts the wake requests the scheduler emits, and
//! flushes on demand.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use filament_core::{HostScheduler, Runtime, Scope, UpdateCallback, UpdatePriority};
use indexmap::IndexMap;

/// Backend double that counts wake requests instead of waking anything.
#[derive(Default)]
pub struct CountingScheduler {
    immediate: AtomicUsize,
    frame: AtomicUsize,
}

impl CountingScheduler {
    pub fn immediate_requests(&self) -> usize {
        self.immediate.load(Ordering::SeqCst)
    }

    pub fn frame_requests(&self) -> usize {
        self.frame.load(Ordering::SeqCst)
    }
}

impl HostScheduler for CountingScheduler {
    fn schedule_immediate(&self) {
        self.immediate.fetch_add(1, Ordering::SeqCst);
    }

    fn schedule_frame(&self) {
        self.frame.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counts how often a component body ran; clone it into the body closure.
#[derive(Clone, Default)]
pub struct RenderCounter {
    count: Rc<Cell<usize>>,
}

impl RenderCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) {
        self.count.set(self.count.get() + 1);
    }

    pub fn get(&self) -> usize {
        self.count.get()
    }
}

/// Renderer stand-in owning one runtime and the mounted component bodies.
pub struct TestHost {
    scheduler: Arc<CountingScheduler>,
    runtime: Runtime,
    mounted: RefCell<IndexMap<String, UpdateCallback>>,
}

impl TestHost {
    pub fn new() -> Self {
        let scheduler = Arc::new(CountingScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        Self {
            scheduler,
            runtime,
            mounted: RefCell::new(IndexMap::new()),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn scheduler(&self) -> &CountingScheduler {
        &self.scheduler
    }

    /// Renders `body` under `id` with a stored update callback that re-runs
    /// it, the contract a real renderer honors for every component.
    pub fn mount(&self, id: &str, body: impl FnMut(&Scope<'_>) + 'static) {
        let body = Rc::new(RefCell::new(body));
        let callback: UpdateCallback = {
            let runtime = self.runtime.clone();
            let id = id.to_string();
            let body = Rc::clone(&body);
            Rc::new(move || {
                let body = Rc::clone(&body);
                runtime.render(&id, None, |scope| (&mut *body.borrow_mut())(scope));
            })
        };
        self.mounted
            .borrow_mut()
            .insert(id.to_string(), Rc::clone(&callback));
        self.runtime.render(id, Some(callback), |scope| {
            (&mut *body.borrow_mut())(scope)
        });
    }

    /// Unmounts the component and drops its stored body.
    pub fn unmount(&self, id: &str) -> bool {
        self.mounted.borrow_mut().shift_remove(id);
        self.runtime.unmount_component(id)
    }

    /// Mounted ids in mount order.
    pub fn mounted_ids(&self) -> Vec<String> {
        self.mounted.borrow().keys().cloned().collect()
    }

    /// Enqueues a re-render of `id` at NORMAL priority.
    pub fn invalidate(&self, id: &str) {
        self.runtime
            .schedule_update(id, UpdatePriority::Normal)
            .expect("invalidate of an unmounted component");
    }

    /// One full flush: immediate work first, then a frame pass.
    pub fn flush(&self) {
        self.runtime.flush_immediate();
        self.runtime.flush_frame();
    }

    /// Flushes until the runtime goes quiet or the budget runs out; returns
    /// true when it settled.
    pub fn flush_until_idle(&self, max_passes: usize) -> bool {
        for _ in 0..max_passes {
            if !self.runtime.has_scheduled_work() {
                return true;
            }
            self.flush();
        }
        !self.runtime.has_scheduled_work()
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}
