//! Priority-bucketed update scheduling and flushing.
//!
//! Five ordered levels. IMMEDIATE work is woken through the host's
//! microtask-like channel and drains ahead of frame-synced work; the four
//! remaining levels share a single pending frame request. A flush drains
//! buckets strictly in priority order, invoking each due component's stored
//! update callback at most once, then runs deferred effects grouped by
//! owning component.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use crate::collections::map::HashSet;
use crate::platform::HostScheduler;
use crate::{Runtime, RuntimeError, RuntimeInner};

/// Urgency of a scheduled component update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpdatePriority {
    Immediate,
    High,
    Normal,
    Low,
    Idle,
}

impl UpdatePriority {
    pub const ALL: [UpdatePriority; 5] = [
        UpdatePriority::Immediate,
        UpdatePriority::High,
        UpdatePriority::Normal,
        UpdatePriority::Low,
        UpdatePriority::Idle,
    ];

    fn index(self) -> usize {
        match self {
            UpdatePriority::Immediate => 0,
            UpdatePriority::High => 1,
            UpdatePriority::Normal => 2,
            UpdatePriority::Low => 3,
            UpdatePriority::Idle => 4,
        }
    }
}

/// No-op backend; the owner drives flushes directly.
#[derive(Default)]
pub struct DefaultScheduler;

impl HostScheduler for DefaultScheduler {
    fn schedule_immediate(&self) {}
    fn schedule_frame(&self) {}
}

#[cfg(test)]
#[derive(Default)]
pub struct TestScheduler;

#[cfg(test)]
impl HostScheduler for TestScheduler {
    fn schedule_immediate(&self) {}
    fn schedule_frame(&self) {}
}

pub(crate) type EffectKey = (String, usize);

#[derive(Default)]
struct Bucket {
    updates: Vec<String>,
    update_members: HashSet<String>,
    effects: Vec<EffectKey>,
    effect_members: HashSet<EffectKey>,
}

pub(crate) struct SchedulerState {
    buckets: RefCell<[Bucket; 5]>,
    tasks: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    immediate_armed: Cell<bool>,
    frame_armed: Cell<bool>,
    flush_priority: Cell<Option<UpdatePriority>>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self {
            buckets: RefCell::new(std::array::from_fn(|_| Bucket::default())),
            tasks: RefCell::new(VecDeque::new()),
            immediate_armed: Cell::new(false),
            frame_armed: Cell::new(false),
            flush_priority: Cell::new(None),
        }
    }

    /// Adds the id to the bucket unless it is already queued there or at a
    /// more urgent level in this flush window. Returns whether it was added.
    pub fn enqueue_update(&self, id: &str, priority: UpdatePriority) -> bool {
        let mut buckets = self.buckets.borrow_mut();
        for bucket in buckets.iter().take(priority.index() + 1) {
            if bucket.update_members.contains(id) {
                return false;
            }
        }
        let bucket = &mut buckets[priority.index()];
        bucket.update_members.insert(id.to_string());
        bucket.updates.push(id.to_string());
        true
    }

    pub fn enqueue_effect(&self, key: EffectKey, priority: UpdatePriority) -> bool {
        let mut buckets = self.buckets.borrow_mut();
        let bucket = &mut buckets[priority.index()];
        if bucket.effect_members.contains(&key) {
            return false;
        }
        bucket.effect_members.insert(key.clone());
        bucket.effects.push(key);
        true
    }

    pub fn push_task(&self, task: Box<dyn FnOnce()>) {
        self.tasks.borrow_mut().push_back(task);
    }

    pub fn take_tasks(&self) -> Vec<Box<dyn FnOnce()>> {
        self.tasks.borrow_mut().drain(..).collect()
    }

    pub fn drain_updates(&self, priority: UpdatePriority) -> Vec<String> {
        let mut buckets = self.buckets.borrow_mut();
        let bucket = &mut buckets[priority.index()];
        bucket.update_members.clear();
        bucket.updates.drain(..).collect()
    }

    pub fn drain_effects(&self, priority: UpdatePriority) -> Vec<EffectKey> {
        let mut buckets = self.buckets.borrow_mut();
        let bucket = &mut buckets[priority.index()];
        bucket.effect_members.clear();
        bucket.effects.drain(..).collect()
    }

    pub fn has_pending_work(&self) -> bool {
        let buckets = self.buckets.borrow();
        buckets
            .iter()
            .any(|bucket| !bucket.updates.is_empty() || !bucket.effects.is_empty())
            || !self.tasks.borrow().is_empty()
    }

    pub fn arm_immediate(&self) -> bool {
        !self.immediate_armed.replace(true)
    }

    pub fn arm_frame(&self) -> bool {
        !self.frame_armed.replace(true)
    }

    pub fn disarm_immediate(&self) {
        self.immediate_armed.set(false);
    }

    pub fn disarm_frame(&self) {
        self.frame_armed.set(false);
    }

    pub fn flush_priority(&self) -> Option<UpdatePriority> {
        self.flush_priority.get()
    }

    fn set_flush_priority(&self, priority: Option<UpdatePriority>) {
        self.flush_priority.set(priority);
    }
}

impl RuntimeInner {
    /// Marks the record dirty and enqueues it. Returns false for ids without
    /// a registry record.
    pub(crate) fn schedule_update_at(&self, id: &str, priority: UpdatePriority) -> bool {
        {
            let mut components = self.components.borrow_mut();
            let Some(record) = components.get_mut(id) else {
                return false;
            };
            record.needs_update = true;
            record.update_scheduled = true;
        }
        if self.sched.enqueue_update(id, priority) {
            self.arm(priority);
        }
        true
    }

    pub(crate) fn queue_effect(&self, component: &str, index: usize) {
        let key = (component.to_string(), index);
        match self.sched.flush_priority() {
            // Mid-flush: the effect phase of this same flush picks it up.
            Some(priority) => {
                self.sched.enqueue_effect(key, priority);
            }
            None => {
                if self.sched.enqueue_effect(key, UpdatePriority::Normal) {
                    self.arm(UpdatePriority::Normal);
                }
            }
        }
    }

    pub(crate) fn push_deferred_task(&self, task: Box<dyn FnOnce()>) {
        self.sched.push_task(task);
        if self.sched.arm_frame() {
            self.backend.schedule_frame();
        }
    }

    fn arm(&self, priority: UpdatePriority) {
        match priority {
            UpdatePriority::Immediate => {
                if self.sched.arm_immediate() {
                    self.backend.schedule_immediate();
                }
            }
            _ => {
                if self.sched.arm_frame() {
                    self.backend.schedule_frame();
                }
            }
        }
    }

    pub(crate) fn run_scheduled_updates(&self, priorities: &[UpdatePriority]) {
        for &priority in priorities {
            self.sched.set_flush_priority(Some(priority));
            let ids = self.sched.drain_updates(priority);
            for id in ids {
                let callback = {
                    let mut components = self.components.borrow_mut();
                    match components.get_mut(&id) {
                        Some(record) if record.needs_update => {
                            record.needs_update = false;
                            record.update_callback.clone()
                        }
                        Some(record) => {
                            record.update_scheduled = false;
                            None
                        }
                        None => None,
                    }
                };
                let Some(callback) = callback else { continue };
                if let Err(message) = crate::catch_isolated(|| callback()) {
                    log::error!(
                        "{}: {message}",
                        RuntimeError::UpdateCallback {
                            component: id.clone()
                        }
                    );
                }
                let mut components = self.components.borrow_mut();
                if let Some(record) = components.get_mut(&id) {
                    record.update_scheduled = false;
                }
            }
            self.sched.set_flush_priority(None);
        }
    }

    pub(crate) fn run_scheduled_effects(&self, priorities: &[UpdatePriority]) {
        let mut keys: Vec<EffectKey> = Vec::new();
        for &priority in priorities {
            keys.extend(self.sched.drain_effects(priority));
        }
        if keys.is_empty() {
            return;
        }
        // Group by owning component, preserving first-seen order.
        let mut order: Vec<String> = Vec::new();
        let mut grouped: crate::collections::map::HashMap<String, Vec<usize>> =
            crate::collections::map::HashMap::new();
        for (component, index) in keys {
            if !grouped.contains_key(&component) {
                order.push(component.clone());
            }
            grouped.entry(component).or_default().push(index);
        }
        for component in order {
            if let Some(indices) = grouped.remove(&component) {
                for index in indices {
                    self.run_effect(&component, index);
                }
            }
        }
    }

    /// Runs one deferred effect slot: previous cleanup first, then the
    /// staged body, storing any returned teardown. Skips slots whose
    /// component unmounted or whose staging was superseded.
    pub(crate) fn run_effect(&self, component: &str, index: usize) {
        let staged = {
            let mut components = self.components.borrow_mut();
            let Some(record) = components.get_mut(component) else {
                return;
            };
            let Some(slot) = record.effects.get_mut(index) else {
                return;
            };
            if !slot.pending {
                return;
            }
            slot.pending = false;
            (slot.id.clone(), slot.body.take(), slot.cleanup.take())
        };
        let (effect_id, body, cleanup) = staged;
        if let Some(cleanup) = cleanup {
            if let Err(message) = crate::catch_isolated(cleanup) {
                log::error!(
                    "{} (cleanup): {message}",
                    RuntimeError::EffectExecution {
                        effect: effect_id.clone()
                    }
                );
            }
        }
        let Some(body) = body else { return };
        match crate::catch_isolated(body) {
            Ok(Some(next_cleanup)) => {
                let mut components = self.components.borrow_mut();
                if let Some(slot) = components
                    .get_mut(component)
                    .and_then(|record| record.effects.get_mut(index))
                {
                    slot.cleanup = Some(next_cleanup);
                }
            }
            Ok(None) => {}
            Err(message) => {
                log::error!(
                    "{}: {message}",
                    RuntimeError::EffectExecution { effect: effect_id }
                );
            }
        }
    }

    pub(crate) fn run_deferred_tasks(&self) {
        for task in self.sched.take_tasks() {
            if let Err(message) = crate::catch_isolated(task) {
                log::error!("deferred task panicked: {message}");
            }
        }
    }
}

impl Runtime {
    /// Enqueues a component for update at the given priority.
    pub fn schedule_update(&self, id: &str, priority: UpdatePriority) -> Result<(), RuntimeError> {
        if self.inner().schedule_update_at(id, priority) {
            Ok(())
        } else {
            Err(RuntimeError::UnknownComponent { id: id.to_string() })
        }
    }

    /// Drains IMMEDIATE-priority updates and effects. The host calls this
    /// from its microtask-like wakeup, ahead of frame-synced work.
    pub fn flush_immediate(&self) {
        self.inner().sched.disarm_immediate();
        self.inner()
            .run_scheduled_updates(&[UpdatePriority::Immediate]);
        self.inner()
            .run_scheduled_effects(&[UpdatePriority::Immediate]);
    }

    /// Drains every bucket in strict priority order, then deferred effects
    /// grouped by component, then the deferred task queue. The host calls
    /// this from its frame wakeup.
    pub fn flush_frame(&self) {
        self.inner().sched.disarm_frame();
        self.inner().run_scheduled_updates(&UpdatePriority::ALL);
        self.inner().run_scheduled_effects(&UpdatePriority::ALL);
        self.inner().run_deferred_tasks();
    }

    pub fn has_scheduled_work(&self) -> bool {
        self.inner().sched.has_pending_work()
    }
}
