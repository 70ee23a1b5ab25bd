#![doc = r"Hook runtime core for the Filament experiment."]

//! Render functions get persistent, call-order-addressed state across
//! invocations: a registry of per-component slot arrays, a re-entrant
//! context stack selecting which component owns the hook cursor, and a
//! priority-bucketed scheduler that batches update callbacks per component.
//! The host renderer brackets every render with [`Runtime::enter_context`] /
//! [`Runtime::exit_context`] (or the scoped [`Runtime::render`]) and drives
//! flushes from its event loop through the [`HostScheduler`] seam.

pub mod adapter;
pub mod collections;
pub mod context;
pub mod deps;
pub mod platform;
pub mod scheduler;
pub mod scope;
mod slots;
mod store;

pub use adapter::{RenderAdapter, StateChange};
pub use context::Context;
pub use deps::Deps;
pub use platform::HostScheduler;
pub use scheduler::{DefaultScheduler, UpdatePriority};
pub use scope::{
    cleanup, Dispatch, GlobalSetter, IntoCleanup, MutableRef, Scope, StateSetter,
    TransitionStarter,
};
pub use slots::{Cleanup, ComponentStats, UpdateCallback};

#[cfg(test)]
pub use scheduler::TestScheduler;

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::collections::map::HashMap;
use crate::context::ContextRegistry;
use crate::deps::DepsComparator;
use crate::scheduler::SchedulerState;
use crate::slots::{ComponentRecord, HookCursor};
use crate::store::GlobalStore;

/// Failures surfaced by the runtime.
///
/// `ContextMissing` is a programming error and is raised as a panic when a
/// hook fires without an active component; the remaining variants are
/// containment labels for caught panics and recoverable protocol errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    ContextMissing,
    UnknownComponent { id: String },
    EffectExecution { effect: String },
    UpdateCallback { component: String },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::ContextMissing => {
                write!(f, "hook invoked outside of an active component context")
            }
            RuntimeError::UnknownComponent { id } => {
                write!(f, "component {id:?} has no registry record")
            }
            RuntimeError::EffectExecution { effect } => {
                write!(f, "effect {effect} failed")
            }
            RuntimeError::UpdateCallback { component } => {
                write!(f, "update callback of component {component:?} failed")
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Runs `f`, converting a panic into an error message so one misbehaving
/// effect or callback cannot stall the flush.
pub(crate) fn catch_isolated<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

/// Suspended context of an outer component while a nested one renders.
pub(crate) struct ContextFrame {
    pub component_id: String,
    pub saved_cursor: HookCursor,
}

pub(crate) struct RuntimeInner {
    pub(crate) backend: Arc<dyn HostScheduler>,
    pub(crate) components: RefCell<HashMap<String, ComponentRecord>>,
    pub(crate) active: RefCell<Option<String>>,
    pub(crate) context_stack: RefCell<Vec<ContextFrame>>,
    pub(crate) sched: SchedulerState,
    pub(crate) store: GlobalStore,
    pub(crate) contexts: ContextRegistry,
    pub(crate) comparator: RefCell<DepsComparator>,
    pub(crate) adapter: RefCell<Option<Rc<dyn RenderAdapter>>>,
}

impl RuntimeInner {
    fn new(backend: Arc<dyn HostScheduler>) -> Self {
        Self {
            backend,
            components: RefCell::new(HashMap::new()),
            active: RefCell::new(None),
            context_stack: RefCell::new(Vec::new()),
            sched: SchedulerState::new(),
            store: GlobalStore::new(),
            contexts: ContextRegistry::new(),
            comparator: RefCell::new(DepsComparator::new()),
            adapter: RefCell::new(None),
        }
    }

    /// Resolves a functional update against the live slot value, then writes.
    pub(crate) fn update_state_slot<T: Clone + PartialEq + 'static>(
        &self,
        component: &str,
        index: usize,
        resolve: impl FnOnce(&T) -> T,
    ) {
        let current: T = {
            let components = self.components.borrow();
            let Some(record) = components.get(component) else {
                log::debug!("state update for unmounted component {component:?} dropped");
                return;
            };
            let Some(slot) = record.states.get(index) else {
                return;
            };
            match slot.value.downcast_ref::<T>() {
                Some(value) => value.clone(),
                None => {
                    log::error!(
                        "state slot {index} of component {component:?} holds a different type"
                    );
                    return;
                }
            }
        };
        let next = resolve(&current);
        self.write_state_slot(component, index, next);
    }

    /// Writes only when the value differs from the live one; an accepted
    /// write notifies the render adapter and enqueues a NORMAL update.
    pub(crate) fn write_state_slot<T: Clone + PartialEq + 'static>(
        &self,
        component: &str,
        index: usize,
        next: T,
    ) {
        let change = {
            let mut components = self.components.borrow_mut();
            let Some(record) = components.get_mut(component) else {
                return;
            };
            let Some(slot) = record.states.get_mut(index) else {
                return;
            };
            match slot.value.downcast_ref::<T>() {
                Some(live) if *live == next => None,
                Some(_) => {
                    let old = Rc::clone(&slot.value);
                    let new: Rc<dyn Any> = Rc::new(next);
                    slot.value = Rc::clone(&new);
                    record.needs_update = true;
                    Some((old, new))
                }
                None => None,
            }
        };
        let Some((old, new)) = change else {
            return;
        };
        self.notify_state_change(component, index, old, new);
        self.schedule_update_at(component, UpdatePriority::Normal);
    }

    pub(crate) fn dispatch_action<S, A>(&self, component: &str, index: usize, action: A)
    where
        S: Clone + PartialEq + 'static,
        A: 'static,
    {
        let staged = {
            let components = self.components.borrow();
            components
                .get(component)
                .and_then(|record| record.states.get(index))
                .and_then(|slot| {
                    let current = slot.value.downcast_ref::<S>()?.clone();
                    let reducer = slot
                        .reducer
                        .as_ref()?
                        .downcast_ref::<Rc<dyn Fn(&S, A) -> S>>()?
                        .clone();
                    Some((current, reducer))
                })
        };
        let Some((current, reducer)) = staged else {
            return;
        };
        let next = reducer(&current, action);
        self.write_state_slot(component, index, next);
    }

    pub(crate) fn set_global_entry(&self, key: &str, value: Rc<dyn Any>, type_name: &'static str) {
        let listeners = self.store.set(key, value, type_name);
        for id in listeners {
            self.schedule_update_at(&id, UpdatePriority::Normal);
        }
    }

    fn notify_state_change(
        &self,
        component: &str,
        hook_index: usize,
        old_value: Rc<dyn Any>,
        new_value: Rc<dyn Any>,
    ) {
        let adapter = self.adapter.borrow().clone();
        if let Some(adapter) = adapter {
            adapter.state_changed(&StateChange {
                component_id: component.to_string(),
                hook_index,
                old_value,
                new_value,
            });
        }
    }
}

/// One isolated hook runtime: component registry, context stack, global
/// store, context registry, and update scheduler. Cheap to clone; clones
/// share the same state. Multiple runtimes coexist in one process without
/// sharing anything.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

/// Weak reference to a runtime, held by setters and adapters so they do not
/// keep the runtime alive; operations on a dropped runtime are no-ops.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub(crate) fn upgrade(&self) -> Option<Rc<RuntimeInner>> {
        self.0.upgrade()
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub fn schedule_update(&self, id: &str, priority: UpdatePriority) -> bool {
        self.upgrade()
            .map(|inner| inner.schedule_update_at(id, priority))
            .unwrap_or(false)
    }

    pub fn set_global_state<T: 'static>(&self, key: &str, value: T) {
        if let Some(inner) = self.upgrade() {
            inner.set_global_entry(key, Rc::new(value), std::any::type_name::<T>());
        }
    }
}

impl Runtime {
    pub fn new(backend: Arc<dyn HostScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(backend)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub(crate) fn inner(&self) -> &RuntimeInner {
        &self.inner
    }

    /// Activates `id` as the current component, creating its record on first
    /// entry and resetting its hook cursor. A different previously-active
    /// component is suspended on the context stack; entering a component
    /// that is already active or suspended marks a fresh top-level pass and
    /// clears the stale stack instead of pushing a duplicate frame.
    ///
    /// `update` replaces the stored update callback when given; `None`
    /// keeps whatever the record already holds.
    pub fn enter_context(&self, id: &str, update: Option<UpdateCallback>) {
        let inner = self.inner();
        {
            let mut components = inner.components.borrow_mut();
            let record = components
                .entry(id.to_string())
                .or_insert_with(|| ComponentRecord::new(id));
            if let Some(callback) = update {
                record.update_callback = Some(callback);
            }
        }
        {
            let mut active = inner.active.borrow_mut();
            let mut stack = inner.context_stack.borrow_mut();
            match active.as_deref() {
                Some(current) if current == id => {
                    stack.clear();
                }
                Some(current) => {
                    if stack.iter().any(|frame| frame.component_id == id) {
                        stack.clear();
                    } else {
                        let saved_cursor = inner
                            .components
                            .borrow()
                            .get(current)
                            .map(|record| record.cursor)
                            .unwrap_or_default();
                        stack.push(ContextFrame {
                            component_id: current.to_string(),
                            saved_cursor,
                        });
                    }
                }
                None => {}
            }
            *active = Some(id.to_string());
        }
        let mut components = inner.components.borrow_mut();
        if let Some(record) = components.get_mut(id) {
            record.cursor.reset();
            record.is_mounted = true;
        }
    }

    /// Deactivates the current component, restoring the suspended outer
    /// component and its exact cursor, or clearing the context entirely
    /// when the stack is empty. Errors when nothing is active.
    pub fn exit_context(&self) -> Result<(), RuntimeError> {
        let inner = self.inner();
        let mut active = inner.active.borrow_mut();
        if active.is_none() {
            return Err(RuntimeError::ContextMissing);
        }
        let mut stack = inner.context_stack.borrow_mut();
        match stack.pop() {
            Some(frame) => {
                let mut components = inner.components.borrow_mut();
                if let Some(record) = components.get_mut(&frame.component_id) {
                    record.cursor = frame.saved_cursor;
                }
                *active = Some(frame.component_id);
            }
            None => {
                *active = None;
            }
        }
        Ok(())
    }

    /// Scoped entry/exit around `content`; the exit runs on every path out,
    /// including a panicking render closure.
    pub fn render<R>(
        &self,
        id: &str,
        update: Option<UpdateCallback>,
        content: impl FnOnce(&Scope<'_>) -> R,
    ) -> R {
        self.enter_context(id, update);
        struct ExitGuard<'a>(&'a Runtime);
        impl Drop for ExitGuard<'_> {
            fn drop(&mut self) {
                if self.0.exit_context().is_err() {
                    log::error!("render exit without a matching context entry");
                }
            }
        }
        let guard = ExitGuard(self);
        let scope = Scope::new(guard.0);
        content(&scope)
    }

    /// Scope for the currently active context, for callers driving raw
    /// `enter_context`/`exit_context` pairs.
    pub fn scope(&self) -> Result<Scope<'_>, RuntimeError> {
        if self.inner().active.borrow().is_some() {
            Ok(Scope::new(self))
        } else {
            Err(RuntimeError::ContextMissing)
        }
    }

    /// Removes the component's record, running every outstanding effect
    /// cleanup exactly once. Global-state and context subscriptions are not
    /// removed; the scheduler skips ids without a record.
    pub fn unmount_component(&self, id: &str) -> bool {
        let record = self.inner().components.borrow_mut().remove(id);
        let Some(mut record) = record else {
            return false;
        };
        record.is_mounted = false;
        for slot in record.effects.iter_mut() {
            slot.pending = false;
            slot.body = None;
            if let Some(teardown) = slot.cleanup.take() {
                if let Err(message) = catch_isolated(teardown) {
                    log::error!(
                        "{} (cleanup at unmount): {message}",
                        RuntimeError::EffectExecution {
                            effect: slot.id.clone()
                        }
                    );
                }
            }
        }
        true
    }

    /// Enqueues every mounted component at NORMAL priority; used for global
    /// invalidation such as hot-reload.
    pub fn force_update_all_components(&self) {
        let ids: Vec<String> = self.inner().components.borrow().keys().cloned().collect();
        for id in ids {
            self.inner().schedule_update_at(&id, UpdatePriority::Normal);
        }
    }

    pub fn get_component_stats(&self, id: &str) -> Option<ComponentStats> {
        self.inner()
            .components
            .borrow()
            .get(id)
            .map(ComponentRecord::stats)
    }

    pub fn get_all_component_stats(&self) -> Vec<ComponentStats> {
        let mut stats: Vec<ComponentStats> = self
            .inner()
            .components
            .borrow()
            .values()
            .map(ComponentRecord::stats)
            .collect();
        stats.sort_by(|a, b| a.id.cmp(&b.id));
        stats
    }

    pub fn set_render_adapter(&self, adapter: Rc<dyn RenderAdapter>) {
        *self.inner().adapter.borrow_mut() = Some(adapter);
    }

    pub fn clear_render_adapter(&self) {
        *self.inner().adapter.borrow_mut() = None;
    }

    /// Stores a global-state value and synchronously enqueues every
    /// subscribed component at NORMAL priority.
    pub fn set_global_state<T: 'static>(&self, key: &str, value: T) {
        self.inner()
            .set_global_entry(key, Rc::new(value), std::any::type_name::<T>());
    }

    pub fn global_state_value<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        self.inner().store.get::<T>(key)
    }

    pub fn unsubscribe_from_global_state(&self, key: &str, component: &str) -> bool {
        self.inner().store.unsubscribe(key, component)
    }

    /// Sorted subscriber ids of a global-state key; for introspection and
    /// for tests that pin down the additive-subscription leak.
    pub fn global_state_subscribers(&self, key: &str) -> Vec<String> {
        self.inner().store.listeners(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps;
    use std::cell::Cell;

    fn test_runtime() -> Runtime {
        Runtime::new(Arc::new(TestScheduler))
    }

    /// Mounts a component whose stored update callback re-runs `body`, the
    /// way a renderer would drive it.
    fn mount(
        runtime: &Runtime,
        id: &str,
        body: impl FnMut(&Scope<'_>) + 'static,
    ) -> UpdateCallback {
        let body = Rc::new(RefCell::new(body));
        let callback: UpdateCallback = {
            let runtime = runtime.clone();
            let id = id.to_string();
            let body = Rc::clone(&body);
            Rc::new(move || {
                let body = Rc::clone(&body);
                runtime.render(&id, None, |scope| (&mut *body.borrow_mut())(scope));
            })
        };
        runtime.render(id, Some(Rc::clone(&callback)), |scope| {
            (&mut *body.borrow_mut())(scope)
        });
        callback
    }

    type Captured<T> = Rc<RefCell<Option<T>>>;

    fn captured<T>() -> Captured<T> {
        Rc::new(RefCell::new(None))
    }

    #[test]
    fn slots_are_isolated_between_components() {
        let runtime = test_runtime();
        let a_values: Rc<RefCell<Vec<i32>>> = Rc::new(RefCell::new(Vec::new()));
        let b_values: Rc<RefCell<Vec<i32>>> = Rc::new(RefCell::new(Vec::new()));
        let a_setter: Captured<StateSetter<i32>> = captured();
        let b_setter: Captured<StateSetter<i32>> = captured();

        {
            let values = Rc::clone(&a_values);
            let setter = Rc::clone(&a_setter);
            mount(&runtime, "A", move |scope| {
                let (value, set) = scope.use_state(|| 1);
                values.borrow_mut().push(value);
                *setter.borrow_mut() = Some(set);
            });
        }
        {
            let values = Rc::clone(&b_values);
            let setter = Rc::clone(&b_setter);
            mount(&runtime, "B", move |scope| {
                let (value, set) = scope.use_state(|| 100);
                values.borrow_mut().push(value);
                *setter.borrow_mut() = Some(set);
            });
        }

        a_setter.borrow().as_ref().unwrap().set(2);
        runtime.flush_frame();
        b_setter.borrow().as_ref().unwrap().set(200);
        runtime.flush_frame();

        assert_eq!(*a_values.borrow(), vec![1, 2]);
        assert_eq!(*b_values.borrow(), vec![100, 200]);
    }

    #[test]
    fn identity_equal_write_does_not_enqueue() {
        let runtime = test_runtime();
        let renders = Rc::new(Cell::new(0));
        let setter: Captured<StateSetter<i32>> = captured();
        {
            let renders = Rc::clone(&renders);
            let captured = Rc::clone(&setter);
            mount(&runtime, "Counter", move |scope| {
                renders.set(renders.get() + 1);
                let (_, set) = scope.use_state(|| 7);
                *captured.borrow_mut() = Some(set);
            });
        }
        assert_eq!(renders.get(), 1);

        setter.borrow().as_ref().unwrap().set(7);
        assert!(!runtime.has_scheduled_work());
        runtime.flush_frame();
        assert_eq!(renders.get(), 1);
    }

    #[test]
    fn synchronous_set_burst_collapses_into_one_update() {
        let runtime = test_runtime();
        let renders = Rc::new(Cell::new(0));
        let values: Rc<RefCell<Vec<i32>>> = Rc::new(RefCell::new(Vec::new()));
        let setter: Captured<StateSetter<i32>> = captured();
        {
            let renders = Rc::clone(&renders);
            let values = Rc::clone(&values);
            let captured = Rc::clone(&setter);
            mount(&runtime, "Counter", move |scope| {
                renders.set(renders.get() + 1);
                let (value, set) = scope.use_state(|| 0);
                values.borrow_mut().push(value);
                *captured.borrow_mut() = Some(set);
            });
        }

        let set = setter.borrow().as_ref().unwrap().clone();
        set.set_with(|previous| previous + 1);
        set.set_with(|previous| previous + 1);
        set.set_with(|previous| previous + 1);
        runtime.flush_frame();

        // Three synchronous functional writes resolve against the live value
        // and coalesce into exactly one callback invocation.
        assert_eq!(renders.get(), 2);
        assert_eq!(*values.borrow(), vec![0, 3]);
    }

    #[test]
    fn functional_update_resolves_against_live_value() {
        let runtime = test_runtime();
        let values: Rc<RefCell<Vec<i32>>> = Rc::new(RefCell::new(Vec::new()));
        let setter: Captured<StateSetter<i32>> = captured();
        {
            let values = Rc::clone(&values);
            let captured = Rc::clone(&setter);
            mount(&runtime, "Counter", move |scope| {
                let (value, set) = scope.use_state(|| 0);
                values.borrow_mut().push(value);
                *captured.borrow_mut() = Some(set);
            });
        }
        let set = setter.borrow().as_ref().unwrap().clone();
        set.set(10);
        set.set_with(|previous| previous + 1);
        runtime.flush_frame();
        assert_eq!(*values.borrow(), vec![0, 11]);
    }

    #[test]
    fn effect_with_empty_deps_runs_once_and_cleans_up_at_unmount() {
        let runtime = test_runtime();
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        {
            let log = Rc::clone(&log);
            mount(&runtime, "Widget", move |scope| {
                let effect_log = Rc::clone(&log);
                scope.use_effect(Some(deps![]), move || {
                    effect_log.borrow_mut().push("body");
                    let teardown_log = Rc::clone(&effect_log);
                    cleanup(move || teardown_log.borrow_mut().push("cleanup"))
                });
            });
        }
        runtime.flush_frame();
        assert_eq!(*log.borrow(), vec!["body"]);

        runtime.schedule_update("Widget", UpdatePriority::Normal).unwrap();
        runtime.flush_frame();
        assert_eq!(*log.borrow(), vec!["body"]);

        assert!(runtime.unmount_component("Widget"));
        assert_eq!(*log.borrow(), vec!["body", "cleanup"]);
        assert!(runtime.get_component_stats("Widget").is_none());
    }

    #[test]
    fn effect_without_deps_reruns_every_cycle() {
        let runtime = test_runtime();
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        {
            let log = Rc::clone(&log);
            mount(&runtime, "Widget", move |scope| {
                let effect_log = Rc::clone(&log);
                scope.use_effect(None, move || {
                    effect_log.borrow_mut().push("body");
                    let teardown_log = Rc::clone(&effect_log);
                    cleanup(move || teardown_log.borrow_mut().push("cleanup"))
                });
            });
        }
        runtime.flush_frame();
        runtime.schedule_update("Widget", UpdatePriority::Normal).unwrap();
        runtime.flush_frame();
        assert_eq!(*log.borrow(), vec!["body", "cleanup", "body"]);
    }

    #[test]
    fn effect_reruns_when_a_dependency_changes() {
        let runtime = test_runtime();
        let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let setter: Captured<StateSetter<String>> = captured();
        {
            let log = Rc::clone(&log);
            let captured = Rc::clone(&setter);
            mount(&runtime, "Fetcher", move |scope| {
                let (url, set_url) = scope.use_state(|| "a".to_string());
                *captured.borrow_mut() = Some(set_url);
                let effect_log = Rc::clone(&log);
                let effect_url = url.clone();
                scope.use_effect(Some(deps![url]), move || {
                    effect_log.borrow_mut().push(format!("body:{effect_url}"));
                    let teardown_log = Rc::clone(&effect_log);
                    cleanup(move || teardown_log.borrow_mut().push(format!("cleanup:{effect_url}")))
                });
            });
        }
        runtime.flush_frame();

        // Same url: the effect body is not re-invoked.
        runtime.schedule_update("Fetcher", UpdatePriority::Normal).unwrap();
        runtime.flush_frame();
        assert_eq!(*log.borrow(), vec!["body:a".to_string()]);

        // Different url: previous cleanup runs, then the new body.
        setter.borrow().as_ref().unwrap().set("b".to_string());
        runtime.flush_frame();
        assert_eq!(
            *log.borrow(),
            vec![
                "body:a".to_string(),
                "cleanup:a".to_string(),
                "body:b".to_string()
            ]
        );
    }

    #[test]
    fn layout_effect_runs_synchronously_inside_the_render() {
        let runtime = test_runtime();
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        {
            let log = Rc::clone(&log);
            mount(&runtime, "Widget", move |scope| {
                log.borrow_mut().push("render");
                let effect_log = Rc::clone(&log);
                scope.use_layout_effect(None, move || {
                    effect_log.borrow_mut().push("layout");
                    let teardown_log = Rc::clone(&effect_log);
                    cleanup(move || teardown_log.borrow_mut().push("teardown"))
                });
            });
        }
        // No flush needed: the body already ran during the mount render.
        assert_eq!(*log.borrow(), vec!["render", "layout"]);

        runtime.schedule_update("Widget", UpdatePriority::Normal).unwrap();
        runtime.flush_frame();
        assert_eq!(
            *log.borrow(),
            vec!["render", "layout", "render", "teardown", "layout"]
        );
    }

    #[test]
    fn memo_recomputes_only_when_dependencies_change() {
        let runtime = test_runtime();
        let computes = Rc::new(Cell::new(0));
        let memos: Rc<RefCell<Vec<Rc<i32>>>> = Rc::new(RefCell::new(Vec::new()));
        let setter: Captured<StateSetter<i32>> = captured();
        {
            let computes = Rc::clone(&computes);
            let memos = Rc::clone(&memos);
            let captured = Rc::clone(&setter);
            mount(&runtime, "Widget", move |scope| {
                let (dep, set_dep) = scope.use_state(|| 1);
                *captured.borrow_mut() = Some(set_dep);
                let counter = Rc::clone(&computes);
                let memo = scope.use_memo(Some(deps![dep]), move || {
                    counter.set(counter.get() + 1);
                    dep * 10
                });
                memos.borrow_mut().push(memo);
            });
        }
        assert_eq!(computes.get(), 1);

        // Unchanged dep: the cached Rc is returned, not a recomputation.
        runtime.schedule_update("Widget", UpdatePriority::Normal).unwrap();
        runtime.flush_frame();
        assert_eq!(computes.get(), 1);
        {
            let memos = memos.borrow();
            assert!(Rc::ptr_eq(&memos[0], &memos[1]));
        }

        setter.borrow().as_ref().unwrap().set(2);
        runtime.flush_frame();
        assert_eq!(computes.get(), 2);
        assert_eq!(*memos.borrow()[2], 20);
    }

    #[test]
    fn callback_identity_is_stable_while_deps_are_unchanged() {
        let runtime = test_runtime();
        let handles: Rc<RefCell<Vec<Rc<Box<dyn Fn() -> i32>>>>> = Rc::new(RefCell::new(Vec::new()));
        let setter: Captured<StateSetter<i32>> = captured();
        {
            let handles = Rc::clone(&handles);
            let captured = Rc::clone(&setter);
            mount(&runtime, "Widget", move |scope| {
                let (dep, set_dep) = scope.use_state(|| 1);
                *captured.borrow_mut() = Some(set_dep);
                let callback: Rc<Box<dyn Fn() -> i32>> =
                    scope.use_callback(Some(deps![dep]), Box::new(move || dep) as Box<dyn Fn() -> i32>);
                handles.borrow_mut().push(callback);
            });
        }
        runtime.schedule_update("Widget", UpdatePriority::Normal).unwrap();
        runtime.flush_frame();
        setter.borrow().as_ref().unwrap().set(2);
        runtime.flush_frame();

        let handles = handles.borrow();
        assert_eq!(handles.len(), 3);
        assert!(Rc::ptr_eq(&handles[0], &handles[1]));
        assert!(!Rc::ptr_eq(&handles[1], &handles[2]));
        assert_eq!((*handles[2])(), 2);
    }

    #[test]
    fn ref_cell_is_allocated_once_and_shared() {
        let runtime = test_runtime();
        let refs: Rc<RefCell<Vec<MutableRef<i32>>>> = Rc::new(RefCell::new(Vec::new()));
        {
            let refs = Rc::clone(&refs);
            mount(&runtime, "Widget", move |scope| {
                let cell = scope.use_ref(|| 0);
                cell.update(|value| *value += 1);
                refs.borrow_mut().push(cell);
            });
        }
        runtime.schedule_update("Widget", UpdatePriority::Normal).unwrap();
        runtime.flush_frame();

        let refs = refs.borrow();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0], refs[1]);
        assert_eq!(refs[1].get(), 2);
    }

    #[test]
    fn use_id_is_stable_across_renders_and_distinct_per_slot() {
        let runtime = test_runtime();
        let ids: Rc<RefCell<Vec<(String, String)>>> = Rc::new(RefCell::new(Vec::new()));
        {
            let ids = Rc::clone(&ids);
            mount(&runtime, "Widget", move |scope| {
                let first = scope.use_id();
                let second = scope.use_id();
                ids.borrow_mut().push((first, second));
            });
        }
        runtime.schedule_update("Widget", UpdatePriority::Normal).unwrap();
        runtime.flush_frame();

        let ids = ids.borrow();
        assert_eq!(ids[0], ids[1]);
        assert_ne!(ids[0].0, ids[0].1);
        assert!(ids[0].0.starts_with("fl-"));
    }

    #[test]
    fn reducer_dispatch_updates_and_skips_identity_results() {
        let runtime = test_runtime();
        let values: Rc<RefCell<Vec<i32>>> = Rc::new(RefCell::new(Vec::new()));
        let dispatch: Captured<Dispatch<i32, i32>> = captured();
        {
            let values = Rc::clone(&values);
            let captured = Rc::clone(&dispatch);
            mount(&runtime, "Widget", move |scope| {
                let (value, dispatch) = scope.use_reducer(|state, delta| state + delta, || 0);
                values.borrow_mut().push(value);
                *captured.borrow_mut() = Some(dispatch);
            });
        }
        let dispatch = dispatch.borrow().as_ref().unwrap().clone();
        dispatch.dispatch(5);
        runtime.flush_frame();
        assert_eq!(*values.borrow(), vec![0, 5]);

        // Identity result: no update enqueued.
        dispatch.dispatch(0);
        assert!(!runtime.has_scheduled_work());
        runtime.flush_frame();
        assert_eq!(*values.borrow(), vec![0, 5]);
    }

    #[test]
    fn immediate_updates_flush_before_frame_synced_priorities() {
        let runtime = test_runtime();
        let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        {
            let order = Rc::clone(&order);
            mount(&runtime, "A", move |_| order.borrow_mut().push("A"));
        }
        {
            let order = Rc::clone(&order);
            mount(&runtime, "B", move |_| order.borrow_mut().push("B"));
        }
        order.borrow_mut().clear();

        // Enqueued first at a frame-synced priority, yet drained second.
        runtime.schedule_update("A", UpdatePriority::Normal).unwrap();
        runtime.schedule_update("B", UpdatePriority::Immediate).unwrap();
        runtime.flush_frame();
        assert_eq!(*order.borrow(), vec!["B", "A"]);
    }

    #[test]
    fn immediate_flush_leaves_frame_synced_work_queued() {
        let runtime = test_runtime();
        let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        {
            let order = Rc::clone(&order);
            mount(&runtime, "A", move |_| order.borrow_mut().push("A"));
        }
        {
            let order = Rc::clone(&order);
            mount(&runtime, "B", move |_| order.borrow_mut().push("B"));
        }
        order.borrow_mut().clear();

        runtime.schedule_update("A", UpdatePriority::Normal).unwrap();
        runtime.schedule_update("B", UpdatePriority::Immediate).unwrap();
        runtime.flush_immediate();
        assert_eq!(*order.borrow(), vec!["B"]);
        runtime.flush_frame();
        assert_eq!(*order.borrow(), vec!["B", "A"]);
    }

    #[test]
    fn reschedule_at_higher_urgency_delivers_exactly_once() {
        let runtime = test_runtime();
        let renders = Rc::new(Cell::new(0));
        {
            let renders = Rc::clone(&renders);
            mount(&runtime, "A", move |_| renders.set(renders.get() + 1));
        }
        assert_eq!(renders.get(), 1);

        runtime.schedule_update("A", UpdatePriority::Low).unwrap();
        runtime.schedule_update("A", UpdatePriority::Immediate).unwrap();
        runtime.flush_immediate();
        assert_eq!(renders.get(), 2);
        // The stale LOW entry is neutralized by the consumed dirty flag.
        runtime.flush_frame();
        assert_eq!(renders.get(), 2);
    }

    #[test]
    fn scheduling_an_unknown_component_errors() {
        let runtime = test_runtime();
        assert_eq!(
            runtime.schedule_update("Ghost", UpdatePriority::Normal),
            Err(RuntimeError::UnknownComponent {
                id: "Ghost".to_string()
            })
        );
    }

    #[test]
    fn context_update_enqueues_exactly_the_subscribers() {
        let runtime = test_runtime();
        let theme = runtime.create_context::<String>("light".to_string());
        let header_themes: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let footer_themes: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let sidebar_renders = Rc::new(Cell::new(0));

        {
            let themes = Rc::clone(&header_themes);
            mount(&runtime, "Header", move |scope| {
                themes.borrow_mut().push((*scope.use_context(&theme)).clone());
            });
        }
        {
            let themes = Rc::clone(&footer_themes);
            mount(&runtime, "Footer", move |scope| {
                themes.borrow_mut().push((*scope.use_context(&theme)).clone());
            });
        }
        {
            let renders = Rc::clone(&sidebar_renders);
            mount(&runtime, "Sidebar", move |_| renders.set(renders.get() + 1));
        }

        assert_eq!(
            runtime.context_subscribers(&theme),
            vec!["Footer".to_string(), "Header".to_string()]
        );

        runtime.provide_context(&theme, "dark".to_string());
        runtime.flush_frame();
        assert_eq!(*header_themes.borrow(), vec!["light", "dark"]);
        assert_eq!(*footer_themes.borrow(), vec!["light", "dark"]);
        assert_eq!(sidebar_renders.get(), 1);
    }

    #[test]
    fn reference_equal_context_write_does_not_notify() {
        let runtime = test_runtime();
        let counter_ctx = runtime.create_context::<i32>(0);
        let renders = Rc::new(Cell::new(0));
        {
            let renders = Rc::clone(&renders);
            mount(&runtime, "Consumer", move |scope| {
                renders.set(renders.get() + 1);
                let _ = scope.use_context(&counter_ctx);
            });
        }
        let shared = Rc::new(1);
        runtime.set_context_value(&counter_ctx, Rc::clone(&shared));
        runtime.flush_frame();
        assert_eq!(renders.get(), 2);

        // Same Rc again: reference-equal, no subscriber enqueued.
        runtime.set_context_value(&counter_ctx, shared);
        assert!(!runtime.has_scheduled_work());
        runtime.flush_frame();
        assert_eq!(renders.get(), 2);
    }

    #[test]
    fn global_state_notifies_subscribers_only() {
        let runtime = test_runtime();
        let header_themes: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let footer_themes: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let sidebar_renders = Rc::new(Cell::new(0));

        {
            let themes = Rc::clone(&header_themes);
            mount(&runtime, "Header", move |scope| {
                let (theme, _) = scope.use_global_state("theme", || "light".to_string());
                themes.borrow_mut().push(theme);
            });
        }
        {
            let themes = Rc::clone(&footer_themes);
            mount(&runtime, "Footer", move |scope| {
                let (theme, _) = scope.use_global_state("theme", || "light".to_string());
                themes.borrow_mut().push(theme);
            });
        }
        {
            let renders = Rc::clone(&sidebar_renders);
            mount(&runtime, "Sidebar", move |_| renders.set(renders.get() + 1));
        }

        runtime.set_global_state("theme", "dark".to_string());
        runtime.flush_frame();
        assert_eq!(*header_themes.borrow(), vec!["light", "dark"]);
        assert_eq!(*footer_themes.borrow(), vec!["light", "dark"]);
        assert_eq!(sidebar_renders.get(), 1);
    }

    #[test]
    fn global_setter_resolves_functional_updates() {
        let runtime = test_runtime();
        let counts: Rc<RefCell<Vec<i32>>> = Rc::new(RefCell::new(Vec::new()));
        let setter: Captured<GlobalSetter<i32>> = captured();
        {
            let counts = Rc::clone(&counts);
            let captured = Rc::clone(&setter);
            mount(&runtime, "Widget", move |scope| {
                let (count, set) = scope.use_global_state("count", || 0);
                counts.borrow_mut().push(count);
                *captured.borrow_mut() = Some(set);
            });
        }
        let set = setter.borrow().as_ref().unwrap().clone();
        set.set_with(|previous| previous + 41);
        runtime.flush_frame();
        assert_eq!(*counts.borrow(), vec![0, 41]);
        assert_eq!(runtime.global_state_value::<i32>("count"), Some(41));
    }

    #[test]
    fn global_state_subscription_survives_unmount() {
        // The subscriber set is additive; unmount does not prune it. The
        // flush tolerates the dead id by skipping it.
        let runtime = test_runtime();
        let footer_renders = Rc::new(Cell::new(0));
        mount(&runtime, "Header", move |scope| {
            let _ = scope.use_global_state("theme", || "light".to_string());
        });
        {
            let renders = Rc::clone(&footer_renders);
            mount(&runtime, "Footer", move |scope| {
                renders.set(renders.get() + 1);
                let _ = scope.use_global_state("theme", || "light".to_string());
            });
        }

        assert!(runtime.unmount_component("Header"));
        assert_eq!(
            runtime.global_state_subscribers("theme"),
            vec!["Footer".to_string(), "Header".to_string()]
        );

        runtime.set_global_state("theme", "dark".to_string());
        runtime.flush_frame();
        assert_eq!(footer_renders.get(), 2);
        assert!(runtime.get_component_stats("Header").is_none());
    }

    #[test]
    fn explicit_unsubscribe_removes_the_component() {
        let runtime = test_runtime();
        let renders = Rc::new(Cell::new(0));
        let unsubscribe = Rc::new(Cell::new(false));
        {
            let renders = Rc::clone(&renders);
            let unsubscribe = Rc::clone(&unsubscribe);
            mount(&runtime, "Widget", move |scope| {
                renders.set(renders.get() + 1);
                let _ = scope.use_global_state("feed", || 0);
                if unsubscribe.get() {
                    scope.unsubscribe_from_global_state("feed");
                }
            });
        }
        unsubscribe.set(true);
        runtime.schedule_update("Widget", UpdatePriority::Normal).unwrap();
        runtime.flush_frame();
        // The re-render resubscribed before unsubscribing; the explicit
        // unsubscribe wins because it ran last.
        assert!(runtime.global_state_subscribers("feed").is_empty());

        runtime.set_global_state("feed", 1);
        runtime.flush_frame();
        assert_eq!(renders.get(), 2);
    }

    #[test]
    fn nested_context_resumes_the_outer_cursor() {
        let runtime = test_runtime();
        let layout_values: Rc<RefCell<Vec<(String, String, String)>>> =
            Rc::new(RefCell::new(Vec::new()));
        let page_values: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let third_setter: Captured<StateSetter<String>> = captured();

        {
            let layout_values = Rc::clone(&layout_values);
            let page_values = Rc::clone(&page_values);
            let third_setter = Rc::clone(&third_setter);
            mount(&runtime, "RootLayout", move |scope| {
                let (first, _) = scope.use_state(|| "r0".to_string());
                let (second, _) = scope.use_state(|| "r1".to_string());
                let page_values = Rc::clone(&page_values);
                scope.runtime().render("Page", None, |page| {
                    let (value, _) = page.use_state(|| "p0".to_string());
                    page_values.borrow_mut().push(value);
                });
                // Back on RootLayout: the cursor must resume at slot 2.
                let (third, set_third) = scope.use_state(|| "r2".to_string());
                *third_setter.borrow_mut() = Some(set_third);
                layout_values.borrow_mut().push((first, second, third));
            });
        }

        assert_eq!(
            *layout_values.borrow(),
            vec![("r0".to_string(), "r1".to_string(), "r2".to_string())]
        );
        assert_eq!(*page_values.borrow(), vec!["p0".to_string()]);

        // Writing through the post-nesting setter must hit slot 2 of the
        // layout, not the page's slot 0.
        third_setter.borrow().as_ref().unwrap().set("r2x".to_string());
        runtime.flush_frame();
        assert_eq!(
            layout_values.borrow().last().unwrap().clone(),
            ("r0".to_string(), "r1".to_string(), "r2x".to_string())
        );
        assert_eq!(*page_values.borrow(), vec!["p0".to_string(), "p0".to_string()]);
    }

    #[test]
    fn update_callback_panic_is_contained() {
        let runtime = test_runtime();
        let good_renders = Rc::new(Cell::new(0));
        let explode = Rc::new(Cell::new(false));
        {
            let explode = Rc::clone(&explode);
            mount(&runtime, "Bad", move |_| {
                if explode.get() {
                    panic!("render exploded");
                }
            });
        }
        {
            let renders = Rc::clone(&good_renders);
            mount(&runtime, "Good", move |_| renders.set(renders.get() + 1));
        }

        explode.set(true);
        runtime.schedule_update("Bad", UpdatePriority::Normal).unwrap();
        runtime.schedule_update("Good", UpdatePriority::Normal).unwrap();
        runtime.flush_frame();

        assert_eq!(good_renders.get(), 2);
        // The panicking render exited its context on unwind.
        assert!(runtime.scope().is_err());
    }

    #[test]
    fn effect_panic_does_not_stop_sibling_effects() {
        let runtime = test_runtime();
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        {
            let log = Rc::clone(&log);
            mount(&runtime, "Widget", move |scope| {
                scope.use_effect(Some(deps![]), || -> () { panic!("first effect exploded") });
                let sibling_log = Rc::clone(&log);
                scope.use_effect(Some(deps![]), move || {
                    sibling_log.borrow_mut().push("sibling");
                });
            });
        }
        {
            let log = Rc::clone(&log);
            mount(&runtime, "Other", move |scope| {
                let other_log = Rc::clone(&log);
                scope.use_effect(Some(deps![]), move || {
                    other_log.borrow_mut().push("other");
                });
            });
        }
        runtime.flush_frame();
        assert_eq!(*log.borrow(), vec!["sibling", "other"]);
    }

    #[test]
    fn transition_flips_pending_around_the_deferred_action() {
        let runtime = test_runtime();
        let pendings: Rc<RefCell<Vec<bool>>> = Rc::new(RefCell::new(Vec::new()));
        let starter: Captured<TransitionStarter> = captured();
        let action_ran = Rc::new(Cell::new(false));
        {
            let pendings = Rc::clone(&pendings);
            let captured = Rc::clone(&starter);
            mount(&runtime, "Widget", move |scope| {
                let (pending, start) = scope.use_transition();
                pendings.borrow_mut().push(pending);
                *captured.borrow_mut() = Some(start);
            });
        }
        let start = starter.borrow().as_ref().unwrap().clone();
        {
            let action_ran = Rc::clone(&action_ran);
            start.start(move || action_ran.set(true));
        }
        runtime.flush_frame();
        assert!(action_ran.get());
        assert_eq!(*pendings.borrow(), vec![false, true]);

        runtime.flush_frame();
        assert_eq!(*pendings.borrow(), vec![false, true, false]);
    }

    #[test]
    fn deferred_value_lags_until_the_low_priority_pass() {
        let runtime = test_runtime();
        let observed: Rc<RefCell<Vec<(i32, i32)>>> = Rc::new(RefCell::new(Vec::new()));
        let setter: Captured<StateSetter<i32>> = captured();
        {
            let observed = Rc::clone(&observed);
            let captured = Rc::clone(&setter);
            mount(&runtime, "Widget", move |scope| {
                let (input, set_input) = scope.use_state(|| 1);
                *captured.borrow_mut() = Some(set_input);
                let deferred = scope.use_deferred_value(input);
                observed.borrow_mut().push((input, deferred));
            });
        }
        setter.borrow().as_ref().unwrap().set(5);
        runtime.flush_frame();
        // The NORMAL pass still sees the old deferred value; the LOW pass in
        // the same flush cycle catches up.
        assert_eq!(*observed.borrow(), vec![(1, 1), (5, 1), (5, 5)]);
    }

    #[test]
    fn force_update_enqueues_every_mounted_component() {
        let runtime = test_runtime();
        let renders = Rc::new(Cell::new(0));
        for id in ["A", "B", "C"] {
            let renders = Rc::clone(&renders);
            mount(&runtime, id, move |_| renders.set(renders.get() + 1));
        }
        assert_eq!(renders.get(), 3);
        runtime.force_update_all_components();
        runtime.flush_frame();
        assert_eq!(renders.get(), 6);
    }

    #[test]
    fn stats_reflect_slot_counts() {
        let runtime = test_runtime();
        mount(&runtime, "Widget", move |scope| {
            let _ = scope.use_state(|| 0);
            let _ = scope.use_state(|| "two".to_string());
            scope.use_effect(Some(deps![]), || {});
            let _ = scope.use_memo(Some(deps![]), || 1);
            let _ = scope.use_callback(Some(deps![]), Box::new(|| ()) as Box<dyn Fn()>);
            let _ = scope.use_ref(|| 0u8);
            let _ = scope.use_id();
        });
        let stats = runtime.get_component_stats("Widget").unwrap();
        assert_eq!(stats.state_slots, 2);
        assert_eq!(stats.effect_slots, 1);
        assert_eq!(stats.memo_slots, 1);
        assert_eq!(stats.callback_slots, 1);
        assert_eq!(stats.ref_slots, 2);
        assert!(stats.is_mounted);

        let all = runtime.get_all_component_stats();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "Widget");
    }

    #[test]
    fn render_adapter_sees_accepted_writes_only() {
        struct RecordingAdapter {
            changes: RefCell<Vec<(String, usize, i32, i32)>>,
        }
        impl RenderAdapter for RecordingAdapter {
            fn state_changed(&self, change: &StateChange) {
                let old = *change.old_value.downcast_ref::<i32>().unwrap();
                let new = *change.new_value.downcast_ref::<i32>().unwrap();
                self.changes.borrow_mut().push((
                    change.component_id.clone(),
                    change.hook_index,
                    old,
                    new,
                ));
            }
        }

        let runtime = test_runtime();
        let adapter = Rc::new(RecordingAdapter {
            changes: RefCell::new(Vec::new()),
        });
        runtime.set_render_adapter(adapter.clone());

        let setter: Captured<StateSetter<i32>> = captured();
        {
            let captured = Rc::clone(&setter);
            mount(&runtime, "Counter", move |scope| {
                let (_, set) = scope.use_state(|| 0);
                *captured.borrow_mut() = Some(set);
            });
        }
        let set = setter.borrow().as_ref().unwrap().clone();
        set.set(1);
        set.set(1); // identity write, not reported
        set.set(2);
        assert_eq!(
            *adapter.changes.borrow(),
            vec![
                ("Counter".to_string(), 0, 0, 1),
                ("Counter".to_string(), 0, 1, 2)
            ]
        );
    }

    #[test]
    fn render_guard_restores_context_when_the_body_panics() {
        let runtime = test_runtime();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            runtime.render("Boom", None, |_| panic!("boom"));
        }));
        assert!(result.is_err());
        assert!(runtime.scope().is_err());

        // The runtime is still serviceable afterwards.
        let renders = Rc::new(Cell::new(0));
        {
            let renders = Rc::clone(&renders);
            mount(&runtime, "After", move |_| renders.set(renders.get() + 1));
        }
        assert_eq!(renders.get(), 1);
    }

    #[test]
    fn exit_without_active_context_errors() {
        let runtime = test_runtime();
        assert_eq!(runtime.exit_context(), Err(RuntimeError::ContextMissing));
    }

    #[test]
    #[should_panic(expected = "outside of an active component context")]
    fn hook_after_context_exit_panics() {
        let runtime = test_runtime();
        runtime.enter_context("Widget", None);
        let scope = runtime.scope().unwrap();
        runtime.exit_context().unwrap();
        let _ = scope.use_state(|| 0);
    }

    #[test]
    fn setter_for_an_unmounted_component_is_dropped() {
        let runtime = test_runtime();
        let setter: Captured<StateSetter<i32>> = captured();
        {
            let captured = Rc::clone(&setter);
            mount(&runtime, "Gone", move |scope| {
                let (_, set) = scope.use_state(|| 0);
                *captured.borrow_mut() = Some(set);
            });
        }
        runtime.unmount_component("Gone");
        setter.borrow().as_ref().unwrap().set(5);
        assert!(!runtime.has_scheduled_work());
    }

    #[test]
    fn stale_slot_type_is_reinitialized() {
        // Deliberate call-order violation: the slot kind changes between
        // renders. The runtime cannot detect reordering in general; a type
        // mismatch is the one observable symptom and reinitializes the slot.
        let runtime = test_runtime();
        let as_string = Rc::new(Cell::new(false));
        let observed: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        {
            let as_string = Rc::clone(&as_string);
            let observed = Rc::clone(&observed);
            mount(&runtime, "Widget", move |scope| {
                if as_string.get() {
                    let (value, _) = scope.use_state(|| "fresh".to_string());
                    observed.borrow_mut().push(value);
                } else {
                    let (value, _) = scope.use_state(|| 1);
                    observed.borrow_mut().push(value.to_string());
                }
            });
        }
        as_string.set(true);
        runtime.schedule_update("Widget", UpdatePriority::Normal).unwrap();
        runtime.flush_frame();
        assert_eq!(
            *observed.borrow(),
            vec!["1".to_string(), "fresh".to_string()]
        );
    }
}
