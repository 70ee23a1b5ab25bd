//! Hook primitives, addressed through the active component context.
//!
//! A [`Scope`] witnesses an active context entry and is handed to the render
//! closure by [`Runtime::render`]. Every hook resolves its storage cell from
//! the active component's cursor; render functions must therefore call hooks
//! in the same relative order on every invocation. The runtime cannot detect
//! reordering: a reorder between calls of compatible types silently reads
//! the wrong cell, one of incompatible types reinitializes it.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::context::Context;
use crate::deps::Deps;
use crate::scheduler::UpdatePriority;
use crate::slots::{CallbackSlot, Cleanup, ComponentRecord, EffectSlot, MemoSlot, RefSlot, StateSlot};
use crate::{Runtime, RuntimeError, RuntimeHandle, RuntimeInner};

/// Converts an effect body's return value into an optional teardown.
pub trait IntoCleanup {
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl IntoCleanup for Option<Cleanup> {
    fn into_cleanup(self) -> Option<Cleanup> {
        self
    }
}

impl IntoCleanup for Cleanup {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(self)
    }
}

/// Wraps a teardown closure for returning from an effect body.
pub fn cleanup(f: impl FnOnce() + 'static) -> Option<Cleanup> {
    Some(Box::new(f))
}

/// A mutable cell that survives re-renders; handed out by [`Scope::use_ref`].
/// The same cell is returned on every call at the same hook position.
#[derive(Debug)]
pub struct MutableRef<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> Clone for MutableRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for MutableRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for MutableRef<T> {}

impl<T> MutableRef<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    pub fn replace(&self, value: T) -> T {
        self.inner.replace(value)
    }
}

impl<T: Clone> MutableRef<T> {
    pub fn get(&self) -> T {
        self.inner.borrow().clone()
    }
}

/// Writes a state slot from outside the render path (event handlers,
/// adapters, effects). Cloneable and usable after the owning render exits;
/// writes to unmounted components are dropped.
pub struct StateSetter<T> {
    runtime: RuntimeHandle,
    component: String,
    index: usize,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            component: self.component.clone(),
            index: self.index,
            _marker: PhantomData,
        }
    }
}

impl<T: Clone + PartialEq + 'static> StateSetter<T> {
    /// Replaces the stored value. A write equal to the live value is a no-op
    /// and does not enqueue an update.
    pub fn set(&self, next: T) {
        self.apply(move |_| next);
    }

    /// Functional update, resolved against the live slot value at call time
    /// rather than a snapshot captured by the closure.
    pub fn set_with(&self, resolve: impl FnOnce(&T) -> T) {
        self.apply(resolve);
    }

    fn apply(&self, resolve: impl FnOnce(&T) -> T) {
        let Some(inner) = self.runtime.upgrade() else {
            return;
        };
        inner.update_state_slot(&self.component, self.index, resolve);
    }
}

/// Dispatches actions through the reducer stored at the owning slot.
pub struct Dispatch<S, A> {
    runtime: RuntimeHandle,
    component: String,
    index: usize,
    _marker: PhantomData<fn(S, A)>,
}

impl<S, A> Clone for Dispatch<S, A> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            component: self.component.clone(),
            index: self.index,
            _marker: PhantomData,
        }
    }
}

impl<S: Clone + PartialEq + 'static, A: 'static> Dispatch<S, A> {
    /// Runs the latest reducer against the live state. Enqueues an update
    /// only when the result differs from the stored value.
    pub fn dispatch(&self, action: A) {
        let Some(inner) = self.runtime.upgrade() else {
            return;
        };
        inner.dispatch_action::<S, A>(&self.component, self.index, action);
    }
}

/// Writes a global-state key, resolving functional updates against the
/// store's current value.
pub struct GlobalSetter<T> {
    runtime: RuntimeHandle,
    key: String,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T> Clone for GlobalSetter<T> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            key: self.key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Clone + 'static> GlobalSetter<T> {
    pub fn set(&self, value: T) {
        let Some(inner) = self.runtime.upgrade() else {
            return;
        };
        inner.set_global_entry(&self.key, Rc::new(value), std::any::type_name::<T>());
    }

    pub fn set_with(&self, resolve: impl FnOnce(&T) -> T) {
        let Some(inner) = self.runtime.upgrade() else {
            return;
        };
        let Some(current) = inner.store.get::<T>(&self.key) else {
            return;
        };
        let next = resolve(&current);
        inner.set_global_entry(&self.key, Rc::new(next), std::any::type_name::<T>());
    }
}

/// Starts low-urgency work from [`Scope::use_transition`].
pub struct TransitionStarter {
    runtime: RuntimeHandle,
    pending: StateSetter<bool>,
}

impl Clone for TransitionStarter {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            pending: self.pending.clone(),
        }
    }
}

impl TransitionStarter {
    /// Flips the pending flag, defers `action` to the next frame flush, and
    /// flips the flag back once the action has run.
    pub fn start(&self, action: impl FnOnce() + 'static) {
        self.pending.set(true);
        let done = self.pending.clone();
        let Some(inner) = self.runtime.upgrade() else {
            return;
        };
        inner.push_deferred_task(Box::new(move || {
            action();
            done.set(false);
        }));
    }
}

struct DeferredValue<T> {
    current: T,
    pending: Option<T>,
}

/// Witness of an active component context; the only entry point for hooks.
pub struct Scope<'a> {
    runtime: &'a Runtime,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(runtime: &'a Runtime) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Runtime {
        self.runtime
    }

    /// Id of the component currently owning the hook cursor.
    pub fn component_id(&self) -> String {
        self.runtime
            .inner()
            .active
            .borrow()
            .clone()
            .unwrap_or_else(|| panic!("{}", RuntimeError::ContextMissing))
    }

    fn with_record<R>(&self, f: impl FnOnce(&mut ComponentRecord, &RuntimeInner) -> R) -> R {
        let inner = self.runtime.inner();
        let active = inner
            .active
            .borrow()
            .clone()
            .unwrap_or_else(|| panic!("{}", RuntimeError::ContextMissing));
        let mut components = inner.components.borrow_mut();
        let record = components
            .get_mut(&active)
            .unwrap_or_else(|| panic!("{}", RuntimeError::ContextMissing));
        f(record, inner)
    }

    /// State cell. First call at a cursor position stores `init()`; later
    /// calls return the stored value and a setter addressing this slot.
    pub fn use_state<T: Clone + PartialEq + 'static>(
        &self,
        init: impl FnOnce() -> T,
    ) -> (T, StateSetter<T>) {
        let (component, index, value) = self.with_record(|record, _| {
            let index = record.cursor.state;
            record.cursor.state += 1;
            record.cursor.total += 1;
            if index == record.states.len() {
                record.states.push(StateSlot {
                    value: Rc::new(init()),
                    reducer: None,
                });
            } else if record.states[index].value.downcast_ref::<T>().is_none() {
                record.states[index] = StateSlot {
                    value: Rc::new(init()),
                    reducer: None,
                };
            }
            let value = record.states[index]
                .value
                .downcast_ref::<T>()
                .expect("state slot was just initialized")
                .clone();
            (record.id.clone(), index, value)
        });
        let setter = StateSetter {
            runtime: self.runtime.handle(),
            component,
            index,
            _marker: PhantomData,
        };
        (value, setter)
    }

    /// Reducer-driven state. The reducer stored at the slot is refreshed on
    /// every render so dispatches always see the latest one.
    pub fn use_reducer<S, A>(
        &self,
        reducer: impl Fn(&S, A) -> S + 'static,
        init: impl FnOnce() -> S,
    ) -> (S, Dispatch<S, A>)
    where
        S: Clone + PartialEq + 'static,
        A: 'static,
    {
        let reducer: Rc<dyn Fn(&S, A) -> S> = Rc::new(reducer);
        let (component, index, value) = self.with_record(|record, _| {
            let index = record.cursor.state;
            record.cursor.state += 1;
            record.cursor.total += 1;
            if index == record.states.len() {
                record.states.push(StateSlot {
                    value: Rc::new(init()),
                    reducer: None,
                });
            } else if record.states[index].value.downcast_ref::<S>().is_none() {
                record.states[index] = StateSlot {
                    value: Rc::new(init()),
                    reducer: None,
                };
            }
            record.states[index].reducer = Some(Rc::new(reducer.clone()));
            let value = record.states[index]
                .value
                .downcast_ref::<S>()
                .expect("reducer slot was just initialized")
                .clone();
            (record.id.clone(), index, value)
        });
        let dispatch = Dispatch {
            runtime: self.runtime.handle(),
            component,
            index,
            _marker: PhantomData,
        };
        (value, dispatch)
    }

    /// Deferred effect. Runs after update callbacks in the flush pass that
    /// follows a render whose deps changed; the previous teardown always
    /// runs first. `None` deps re-run every cycle, `deps![]` runs on mount
    /// only.
    pub fn use_effect<C, F>(&self, deps: Option<Deps>, effect: F)
    where
        C: IntoCleanup + 'static,
        F: FnOnce() -> C + 'static,
    {
        let staged = self.with_record(|record, inner| {
            let index = record.cursor.effect;
            record.cursor.effect += 1;
            record.cursor.total += 1;
            if index == record.effects.len() {
                record.effects.push(EffectSlot {
                    id: format!("{}:effect{}", record.id, index),
                    body: None,
                    cleanup: None,
                    deps: None,
                    pending: false,
                });
            }
            let changed = inner
                .comparator
                .borrow_mut()
                .changed(record.effects[index].deps.as_ref(), deps.as_ref());
            let component = record.id.clone();
            let slot = &mut record.effects[index];
            slot.deps = deps;
            if changed {
                slot.body = Some(Box::new(move || effect().into_cleanup()));
                slot.pending = true;
                Some((component, index))
            } else {
                None
            }
        });
        if let Some((component, index)) = staged {
            self.runtime.inner().queue_effect(&component, index);
        }
    }

    /// Like [`use_effect`](Self::use_effect) but runs synchronously inside
    /// the hook call instead of being deferred to the flush.
    pub fn use_layout_effect<C, F>(&self, deps: Option<Deps>, effect: F)
    where
        C: IntoCleanup + 'static,
        F: FnOnce() -> C + 'static,
    {
        let staged = self.with_record(|record, inner| {
            let index = record.cursor.effect;
            record.cursor.effect += 1;
            record.cursor.total += 1;
            if index == record.effects.len() {
                record.effects.push(EffectSlot {
                    id: format!("{}:effect{}", record.id, index),
                    body: None,
                    cleanup: None,
                    deps: None,
                    pending: false,
                });
            }
            let changed = inner
                .comparator
                .borrow_mut()
                .changed(record.effects[index].deps.as_ref(), deps.as_ref());
            let component = record.id.clone();
            let slot = &mut record.effects[index];
            slot.deps = deps;
            if changed {
                Some((component, index, slot.id.clone(), slot.cleanup.take()))
            } else {
                None
            }
        });
        let Some((component, index, effect_id, previous)) = staged else {
            return;
        };
        if let Some(previous) = previous {
            if let Err(message) = crate::catch_isolated(previous) {
                log::error!(
                    "{} (cleanup): {message}",
                    RuntimeError::EffectExecution {
                        effect: effect_id.clone()
                    }
                );
            }
        }
        match crate::catch_isolated(move || effect().into_cleanup()) {
            Ok(Some(next)) => {
                let inner = self.runtime.inner();
                let mut components = inner.components.borrow_mut();
                if let Some(slot) = components
                    .get_mut(&component)
                    .and_then(|record| record.effects.get_mut(index))
                {
                    slot.cleanup = Some(next);
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

    /// Memoized value; `factory` re-runs only when `deps` changed.
    pub fn use_memo<T: 'static>(&self, deps: Option<Deps>, factory: impl FnOnce() -> T) -> Rc<T> {
        self.with_record(|record, inner| {
            let index = record.cursor.memo;
            record.cursor.memo += 1;
            record.cursor.total += 1;
            if index == record.memos.len() {
                let value = Rc::new(factory());
                record.memos.push(MemoSlot {
                    value: value.clone(),
                    deps,
                });
                return value;
            }
            let changed = inner
                .comparator
                .borrow_mut()
                .changed(record.memos[index].deps.as_ref(), deps.as_ref());
            let stale = changed || record.memos[index].value.downcast_ref::<T>().is_none();
            if stale {
                record.memos[index].value = Rc::new(factory());
            }
            record.memos[index].deps = deps;
            record.memos[index]
                .value
                .clone()
                .downcast::<T>()
                .unwrap_or_else(|_| panic!("memo slot type mismatch"))
        })
    }

    /// Memoized function handle: `use_memo` returning the function itself.
    /// The returned `Rc` is identity-stable while `deps` are unchanged.
    pub fn use_callback<F: 'static>(&self, deps: Option<Deps>, callback: F) -> Rc<F> {
        self.with_record(|record, inner| {
            let index = record.cursor.callback;
            record.cursor.callback += 1;
            record.cursor.total += 1;
            if index == record.callbacks.len() {
                let value = Rc::new(callback);
                record.callbacks.push(CallbackSlot {
                    value: value.clone(),
                    deps,
                });
                return value;
            }
            let changed = inner
                .comparator
                .borrow_mut()
                .changed(record.callbacks[index].deps.as_ref(), deps.as_ref());
            let stale = changed || record.callbacks[index].value.downcast_ref::<F>().is_none();
            if stale {
                record.callbacks[index].value = Rc::new(callback);
            }
            record.callbacks[index].deps = deps;
            record.callbacks[index]
                .value
                .clone()
                .downcast::<F>()
                .unwrap_or_else(|_| panic!("callback slot type mismatch"))
        })
    }

    /// Allocates one mutable cell on first call and returns the same cell on
    /// every call after that.
    pub fn use_ref<T: 'static>(&self, init: impl FnOnce() -> T) -> MutableRef<T> {
        self.with_record(|record, _| {
            let index = record.cursor.reference;
            record.cursor.reference += 1;
            record.cursor.total += 1;
            if index == record.refs.len() {
                record.refs.push(RefSlot {
                    value: Rc::new(MutableRef::new(init())),
                });
            } else if record.refs[index]
                .value
                .downcast_ref::<MutableRef<T>>()
                .is_none()
            {
                record.refs[index] = RefSlot {
                    value: Rc::new(MutableRef::new(init())),
                };
            }
            record.refs[index]
                .value
                .downcast_ref::<MutableRef<T>>()
                .expect("ref slot was just initialized")
                .clone()
        })
    }

    /// Stable identifier derived from the component id and slot position.
    pub fn use_id(&self) -> String {
        self.with_record(|record, _| {
            let index = record.cursor.reference;
            record.cursor.reference += 1;
            record.cursor.total += 1;
            if index == record.refs.len() || record.refs[index].value.downcast_ref::<String>().is_none()
            {
                let id = format!(
                    "fl-{:016x}",
                    crate::collections::stable_hash(&(record.id.as_str(), index))
                );
                let slot = RefSlot { value: Rc::new(id) };
                if index == record.refs.len() {
                    record.refs.push(slot);
                } else {
                    record.refs[index] = slot;
                }
            }
            record.refs[index]
                .value
                .downcast_ref::<String>()
                .expect("id slot was just initialized")
                .clone()
        })
    }

    /// Subscribes the component to `context` and returns its current value.
    pub fn use_context<T: 'static>(&self, context: &Context<T>) -> Rc<T> {
        let component = self.component_id();
        let inner = self.runtime.inner();
        inner.contexts.subscribe(context.key(), &component);
        inner
            .contexts
            .value(context.key())
            .downcast::<T>()
            .unwrap_or_else(|_| panic!("context value type mismatch"))
    }

    /// Pending flag plus a starter that defers work past the urgent pass.
    pub fn use_transition(&self) -> (bool, TransitionStarter) {
        let (pending, setter) = self.use_state(|| false);
        let starter = TransitionStarter {
            runtime: self.runtime.handle(),
            pending: setter,
        };
        (pending, starter)
    }

    /// Returns the previously rendered value while a LOW-priority re-render
    /// with the new value is in flight; after that pass it tracks the input.
    pub fn use_deferred_value<T: Clone + PartialEq + 'static>(&self, value: T) -> T {
        let (result, schedule_low, component) = self.with_record(|record, _| {
            let index = record.cursor.state;
            record.cursor.state += 1;
            record.cursor.total += 1;
            let component = record.id.clone();
            if index == record.states.len()
                || record.states[index]
                    .value
                    .downcast_ref::<DeferredValue<T>>()
                    .is_none()
            {
                let slot = StateSlot {
                    value: Rc::new(DeferredValue {
                        current: value.clone(),
                        pending: None,
                    }),
                    reducer: None,
                };
                if index == record.states.len() {
                    record.states.push(slot);
                } else {
                    record.states[index] = slot;
                }
                return (value.clone(), false, component);
            }
            let (current, pending) = {
                let deferred = record.states[index]
                    .value
                    .downcast_ref::<DeferredValue<T>>()
                    .expect("deferred slot was just checked");
                (deferred.current.clone(), deferred.pending.clone())
            };
            if current == value {
                if pending.is_some() {
                    // Input reverted before the deferred pass caught up.
                    record.states[index].value = Rc::new(DeferredValue {
                        current: current.clone(),
                        pending: None,
                    });
                }
                (current, false, component)
            } else if pending.as_ref() == Some(&value) {
                // The catch-up pass: adopt the deferred value.
                record.states[index].value = Rc::new(DeferredValue {
                    current: value.clone(),
                    pending: None,
                });
                (value.clone(), false, component)
            } else {
                record.states[index].value = Rc::new(DeferredValue {
                    current: current.clone(),
                    pending: Some(value.clone()),
                });
                (current, true, component)
            }
        });
        if schedule_low {
            self.runtime
                .inner()
                .schedule_update_at(&component, UpdatePriority::Low);
        }
        result
    }

    /// Subscribes to a global-state key (idempotent) and returns the current
    /// value, initializing the entry when it does not exist yet.
    pub fn use_global_state<T: Clone + 'static>(
        &self,
        key: &str,
        init: impl FnOnce() -> T,
    ) -> (T, GlobalSetter<T>) {
        let component = self.component_id();
        let current = self.runtime.inner().store.subscribe(key, &component, init);
        let setter = GlobalSetter {
            runtime: self.runtime.handle(),
            key: key.to_string(),
            _marker: PhantomData,
        };
        (current, setter)
    }

    /// Drops this component's subscription to a global-state key. The store
    /// never does this on its own, not even at unmount.
    pub fn unsubscribe_from_global_state(&self, key: &str) -> bool {
        let component = self.component_id();
        self.runtime.inner().store.unsubscribe(key, &component)
    }
}

#[allow(non_snake_case)]
impl<'a> Scope<'a> {
    pub fn useState<T: Clone + PartialEq + 'static>(
        &self,
        init: impl FnOnce() -> T,
    ) -> (T, StateSetter<T>) {
        self.use_state(init)
    }

    pub fn useReducer<S, A>(
        &self,
        reducer: impl Fn(&S, A) -> S + 'static,
        init: impl FnOnce() -> S,
    ) -> (S, Dispatch<S, A>)
    where
        S: Clone + PartialEq + 'static,
        A: 'static,
    {
        self.use_reducer(reducer, init)
    }

    pub fn useEffect<C, F>(&self, deps: Option<Deps>, effect: F)
    where
        C: IntoCleanup + 'static,
        F: FnOnce() -> C + 'static,
    {
        self.use_effect(deps, effect)
    }

    pub fn useLayoutEffect<C, F>(&self, deps: Option<Deps>, effect: F)
    where
        C: IntoCleanup + 'static,
        F: FnOnce() -> C + 'static,
    {
        self.use_layout_effect(deps, effect)
    }

    pub fn useMemo<T: 'static>(&self, deps: Option<Deps>, factory: impl FnOnce() -> T) -> Rc<T> {
        self.use_memo(deps, factory)
    }

    pub fn useCallback<F: 'static>(&self, deps: Option<Deps>, callback: F) -> Rc<F> {
        self.use_callback(deps, callback)
    }

    pub fn useRef<T: 'static>(&self, init: impl FnOnce() -> T) -> MutableRef<T> {
        self.use_ref(init)
    }

    pub fn useContext<T: 'static>(&self, context: &Context<T>) -> Rc<T> {
        self.use_context(context)
    }

    pub fn useTransition(&self) -> (bool, TransitionStarter) {
        self.use_transition()
    }

    pub fn useDeferredValue<T: Clone + PartialEq + 'static>(&self, value: T) -> T {
        self.use_deferred_value(value)
    }

    pub fn useId(&self) -> String {
        self.use_id()
    }

    pub fn useGlobalState<T: Clone + 'static>(
        &self,
        key: &str,
        init: impl FnOnce() -> T,
    ) -> (T, GlobalSetter<T>) {
        self.use_global_state(key, init)
    }
}
