//! Provider/consumer value sharing, orthogonal to the component hierarchy.
//!
//! A context is one shared cell plus an explicit subscriber set. Providers
//! write the cell; on a reference change every subscribed component is
//! enqueued for update. There is no tree scoping: the latest provided value
//! wins for all consumers of that context.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

use crate::collections::map::HashMap;
use crate::scheduler::UpdatePriority;
use crate::Runtime;

/// Typed handle returned by [`Runtime::create_context`].
///
/// The handle is only meaningful on the runtime that created it.
pub struct Context<T> {
    key: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Context<T> {}

impl<T> Context<T> {
    pub(crate) fn new(key: u64) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    pub(crate) fn key(&self) -> u64 {
        self.key
    }
}

struct ContextEntry {
    value: Rc<dyn Any>,
    subscribers: crate::collections::map::HashSet<String>,
}

pub(crate) struct ContextRegistry {
    entries: RefCell<HashMap<u64, ContextEntry>>,
    next_key: Cell<u64>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
            next_key: Cell::new(1),
        }
    }

    pub fn create(&self, default: Rc<dyn Any>) -> u64 {
        let key = self.next_key.get();
        self.next_key.set(key + 1);
        self.entries.borrow_mut().insert(
            key,
            ContextEntry {
                value: default,
                subscribers: crate::collections::map::HashSet::new(),
            },
        );
        key
    }

    /// Stores `value` and returns the subscribers to notify, or `None` when
    /// the write was reference-equal to the current value.
    pub fn set(&self, key: u64, value: Rc<dyn Any>) -> Option<Vec<String>> {
        let mut entries = self.entries.borrow_mut();
        let entry = entries
            .get_mut(&key)
            .unwrap_or_else(|| panic!("context {key} was not created by this runtime"));
        if Rc::ptr_eq(&entry.value, &value) {
            return None;
        }
        entry.value = value;
        Some(entry.subscribers.iter().cloned().collect())
    }

    pub fn subscribe(&self, key: u64, component: &str) {
        let mut entries = self.entries.borrow_mut();
        let entry = entries
            .get_mut(&key)
            .unwrap_or_else(|| panic!("context {key} was not created by this runtime"));
        entry.subscribers.insert(component.to_string());
    }

    pub fn value(&self, key: u64) -> Rc<dyn Any> {
        let entries = self.entries.borrow();
        let entry = entries
            .get(&key)
            .unwrap_or_else(|| panic!("context {key} was not created by this runtime"));
        Rc::clone(&entry.value)
    }

    pub fn subscribers(&self, key: u64) -> Vec<String> {
        let entries = self.entries.borrow();
        entries
            .get(&key)
            .map(|entry| {
                let mut ids: Vec<String> = entry.subscribers.iter().cloned().collect();
                ids.sort();
                ids
            })
            .unwrap_or_default()
    }
}

impl Runtime {
    /// Registers a new context with `default` as its initial value.
    pub fn create_context<T: 'static>(&self, default: T) -> Context<T> {
        let key = self.inner().contexts.create(Rc::new(default));
        Context::new(key)
    }

    /// Provider write. On reference inequality with the stored value, every
    /// component that consumed the context is enqueued at NORMAL priority.
    pub fn set_context_value<T: 'static>(&self, context: &Context<T>, value: Rc<T>) {
        let value: Rc<dyn Any> = value;
        let subscribers = self.inner().contexts.set(context.key(), value);
        if let Some(subscribers) = subscribers {
            for id in subscribers {
                self.inner().schedule_update_at(&id, UpdatePriority::Normal);
            }
        }
    }

    /// Convenience provider write wrapping the value in a fresh `Rc` (which
    /// always differs by reference and therefore always notifies).
    pub fn provide_context<T: 'static>(&self, context: &Context<T>, value: T) {
        self.set_context_value(context, Rc::new(value));
    }

    /// Current value without subscribing; for adapters and tests.
    pub fn context_value<T: 'static>(&self, context: &Context<T>) -> Rc<T> {
        self.inner()
            .contexts
            .value(context.key())
            .downcast::<T>()
            .unwrap_or_else(|_| panic!("context value type mismatch"))
    }

    /// Sorted subscriber ids of a context; for introspection and tests.
    pub fn context_subscribers<T>(&self, context: &Context<T>) -> Vec<String> {
        self.inner().contexts.subscribers(context.key())
    }
}
