//! Keyed publish/subscribe store for cross-component state.
//!
//! Entries are created lazily on first set or subscribe and never deleted.
//! Subscriptions are additive: unmounting a component does not remove it
//! from any listener set unless it unsubscribed explicitly, so long-lived
//! keys accumulate dead ids. The scheduler tolerates this by skipping
//! components that no longer have a registry record.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::collections::map::{HashMap, HashSet};

struct GlobalStateEntry {
    value: Rc<dyn Any>,
    listeners: HashSet<String>,
    type_name: &'static str,
}

pub(crate) struct GlobalStore {
    entries: RefCell<HashMap<String, GlobalStateEntry>>,
}

impl GlobalStore {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Stores `value` under `key` and returns the listener snapshot to
    /// enqueue. Creates the entry when absent.
    pub fn set(&self, key: &str, value: Rc<dyn Any>, type_name: &'static str) -> Vec<String> {
        let mut entries = self.entries.borrow_mut();
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| GlobalStateEntry {
                value: Rc::clone(&value),
                listeners: HashSet::new(),
                type_name,
            });
        if entry.type_name != type_name {
            log::error!(
                "global state key {key:?} changed type from {} to {type_name}",
                entry.type_name
            );
            entry.type_name = type_name;
        }
        entry.value = value;
        entry.listeners.iter().cloned().collect()
    }

    /// Adds `component` to the key's listener set (idempotent) and returns
    /// the current value, initializing the entry from `init` when absent.
    pub fn subscribe<T: Clone + 'static>(
        &self,
        key: &str,
        component: &str,
        init: impl FnOnce() -> T,
    ) -> T {
        let mut entries = self.entries.borrow_mut();
        if let Some(entry) = entries.get_mut(key) {
            entry.listeners.insert(component.to_string());
            match entry.value.downcast_ref::<T>() {
                Some(value) => value.clone(),
                None => {
                    // Type drift across subscribers; reinitialize rather
                    // than hand back a value of the wrong type.
                    log::error!(
                        "global state key {key:?} holds {} but was read as {}",
                        entry.type_name,
                        std::any::type_name::<T>()
                    );
                    let value = init();
                    entry.value = Rc::new(value.clone());
                    entry.type_name = std::any::type_name::<T>();
                    value
                }
            }
        } else {
            let value = init();
            let mut listeners = HashSet::new();
            listeners.insert(component.to_string());
            entries.insert(
                key.to_string(),
                GlobalStateEntry {
                    value: Rc::new(value.clone()),
                    listeners,
                    type_name: std::any::type_name::<T>(),
                },
            );
            value
        }
    }

    pub fn unsubscribe(&self, key: &str, component: &str) -> bool {
        let mut entries = self.entries.borrow_mut();
        match entries.get_mut(key) {
            Some(entry) => entry.listeners.remove(component),
            None => false,
        }
    }

    pub fn get<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        let entries = self.entries.borrow();
        entries
            .get(key)
            .and_then(|entry| entry.value.downcast_ref::<T>().cloned())
    }

    pub fn listeners(&self, key: &str) -> Vec<String> {
        let entries = self.entries.borrow();
        entries
            .get(key)
            .map(|entry| {
                let mut ids: Vec<String> = entry.listeners.iter().cloned().collect();
                ids.sort();
                ids
            })
            .unwrap_or_default()
    }
}
