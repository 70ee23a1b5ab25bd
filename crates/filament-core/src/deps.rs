//! Shallow dependency comparison for effect, memo, and callback hooks.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::collections::map::HashMap;

static NEXT_DEPS_ID: AtomicU64 = AtomicU64::new(1);

fn next_deps_id() -> u64 {
    NEXT_DEPS_ID.fetch_add(1, Ordering::Relaxed)
}

fn eq_entry<T: PartialEq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

struct DepEntry {
    value: Box<dyn Any>,
    eq: fn(&dyn Any, &dyn Any) -> bool,
}

/// An ordered list of dependency values captured at one hook call.
///
/// Each instance carries a unique id so the comparator can recognize the
/// same list being checked twice before it is replaced. Build one with the
/// [`deps!`](crate::deps!) macro; `deps![]` means "run on mount only",
/// passing `None` to the hook means "no dependency list, run every cycle".
pub struct Deps {
    id: u64,
    entries: Vec<DepEntry>,
}

impl Deps {
    pub fn empty() -> Self {
        Self {
            id: next_deps_id(),
            entries: Vec::new(),
        }
    }

    /// Appends one dependency value. Values are compared against the slot's
    /// previous list with `PartialEq`, position by position.
    pub fn track<T: PartialEq + 'static>(&mut self, value: T) {
        self.entries.push(DepEntry {
            value: Box::new(value),
            eq: eq_entry::<T>,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    fn differs_from(&self, other: &Deps) -> bool {
        if self.entries.len() != other.entries.len() {
            return true;
        }
        self.entries
            .iter()
            .zip(other.entries.iter())
            .any(|(old, new)| !(new.eq)(old.value.as_ref(), new.value.as_ref()))
    }
}

#[macro_export]
macro_rules! deps {
    () => { $crate::Deps::empty() };
    ($($value:expr),+ $(,)?) => {{
        let mut deps = $crate::Deps::empty();
        $(deps.track($value);)+
        deps
    }};
}

struct CacheEntry {
    old_id: u64,
    changed: bool,
}

/// Comparator with a small identity-keyed memo cache.
///
/// The cache is keyed by the new list's id and only hits when the exact
/// same `Deps` instance is compared against the same predecessor twice
/// before the slot replaces it. Hooks build a fresh list every render, so
/// this is a weak optimization, not a correctness mechanism; the element
/// walk below is the source of truth.
pub(crate) struct DepsComparator {
    cache: HashMap<u64, CacheEntry>,
}

const CACHE_LIMIT: usize = 64;

impl DepsComparator {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Returns true when the dependencies changed and the hook must re-run.
    /// A missing list on either side always counts as changed.
    pub fn changed(&mut self, old: Option<&Deps>, new: Option<&Deps>) -> bool {
        let (old, new) = match (old, new) {
            (Some(old), Some(new)) => (old, new),
            _ => return true,
        };
        if let Some(entry) = self.cache.get(&new.id()) {
            if entry.old_id == old.id() {
                return entry.changed;
            }
        }
        let changed = old.differs_from(new);
        if self.cache.len() >= CACHE_LIMIT {
            self.cache.clear();
        }
        self.cache.insert(
            new.id(),
            CacheEntry {
                old_id: old.id(),
                changed,
            },
        );
        changed
    }

    #[cfg(test)]
    pub(crate) fn cache_len(&self) -> usize {
        self.cache.len()
    }
}
