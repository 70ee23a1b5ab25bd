//! Flat per-component slot storage backing the hook protocol.
//!
//! Slots are append-only: a hook call either lands on the slot its cursor
//! points at or pushes a new one at the end. Nothing is ever deleted
//! mid-list, which is what makes call-order addressing sound.

use std::any::Any;
use std::rc::Rc;

use crate::deps::Deps;

/// No-argument callback a renderer stores per component; invoking it must
/// re-enter that component's render function.
pub type UpdateCallback = Rc<dyn Fn()>;

/// Teardown closure returned by an effect body.
pub type Cleanup = Box<dyn FnOnce()>;

pub(crate) type EffectBody = Box<dyn FnOnce() -> Option<Cleanup>>;

/// Per-kind hook cursors plus a running total, reset on every context entry.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub(crate) struct HookCursor {
    pub state: usize,
    pub effect: usize,
    pub memo: usize,
    pub callback: usize,
    pub reference: usize,
    pub total: usize,
}

impl HookCursor {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub(crate) struct StateSlot {
    pub value: Rc<dyn Any>,
    /// Latest reducer for `use_reducer` slots; `None` for plain state.
    pub reducer: Option<Rc<dyn Any>>,
}

pub(crate) struct EffectSlot {
    pub id: String,
    /// Body staged by the most recent render whose deps changed; consumed
    /// when the scheduler runs the effect.
    pub body: Option<EffectBody>,
    /// Teardown from the last body that ran. Always consumed before the
    /// next body and on unmount, never both.
    pub cleanup: Option<Cleanup>,
    pub deps: Option<Deps>,
    pub pending: bool,
}

pub(crate) struct MemoSlot {
    pub value: Rc<dyn Any>,
    pub deps: Option<Deps>,
}

pub(crate) struct CallbackSlot {
    pub value: Rc<dyn Any>,
    pub deps: Option<Deps>,
}

pub(crate) struct RefSlot {
    pub value: Rc<dyn Any>,
}

pub(crate) struct ComponentRecord {
    pub id: String,
    pub states: Vec<StateSlot>,
    pub effects: Vec<EffectSlot>,
    pub memos: Vec<MemoSlot>,
    pub callbacks: Vec<CallbackSlot>,
    pub refs: Vec<RefSlot>,
    pub cursor: HookCursor,
    pub is_mounted: bool,
    pub needs_update: bool,
    pub update_scheduled: bool,
    pub update_callback: Option<UpdateCallback>,
}

impl ComponentRecord {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            states: Vec::new(),
            effects: Vec::new(),
            memos: Vec::new(),
            callbacks: Vec::new(),
            refs: Vec::new(),
            cursor: HookCursor::default(),
            is_mounted: true,
            needs_update: false,
            update_scheduled: false,
            update_callback: None,
        }
    }

    pub fn stats(&self) -> ComponentStats {
        ComponentStats {
            id: self.id.clone(),
            state_slots: self.states.len(),
            effect_slots: self.effects.len(),
            memo_slots: self.memos.len(),
            callback_slots: self.callbacks.len(),
            ref_slots: self.refs.len(),
            is_mounted: self.is_mounted,
            needs_update: self.needs_update,
            update_scheduled: self.update_scheduled,
        }
    }
}

/// Read-only snapshot of one component's registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentStats {
    pub id: String,
    pub state_slots: usize,
    pub effect_slots: usize,
    pub memo_slots: usize,
    pub callback_slots: usize,
    pub ref_slots: usize,
    pub is_mounted: bool,
    pub needs_update: bool,
    pub update_scheduled: bool,
}
