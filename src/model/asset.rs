use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::ViewerError;

/// Where an asynchronously loaded asset currently is.
pub enum LoadState<T> {
    Pending,
    Ready(T),
    /// Moved out by the consumer.
    Taken,
    Failed,
}

/// Readiness slot shared between a loader (which resolves it once) and the
/// frame loop (which polls it). Cloning yields another handle to the same slot.
pub struct AssetSlot<T> {
    label: &'static str,
    state: Rc<RefCell<LoadState<T>>>,
}

impl<T> Clone for AssetSlot<T> {
    fn clone(&self) -> Self {
        Self { label: self.label, state: Rc::clone(&self.state) }
    }
}

impl<T> fmt::Debug for AssetSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.borrow() {
            LoadState::Pending => "pending",
            LoadState::Ready(_) => "ready",
            LoadState::Taken => "taken",
            LoadState::Failed => "failed",
        };
        f.debug_struct("AssetSlot").field("label", &self.label).field("state", &state).finish()
    }
}

impl<T> AssetSlot<T> {
    pub fn new(label: &'static str) -> Self {
        Self { label, state: Rc::new(RefCell::new(LoadState::Pending)) }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Settle the slot. Only the first resolution counts.
    pub fn resolve(&self, result: Result<T, ViewerError>) {
        let mut state = self.state.borrow_mut();
        if !matches!(*state, LoadState::Pending) {
            tracing::warn!(asset = self.label, "asset resolved twice, ignoring");
            return;
        }
        *state = match result {
            Ok(value) => {
                tracing::info!(asset = self.label, "asset loaded");
                LoadState::Ready(value)
            }
            Err(e) => {
                tracing::error!(asset = self.label, error = %e, "asset failed to load");
                LoadState::Failed
            }
        };
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.state.borrow(), LoadState::Pending)
    }

    pub fn has_failed(&self) -> bool {
        matches!(*self.state.borrow(), LoadState::Failed)
    }

    /// Move the loaded value out, if it has arrived and not been taken yet.
    pub fn take_ready(&self) -> Option<T> {
        let mut state = self.state.borrow_mut();
        if !matches!(*state, LoadState::Ready(_)) {
            return None;
        }
        match std::mem::replace(&mut *state, LoadState::Taken) {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }
}
