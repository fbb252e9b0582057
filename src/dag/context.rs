// src/dag/context.rs

//! Shared, run-scoped context threaded through every node.
//!
//! Each workflow declares its own context struct with every field up front.
//! Fields that only some nodes produce are wrapped in [`Slot`], which makes
//! "not produced yet" an explicit state instead of a missing map key.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// A context field that some node will eventually produce.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    Pending,
    Ready(T),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Pending
    }
}

impl<T> Slot<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Slot::Ready(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Slot::Ready(v) => Some(v),
            Slot::Pending => None,
        }
    }

    pub fn set(&mut self, value: T) {
        *self = Slot::Ready(value);
    }

    pub fn take(&mut self) -> Option<T> {
        match std::mem::take(self) {
            Slot::Ready(v) => Some(v),
            Slot::Pending => None,
        }
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Slot::Ready(v),
            None => Slot::Pending,
        }
    }
}

/// The single context instance of one pipeline run.
///
/// Access goes through short closures ([`read`](Self::read) /
/// [`write`](Self::write)) so a node never holds the lock across an `.await`.
/// Nodes in the same frontier interleave at their suspension points; they
/// must not write the same fields (see [`Node::writes`](crate::dag::Node::writes)).
#[derive(Debug, Default)]
pub struct SharedContext<C> {
    state: Mutex<C>,
    error: Mutex<Option<String>>,
}

impl<C> SharedContext<C> {
    pub fn new(state: C) -> Self {
        Self {
            state: Mutex::new(state),
            error: Mutex::new(None),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.lock_state())
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.lock_state())
    }

    /// Record a recoverable failure. The first recorded reason wins.
    pub fn fail(&self, reason: impl Into<String>) {
        let mut error = self.error.lock().unwrap_or_else(PoisonError::into_inner);
        if error.is_none() {
            *error = Some(reason.into());
        }
    }

    pub fn error(&self) -> Option<String> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_failed(&self) -> bool {
        self.error().is_some()
    }

    /// Consume the context, returning the final state and the recorded error.
    pub fn into_parts(self) -> (C, Option<String>) {
        let state = self
            .state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let error = self
            .error
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        (state, error)
    }

    fn lock_state(&self) -> MutexGuard<'_, C> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Ctx {
        desc: Slot<String>,
        count: u32,
    }

    #[test]
    fn slot_transitions_from_pending_to_ready() {
        let mut slot: Slot<u8> = Slot::default();
        assert!(!slot.is_ready());
        slot.set(3);
        assert_eq!(slot.get(), Some(&3));
        assert_eq!(slot.take(), Some(3));
        assert_eq!(slot, Slot::Pending);
    }

    #[test]
    fn first_failure_reason_is_kept() {
        let ctx = SharedContext::new(Ctx::default());
        ctx.write(|c| {
            c.count += 1;
            c.desc.set("x".into());
        });
        ctx.fail("first");
        ctx.fail("second");

        let (state, error) = ctx.into_parts();
        assert_eq!(state.count, 1);
        assert_eq!(state.desc.get().map(String::as_str), Some("x"));
        assert_eq!(error.as_deref(), Some("first"));
    }
}
