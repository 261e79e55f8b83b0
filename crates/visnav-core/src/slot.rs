//! Single-slot "most recent value" hand-off between threads.
//!
//! A producer overwrites whatever the consumer has not taken yet; values are
//! never queued. Used for loop → preview and loop → dispatch hand-offs.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

struct SlotState<T> {
    value: Option<T>,
    closed: bool,
    dropped: u64,
}

pub struct LatestSlot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                value: None,
                closed: false,
                dropped: 0,
            }),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value`, replacing an unconsumed one. Returns `true` if a value
    /// was replaced. Values put after [`close`](Self::close) are discarded.
    pub fn put(&self, value: T) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        let replaced = state.value.replace(value).is_some();
        if replaced {
            state.dropped += 1;
        }
        drop(state);
        self.ready.notify_one();
        replaced
    }

    /// Take the current value without blocking.
    pub fn take(&self) -> Option<T> {
        self.lock().value.take()
    }

    /// Block until a value is available. Returns `None` once the slot is
    /// closed and drained.
    pub fn wait_take(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(value) = state.value.take() {
                return Some(value);
            }
            if state.closed {
                return None;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`wait_take`](Self::wait_take) but gives up after `timeout`.
    pub fn wait_take_timeout(&self, timeout: Duration) -> Option<T> {
        let state = self.lock();
        let (mut state, _) = self
            .ready
            .wait_timeout_while(state, timeout, |s| s.value.is_none() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        state.value.take()
    }

    /// Close the slot. A value already stored can still be taken.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of values overwritten before anyone took them.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }
}
