//! Caller-owned result slots
//!
//! The caller of a result-bearing command allocates a `ResultSlot` and
//! passes a reference to it. The queued invocation keeps only a weak
//! reference: the slot stays owned by the caller, and if the caller drops it
//! (or withdraws it) before the owner task gets to the invocation, the
//! result is simply discarded. Nothing is written before the invocation is
//! drained.

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use taskmail_core::ExecutionResult;
use tracing::trace;

/// Observable state of a result slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    /// Never used, or emptied by `take`
    Idle,
    /// A call using this slot is queued and not drained yet
    Pending,
    /// The owner produced a value
    Ready,
    /// The owner ran the callable and it failed
    Failed(ExecutionResult),
    /// The caller gave up on the slot
    Withdrawn,
}

enum SlotState<R> {
    Idle,
    Pending,
    Ready(R),
    Failed(ExecutionResult),
    Withdrawn,
}

impl<R> SlotState<R> {
    fn status(&self) -> SlotStatus {
        match self {
            Self::Idle => SlotStatus::Idle,
            Self::Pending => SlotStatus::Pending,
            Self::Ready(_) => SlotStatus::Ready,
            Self::Failed(status) => SlotStatus::Failed(*status),
            Self::Withdrawn => SlotStatus::Withdrawn,
        }
    }
}

/// Slot state saved by `ResultSlot::arm`
pub(crate) struct PreviousState<R> {
    state: SlotState<R>,
    generation: u64,
}

#[cfg(test)]
impl<R> PreviousState<R> {
    pub(crate) fn status(&self) -> SlotStatus {
        self.state.status()
    }
}

struct SlotInner<R> {
    state: SlotState<R>,
    /// Bumped by `withdraw` and `reset`; calls made before carry an older value
    generation: u64,
}

struct SlotCell<R> {
    inner: Mutex<SlotInner<R>>,
}

impl<R> SlotCell<R> {
    fn settle(&self, generation: u64, settled: SlotState<R>) {
        let mut inner = self.inner.lock();
        if inner.generation != generation || matches!(inner.state, SlotState::Withdrawn) {
            trace!("Discarding result for withdrawn or reused slot");
            return;
        }
        inner.state = settled;
    }

    fn abandon(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.generation == generation && matches!(inner.state, SlotState::Pending) {
            inner.state = SlotState::Failed(ExecutionResult::Undefined);
        }
    }
}

/// Claim of one queued call on a result slot
///
/// Holds the slot weakly and remembers the slot generation at call time.
/// A ticket dropped without being settled marks a still pending slot
/// `Failed(Undefined)`, so callers never wait on a call that cannot run.
pub(crate) struct SlotTicket<R> {
    cell: Weak<SlotCell<R>>,
    generation: u64,
    settled: bool,
}

impl<R> SlotTicket<R> {
    /// Store the value produced by the owner thread
    pub(crate) fn fulfil(mut self, value: R) {
        self.settle(SlotState::Ready(value));
    }

    /// Record that the callable failed
    pub(crate) fn fail(mut self, status: ExecutionResult) {
        self.settle(SlotState::Failed(status));
    }

    /// Give the claim up without touching the slot
    pub(crate) fn release(mut self) {
        self.settled = true;
    }

    fn settle(&mut self, settled: SlotState<R>) {
        self.settled = true;
        match self.cell.upgrade() {
            Some(cell) => cell.settle(self.generation, settled),
            None => trace!("Result slot dropped before execution"),
        }
    }
}

impl<R> Drop for SlotTicket<R> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(cell) = self.cell.upgrade() {
            cell.abandon(self.generation);
        }
    }
}

/// Destination for the result of a deferred execution
pub struct ResultSlot<R> {
    cell: Arc<SlotCell<R>>,
}

impl<R> ResultSlot<R> {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(SlotCell {
                inner: Mutex::new(SlotInner {
                    state: SlotState::Idle,
                    generation: 0,
                }),
            }),
        }
    }

    pub fn status(&self) -> SlotStatus {
        self.cell.inner.lock().state.status()
    }

    pub fn is_ready(&self) -> bool {
        self.status() == SlotStatus::Ready
    }

    pub fn is_pending(&self) -> bool {
        self.status() == SlotStatus::Pending
    }

    pub fn is_withdrawn(&self) -> bool {
        self.status() == SlotStatus::Withdrawn
    }

    /// Take the produced value, leaving the slot idle
    pub fn take(&self) -> Option<R> {
        let mut inner = self.cell.inner.lock();
        match std::mem::replace(&mut inner.state, SlotState::Idle) {
            SlotState::Ready(value) => Some(value),
            other => {
                inner.state = other;
                None
            }
        }
    }

    /// Copy of the produced value, if any
    pub fn get(&self) -> Option<R>
    where
        R: Clone,
    {
        match &self.cell.inner.lock().state {
            SlotState::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Give up on the slot. Results of calls already made are discarded,
    /// even after a later `reset`, and new calls using the slot are
    /// rejected as invalid input.
    pub fn withdraw(&self) {
        let mut inner = self.cell.inner.lock();
        inner.state = SlotState::Withdrawn;
        inner.generation += 1;
    }

    /// Make the slot usable again, dropping any stored value. Calls made
    /// before the reset no longer write to the slot.
    pub fn reset(&self) {
        let mut inner = self.cell.inner.lock();
        inner.state = SlotState::Idle;
        inner.generation += 1;
    }

    /// Mark the slot pending ahead of an enqueue. Hands back the previous
    /// state, so a rejected enqueue can restore it, and the ticket for the
    /// queued call. `None` if withdrawn.
    pub(crate) fn arm(&self) -> Option<(PreviousState<R>, SlotTicket<R>)> {
        let mut inner = self.cell.inner.lock();
        if matches!(inner.state, SlotState::Withdrawn) {
            return None;
        }
        let generation = inner.generation;
        let previous = PreviousState {
            state: std::mem::replace(&mut inner.state, SlotState::Pending),
            generation,
        };
        let ticket = SlotTicket {
            cell: Arc::downgrade(&self.cell),
            generation,
            settled: false,
        };
        Some((previous, ticket))
    }

    /// Undo `arm` after a rejected enqueue
    pub(crate) fn disarm(&self, previous: PreviousState<R>) {
        let mut inner = self.cell.inner.lock();
        if inner.generation == previous.generation && matches!(inner.state, SlotState::Pending) {
            inner.state = previous.state;
        }
    }
}

impl<R> Default for ResultSlot<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for ResultSlot<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSlot")
            .field("status", &self.status())
            .finish()
    }
}
