//! Pending invocations
//!
//! A `PendingInvocation` is one unit of queued work: the callable to run,
//! its materialised argument, and the weak references to the caller's
//! result slot and notifier. It is created on the producer thread, moved
//! through the mailbox queue, and consumed exactly once by `run` on the
//! owner thread. An invocation dropped while queued (its mailbox went away)
//! marks its result slot `Failed(Undefined)`.

use crate::callable::Invoke;
use crate::notifier::{Completion, NotifyFn};
use crate::slot::SlotTicket;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use taskmail_core::ExecutionResult;
use tracing::{debug, warn};

/// Work that can be run once on the owner thread
pub(crate) trait Run: Send {
    fn run(self: Box<Self>) -> ExecutionResult;

    /// Drop work that was never accepted by a mailbox
    fn discard(self: Box<Self>) {}
}

struct FnRun<F>(F);

impl<F> Run for FnRun<F>
where
    F: FnOnce() -> ExecutionResult + Send,
{
    fn run(self: Box<Self>) -> ExecutionResult {
        (self.0)()
    }
}

/// Type-erased queued unit of work
pub struct PendingInvocation {
    command: Arc<str>,
    body: Box<dyn Run>,
}

impl PendingInvocation {
    /// Ad-hoc invocation running `f` on the owner thread
    pub fn from_fn<F>(command: impl Into<Arc<str>>, f: F) -> Self
    where
        F: FnOnce() -> ExecutionResult + Send + 'static,
    {
        Self::new(command.into(), Box::new(FnRun(f)))
    }

    pub(crate) fn new(command: Arc<str>, body: Box<dyn Run>) -> Self {
        Self { command, body }
    }

    /// Name of the command this invocation came from
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Run the invocation, consuming it
    pub fn run(self) -> ExecutionResult {
        self.body.run()
    }

    /// Drop an invocation the mailbox refused, leaving its result slot to
    /// the caller's rollback
    pub(crate) fn discard(self) {
        self.body.discard()
    }
}

impl fmt::Debug for PendingInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingInvocation")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

/// One place in a command's argument queue, released when dropped
pub(crate) struct Reservation {
    in_flight: Arc<AtomicUsize>,
}

impl Reservation {
    /// Claim a place if fewer than `limit` are taken
    pub(crate) fn acquire(in_flight: &Arc<AtomicUsize>, limit: usize) -> Option<Self> {
        in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < limit).then_some(n + 1)
            })
            .ok()
            .map(|_| Self {
                in_flight: Arc::clone(in_flight),
            })
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Queued call of a shaped callable. `()` stands in for a missing argument
/// or result.
pub(crate) struct Pending<A, R> {
    pub(crate) command: Arc<str>,
    pub(crate) callable: Arc<dyn Invoke<A, R>>,
    pub(crate) argument: A,
    pub(crate) prototype: Arc<R>,
    pub(crate) slot: Option<SlotTicket<R>>,
    pub(crate) notifier: Option<Weak<NotifyFn<R>>>,
    pub(crate) reservation: Reservation,
}

impl<A, R> Pending<A, R> {
    fn deliver(command: &Arc<str>, notifier: &NotifyFn<R>, outcome: ExecutionResult, value: Option<R>) {
        let status = notifier(Completion {
            command: Arc::clone(command),
            outcome,
            value,
        });
        if !status.is_ok() {
            warn!("Completion notifier for {} failed: {}", command, status);
        }
    }
}

impl<A, R> Run for Pending<A, R>
where
    A: Send,
    R: Clone + Send + Sync,
{
    fn run(self: Box<Self>) -> ExecutionResult {
        let Pending {
            command,
            callable,
            argument,
            prototype,
            slot,
            notifier,
            reservation,
        } = *self;

        let mut output = R::clone(&prototype);
        let outcome = callable.invoke(&argument, &mut output);
        // The argument queue place is free again before anyone is told
        drop(reservation);

        let notifier = notifier.and_then(|weak| weak.upgrade());

        if outcome.is_ok() {
            match (slot, notifier) {
                (Some(slot), Some(notifier)) => {
                    slot.fulfil(output.clone());
                    Self::deliver(&command, &*notifier, outcome, Some(output));
                }
                (Some(slot), None) => slot.fulfil(output),
                (None, Some(notifier)) => Self::deliver(&command, &*notifier, outcome, Some(output)),
                (None, None) => {}
            }
        } else {
            debug!("Command {} failed: {}", command, outcome);
            if let Some(slot) = slot {
                slot.fail(outcome);
            }
            if let Some(notifier) = notifier {
                Self::deliver(&command, &*notifier, outcome, None);
            }
        }

        outcome
    }

    fn discard(self: Box<Self>) {
        let Pending { slot, .. } = *self;
        if let Some(slot) = slot {
            slot.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fn_runs_once() {
        let invocation = PendingInvocation::from_fn("Ping", || ExecutionResult::Succeeded);
        assert_eq!(invocation.command(), "Ping");
        assert_eq!(invocation.run(), ExecutionResult::Succeeded);
    }

    #[test]
    fn test_reservation_limit_and_release() {
        let in_flight = Arc::new(AtomicUsize::new(0));

        let first = Reservation::acquire(&in_flight, 2).unwrap();
        let second = Reservation::acquire(&in_flight, 2).unwrap();
        assert!(Reservation::acquire(&in_flight, 2).is_none());
        assert_eq!(in_flight.load(Ordering::SeqCst), 2);

        drop(first);
        assert_eq!(in_flight.load(Ordering::SeqCst), 1);
        let third = Reservation::acquire(&in_flight, 2);
        assert!(third.is_some());

        drop(second);
        drop(third);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }
}
