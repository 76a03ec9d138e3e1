//! Completion notifiers
//!
//! A caller that wants to be told when its deferred call has run supplies a
//! `Notifier`. The owner task invokes it right after running the callable,
//! on the owner thread, so the notifier must be cheap and non-blocking. The
//! usual choice is `Notifier::forward_to`, which re-enqueues the completion
//! into the caller's own mailbox so the result reaches the caller's thread
//! on its next cycle.

use crate::command::QueuedWrite;
use std::fmt;
use std::sync::{Arc, Weak};
use taskmail_core::ExecutionResult;

/// Outcome of one drained invocation, as seen by its notifier
#[derive(Debug, Clone, PartialEq)]
pub struct Completion<R> {
    /// Name of the command that ran
    pub command: Arc<str>,

    /// Status reported by the callable
    pub outcome: ExecutionResult,

    /// The produced value; present exactly when the outcome is a success
    pub value: Option<R>,
}

impl<R> Completion<R> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

pub(crate) type NotifyFn<R> = dyn Fn(Completion<R>) -> ExecutionResult + Send + Sync;

/// Write-style handle invoked once per drained invocation
pub struct Notifier<R> {
    inner: Arc<NotifyFn<R>>,
}

impl<R: 'static> Notifier<R> {
    /// Notifier running `f` on the owner thread
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Completion<R>) -> ExecutionResult + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Notifier that queues each completion into another task's mailbox
    pub fn forward_to(command: QueuedWrite<Completion<R>>) -> Self
    where
        R: Send,
    {
        Self::new(move |completion| command.execute_owned(completion))
    }

    /// Deliver a completion directly
    pub fn notify(&self, completion: Completion<R>) -> ExecutionResult {
        (self.inner)(completion)
    }

    pub(crate) fn downgrade(&self) -> Weak<NotifyFn<R>> {
        Arc::downgrade(&self.inner)
    }
}

impl<R> fmt::Debug for Notifier<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}
