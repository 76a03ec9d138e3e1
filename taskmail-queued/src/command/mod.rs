//! Queued commands
//!
//! A queued command is the front end another thread calls to get work done
//! by a task. Calling it never runs the callable: it checks the command is
//! enabled, claims a place in the command's argument queue, and posts a
//! pending invocation to the owner's mailbox. The callable runs later, on
//! the owner thread, when the owner drains its mailbox.
//!
//! All five variants share `QueuedCore`; they differ only in which
//! argument and result types they expose.

mod read;
mod void;
mod void_return;
mod write;
mod write_return;

pub use read::QueuedRead;
pub use void::QueuedVoid;
pub use void_return::QueuedVoidReturn;
pub use write::QueuedWrite;
pub use write_return::QueuedWriteReturn;

use crate::callable::{CallableShape, Invoke};
use crate::invocation::{Pending, PendingInvocation, Reservation};
use crate::mailbox::MailboxHandle;
use crate::notifier::Notifier;
use crate::slot::ResultSlot;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use taskmail_core::{CommandConfig, ExecutionResult, Result};
use tracing::{debug, trace, warn};

/// Operations common to every queued command, usable as a trait object
pub trait Command: fmt::Display + Send + Sync {
    /// Command name, unique within the task that provides it
    fn name(&self) -> &str;

    /// Name of the concrete command type
    fn class_name(&self) -> &'static str;

    /// Argument and result shape of the callable
    fn shape(&self) -> CallableShape;

    /// Name of the mailbox calls are posted to
    fn mailbox_name(&self) -> &str;

    /// Maximum number of calls that may be pending at once
    fn argument_queue_size(&self) -> usize;

    /// Number of calls queued and not run yet
    fn pending(&self) -> usize;

    fn is_enabled(&self) -> bool;

    fn enable(&self);

    fn disable(&self);

    /// Type-erased call. `argument` must be the command's argument type and
    /// `result` a `ResultSlot` of its result type; anything missing or of
    /// the wrong type yields `InvalidInput`.
    fn execute_dynamic(&self, argument: Option<&dyn Any>, result: Option<&dyn Any>) -> ExecutionResult;
}

/// Shared machinery of the queued command variants
pub(crate) struct QueuedCore<A, R> {
    name: Arc<str>,
    callable: Arc<dyn Invoke<A, R>>,
    prototype: Arc<R>,
    mailbox: MailboxHandle,
    queue_size: usize,
    in_flight: Arc<AtomicUsize>,
    enabled: Arc<AtomicBool>,
}

impl<A, R> QueuedCore<A, R>
where
    A: Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        name: impl Into<Arc<str>>,
        callable: Arc<dyn Invoke<A, R>>,
        prototype: R,
        mailbox: &MailboxHandle,
        queue_size: usize,
    ) -> Result<Self> {
        let name = name.into();
        CommandConfig {
            argument_queue_size: queue_size,
        }
        .validate()?;

        debug!(
            "Creating queued command {} on mailbox {} (argument queue {})",
            name,
            mailbox.name(),
            queue_size
        );

        Ok(Self {
            name,
            callable,
            prototype: Arc::new(prototype),
            mailbox: mailbox.clone(),
            queue_size,
            in_flight: Arc::new(AtomicUsize::new(0)),
            enabled: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Independent front end for the same callable: its own mailbox,
    /// argument queue and enable flag.
    pub(crate) fn rebind(&self, mailbox: &MailboxHandle, queue_size: usize) -> Result<Self> {
        debug!(
            "Rebinding queued command {} from mailbox {} to {}",
            self.name,
            self.mailbox.name(),
            mailbox.name()
        );
        Self::new(
            Arc::clone(&self.name),
            Arc::clone(&self.callable),
            R::clone(&self.prototype),
            mailbox,
            queue_size,
        )
    }

    /// Post one call to the owner's mailbox. Returns `Queued` or the reason
    /// nothing was queued; on rejection the slot and argument queue are
    /// left as they were.
    pub(crate) fn submit(
        &self,
        argument: A,
        slot: Option<&ResultSlot<R>>,
        notifier: Option<&Notifier<R>>,
    ) -> ExecutionResult {
        if !self.is_enabled() {
            trace!("Command {} is disabled", self.name);
            return ExecutionResult::Disabled;
        }

        if slot.is_some_and(ResultSlot::is_withdrawn) {
            debug!("Command {} called with a withdrawn result slot", self.name);
            return ExecutionResult::InvalidInput;
        }

        let Some(reservation) = Reservation::acquire(&self.in_flight, self.queue_size) else {
            warn!(
                "Argument queue of {} full ({} pending)",
                self.name, self.queue_size
            );
            return ExecutionResult::ArgumentQueueFull;
        };

        let (previous, ticket) = match slot {
            Some(slot) => match slot.arm() {
                Some((previous, ticket)) => (Some(previous), Some(ticket)),
                // Withdrawn since the check above
                None => return ExecutionResult::InvalidInput,
            },
            None => (None, None),
        };

        let pending = Pending {
            command: Arc::clone(&self.name),
            callable: Arc::clone(&self.callable),
            argument,
            prototype: Arc::clone(&self.prototype),
            slot: ticket,
            notifier: notifier.map(Notifier::downgrade),
            reservation,
        };

        let outcome = self
            .mailbox
            .enqueue(PendingInvocation::new(Arc::clone(&self.name), Box::new(pending)));

        if !outcome.is_ok() {
            if let (Some(slot), Some(previous)) = (slot, previous) {
                slot.disarm(previous);
            }
        }
        outcome
    }
}

impl<A, R> QueuedCore<A, R> {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn mailbox_name(&self) -> &str {
        self.mailbox.name()
    }

    pub(crate) fn argument_queue_size(&self) -> usize {
        self.queue_size
    }

    pub(crate) fn pending(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        debug!(
            "Command {} {}",
            self.name,
            if enabled { "enabled" } else { "disabled" }
        );
        self.enabled.store(enabled, Ordering::Release);
    }

    pub(crate) fn describe(&self, class_name: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) on {}{}",
            class_name,
            self.name,
            self.mailbox.name(),
            if self.is_enabled() { "" } else { " [disabled]" }
        )
    }
}

impl<A, R> Clone for QueuedCore<A, R> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            callable: Arc::clone(&self.callable),
            prototype: Arc::clone(&self.prototype),
            mailbox: self.mailbox.clone(),
            queue_size: self.queue_size,
            in_flight: Arc::clone(&self.in_flight),
            enabled: Arc::clone(&self.enabled),
        }
    }
}

/// Accessors shared by every `Command` impl, delegating to `self.core`
macro_rules! command_accessors {
    ($class:literal, $shape:expr) => {
        fn name(&self) -> &str {
            self.core.name()
        }

        fn class_name(&self) -> &'static str {
            $class
        }

        fn shape(&self) -> $crate::callable::CallableShape {
            $shape
        }

        fn mailbox_name(&self) -> &str {
            self.core.mailbox_name()
        }

        fn argument_queue_size(&self) -> usize {
            self.core.argument_queue_size()
        }

        fn pending(&self) -> usize {
            self.core.pending()
        }

        fn is_enabled(&self) -> bool {
            self.core.is_enabled()
        }

        fn enable(&self) {
            self.core.set_enabled(true)
        }

        fn disable(&self) {
            self.core.set_enabled(false)
        }
    };
}

pub(crate) use command_accessors;
