use super::{command_accessors, Command, QueuedCore};
use crate::callable::{CallableRead, CallableShape, Invoke, Shaped};
use crate::mailbox::MailboxHandle;
use crate::notifier::Notifier;
use crate::slot::ResultSlot;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use taskmail_core::{ExecutionResult, Result};

/// Queued command reading a value from the owner's state
///
/// The value is produced when the owner drains its mailbox and lands in the
/// caller's `ResultSlot`; until then the slot reports `Pending`.
pub struct QueuedRead<R> {
    core: QueuedCore<(), R>,
}

impl<R> QueuedRead<R>
where
    R: Clone + Send + Sync + 'static,
{
    /// `prototype` is cloned by the owner as the initial output value
    pub fn new(
        name: impl Into<Arc<str>>,
        callable: Arc<dyn CallableRead<R>>,
        prototype: R,
        mailbox: &MailboxHandle,
        queue_size: usize,
    ) -> Result<Self> {
        let callable: Arc<dyn Invoke<(), R>> = Arc::new(Shaped(callable));
        Ok(Self {
            core: QueuedCore::new(name, callable, prototype, mailbox, queue_size)?,
        })
    }

    /// Post a read whose value is stored into `slot`
    pub fn execute(&self, slot: &ResultSlot<R>) -> ExecutionResult {
        self.core.submit((), Some(slot), None)
    }

    /// Post a read and get the value through `notifier`, and `slot` if given
    pub fn execute_with_notifier(
        &self,
        slot: Option<&ResultSlot<R>>,
        notifier: &Notifier<R>,
    ) -> ExecutionResult {
        self.core.submit((), slot, Some(notifier))
    }

    /// Same callable, bound to another mailbox with its own argument queue
    pub fn clone_for(&self, mailbox: &MailboxHandle, queue_size: usize) -> Result<Self> {
        Ok(Self {
            core: self.core.rebind(mailbox, queue_size)?,
        })
    }
}

impl<R> Clone for QueuedRead<R> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<R> Command for QueuedRead<R>
where
    R: Clone + Send + Sync + 'static,
{
    command_accessors!("QueuedRead", CallableShape::Read);

    fn execute_dynamic(&self, _argument: Option<&dyn Any>, result: Option<&dyn Any>) -> ExecutionResult {
        match result.and_then(|result| result.downcast_ref::<ResultSlot<R>>()) {
            Some(slot) => self.execute(slot),
            None => ExecutionResult::InvalidInput,
        }
    }
}

impl<R> fmt::Display for QueuedRead<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.describe("QueuedRead", f)
    }
}

impl<R> fmt::Debug for QueuedRead<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
