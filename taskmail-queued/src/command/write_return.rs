use super::{command_accessors, Command, QueuedCore};
use crate::callable::{CallableShape, CallableWriteReturn, Invoke, Shaped};
use crate::mailbox::MailboxHandle;
use crate::notifier::Notifier;
use crate::slot::ResultSlot;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use taskmail_core::{ExecutionResult, Result};

/// Queued command taking one argument and producing a value
///
/// Also serves as a qualified read: the argument selects what to read.
pub struct QueuedWriteReturn<A, R> {
    core: QueuedCore<A, R>,
}

impl<A, R> QueuedWriteReturn<A, R>
where
    A: Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    pub fn new(
        name: impl Into<Arc<str>>,
        callable: Arc<dyn CallableWriteReturn<A, R>>,
        prototype: R,
        mailbox: &MailboxHandle,
        queue_size: usize,
    ) -> Result<Self> {
        let callable: Arc<dyn Invoke<A, R>> = Arc::new(Shaped(callable));
        Ok(Self {
            core: QueuedCore::new(name, callable, prototype, mailbox, queue_size)?,
        })
    }

    /// Post a call with a copy of `argument`; the value is stored into `slot`
    pub fn execute(&self, argument: &A, slot: &ResultSlot<R>) -> ExecutionResult
    where
        A: Clone,
    {
        self.core.submit(argument.clone(), Some(slot), None)
    }

    pub fn execute_owned(&self, argument: A, slot: &ResultSlot<R>) -> ExecutionResult {
        self.core.submit(argument, Some(slot), None)
    }

    pub fn execute_with_notifier(
        &self,
        argument: &A,
        slot: Option<&ResultSlot<R>>,
        notifier: &Notifier<R>,
    ) -> ExecutionResult
    where
        A: Clone,
    {
        self.core.submit(argument.clone(), slot, Some(notifier))
    }

    /// Same callable, bound to another mailbox with its own argument queue
    pub fn clone_for(&self, mailbox: &MailboxHandle, queue_size: usize) -> Result<Self> {
        Ok(Self {
            core: self.core.rebind(mailbox, queue_size)?,
        })
    }
}

impl<A, R> Clone for QueuedWriteReturn<A, R> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<A, R> Command for QueuedWriteReturn<A, R>
where
    A: Clone + Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    command_accessors!("QueuedWriteReturn", CallableShape::WriteReturn);

    fn execute_dynamic(&self, argument: Option<&dyn Any>, result: Option<&dyn Any>) -> ExecutionResult {
        let argument = argument.and_then(|argument| argument.downcast_ref::<A>());
        let slot = result.and_then(|result| result.downcast_ref::<ResultSlot<R>>());
        match (argument, slot) {
            (Some(argument), Some(slot)) => self.execute(argument, slot),
            _ => ExecutionResult::InvalidInput,
        }
    }
}

impl<A, R> fmt::Display for QueuedWriteReturn<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.describe("QueuedWriteReturn", f)
    }
}

impl<A, R> fmt::Debug for QueuedWriteReturn<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
