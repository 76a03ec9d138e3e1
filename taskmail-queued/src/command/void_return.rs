use super::{command_accessors, Command, QueuedCore};
use crate::callable::{CallableShape, CallableVoidReturn, Invoke, Shaped};
use crate::mailbox::MailboxHandle;
use crate::notifier::Notifier;
use crate::slot::ResultSlot;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use taskmail_core::{ExecutionResult, Result};

/// Queued command without argument that acts on the owner and returns a value
pub struct QueuedVoidReturn<R> {
    core: QueuedCore<(), R>,
}

impl<R> QueuedVoidReturn<R>
where
    R: Clone + Send + Sync + 'static,
{
    pub fn new(
        name: impl Into<Arc<str>>,
        callable: Arc<dyn CallableVoidReturn<R>>,
        prototype: R,
        mailbox: &MailboxHandle,
        queue_size: usize,
    ) -> Result<Self> {
        let callable: Arc<dyn Invoke<(), R>> = Arc::new(Shaped(callable));
        Ok(Self {
            core: QueuedCore::new(name, callable, prototype, mailbox, queue_size)?,
        })
    }

    pub fn execute(&self, slot: &ResultSlot<R>) -> ExecutionResult {
        self.core.submit((), Some(slot), None)
    }

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

impl<R> Clone for QueuedVoidReturn<R> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<R> Command for QueuedVoidReturn<R>
where
    R: Clone + Send + Sync + 'static,
{
    command_accessors!("QueuedVoidReturn", CallableShape::VoidReturn);

    fn execute_dynamic(&self, _argument: Option<&dyn Any>, result: Option<&dyn Any>) -> ExecutionResult {
        match result.and_then(|result| result.downcast_ref::<ResultSlot<R>>()) {
            Some(slot) => self.execute(slot),
            None => ExecutionResult::InvalidInput,
        }
    }
}

impl<R> fmt::Display for QueuedVoidReturn<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.describe("QueuedVoidReturn", f)
    }
}

impl<R> fmt::Debug for QueuedVoidReturn<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
