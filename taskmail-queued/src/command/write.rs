use super::{command_accessors, Command, QueuedCore};
use crate::callable::{CallableShape, CallableWrite, Invoke, Shaped};
use crate::mailbox::MailboxHandle;
use crate::notifier::Notifier;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use taskmail_core::{ExecutionResult, Result};

/// Queued command taking one argument
///
/// The argument is copied into the pending invocation when the call is
/// made, so the caller may reuse or drop its value right away.
pub struct QueuedWrite<A> {
    core: QueuedCore<A, ()>,
}

impl<A> QueuedWrite<A>
where
    A: Send + 'static,
{
    pub fn new(
        name: impl Into<Arc<str>>,
        callable: Arc<dyn CallableWrite<A>>,
        mailbox: &MailboxHandle,
        queue_size: usize,
    ) -> Result<Self> {
        let callable: Arc<dyn Invoke<A, ()>> = Arc::new(Shaped(callable));
        Ok(Self {
            core: QueuedCore::new(name, callable, (), mailbox, queue_size)?,
        })
    }

    /// Post a call with a copy of `argument`
    pub fn execute(&self, argument: &A) -> ExecutionResult
    where
        A: Clone,
    {
        self.core.submit(argument.clone(), None, None)
    }

    /// Post a call, moving `argument` into the invocation
    pub fn execute_owned(&self, argument: A) -> ExecutionResult {
        self.core.submit(argument, None, None)
    }

    /// Post a call and get told once it has run
    pub fn execute_with_notifier(&self, argument: &A, notifier: &Notifier<()>) -> ExecutionResult
    where
        A: Clone,
    {
        self.core.submit(argument.clone(), None, Some(notifier))
    }

    /// Same callable, bound to another mailbox with its own argument queue
    pub fn clone_for(&self, mailbox: &MailboxHandle, queue_size: usize) -> Result<Self> {
        Ok(Self {
            core: self.core.rebind(mailbox, queue_size)?,
        })
    }
}

impl<A> Clone for QueuedWrite<A> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<A> Command for QueuedWrite<A>
where
    A: Clone + Send + 'static,
{
    command_accessors!("QueuedWrite", CallableShape::Write);

    fn execute_dynamic(&self, argument: Option<&dyn Any>, _result: Option<&dyn Any>) -> ExecutionResult {
        match argument.and_then(|argument| argument.downcast_ref::<A>()) {
            Some(argument) => self.execute(argument),
            None => ExecutionResult::InvalidInput,
        }
    }
}

impl<A> fmt::Display for QueuedWrite<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.describe("QueuedWrite", f)
    }
}

impl<A> fmt::Debug for QueuedWrite<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
