use super::{command_accessors, Command, QueuedCore};
use crate::callable::{CallableShape, CallableVoid, Invoke, Shaped};
use crate::mailbox::MailboxHandle;
use crate::notifier::Notifier;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use taskmail_core::{ExecutionResult, Result};

/// Queued command without argument or result
pub struct QueuedVoid {
    core: QueuedCore<(), ()>,
}

impl QueuedVoid {
    pub fn new(
        name: impl Into<Arc<str>>,
        callable: Arc<dyn CallableVoid>,
        mailbox: &MailboxHandle,
        queue_size: usize,
    ) -> Result<Self> {
        let callable: Arc<dyn Invoke<(), ()>> = Arc::new(Shaped(callable));
        Ok(Self {
            core: QueuedCore::new(name, callable, (), mailbox, queue_size)?,
        })
    }

    /// Post a call to the owner's mailbox
    pub fn execute(&self) -> ExecutionResult {
        self.core.submit((), None, None)
    }

    /// Post a call and get told once it has run
    pub fn execute_with_notifier(&self, notifier: &Notifier<()>) -> ExecutionResult {
        self.core.submit((), None, Some(notifier))
    }

    /// Same callable, bound to another mailbox with its own argument queue
    pub fn clone_for(&self, mailbox: &MailboxHandle, queue_size: usize) -> Result<Self> {
        Ok(Self {
            core: self.core.rebind(mailbox, queue_size)?,
        })
    }
}

impl Clone for QueuedVoid {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl Command for QueuedVoid {
    command_accessors!("QueuedVoid", CallableShape::Void);

    fn execute_dynamic(&self, _argument: Option<&dyn Any>, _result: Option<&dyn Any>) -> ExecutionResult {
        self.execute()
    }
}

impl fmt::Display for QueuedVoid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.describe("QueuedVoid", f)
    }
}

impl fmt::Debug for QueuedVoid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
