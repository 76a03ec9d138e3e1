//! Queued commands and task mailboxes
//!
//! A task that owns some state exposes operations on it as queued
//! commands. Any thread may call a queued command; the call is turned into
//! a pending invocation and posted to the owning task's mailbox. The owner
//! runs pending invocations one at a time, in FIFO order, from its own
//! thread, so the callables never race with the owner's own code.
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use taskmail_queued::prelude::*;
//!
//! let position = Arc::new(Mutex::new(0.0_f64));
//! let mut mailbox = Mailbox::new("device", 16).unwrap();
//!
//! let target = Arc::clone(&position);
//! let set_target = QueuedWrite::new(
//!     "SetTarget",
//!     callable::write(move |value: &f64| {
//!         *target.lock() = *value;
//!         ExecutionResult::Succeeded
//!     }),
//!     &mailbox.handle(),
//!     4,
//! )
//! .unwrap();
//!
//! assert_eq!(set_target.execute(&2.5), ExecutionResult::Queued);
//! assert_eq!(*position.lock(), 0.0);
//!
//! assert_eq!(mailbox.execute_next(), ExecutionResult::Succeeded);
//! assert_eq!(*position.lock(), 2.5);
//! ```

pub mod callable;
pub mod command;
pub mod invocation;
pub mod mailbox;
pub mod notifier;
pub mod slot;

pub use callable::{
    CallableRead, CallableShape, CallableVoid, CallableVoidReturn, CallableWrite,
    CallableWriteReturn,
};
pub use command::{
    Command, QueuedRead, QueuedVoid, QueuedVoidReturn, QueuedWrite, QueuedWriteReturn,
};
pub use invocation::PendingInvocation;
pub use mailbox::{DrainSummary, Mailbox, MailboxHandle, MailboxStats, PostQueuedHook};
pub use notifier::{Completion, Notifier};
pub use slot::{ResultSlot, SlotStatus};

pub use taskmail_core::{
    CommandConfig, Error, ExecutionResult, MailboxConfig, Result, WakeSignal,
};

/// Prelude for common imports
pub mod prelude {
    pub use crate::callable;
    pub use crate::command::{
        Command, QueuedRead, QueuedVoid, QueuedVoidReturn, QueuedWrite, QueuedWriteReturn,
    };
    pub use crate::mailbox::{Mailbox, MailboxHandle};
    pub use crate::notifier::{Completion, Notifier};
    pub use crate::slot::{ResultSlot, SlotStatus};
    pub use taskmail_core::ExecutionResult;
}
