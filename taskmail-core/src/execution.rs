//! Execution status codes
//!
//! Every queued command call and every mailbox dequeue step reports one of
//! these values synchronously. A status returned at enqueue time never
//! carries the outcome of the deferred execution; that outcome is reported
//! later by the owner thread through the result slot and the notifier.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Synchronous status of a queued command call or a mailbox step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExecutionResult {
    /// The callable ran and reported success
    Succeeded,

    /// The invocation was accepted by the destination mailbox
    Queued,

    /// Nothing was pending in the mailbox
    Empty,

    /// The command is disabled by its owner
    Disabled,

    /// The destination mailbox is at capacity
    MailboxFull,

    /// The command's argument queue is at capacity
    ArgumentQueueFull,

    /// Missing, withdrawn or mistyped argument or result
    InvalidInput,

    /// The callable itself failed
    MethodFailed,

    /// No outcome has been recorded
    #[default]
    Undefined,
}

impl ExecutionResult {
    /// Whether the call went through (executed or queued)
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Succeeded | Self::Queued)
    }

    /// Whether the call was rejected for lack of queue space
    pub fn is_capacity_exhausted(self) -> bool {
        matches!(self, Self::MailboxFull | Self::ArgumentQueueFull)
    }

    /// Whether the status reports a problem. `Empty` is not a failure.
    pub fn is_failure(self) -> bool {
        !self.is_ok() && self != Self::Empty
    }

    /// Convert into a `Result` for callers that prefer `?`
    pub fn into_result(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(Error::Execution(self))
        }
    }

    /// Short human readable description
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "command succeeded",
            Self::Queued => "command queued",
            Self::Empty => "mailbox empty",
            Self::Disabled => "command disabled",
            Self::MailboxFull => "mailbox full",
            Self::ArgumentQueueFull => "argument queue full",
            Self::InvalidInput => "invalid input",
            Self::MethodFailed => "method failed",
            Self::Undefined => "undefined",
        }
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
