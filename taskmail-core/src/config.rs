//! Mailbox and command queue configuration
//!
//! Capacities are fixed when a mailbox or a queued command is built and
//! never grow afterwards. Sizing is a deployment decision, so both values
//! are plain serde structs that can be read from a config file.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default number of pending invocations a mailbox can hold
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Default number of in-flight calls per queued command
pub const DEFAULT_ARGUMENT_QUEUE_SIZE: usize = 64;

/// Mailbox configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxConfig {
    /// Mailbox name, usually the owning task's name
    pub name: String,

    /// Mailbox capacity
    #[serde(default = "default_mailbox_capacity")]
    pub capacity: usize,
}

impl MailboxConfig {
    /// Configuration with the default capacity
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }

    /// Override the capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Check the configuration before building a mailbox from it
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidName(
                "mailbox name must not be empty".to_string(),
            ));
        }
        if self.capacity == 0 {
            return Err(Error::InvalidCapacity {
                what: "mailbox",
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self::new("mailbox")
    }
}

/// Queued command configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    /// How many calls of one command may be pending at once
    #[serde(default = "default_argument_queue_size")]
    pub argument_queue_size: usize,
}

impl CommandConfig {
    pub fn validate(&self) -> Result<()> {
        if self.argument_queue_size == 0 {
            return Err(Error::InvalidCapacity {
                what: "argument queue",
                capacity: self.argument_queue_size,
            });
        }
        Ok(())
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            argument_queue_size: DEFAULT_ARGUMENT_QUEUE_SIZE,
        }
    }
}

fn default_mailbox_capacity() -> usize { DEFAULT_MAILBOX_CAPACITY }
fn default_argument_queue_size() -> usize { DEFAULT_ARGUMENT_QUEUE_SIZE }
