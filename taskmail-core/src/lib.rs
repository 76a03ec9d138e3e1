//! Core types for Taskmail
//!
//! This crate provides the building blocks shared by the queued command
//! machinery, including:
//! - Execution status codes
//! - The bounded lock-free queue backing every mailbox
//! - Mailbox and command queue configuration
//! - Wake-up signalling for signal-driven tasks
//! - Error types

pub mod config;
pub mod error;
pub mod execution;
pub mod queue;
pub mod signal;

pub use config::{CommandConfig, MailboxConfig, DEFAULT_ARGUMENT_QUEUE_SIZE, DEFAULT_MAILBOX_CAPACITY};
pub use error::{Error, Result};
pub use execution::ExecutionResult;
pub use queue::BoundedQueue;
pub use signal::WakeSignal;
