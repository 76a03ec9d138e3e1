//! Task mailboxes
//!
//! Every task owns one `Mailbox`. Other threads get a cloneable
//! `MailboxHandle` and can only enqueue; running the queued work needs
//! `&mut Mailbox`, so only the owner can drain it. Invocations carry their
//! result slot and notifier with them, so a single push or pop moves all of
//! them together and a rejected enqueue leaves the mailbox untouched.

use crate::invocation::PendingInvocation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use taskmail_core::{BoundedQueue, ExecutionResult, MailboxConfig, Result, WakeSignal};
use tracing::{debug, trace, warn};

/// Hook run after every successful enqueue, on the producer thread
pub type PostQueuedHook = Arc<dyn Fn() + Send + Sync>;

/// Mailbox statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxStats {
    /// Invocations accepted
    pub queued: u64,
    /// Invocations rejected because the mailbox was full
    pub rejected: u64,
    /// Invocations run by the owner
    pub executed: u64,
    /// Executed invocations whose callable failed
    pub failed: u64,
}

/// Result of draining several invocations in one go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainSummary {
    pub executed: usize,
    pub failed: usize,
}

#[derive(Default)]
struct Counters {
    queued: AtomicU64,
    rejected: AtomicU64,
    executed: AtomicU64,
    failed: AtomicU64,
}

struct Shared {
    name: String,
    queue: BoundedQueue<PendingInvocation>,
    post_queued: Option<PostQueuedHook>,
    counters: Counters,
}

impl Shared {
    fn enqueue(&self, invocation: PendingInvocation) -> ExecutionResult {
        match self.queue.try_push(invocation) {
            Ok(()) => {
                trace!("Mailbox {} queued invocation", self.name);
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
                if let Some(hook) = &self.post_queued {
                    hook();
                }
                ExecutionResult::Queued
            }
            Err(rejected) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Mailbox {} full ({} slots), rejecting {}",
                    self.name,
                    self.queue.capacity(),
                    rejected.command()
                );
                rejected.discard();
                ExecutionResult::MailboxFull
            }
        }
    }
}

/// Mailbox owned by one task
pub struct Mailbox {
    shared: Arc<Shared>,
}

impl Mailbox {
    /// Create a mailbox holding at most `capacity` pending invocations
    pub fn new(name: impl Into<String>, capacity: usize) -> Result<Self> {
        Self::from_config(&MailboxConfig::new(name).with_capacity(capacity))
    }

    /// Create a mailbox from configuration
    pub fn from_config(config: &MailboxConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Create a mailbox that runs `hook` after every successful enqueue
    pub fn with_post_queued_hook(config: &MailboxConfig, hook: PostQueuedHook) -> Result<Self> {
        Self::build(config, Some(hook))
    }

    /// Create a mailbox that raises `signal` whenever work is queued
    pub fn with_wake_signal(config: &MailboxConfig, signal: Arc<WakeSignal>) -> Result<Self> {
        Self::with_post_queued_hook(config, Arc::new(move || signal.raise()))
    }

    fn build(config: &MailboxConfig, post_queued: Option<PostQueuedHook>) -> Result<Self> {
        config.validate()?;
        debug!("Creating mailbox {} with capacity {}", config.name, config.capacity);

        Ok(Self {
            shared: Arc::new(Shared {
                name: config.name.clone(),
                queue: BoundedQueue::new(config.capacity),
                post_queued,
                counters: Counters::default(),
            }),
        })
    }

    /// Producer-side handle for other threads
    pub fn handle(&self) -> MailboxHandle {
        MailboxHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Queue an invocation from the owner thread itself
    pub fn enqueue(&self, invocation: PendingInvocation) -> ExecutionResult {
        self.shared.enqueue(invocation)
    }

    /// Run the oldest pending invocation.
    ///
    /// Returns `Empty` without side effects when nothing is pending,
    /// otherwise the status reported by the callable.
    pub fn execute_next(&mut self) -> ExecutionResult {
        let Some(invocation) = self.shared.queue.try_pop() else {
            return ExecutionResult::Empty;
        };

        trace!("Mailbox {} executing {}", self.shared.name, invocation.command());
        let outcome = invocation.run();

        self.shared.counters.executed.fetch_add(1, Ordering::Relaxed);
        if !outcome.is_ok() {
            self.shared.counters.failed.fetch_add(1, Ordering::Relaxed);
        }
        outcome
    }

    /// Run pending invocations until the mailbox is empty.
    ///
    /// Invocations queued while draining are run too; producers that never
    /// stop can keep this busy, use `execute_up_to` to bound a cycle.
    pub fn execute_all(&mut self) -> DrainSummary {
        self.execute_up_to(usize::MAX)
    }

    /// Run at most `limit` pending invocations
    pub fn execute_up_to(&mut self, limit: usize) -> DrainSummary {
        let mut summary = DrainSummary::default();
        while summary.executed < limit {
            match self.execute_next() {
                ExecutionResult::Empty => break,
                outcome => {
                    summary.executed += 1;
                    if !outcome.is_ok() {
                        summary.failed += 1;
                    }
                }
            }
        }
        summary
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    pub fn stats(&self) -> MailboxStats {
        self.handle().stats()
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("name", &self.shared.name)
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Producer side of a mailbox
#[derive(Clone)]
pub struct MailboxHandle {
    shared: Arc<Shared>,
}

impl MailboxHandle {
    /// Queue an invocation. Never blocks: returns `Queued` or `MailboxFull`.
    pub fn enqueue(&self, invocation: PendingInvocation) -> ExecutionResult {
        self.shared.enqueue(invocation)
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.shared.queue.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    pub fn stats(&self) -> MailboxStats {
        let counters = &self.shared.counters;
        MailboxStats {
            queued: counters.queued.load(Ordering::Relaxed),
            rejected: counters.rejected.load(Ordering::Relaxed),
            executed: counters.executed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Whether both handles point at the same mailbox
    pub fn same_mailbox(&self, other: &MailboxHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for MailboxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxHandle")
            .field("name", &self.shared.name)
            .finish()
    }
}
