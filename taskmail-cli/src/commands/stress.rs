//! Multi-producer stress run
//!
//! Several producer threads hammer one queued command while the owner
//! drains its mailbox. Every call carries its producer id and sequence
//! number, and the owner checks each producer's calls arrive in order.

use crate::config::DemoConfig;
use anyhow::{anyhow, ensure, Result};
use crossbeam_utils::thread as cb_thread;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use taskmail_queued::prelude::*;
use taskmail_queued::MailboxStats;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
pub struct StressReport {
    pub producers: usize,
    pub calls_per_producer: usize,
    pub executed: u64,
    pub retries: u64,
    pub order_violations: usize,
    pub elapsed_ms: u64,
    pub calls_per_sec: f64,
    pub mailbox: MailboxStats,
}

impl StressReport {
    pub fn is_ordered(&self) -> bool {
        self.order_violations == 0
    }
}

impl fmt::Display for StressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Producers:   {} x {} calls",
            self.producers, self.calls_per_producer
        )?;
        writeln!(f, "Executed:    {}", self.executed)?;
        writeln!(f, "Retries:     {}", self.retries)?;
        writeln!(
            f,
            "FIFO:        {}",
            if self.is_ordered() {
                "ok".to_string()
            } else {
                format!("{} violations", self.order_violations)
            }
        )?;
        writeln!(
            f,
            "Elapsed:     {} ms ({:.0} calls/s)",
            self.elapsed_ms, self.calls_per_sec
        )?;
        writeln!(
            f,
            "Mailbox:     queued {} rejected {} executed {}",
            self.mailbox.queued, self.mailbox.rejected, self.mailbox.executed
        )
    }
}

pub fn run_stress(config: &DemoConfig, producers: usize, calls: usize) -> Result<StressReport> {
    ensure!(producers > 0, "at least one producer is required");

    let mut mailbox = Mailbox::from_config(&config.device)?;
    let next_expected = Arc::new(Mutex::new(vec![0usize; producers]));
    let violations = Arc::new(AtomicUsize::new(0));

    let record = {
        let next_expected = Arc::clone(&next_expected);
        let violations = Arc::clone(&violations);
        QueuedWrite::new(
            "Record",
            callable::write(move |&(producer, seq): &(usize, usize)| {
                let mut next_expected = next_expected.lock();
                if seq != next_expected[producer] {
                    violations.fetch_add(1, Ordering::Relaxed);
                }
                next_expected[producer] = seq + 1;
                ExecutionResult::Succeeded
            }),
            &mailbox.handle(),
            config.command.argument_queue_size,
        )?
    };

    info!(
        "Stressing mailbox {} (capacity {}) with {} producers",
        mailbox.name(),
        mailbox.capacity(),
        producers
    );

    let retries = AtomicU64::new(0);
    let done = AtomicBool::new(false);
    let started = Instant::now();

    cb_thread::scope(|s| {
        let producer_tasks: Vec<_> = (0..producers)
            .map(|producer| {
                let record = record.clone();
                let retries = &retries;
                s.spawn(move |_| {
                    for seq in 0..calls {
                        while !record.execute(&(producer, seq)).is_ok() {
                            retries.fetch_add(1, Ordering::Relaxed);
                            thread::yield_now();
                        }
                    }
                    debug!("Producer {} finished", producer);
                })
            })
            .collect();

        let done = &done;
        let mailbox = &mut mailbox;
        s.spawn(move |_| loop {
            let finished = done.load(Ordering::Acquire);
            if mailbox.execute_all().executed == 0 {
                if finished {
                    break;
                }
                thread::yield_now();
            }
        });

        for task in producer_tasks {
            if task.join().is_err() {
                warn!("Producer thread panicked");
            }
        }
        done.store(true, Ordering::Release);
    })
    .map_err(|_| anyhow!("stress thread panicked"))?;

    let elapsed = started.elapsed();
    let stats = mailbox.stats();
    let total = (producers * calls) as f64;

    Ok(StressReport {
        producers,
        calls_per_producer: calls,
        executed: stats.executed,
        retries: retries.load(Ordering::Relaxed),
        order_violations: violations.load(Ordering::Relaxed),
        elapsed_ms: elapsed.as_millis() as u64,
        calls_per_sec: total / elapsed.as_secs_f64().max(f64::EPSILON),
        mailbox: stats,
    })
}
