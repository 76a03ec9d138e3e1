//! Controller/device demo
//!
//! The device task owns a simulated axis and exposes it through queued
//! commands. The controller task calls those commands every cycle and gets
//! read results back as completions forwarded into its own mailbox, so
//! neither task ever touches the other's state directly.

use crate::config::DemoConfig;
use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use taskmail_core::WakeSignal;
use taskmail_queued::prelude::*;
use taskmail_queued::MailboxStats;
use tracing::{debug, info, warn};

/// State owned by the device task
#[derive(Debug, Default)]
pub struct Device {
    target: f64,
    position: f64,
    max_step: f64,
    steps: u64,
}

impl Device {
    pub fn new(max_step: f64) -> Self {
        Self {
            max_step,
            ..Self::default()
        }
    }

    fn set_target(&mut self, target: &f64) {
        self.target = *target;
    }

    fn position(&self, out: &mut f64) {
        *out = self.position;
    }

    /// Move towards the target by at most `max_step`
    fn step(&mut self) {
        let delta = (self.target - self.position).clamp(-self.max_step, self.max_step);
        self.position += delta;
        self.steps += 1;
    }

    fn move_by(&mut self, delta: &f64, target: &mut f64) {
        self.target += delta;
        *target = self.target;
    }
}

/// Queued interface of the device task
pub struct DeviceCommands {
    pub set_target: QueuedWrite<f64>,
    pub get_position: QueuedRead<f64>,
    pub step: QueuedVoid,
    pub move_by: QueuedWriteReturn<f64, f64>,
}

impl DeviceCommands {
    pub fn bind(device: &Arc<Mutex<Device>>, mailbox: &MailboxHandle, queue_size: usize) -> Result<Self> {
        Ok(Self {
            set_target: QueuedWrite::new(
                "SetTarget",
                callable::write_method(Arc::clone(device), Device::set_target),
                mailbox,
                queue_size,
            )?,
            get_position: QueuedRead::new(
                "GetPosition",
                callable::read_method(Arc::clone(device), Device::position),
                0.0,
                mailbox,
                queue_size,
            )?,
            step: QueuedVoid::new(
                "Step",
                callable::void_method(Arc::clone(device), Device::step),
                mailbox,
                queue_size,
            )?,
            move_by: QueuedWriteReturn::new(
                "MoveBy",
                callable::write_return_method(Arc::clone(device), Device::move_by),
                0.0,
                mailbox,
                queue_size,
            )?,
        })
    }

    pub fn all(&self) -> [&dyn Command; 4] {
        [&self.set_target, &self.get_position, &self.step, &self.move_by]
    }
}

/// What the controller learnt from the device
#[derive(Debug, Default)]
struct ControllerState {
    positions: Vec<f64>,
    targets: Vec<f64>,
    failed: usize,
}

impl ControllerState {
    fn received(&self) -> usize {
        self.positions.len() + self.targets.len() + self.failed
    }
}

/// Summary printed at the end of a demo run
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub cycles: usize,
    pub calls_rejected: usize,
    pub completions_expected: usize,
    pub completions_received: usize,
    pub completions_failed: usize,
    pub last_position: Option<f64>,
    pub last_target: Option<f64>,
    pub device_position: f64,
    pub device_steps: u64,
    pub device: MailboxStats,
    pub controller: MailboxStats,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cycles:        {}", self.cycles)?;
        writeln!(f, "Rejected:      {}", self.calls_rejected)?;
        writeln!(
            f,
            "Completions:   {}/{} ({} failed)",
            self.completions_received, self.completions_expected, self.completions_failed
        )?;
        if let Some(position) = self.last_position {
            writeln!(f, "Last position: {position:.3}")?;
        }
        if let Some(target) = self.last_target {
            writeln!(f, "Last target:   {target:.3}")?;
        }
        writeln!(
            f,
            "Device:        position {:.3} after {} steps",
            self.device_position, self.device_steps
        )?;
        for (name, stats) in [("device", &self.device), ("controller", &self.controller)] {
            writeln!(
                f,
                "Mailbox {name:<10} queued {} rejected {} executed {} failed {}",
                stats.queued, stats.rejected, stats.executed, stats.failed
            )?;
        }
        Ok(())
    }
}

/// Forwarding target recording completions into the controller state
fn completion_sink(
    name: &str,
    state: &Arc<Mutex<ControllerState>>,
    mailbox: &MailboxHandle,
    queue_size: usize,
    record: fn(&mut ControllerState, f64),
) -> Result<Notifier<f64>> {
    let state = Arc::clone(state);
    let on_completion = QueuedWrite::new(
        name,
        callable::write(move |completion: &Completion<f64>| {
            let mut state = state.lock();
            match completion.value {
                Some(value) => record(&mut state, value),
                None => {
                    warn!("{} failed: {}", completion.command, completion.outcome);
                    state.failed += 1;
                }
            }
            ExecutionResult::Succeeded
        }),
        mailbox,
        queue_size,
    )?;
    Ok(Notifier::forward_to(on_completion))
}

/// Target for a given cycle: a slow sawtooth
fn target_for(cycle: usize) -> f64 {
    (cycle % 8) as f64
}

pub fn run_demo(config: &DemoConfig) -> Result<RunSummary> {
    let period = config.demo.cycle_period();
    let queue_size = config.command.argument_queue_size;

    let signal = Arc::new(WakeSignal::new());
    let mut device_mailbox = Mailbox::with_wake_signal(&config.device, Arc::clone(&signal))?;
    let mut controller_mailbox = Mailbox::from_config(&config.controller)?;

    let device = Arc::new(Mutex::new(Device::new(config.demo.max_step)));
    let commands = DeviceCommands::bind(&device, &device_mailbox.handle(), queue_size)?;
    for command in commands.all() {
        debug!("Device provides {}", command);
    }

    let state = Arc::new(Mutex::new(ControllerState::default()));
    let controller_handle = controller_mailbox.handle();
    let position_notifier = completion_sink(
        "OnPosition",
        &state,
        &controller_handle,
        queue_size,
        |state, position| state.positions.push(position),
    )?;
    let moved_notifier = completion_sink(
        "OnMoved",
        &state,
        &controller_handle,
        queue_size,
        |state, target| state.targets.push(target),
    )?;

    let stop = Arc::new(AtomicBool::new(false));
    let device_task = {
        let stop = Arc::clone(&stop);
        let signal = Arc::clone(&signal);
        thread::Builder::new()
            .name("device".to_string())
            .spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    signal.wait_timeout(period);
                    device_mailbox.execute_all();
                }
                device_mailbox.execute_all();
                device_mailbox
            })
            .context("failed to start device task")?
    };

    info!("Running {} controller cycles", config.demo.requests);
    let mut calls_rejected = 0;
    let mut completions_expected = 0;

    for cycle in 0..config.demo.requests {
        let plain = [
            commands.set_target.execute(&target_for(cycle)),
            commands.step.execute(),
        ];
        let notified = [
            commands.get_position.execute_with_notifier(None, &position_notifier),
            commands.move_by.execute_with_notifier(&0.25, None, &moved_notifier),
        ];

        for status in plain.iter().chain(notified.iter()) {
            if !status.is_ok() {
                debug!("Cycle {} call rejected: {}", cycle, status);
                calls_rejected += 1;
            }
        }
        completions_expected += notified.iter().filter(|status| status.is_ok()).count();

        controller_mailbox.execute_all();
        thread::sleep(period);
    }

    // Give the device time to answer what is still outstanding
    let deadline = Instant::now() + Duration::from_secs(1) + period * 10;
    while state.lock().received() < completions_expected && Instant::now() < deadline {
        controller_mailbox.execute_all();
        thread::sleep(period.max(Duration::from_millis(1)));
    }

    stop.store(true, Ordering::Release);
    signal.raise();
    let device_mailbox = device_task
        .join()
        .map_err(|_| anyhow!("device task panicked"))?;
    controller_mailbox.execute_all();

    let state = state.lock();
    if state.received() < completions_expected {
        warn!(
            "{} completions never arrived",
            completions_expected - state.received()
        );
    }
    let device = device.lock();

    Ok(RunSummary {
        cycles: config.demo.requests,
        calls_rejected,
        completions_expected,
        completions_received: state.received(),
        completions_failed: state.failed,
        last_position: state.positions.last().copied(),
        last_target: state.targets.last().copied(),
        device_position: device.position,
        device_steps: device.steps,
        device: device_mailbox.stats(),
        controller: controller_mailbox.stats(),
    })
}
