//! Behaviour of queued commands as seen from callers and owners

use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use taskmail_queued::prelude::*;
use taskmail_queued::{CallableShape, MailboxConfig, PendingInvocation};

/// Shared log of invocations, in the order the owner ran them
type RunLog = Arc<Mutex<Vec<String>>>;

fn logging_read(log: &RunLog, mailbox: &Mailbox, name: &'static str) -> QueuedRead<String> {
    let log = Arc::clone(log);
    QueuedRead::new(
        name,
        callable::read(move |out: &mut String| {
            log.lock().push(name.to_string());
            out.push_str(name);
            ExecutionResult::Succeeded
        }),
        String::new(),
        &mailbox.handle(),
        4,
    )
    .unwrap()
}

#[test]
fn test_capacity_two_scenario() {
    let log: RunLog = Arc::new(Mutex::new(Vec::new()));
    let mut mailbox = Mailbox::new("owner", 2).unwrap();

    let a = logging_read(&log, &mailbox, "A");
    let b = logging_read(&log, &mailbox, "B");
    let c = logging_read(&log, &mailbox, "C");
    let d = logging_read(&log, &mailbox, "D");

    let notified = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&notified);
    let notifier = Notifier::new(move |completion: Completion<String>| {
        sink.lock().push(completion);
        ExecutionResult::Succeeded
    });

    let (slot_a, slot_b, slot_c, slot_d) = (
        ResultSlot::new(),
        ResultSlot::new(),
        ResultSlot::new(),
        ResultSlot::new(),
    );

    assert_eq!(
        a.execute_with_notifier(Some(&slot_a), &notifier),
        ExecutionResult::Queued
    );
    assert_eq!(b.execute(&slot_b), ExecutionResult::Queued);
    assert_eq!(c.execute(&slot_c), ExecutionResult::MailboxFull);
    assert_eq!(slot_c.status(), SlotStatus::Idle);
    assert_eq!(c.pending(), 0);

    assert_eq!(mailbox.execute_next(), ExecutionResult::Succeeded);
    assert_eq!(slot_a.get().as_deref(), Some("A"));
    assert!(slot_b.is_pending());
    {
        let notified = notified.lock();
        assert_eq!(notified.len(), 1);
        assert_eq!(&*notified[0].command, "A");
        assert_eq!(notified[0].value.as_deref(), Some("A"));
    }

    assert_eq!(d.execute(&slot_d), ExecutionResult::Queued);

    assert_eq!(mailbox.execute_next(), ExecutionResult::Succeeded);
    assert_eq!(mailbox.execute_next(), ExecutionResult::Succeeded);
    assert_eq!(mailbox.execute_next(), ExecutionResult::Empty);

    assert_eq!(*log.lock(), vec!["A", "B", "D"]);
    assert_eq!(slot_b.take().as_deref(), Some("B"));
    assert_eq!(slot_d.take().as_deref(), Some("D"));
    assert_eq!(notified.lock().len(), 1);
}

#[test]
fn test_failing_callable_does_not_block_later_calls() {
    let mut mailbox = Mailbox::new("owner", 4).unwrap();
    let handle = mailbox.handle();

    let broken = QueuedVoidReturn::new(
        "Broken",
        callable::void_return(|_: &mut u32| ExecutionResult::MethodFailed),
        0,
        &handle,
        2,
    )
    .unwrap();
    let working = QueuedVoidReturn::new(
        "Working",
        callable::void_return(|out: &mut u32| {
            *out = 11;
            ExecutionResult::Succeeded
        }),
        0,
        &handle,
        2,
    )
    .unwrap();

    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);
    let notifier = Notifier::new(move |completion: Completion<u32>| {
        sink.lock().push((completion.outcome, completion.value));
        ExecutionResult::Succeeded
    });

    let broken_slot = ResultSlot::new();
    let working_slot = ResultSlot::new();
    assert!(broken.execute_with_notifier(Some(&broken_slot), &notifier).is_ok());

    assert_eq!(mailbox.execute_next(), ExecutionResult::MethodFailed);
    assert_eq!(
        broken_slot.status(),
        SlotStatus::Failed(ExecutionResult::MethodFailed)
    );
    assert_eq!(
        *failures.lock(),
        vec![(ExecutionResult::MethodFailed, None)]
    );

    assert!(working.execute(&working_slot).is_ok());
    assert_eq!(mailbox.execute_next(), ExecutionResult::Succeeded);
    assert_eq!(working_slot.take(), Some(11));
}

#[test]
fn test_no_write_before_drain() {
    let mut mailbox = Mailbox::new("owner", 4).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let scale = QueuedWriteReturn::new(
        "Scale",
        callable::write_return(move |factor: &i64, out: &mut i64| {
            seen.fetch_add(1, Ordering::SeqCst);
            *out = 10 * factor;
            ExecutionResult::Succeeded
        }),
        0,
        &mailbox.handle(),
        4,
    )
    .unwrap();

    let slot = ResultSlot::new();
    assert_eq!(scale.execute(&3, &slot), ExecutionResult::Queued);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(slot.get(), None);
    assert!(slot.is_pending());

    mailbox.execute_all();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(slot.get(), Some(30));
}

#[test]
fn test_withdrawn_slot_is_invalid_input() {
    let mailbox = Mailbox::new("owner", 4).unwrap();
    let read = QueuedRead::new(
        "Read",
        callable::read(|out: &mut u8| {
            *out = 1;
            ExecutionResult::Succeeded
        }),
        0,
        &mailbox.handle(),
        4,
    )
    .unwrap();

    let slot = ResultSlot::new();
    slot.withdraw();
    assert_eq!(read.execute(&slot), ExecutionResult::InvalidInput);
    assert!(mailbox.is_empty());
    assert_eq!(read.pending(), 0);
}

#[test]
fn test_slot_withdrawn_after_enqueue_discards_result() {
    let mut mailbox = Mailbox::new("owner", 4).unwrap();
    let read = QueuedRead::new(
        "Read",
        callable::read(|out: &mut u8| {
            *out = 5;
            ExecutionResult::Succeeded
        }),
        0,
        &mailbox.handle(),
        4,
    )
    .unwrap();

    let slot = ResultSlot::new();
    assert!(read.execute(&slot).is_ok());
    slot.withdraw();

    assert_eq!(mailbox.execute_next(), ExecutionResult::Succeeded);
    assert!(slot.is_withdrawn());
    assert_eq!(slot.get(), None);

    let dropped = ResultSlot::new();
    assert!(read.execute(&dropped).is_ok());
    drop(dropped);
    assert_eq!(mailbox.execute_next(), ExecutionResult::Succeeded);
}

#[test]
fn test_reset_slot_ignores_result_of_earlier_call() {
    let mut mailbox = Mailbox::new("owner", 4).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    let state = Arc::clone(&counter);
    let next = QueuedRead::new(
        "Next",
        callable::read(move |out: &mut usize| {
            *out = 100 * (state.fetch_add(1, Ordering::SeqCst) + 1);
            ExecutionResult::Succeeded
        }),
        0,
        &mailbox.handle(),
        4,
    )
    .unwrap();

    let slot = ResultSlot::new();
    assert!(next.execute(&slot).is_ok());
    slot.withdraw();
    slot.reset();
    assert!(next.execute(&slot).is_ok());

    // The first call runs but its value belongs to the withdrawn use
    assert_eq!(mailbox.execute_next(), ExecutionResult::Succeeded);
    assert!(slot.is_pending());
    assert_eq!(slot.get(), None);

    assert_eq!(mailbox.execute_next(), ExecutionResult::Succeeded);
    assert_eq!(slot.take(), Some(200));
}

#[test]
fn test_notifier_fires_once_with_slot_value() {
    let mut mailbox = Mailbox::new("owner", 8).unwrap();
    let counter = Arc::new(Mutex::new(0u32));
    let state = Arc::clone(&counter);
    let next = QueuedVoidReturn::new(
        "Next",
        callable::void_return(move |out: &mut u32| {
            let mut counter = state.lock();
            *counter += 1;
            *out = *counter;
            ExecutionResult::Succeeded
        }),
        0,
        &mailbox.handle(),
        8,
    )
    .unwrap();

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let notifier = Notifier::new(move |completion: Completion<u32>| {
        sink.lock().push(completion.value);
        ExecutionResult::Succeeded
    });

    let slot = ResultSlot::new();
    assert!(next.execute_with_notifier(Some(&slot), &notifier).is_ok());
    assert!(received.lock().is_empty());

    mailbox.execute_all();
    assert_eq!(*received.lock(), vec![Some(1)]);
    assert_eq!(slot.get(), Some(1));

    mailbox.execute_all();
    assert_eq!(received.lock().len(), 1);
}

#[test]
fn test_void_and_write_notifiers_fire_once() {
    let mut mailbox = Mailbox::new("owner", 8).unwrap();
    let total = Arc::new(Mutex::new(0i32));
    let sum = Arc::clone(&total);
    let add = QueuedWrite::new(
        "Add",
        callable::write(move |x: &i32| {
            *sum.lock() += x;
            ExecutionResult::Succeeded
        }),
        &mailbox.handle(),
        4,
    )
    .unwrap();
    let step = QueuedVoid::new(
        "Step",
        callable::void(|| ExecutionResult::Succeeded),
        &mailbox.handle(),
        4,
    )
    .unwrap();

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let notifier = Notifier::new(move |completion: Completion<()>| {
        sink.lock().push((completion.command.to_string(), completion.outcome));
        ExecutionResult::Succeeded
    });

    assert!(add.execute_with_notifier(&5, &notifier).is_ok());
    assert!(step.execute_with_notifier(&notifier).is_ok());
    assert!(received.lock().is_empty());

    assert_eq!(mailbox.execute_all().executed, 2);
    assert_eq!(
        *received.lock(),
        vec![
            ("Add".to_string(), ExecutionResult::Succeeded),
            ("Step".to_string(), ExecutionResult::Succeeded),
        ]
    );
    assert_eq!(*total.lock(), 5);

    mailbox.execute_all();
    assert_eq!(received.lock().len(), 2);
}

#[test]
fn test_rejected_call_never_notifies() {
    let mut mailbox = Mailbox::new("owner", 1).unwrap();
    let handle = mailbox.handle();
    let fired = Arc::new(AtomicUsize::new(0));
    let count = Arc::clone(&fired);
    let notifier = Notifier::new(move |_: Completion<u32>| {
        count.fetch_add(1, Ordering::SeqCst);
        ExecutionResult::Succeeded
    });
    let read = |name: &'static str, queue_size: usize| {
        QueuedRead::new(
            name,
            callable::read(|out: &mut u32| {
                *out = 3;
                ExecutionResult::Succeeded
            }),
            0,
            &handle,
            queue_size,
        )
        .unwrap()
    };
    let first = read("First", 1);
    let second = read("Second", 1);
    let off = read("Off", 1);
    off.disable();

    let slot = ResultSlot::new();
    assert_eq!(first.execute(&slot), ExecutionResult::Queued);
    assert_eq!(
        first.execute_with_notifier(None, &notifier),
        ExecutionResult::ArgumentQueueFull
    );
    assert_eq!(
        second.execute_with_notifier(None, &notifier),
        ExecutionResult::MailboxFull
    );
    assert_eq!(
        off.execute_with_notifier(None, &notifier),
        ExecutionResult::Disabled
    );

    assert_eq!(mailbox.execute_all().executed, 1);
    assert_eq!(slot.take(), Some(3));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_argument_queue_full_and_release() {
    let mut mailbox = Mailbox::new("owner", 16).unwrap();
    let total = Arc::new(Mutex::new(0i32));
    let sum = Arc::clone(&total);
    let add = QueuedWrite::new(
        "Add",
        callable::write(move |x: &i32| {
            *sum.lock() += x;
            ExecutionResult::Succeeded
        }),
        &mailbox.handle(),
        2,
    )
    .unwrap();

    assert_eq!(add.execute(&1), ExecutionResult::Queued);
    assert_eq!(add.execute(&2), ExecutionResult::Queued);
    assert_eq!(add.execute(&3), ExecutionResult::ArgumentQueueFull);
    assert_eq!(add.pending(), 2);
    assert_eq!(mailbox.len(), 2);

    assert_eq!(mailbox.execute_next(), ExecutionResult::Succeeded);
    assert_eq!(add.pending(), 1);
    assert_eq!(add.execute(&4), ExecutionResult::Queued);

    mailbox.execute_all();
    assert_eq!(*total.lock(), 7);
}

#[test]
fn test_dropped_mailbox_releases_pending_invocations() {
    let mailbox = Mailbox::new("owner", 4).unwrap();
    let marker = Arc::new(());
    let held = Arc::clone(&marker);
    let step = QueuedVoid::new(
        "Step",
        callable::void(move || {
            let _keep = &held;
            ExecutionResult::Succeeded
        }),
        &mailbox.handle(),
        2,
    )
    .unwrap();
    let other = Mailbox::new("other", 4).unwrap();
    let rebound = step.clone_for(&other.handle(), 2).unwrap();

    assert!(rebound.execute().is_ok());
    assert_eq!(rebound.pending(), 1);

    drop(other);
    // The rebound command still holds the mailbox, so the invocation is alive
    assert_eq!(rebound.pending(), 1);
    drop(rebound);
    drop(step);
    drop(mailbox);

    assert_eq!(Arc::strong_count(&marker), 1);
}

#[test]
fn test_dropped_mailbox_fails_pending_slot() {
    let mailbox = Mailbox::new("owner", 4).unwrap();
    let read = QueuedRead::new(
        "Read",
        callable::read(|out: &mut u8| {
            *out = 1;
            ExecutionResult::Succeeded
        }),
        0,
        &mailbox.handle(),
        2,
    )
    .unwrap();

    let slot = ResultSlot::new();
    assert!(read.execute(&slot).is_ok());
    assert!(slot.is_pending());

    drop(read);
    drop(mailbox);
    assert_eq!(slot.status(), SlotStatus::Failed(ExecutionResult::Undefined));
    assert_eq!(slot.take(), None);
}

#[test]
fn test_disabled_command() {
    let mut mailbox = Mailbox::new("owner", 4).unwrap();
    let step = QueuedVoid::new(
        "Step",
        callable::void(|| ExecutionResult::Succeeded),
        &mailbox.handle(),
        2,
    )
    .unwrap();
    let alias = step.clone();

    step.disable();
    assert!(!alias.is_enabled());
    assert_eq!(alias.execute(), ExecutionResult::Disabled);
    assert!(mailbox.is_empty());

    // Already queued calls still run
    step.enable();
    assert!(step.execute().is_ok());
    step.disable();
    assert_eq!(mailbox.execute_next(), ExecutionResult::Succeeded);
}

#[test]
fn test_clone_for_binds_another_mailbox() {
    let mut device = Mailbox::new("device", 4).unwrap();
    let mut backup = Mailbox::new("backup", 4).unwrap();
    let runs = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&runs);

    let step = QueuedVoid::new(
        "Step",
        callable::void(move || {
            seen.fetch_add(1, Ordering::SeqCst);
            ExecutionResult::Succeeded
        }),
        &device.handle(),
        1,
    )
    .unwrap();
    let rebound = step.clone_for(&backup.handle(), 3).unwrap();

    assert_eq!(rebound.mailbox_name(), "backup");
    assert_eq!(rebound.argument_queue_size(), 3);
    assert!(step.execute().is_ok());
    assert!(rebound.execute().is_ok());
    assert!(rebound.execute().is_ok());

    assert_eq!(device.execute_all().executed, 1);
    assert_eq!(backup.execute_all().executed, 2);
    assert_eq!(runs.load(Ordering::SeqCst), 3);

    assert!(step.clone_for(&backup.handle(), 0).is_err());
}

#[test]
fn test_forwarded_completion_reaches_caller_mailbox() {
    let mut device = Mailbox::new("device", 4).unwrap();
    let mut controller = Mailbox::new("controller", 4).unwrap();

    let position = QueuedRead::new(
        "GetPosition",
        callable::read(|out: &mut f64| {
            *out = 1.5;
            ExecutionResult::Succeeded
        }),
        0.0,
        &device.handle(),
        2,
    )
    .unwrap();

    let latest = Arc::new(Mutex::new(None));
    let store = Arc::clone(&latest);
    let on_position = QueuedWrite::new(
        "OnPosition",
        callable::write(move |completion: &Completion<f64>| {
            *store.lock() = completion.value;
            ExecutionResult::Succeeded
        }),
        &controller.handle(),
        4,
    )
    .unwrap();
    let notifier = Notifier::forward_to(on_position);

    assert!(position.execute_with_notifier(None, &notifier).is_ok());
    assert_eq!(device.execute_next(), ExecutionResult::Succeeded);

    // Delivered to the controller's mailbox, not run yet
    assert_eq!(*latest.lock(), None);
    assert_eq!(controller.len(), 1);

    assert_eq!(controller.execute_next(), ExecutionResult::Succeeded);
    assert_eq!(*latest.lock(), Some(1.5));
}

#[test]
fn test_execute_dynamic_checks_types() {
    let mut mailbox = Mailbox::new("owner", 8).unwrap();
    let handle = mailbox.handle();

    let square = QueuedWriteReturn::new(
        "Square",
        callable::write_return(|x: &i32, out: &mut i32| {
            *out = x * x;
            ExecutionResult::Succeeded
        }),
        0,
        &handle,
        4,
    )
    .unwrap();
    let commands: Vec<Box<dyn Command>> = vec![
        Box::new(square),
        Box::new(QueuedVoid::new("Noop", callable::void(|| ExecutionResult::Succeeded), &handle, 4).unwrap()),
    ];

    let slot = ResultSlot::<i32>::new();
    let wrong_slot = ResultSlot::<u8>::new();
    let argument: &dyn Any = &7i32;

    let square = &commands[0];
    assert_eq!(square.execute_dynamic(None, Some(&slot)), ExecutionResult::InvalidInput);
    assert_eq!(square.execute_dynamic(Some(&"7"), Some(&slot)), ExecutionResult::InvalidInput);
    assert_eq!(
        square.execute_dynamic(Some(argument), Some(&wrong_slot)),
        ExecutionResult::InvalidInput
    );
    assert!(mailbox.is_empty());

    assert_eq!(square.execute_dynamic(Some(argument), Some(&slot)), ExecutionResult::Queued);
    assert_eq!(commands[1].execute_dynamic(None, None), ExecutionResult::Queued);

    mailbox.execute_all();
    assert_eq!(slot.take(), Some(49));
}

#[test]
fn test_command_description() {
    let mailbox = Mailbox::from_config(&MailboxConfig::new("device").with_capacity(4)).unwrap();
    let set_target = QueuedWrite::new(
        "SetTarget",
        callable::write(|_: &f64| ExecutionResult::Succeeded),
        &mailbox.handle(),
        4,
    )
    .unwrap();

    assert_eq!(set_target.name(), "SetTarget");
    assert_eq!(set_target.class_name(), "QueuedWrite");
    assert_eq!(set_target.shape(), CallableShape::Write);
    assert_eq!(set_target.to_string(), "QueuedWrite(SetTarget) on device");

    set_target.disable();
    assert_eq!(set_target.to_string(), "QueuedWrite(SetTarget) on device [disabled]");
}

#[test]
fn test_mixed_variants_keep_fifo_order() {
    let mut mailbox = Mailbox::new("owner", 8).unwrap();
    let handle = mailbox.handle();
    let log: RunLog = Arc::new(Mutex::new(Vec::new()));

    let void_log = Arc::clone(&log);
    let void_cmd = QueuedVoid::new(
        "Void",
        callable::void(move || {
            void_log.lock().push("void".into());
            ExecutionResult::Succeeded
        }),
        &handle,
        4,
    )
    .unwrap();
    let write_log = Arc::clone(&log);
    let write_cmd = QueuedWrite::new(
        "Write",
        callable::write(move |s: &String| {
            write_log.lock().push(s.clone());
            ExecutionResult::Succeeded
        }),
        &handle,
        4,
    )
    .unwrap();

    let self_log = Arc::clone(&log);
    assert!(write_cmd.execute(&"first".to_string()).is_ok());
    assert!(void_cmd.execute().is_ok());
    assert!(mailbox
        .enqueue(PendingInvocation::from_fn("Adhoc", move || {
            self_log.lock().push("adhoc".into());
            ExecutionResult::Succeeded
        }))
        .is_ok());
    assert!(write_cmd.execute_owned("last".to_string()).is_ok());

    mailbox.execute_all();
    assert_eq!(*log.lock(), vec!["first", "void", "adhoc", "last"]);
}
