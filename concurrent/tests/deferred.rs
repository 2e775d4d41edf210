use concurrent::{Awaitable, Deferred, Error, Task, TaskScheduler, await_on};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[test]
fn test_deferred_resolved_from_another_thread() {
    let scheduler = TaskScheduler::new();
    let deferred = Deferred::<u32>::new();
    let producer = deferred.clone();

    let task = Task::new(async move { Ok(2 * await_on(deferred).await?) });
    scheduler.start(&task).unwrap();

    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        producer.resolve(321)
    });

    assert_eq!(scheduler.block_on(task).unwrap(), 642);
    assert!(handle.join().unwrap());
}

#[test]
fn test_first_settlement_wins() {
    let deferred = Deferred::new();

    assert!(deferred.resolve("first"));
    assert!(!deferred.resolve("second"));
    assert!(!deferred.fail(Error::TimedOut));
    assert!(deferred.is_settled());

    let scheduler = TaskScheduler::new();
    assert_eq!(scheduler.block_on(deferred).unwrap(), "first");
}

#[test]
fn test_failed_deferred_delivers_error_to_all() {
    let deferred = Deferred::<()>::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for _ in 0..2 {
        let seen = seen.clone();
        deferred.continue_with(Box::new(move |outcome| seen.lock().unwrap().push(outcome)));
    }

    deferred.fail(Error::failed("nope"));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|outcome| outcome.is_err()));
}

#[test]
fn test_continuation_registered_during_delivery_runs_last() {
    let deferred = Deferred::<u32>::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    {
        let order = order.clone();
        let again = deferred.clone();
        deferred.continue_with(Box::new(move |_| {
            order.lock().unwrap().push(1);
            let order = order.clone();
            again.continue_with(Box::new(move |_| order.lock().unwrap().push(3)));
        }));
    }
    {
        let order = order.clone();
        deferred.continue_with(Box::new(move |_| order.lock().unwrap().push(2)));
    }

    assert!(deferred.resolve(0));
    assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_panicking_continuation_does_not_starve_others() {
    let deferred = Deferred::<u32>::new();
    let seen = Arc::new(Mutex::new(None));

    deferred.continue_with(Box::new(|_| panic!("first observer failed")));
    {
        let seen = seen.clone();
        deferred.continue_with(Box::new(move |outcome| *seen.lock().unwrap() = Some(outcome)));
    }

    let result = panic::catch_unwind(AssertUnwindSafe(|| deferred.resolve(9)));

    assert!(result.is_err());
    assert!(deferred.is_settled());
    assert!(matches!(*seen.lock().unwrap(), Some(Ok(9))));
}

#[test]
fn test_unobserved_deferred_failure_reaches_hook() {
    let reported = Arc::new(Mutex::new(Vec::new()));
    let sink = reported.clone();

    let deferred = Deferred::<u8>::with_hook(Arc::new(move |error: &Error| {
        sink.lock().unwrap().push(error.to_string());
    }));

    deferred.fail(Error::TimedOut);
    drop(deferred);

    assert_eq!(*reported.lock().unwrap(), vec!["operation timed out".to_string()]);
}
