use concurrent::{Awaitable, Error, Outcome, Task, TaskScheduler, TaskState, await_on};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, PartialEq)]
struct ValueError(&'static str);

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value: {}", self.0)
    }
}

impl std::error::Error for ValueError {}

fn recorder<T: Send + 'static>() -> (
    Arc<Mutex<Vec<(usize, Outcome<T>)>>>,
    impl Fn(usize) -> Box<dyn FnOnce(Outcome<T>) + Send>,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let make = move |id: usize| -> Box<dyn FnOnce(Outcome<T>) + Send> {
        let sink = sink.clone();
        Box::new(move |outcome| sink.lock().unwrap().push((id, outcome)))
    };

    (seen, make)
}

#[test]
fn test_continuations_run_once_in_registration_order() {
    let scheduler = TaskScheduler::new();
    let task = Task::new(async { Ok(5) });
    let (seen, make) = recorder::<i32>();

    task.continue_with(make(1));
    task.continue_with(make(2));

    scheduler.start(&task).unwrap();
    scheduler.run().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, 1);
    assert_eq!(seen[1].0, 2);
    assert!(seen.iter().all(|(_, outcome)| matches!(outcome, Ok(5))));
}

#[test]
fn test_continuation_on_settled_task_runs_immediately() {
    let scheduler = TaskScheduler::new();
    let task = Task::new(async { Ok("value") });

    scheduler.start(&task).unwrap();
    scheduler.run().unwrap();

    let (seen, make) = recorder::<&str>();
    task.continue_with(make(3));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(matches!(seen[0], (3, Ok("value"))));
}

#[test]
fn test_failure_reaches_every_continuation() {
    let scheduler = TaskScheduler::new();
    let task = Task::new(async { Err::<(), _>(Error::failed(ValueError("x"))) });
    let (seen, make) = recorder::<()>();

    task.continue_with(make(1));
    task.continue_with(make(2));

    scheduler.start(&task).unwrap();
    scheduler.run().unwrap();

    assert_eq!(task.state(), TaskState::Failed);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);

    for (_, outcome) in seen.iter() {
        let error = outcome.as_ref().unwrap_err();
        assert_eq!(error.downcast_ref::<ValueError>(), Some(&ValueError("x")));
    }
}

#[test]
fn test_error_propagates_through_await() {
    let scheduler = TaskScheduler::new();

    let task = Task::new(async {
        let inner = Task::spawn(async { Err::<u32, _>(Error::failed(ValueError("inner"))) })?;
        let value = await_on(inner).await?;
        Ok(value + 1)
    });

    scheduler.start(&task).unwrap();
    scheduler.run().unwrap();

    let error = task.outcome().unwrap().unwrap_err();
    assert_eq!(error.downcast_ref::<ValueError>(), Some(&ValueError("inner")));
}

#[test]
fn test_panicking_body_fails_task() {
    let scheduler = TaskScheduler::new();
    let task = Task::new(async {
        if true {
            panic!("boom");
        }
        Ok(())
    });

    scheduler.start(&task).unwrap();
    scheduler.run().unwrap();

    assert_eq!(task.state(), TaskState::Failed);
    assert!(matches!(
        task.outcome(),
        Some(Err(Error::Panicked(message))) if message == "boom"
    ));
}

#[test]
fn test_unobserved_failure_reaches_hook() {
    let reported = Arc::new(AtomicUsize::new(0));
    let counter = reported.clone();

    let scheduler = TaskScheduler::builder()
        .error_hook(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    {
        let task = Task::new(async { Err::<(), _>(Error::failed("lost")) });
        scheduler.start(&task).unwrap();
    }

    scheduler.run().unwrap();

    assert_eq!(reported.load(Ordering::SeqCst), 1);
}

#[test]
fn test_observed_failure_skips_hook() {
    let reported = Arc::new(AtomicUsize::new(0));
    let counter = reported.clone();

    let scheduler = TaskScheduler::builder()
        .error_hook(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    let task = Task::new(async { Err::<(), _>(Error::failed("seen")) });
    task.continue_with(Box::new(|_| {}));

    scheduler.start(&task).unwrap();
    scheduler.run().unwrap();
    drop(task);

    assert_eq!(reported.load(Ordering::SeqCst), 0);
}

#[test]
fn test_panicking_continuation_does_not_starve_others() {
    let scheduler = TaskScheduler::new();
    let task = Task::new(async { Ok(4) });
    let (seen, make) = recorder::<i32>();

    task.continue_with(Box::new(|_| panic!("observer failed")));
    task.continue_with(make(2));
    scheduler.start(&task).unwrap();

    let result = panic::catch_unwind(AssertUnwindSafe(|| scheduler.run()));

    assert!(result.is_err());
    assert_eq!(task.state(), TaskState::Completed);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, 2);
    assert!(matches!(seen[0].1, Ok(4)));
}

#[test]
fn test_duplicate_start_is_rejected() {
    let scheduler = TaskScheduler::new();
    let task = Task::new(async { Ok(1) });
    let handle = task.clone();

    scheduler.start(&task).unwrap();

    assert!(matches!(scheduler.start(&handle), Err(Error::DuplicateStart)));

    scheduler.run().unwrap();
    assert!(handle.is_terminal());
}
