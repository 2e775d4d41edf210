use concurrent::{
    Awaitable, Deferred, Error, Task, TaskScheduler, TaskState, Timer, await_on, timeout,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[test]
fn test_timer_resumes_task_after_duration() {
    let scheduler = TaskScheduler::new();
    let task = Task::new(async {
        Timer::from_millis(100).await_timeout().await?;
        Ok("done")
    });

    let start = Instant::now();
    scheduler.start(&task).unwrap();
    scheduler.run().unwrap();

    assert!(
        start.elapsed() >= Duration::from_millis(100),
        "run should wait for the timer"
    );
    assert_eq!(task.state(), TaskState::Completed);
    assert_eq!(task.outcome().unwrap().unwrap(), "done");
}

#[test]
fn test_timers_fire_in_deadline_order() {
    let scheduler = TaskScheduler::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    for (label, millis) in [("long", 60), ("short", 20)] {
        let order = order.clone();
        let task = Task::new(async move {
            Timer::from_millis(millis).await_timeout().await?;
            order.borrow_mut().push(label);
            Ok(())
        });
        scheduler.start(&task).unwrap();
    }

    scheduler.run().unwrap();

    assert_eq!(*order.borrow(), vec!["short", "long"]);
}

#[test]
fn test_equal_deadlines_fire_in_registration_order() {
    let scheduler = TaskScheduler::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    for label in ["a", "b", "c"] {
        let order = order.clone();
        let task = Task::new(async move {
            Timer::from_millis(30).await_timeout().await?;
            order.borrow_mut().push(label);
            Ok(())
        });
        scheduler.start(&task).unwrap();
    }

    scheduler.run().unwrap();

    assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
}

#[test]
fn test_shared_timer_wakes_every_waiter() {
    let scheduler = TaskScheduler::new();
    let timer = Timer::from_millis(20);
    let woken = Rc::new(RefCell::new(0));

    for _ in 0..2 {
        let timer = timer.clone();
        let woken = woken.clone();
        let task = Task::new(async move {
            timer.await_timeout().await?;
            *woken.borrow_mut() += 1;
            Ok(())
        });
        scheduler.start(&task).unwrap();
    }

    scheduler.run().unwrap();

    assert_eq!(*woken.borrow(), 2);
    assert!(timer.is_settled());
}

#[test]
fn test_zero_duration_timer_fires_on_next_pass() {
    let scheduler = TaskScheduler::new();
    let task = Task::new(async {
        Timer::new(Duration::ZERO).await_timeout().await?;
        Ok(())
    });

    let start = Instant::now();
    scheduler.start(&task).unwrap();
    scheduler.run().unwrap();

    assert_eq!(task.state(), TaskState::Completed);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_cancelled_timer_disposes_waiters() {
    let scheduler = TaskScheduler::new();
    let timer = Timer::from_millis(10_000);

    let waiter = {
        let timer = timer.clone();
        Task::new(async move { timer.await_timeout().await })
    };

    let canceller = Task::new(async move {
        timer.cancel();
        Ok(())
    });

    let start = Instant::now();
    scheduler.start(&waiter).unwrap();
    scheduler.start(&canceller).unwrap();
    scheduler.run().unwrap();

    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(matches!(waiter.outcome(), Some(Err(Error::Disposed))));
}

#[test]
fn test_timer_without_scheduler_is_misuse() {
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();

    Timer::from_millis(1).continue_with(Box::new(move |outcome| {
        *sink.lock().unwrap() = Some(outcome);
    }));

    assert!(matches!(
        *seen.lock().unwrap(),
        Some(Err(Error::Misuse(_)))
    ));
}

#[test]
fn test_timeout_without_scheduler_delivers_misuse() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();

    timeout(Duration::from_millis(1), Deferred::<u32>::new()).continue_with(Box::new(
        move |outcome| {
            sink.lock().unwrap().push(outcome);
        },
    ));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert!(matches!(calls[0], Err(Error::Misuse(_))));
}

#[test]
fn test_timeout_expires_before_awaitable() {
    let scheduler = TaskScheduler::new();
    let deferred = Deferred::<u32>::new();

    let task = {
        let deferred = deferred.clone();
        Task::new(async move { await_on(timeout(Duration::from_millis(30), deferred)).await })
    };

    scheduler.start(&task).unwrap();
    scheduler.run().unwrap();

    assert!(matches!(task.outcome(), Some(Err(Error::TimedOut))));

    // A late result is discarded.
    assert!(deferred.resolve(1));
    assert!(matches!(task.outcome(), Some(Err(Error::TimedOut))));
}

#[test]
fn test_timeout_yields_value_and_cancels_timer() {
    let scheduler = TaskScheduler::new();

    let task = Task::new(async {
        let child = Task::spawn(async { Ok(7) })?;
        await_on(timeout(Duration::from_secs(10), child)).await
    });

    let start = Instant::now();
    scheduler.start(&task).unwrap();
    scheduler.run().unwrap();

    assert_eq!(task.outcome().unwrap().unwrap(), 7);
    assert!(
        start.elapsed() < Duration::from_secs(5),
        "a cancelled timer should not keep run waiting"
    );
}

#[concurrent::test]
async fn test_sleep_in_macro_task() {
    let start = Instant::now();
    Timer::from_millis(30).await_timeout().await?;

    assert!(start.elapsed() >= Duration::from_millis(30));
}
