use concurrent::{Context, ContextVar, Task, TaskScheduler, yield_now};

static REQUEST: ContextVar<u32> = ContextVar::new();

#[test]
fn test_task_captures_context_at_creation() {
    let scheduler = TaskScheduler::new();

    let task = Context::current()
        .with(&REQUEST, 7)
        .run(|| Task::new(async { Ok(REQUEST.get()) }));

    assert_eq!(REQUEST.get(), None);

    scheduler.start(&task).unwrap();
    scheduler.run().unwrap();

    assert_eq!(task.outcome().unwrap().unwrap(), Some(7));
}

#[test]
fn test_interleaved_tasks_keep_their_own_values() {
    let scheduler = TaskScheduler::new();
    let mut tasks = Vec::new();

    for id in [1, 2, 3] {
        let context = Context::current().with(&REQUEST, id);
        let task = Task::with_context(context, async {
            let before = REQUEST.get();
            yield_now().await;
            let after = REQUEST.get();
            Ok((before, after))
        });
        scheduler.start(&task).unwrap();
        tasks.push((id, task));
    }

    scheduler.run().unwrap();

    for (id, task) in tasks {
        assert_eq!(task.outcome().unwrap().unwrap(), (Some(id), Some(id)));
    }
}

#[test]
fn test_spawned_child_inherits_context() {
    let scheduler = TaskScheduler::new();
    let context = Context::background().with(&REQUEST, 11);

    let task = Task::with_context(context, async {
        let child = Task::spawn(async { Ok(REQUEST.get()) })?;
        concurrent::await_on(child).await
    });

    scheduler.start(&task).unwrap();
    scheduler.run().unwrap();

    assert_eq!(task.outcome().unwrap().unwrap(), Some(11));
}

#[test]
fn test_background_context_is_empty() {
    let scheduler = TaskScheduler::new();

    let task = Context::current().with(&REQUEST, 5).run(|| {
        Task::with_context(Context::background(), async { Ok(REQUEST.get()) })
    });

    scheduler.start(&task).unwrap();
    scheduler.run().unwrap();

    assert_eq!(task.outcome().unwrap().unwrap(), None);
}

#[test]
fn test_spawn_with_context_overrides_parent_values() {
    let scheduler = TaskScheduler::new();

    let parent = Context::current().with(&REQUEST, 1).run(|| {
        Task::new(async {
            let context = Context::background().with(&REQUEST, 13);
            let child = Task::spawn_with_context(context, async { Ok(REQUEST.get()) })?;
            let seen = concurrent::await_on(child).await?;
            Ok((REQUEST.get(), seen))
        })
    });

    scheduler.start(&parent).unwrap();
    scheduler.run().unwrap();

    assert_eq!(parent.outcome().unwrap().unwrap(), (Some(1), Some(13)));
}
