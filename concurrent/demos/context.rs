//! Example: Task-local context variables

use concurrent::{Context, ContextVar, Task, TaskScheduler, yield_now};
use tracing_subscriber::EnvFilter;

static USER: ContextVar<&'static str> = ContextVar::new();

fn main() -> Result<(), concurrent::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let scheduler = TaskScheduler::new();

    for user in ["alice", "bob"] {
        let task = Context::current().with(&USER, user).run(|| {
            Task::new(async {
                println!("start: {:?}", USER.get());
                yield_now().await;
                println!("end: {:?}", USER.get());
                Ok(())
            })
        });
        scheduler.start(&task)?;
    }

    scheduler.run()
}
