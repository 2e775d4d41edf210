//! Example: Running tasks on a cooperative scheduler

use concurrent::{Task, TaskScheduler, await_on, yield_now};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), concurrent::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let scheduler = TaskScheduler::new();

    let sum = Task::new(async { Ok(2 + 3) });

    let chatty = Task::new(async {
        for step in 1..=3 {
            println!("chatty: step {step}");
            yield_now().await;
        }
        Ok(())
    });

    let doubled = {
        let sum = sum.clone();
        Task::new(async move { Ok(await_on(sum).await? * 2) })
    };

    scheduler.start(&sum)?;
    scheduler.start(&chatty)?;
    scheduler.start(&doubled)?;
    scheduler.run()?;

    println!("sum = {:?}", sum.outcome());
    println!("doubled = {:?}", doubled.outcome());
    Ok(())
}
