//! Example: Offloading blocking work to a thread pool

use concurrent::{Task, TaskScheduler, ThreadPool, Timer, await_on};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let scheduler = TaskScheduler::new();
    let pool = ThreadPool::builder()
        .size(2)
        .bootstrap(|_| println!("worker {:?} ready", thread::current().name()))
        .build()?;

    let job = pool.submit(|| {
        thread::sleep(Duration::from_millis(50));
        Ok("Hello")
    })?;

    println!("submitted, settled = {}", job.is_settled());

    let task = Task::new(async move {
        Timer::from_millis(10).await_timeout().await?;
        let greeting = await_on(job).await?;
        Ok(format!("{greeting}, world"))
    });

    scheduler.start(&task)?;
    println!("{}", scheduler.block_on(task)?);

    pool.close();
    Ok(())
}
