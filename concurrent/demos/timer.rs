//! Example: Using timers and timeouts

use concurrent::{Deferred, Error, Timer, await_on, timeout};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[concurrent::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let start = Instant::now();

    println!("Waiting for 1 second...");
    Timer::new(Duration::from_secs(1)).await_timeout().await?;
    println!("Done after {:?}", start.elapsed());

    let never = Deferred::<u32>::new();
    match await_on(timeout(Duration::from_millis(200), never)).await {
        Err(Error::TimedOut) => println!("Gave up after 200ms"),
        other => println!("Unexpected: {other:?}"),
    }
}
