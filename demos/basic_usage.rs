//! Basic usage example for the multi timer

use multi_timer::{CancellationToken, Duration, Instant, MultiTimer, TimerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let cancel_token = CancellationToken::new();

    // Create the timer with room for 3 undelivered payloads
    let (timer, driver, mut deliveries) = MultiTimer::new(
        TimerConfig::with_capacity(3).name("example_timer"),
        cancel_token.clone(),
    )?;

    // Spawn the driver task
    let driver_task = tokio::spawn(driver.run());

    // Schedule out of order; delivery follows the deadlines
    timer.schedule_relative(Duration::from_secs(3), "long")?;
    timer.schedule_relative(Duration::from_secs(1), "short")?;
    timer.schedule_absolute(Instant::now() + Duration::from_secs(2), "medium")?;

    println!("Payloads scheduled! Waiting for delivery...");

    for _ in 0..3 {
        if let Some(payload) = deliveries.recv().await {
            println!("Delivered '{}'", payload);
        }
    }

    // Demonstrate stop
    timer.schedule_relative(Duration::from_secs(10), "never")?;
    println!("Scheduled a payload that will be discarded...");

    tokio::time::sleep(Duration::from_millis(100)).await;
    timer.stop();
    println!("Timer stopped with {} pending payload(s)", timer.pending());

    // Shutdown gracefully
    cancel_token.cancel();
    driver_task.await?;
    assert_eq!(deliveries.recv().await, None);

    println!("Timer shut down successfully!");
    Ok(())
}
