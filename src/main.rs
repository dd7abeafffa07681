/*!
 * Canvas Primitives - Demo Entry Point
 *
 * Exercises the primitives end to end:
 * - Producer/consumer hand-off over a concurrent circular buffer
 * - Time-boxed leases from an expiring semaphore
 */

use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use canvas_primitives::monitoring::span_operation;
use canvas_primitives::{
    init_tracing, CancellationSource, ConcurrentCircularBuffer, ExpiringSemaphore, Guard,
    SemaphoreConfig, Trigger,
};

const ITEMS: u64 = 10_000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    info!("Canvas primitives demo starting...");
    run_buffer_handoff()?;
    run_leases().await?;
    info!("Demo complete");

    Ok(())
}

/// One producer thread, one consumer thread, strict FIFO hand-off
fn run_buffer_handoff() -> Result<(), Box<dyn Error>> {
    let op = span_operation("buffer_handoff");
    let buffer = Arc::new(ConcurrentCircularBuffer::<u64>::with_capacity(16));
    let done = Arc::new(Trigger::new(false));

    let producer = {
        let buffer = buffer.clone();
        let done = done.clone();
        thread::spawn(move || {
            for i in 0..ITEMS {
                buffer.enqueue(i);
            }
            done.prime();
        })
    };

    let consumer = {
        let buffer = buffer.clone();
        thread::spawn(move || (0..ITEMS).all(|expected| buffer.dequeue() == expected))
    };

    producer.join().map_err(|_| "producer panicked")?;
    let in_order = consumer.join().map_err(|_| "consumer panicked")?;

    op.record_items_processed(ITEMS as usize);
    op.record_result(in_order);
    info!(
        items = ITEMS,
        in_order,
        producer_finished = done.try_fire(),
        final_capacity = buffer.capacity(),
        "buffer hand-off finished"
    );
    Ok(())
}

/// Lease every permit, let one expire, release one early, then dispose
async fn run_leases() -> Result<(), Box<dyn Error>> {
    let op = span_operation("expiring_leases");
    let semaphore = ExpiringSemaphore::from_config(&SemaphoreConfig::full(
        2,
        Duration::from_millis(200),
    ))?;
    let source = CancellationSource::new();
    let token = source.token();

    let first = semaphore.acquire(&token).await?;
    let mut second = semaphore.acquire(&token).await?;
    info!(
        available = semaphore.available_permits(),
        outstanding = semaphore.outstanding_permits(),
        "all permits leased"
    );

    second.release()?;
    let _third = semaphore.acquire(&token).await?;

    // first lease is never released explicitly
    let _fourth = semaphore.acquire(&token).await?;
    info!(first_returned = first.is_returned(), "lease expired on its own");

    let waiter = semaphore.acquire(&token);
    source.cancel();
    if let Err(err) = waiter.await {
        warn!(%err, "pending acquire aborted");
        op.record_error(&err.to_string());
    }

    semaphore.dispose();
    info!(elapsed = ?op.elapsed(), disposed = semaphore.is_disposed(), "leases finished");
    Ok(())
}
