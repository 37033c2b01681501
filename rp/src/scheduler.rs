//! Batch scheduler loop
//!
//! Drains the queue into randomly sized batches, executes each batch
//! concurrently, and pauses a randomized interval between batches. The
//! irregular sizing and spacing keep the outbound cadence from forming a
//! fingerprintable rhythm.

use std::time::Duration;

use futures::future::join_all;
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;
use crate::queue::{Dequeued, OperationReceiver};

/// Draw the next batch-size target
fn draw_batch_size(config: &Config) -> usize {
    rand::rng().random_range(config.batch_size_min..=config.batch_size_max)
}

/// Draw the next inter-batch pause
fn draw_batch_delay(config: &Config) -> Duration {
    Duration::from_millis(rand::rng().random_range(config.batch_delay_min_ms..=config.batch_delay_max_ms))
}

/// Spawn the scheduler loop onto the current runtime
pub(crate) fn spawn(receiver: OperationReceiver, config: Config) -> JoinHandle<()> {
    tokio::spawn(run(receiver, config))
}

/// The loop: Collecting -> Executing -> Sleeping -> Collecting ...
///
/// Exits when the queue closes or the task is aborted; operations already
/// dispatched into a batch run to completion either way.
async fn run(mut receiver: OperationReceiver, config: Config) {
    info!("scheduler started");
    let mut target = draw_batch_size(&config);

    loop {
        let mut batch: Vec<JoinHandle<()>> = Vec::with_capacity(target);
        let mut closed = false;

        while batch.len() < target {
            match receiver.dequeue(config.dequeue_timeout()).await {
                Dequeued::Item(op) => {
                    debug!(url = op.url(), "operation added to batch");
                    batch.push(tokio::spawn(op.run()));
                }
                Dequeued::Empty => break,
                Dequeued::Closed => {
                    closed = true;
                    break;
                }
            }
        }

        if batch.is_empty() {
            if closed {
                break;
            }
            // Nothing collected: re-poll immediately, no pause
            continue;
        }

        debug!(size = batch.len(), target, "executing batch");
        // Individual task failures surface through their own brokers and
        // never abort siblings
        let _ = join_all(batch).await;

        if closed {
            break;
        }

        target = draw_batch_size(&config);
        let delay = draw_batch_delay(&config);
        info!(delay_ms = delay.as_millis() as u64, "batch complete; pausing");
        tokio::time::sleep(delay).await;
    }

    info!("scheduler stopped");
}
