use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::config::SinkConfig;
use crate::metrics::{BATCH_FAILURES, EVENTS_SENT};
use crate::models::{BatchEvent, Event};

// Drains the sink queue and posts events in batches, on size or on the flush interval.
// Returns once the queue is closed and the last batch went out.
pub async fn batch_worker(mut rx: mpsc::Receiver<Event>, client: reqwest::Client, config: SinkConfig) {
    let url = config.batch_url();
    let batch_size = config.batch_size.max(1);
    info!(url = %url, batch_size, "batch worker started");

    let mut batch: Vec<Event> = Vec::with_capacity(batch_size);
    let mut flush = interval(config.flush_interval);
    flush.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(event) => {
                    batch.push(event);
                    if batch.len() >= batch_size {
                        send_batch(&client, &url, &config.api_key, &mut batch).await;
                    }
                }
                None => break,
            },
            _ = flush.tick() => {
                if !batch.is_empty() {
                    send_batch(&client, &url, &config.api_key, &mut batch).await;
                }
            }
        }
    }

    if !batch.is_empty() {
        send_batch(&client, &url, &config.api_key, &mut batch).await;
    }
    info!("batch worker stopped");
}

async fn send_batch(client: &reqwest::Client, url: &str, api_key: &str, batch: &mut Vec<Event>) {
    let count = batch.len() as u64;
    let result = {
        let body: Vec<BatchEvent<'_>> = batch.iter().map(BatchEvent::from).collect();
        client
            .post(url)
            .header("X-Honeycomb-Team", api_key)
            .json(&body)
            .send()
            .await
    };

    match result {
        Ok(res) if res.status().is_success() => {
            EVENTS_SENT.inc_by(count);
            debug!(events = count, "batch sent");
        }
        Ok(res) => {
            BATCH_FAILURES.inc();
            warn!(status = %res.status(), events = count, "collector rejected batch");
        }
        Err(e) => {
            BATCH_FAILURES.inc();
            error!(error = %e, events = count, "failed to send batch");
        }
    }

    batch.clear();
}
