use std::sync::Arc;
use std::time::Duration;

use gate_common::UsageEvent;
use gate_storage::Storage;
use tokio::sync::{Mutex, mpsc};
use tracing::warn;

/// The Usage Recorder: hands completed-request usage off to
/// a bounded worker pool so recording never blocks the response path. If
/// the queue is full, it records inline instead of dropping the event,
/// bounded by `inline_timeout` so a slow storage backend can't stall the
/// request that triggered the overflow.
pub struct UsageRecorder {
    storage: Arc<dyn Storage>,
    tx: mpsc::Sender<UsageEvent>,
}

impl UsageRecorder {
    pub fn spawn(storage: Arc<dyn Storage>, queue_capacity: usize, workers: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let rx = Arc::new(Mutex::new(rx));
        for _ in 0..workers.max(1) {
            let storage = storage.clone();
            let rx = rx.clone();
            tokio::spawn(async move {
                loop {
                    let event = rx.lock().await.recv().await;
                    match event {
                        Some(event) => {
                            if let Err(err) = storage.record_usage(&event).await {
                                warn!(event = "usage_record_failed", error = %err);
                            }
                        }
                        None => break,
                    }
                }
            });
        }
        Self { storage, tx }
    }

    pub async fn record(&self, event: UsageEvent, inline_timeout: Duration) {
        if let Err(mpsc::error::TrySendError::Full(event)) = self.tx.try_send(event) {
            let fallback = tokio::time::timeout(inline_timeout, self.storage.record_usage(&event)).await;
            match fallback {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(event = "usage_record_failed", error = %err),
                Err(_) => warn!(event = "usage_record_timed_out"),
            }
        }
    }
}
