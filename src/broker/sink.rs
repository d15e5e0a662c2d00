//! Fire-and-forget publishing.
//!
//! [`PublishSink::publish`] returns as soon as the send task is spawned. The
//! acknowledgment is observed only by that task, which logs the delivered
//! `(topic, partition, offset)` or the failure. Failures are never retried.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::Broker;

#[derive(Clone)]
pub struct PublishSink {
    broker: Arc<dyn Broker>,
    tracker: TaskTracker,
}

impl PublishSink {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self {
            broker,
            tracker: TaskTracker::new(),
        }
    }

    /// Hand `payload` to the broker for `topic` without waiting for the
    /// acknowledgment.
    pub fn publish(&self, topic: &str, payload: String) {
        let broker = Arc::clone(&self.broker);
        let topic = topic.to_string();

        self.tracker.spawn(async move {
            let bytes = payload.len();
            debug!(topic = %topic, bytes, broker = broker.name(), "Sending message");

            match broker.send(&topic, payload).await {
                Ok(delivery) => {
                    info!(
                        topic = %topic,
                        partition = delivery.partition,
                        offset = delivery.offset,
                        bytes,
                        "Published message"
                    );
                }
                Err(e) => {
                    warn!(topic = %topic, bytes, error = %e, "Unable to publish message");
                }
            }
        });
    }

    /// Number of sends still waiting for an acknowledgment.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every send spawned so far has been acknowledged or failed.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
