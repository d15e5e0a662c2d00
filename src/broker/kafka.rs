//! Kafka broker client.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use tracing::info;

use super::{Broker, Delivery};
use crate::config::BrokerConfig;
use crate::error::{Error, Result};

/// [`Broker`] backed by an rdkafka [`FutureProducer`].
///
/// Partitioning is left to librdkafka; messages carry no key.
pub struct KafkaBroker {
    producer: FutureProducer,
    queue_timeout: Duration,
}

impl KafkaBroker {
    pub fn new(config: &BrokerConfig) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("client.id", &config.client_id)
            .set("message.timeout.ms", config.message_timeout_ms.to_string())
            .create()
            .map_err(|e| Error::publish("*", format!("failed to create producer: {e}")))?;

        info!(
            brokers = %config.brokers,
            client_id = %config.client_id,
            "Kafka producer created"
        );

        Ok(Self {
            producer,
            queue_timeout: Duration::from_millis(config.message_timeout_ms),
        })
    }
}

#[async_trait]
impl Broker for KafkaBroker {
    fn name(&self) -> &'static str {
        "kafka"
    }

    async fn send(&self, topic: &str, payload: String) -> Result<Delivery> {
        let record = FutureRecord::<(), str>::to(topic).payload(payload.as_str());

        match self.producer.send(record, self.queue_timeout).await {
            Ok((partition, offset)) => Ok(Delivery { partition, offset }),
            Err((e, _)) => Err(Error::publish(topic, e.to_string())),
        }
    }
}
