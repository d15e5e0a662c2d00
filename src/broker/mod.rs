//! Message broker clients and the asynchronous publish sink.
//!
//! # Module layout
//!
//! - [`kafka`] -- [`KafkaBroker`], the production client backed by rdkafka.
//! - [`memory`] -- [`MemoryBroker`], an in-process broker for dry runs and tests.
//! - [`sink`] -- [`PublishSink`], the fire-and-forget front door used by the
//!   pipeline.

pub mod kafka;
pub mod memory;
pub mod sink;

use async_trait::async_trait;

use crate::error::Result;

pub use kafka::KafkaBroker;
pub use memory::MemoryBroker;
pub use sink::PublishSink;

/// Where a message ended up once the broker acknowledged it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

/// A broker that accepts string payloads on named topics.
///
/// Implementations are shared behind an `Arc` across every publishing task.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Short identifier used in logs (e.g. `"kafka"`).
    fn name(&self) -> &'static str;

    /// Send `payload` to `topic` and wait for the acknowledgment.
    async fn send(&self, topic: &str, payload: String) -> Result<Delivery>;
}
