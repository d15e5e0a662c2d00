//! In-process broker that keeps every message in memory.
//!
//! Used by `cinefeed ingest --dry-run` and by the test suite.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Broker, Delivery};
use crate::error::{Error, Result};

#[derive(Default)]
pub struct MemoryBroker {
    topics: Mutex<HashMap<String, Vec<String>>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every payload sent to `topic`, in acknowledgment order.
    pub fn messages(&self, topic: &str) -> Vec<String> {
        self.topics.lock().get(topic).cloned().unwrap_or_default()
    }

    /// Make every subsequent send to `topic` fail.
    pub fn fail_topic(&self, topic: &str) {
        self.failing.lock().insert(topic.to_string());
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn send(&self, topic: &str, payload: String) -> Result<Delivery> {
        if self.failing.lock().contains(topic) {
            return Err(Error::publish(topic, "topic unavailable"));
        }

        let mut topics = self.topics.lock();
        let messages = topics.entry(topic.to_string()).or_default();
        messages.push(payload);

        Ok(Delivery {
            partition: 0,
            offset: (messages.len() - 1) as i64,
        })
    }
}
