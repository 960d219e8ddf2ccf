//! Per-quiz broadcast topics.
//!
//! Every lobby and lifecycle mutation publishes here. Publishing is
//! fire-and-forget: a send never blocks the mutation that produced it, and a
//! topic with no live subscribers is not an error. Delivery is FIFO per
//! subscriber within one quiz's topic; a receiver that lags past the channel
//! capacity skips ahead and must re-query authoritative state.

use crate::protocol::ServerMessage;
use crate::types::QuizId;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

pub const DEFAULT_TOPIC_CAPACITY: usize = 100;

/// Concurrent multicast registry keyed by quiz id.
pub struct QuizTopics {
    topics: RwLock<HashMap<QuizId, broadcast::Sender<ServerMessage>>>,
    capacity: usize,
}

impl QuizTopics {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Subscribe to a quiz's topic, creating it on first use.
    pub async fn subscribe(&self, quiz_id: &str) -> broadcast::Receiver<ServerMessage> {
        if let Some(tx) = self.topics.read().await.get(quiz_id) {
            return tx.subscribe();
        }
        let mut topics = self.topics.write().await;
        topics
            .entry(quiz_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish an event to a quiz's topic. A disconnected subscriber is simply
    /// absent from the multicast, never an error for the publisher.
    pub async fn publish(&self, quiz_id: &str, msg: ServerMessage) {
        if let Some(tx) = self.topics.read().await.get(quiz_id) {
            let _ = tx.send(msg);
        }
    }

    /// Number of live subscribers on a quiz's topic.
    pub async fn subscriber_count(&self, quiz_id: &str) -> usize {
        self.topics
            .read()
            .await
            .get(quiz_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for QuizTopics {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_CAPACITY)
    }
}
