//! In-memory [`MessageQueue`] for tests that exercise producers/consumers
//! without a live broker.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

use crate::transport::{MessageQueue, RawMessage, Result};

#[derive(Default)]
pub struct InMemoryMessageQueue {
    queues: DashMap<String, Mutex<VecDeque<RawMessage>>>,
}

impl InMemoryMessageQueue {
    /// Number of messages currently sitting in `queue`, for test assertions.
    #[must_use]
    pub fn len(&self, queue: &str) -> usize {
        self.queues
            .get(queue)
            .map_or(0, |q| q.lock().unwrap_or_else(|e| e.into_inner()).len())
    }

    #[must_use]
    pub fn is_empty(&self, queue: &str) -> bool {
        self.len(queue) == 0
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn send(&self, queue: &str, body: Value) -> Result<()> {
        let entry = self
            .queues
            .entry(queue.to_string())
            .or_insert_with(|| Mutex::new(VecDeque::new()));
        entry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(RawMessage {
                receipt_handle: Uuid::new_v4().to_string(),
                body,
            });
        Ok(())
    }

    async fn receive(&self, queue: &str, max_messages: i32) -> Result<Vec<RawMessage>> {
        let Some(entry) = self.queues.get(queue) else {
            return Ok(Vec::new());
        };
        let mut guard = entry.lock().unwrap_or_else(|e| e.into_inner());
        let take = (max_messages.max(0) as usize).min(guard.len());
        Ok(guard.drain(..take).collect())
    }

    async fn delete(&self, _queue: &str, _receipt_handle: &str) -> Result<()> {
        // The fake hands out messages on receive and never redelivers them,
        // so there is nothing left to remove.
        Ok(())
    }

    async fn dead_letter(&self, dlq: &str, message: RawMessage) -> Result<()> {
        self.send(dlq, message.body).await
    }
}
