//! SQS-backed [`MessageQueue`].

use async_trait::async_trait;
use aws_sdk_sqs::Client;
use dashmap::DashMap;
use gateway_error::GatewayError;
use serde_json::Value;

use crate::transport::{MessageQueue, RawMessage, Result};

pub struct SqsMessageQueue {
    client: Client,
    /// Queue name -> URL cache; SQS operations address queues by URL, but
    /// every channel in this crate is named, not URLed.
    queue_urls: DashMap<String, String>,
}

impl SqsMessageQueue {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            queue_urls: DashMap::new(),
        }
    }

    async fn queue_url(&self, queue: &str) -> Result<String> {
        if let Some(url) = self.queue_urls.get(queue) {
            return Ok(url.clone());
        }
        let output = self
            .client
            .get_queue_url()
            .queue_name(queue)
            .send()
            .await
            .map_err(|e| GatewayError::Internal(format!("resolving queue '{queue}': {e}")))?;
        let url = output
            .queue_url
            .ok_or_else(|| GatewayError::Internal(format!("queue '{queue}' has no URL")))?;
        self.queue_urls.insert(queue.to_string(), url.clone());
        Ok(url)
    }
}

#[async_trait]
impl MessageQueue for SqsMessageQueue {
    async fn send(&self, queue: &str, body: Value) -> Result<()> {
        let url = self.queue_url(queue).await?;
        self.client
            .send_message()
            .queue_url(url)
            .message_body(body.to_string())
            .send()
            .await
            .map_err(|e| GatewayError::Internal(format!("publishing to '{queue}': {e}")))?;
        Ok(())
    }

    async fn receive(&self, queue: &str, max_messages: i32) -> Result<Vec<RawMessage>> {
        let url = self.queue_url(queue).await?;
        let output = self
            .client
            .receive_message()
            .queue_url(url)
            .max_number_of_messages(max_messages.clamp(1, 10))
            .send()
            .await
            .map_err(|e| GatewayError::Internal(format!("receiving from '{queue}': {e}")))?;

        output
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| {
                let receipt_handle = m
                    .receipt_handle
                    .ok_or_else(|| GatewayError::Internal("message has no receipt handle".into()))?;
                let raw_body = m.body.unwrap_or_default();
                let body: Value = serde_json::from_str(&raw_body)
                    .map_err(|e| GatewayError::Internal(format!("invalid message body: {e}")))?;
                Ok(RawMessage {
                    receipt_handle,
                    body,
                })
            })
            .collect()
    }

    async fn delete(&self, queue: &str, receipt_handle: &str) -> Result<()> {
        let url = self.queue_url(queue).await?;
        self.client
            .delete_message()
            .queue_url(url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| GatewayError::Internal(format!("deleting from '{queue}': {e}")))?;
        Ok(())
    }

    async fn dead_letter(&self, dlq: &str, message: RawMessage) -> Result<()> {
        self.send(dlq, message.body).await
    }
}
