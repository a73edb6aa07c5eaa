//! Backend-agnostic message-queue transport, the seam producers and
//! consumers build on top of.

use async_trait::async_trait;
use gateway_error::GatewayError;
use serde_json::Value;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// A message pulled off a queue, not yet acknowledged.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub receipt_handle: String,
    pub body: Value,
}

/// Distinguishes a consumer's logical failure (bad state, unknown entity)
/// from a transport failure. Raising this causes the runtime to route the
/// message to the dead-letter queue rather than retry it indefinitely.
#[derive(Debug, thiserror::Error)]
#[error("message rejected: {0}")]
pub struct ConsumeMessageError(pub String);

impl ConsumeMessageError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn send(&self, queue: &str, body: Value) -> Result<()>;
    async fn receive(&self, queue: &str, max_messages: i32) -> Result<Vec<RawMessage>>;
    async fn delete(&self, queue: &str, receipt_handle: &str) -> Result<()>;
    async fn dead_letter(&self, dlq: &str, message: RawMessage) -> Result<()>;
}

/// One iteration of a consumer loop: receive, deserialize, dispatch, then
/// ack or dead-letter. Malformed bodies are dead-lettered the same as a
/// logical rejection from `handler`.
pub async fn poll_once<H: MessageHandler>(
    mq: &dyn MessageQueue,
    queue: &str,
    dlq: &str,
    max_messages: i32,
    handler: &H,
) -> Result<usize> {
    let raw_messages = mq.receive(queue, max_messages).await?;
    let count = raw_messages.len();

    for raw in raw_messages {
        match serde_json::from_value::<H::Model>(raw.body.clone()) {
            Ok(model) => match handler.handle(model).await {
                Ok(()) => mq.delete(queue, &raw.receipt_handle).await?,
                Err(reason) => {
                    tracing::warn!(queue, %reason, "consumer rejected message, routing to DLQ");
                    mq.dead_letter(dlq, raw).await?;
                }
            },
            Err(parse_err) => {
                tracing::warn!(queue, %parse_err, "malformed message body, routing to DLQ");
                mq.dead_letter(dlq, raw).await?;
            }
        }
    }

    Ok(count)
}

/// Implemented once per consumer channel (`FuzzerVerified`, `PoolDeleted`,
/// ...); `gateway-server` supplies the DB-backed implementations.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    type Model: serde::de::DeserializeOwned + Send;

    async fn handle(&self, message: Self::Model) -> std::result::Result<(), ConsumeMessageError>;
}
