//! Message-queue runtime: typed producer/consumer channels, DLQ routing,
//! and a JSON wire format, backed by SQS in production and an in-memory
//! fake in tests.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod fake;
pub mod messages;
pub mod producer;
pub mod sqs;
pub mod transport;

pub use producer::Producers;
pub use sqs::SqsMessageQueue;
pub use transport::{poll_once, ConsumeMessageError, MessageHandler, MessageQueue, RawMessage};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::fake::InMemoryMessageQueue;
    use crate::messages::{self, FuzzerVerified, StartFuzzer};
    use crate::transport::{poll_once, ConsumeMessageError, MessageHandler, MessageQueue};
    use crate::Producers;
    use gateway_db::model::{EngineId, LangId};
    use uuid::Uuid;

    #[tokio::test]
    async fn start_fuzzer_lands_on_the_scheduler_queue() {
        let mq = Arc::new(InMemoryMessageQueue::default());
        let producers = Producers::new(mq.clone(), Arc::new(TestUnsent));

        let msg = StartFuzzer {
            user_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            pool_id: "default".to_string(),
            fuzzer_id: Uuid::new_v4(),
            fuzzer_rev: Uuid::new_v4(),
            fuzzer_engine: EngineId::Libfuzzer,
            fuzzer_lang: LangId::Cpp,
            cpu_usage: 1000,
            ram_usage: 1000,
            tmpfs_size: 200,
            reset_state: true,
            is_verified: false,
            image_id: Uuid::new_v4(),
        };

        producers.start_fuzzer(&msg).await.unwrap();
        assert_eq!(mq.len(messages::QUEUE_SCHEDULER_START_FUZZER), 1);
    }

    struct FuzzerVerifiedHandler;

    #[async_trait]
    impl MessageHandler for FuzzerVerifiedHandler {
        type Model = FuzzerVerified;

        async fn handle(&self, message: FuzzerVerified) -> Result<(), ConsumeMessageError> {
            if message.fuzzer_rev == Uuid::nil() {
                return Err(ConsumeMessageError::new("revision not found"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn poll_once_acks_a_handled_message() {
        let mq = InMemoryMessageQueue::default();
        let body = serde_json::to_value(FuzzerVerified {
            fuzzer_id: Uuid::new_v4(),
            fuzzer_rev: Uuid::new_v4(),
        })
        .unwrap();
        mq.send(messages::QUEUE_SCHEDULER_FUZZER_VERIFIED, body)
            .await
            .unwrap();

        let handled = poll_once(
            &mq,
            messages::QUEUE_SCHEDULER_FUZZER_VERIFIED,
            "dlq",
            10,
            &FuzzerVerifiedHandler,
        )
        .await
        .unwrap();

        assert_eq!(handled, 1);
        assert!(mq.is_empty("dlq"));
    }

    #[tokio::test]
    async fn poll_once_dead_letters_a_rejected_message() {
        let mq = InMemoryMessageQueue::default();
        let body = serde_json::to_value(FuzzerVerified {
            fuzzer_id: Uuid::new_v4(),
            fuzzer_rev: Uuid::nil(),
        })
        .unwrap();
        mq.send(messages::QUEUE_SCHEDULER_FUZZER_VERIFIED, body)
            .await
            .unwrap();

        poll_once(
            &mq,
            messages::QUEUE_SCHEDULER_FUZZER_VERIFIED,
            "dlq",
            10,
            &FuzzerVerifiedHandler,
        )
        .await
        .unwrap();

        assert_eq!(mq.len("dlq"), 1);
    }

    struct TestUnsent;

    #[async_trait]
    impl gateway_db::traits::UnsentMessages for TestUnsent {
        async fn save(&self, _queue: &str, _payloads: &[serde_json::Value]) -> gateway_db::traits::Result<()> {
            Ok(())
        }

        async fn load_all(&self) -> gateway_db::traits::Result<Vec<(String, Vec<serde_json::Value>)>> {
            Ok(Vec::new())
        }
    }
}
