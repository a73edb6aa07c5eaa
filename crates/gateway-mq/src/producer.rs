//! Typed producer façade. A publish failure is never fatal to the caller:
//! the payload is persisted via [`UnsentMessages`] for a later flush, the
//! same at-least-once guarantee the broker gives successful sends.

use std::sync::Arc;

use gateway_db::traits::UnsentMessages;
use gateway_error::GatewayError;
use serde::Serialize;
use tracing::warn;

use crate::messages::{
    self, ReporterDuplicateCrashFound, ReporterUniqueCrashFound, StartFuzzer, StopFuzzer,
    StopFuzzersInPool, UpdateFuzzer,
};
use crate::transport::MessageQueue;

pub struct Producers {
    mq: Arc<dyn MessageQueue>,
    unsent: Arc<dyn UnsentMessages>,
}

impl Producers {
    #[must_use]
    pub fn new(mq: Arc<dyn MessageQueue>, unsent: Arc<dyn UnsentMessages>) -> Self {
        Self { mq, unsent }
    }

    async fn publish<T: Serialize + Send + Sync>(
        &self,
        queue: &str,
        payload: &T,
    ) -> Result<(), GatewayError> {
        let body = serde_json::to_value(payload)
            .map_err(|e| GatewayError::Internal(format!("serializing '{queue}' payload: {e}")))?;

        if let Err(e) = self.mq.send(queue, body.clone()).await {
            warn!(queue, error = %e, "publish failed, persisting for later delivery");
            self.unsent.save(queue, std::slice::from_ref(&body)).await?;
        }
        Ok(())
    }

    pub async fn start_fuzzer(&self, msg: &StartFuzzer) -> Result<(), GatewayError> {
        self.publish(messages::QUEUE_SCHEDULER_START_FUZZER, msg).await
    }

    pub async fn update_fuzzer(&self, msg: &UpdateFuzzer) -> Result<(), GatewayError> {
        self.publish(messages::QUEUE_SCHEDULER_UPDATE_FUZZER, msg).await
    }

    pub async fn stop_fuzzer(&self, msg: &StopFuzzer) -> Result<(), GatewayError> {
        self.publish(messages::QUEUE_SCHEDULER_STOP_FUZZER, msg).await
    }

    pub async fn stop_fuzzers_in_pool(&self, msg: &StopFuzzersInPool) -> Result<(), GatewayError> {
        self.publish(messages::QUEUE_SCHEDULER_STOP_FUZZERS_IN_POOL, msg)
            .await
    }

    pub async fn jira_unique_crash(&self, msg: &ReporterUniqueCrashFound) -> Result<(), GatewayError> {
        self.publish(messages::QUEUE_JIRA_UNIQUE_CRASH, msg).await
    }

    pub async fn jira_duplicate_crash(
        &self,
        msg: &ReporterDuplicateCrashFound,
    ) -> Result<(), GatewayError> {
        self.publish(messages::QUEUE_JIRA_DUPLICATE_CRASH, msg).await
    }

    pub async fn youtrack_unique_crash(
        &self,
        msg: &ReporterUniqueCrashFound,
    ) -> Result<(), GatewayError> {
        self.publish(messages::QUEUE_YOUTRACK_UNIQUE_CRASH, msg).await
    }

    pub async fn youtrack_duplicate_crash(
        &self,
        msg: &ReporterDuplicateCrashFound,
    ) -> Result<(), GatewayError> {
        self.publish(messages::QUEUE_YOUTRACK_DUPLICATE_CRASH, msg)
            .await
    }

    /// Replays everything [`UnsentMessages::load_all`] returns through the
    /// broker. Run periodically by `gateway-server`'s background tasks.
    pub async fn flush_unsent(&self) -> Result<(), GatewayError> {
        for (queue, payloads) in self.unsent.load_all().await? {
            for payload in payloads {
                if let Err(e) = self.mq.send(&queue, payload.clone()).await {
                    warn!(queue, error = %e, "re-publish of unsent message failed again");
                    self.unsent.save(&queue, std::slice::from_ref(&payload)).await?;
                }
            }
        }
        Ok(())
    }
}
