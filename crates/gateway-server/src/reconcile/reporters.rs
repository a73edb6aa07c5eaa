//! Consumers of the Jira/YouTrack reporters' result channels. Both
//! reporters publish the same two message shapes, so one handler pair
//! serves both queues; `gateway-server`'s poll loop subscribes each handler
//! instance to both the Jira and YouTrack queue names.

use async_trait::async_trait;
use gateway_db::model::IntegrationStatus;
use gateway_mq::messages::{IntegrationResult, ReportUndelivered};
use gateway_mq::{ConsumeMessageError, MessageHandler};

use crate::state::AppState;

fn rejected(err: impl std::fmt::Display) -> ConsumeMessageError {
    ConsumeMessageError::new(err.to_string())
}

pub struct IntegrationResultHandler {
    pub state: AppState,
}

#[async_trait]
impl MessageHandler for IntegrationResultHandler {
    type Model = IntegrationResult;

    async fn handle(&self, message: IntegrationResult) -> Result<(), ConsumeMessageError> {
        let mut integration = self
            .state
            .db
            .integrations()
            .get_by_config_id(&message.config_id.to_string())
            .await
            .map_err(rejected)?;

        if integration.update_rev != message.update_rev {
            // Credentials were re-saved after this result was produced;
            // the reporter was still acting on the old ones.
            return Ok(());
        }

        integration.status = if message.error.is_some() {
            IntegrationStatus::Failed
        } else {
            IntegrationStatus::Succeeded
        };
        integration.last_error = message.error;
        self.state.db.integrations().update(&integration).await.map_err(rejected)
    }
}

pub struct ReportUndeliveredHandler {
    pub state: AppState,
}

#[async_trait]
impl MessageHandler for ReportUndeliveredHandler {
    type Model = ReportUndelivered;

    async fn handle(&self, message: ReportUndelivered) -> Result<(), ConsumeMessageError> {
        let mut integration = self
            .state
            .db
            .integrations()
            .get_by_config_id(&message.config_id.to_string())
            .await
            .map_err(rejected)?;

        integration.num_undelivered += 1;
        integration.last_error = Some(message.error);
        self.state.db.integrations().update(&integration).await.map_err(rejected)
    }
}

#[cfg(test)]
mod tests {
    use gateway_db::model::IntegrationTypeId;

    use super::*;
    use crate::test_support::{test_state, TestFixture};

    #[tokio::test]
    async fn result_marks_integration_failed_on_error() {
        let state = test_state();
        let fixture = TestFixture::seed(&state).await;
        let integration = state
            .db
            .integrations()
            .create("jira", fixture.project_id, "11111111-1111-1111-1111-111111111111", IntegrationTypeId::Jira, IntegrationStatus::InProgress)
            .await
            .unwrap();

        let handler = IntegrationResultHandler { state: state.clone() };
        handler
            .handle(IntegrationResult {
                config_id: integration.config_id.parse().unwrap(),
                error: Some("ticket creation failed".into()),
                update_rev: integration.update_rev.clone(),
            })
            .await
            .unwrap();

        let updated = state.db.integrations().get_by_id(integration.id, None).await.unwrap();
        assert_eq!(updated.status, IntegrationStatus::Failed);
        assert_eq!(updated.last_error.as_deref(), Some("ticket creation failed"));
    }

    #[tokio::test]
    async fn stale_update_rev_is_ignored() {
        let state = test_state();
        let fixture = TestFixture::seed(&state).await;
        let integration = state
            .db
            .integrations()
            .create("jira", fixture.project_id, "22222222-2222-2222-2222-222222222222", IntegrationTypeId::Jira, IntegrationStatus::InProgress)
            .await
            .unwrap();

        let handler = IntegrationResultHandler { state: state.clone() };
        handler
            .handle(IntegrationResult {
                config_id: integration.config_id.parse().unwrap(),
                error: None,
                update_rev: "stale-rev".into(),
            })
            .await
            .unwrap();

        let unchanged = state.db.integrations().get_by_id(integration.id, None).await.unwrap();
        assert_eq!(unchanged.status, IntegrationStatus::InProgress);
    }

    #[tokio::test]
    async fn report_undelivered_increments_counter() {
        let state = test_state();
        let fixture = TestFixture::seed(&state).await;
        let integration = state
            .db
            .integrations()
            .create("youtrack", fixture.project_id, "33333333-3333-3333-3333-333333333333", IntegrationTypeId::Youtrack, IntegrationStatus::Succeeded)
            .await
            .unwrap();

        let handler = ReportUndeliveredHandler { state: state.clone() };
        handler
            .handle(ReportUndelivered {
                config_id: integration.config_id.parse().unwrap(),
                error: "reporter unreachable".into(),
            })
            .await
            .unwrap();

        let updated = state.db.integrations().get_by_id(integration.id, None).await.unwrap();
        assert_eq!(updated.num_undelivered, 1);
        assert_eq!(updated.last_error.as_deref(), Some("reporter unreachable"));
    }
}
