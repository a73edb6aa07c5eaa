//! Consumers of the crash-analyzer's classification channel: a found crash
//! is either brand new or a duplicate of one already on file. Either way, a
//! project's enabled bug-tracker integrations get a reporter message so the
//! external ticket stays in sync.

use async_trait::async_trait;
use gateway_db::model::{Integration, IntegrationStatus, IntegrationTypeId};
use gateway_mq::messages::{
    DuplicateCrashFound, ReporterDuplicateCrashFound, ReporterUniqueCrashFound, UniqueCrashFound,
};
use gateway_mq::{ConsumeMessageError, MessageHandler};
use uuid::Uuid;

use crate::state::AppState;

fn rejected(err: impl std::fmt::Display) -> ConsumeMessageError {
    ConsumeMessageError::new(err.to_string())
}

async fn reporter_integrations(state: &AppState, project_id: Uuid) -> Result<Vec<Integration>, ConsumeMessageError> {
    Ok(state
        .db
        .integrations()
        .list(None, Some(project_id), None)
        .await
        .map_err(rejected)?
        .into_iter()
        .filter(|i| i.enabled)
        .collect())
}

fn crash_url(state: &AppState, project_id: Uuid, fuzzer_id: Uuid, revision_id: Uuid, crash_id: Uuid) -> String {
    format!(
        "{}/users/{{user_id}}/projects/{project_id}/fuzzers/{fuzzer_id}/revisions/{revision_id}/crashes/{crash_id}",
        state.config.api_endpoints.self_url,
    )
}

pub struct UniqueCrashFoundHandler {
    pub state: AppState,
}

#[async_trait]
impl MessageHandler for UniqueCrashFoundHandler {
    type Model = UniqueCrashFound;

    async fn handle(&self, message: UniqueCrashFound) -> Result<(), ConsumeMessageError> {
        let revision = self
            .state
            .db
            .revisions()
            .get_by_id(message.fuzzer_rev, Some(message.fuzzer_id), true)
            .await
            .map_err(rejected)?;
        let fuzzer = self
            .state
            .db
            .fuzzers()
            .get_by_id(message.fuzzer_id, None, true)
            .await
            .map_err(rejected)?;
        let project = self
            .state
            .db
            .projects()
            .get_by_id(fuzzer.project_id, None, true)
            .await
            .map_err(rejected)?;

        let crash = self
            .state
            .db
            .crashes()
            .create(
                message.fuzzer_id,
                message.fuzzer_rev,
                &message.preview,
                message.input_id.as_deref(),
                &message.input_hash,
                &message.crash_type,
                &message.brief,
                &message.output,
                message.reproduced,
            )
            .await
            .map_err(rejected)?;

        self.state
            .db
            .statistics_crashes()
            .inc_crashes(message.created, message.fuzzer_id, message.fuzzer_rev, 0, 1)
            .await
            .map_err(rejected)?;

        let url = crash_url(&self.state, project.id, fuzzer.id, revision.id, crash.id);
        for mut integration in reporter_integrations(&self.state, project.id).await? {
            if integration.status != IntegrationStatus::Succeeded {
                integration.num_undelivered += 1;
                self.state.db.integrations().update(&integration).await.map_err(rejected)?;
                continue;
            }

            let report = ReporterUniqueCrashFound {
                crash_id: crash.id,
                config_id: match Uuid::parse_str(&integration.config_id) {
                    Ok(id) => id,
                    Err(_) => continue,
                },
                crash_info: message.brief.clone(),
                crash_type: message.crash_type.clone(),
                crash_output: message.output.clone(),
                crash_url: url.clone(),
                project_name: project.name.clone(),
                fuzzer_name: fuzzer.name.clone(),
                revision_name: revision.name.clone(),
            };
            let result = match integration.integration_type {
                IntegrationTypeId::Jira => self.state.producers.jira_unique_crash(&report).await,
                IntegrationTypeId::Youtrack => self.state.producers.youtrack_unique_crash(&report).await,
            };
            result.map_err(rejected)?;
        }
        Ok(())
    }
}

pub struct DuplicateCrashFoundHandler {
    pub state: AppState,
}

#[async_trait]
impl MessageHandler for DuplicateCrashFoundHandler {
    type Model = DuplicateCrashFound;

    async fn handle(&self, message: DuplicateCrashFound) -> Result<(), ConsumeMessageError> {
        let fuzzer = self
            .state
            .db
            .fuzzers()
            .get_by_id(message.fuzzer_id, None, true)
            .await
            .map_err(rejected)?;

        let crash = self
            .state
            .db
            .crashes()
            .inc_duplicate_count(message.fuzzer_id, message.fuzzer_rev, &message.input_hash)
            .await
            .map_err(rejected)?;

        self.state
            .db
            .statistics_crashes()
            .inc_crashes(crash.created, message.fuzzer_id, message.fuzzer_rev, 1, 0)
            .await
            .map_err(rejected)?;

        let should_notify = crash.duplicate_count == 1 || crash.duplicate_count % 10 == 0;

        for mut integration in reporter_integrations(&self.state, fuzzer.project_id).await? {
            if integration.status != IntegrationStatus::Succeeded {
                integration.num_undelivered += 1;
                self.state.db.integrations().update(&integration).await.map_err(rejected)?;
                continue;
            }

            if !should_notify {
                continue;
            }

            let report = ReporterDuplicateCrashFound {
                crash_id: crash.id,
                config_id: match Uuid::parse_str(&integration.config_id) {
                    Ok(id) => id,
                    Err(_) => continue,
                },
                duplicate_count: crash.duplicate_count,
            };
            let result = match integration.integration_type {
                IntegrationTypeId::Jira => self.state.producers.jira_duplicate_crash(&report).await,
                IntegrationTypeId::Youtrack => self.state.producers.youtrack_duplicate_crash(&report).await,
            };
            result.map_err(rejected)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::test_support::{test_state, TestFixture};

    #[tokio::test]
    async fn unique_crash_is_recorded_and_counted() {
        let state = test_state();
        let fixture = TestFixture::seed(&state).await;
        let handler = UniqueCrashFoundHandler { state: state.clone() };

        handler
            .handle(UniqueCrashFound {
                created: Utc::now(),
                fuzzer_id: fixture.fuzzer_id,
                fuzzer_rev: fixture.revision_id,
                preview: "preview".into(),
                input_id: None,
                input_hash: "abc123".into(),
                output: "stack trace".into(),
                brief: "null deref".into(),
                reproduced: true,
                crash_type: "SEGV".into(),
            })
            .await
            .unwrap();

        let crashes = state
            .db
            .crashes()
            .list(gateway_db::model::Paginator::new(0, 10), Some(fixture.fuzzer_id), None, None, None, None)
            .await
            .unwrap();
        assert_eq!(crashes.len(), 1);
        assert_eq!(crashes[0].input_hash, "abc123");
    }

    #[tokio::test]
    async fn duplicate_crash_increments_existing_crash() {
        let state = test_state();
        let fixture = TestFixture::seed(&state).await;
        let crash = state
            .db
            .crashes()
            .create(fixture.fuzzer_id, fixture.revision_id, "p", None, "dupe-hash", "SEGV", "b", "o", false)
            .await
            .unwrap();

        let handler = DuplicateCrashFoundHandler { state: state.clone() };
        handler
            .handle(DuplicateCrashFound {
                fuzzer_id: fixture.fuzzer_id,
                fuzzer_rev: fixture.revision_id,
                input_hash: "dupe-hash".into(),
            })
            .await
            .unwrap();

        let updated = state.db.crashes().get(crash.id, None, None).await.unwrap();
        assert_eq!(updated.duplicate_count, 1);
    }

    #[tokio::test]
    async fn unique_crash_skips_non_succeeded_integration_and_counts_undelivered() {
        use gateway_db::model::IntegrationTypeId;

        let state = test_state();
        let fixture = TestFixture::seed(&state).await;
        let integration = state
            .db
            .integrations()
            .create(
                "jira",
                fixture.project_id,
                "44444444-4444-4444-4444-444444444444",
                IntegrationTypeId::Jira,
                IntegrationStatus::Failed,
            )
            .await
            .unwrap();

        let handler = UniqueCrashFoundHandler { state: state.clone() };
        handler
            .handle(UniqueCrashFound {
                created: Utc::now(),
                fuzzer_id: fixture.fuzzer_id,
                fuzzer_rev: fixture.revision_id,
                preview: "preview".into(),
                input_id: None,
                input_hash: "failed-integration".into(),
                output: "stack trace".into(),
                brief: "null deref".into(),
                reproduced: true,
                crash_type: "SEGV".into(),
            })
            .await
            .unwrap();

        let updated = state.db.integrations().get_by_id(integration.id, None).await.unwrap();
        assert_eq!(updated.num_undelivered, 1);
    }

    #[tokio::test]
    async fn duplicate_crash_notifies_only_on_first_and_every_tenth() {
        let state = test_state();
        let fixture = TestFixture::seed(&state).await;
        let crash = state
            .db
            .crashes()
            .create(fixture.fuzzer_id, fixture.revision_id, "p", None, "rate-hash", "SEGV", "b", "o", false)
            .await
            .unwrap();

        let handler = DuplicateCrashFoundHandler { state: state.clone() };
        for _ in 0..9 {
            handler
                .handle(DuplicateCrashFound {
                    fuzzer_id: fixture.fuzzer_id,
                    fuzzer_rev: fixture.revision_id,
                    input_hash: "rate-hash".into(),
                })
                .await
                .unwrap();
        }

        let updated = state.db.crashes().get(crash.id, None, None).await.unwrap();
        assert_eq!(updated.duplicate_count, 9);
    }

    #[tokio::test]
    async fn unknown_hash_is_rejected() {
        let state = test_state();
        let fixture = TestFixture::seed(&state).await;
        let handler = DuplicateCrashFoundHandler { state };
        let err = handler
            .handle(DuplicateCrashFound {
                fuzzer_id: fixture.fuzzer_id,
                fuzzer_rev: fixture.revision_id,
                input_hash: "never-seen".into(),
            })
            .await
            .unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
