//! Consumers of the scheduler's status channel. The scheduler names a
//! revision `fuzzer_rev` in every message, matching the field name it uses
//! on the outbound [`gateway_mq::messages::StartFuzzer`] it received.

use async_trait::async_trait;
use chrono::Utc;
use gateway_db::model::{Event, Feedback, RevisionStatus};
use gateway_mq::messages::{FuzzerRunResult, FuzzerStatusChanged, FuzzerStopped, FuzzerVerified, RunStatistics, Status};
use gateway_mq::{ConsumeMessageError, MessageHandler};

use crate::state::AppState;

fn to_event(status: &Status) -> Event {
    Event {
        code: status.code.to_string(),
        message: status.message.clone(),
        details: status.details.clone(),
    }
}

fn rejected(err: impl std::fmt::Display) -> ConsumeMessageError {
    ConsumeMessageError::new(err.to_string())
}

pub struct FuzzerVerifiedHandler {
    pub state: AppState,
}

#[async_trait]
impl MessageHandler for FuzzerVerifiedHandler {
    type Model = FuzzerVerified;

    async fn handle(&self, message: FuzzerVerified) -> Result<(), ConsumeMessageError> {
        let mut revision = self
            .state
            .db
            .revisions()
            .get_by_id(message.fuzzer_rev, Some(message.fuzzer_id), true)
            .await
            .map_err(rejected)?;

        if revision.status != RevisionStatus::Verifying {
            return Err(rejected("revision not in Verifying state"));
        }

        revision.is_verified = true;
        revision.status = RevisionStatus::Running;
        self.state.db.revisions().update(&revision).await.map_err(rejected)
    }
}

pub struct FuzzerStoppedHandler {
    pub state: AppState,
}

#[async_trait]
impl MessageHandler for FuzzerStoppedHandler {
    type Model = FuzzerStopped;

    async fn handle(&self, message: FuzzerStopped) -> Result<(), ConsumeMessageError> {
        let mut revision = self
            .state
            .db
            .revisions()
            .get_by_id(message.fuzzer_rev, Some(message.fuzzer_id), true)
            .await
            .map_err(rejected)?;

        revision.status = RevisionStatus::Stopped;
        revision.health = message.fuzzer_health;
        revision.last_stop_date = Some(Utc::now());
        revision.feedback = Some(Feedback {
            scheduler: to_event(&message.fuzzer_status),
            agent: message.agent_status.as_ref().map(to_event),
        });
        self.state.db.revisions().update(&revision).await.map_err(rejected)
    }
}

pub struct FuzzerStatusChangedHandler {
    pub state: AppState,
}

#[async_trait]
impl MessageHandler for FuzzerStatusChangedHandler {
    type Model = FuzzerStatusChanged;

    async fn handle(&self, message: FuzzerStatusChanged) -> Result<(), ConsumeMessageError> {
        let mut revision = self
            .state
            .db
            .revisions()
            .get_by_id(message.fuzzer_rev, Some(message.fuzzer_id), true)
            .await
            .map_err(rejected)?;

        revision.health = message.fuzzer_health;
        revision.feedback = Some(Feedback {
            scheduler: to_event(&message.fuzzer_status),
            agent: None,
        });
        self.state.db.revisions().update(&revision).await.map_err(rejected)
    }
}

/// Persists one run's statistics and folds its crash count into the day's
/// total. Uniqueness is only known once the crash-analyzer classifies each
/// individual crash, so this only ever increments the total bucket; see
/// [`super::crash_analyzer`] for the unique-side increment.
pub struct FuzzerRunResultHandler {
    pub state: AppState,
}

#[async_trait]
impl MessageHandler for FuzzerRunResultHandler {
    type Model = FuzzerRunResult;

    async fn handle(&self, message: FuzzerRunResult) -> Result<(), ConsumeMessageError> {
        match message.statistics {
            Some(RunStatistics::LibFuzzer(exact)) => {
                self.state
                    .db
                    .statistics_libfuzzer()
                    .create(&gateway_db::model::LibFuzzerStatistics {
                        id: None,
                        fuzzer_id: message.fuzzer_id,
                        revision_id: message.fuzzer_rev,
                        date: message.finish_time,
                        work_time: exact.work_time,
                        exact: gateway_db::model::LibFuzzerExact {
                            execs_per_sec: exact.execs_per_sec,
                            edge_cov: exact.edge_cov,
                            feature_cov: exact.feature_cov,
                            peak_rss: exact.peak_rss,
                            execs_done: exact.execs_done,
                            corpus_entries: exact.corpus_entries,
                            corpus_size: exact.corpus_size,
                        },
                    })
                    .await
                    .map_err(rejected)?;
            }
            Some(RunStatistics::Afl(exact)) => {
                self.state
                    .db
                    .statistics_afl()
                    .create(&gateway_db::model::AflStatistics {
                        id: None,
                        fuzzer_id: message.fuzzer_id,
                        revision_id: message.fuzzer_rev,
                        date: message.finish_time,
                        work_time: exact.work_time,
                        exact: gateway_db::model::AflExact {
                            cycles_done: exact.cycles_done,
                            cycles_wo_finds: exact.cycles_wo_finds,
                            execs_done: exact.execs_done,
                            execs_per_sec: exact.execs_per_sec,
                            corpus_count: exact.corpus_count,
                            corpus_favored: exact.corpus_favored,
                            corpus_found: exact.corpus_found,
                            corpus_variable: exact.corpus_variable,
                            stability: exact.stability,
                            bitmap_cvg: exact.bitmap_cvg,
                            slowest_exec_ms: exact.slowest_exec_ms,
                            peak_rss_mb: exact.peak_rss_mb,
                        },
                    })
                    .await
                    .map_err(rejected)?;
            }
            None => {}
        }

        if message.crashes_found > 0 {
            self.state
                .db
                .statistics_crashes()
                .inc_crashes(message.finish_time, message.fuzzer_id, message.fuzzer_rev, message.crashes_found, 0)
                .await
                .map_err(rejected)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use gateway_db::model::{EngineId, Health, LangId};
    use gateway_mq::messages::{LibFuzzerRunStatistics, RunStatistics};
    use uuid::Uuid;

    use super::*;
    use crate::test_support::{test_state, TestFixture};

    async fn seed() -> (AppState, TestFixture) {
        let state = test_state();
        let fixture = TestFixture::seed(&state).await;
        (state, fixture)
    }

    #[tokio::test]
    async fn verified_flips_verifying_revision_to_running() {
        let (state, fixture) = seed().await;
        let handler = FuzzerVerifiedHandler { state: state.clone() };
        handler
            .handle(FuzzerVerified {
                fuzzer_id: fixture.fuzzer_id,
                fuzzer_rev: fixture.revision_id,
            })
            .await
            .unwrap();

        let revision = state.db.revisions().get_by_id(fixture.revision_id, None, true).await.unwrap();
        assert!(revision.is_verified);
        assert_eq!(revision.status, RevisionStatus::Running);
    }

    #[tokio::test]
    async fn stopped_records_feedback_and_health() {
        let (state, fixture) = seed().await;
        let handler = FuzzerStoppedHandler { state: state.clone() };
        handler
            .handle(FuzzerStopped {
                fuzzer_id: fixture.fuzzer_id,
                fuzzer_rev: fixture.revision_id,
                fuzzer_status: Status { code: 0, message: "stopped".into(), details: None },
                fuzzer_health: Health::Ok,
                agent_status: None,
            })
            .await
            .unwrap();

        let revision = state.db.revisions().get_by_id(fixture.revision_id, None, true).await.unwrap();
        assert_eq!(revision.status, RevisionStatus::Stopped);
        assert!(revision.feedback.is_some());
    }

    #[tokio::test]
    async fn replayed_verified_after_running_is_rejected() {
        let (state, fixture) = seed().await;
        let handler = FuzzerVerifiedHandler { state: state.clone() };
        handler
            .handle(FuzzerVerified {
                fuzzer_id: fixture.fuzzer_id,
                fuzzer_rev: fixture.revision_id,
            })
            .await
            .unwrap();

        let err = handler
            .handle(FuzzerVerified {
                fuzzer_id: fixture.fuzzer_id,
                fuzzer_rev: fixture.revision_id,
            })
            .await
            .unwrap_err();
        assert!(!err.to_string().is_empty());

        let revision = state.db.revisions().get_by_id(fixture.revision_id, None, true).await.unwrap();
        assert_eq!(revision.status, RevisionStatus::Running);
    }

    #[tokio::test]
    async fn unknown_revision_is_rejected_not_panicked() {
        let (state, _fixture) = seed().await;
        let handler = FuzzerVerifiedHandler { state };
        let err = handler
            .handle(FuzzerVerified { fuzzer_id: Uuid::new_v4(), fuzzer_rev: Uuid::new_v4() })
            .await
            .unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn run_result_persists_libfuzzer_stats_and_total_crashes() {
        let (state, fixture) = seed().await;
        let handler = FuzzerRunResultHandler { state: state.clone() };
        handler
            .handle(FuzzerRunResult {
                user_id: Uuid::new_v4(),
                project_id: fixture.project_id,
                pool_id: "pool-a".into(),
                fuzzer_id: fixture.fuzzer_id,
                fuzzer_rev: fixture.revision_id,
                fuzzer_engine: EngineId::Libfuzzer,
                fuzzer_lang: LangId::Cpp,
                start_time: Utc::now(),
                finish_time: Utc::now(),
                statistics: Some(RunStatistics::LibFuzzer(LibFuzzerRunStatistics {
                    work_time: 120,
                    execs_per_sec: 500,
                    edge_cov: 10,
                    feature_cov: 12,
                    peak_rss: 1024,
                    execs_done: 60_000,
                    corpus_entries: 42,
                    corpus_size: 4096,
                })),
                crashes_found: 3,
            })
            .await
            .unwrap();

        let stats = state
            .db
            .statistics_libfuzzer()
            .list(
                gateway_db::model::Paginator::new(0, 10),
                Some(fixture.fuzzer_id),
                None,
                gateway_db::model::StatisticsGroupBy::Day,
                Utc::now() - chrono::Duration::days(1),
                None,
            )
            .await
            .unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].work_time, 120);
    }
}
