//! `MessageHandler` implementations for every consumer channel in
//! [`gateway_mq::messages`]. Each handler owns a clone of [`AppState`] the
//! same way an axum handler does; the binary's poll loop hands messages to
//! these the way the router hands requests to `handlers::*`.

mod crash_analyzer;
mod pool_manager;
mod reporters;
mod scheduler;

pub use crash_analyzer::{DuplicateCrashFoundHandler, UniqueCrashFoundHandler};
pub use pool_manager::PoolDeletedHandler;
pub use reporters::{IntegrationResultHandler, ReportUndeliveredHandler};
pub use scheduler::{
    FuzzerRunResultHandler, FuzzerStatusChangedHandler, FuzzerStoppedHandler, FuzzerVerifiedHandler,
};

use std::sync::Arc;
use std::time::Duration;

use gateway_mq::messages::{
    QUEUE_CRASH_ANALYZER_DUPLICATE, QUEUE_CRASH_ANALYZER_UNIQUE, QUEUE_JIRA_INTEGRATION_RESULT,
    QUEUE_JIRA_REPORT_UNDELIVERED, QUEUE_POOL_MANAGER_POOL_DELETED,
    QUEUE_SCHEDULER_FUZZER_RUN_RESULT, QUEUE_SCHEDULER_FUZZER_STATUS_CHANGED,
    QUEUE_SCHEDULER_FUZZER_STOPPED, QUEUE_SCHEDULER_FUZZER_VERIFIED,
    QUEUE_YOUTRACK_INTEGRATION_RESULT, QUEUE_YOUTRACK_REPORT_UNDELIVERED,
};
use gateway_mq::{poll_once, MessageHandler, MessageQueue};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::state::AppState;

const MAX_MESSAGES: i32 = 10;
const IDLE_BACKOFF: Duration = Duration::from_secs(2);
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

fn spawn_poll_loop<H>(mq: Arc<dyn MessageQueue>, queue: &'static str, dlq: String, handler: H) -> JoinHandle<()>
where
    H: MessageHandler + Send + Sync + 'static,
{
    tokio::spawn(async move {
        loop {
            match poll_once(mq.as_ref(), queue, &dlq, MAX_MESSAGES, &handler).await {
                Ok(0) => tokio::time::sleep(IDLE_BACKOFF).await,
                Ok(_) => {}
                Err(err) => {
                    warn!(queue, %err, "poll failed, backing off");
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            }
        }
    })
}

/// Spawns one polling loop per consumer channel this gateway subscribes to.
/// Returns the join handles so callers can await them on shutdown, though in
/// practice the process exits via signal rather than clean teardown.
pub fn spawn_all(state: AppState, mq: Arc<dyn MessageQueue>, dlq: &str) -> Vec<JoinHandle<()>> {
    let dlq = dlq.to_string();
    vec![
        spawn_poll_loop(
            mq.clone(),
            QUEUE_SCHEDULER_FUZZER_VERIFIED,
            dlq.clone(),
            FuzzerVerifiedHandler { state: state.clone() },
        ),
        spawn_poll_loop(
            mq.clone(),
            QUEUE_SCHEDULER_FUZZER_STOPPED,
            dlq.clone(),
            FuzzerStoppedHandler { state: state.clone() },
        ),
        spawn_poll_loop(
            mq.clone(),
            QUEUE_SCHEDULER_FUZZER_STATUS_CHANGED,
            dlq.clone(),
            FuzzerStatusChangedHandler { state: state.clone() },
        ),
        spawn_poll_loop(
            mq.clone(),
            QUEUE_SCHEDULER_FUZZER_RUN_RESULT,
            dlq.clone(),
            FuzzerRunResultHandler { state: state.clone() },
        ),
        spawn_poll_loop(
            mq.clone(),
            QUEUE_CRASH_ANALYZER_UNIQUE,
            dlq.clone(),
            UniqueCrashFoundHandler { state: state.clone() },
        ),
        spawn_poll_loop(
            mq.clone(),
            QUEUE_CRASH_ANALYZER_DUPLICATE,
            dlq.clone(),
            DuplicateCrashFoundHandler { state: state.clone() },
        ),
        spawn_poll_loop(
            mq.clone(),
            QUEUE_POOL_MANAGER_POOL_DELETED,
            dlq.clone(),
            PoolDeletedHandler { state: state.clone() },
        ),
        spawn_poll_loop(
            mq.clone(),
            QUEUE_JIRA_INTEGRATION_RESULT,
            dlq.clone(),
            IntegrationResultHandler { state: state.clone() },
        ),
        spawn_poll_loop(
            mq.clone(),
            QUEUE_YOUTRACK_INTEGRATION_RESULT,
            dlq.clone(),
            IntegrationResultHandler { state: state.clone() },
        ),
        spawn_poll_loop(
            mq.clone(),
            QUEUE_JIRA_REPORT_UNDELIVERED,
            dlq.clone(),
            ReportUndeliveredHandler { state: state.clone() },
        ),
        spawn_poll_loop(
            mq.clone(),
            QUEUE_YOUTRACK_REPORT_UNDELIVERED,
            dlq.clone(),
            ReportUndeliveredHandler { state: state.clone() },
        ),
    ]
}
