//! Wire schemas for every producer and consumer channel. Field sets mirror
//! the platform's Python scheduler/reporter/pool-manager contracts; each
//! struct here is the Rust-typed equivalent of one `pydantic` `Model`.

use gateway_db::model::{EngineId, Health, LangId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scheduler- or agent-reported status code/message/details triple,
/// carried verbatim into `Revision::feedback` on the consuming side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub code: i64,
    pub message: String,
    pub details: Option<String>,
}

// ---------------------------------------------------------------------
// Producers -> scheduler
// ---------------------------------------------------------------------

pub const QUEUE_SCHEDULER_START_FUZZER: &str = "api-gateway.fuzzer.start";
pub const QUEUE_SCHEDULER_UPDATE_FUZZER: &str = "api-gateway.fuzzer.update";
pub const QUEUE_SCHEDULER_STOP_FUZZER: &str = "api-gateway.fuzzer.stop";
pub const QUEUE_SCHEDULER_STOP_FUZZERS_IN_POOL: &str = "api-gateway.pool.stop_all_fuzzers";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartFuzzer {
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub pool_id: String,
    pub fuzzer_id: Uuid,
    pub fuzzer_rev: Uuid,
    pub fuzzer_engine: EngineId,
    pub fuzzer_lang: LangId,
    pub cpu_usage: i32,
    pub ram_usage: i32,
    pub tmpfs_size: i32,
    pub reset_state: bool,
    pub is_verified: bool,
    pub image_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateFuzzer {
    pub pool_id: String,
    pub fuzzer_id: Uuid,
    pub fuzzer_rev: Uuid,
    pub cpu_usage: i32,
    pub ram_usage: i32,
    pub tmpfs_size: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopFuzzer {
    pub pool_id: String,
    pub fuzzer_id: Uuid,
    pub fuzzer_rev: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopFuzzersInPool {
    pub pool_id: String,
}

// ---------------------------------------------------------------------
// Consumers <- scheduler
// ---------------------------------------------------------------------

pub const QUEUE_SCHEDULER_FUZZER_VERIFIED: &str = "scheduler.fuzzer.verified";
pub const QUEUE_SCHEDULER_FUZZER_STOPPED: &str = "scheduler.fuzzer.stopped";
pub const QUEUE_SCHEDULER_FUZZER_STATUS_CHANGED: &str = "scheduler.fuzzer.status";
pub const QUEUE_SCHEDULER_FUZZER_RUN_RESULT: &str = "scheduler.fuzzer.result";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzerVerified {
    pub fuzzer_id: Uuid,
    pub fuzzer_rev: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzerStopped {
    pub fuzzer_id: Uuid,
    pub fuzzer_rev: Uuid,
    pub fuzzer_status: Status,
    pub fuzzer_health: Health,
    pub agent_status: Option<Status>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzerStatusChanged {
    pub fuzzer_id: Uuid,
    pub fuzzer_rev: Uuid,
    pub fuzzer_status: Status,
    pub fuzzer_health: Health,
}

/// LibFuzzer-family run statistics, present when `fuzzer_engine` names a
/// libFuzzer-based engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibFuzzerRunStatistics {
    pub work_time: i64,
    pub execs_per_sec: i64,
    pub edge_cov: i64,
    pub feature_cov: i64,
    pub peak_rss: i64,
    pub execs_done: i64,
    pub corpus_entries: i64,
    pub corpus_size: i64,
}

/// AFL-family run statistics, present when `fuzzer_engine` names an
/// AFL-based engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AflRunStatistics {
    pub work_time: i64,
    pub cycles_done: i64,
    pub cycles_wo_finds: i64,
    pub execs_done: i64,
    pub execs_per_sec: f64,
    pub corpus_count: i64,
    pub corpus_favored: i64,
    pub corpus_found: i64,
    pub corpus_variable: i64,
    pub stability: f64,
    pub bitmap_cvg: f64,
    pub slowest_exec_ms: i64,
    pub peak_rss_mb: i64,
}

/// Discriminated by `fuzzer_engine` on the enclosing [`FuzzerRunResult`],
/// not by an explicit tag field, matching the source's engine-family switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunStatistics {
    LibFuzzer(LibFuzzerRunStatistics),
    Afl(AflRunStatistics),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzerRunResult {
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub pool_id: String,
    pub fuzzer_id: Uuid,
    pub fuzzer_rev: Uuid,
    pub fuzzer_engine: EngineId,
    pub fuzzer_lang: LangId,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub finish_time: chrono::DateTime<chrono::Utc>,
    pub statistics: Option<RunStatistics>,
    pub crashes_found: i64,
}

// ---------------------------------------------------------------------
// Consumers <- crash-analyzer
// ---------------------------------------------------------------------

pub const QUEUE_CRASH_ANALYZER_UNIQUE: &str = "crash-analyzer.crashes.unique";
pub const QUEUE_CRASH_ANALYZER_DUPLICATE: &str = "crash-analyzer.crashes.duplicate";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueCrashFound {
    pub created: chrono::DateTime<chrono::Utc>,
    pub fuzzer_id: Uuid,
    pub fuzzer_rev: Uuid,
    pub preview: String,
    pub input_id: Option<String>,
    pub input_hash: String,
    pub output: String,
    pub brief: String,
    pub reproduced: bool,
    #[serde(rename = "type")]
    pub crash_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateCrashFound {
    pub fuzzer_id: Uuid,
    pub fuzzer_rev: Uuid,
    pub input_hash: String,
}

// ---------------------------------------------------------------------
// Producers -> jira/youtrack reporters
// ---------------------------------------------------------------------

pub const QUEUE_JIRA_UNIQUE_CRASH: &str = "jira-reporter.crashes.unique";
pub const QUEUE_JIRA_DUPLICATE_CRASH: &str = "jira-reporter.crashes.duplicate";
pub const QUEUE_YOUTRACK_UNIQUE_CRASH: &str = "youtrack-reporter.crashes.unique";
pub const QUEUE_YOUTRACK_DUPLICATE_CRASH: &str = "youtrack-reporter.crashes.duplicate";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterUniqueCrashFound {
    pub crash_id: Uuid,
    pub config_id: Uuid,
    pub crash_info: String,
    pub crash_type: String,
    pub crash_output: String,
    pub crash_url: String,
    pub project_name: String,
    pub fuzzer_name: String,
    pub revision_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterDuplicateCrashFound {
    pub crash_id: Uuid,
    pub config_id: Uuid,
    pub duplicate_count: i64,
}

// ---------------------------------------------------------------------
// Consumers <- jira/youtrack reporters
// ---------------------------------------------------------------------

pub const QUEUE_JIRA_REPORT_UNDELIVERED: &str = "jira-reporter.reports.undelivered";
pub const QUEUE_JIRA_INTEGRATION_RESULT: &str = "jira-reporter.integrations.result";
pub const QUEUE_YOUTRACK_REPORT_UNDELIVERED: &str = "youtrack-reporter.reports.undelivered";
pub const QUEUE_YOUTRACK_INTEGRATION_RESULT: &str = "youtrack-reporter.integrations.result";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportUndelivered {
    pub config_id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationResult {
    pub config_id: Uuid,
    pub error: Option<String>,
    /// Must equal the stored integration's `update_rev`; a stale value means
    /// the user re-saved credentials after this result was produced.
    pub update_rev: String,
}

// ---------------------------------------------------------------------
// Consumers <- pool-manager
// ---------------------------------------------------------------------

pub const QUEUE_POOL_MANAGER_POOL_DELETED: &str = "pool-manager.pool-deleted";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolDeleted {
    pub id: String,
}
