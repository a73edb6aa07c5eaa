//! Domain entities shared by every repository in this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Visibility filter applied when listing soft-deletable resources.
///
/// A resource with `erasure_date: None` is [`Present`](Self::Present). One
/// with `erasure_date` in the future is in the [`TrashBin`](Self::TrashBin)
/// (recoverable). One with `erasure_date` in the past is [`Erasing`](Self::Erasing)
/// and pending permanent deletion by a background sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalState {
    /// Any state, regardless of `erasure_date`.
    All,
    /// Present or in the trash bin, i.e. accessible to the owning user.
    Visible,
    /// Not deleted.
    Present,
    /// Deleted but not yet past its erasure date.
    TrashBin,
    /// Past its erasure date; about to be purged.
    Erasing,
}

impl RemovalState {
    /// Whether `erasure_date` satisfies this filter, evaluated against `now`.
    #[must_use]
    pub fn matches(self, erasure_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match self {
            Self::All => true,
            Self::Present => erasure_date.is_none(),
            Self::TrashBin => erasure_date.is_some_and(|d| d > now),
            Self::Erasing => erasure_date.is_some_and(|d| d <= now),
            Self::Visible => erasure_date.is_none() || erasure_date.is_some_and(|d| d > now),
        }
    }
}

/// Offset/limit pagination, mirroring the page-number API exposed over HTTP.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    pub offset: i64,
    pub limit: i64,
}

impl Paginator {
    #[must_use]
    pub fn new(page_num: u32, page_size: u32) -> Self {
        Self {
            offset: i64::from(page_num) * i64::from(page_size),
            limit: i64::from(page_size),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum EngineId {
    Afl,
    #[sqlx(rename = "afl.rs")]
    #[serde(rename = "afl.rs")]
    AflRs,
    #[sqlx(rename = "sharpfuzz-afl")]
    #[serde(rename = "sharpfuzz-afl")]
    SharpfuzzAfl,
    Libfuzzer,
    Jazzer,
    Atheris,
    #[sqlx(rename = "cargo-fuzz")]
    #[serde(rename = "cargo-fuzz")]
    CargoFuzz,
    #[sqlx(rename = "go-fuzz-libfuzzer")]
    #[serde(rename = "go-fuzz-libfuzzer")]
    GoFuzzLibfuzzer,
    #[sqlx(rename = "sharpfuzz-libfuzzer")]
    #[serde(rename = "sharpfuzz-libfuzzer")]
    SharpfuzzLibfuzzer,
}

impl EngineId {
    #[must_use]
    pub const fn is_afl(self) -> bool {
        matches!(self, Self::Afl | Self::AflRs | Self::SharpfuzzAfl)
    }

    #[must_use]
    pub const fn is_libfuzzer(self) -> bool {
        matches!(
            self,
            Self::Libfuzzer
                | Self::Jazzer
                | Self::Atheris
                | Self::CargoFuzz
                | Self::GoFuzzLibfuzzer
                | Self::SharpfuzzLibfuzzer
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum LangId {
    Go,
    Cpp,
    Rust,
    Java,
    Swift,
    Python,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lang {
    pub id: LangId,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engine {
    pub id: EngineId,
    pub display_name: String,
    pub langs: Vec<LangId>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "PascalCase")]
pub enum ImageStatus {
    NotPushed,
    Verifying,
    VerifyError,
    Ready,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum ImageType {
    Custom,
    #[sqlx(rename = "Built-in")]
    #[serde(rename = "Built-in")]
    Builtin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub engines: Vec<EngineId>,
    pub status: ImageStatus,
    /// `None` for a built-in image shared across all projects.
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cookie {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires: Option<DateTime<Utc>>,
    pub metadata: String,
}

/// `<username, nonce>` pair stamped into the signed device cookie; the nonce
/// changes whenever a device cookie is reissued so stale cookies stop
/// matching a lockout record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DeviceCookie {
    pub username: String,
    pub nonce: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub password_hash: String,
    pub is_confirmed: bool,
    pub is_disabled: bool,
    pub is_admin: bool,
    pub is_system: bool,
    pub email: String,
    pub erasure_date: Option<DateTime<Utc>>,
    pub no_backup: bool,
}

impl User {
    #[must_use]
    pub fn removal_state(&self, now: DateTime<Utc>) -> RemovalState {
        match self.erasure_date {
            None => RemovalState::Present,
            Some(d) if d > now => RemovalState::TrashBin,
            Some(_) => RemovalState::Erasing,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
    pub created: DateTime<Utc>,
    pub pool_id: Option<Uuid>,
    pub erasure_date: Option<DateTime<Utc>>,
    pub no_backup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub scheduler: Event,
    pub agent: Option<Event>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UploadStatus {
    pub uploaded: bool,
    pub last_error: Option<FieldError>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "PascalCase")]
pub enum RevisionStatus {
    Unverified,
    Verifying,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum Health {
    #[sqlx(rename = "Warning")]
    #[serde(rename = "Warning")]
    Warn,
    #[sqlx(rename = "Error")]
    #[serde(rename = "Error")]
    Err,
    Ok,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub binaries: UploadStatus,
    pub seeds: UploadStatus,
    pub config: UploadStatus,
    pub status: RevisionStatus,
    pub health: Health,
    pub feedback: Option<Feedback>,
    pub fuzzer_id: Uuid,
    pub image_id: Uuid,
    pub is_verified: bool,
    pub created: DateTime<Utc>,
    pub last_start_date: Option<DateTime<Utc>>,
    pub last_stop_date: Option<DateTime<Utc>>,
    pub cpu_usage: i32,
    pub ram_usage: i32,
    pub tmpfs_size: i32,
    pub erasure_date: Option<DateTime<Utc>>,
    pub no_backup: bool,
}

impl Revision {
    /// Binaries are the only mandatory upload before a revision can be started.
    #[must_use]
    pub const fn has_uploaded_binaries(&self) -> bool {
        self.binaries.uploaded
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fuzzer {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub project_id: Uuid,
    pub engine: EngineId,
    pub lang: LangId,
    pub ci_integration: bool,
    pub created: DateTime<Utc>,
    pub active_revision: Option<Revision>,
    pub erasure_date: Option<DateTime<Utc>>,
    pub no_backup: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum StatisticsGroupBy {
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashesStatistics {
    pub id: Option<Uuid>,
    pub fuzzer_id: Uuid,
    pub revision_id: Uuid,
    pub date: DateTime<Utc>,
    pub total: i64,
    pub unique: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct LibFuzzerExact {
    pub execs_per_sec: i64,
    pub edge_cov: i64,
    pub feature_cov: i64,
    pub peak_rss: i64,
    pub execs_done: i64,
    pub corpus_entries: i64,
    pub corpus_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibFuzzerStatistics {
    pub id: Option<Uuid>,
    pub fuzzer_id: Uuid,
    pub revision_id: Uuid,
    pub date: DateTime<Utc>,
    pub work_time: i64,
    pub exact: LibFuzzerExact,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct AflExact {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AflStatistics {
    pub id: Option<Uuid>,
    pub fuzzer_id: Uuid,
    pub revision_id: Uuid,
    pub date: DateTime<Utc>,
    pub work_time: i64,
    pub exact: AflExact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crash {
    pub id: Uuid,
    pub created: DateTime<Utc>,
    pub fuzzer_id: Uuid,
    pub revision_id: Uuid,
    pub preview: String,
    pub input_id: Option<String>,
    pub input_hash: String,
    pub crash_type: String,
    pub brief: String,
    pub output: String,
    pub reproduced: bool,
    pub archived: bool,
    pub duplicate_count: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum IntegrationStatus {
    InProgress,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum IntegrationTypeId {
    Jira,
    Youtrack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationType {
    pub id: IntegrationTypeId,
    pub display_name: String,
    pub twoway: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
    pub id: Uuid,
    pub name: String,
    pub project_id: Uuid,
    pub config_id: String,
    pub integration_type: IntegrationTypeId,
    pub status: IntegrationStatus,
    pub last_error: Option<String>,
    /// Bumped on every update; a reconciler ignores callbacks carrying a
    /// stale revision so a slow external call can't clobber a newer edit.
    pub update_rev: String,
    pub enabled: bool,
    pub num_undelivered: i64,
}

/// Tagged integration-specific connection settings: tagged variants over an
/// open config blob, so the handler layer can match exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegrationConfig {
    Jira {
        url: String,
        project: String,
        username: String,
        password: String,
        issue_type: String,
        priority: Option<String>,
    },
    Youtrack {
        url: String,
        token: String,
        project: String,
    },
    Other,
}
