//! Abstract repository interfaces.
//!
//! Handlers and reconcilers in `gateway-server` depend on these traits, not
//! on `sqlx` directly, so unit tests can swap in the in-memory fakes under
//! [`crate::fake`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gateway_error::GatewayError;
use serde_json::Value;
use uuid::Uuid;

use crate::model::{
    AflStatistics, Cookie, Crash, CrashesStatistics, DeviceCookie, Engine, EngineId, Fuzzer,
    Health, Image, ImageStatus, ImageType, Integration, IntegrationStatus, IntegrationType,
    IntegrationTypeId, Lang, LangId, LibFuzzerStatistics, Paginator, Project, RemovalState,
    Revision, RevisionStatus, StatisticsGroupBy, User,
};

pub type Result<T> = std::result::Result<T, GatewayError>;

#[async_trait]
pub trait UnsentMessages: Send + Sync {
    async fn save(&self, queue: &str, payloads: &[Value]) -> Result<()>;
    async fn load_all(&self) -> Result<Vec<(String, Vec<Value>)>>;
}

#[async_trait]
pub trait Cookies: Send + Sync {
    async fn create(&self, user_id: Uuid, metadata: &str, ttl: chrono::Duration)
        -> Result<Cookie>;
    async fn get(&self, cookie_id: Uuid, user_id: Option<Uuid>) -> Result<Cookie>;
    async fn delete(&self, cookie: &Cookie) -> Result<()>;
    async fn list(&self, page: Paginator, user_id: Option<Uuid>) -> Result<Vec<Cookie>>;
}

#[async_trait]
pub trait Users: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn create(
        &self,
        name: &str,
        display_name: &str,
        password_hash: &str,
        is_confirmed: bool,
        is_disabled: bool,
        is_admin: bool,
        is_system: bool,
        email: &str,
    ) -> Result<User>;
    async fn delete(&self, user: &User) -> Result<()>;
    async fn get_by_id(&self, user_id: Uuid) -> Result<User>;
    async fn get_by_name(&self, name: &str) -> Result<User>;
    async fn list(
        &self,
        page: Paginator,
        removal_state: Option<RemovalState>,
    ) -> Result<Vec<User>>;
    async fn count(&self, removal_state: Option<RemovalState>) -> Result<i64>;
    async fn update(&self, user: &User) -> Result<()>;
}

#[async_trait]
pub trait UserLockout: Send + Sync {
    async fn add(&self, cookie: &DeviceCookie, exp: DateTime<Utc>) -> Result<()>;
    async fn has(&self, cookie: &DeviceCookie) -> Result<bool>;
    async fn remove_expired(&self) -> Result<u64>;
}

#[async_trait]
pub trait Langs: Send + Sync {
    async fn get_by_id(&self, id: LangId) -> Result<Lang>;
    async fn list(&self, page: Option<Paginator>) -> Result<Vec<Lang>>;
    async fn count(&self) -> Result<i64>;
    async fn create(&self, id: LangId, display_name: &str) -> Result<Lang>;
    async fn update(&self, lang: &Lang) -> Result<()>;
    async fn delete(&self, lang: &Lang) -> Result<()>;
}

#[async_trait]
pub trait Engines: Send + Sync {
    async fn get_by_id(&self, id: EngineId) -> Result<Engine>;
    async fn list(&self, page: Option<Paginator>, lang_id: Option<LangId>) -> Result<Vec<Engine>>;
    async fn count(&self, lang_id: Option<LangId>) -> Result<i64>;
    async fn create(
        &self,
        id: EngineId,
        display_name: &str,
        lang_ids: &[LangId],
    ) -> Result<Engine>;
    async fn update(&self, engine: &Engine) -> Result<()>;
    async fn delete(&self, engine: &Engine) -> Result<()>;
    async fn set_langs(&self, engine: &Engine, lang_ids: &[LangId]) -> Result<()>;
}

#[async_trait]
pub trait Images: Send + Sync {
    async fn get_by_id(&self, id: Uuid, project_id: Option<Uuid>) -> Result<Image>;
    async fn get_by_name(&self, name: &str, project_id: Option<Uuid>) -> Result<Image>;
    #[allow(clippy::too_many_arguments)]
    async fn list(
        &self,
        page: Paginator,
        project_id: Option<Uuid>,
        image_type: Option<ImageType>,
        statuses: Option<&[ImageStatus]>,
        engines: Option<&[EngineId]>,
    ) -> Result<Vec<Image>>;
    async fn count(
        &self,
        project_id: Option<Uuid>,
        image_type: Option<ImageType>,
        statuses: Option<&[ImageStatus]>,
        engines: Option<&[EngineId]>,
    ) -> Result<i64>;
    async fn create(
        &self,
        name: &str,
        description: &str,
        project_id: Option<Uuid>,
        engines: &[EngineId],
        status: ImageStatus,
    ) -> Result<Image>;
    async fn update(&self, image: &Image) -> Result<()>;
    async fn delete(&self, image: &Image) -> Result<()>;
    async fn set_engines(&self, image: &Image, engine_ids: &[EngineId]) -> Result<()>;
}

#[async_trait]
pub trait Projects: Send + Sync {
    async fn create(
        &self,
        name: &str,
        description: &str,
        owner_id: Uuid,
        pool_id: Option<Uuid>,
    ) -> Result<Project>;
    async fn delete(&self, project: &Project) -> Result<()>;
    async fn get_by_id(
        &self,
        project_id: Uuid,
        owner_id: Option<Uuid>,
        include_erasing: bool,
    ) -> Result<Project>;
    async fn get_by_name(&self, name: &str, owner_id: Uuid) -> Result<Project>;
    async fn list(
        &self,
        page: Paginator,
        owner_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
    ) -> Result<Vec<Project>>;
    async fn count(&self, owner_id: Option<Uuid>, removal_state: Option<RemovalState>)
        -> Result<i64>;
    async fn update(&self, project: &Project) -> Result<()>;
    /// Permanently removes trashed/erasing projects (and cascades to their
    /// fuzzers and revisions); returns the count of projects purged.
    async fn trashbin_empty(&self, owner_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait Fuzzers: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn create(
        &self,
        name: &str,
        description: &str,
        project_id: Uuid,
        engine: EngineId,
        lang: LangId,
        ci_integration: bool,
    ) -> Result<Fuzzer>;
    async fn delete(&self, fuzzer: &Fuzzer) -> Result<()>;
    async fn get_by_id(
        &self,
        fuzzer_id: Uuid,
        project_id: Option<Uuid>,
        include_erasing: bool,
    ) -> Result<Fuzzer>;
    async fn get_by_name(&self, name: &str, project_id: Uuid) -> Result<Fuzzer>;
    async fn list(
        &self,
        page: Option<Paginator>,
        project_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
    ) -> Result<Vec<Fuzzer>>;
    async fn count(
        &self,
        project_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
    ) -> Result<i64>;
    async fn update(&self, fuzzer: &Fuzzer) -> Result<()>;
    async fn trashbin_list(&self, page: Paginator, project_id: Uuid) -> Result<Vec<Fuzzer>>;
    async fn trashbin_count(&self, project_id: Uuid) -> Result<i64>;
    async fn trashbin_empty(&self, project_id: Uuid, fuzzer_id: Option<Uuid>) -> Result<u64>;
    /// Atomically points `fuzzer.active_revision` at `revision`, stamping
    /// `last_start_date`/`last_stop_date` when `start`/`restart` apply.
    async fn set_active_revision(
        &self,
        fuzzer: &Fuzzer,
        revision: Option<&Revision>,
        start: bool,
        restart: bool,
    ) -> Result<()>;
}

#[async_trait]
pub trait Revisions: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn create(
        &self,
        name: &str,
        description: &str,
        fuzzer_id: Uuid,
        image_id: Uuid,
        cpu_usage: i32,
        ram_usage: i32,
        tmpfs_size: i32,
    ) -> Result<Revision>;
    async fn delete(&self, revision: &Revision) -> Result<()>;
    async fn get_by_id(
        &self,
        revision_id: Uuid,
        fuzzer_id: Option<Uuid>,
        include_erasing: bool,
    ) -> Result<Revision>;
    async fn get_by_name(&self, name: &str, fuzzer_id: Uuid) -> Result<Revision>;
    async fn list(
        &self,
        page: Paginator,
        fuzzer_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
        statuses: Option<&[RevisionStatus]>,
        health: Option<&[Health]>,
    ) -> Result<Vec<Revision>>;
    async fn count(
        &self,
        fuzzer_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
        statuses: Option<&[RevisionStatus]>,
        health: Option<&[Health]>,
    ) -> Result<i64>;
    async fn update(&self, revision: &Revision) -> Result<()>;
    /// Forces every running/verifying revision in `project_id` to `Stopped`,
    /// used when a pool backing the project is deleted.
    async fn stop_all(&self, project_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait StatisticsCrashes: Send + Sync {
    async fn inc_crashes(
        &self,
        date: DateTime<Utc>,
        fuzzer_id: Uuid,
        revision_id: Uuid,
        new_total: i64,
        new_unique: i64,
    ) -> Result<()>;
}

#[async_trait]
pub trait StatisticsLibFuzzer: Send + Sync {
    async fn create(&self, stats: &LibFuzzerStatistics) -> Result<LibFuzzerStatistics>;
    async fn list(
        &self,
        page: Paginator,
        fuzzer_id: Option<Uuid>,
        revision_id: Option<Uuid>,
        group_by: StatisticsGroupBy,
        date_begin: DateTime<Utc>,
        date_end: Option<DateTime<Utc>>,
    ) -> Result<Vec<LibFuzzerStatistics>>;
}

#[async_trait]
pub trait StatisticsAfl: Send + Sync {
    async fn create(&self, stats: &AflStatistics) -> Result<AflStatistics>;
    async fn list(
        &self,
        page: Paginator,
        fuzzer_id: Option<Uuid>,
        revision_id: Option<Uuid>,
        group_by: StatisticsGroupBy,
        date_begin: DateTime<Utc>,
        date_end: Option<DateTime<Utc>>,
    ) -> Result<Vec<AflStatistics>>;
}

#[async_trait]
pub trait Crashes: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn create(
        &self,
        fuzzer_id: Uuid,
        revision_id: Uuid,
        preview: &str,
        input_id: Option<&str>,
        input_hash: &str,
        crash_type: &str,
        brief: &str,
        output: &str,
        reproduced: bool,
    ) -> Result<Crash>;
    async fn get(
        &self,
        crash_id: Uuid,
        fuzzer_id: Option<Uuid>,
        revision_id: Option<Uuid>,
    ) -> Result<Crash>;
    async fn update_archived(&self, crash_id: Uuid, fuzzer_id: Uuid, archived: bool)
        -> Result<bool>;
    async fn inc_duplicate_count(
        &self,
        fuzzer_id: Uuid,
        revision_id: Uuid,
        input_hash: &str,
    ) -> Result<Crash>;
    #[allow(clippy::too_many_arguments)]
    async fn list(
        &self,
        page: Paginator,
        fuzzer_id: Option<Uuid>,
        revision_id: Option<Uuid>,
        date_begin: Option<DateTime<Utc>>,
        date_end: Option<DateTime<Utc>>,
        archived: Option<bool>,
    ) -> Result<Vec<Crash>>;
    async fn count(
        &self,
        fuzzer_id: Option<Uuid>,
        revision_id: Option<Uuid>,
        date_begin: Option<DateTime<Utc>>,
        date_end: Option<DateTime<Utc>>,
        archived: Option<bool>,
    ) -> Result<i64>;
}

#[async_trait]
pub trait IntegrationTypes: Send + Sync {
    async fn get_by_id(&self, id: IntegrationTypeId) -> Result<IntegrationType>;
    async fn list(&self, page: Option<Paginator>) -> Result<Vec<IntegrationType>>;
}

#[async_trait]
pub trait Integrations: Send + Sync {
    async fn get_by_id(&self, id: Uuid, project_id: Option<Uuid>) -> Result<Integration>;
    async fn get_by_name(&self, name: &str, project_id: Uuid) -> Result<Integration>;
    async fn get_by_config_id(&self, config_id: &str) -> Result<Integration>;
    async fn list(
        &self,
        page: Option<Paginator>,
        project_id: Option<Uuid>,
        types: Option<&[IntegrationTypeId]>,
    ) -> Result<Vec<Integration>>;
    async fn count(&self, project_id: Option<Uuid>) -> Result<i64>;
    #[allow(clippy::too_many_arguments)]
    async fn create(
        &self,
        name: &str,
        project_id: Uuid,
        config_id: &str,
        integration_type: IntegrationTypeId,
        status: IntegrationStatus,
    ) -> Result<Integration>;
    async fn update(&self, integration: &Integration) -> Result<()>;
    async fn delete(&self, integration: &Integration) -> Result<()>;
}

/// Aggregates every repository behind one handle, the way `gateway-server`
/// threads a single `Arc<dyn Database>` through its router state.
pub trait Database: Send + Sync {
    fn unsent_messages(&self) -> &dyn UnsentMessages;
    fn cookies(&self) -> &dyn Cookies;
    fn users(&self) -> &dyn Users;
    fn lockout(&self) -> &dyn UserLockout;
    fn langs(&self) -> &dyn Langs;
    fn engines(&self) -> &dyn Engines;
    fn images(&self) -> &dyn Images;
    fn projects(&self) -> &dyn Projects;
    fn fuzzers(&self) -> &dyn Fuzzers;
    fn revisions(&self) -> &dyn Revisions;
    fn statistics_crashes(&self) -> &dyn StatisticsCrashes;
    fn statistics_libfuzzer(&self) -> &dyn StatisticsLibFuzzer;
    fn statistics_afl(&self) -> &dyn StatisticsAfl;
    fn crashes(&self) -> &dyn Crashes;
    fn integration_types(&self) -> &dyn IntegrationTypes;
    fn integrations(&self) -> &dyn Integrations;
}
