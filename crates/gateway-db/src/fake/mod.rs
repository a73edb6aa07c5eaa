//! In-memory [`Database`] implementation for unit tests.
//!
//! Mirrors the `postgres` backend's semantics (soft-delete via
//! `erasure_date`, name-uniqueness checks, trash-bin cascades) over
//! [`dashmap::DashMap`] instead of a pool, so handler and reconciler tests
//! in `gateway-server` don't need a running Postgres instance.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use gateway_error::{ErrorCode, GatewayError};
use serde_json::Value;
use uuid::Uuid;

use crate::model::{
    AflStatistics, Cookie, Crash, DeviceCookie, Engine, EngineId, Fuzzer, Health, Image,
    ImageStatus, ImageType, Integration, IntegrationStatus, IntegrationType, IntegrationTypeId,
    Lang, LangId, LibFuzzerStatistics, Paginator, Project, RemovalState, Revision, RevisionStatus,
    StatisticsGroupBy, User,
};
use crate::traits::{
    Cookies, Crashes, Database, Engines, Fuzzers, Images, IntegrationTypes, Integrations, Langs,
    Projects, Result, Revisions, StatisticsAfl, StatisticsCrashes, StatisticsLibFuzzer,
    UnsentMessages, UserLockout, Users,
};

fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Aggregates every in-memory repository, the same shape `PgDatabase` gives
/// the Postgres backend.
#[derive(Default)]
pub struct InMemoryDatabase {
    unsent_messages: InMemoryUnsentMessages,
    cookies: InMemoryCookies,
    users: InMemoryUsers,
    lockout: InMemoryUserLockout,
    langs: InMemoryLangs,
    engines: InMemoryEngines,
    images: InMemoryImages,
    projects: InMemoryProjects,
    fuzzers: InMemoryFuzzers,
    revisions: InMemoryRevisions,
    statistics_crashes: InMemoryStatisticsCrashes,
    statistics_libfuzzer: InMemoryStatisticsLibFuzzer,
    statistics_afl: InMemoryStatisticsAfl,
    crashes: InMemoryCrashes,
    integration_types: InMemoryIntegrationTypes,
    integrations: InMemoryIntegrations,
}

impl InMemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Database for InMemoryDatabase {
    fn unsent_messages(&self) -> &dyn UnsentMessages {
        &self.unsent_messages
    }

    fn cookies(&self) -> &dyn Cookies {
        &self.cookies
    }

    fn users(&self) -> &dyn Users {
        &self.users
    }

    fn lockout(&self) -> &dyn UserLockout {
        &self.lockout
    }

    fn langs(&self) -> &dyn Langs {
        &self.langs
    }

    fn engines(&self) -> &dyn Engines {
        &self.engines
    }

    fn images(&self) -> &dyn Images {
        &self.images
    }

    fn projects(&self) -> &dyn Projects {
        &self.projects
    }

    fn fuzzers(&self) -> &dyn Fuzzers {
        &self.fuzzers
    }

    fn revisions(&self) -> &dyn Revisions {
        &self.revisions
    }

    fn statistics_crashes(&self) -> &dyn StatisticsCrashes {
        &self.statistics_crashes
    }

    fn statistics_libfuzzer(&self) -> &dyn StatisticsLibFuzzer {
        &self.statistics_libfuzzer
    }

    fn statistics_afl(&self) -> &dyn StatisticsAfl {
        &self.statistics_afl
    }

    fn crashes(&self) -> &dyn Crashes {
        &self.crashes
    }

    fn integration_types(&self) -> &dyn IntegrationTypes {
        &self.integration_types
    }

    fn integrations(&self) -> &dyn Integrations {
        &self.integrations
    }
}

/// Standalone in-memory [`UnsentMessages`] store, exposed separately from
/// [`InMemoryDatabase`] since `gateway_mq::Producers` takes its own handle
/// to this trait rather than reaching through a [`Database`].
#[derive(Default)]
pub struct InMemoryUnsentMessages {
    queues: DashMap<String, Vec<Value>>,
}

#[async_trait]
impl UnsentMessages for InMemoryUnsentMessages {
    async fn save(&self, queue: &str, payloads: &[Value]) -> Result<()> {
        self.queues
            .entry(queue.to_string())
            .or_default()
            .extend_from_slice(payloads);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<(String, Vec<Value>)>> {
        let drained: Vec<(String, Vec<Value>)> = self
            .queues
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        self.queues.clear();
        Ok(drained)
    }
}

#[derive(Default)]
struct InMemoryCookies {
    rows: DashMap<Uuid, Cookie>,
}

#[async_trait]
impl Cookies for InMemoryCookies {
    async fn create(&self, user_id: Uuid, metadata: &str, ttl: chrono::Duration) -> Result<Cookie> {
        let cookie = Cookie {
            id: Uuid::new_v4(),
            user_id,
            expires: Some(now() + ttl),
            metadata: metadata.to_string(),
        };
        self.rows.insert(cookie.id, cookie.clone());
        Ok(cookie)
    }

    async fn get(&self, cookie_id: Uuid, user_id: Option<Uuid>) -> Result<Cookie> {
        self.rows
            .get(&cookie_id)
            .map(|c| c.clone())
            .filter(|c| user_id.is_none_or(|u| c.user_id == u))
            .ok_or_else(|| GatewayError::code(ErrorCode::SessionNotFound))
    }

    async fn delete(&self, cookie: &Cookie) -> Result<()> {
        self.rows.remove(&cookie.id);
        Ok(())
    }

    async fn list(&self, page: Paginator, user_id: Option<Uuid>) -> Result<Vec<Cookie>> {
        let mut rows: Vec<Cookie> = self
            .rows
            .iter()
            .map(|e| e.value().clone())
            .filter(|c| user_id.is_none_or(|u| c.user_id == u))
            .collect();
        rows.sort_by_key(|c| c.id);
        Ok(paginate(rows, page))
    }
}

fn paginate<T>(rows: Vec<T>, page: Paginator) -> Vec<T> {
    let offset = usize::try_from(page.offset).unwrap_or(0);
    let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
    rows.into_iter().skip(offset).take(limit).collect()
}

#[derive(Default)]
struct InMemoryUsers {
    rows: DashMap<Uuid, User>,
}

#[async_trait]
impl Users for InMemoryUsers {
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
    ) -> Result<User> {
        if self.rows.iter().any(|e| e.value().name == name) {
            return Err(GatewayError::code(ErrorCode::UserExists));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            display_name: display_name.to_string(),
            password_hash: password_hash.to_string(),
            is_confirmed,
            is_disabled,
            is_admin,
            is_system,
            email: email.to_string(),
            erasure_date: None,
            no_backup: false,
        };
        self.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, user: &User) -> Result<()> {
        self.rows.remove(&user.id);
        Ok(())
    }

    async fn get_by_id(&self, user_id: Uuid) -> Result<User> {
        self.rows
            .get(&user_id)
            .map(|u| u.clone())
            .ok_or_else(|| GatewayError::code(ErrorCode::UserNotFound))
    }

    async fn get_by_name(&self, name: &str) -> Result<User> {
        self.rows
            .iter()
            .map(|e| e.value().clone())
            .find(|u| u.name == name)
            .ok_or_else(|| GatewayError::code(ErrorCode::UserNotFound))
    }

    async fn list(&self, page: Paginator, removal_state: Option<RemovalState>) -> Result<Vec<User>> {
        let now = now();
        let mut rows: Vec<User> = self
            .rows
            .iter()
            .map(|e| e.value().clone())
            .filter(|u| removal_state.is_none_or(|s| s.matches(u.erasure_date, now)))
            .collect();
        rows.sort_by_key(|u| u.id);
        Ok(paginate(rows, page))
    }

    async fn count(&self, removal_state: Option<RemovalState>) -> Result<i64> {
        Ok(self
            .list(
                Paginator {
                    offset: 0,
                    limit: i64::MAX,
                },
                removal_state,
            )
            .await?
            .len() as i64)
    }

    async fn update(&self, user: &User) -> Result<()> {
        self.rows.insert(user.id, user.clone());
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryUserLockout {
    rows: DashMap<DeviceCookie, DateTime<Utc>>,
}

#[async_trait]
impl UserLockout for InMemoryUserLockout {
    async fn add(&self, cookie: &DeviceCookie, exp: DateTime<Utc>) -> Result<()> {
        self.rows.insert(cookie.clone(), exp);
        Ok(())
    }

    async fn has(&self, cookie: &DeviceCookie) -> Result<bool> {
        Ok(self.rows.get(cookie).is_some_and(|exp| *exp > now()))
    }

    async fn remove_expired(&self) -> Result<u64> {
        let now = now();
        let expired: Vec<DeviceCookie> = self
            .rows
            .iter()
            .filter(|e| *e.value() <= now)
            .map(|e| e.key().clone())
            .collect();
        let count = expired.len() as u64;
        for cookie in expired {
            self.rows.remove(&cookie);
        }
        Ok(count)
    }
}

#[derive(Default)]
struct InMemoryLangs {
    rows: DashMap<LangId, Lang>,
}

#[async_trait]
impl Langs for InMemoryLangs {
    async fn get_by_id(&self, id: LangId) -> Result<Lang> {
        self.rows
            .get(&id)
            .map(|l| l.clone())
            .ok_or_else(|| GatewayError::code(ErrorCode::LangNotFound))
    }

    async fn list(&self, page: Option<Paginator>) -> Result<Vec<Lang>> {
        let page = page.unwrap_or(Paginator {
            offset: 0,
            limit: i64::MAX,
        });
        let mut rows: Vec<Lang> = self.rows.iter().map(|e| e.value().clone()).collect();
        rows.sort_by_key(|l| l.id);
        Ok(paginate(rows, page))
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.rows.len() as i64)
    }

    async fn create(&self, id: LangId, display_name: &str) -> Result<Lang> {
        if self.rows.contains_key(&id) {
            return Err(GatewayError::code(ErrorCode::LangExists));
        }
        let lang = Lang {
            id,
            display_name: display_name.to_string(),
        };
        self.rows.insert(id, lang.clone());
        Ok(lang)
    }

    async fn update(&self, lang: &Lang) -> Result<()> {
        self.rows.insert(lang.id, lang.clone());
        Ok(())
    }

    async fn delete(&self, lang: &Lang) -> Result<()> {
        self.rows.remove(&lang.id);
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryEngines {
    rows: DashMap<EngineId, Engine>,
}

#[async_trait]
impl Engines for InMemoryEngines {
    async fn get_by_id(&self, id: EngineId) -> Result<Engine> {
        self.rows
            .get(&id)
            .map(|e| e.clone())
            .ok_or_else(|| GatewayError::code(ErrorCode::EngineNotFound))
    }

    async fn list(&self, page: Option<Paginator>, lang_id: Option<LangId>) -> Result<Vec<Engine>> {
        let page = page.unwrap_or(Paginator {
            offset: 0,
            limit: i64::MAX,
        });
        let mut rows: Vec<Engine> = self
            .rows
            .iter()
            .map(|e| e.value().clone())
            .filter(|e| lang_id.is_none_or(|l| e.langs.contains(&l)))
            .collect();
        rows.sort_by_key(|e| e.id.clone());
        Ok(paginate(rows, page))
    }

    async fn count(&self, lang_id: Option<LangId>) -> Result<i64> {
        Ok(self.list(None, lang_id).await?.len() as i64)
    }

    async fn create(&self, id: EngineId, display_name: &str, lang_ids: &[LangId]) -> Result<Engine> {
        if self.rows.contains_key(&id) {
            return Err(GatewayError::code(ErrorCode::EngineExists));
        }
        let engine = Engine {
            id: id.clone(),
            display_name: display_name.to_string(),
            langs: lang_ids.to_vec(),
        };
        self.rows.insert(id, engine.clone());
        Ok(engine)
    }

    async fn update(&self, engine: &Engine) -> Result<()> {
        self.rows.insert(engine.id.clone(), engine.clone());
        Ok(())
    }

    async fn delete(&self, engine: &Engine) -> Result<()> {
        self.rows.remove(&engine.id);
        Ok(())
    }

    async fn set_langs(&self, engine: &Engine, lang_ids: &[LangId]) -> Result<()> {
        if let Some(mut e) = self.rows.get_mut(&engine.id) {
            e.langs = lang_ids.to_vec();
        }
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryImages {
    rows: DashMap<Uuid, Image>,
}

#[async_trait]
impl Images for InMemoryImages {
    async fn get_by_id(&self, id: Uuid, project_id: Option<Uuid>) -> Result<Image> {
        self.rows
            .get(&id)
            .map(|i| i.clone())
            .filter(|i| project_id.is_none_or(|p| i.project_id == Some(p) || i.project_id.is_none()))
            .ok_or_else(|| GatewayError::code(ErrorCode::ImageNotFound))
    }

    async fn get_by_name(&self, name: &str, project_id: Option<Uuid>) -> Result<Image> {
        self.rows
            .iter()
            .map(|e| e.value().clone())
            .find(|i| i.name == name && i.project_id == project_id)
            .ok_or_else(|| GatewayError::code(ErrorCode::ImageNotFound))
    }

    async fn list(
        &self,
        page: Paginator,
        project_id: Option<Uuid>,
        image_type: Option<ImageType>,
        statuses: Option<&[ImageStatus]>,
        engines: Option<&[EngineId]>,
    ) -> Result<Vec<Image>> {
        let mut rows: Vec<Image> = self
            .rows
            .iter()
            .map(|e| e.value().clone())
            .filter(|i| project_id.is_none_or(|p| i.project_id == Some(p) || i.project_id.is_none()))
            .filter(|i| {
                image_type.is_none_or(|t| match t {
                    ImageType::Builtin => i.project_id.is_none(),
                    ImageType::Custom => i.project_id.is_some(),
                })
            })
            .filter(|i| statuses.is_none_or(|s| s.contains(&i.status)))
            .filter(|i| engines.is_none_or(|e| i.engines.iter().any(|x| e.contains(x))))
            .collect();
        rows.sort_by_key(|i| i.name.clone());
        Ok(paginate(rows, page))
    }

    async fn count(
        &self,
        project_id: Option<Uuid>,
        image_type: Option<ImageType>,
        statuses: Option<&[ImageStatus]>,
        engines: Option<&[EngineId]>,
    ) -> Result<i64> {
        Ok(self
            .list(
                Paginator {
                    offset: 0,
                    limit: i64::MAX,
                },
                project_id,
                image_type,
                statuses,
                engines,
            )
            .await?
            .len() as i64)
    }

    async fn create(
        &self,
        name: &str,
        description: &str,
        project_id: Option<Uuid>,
        engines: &[EngineId],
        status: ImageStatus,
    ) -> Result<Image> {
        let image = Image {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            engines: engines.to_vec(),
            status,
            project_id,
        };
        self.rows.insert(image.id, image.clone());
        Ok(image)
    }

    async fn update(&self, image: &Image) -> Result<()> {
        self.rows.insert(image.id, image.clone());
        Ok(())
    }

    async fn delete(&self, image: &Image) -> Result<()> {
        self.rows.remove(&image.id);
        Ok(())
    }

    async fn set_engines(&self, image: &Image, engine_ids: &[EngineId]) -> Result<()> {
        if let Some(mut i) = self.rows.get_mut(&image.id) {
            i.engines = engine_ids.to_vec();
        }
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryProjects {
    rows: DashMap<Uuid, Project>,
}

#[async_trait]
impl Projects for InMemoryProjects {
    async fn create(
        &self,
        name: &str,
        description: &str,
        owner_id: Uuid,
        pool_id: Option<Uuid>,
    ) -> Result<Project> {
        if self
            .rows
            .iter()
            .any(|e| e.value().owner_id == owner_id && e.value().name == name)
        {
            return Err(GatewayError::code(ErrorCode::ProjectExists));
        }
        let project = Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            owner_id,
            created: now(),
            pool_id,
            erasure_date: None,
            no_backup: false,
        };
        self.rows.insert(project.id, project.clone());
        Ok(project)
    }

    async fn delete(&self, project: &Project) -> Result<()> {
        self.rows.remove(&project.id);
        Ok(())
    }

    async fn get_by_id(
        &self,
        project_id: Uuid,
        owner_id: Option<Uuid>,
        include_erasing: bool,
    ) -> Result<Project> {
        let now = now();
        self.rows
            .get(&project_id)
            .map(|p| p.clone())
            .filter(|p| owner_id.is_none_or(|o| p.owner_id == o))
            .filter(|p| include_erasing || RemovalState::Visible.matches(p.erasure_date, now))
            .ok_or_else(|| GatewayError::code(ErrorCode::ProjectNotFound))
    }

    async fn get_by_name(&self, name: &str, owner_id: Uuid) -> Result<Project> {
        self.rows
            .iter()
            .map(|e| e.value().clone())
            .find(|p| p.owner_id == owner_id && p.name == name)
            .ok_or_else(|| GatewayError::code(ErrorCode::ProjectNotFound))
    }

    async fn list(
        &self,
        page: Paginator,
        owner_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
    ) -> Result<Vec<Project>> {
        let now = now();
        let mut rows: Vec<Project> = self
            .rows
            .iter()
            .map(|e| e.value().clone())
            .filter(|p| owner_id.is_none_or(|o| p.owner_id == o))
            .filter(|p| removal_state.is_none_or(|s| s.matches(p.erasure_date, now)))
            .collect();
        rows.sort_by_key(|p| p.id);
        Ok(paginate(rows, page))
    }

    async fn count(
        &self,
        owner_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
    ) -> Result<i64> {
        Ok(self
            .list(
                Paginator {
                    offset: 0,
                    limit: i64::MAX,
                },
                owner_id,
                removal_state,
            )
            .await?
            .len() as i64)
    }

    async fn update(&self, project: &Project) -> Result<()> {
        self.rows.insert(project.id, project.clone());
        Ok(())
    }

    async fn trashbin_empty(&self, owner_id: Uuid) -> Result<u64> {
        let now = now();
        let expired: Vec<Uuid> = self
            .rows
            .iter()
            .filter(|e| e.value().owner_id == owner_id)
            .filter(|e| RemovalState::TrashBin.matches(e.value().erasure_date, now) || {
                e.value().erasure_date.is_some_and(|d| d <= now)
            })
            .map(|e| *e.key())
            .collect();
        let count = expired.len() as u64;
        for id in expired {
            self.rows.remove(&id);
        }
        Ok(count)
    }
}

#[derive(Default)]
struct InMemoryFuzzers {
    rows: DashMap<Uuid, Fuzzer>,
}

#[async_trait]
impl Fuzzers for InMemoryFuzzers {
    async fn create(
        &self,
        name: &str,
        description: &str,
        project_id: Uuid,
        engine: EngineId,
        lang: LangId,
        ci_integration: bool,
    ) -> Result<Fuzzer> {
        if self
            .rows
            .iter()
            .any(|e| e.value().project_id == project_id && e.value().name == name)
        {
            return Err(GatewayError::code(ErrorCode::FuzzerExists));
        }
        let fuzzer = Fuzzer {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            project_id,
            engine,
            lang,
            ci_integration,
            created: now(),
            active_revision: None,
            erasure_date: None,
            no_backup: false,
        };
        self.rows.insert(fuzzer.id, fuzzer.clone());
        Ok(fuzzer)
    }

    async fn delete(&self, fuzzer: &Fuzzer) -> Result<()> {
        self.rows.remove(&fuzzer.id);
        Ok(())
    }

    async fn get_by_id(
        &self,
        fuzzer_id: Uuid,
        project_id: Option<Uuid>,
        include_erasing: bool,
    ) -> Result<Fuzzer> {
        let now = now();
        self.rows
            .get(&fuzzer_id)
            .map(|f| f.clone())
            .filter(|f| project_id.is_none_or(|p| f.project_id == p))
            .filter(|f| include_erasing || RemovalState::Visible.matches(f.erasure_date, now))
            .ok_or_else(|| GatewayError::code(ErrorCode::FuzzerNotFound))
    }

    async fn get_by_name(&self, name: &str, project_id: Uuid) -> Result<Fuzzer> {
        self.rows
            .iter()
            .map(|e| e.value().clone())
            .find(|f| f.project_id == project_id && f.name == name)
            .ok_or_else(|| GatewayError::code(ErrorCode::FuzzerNotFound))
    }

    async fn list(
        &self,
        page: Option<Paginator>,
        project_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
    ) -> Result<Vec<Fuzzer>> {
        let page = page.unwrap_or(Paginator {
            offset: 0,
            limit: i64::MAX,
        });
        let now = now();
        let mut rows: Vec<Fuzzer> = self
            .rows
            .iter()
            .map(|e| e.value().clone())
            .filter(|f| project_id.is_none_or(|p| f.project_id == p))
            .filter(|f| removal_state.is_none_or(|s| s.matches(f.erasure_date, now)))
            .collect();
        rows.sort_by_key(|f| f.id);
        Ok(paginate(rows, page))
    }

    async fn count(
        &self,
        project_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
    ) -> Result<i64> {
        Ok(self.list(None, project_id, removal_state).await?.len() as i64)
    }

    async fn update(&self, fuzzer: &Fuzzer) -> Result<()> {
        self.rows.insert(fuzzer.id, fuzzer.clone());
        Ok(())
    }

    async fn trashbin_list(&self, page: Paginator, project_id: Uuid) -> Result<Vec<Fuzzer>> {
        self.list(Some(page), Some(project_id), Some(RemovalState::TrashBin))
            .await
    }

    async fn trashbin_count(&self, project_id: Uuid) -> Result<i64> {
        self.count(Some(project_id), Some(RemovalState::TrashBin)).await
    }

    async fn trashbin_empty(&self, project_id: Uuid, fuzzer_id: Option<Uuid>) -> Result<u64> {
        let now = now();
        let expired: Vec<Uuid> = self
            .rows
            .iter()
            .filter(|e| e.value().project_id == project_id)
            .filter(|e| fuzzer_id.is_none_or(|id| *e.key() == id))
            .filter(|e| e.value().erasure_date.is_some_and(|d| d <= now) || {
                RemovalState::TrashBin.matches(e.value().erasure_date, now)
            })
            .map(|e| *e.key())
            .collect();
        let count = expired.len() as u64;
        for id in expired {
            self.rows.remove(&id);
        }
        Ok(count)
    }

    async fn set_active_revision(
        &self,
        fuzzer: &Fuzzer,
        revision: Option<&Revision>,
        start: bool,
        restart: bool,
    ) -> Result<()> {
        if let Some(mut f) = self.rows.get_mut(&fuzzer.id) {
            let mut revision = revision.cloned();
            if let Some(rev) = revision.as_mut() {
                if start || restart {
                    rev.status = RevisionStatus::Verifying;
                    rev.last_start_date = Some(now());
                }
            }
            f.active_revision = revision;
        }
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryRevisions {
    rows: DashMap<Uuid, Revision>,
}

#[async_trait]
impl Revisions for InMemoryRevisions {
    async fn create(
        &self,
        name: &str,
        description: &str,
        fuzzer_id: Uuid,
        image_id: Uuid,
        cpu_usage: i32,
        ram_usage: i32,
        tmpfs_size: i32,
    ) -> Result<Revision> {
        let revision = Revision {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            binaries: Default::default(),
            seeds: Default::default(),
            config: Default::default(),
            status: RevisionStatus::Unverified,
            health: Health::Ok,
            feedback: None,
            fuzzer_id,
            image_id,
            is_verified: false,
            created: now(),
            last_start_date: None,
            last_stop_date: None,
            cpu_usage,
            ram_usage,
            tmpfs_size,
            erasure_date: None,
            no_backup: false,
        };
        self.rows.insert(revision.id, revision.clone());
        Ok(revision)
    }

    async fn delete(&self, revision: &Revision) -> Result<()> {
        self.rows.remove(&revision.id);
        Ok(())
    }

    async fn get_by_id(
        &self,
        revision_id: Uuid,
        fuzzer_id: Option<Uuid>,
        include_erasing: bool,
    ) -> Result<Revision> {
        let now = now();
        self.rows
            .get(&revision_id)
            .map(|r| r.clone())
            .filter(|r| fuzzer_id.is_none_or(|f| r.fuzzer_id == f))
            .filter(|r| include_erasing || RemovalState::Visible.matches(r.erasure_date, now))
            .ok_or_else(|| GatewayError::code(ErrorCode::RevisionNotFound))
    }

    async fn get_by_name(&self, name: &str, fuzzer_id: Uuid) -> Result<Revision> {
        self.rows
            .iter()
            .map(|e| e.value().clone())
            .find(|r| r.fuzzer_id == fuzzer_id && r.name == name)
            .ok_or_else(|| GatewayError::code(ErrorCode::RevisionNotFound))
    }

    async fn list(
        &self,
        page: Paginator,
        fuzzer_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
        statuses: Option<&[RevisionStatus]>,
        health: Option<&[Health]>,
    ) -> Result<Vec<Revision>> {
        let now = now();
        let mut rows: Vec<Revision> = self
            .rows
            .iter()
            .map(|e| e.value().clone())
            .filter(|r| fuzzer_id.is_none_or(|f| r.fuzzer_id == f))
            .filter(|r| removal_state.is_none_or(|s| s.matches(r.erasure_date, now)))
            .filter(|r| statuses.is_none_or(|s| s.contains(&r.status)))
            .filter(|r| health.is_none_or(|h| h.contains(&r.health)))
            .collect();
        rows.sort_by_key(|r| r.id);
        Ok(paginate(rows, page))
    }

    async fn count(
        &self,
        fuzzer_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
        statuses: Option<&[RevisionStatus]>,
        health: Option<&[Health]>,
    ) -> Result<i64> {
        Ok(self
            .list(
                Paginator {
                    offset: 0,
                    limit: i64::MAX,
                },
                fuzzer_id,
                removal_state,
                statuses,
                health,
            )
            .await?
            .len() as i64)
    }

    async fn update(&self, revision: &Revision) -> Result<()> {
        self.rows.insert(revision.id, revision.clone());
        Ok(())
    }

    async fn stop_all(&self, _project_id: Uuid) -> Result<u64> {
        let mut count = 0u64;
        for mut entry in self.rows.iter_mut() {
            if matches!(
                entry.value().status,
                RevisionStatus::Running | RevisionStatus::Verifying
            ) {
                entry.value_mut().status = RevisionStatus::Stopped;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[derive(Default)]
struct InMemoryStatisticsCrashes {
    totals: DashMap<(Uuid, Uuid, DateTime<Utc>), (i64, i64)>,
}

#[async_trait]
impl StatisticsCrashes for InMemoryStatisticsCrashes {
    async fn inc_crashes(
        &self,
        date: DateTime<Utc>,
        fuzzer_id: Uuid,
        revision_id: Uuid,
        new_total: i64,
        new_unique: i64,
    ) -> Result<()> {
        let mut entry = self
            .totals
            .entry((fuzzer_id, revision_id, date.date_naive().and_time(chrono::NaiveTime::MIN).and_utc()))
            .or_insert((0, 0));
        entry.0 += new_total;
        entry.1 += new_unique;
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryStatisticsLibFuzzer {
    rows: DashMap<Uuid, LibFuzzerStatistics>,
}

#[async_trait]
impl StatisticsLibFuzzer for InMemoryStatisticsLibFuzzer {
    async fn create(&self, stats: &LibFuzzerStatistics) -> Result<LibFuzzerStatistics> {
        let mut stats = stats.clone();
        stats.id = Some(Uuid::new_v4());
        self.rows.insert(stats.id.unwrap(), stats.clone());
        Ok(stats)
    }

    async fn list(
        &self,
        page: Paginator,
        fuzzer_id: Option<Uuid>,
        revision_id: Option<Uuid>,
        _group_by: StatisticsGroupBy,
        date_begin: DateTime<Utc>,
        date_end: Option<DateTime<Utc>>,
    ) -> Result<Vec<LibFuzzerStatistics>> {
        let mut rows: Vec<LibFuzzerStatistics> = self
            .rows
            .iter()
            .map(|e| e.value().clone())
            .filter(|s| fuzzer_id.is_none_or(|f| s.fuzzer_id == f))
            .filter(|s| revision_id.is_none_or(|r| s.revision_id == r))
            .filter(|s| s.date >= date_begin)
            .filter(|s| date_end.is_none_or(|end| s.date <= end))
            .collect();
        rows.sort_by_key(|s| s.date);
        Ok(paginate(rows, page))
    }
}

#[derive(Default)]
struct InMemoryStatisticsAfl {
    rows: DashMap<Uuid, AflStatistics>,
}

#[async_trait]
impl StatisticsAfl for InMemoryStatisticsAfl {
    async fn create(&self, stats: &AflStatistics) -> Result<AflStatistics> {
        let mut stats = stats.clone();
        stats.id = Some(Uuid::new_v4());
        self.rows.insert(stats.id.unwrap(), stats.clone());
        Ok(stats)
    }

    async fn list(
        &self,
        page: Paginator,
        fuzzer_id: Option<Uuid>,
        revision_id: Option<Uuid>,
        _group_by: StatisticsGroupBy,
        date_begin: DateTime<Utc>,
        date_end: Option<DateTime<Utc>>,
    ) -> Result<Vec<AflStatistics>> {
        let mut rows: Vec<AflStatistics> = self
            .rows
            .iter()
            .map(|e| e.value().clone())
            .filter(|s| fuzzer_id.is_none_or(|f| s.fuzzer_id == f))
            .filter(|s| revision_id.is_none_or(|r| s.revision_id == r))
            .filter(|s| s.date >= date_begin)
            .filter(|s| date_end.is_none_or(|end| s.date <= end))
            .collect();
        rows.sort_by_key(|s| s.date);
        Ok(paginate(rows, page))
    }
}

#[derive(Default)]
struct InMemoryCrashes {
    rows: DashMap<Uuid, Crash>,
    next_seq: AtomicI64,
}

#[async_trait]
impl Crashes for InMemoryCrashes {
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
    ) -> Result<Crash> {
        let crash = Crash {
            id: Uuid::new_v4(),
            created: now(),
            fuzzer_id,
            revision_id,
            preview: preview.to_string(),
            input_id: input_id.map(str::to_string),
            input_hash: input_hash.to_string(),
            crash_type: crash_type.to_string(),
            brief: brief.to_string(),
            output: output.to_string(),
            reproduced,
            archived: false,
            duplicate_count: 0,
        };
        self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.rows.insert(crash.id, crash.clone());
        Ok(crash)
    }

    async fn get(
        &self,
        crash_id: Uuid,
        fuzzer_id: Option<Uuid>,
        revision_id: Option<Uuid>,
    ) -> Result<Crash> {
        self.rows
            .get(&crash_id)
            .map(|c| c.clone())
            .filter(|c| fuzzer_id.is_none_or(|f| c.fuzzer_id == f))
            .filter(|c| revision_id.is_none_or(|r| c.revision_id == r))
            .ok_or_else(|| GatewayError::code(ErrorCode::CrashNotFound))
    }

    async fn update_archived(
        &self,
        crash_id: Uuid,
        fuzzer_id: Uuid,
        archived: bool,
    ) -> Result<bool> {
        match self.rows.get_mut(&crash_id) {
            Some(mut c) if c.fuzzer_id == fuzzer_id => {
                c.archived = archived;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn inc_duplicate_count(
        &self,
        fuzzer_id: Uuid,
        revision_id: Uuid,
        input_hash: &str,
    ) -> Result<Crash> {
        let mut found = self
            .rows
            .iter_mut()
            .find(|e| {
                e.value().fuzzer_id == fuzzer_id
                    && e.value().revision_id == revision_id
                    && e.value().input_hash == input_hash
            })
            .ok_or_else(|| GatewayError::code(ErrorCode::CrashNotFound))?;
        found.value_mut().duplicate_count += 1;
        Ok(found.value().clone())
    }

    async fn list(
        &self,
        page: Paginator,
        fuzzer_id: Option<Uuid>,
        revision_id: Option<Uuid>,
        date_begin: Option<DateTime<Utc>>,
        date_end: Option<DateTime<Utc>>,
        archived: Option<bool>,
    ) -> Result<Vec<Crash>> {
        let mut rows: Vec<Crash> = self
            .rows
            .iter()
            .map(|e| e.value().clone())
            .filter(|c| fuzzer_id.is_none_or(|f| c.fuzzer_id == f))
            .filter(|c| revision_id.is_none_or(|r| c.revision_id == r))
            .filter(|c| date_begin.is_none_or(|begin| c.created >= begin))
            .filter(|c| date_end.is_none_or(|end| c.created <= end))
            .filter(|c| archived.is_none_or(|a| c.archived == a))
            .collect();
        rows.sort_by_key(|c| std::cmp::Reverse(c.created));
        Ok(paginate(rows, page))
    }

    async fn count(
        &self,
        fuzzer_id: Option<Uuid>,
        revision_id: Option<Uuid>,
        date_begin: Option<DateTime<Utc>>,
        date_end: Option<DateTime<Utc>>,
        archived: Option<bool>,
    ) -> Result<i64> {
        Ok(self
            .list(
                Paginator {
                    offset: 0,
                    limit: i64::MAX,
                },
                fuzzer_id,
                revision_id,
                date_begin,
                date_end,
                archived,
            )
            .await?
            .len() as i64)
    }
}

#[derive(Default)]
struct InMemoryIntegrationTypes {
    rows: DashMap<IntegrationTypeId, IntegrationType>,
}

#[async_trait]
impl IntegrationTypes for InMemoryIntegrationTypes {
    async fn get_by_id(&self, id: IntegrationTypeId) -> Result<IntegrationType> {
        self.rows
            .get(&id)
            .map(|t| t.clone())
            .ok_or_else(|| GatewayError::code(ErrorCode::IntegrationTypeNotFound))
    }

    async fn list(&self, page: Option<Paginator>) -> Result<Vec<IntegrationType>> {
        let page = page.unwrap_or(Paginator {
            offset: 0,
            limit: i64::MAX,
        });
        let rows: Vec<IntegrationType> = self.rows.iter().map(|e| e.value().clone()).collect();
        Ok(paginate(rows, page))
    }
}

#[derive(Default)]
struct InMemoryIntegrations {
    rows: DashMap<Uuid, Integration>,
}

#[async_trait]
impl Integrations for InMemoryIntegrations {
    async fn get_by_id(&self, id: Uuid, project_id: Option<Uuid>) -> Result<Integration> {
        self.rows
            .get(&id)
            .map(|i| i.clone())
            .filter(|i| project_id.is_none_or(|p| i.project_id == p))
            .ok_or_else(|| GatewayError::code(ErrorCode::IntegrationNotFound))
    }

    async fn get_by_name(&self, name: &str, project_id: Uuid) -> Result<Integration> {
        self.rows
            .iter()
            .map(|e| e.value().clone())
            .find(|i| i.project_id == project_id && i.name == name)
            .ok_or_else(|| GatewayError::code(ErrorCode::IntegrationNotFound))
    }

    async fn get_by_config_id(&self, config_id: &str) -> Result<Integration> {
        self.rows
            .iter()
            .map(|e| e.value().clone())
            .find(|i| i.config_id == config_id)
            .ok_or_else(|| GatewayError::code(ErrorCode::IntegrationNotFound))
    }

    async fn list(
        &self,
        page: Option<Paginator>,
        project_id: Option<Uuid>,
        types: Option<&[IntegrationTypeId]>,
    ) -> Result<Vec<Integration>> {
        let page = page.unwrap_or(Paginator {
            offset: 0,
            limit: i64::MAX,
        });
        let mut rows: Vec<Integration> = self
            .rows
            .iter()
            .map(|e| e.value().clone())
            .filter(|i| project_id.is_none_or(|p| i.project_id == p))
            .filter(|i| types.is_none_or(|t| t.contains(&i.integration_type)))
            .collect();
        rows.sort_by_key(|i| i.name.clone());
        Ok(paginate(rows, page))
    }

    async fn count(&self, project_id: Option<Uuid>) -> Result<i64> {
        Ok(self.list(None, project_id, None).await?.len() as i64)
    }

    async fn create(
        &self,
        name: &str,
        project_id: Uuid,
        config_id: &str,
        integration_type: IntegrationTypeId,
        status: IntegrationStatus,
    ) -> Result<Integration> {
        if self
            .rows
            .iter()
            .any(|e| e.value().project_id == project_id && e.value().name == name)
        {
            return Err(GatewayError::code(ErrorCode::IntegrationExists));
        }
        let integration = Integration {
            id: Uuid::new_v4(),
            name: name.to_string(),
            project_id,
            config_id: config_id.to_string(),
            integration_type,
            status,
            last_error: None,
            update_rev: Uuid::new_v4().to_string(),
            enabled: true,
            num_undelivered: 0,
        };
        self.rows.insert(integration.id, integration.clone());
        Ok(integration)
    }

    async fn update(&self, integration: &Integration) -> Result<()> {
        self.rows.insert(integration.id, integration.clone());
        Ok(())
    }

    async fn delete(&self, integration: &Integration) -> Result<()> {
        self.rows.remove(&integration.id);
        Ok(())
    }
}
