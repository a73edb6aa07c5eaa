//! PostgreSQL-backed implementation of the repository traits.
//!
//! Every `erasure_date` column follows a soft-delete design: a single
//! nullable timestamp drives [`RemovalState`](crate::model::RemovalState)
//! instead of a separate status flag.

mod cookies;
mod crashes;
mod fuzzers;
mod images;
mod integrations;
mod langs_engines;
mod lockout;
mod projects;
mod revisions;
mod statistics;
mod unsent;
mod users;

pub use cookies::PgCookies;
pub use crashes::PgCrashes;
pub use fuzzers::PgFuzzers;
pub use images::PgImages;
pub use integrations::{PgIntegrationTypes, PgIntegrations};
pub use langs_engines::{PgEngines, PgLangs};
pub use lockout::PgUserLockout;
pub use projects::PgProjects;
pub use revisions::PgRevisions;
pub use statistics::{PgStatisticsAfl, PgStatisticsCrashes, PgStatisticsLibFuzzer};
pub use unsent::PgUnsentMessages;
pub use users::PgUsers;

use sqlx::PgPool;

use crate::model::RemovalState;
use crate::traits::{
    Cookies, Crashes, Database, Engines, Fuzzers, Images, IntegrationTypes, Integrations, Langs,
    Projects, Revisions, StatisticsAfl, StatisticsCrashes, StatisticsLibFuzzer, UnsentMessages,
    UserLockout, Users,
};

pub(crate) fn removal_clause(state: RemovalState) -> Option<&'static str> {
    match state {
        RemovalState::All => None,
        RemovalState::Present => Some("erasure_date IS NULL"),
        RemovalState::TrashBin => Some("erasure_date IS NOT NULL AND erasure_date > now()"),
        RemovalState::Erasing => Some("erasure_date IS NOT NULL AND erasure_date <= now()"),
        RemovalState::Visible => Some("(erasure_date IS NULL OR erasure_date > now())"),
    }
}

/// Binds every repository to a single `PgPool`, handed to `gateway-server`
/// as one `Arc<dyn Database>`.
pub struct PgDatabase {
    unsent_messages: PgUnsentMessages,
    cookies: PgCookies,
    users: PgUsers,
    lockout: PgUserLockout,
    langs: PgLangs,
    engines: PgEngines,
    images: PgImages,
    projects: PgProjects,
    fuzzers: PgFuzzers,
    revisions: PgRevisions,
    statistics_crashes: PgStatisticsCrashes,
    statistics_libfuzzer: PgStatisticsLibFuzzer,
    statistics_afl: PgStatisticsAfl,
    crashes: PgCrashes,
    integration_types: PgIntegrationTypes,
    integrations: PgIntegrations,
}

impl PgDatabase {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            unsent_messages: PgUnsentMessages::new(pool.clone()),
            cookies: PgCookies::new(pool.clone()),
            users: PgUsers::new(pool.clone()),
            lockout: PgUserLockout::new(pool.clone()),
            langs: PgLangs::new(pool.clone()),
            engines: PgEngines::new(pool.clone()),
            images: PgImages::new(pool.clone()),
            projects: PgProjects::new(pool.clone()),
            fuzzers: PgFuzzers::new(pool.clone()),
            revisions: PgRevisions::new(pool.clone()),
            statistics_crashes: PgStatisticsCrashes::new(pool.clone()),
            statistics_libfuzzer: PgStatisticsLibFuzzer::new(pool.clone()),
            statistics_afl: PgStatisticsAfl::new(pool.clone()),
            crashes: PgCrashes::new(pool.clone()),
            integration_types: PgIntegrationTypes::new(pool.clone()),
            integrations: PgIntegrations::new(pool),
        }
    }
}

impl Database for PgDatabase {
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
