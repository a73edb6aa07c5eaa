//! Shared fixtures for reconcile handler tests: an [`AppState`] backed
//! entirely by in-memory fakes, plus a seeded user/project/fuzzer/revision
//! chain every handler test starts from.

use std::sync::Arc;

use gateway_db::fake::InMemoryDatabase;
use gateway_db::model::{EngineId, LangId};
use gateway_mq::fake::InMemoryMessageQueue;
use gateway_mq::Producers;
use gateway_storage::fake::InMemoryObjectStore;
use gateway_storage::GatewayStorage;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::state::AppState;

pub(crate) fn test_state() -> AppState {
    let db: Arc<dyn gateway_db::Database> = Arc::new(InMemoryDatabase::new());
    let storage = GatewayStorage::new(Arc::new(InMemoryObjectStore::default()), 500_000_000);
    let mq: Arc<dyn gateway_mq::MessageQueue> = Arc::new(InMemoryMessageQueue::default());
    let unsent: Arc<dyn gateway_db::traits::UnsentMessages> =
        Arc::new(gateway_db::fake::InMemoryUnsentMessages::default());
    let producers = Arc::new(Producers::new(mq, unsent));
    AppState::new(db, storage, producers, Arc::new(GatewayConfig::for_tests()))
}

pub(crate) struct TestFixture {
    #[allow(dead_code)]
    pub owner_id: Uuid,
    pub project_id: Uuid,
    pub fuzzer_id: Uuid,
    pub revision_id: Uuid,
}

impl TestFixture {
    pub(crate) async fn seed(state: &AppState) -> Self {
        let owner = state
            .db
            .users()
            .create("owner", "Owner", "hash", true, false, false, false, "owner@example.test")
            .await
            .unwrap();
        let project = state.db.projects().create("proj", "a project", owner.id, None).await.unwrap();
        let fuzzer = state
            .db
            .fuzzers()
            .create("fuzzer-a", "a fuzzer", project.id, EngineId::Libfuzzer, LangId::Cpp, false)
            .await
            .unwrap();
        let revision = state
            .db
            .revisions()
            .create("rev-1", "first revision", fuzzer.id, Uuid::new_v4(), 100, 256, 0)
            .await
            .unwrap();

        Self {
            owner_id: owner.id,
            project_id: project.id,
            fuzzer_id: fuzzer.id,
            revision_id: revision.id,
        }
    }
}
