//! Consumer of the pool-manager's deletion channel. A deleted pool takes
//! every project pinned to it back to "no pool assigned"; their running
//! revisions are forced to `Stopped` the same way an admin-triggered pool
//! deletion would stop them.

use async_trait::async_trait;
use gateway_db::model::Paginator;
use gateway_mq::messages::PoolDeleted;
use gateway_mq::{ConsumeMessageError, MessageHandler};
use uuid::Uuid;

use crate::state::AppState;

fn rejected(err: impl std::fmt::Display) -> ConsumeMessageError {
    ConsumeMessageError::new(err.to_string())
}

pub struct PoolDeletedHandler {
    pub state: AppState,
}

#[async_trait]
impl MessageHandler for PoolDeletedHandler {
    type Model = PoolDeleted;

    async fn handle(&self, message: PoolDeleted) -> Result<(), ConsumeMessageError> {
        let Ok(pool_id) = Uuid::parse_str(&message.id) else {
            return Ok(());
        };

        // No index on `pool_id`; a deletion is rare enough that a bounded
        // scan is cheaper than adding one, the same tradeoff the admin
        // handlers make for `lang_in_use`/`engine_in_use`.
        let affected: Vec<_> = self
            .state
            .db
            .projects()
            .list(Paginator::new(0, 1000), None, None)
            .await
            .map_err(rejected)?
            .into_iter()
            .filter(|p| p.pool_id == Some(pool_id))
            .collect();

        for mut project in affected {
            self.state.db.revisions().stop_all(project.id).await.map_err(rejected)?;
            project.pool_id = None;
            self.state.db.projects().update(&project).await.map_err(rejected)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_state, TestFixture};

    #[tokio::test]
    async fn clears_pool_id_on_every_pinned_project() {
        let state = test_state();
        let fixture = TestFixture::seed(&state).await;
        let pool_id = Uuid::new_v4();

        let mut project = state.db.projects().get_by_id(fixture.project_id, None, true).await.unwrap();
        project.pool_id = Some(pool_id);
        state.db.projects().update(&project).await.unwrap();

        let handler = PoolDeletedHandler { state: state.clone() };
        handler.handle(PoolDeleted { id: pool_id.to_string() }).await.unwrap();

        let project = state.db.projects().get_by_id(fixture.project_id, None, true).await.unwrap();
        assert_eq!(project.pool_id, None);
    }

    #[tokio::test]
    async fn malformed_id_is_ignored() {
        let state = test_state();
        let handler = PoolDeletedHandler { state };
        handler.handle(PoolDeleted { id: "not-a-uuid".into() }).await.unwrap();
    }

    #[tokio::test]
    async fn unrelated_pool_leaves_projects_untouched() {
        let state = test_state();
        let fixture = TestFixture::seed(&state).await;
        let handler = PoolDeletedHandler { state: state.clone() };
        handler.handle(PoolDeleted { id: Uuid::new_v4().to_string() }).await.unwrap();

        let project = state.db.projects().get_by_id(fixture.project_id, None, true).await.unwrap();
        assert_eq!(project.pool_id, None);
    }
}
