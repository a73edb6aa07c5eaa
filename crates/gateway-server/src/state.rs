//! Shared application state threaded through every handler and reconciler.

use std::sync::Arc;

use gateway_auth::FailedLoginTracker;
use gateway_db::Database;
use gateway_mq::Producers;
use gateway_storage::GatewayStorage;

use crate::config::GatewayConfig;
use crate::pool_manager::PoolManagerClient;

/// Cloned into every axum handler. Cheap to clone: everything behind it is
/// already an `Arc` or a plain settings struct.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub storage: GatewayStorage,
    pub producers: Arc<Producers>,
    pub config: Arc<GatewayConfig>,
    pub failed_logins: Arc<FailedLoginTracker>,
    pub pool_manager: Arc<PoolManagerClient>,
}

impl AppState {
    #[must_use]
    pub fn new(
        db: Arc<dyn Database>,
        storage: GatewayStorage,
        producers: Arc<Producers>,
        config: Arc<GatewayConfig>,
    ) -> Self {
        let pool_manager = Arc::new(PoolManagerClient::new(config.api_endpoints.pool_manager_url.clone()));
        Self {
            db,
            storage,
            producers,
            config,
            failed_logins: Arc::new(FailedLoginTracker::default()),
            pool_manager,
        }
    }
}
