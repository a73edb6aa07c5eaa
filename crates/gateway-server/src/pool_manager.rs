//! Thin passthrough client for the external pool-manager service. A pool
//! backs a project's resource budget; the gateway never stores pool state
//! itself, it only forwards the lookup and relays whatever the service says.

use gateway_error::{ErrorCode, GatewayError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolResources {
    pub fuzzer_max_cpu: i32,
    pub fuzzer_max_ram: i32,
    pub fuzzer_max_tmpfs: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pool {
    pub id: String,
    pub resources: PoolResources,
}

/// Node-group shape a pool is backed by; the two platform types this
/// service runs under size nodes differently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeGroup {
    Cloud {
        node_cpu: i32,
        node_ram: i32,
        node_count: i32,
    },
    Local {
        node_count: i32,
    },
}

#[derive(Clone)]
pub struct PoolManagerClient {
    http: reqwest::Client,
    base_url: String,
}

impl PoolManagerClient {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Looks up `pool_id`, passing through the service's own error status as
    /// faithfully as an opaque HTTP error allows.
    pub async fn get_pool(&self, pool_id: &str) -> Result<Pool, GatewayError> {
        let url = format!("{}/pools/{pool_id}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Internal(format!("pool-manager request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::code(ErrorCode::NoPoolToUse));
        }
        if !response.status().is_success() {
            return Err(GatewayError::Internal(format!(
                "pool-manager returned status {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::Internal(format!("pool-manager response decode failed: {e}")))
    }

    pub async fn list_pools(&self) -> Result<Vec<Pool>, GatewayError> {
        let url = format!("{}/pools", self.base_url);
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Internal(format!("pool-manager request failed: {e}")))?
            .json()
            .await
            .map_err(|e| GatewayError::Internal(format!("pool-manager response decode failed: {e}")))
    }

    pub async fn create_pool(
        &self,
        name: &str,
        node_group: &NodeGroup,
        resources: &PoolResources,
    ) -> Result<Pool, GatewayError> {
        let url = format!("{}/pools", self.base_url);
        let body = serde_json::json!({ "name": name, "node_group": node_group, "resources": resources });
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Internal(format!("pool-manager request failed: {e}")))?;
        if response.status() == reqwest::StatusCode::CONFLICT {
            return Err(GatewayError::code(ErrorCode::PoolExists));
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::Internal(format!("pool-manager response decode failed: {e}")))
    }

    pub async fn delete_pool(&self, pool_id: &str) -> Result<(), GatewayError> {
        let url = format!("{}/pools/{pool_id}", self.base_url);
        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Internal(format!("pool-manager request failed: {e}")))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::code(ErrorCode::PoolNotFound));
        }
        if response.status() == reqwest::StatusCode::CONFLICT {
            return Err(GatewayError::code(ErrorCode::PoolLocked));
        }
        Ok(())
    }
}
