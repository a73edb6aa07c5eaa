//! `GET /config[/langs|/engines|/integration_types]` — the unauthenticated
//! catalogue a client needs before it can even log in (what languages and
//! engines exist, which bug-tracker kinds are configurable).

use axum::extract::State;
use axum::Json;
use gateway_db::model::{Engine, IntegrationType, Lang};
use gateway_error::GatewayError;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PublicConfig {
    pub environment: &'static str,
    pub platform_type: &'static str,
}

pub async fn get_config(State(state): State<AppState>) -> Json<PublicConfig> {
    Json(PublicConfig {
        environment: state.config.environment.environment.as_str(),
        platform_type: state.config.environment.platform_type.as_str(),
    })
}

pub async fn list_langs(State(state): State<AppState>) -> Result<Json<Vec<Lang>>, GatewayError> {
    let langs = state.db.langs().list(None).await?;
    Ok(Json(langs))
}

pub async fn list_engines(State(state): State<AppState>) -> Result<Json<Vec<Engine>>, GatewayError> {
    let engines = state.db.engines().list(None, None).await?;
    Ok(Json(engines))
}

pub async fn list_integration_types(State(state): State<AppState>) -> Result<Json<Vec<IntegrationType>>, GatewayError> {
    let types = state.db.integration_types().list(None).await?;
    Ok(Json(types))
}

#[cfg(test)]
mod tests {
    use gateway_db::model::LangId;

    use super::*;
    use crate::test_support::test_state;

    #[tokio::test]
    async fn get_config_exposes_environment_and_platform() {
        let state = test_state();
        let Json(config) = get_config(State(state)).await;
        assert_eq!(config.environment, "test");
        assert_eq!(config.platform_type, "onprem");
    }

    #[tokio::test]
    async fn list_langs_reflects_created_rows() {
        let state = test_state();
        state.db.langs().create(LangId::Cpp, "C/C++").await.unwrap();

        let Json(langs) = list_langs(State(state)).await.unwrap();
        assert_eq!(langs.len(), 1);
        assert_eq!(langs[0].id, LangId::Cpp);
    }

    #[tokio::test]
    async fn list_engines_empty_by_default() {
        let state = test_state();
        let Json(engines) = list_engines(State(state)).await.unwrap();
        assert!(engines.is_empty());
    }
}
