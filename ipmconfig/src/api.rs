//! API REST de la configuration, montée sous `/api/config`.
//!
//! Les chemins sont exprimés avec des points (`osd.channel_timeout_ms`).
//! Une écriture sur une clé existante doit garder le même type de valeur.

use crate::Config;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::sync::Arc;
use tracing::info;

/// Valeur de configuration à un chemin donné
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConfigEntry {
    /// Chemin de la clé (ex: "osd.channel_timeout_ms")
    pub path: String,
    pub value: JsonValue,
}

/// Corps d'une écriture
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConfigUpdate {
    pub value: JsonValue,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConfigError {
    pub error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ConfigError>)>;

fn reject(status: StatusCode, error: impl ToString) -> (StatusCode, Json<ConfigError>) {
    (
        status,
        Json(ConfigError {
            error: error.to_string(),
        }),
    )
}

/// `"osd.channel_timeout_ms"` → `["osd", "channel_timeout_ms"]`
fn split_path(path: &str) -> Result<Vec<&str>, (StatusCode, Json<ConfigError>)> {
    let keys: Vec<&str> = path.split('.').map(str::trim).collect();
    if keys.iter().any(|k| k.is_empty()) {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            format!("Invalid configuration path '{}'", path),
        ));
    }
    Ok(keys)
}

fn same_kind(current: &YamlValue, new: &YamlValue) -> bool {
    matches!(
        (current, new),
        (YamlValue::Null, _)
            | (_, YamlValue::Null)
            | (YamlValue::Bool(_), YamlValue::Bool(_))
            | (YamlValue::Number(_), YamlValue::Number(_))
            | (YamlValue::String(_), YamlValue::String(_))
            | (YamlValue::Sequence(_), YamlValue::Sequence(_))
            | (YamlValue::Mapping(_), YamlValue::Mapping(_))
    )
}

fn to_json(value: &YamlValue) -> Result<JsonValue, (StatusCode, Json<ConfigError>)> {
    serde_json::to_value(value).map_err(|e| reject(StatusCode::INTERNAL_SERVER_ERROR, e))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "config",
    responses(
        (status = 200, description = "Configuration complète", body = serde_json::Value)
    )
)]
async fn get_full_config(State(config): State<Arc<Config>>) -> ApiResult<JsonValue> {
    let value = config
        .get_value(&[])
        .map_err(|e| reject(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok(Json(to_json(&value)?))
}

#[utoipa::path(
    get,
    path = "/{path}",
    tag = "config",
    params(
        ("path" = String, Path, description = "Chemin pointé, ex: volume.step")
    ),
    responses(
        (status = 200, description = "Valeur de configuration", body = ConfigEntry),
        (status = 400, description = "Chemin mal formé", body = ConfigError),
        (status = 404, description = "Chemin inconnu", body = ConfigError)
    )
)]
async fn get_config_value(
    State(config): State<Arc<Config>>,
    Path(path): Path<String>,
) -> ApiResult<ConfigEntry> {
    let keys = split_path(&path)?;
    let value = config
        .get_value(&keys)
        .map_err(|e| reject(StatusCode::NOT_FOUND, e))?;

    Ok(Json(ConfigEntry {
        value: to_json(&value)?,
        path,
    }))
}

#[utoipa::path(
    put,
    path = "/{path}",
    tag = "config",
    params(
        ("path" = String, Path, description = "Chemin pointé, ex: osd.channel_timeout_ms")
    ),
    request_body = ConfigUpdate,
    responses(
        (status = 200, description = "Valeur enregistrée", body = ConfigEntry),
        (status = 400, description = "Chemin mal formé ou type incompatible", body = ConfigError),
        (status = 500, description = "Écriture de config.yaml impossible", body = ConfigError)
    )
)]
async fn put_config_value(
    State(config): State<Arc<Config>>,
    Path(path): Path<String>,
    Json(update): Json<ConfigUpdate>,
) -> ApiResult<ConfigEntry> {
    let keys = split_path(&path)?;
    let value: YamlValue = serde_yaml::to_value(&update.value)
        .map_err(|e| reject(StatusCode::BAD_REQUEST, e))?;

    if let Ok(current) = config.get_value(&keys) {
        if !same_kind(&current, &value) {
            return Err(reject(
                StatusCode::BAD_REQUEST,
                format!("Value type does not match the current value of {}", path),
            ));
        }
    }

    config
        .set_value(&keys, value)
        .map_err(|e| reject(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    info!(path = %path, "Configuration updated");

    Ok(Json(ConfigEntry {
        path,
        value: update.value,
    }))
}

/// Crée le router de l'API de configuration
pub fn create_router(config: Arc<Config>) -> Router {
    Router::new()
        .route("/", get(get_full_config))
        .route("/{path}", get(get_config_value).put(put_config_value))
        .with_state(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_paths_are_split() {
        assert_eq!(split_path("osd.corner_radius").unwrap(), vec!["osd", "corner_radius"]);
        assert!(split_path("osd..radius").is_err());
        assert!(split_path("").is_err());
    }

    #[test]
    fn writes_keep_value_kind() {
        let number = YamlValue::Number(5.into());
        assert!(same_kind(&number, &YamlValue::Number(10.into())));
        assert!(!same_kind(&number, &YamlValue::String("ten".into())));
        assert!(same_kind(&YamlValue::Null, &YamlValue::String("x".into())));
    }
}
