//! Extension ipmserver : API REST de la télécommande
//!
//! Toutes les routes sont en `GET` et montées sous `/api/remote`. Les
//! opérations qui parlent à mpv, à `amixer` ou à `xrandr` tournent dans
//! `spawn_blocking` pour ne pas bloquer le runtime Tokio.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tracing::{error, info};
use utoipa::OpenApi;

use crate::dispatcher::Dispatcher;
use crate::errors::DispatchError;
use crate::openapi::{
    ChannelEntry, ChannelGroup, ChannelQuery, ErrorResponse, PlayCustomResponse, RemoteState,
    ResolutionResponse, StepQuery, ToggleResponse, UrlQuery, VolumeResponse,
};
use crate::web::{StaticAssets, create_web_router};

type ApiError = (StatusCode, Json<ErrorResponse>);

/// État partagé des handlers
#[derive(Clone)]
pub struct RemoteApiState {
    pub dispatcher: Arc<Dispatcher>,
}

impl RemoteApiState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

fn internal_error(message: impl Into<String>) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

impl From<DispatchError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: DispatchError) -> Self {
        let status = match err {
            DispatchError::NoChannels => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        (
            status,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
    }
}

/// Exécute `f` sur le pool bloquant de Tokio
async fn blocking<F, T>(state: &RemoteApiState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Dispatcher) -> T + Send + 'static,
    T: Send + 'static,
{
    let dispatcher = state.dispatcher.clone();
    tokio::task::spawn_blocking(move || f(&dispatcher))
        .await
        .map_err(|e| {
            error!("Remote command task failed: {}", e);
            internal_error(format!("Task failed: {}", e))
        })
}

// ============================================================================
// ÉTAT
// ============================================================================

#[utoipa::path(
    get,
    path = "/state",
    responses(
        (status = 200, description = "État courant", body = RemoteState)
    ),
    tag = "remote"
)]
async fn get_state(State(state): State<RemoteApiState>) -> Result<Json<RemoteState>, ApiError> {
    let status = blocking(&state, |d| d.status()).await?;
    Ok(Json(status.into()))
}

#[utoipa::path(
    get,
    path = "/channels",
    responses(
        (status = 200, description = "Chaînes groupées", body = Vec<ChannelGroup>)
    ),
    tag = "remote"
)]
async fn list_channels(State(state): State<RemoteApiState>) -> Json<Vec<ChannelGroup>> {
    let groups = state
        .dispatcher
        .channels()
        .groups()
        .into_iter()
        .map(|(group, channels)| ChannelGroup {
            group: group.to_string(),
            channels: channels
                .into_iter()
                .map(|(index, channel)| ChannelEntry {
                    index,
                    name: channel.name.clone(),
                    url: channel.url.clone(),
                    logo: channel.logo.clone(),
                })
                .collect(),
        })
        .collect();

    Json(groups)
}

// ============================================================================
// CHAÎNES
// ============================================================================

#[utoipa::path(
    get,
    path = "/channel",
    params(ChannelQuery),
    responses(
        (status = 204, description = "Changement de chaîne lancé"),
        (status = 400, description = "Index invalide", body = ErrorResponse),
        (status = 404, description = "Aucune chaîne chargée", body = ErrorResponse)
    ),
    tag = "remote"
)]
async fn switch_channel(
    State(state): State<RemoteApiState>,
    Query(query): Query<ChannelQuery>,
) -> Result<StatusCode, ApiError> {
    blocking(&state, move |d| d.switch_channel(query.index.as_deref())).await??;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/channel_up",
    responses(
        (status = 204, description = "Chaîne suivante"),
        (status = 404, description = "Aucune chaîne chargée", body = ErrorResponse)
    ),
    tag = "remote"
)]
async fn channel_up(State(state): State<RemoteApiState>) -> Result<StatusCode, ApiError> {
    blocking(&state, |d| d.channel_up()).await??;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/channel_down",
    responses(
        (status = 204, description = "Chaîne précédente"),
        (status = 404, description = "Aucune chaîne chargée", body = ErrorResponse)
    ),
    tag = "remote"
)]
async fn channel_down(State(state): State<RemoteApiState>) -> Result<StatusCode, ApiError> {
    blocking(&state, |d| d.channel_down()).await??;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/play_custom",
    params(UrlQuery),
    responses(
        (status = 200, description = "Lecture lancée", body = PlayCustomResponse),
        (status = 400, description = "URL refusée", body = PlayCustomResponse)
    ),
    tag = "remote"
)]
async fn play_custom(
    State(state): State<RemoteApiState>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<PlayCustomResponse>, (StatusCode, Json<PlayCustomResponse>)> {
    let outcome = blocking(&state, move |d| d.play_custom(query.url.as_deref()))
        .await
        .map_err(|(status, Json(body))| {
            (
                status,
                Json(PlayCustomResponse {
                    success: false,
                    error: Some(body.error),
                }),
            )
        })?;

    match outcome {
        Ok(()) => Ok(Json(PlayCustomResponse {
            success: true,
            error: None,
        })),
        Err(e) => Err((
            StatusCode::BAD_REQUEST,
            Json(PlayCustomResponse {
                success: false,
                error: Some(e.to_string()),
            }),
        )),
    }
}

// ============================================================================
// LECTEUR
// ============================================================================

#[utoipa::path(
    get,
    path = "/toggle_deinterlace",
    responses(
        (status = 200, description = "Nouvel état du désentrelacement", body = ToggleResponse)
    ),
    tag = "remote"
)]
async fn toggle_deinterlace(
    State(state): State<RemoteApiState>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let state = blocking(&state, |d| d.toggle_deinterlace()).await?;
    Ok(Json(ToggleResponse { state }))
}

#[utoipa::path(
    get,
    path = "/toggle_latency",
    responses(
        (status = 200, description = "Nouvel état du mode faible latence", body = ToggleResponse)
    ),
    tag = "remote"
)]
async fn toggle_latency(
    State(state): State<RemoteApiState>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let state = blocking(&state, |d| d.toggle_latency()).await?;
    Ok(Json(ToggleResponse { state }))
}

#[utoipa::path(
    get,
    path = "/stop_player",
    responses(
        (status = 204, description = "Lecture arrêtée")
    ),
    tag = "remote"
)]
async fn stop_player(State(state): State<RemoteApiState>) -> Result<StatusCode, ApiError> {
    blocking(&state, |d| d.stop_player()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// VOLUME
// ============================================================================

#[utoipa::path(
    get,
    path = "/volume_up",
    params(StepQuery),
    responses(
        (status = 200, description = "Volume après ajustement", body = VolumeResponse),
        (status = 400, description = "Pas invalide", body = ErrorResponse)
    ),
    tag = "remote"
)]
async fn volume_up(
    State(state): State<RemoteApiState>,
    Query(query): Query<StepQuery>,
) -> Result<Json<VolumeResponse>, ApiError> {
    let status = blocking(&state, move |d| d.volume_up(query.step.as_deref())).await??;
    Ok(Json(status.into()))
}

#[utoipa::path(
    get,
    path = "/volume_down",
    params(StepQuery),
    responses(
        (status = 200, description = "Volume après ajustement", body = VolumeResponse),
        (status = 400, description = "Pas invalide", body = ErrorResponse)
    ),
    tag = "remote"
)]
async fn volume_down(
    State(state): State<RemoteApiState>,
    Query(query): Query<StepQuery>,
) -> Result<Json<VolumeResponse>, ApiError> {
    let status = blocking(&state, move |d| d.volume_down(query.step.as_deref())).await??;
    Ok(Json(status.into()))
}

#[utoipa::path(
    get,
    path = "/toggle_mute",
    responses(
        (status = 200, description = "État après bascule", body = VolumeResponse)
    ),
    tag = "remote"
)]
async fn toggle_mute(
    State(state): State<RemoteApiState>,
) -> Result<Json<VolumeResponse>, ApiError> {
    let status = blocking(&state, |d| d.toggle_mute()).await?;
    Ok(Json(status.into()))
}

#[utoipa::path(
    get,
    path = "/volume",
    responses(
        (status = 200, description = "Volume courant", body = VolumeResponse)
    ),
    tag = "remote"
)]
async fn get_volume(State(state): State<RemoteApiState>) -> Result<Json<VolumeResponse>, ApiError> {
    let status = blocking(&state, |d| d.volume()).await?;
    Ok(Json(status.into()))
}

// ============================================================================
// OSD
// ============================================================================

#[utoipa::path(
    get,
    path = "/show_osd",
    responses(
        (status = 204, description = "Overlay de chaîne affiché")
    ),
    tag = "remote"
)]
async fn show_osd(State(state): State<RemoteApiState>) -> Result<StatusCode, ApiError> {
    blocking(&state, |d| d.show_osd()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/hide_osd",
    responses(
        (status = 204, description = "Overlay de chaîne masqué")
    ),
    tag = "remote"
)]
async fn hide_osd(State(state): State<RemoteApiState>) -> impl IntoResponse {
    state.dispatcher.hide_osd();
    StatusCode::NO_CONTENT
}

// ============================================================================
// AFFICHAGE / ÉMULATEUR
// ============================================================================

#[utoipa::path(
    get,
    path = "/toggle_resolution",
    responses(
        (status = 200, description = "Résolution après bascule", body = ResolutionResponse)
    ),
    tag = "remote"
)]
async fn toggle_resolution(
    State(state): State<RemoteApiState>,
) -> Result<Json<ResolutionResponse>, ApiError> {
    let res = blocking(&state, |d| d.toggle_resolution()).await?;
    Ok(Json(ResolutionResponse {
        res: res.label().to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/toggle_retroarch",
    responses(
        (status = 200, description = "RetroArch lancé (true) ou arrêté (false)", body = ToggleResponse)
    ),
    tag = "remote"
)]
async fn toggle_retroarch(
    State(state): State<RemoteApiState>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let state = blocking(&state, |d| d.toggle_retroarch()).await?;
    Ok(Json(ToggleResponse { state }))
}

/// Router de l'API de télécommande (à monter sous `/api/remote`)
pub fn create_api_router(state: RemoteApiState) -> Router {
    Router::new()
        .route("/state", get(get_state))
        .route("/channels", get(list_channels))
        // Chaînes
        .route("/channel", get(switch_channel))
        .route("/channel_up", get(channel_up))
        .route("/channel_down", get(channel_down))
        .route("/play_custom", get(play_custom))
        // Lecteur
        .route("/toggle_deinterlace", get(toggle_deinterlace))
        .route("/toggle_latency", get(toggle_latency))
        .route("/stop_player", get(stop_player))
        // Volume
        .route("/volume_up", get(volume_up))
        .route("/volume_down", get(volume_down))
        .route("/toggle_mute", get(toggle_mute))
        .route("/volume", get(get_volume))
        // OSD
        .route("/show_osd", get(show_osd))
        .route("/hide_osd", get(hide_osd))
        // Affichage
        .route("/toggle_resolution", get(toggle_resolution))
        .route("/toggle_retroarch", get(toggle_retroarch))
        .with_state(state)
}

/// Trait d'extension pour brancher la télécommande sur un `ipmserver::Server`
#[async_trait]
pub trait RemoteExt {
    /// Enregistre l'API REST, la page d'accueil et les fichiers statiques
    ///
    /// # Routes enregistrées
    ///
    /// - `/api/remote/*` - API de télécommande
    /// - `/swagger-ui/remote` - Documentation Swagger
    /// - `/`, `/switch_language/{lang}`, `/manifest.json` - Interface web
    /// - `/static/*` - Fichiers embarqués
    async fn init_remote(&mut self, dispatcher: Arc<Dispatcher>);
}

#[async_trait]
impl RemoteExt for ipmserver::Server {
    async fn init_remote(&mut self, dispatcher: Arc<Dispatcher>) {
        let state = RemoteApiState::new(dispatcher);

        let api_router = create_api_router(state.clone());
        self.add_openapi(api_router, crate::openapi::ApiDoc::openapi(), "remote")
            .await;

        self.add_router("/", create_web_router(state)).await;
        self.add_dir::<StaticAssets>("/static").await;

        info!("✅ Remote API ready at /api/remote (docs at /swagger-ui/remote)");
    }
}
