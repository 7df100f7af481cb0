//! Documentation OpenAPI et DTOs de l'API de télécommande
//!
//! Types de réponse / paramètres des routes `/api/remote/*`, documentés
//! via `utoipa`.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::dispatcher::{RemoteStatus, VolumeStatus};

// ============================================================================
// ÉTAT
// ============================================================================

/// État courant de la télécommande
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RemoteState {
    /// Index de la chaîne en cours (absent si arrêt ou URL personnalisée)
    pub current_index: Option<usize>,
    /// Nom de la chaîne en cours
    pub current_channel: Option<String>,
    pub deinterlace: bool,
    pub low_latency: bool,
    /// Codec vidéo (ex: "H264")
    pub video_codec: Option<String>,
    /// Codec audio (ex: "AAC")
    pub audio_codec: Option<String>,
    /// Hauteur de l'image en lignes
    pub video_height: Option<u32>,
    pub interlaced: Option<bool>,
    /// Compteur de changements de chaîne
    pub change_counter: u64,
    /// Volume (0-100)
    pub volume: u8,
    pub muted: bool,
    /// Faux si aucun mixer n'a pu être ouvert
    pub volume_available: bool,
    /// Résolution de la sortie composite ("480i", "240p", "576i", "288p", "UNK")
    pub resolution: String,
    /// RetroArch en cours d'exécution
    pub retroarch: bool,
}

impl From<RemoteStatus> for RemoteState {
    fn from(status: RemoteStatus) -> Self {
        Self {
            current_index: status.session.current_index,
            current_channel: status.current_channel,
            deinterlace: status.session.deinterlace,
            low_latency: status.session.low_latency,
            video_codec: status.session.video_codec,
            audio_codec: status.session.audio_codec,
            video_height: status.session.resolution,
            interlaced: status.session.interlaced,
            change_counter: status.session.change_counter,
            volume: status.volume,
            muted: status.muted,
            volume_available: status.volume_available,
            resolution: status.resolution.label().to_string(),
            retroarch: status.retroarch,
        }
    }
}

// ============================================================================
// CHAÎNES
// ============================================================================

/// Chaîne de la playlist
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChannelEntry {
    /// Index global, utilisable avec `/channel?index=`
    pub index: usize,
    pub name: String,
    pub url: String,
    pub logo: String,
}

/// Groupe de chaînes, dans l'ordre d'apparition de la playlist
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChannelGroup {
    pub group: String,
    pub channels: Vec<ChannelEntry>,
}

// ============================================================================
// RÉPONSES
// ============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ToggleResponse {
    /// Nouvel état
    pub state: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VolumeResponse {
    pub volume: u8,
    pub muted: bool,
}

impl From<VolumeStatus> for VolumeResponse {
    fn from(status: VolumeStatus) -> Self {
        Self {
            volume: status.volume,
            muted: status.muted,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResolutionResponse {
    pub res: String,
}

/// Réponse de `/play_custom`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayCustomResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Erreur structurée
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// PARAMÈTRES
// ============================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChannelQuery {
    /// Index de la chaîne ; négatif pour compter depuis la fin
    pub index: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UrlQuery {
    /// URL http(s), rtmp(s), udp ou tcp
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StepQuery {
    /// Pas de volume en pourcents (défaut: `volume.step`)
    pub step: Option<String>,
}

// ============================================================================
// DOCUMENTATION
// ============================================================================

#[derive(OpenApi)]
#[openapi(
    info(
        title = "IPMPV Remote API",
        version = "1.0.0",
        description = r#"
# API de télécommande IPMPV

Pilote le lecteur IPTV, le volume et l'affichage à l'écran (OSD).

Les changements de chaîne sont asynchrones : la requête rend la main
immédiatement (204) et la chaîne se charge en arrière-plan.
        "#,
        license(name = "MIT"),
    ),
    paths(
        crate::server_ext::get_state,
        crate::server_ext::list_channels,
        crate::server_ext::switch_channel,
        crate::server_ext::channel_up,
        crate::server_ext::channel_down,
        crate::server_ext::play_custom,
        crate::server_ext::toggle_deinterlace,
        crate::server_ext::toggle_latency,
        crate::server_ext::volume_up,
        crate::server_ext::volume_down,
        crate::server_ext::toggle_mute,
        crate::server_ext::get_volume,
        crate::server_ext::show_osd,
        crate::server_ext::hide_osd,
        crate::server_ext::toggle_resolution,
        crate::server_ext::toggle_retroarch,
        crate::server_ext::stop_player,
    ),
    components(schemas(
        RemoteState,
        ChannelEntry,
        ChannelGroup,
        ToggleResponse,
        VolumeResponse,
        ResolutionResponse,
        PlayCustomResponse,
        ErrorResponse,
    )),
    tags(
        (name = "remote", description = "Télécommande : chaînes, volume, OSD, affichage")
    )
)]
pub struct ApiDoc;
