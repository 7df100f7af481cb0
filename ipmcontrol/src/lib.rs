//! Cœur de la télécommande IPMPV : session de lecture (mpv), session de
//! volume (ALSA), résolution d'affichage, lanceur RetroArch et dispatcher
//! des commandes web.

pub mod dispatcher;
pub mod display;
pub mod engine;
pub mod errors;
pub mod i18n;
pub mod mixer;
pub mod mpv;
pub mod retroarch;
pub mod session;
pub mod validate;
pub mod volume;

// ipmserver extension (optional)
#[cfg(feature = "ipmserver")]
pub mod openapi;
#[cfg(feature = "ipmserver")]
pub mod server_ext;
#[cfg(feature = "ipmserver")]
pub mod web;

#[cfg(feature = "ipmserver")]
pub use server_ext::{RemoteApiState, RemoteExt, create_api_router};

pub use dispatcher::{Dispatcher, RemoteStatus, VolumeStatus};
pub use display::{DisplayController, Resolution};
pub use engine::{EngineLogMessage, LoadTicket, MediaEngine, PropertyChange};
pub use errors::{DispatchError, DisplayError, EngineError, LauncherError, MixerError};
pub use i18n::Localization;
pub use mixer::{AlsaMixer, Mixer, MixerReading};
pub use mpv::{MpvEngine, MpvOptions};
pub use retroarch::RetroArchLauncher;
pub use session::{MediaSession, Placeholders, SessionState, low_latency_settings};
pub use validate::is_valid_stream_url;
pub use volume::VolumeSession;
