//! # ipmchannels - Catalogue des chaînes IPTV
//!
//! Ingestion d'une playlist M3U étendue et construction du
//! [`ChannelDirectory`], la liste immuable et indexée des chaînes.
//!
//! ```rust
//! use ipmchannels::{ChannelDirectory, parse_playlist};
//!
//! let text = "#EXTM3U\n#EXTINF:-1 group-title=\"News\",ABC\nhttp://stream/abc\n";
//! let directory = ChannelDirectory::new(parse_playlist(text));
//! assert_eq!(directory.len(), 1);
//! assert_eq!(directory.normalize(-1), Some(0));
//! ```

pub mod directory;
pub mod errors;
pub mod playlist;

pub use directory::ChannelDirectory;
pub use errors::ChannelError;
pub use playlist::{DEFAULT_GROUP, fetch_playlist, load_channels, parse_playlist};

use serde::Serialize;

/// Une entrée de la playlist.
///
/// Une chaîne déclarée dans plusieurs groupes apparaît une fois par groupe,
/// seul le champ `group` diffère.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub name: String,
    pub url: String,
    /// URL du logo, vide si absent
    pub logo: String,
    pub group: String,
}
