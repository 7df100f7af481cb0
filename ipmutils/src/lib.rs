//! Utilitaires système pour IPMPV.
//!
//! - [`guess_local_ip`] : devine l'adresse IP locale utilisée pour les connexions sortantes
//! - [`DisplaySession`] : type de session graphique (X11 / Wayland)
//! - [`find_processes`] / [`kill_processes`] : recherche de processus par ligne de commande
mod ip_utils;
mod process;

pub use ip_utils::guess_local_ip;
pub use process::{ProcessInfo, find_processes, kill_processes};

use std::env;

/// Type de session graphique sur laquelle tournent le lecteur et l'OSD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplaySession {
    X11,
    Wayland,
}

impl DisplaySession {
    /// Détecte la session courante à partir de `WAYLAND_DISPLAY`.
    pub fn detect() -> Self {
        Self::from_wayland_display(env::var_os("WAYLAND_DISPLAY").is_some())
    }

    fn from_wayland_display(present: bool) -> Self {
        if present {
            DisplaySession::Wayland
        } else {
            DisplaySession::X11
        }
    }

    pub fn is_wayland(self) -> bool {
        matches!(self, DisplaySession::Wayland)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wayland_display_selects_wayland() {
        assert_eq!(DisplaySession::from_wayland_display(true), DisplaySession::Wayland);
        assert_eq!(DisplaySession::from_wayland_display(false), DisplaySession::X11);
        assert!(DisplaySession::Wayland.is_wayland());
    }
}
