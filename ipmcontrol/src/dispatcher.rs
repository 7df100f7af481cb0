//! Front controller: one external request, one session operation.
//!
//! Validation happens here, before any state is touched. Operations that
//! wait on the media engine are pushed to worker threads.

use std::sync::Arc;

use ipmchannels::ChannelDirectory;
use serde::Serialize;
use tracing::{error, info};

use crate::display::{DisplayController, Resolution};
use crate::errors::DispatchError;
use crate::i18n::Localization;
use crate::retroarch::RetroArchLauncher;
use crate::session::{MediaSession, SessionState};
use crate::validate::is_valid_stream_url;
use crate::volume::VolumeSession;

/// Everything the remote shows on its status line.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteStatus {
    pub session: SessionState,
    pub current_channel: Option<String>,
    pub volume: u8,
    pub muted: bool,
    pub volume_available: bool,
    pub resolution: Resolution,
    pub retroarch: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VolumeStatus {
    pub volume: u8,
    pub muted: bool,
}

pub struct Dispatcher {
    media: Arc<MediaSession>,
    volume: Arc<VolumeSession>,
    display: Arc<DisplayController>,
    retroarch: Arc<RetroArchLauncher>,
    localization: Arc<Localization>,
}

fn parse_index(raw: &str) -> Result<i64, DispatchError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| DispatchError::InvalidIndex(raw.to_string()))
}

fn parse_step(raw: Option<&str>) -> Result<Option<u8>, DispatchError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        // All digits: only overflow fails, which clamps to 100
        Some(s) if s.bytes().all(|b| b.is_ascii_digit()) => {
            Ok(Some(s.parse::<u64>().map_or(100, |step| step.min(100) as u8)))
        }
        Some(s) => Err(DispatchError::InvalidStep(s.to_string())),
    }
}

impl Dispatcher {
    pub fn new(
        media: Arc<MediaSession>,
        volume: Arc<VolumeSession>,
        display: Arc<DisplayController>,
        retroarch: Arc<RetroArchLauncher>,
        localization: Arc<Localization>,
    ) -> Self {
        Self {
            media,
            volume,
            display,
            retroarch,
            localization,
        }
    }

    pub fn channels(&self) -> &Arc<ChannelDirectory> {
        self.media.channels()
    }

    pub fn localization(&self) -> &Arc<Localization> {
        &self.localization
    }

    pub fn status(&self) -> RemoteStatus {
        let session = self.media.state();
        let current_channel = session
            .current_index
            .and_then(|i| self.channels().get(i))
            .map(|c| c.name.clone());

        RemoteStatus {
            session,
            current_channel,
            volume: self.volume.level(),
            muted: self.volume.is_muted(),
            volume_available: self.volume.is_available(),
            resolution: self.display.current(),
            retroarch: self.retroarch.is_running(),
        }
    }

    fn start_channel(&self, index: i64) -> Result<(), DispatchError> {
        if self.channels().is_empty() {
            return Err(DispatchError::NoChannels);
        }
        if let Err(e) = self.media.spawn_play_channel(index) {
            error!("Cannot start channel change worker: {}", e);
        }
        Ok(())
    }

    /// Stops playback then plays `index`; without index, replays the
    /// current channel (or the first one).
    pub fn switch_channel(&self, index: Option<&str>) -> Result<(), DispatchError> {
        let index = match index {
            Some(raw) => parse_index(raw)?,
            None => self.media.current_index().map_or(0, |i| i as i64),
        };
        if self.channels().is_empty() {
            return Err(DispatchError::NoChannels);
        }

        self.media.stop();
        self.start_channel(index)
    }

    pub fn channel_up(&self) -> Result<(), DispatchError> {
        let index = self.media.current_index().map_or(0, |i| i as i64 + 1);
        self.start_channel(index)
    }

    pub fn channel_down(&self) -> Result<(), DispatchError> {
        let index = self.media.current_index().map_or(-1, |i| i as i64 - 1);
        self.start_channel(index)
    }

    pub fn play_custom(&self, url: Option<&str>) -> Result<(), DispatchError> {
        let url = url.map(str::trim).unwrap_or_default();
        if !is_valid_stream_url(url) {
            info!(url, "Rejected custom URL");
            return Err(DispatchError::InvalidUrl);
        }

        if let Err(e) = self.media.play_url(url) {
            error!("Cannot play {}: {}", url, e);
        }
        Ok(())
    }

    pub fn toggle_deinterlace(&self) -> bool {
        self.media.toggle_deinterlace()
    }

    pub fn toggle_latency(&self) -> bool {
        self.media.toggle_low_latency()
    }

    pub fn volume_up(&self, step: Option<&str>) -> Result<VolumeStatus, DispatchError> {
        let step = parse_step(step)?;
        let volume = self.volume.volume_up(step);
        Ok(VolumeStatus {
            volume,
            muted: self.volume.is_muted(),
        })
    }

    pub fn volume_down(&self, step: Option<&str>) -> Result<VolumeStatus, DispatchError> {
        let step = parse_step(step)?;
        let volume = self.volume.volume_down(step);
        Ok(VolumeStatus {
            volume,
            muted: self.volume.is_muted(),
        })
    }

    pub fn toggle_mute(&self) -> VolumeStatus {
        let muted = self.volume.toggle_mute();
        VolumeStatus {
            volume: self.volume.level(),
            muted,
        }
    }

    pub fn volume(&self) -> VolumeStatus {
        VolumeStatus {
            volume: self.volume.level(),
            muted: self.volume.is_muted(),
        }
    }

    pub fn show_osd(&self) {
        self.media.show_overlay();
    }

    pub fn hide_osd(&self) {
        self.media.hide_overlay();
    }

    pub fn toggle_resolution(&self) -> Resolution {
        self.display.cycle()
    }

    pub fn toggle_retroarch(&self) -> bool {
        self.retroarch.toggle()
    }

    pub fn stop_player(&self) {
        self.media.hide_overlay();
        self.media.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_accepts_negative_values() {
        assert_eq!(parse_index("-1"), Ok(-1));
        assert_eq!(parse_index(" 12 "), Ok(12));
        assert_eq!(
            parse_index("abc"),
            Err(DispatchError::InvalidIndex("abc".into()))
        );
    }

    #[test]
    fn step_must_be_digits() {
        assert_eq!(parse_step(None), Ok(None));
        assert_eq!(parse_step(Some("")), Ok(None));
        assert_eq!(parse_step(Some("10")), Ok(Some(10)));
        assert_eq!(parse_step(Some("200")), Ok(Some(100)));
        assert!(parse_step(Some("-5")).is_err());
        assert_eq!(parse_step(Some("255")), Ok(Some(100)));
        assert_eq!(parse_step(Some("256")), Ok(Some(100)));
        assert_eq!(parse_step(Some("1000")), Ok(Some(100)));
        assert_eq!(parse_step(Some("99999999999999999999999")), Ok(Some(100)));
        assert!(parse_step(Some("1e3")).is_err());
    }
}
