use serde::Serialize;

/// What the channel banner shows when it opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSnapshot {
    pub name: String,
    /// Logo URL, empty when the playlist had none
    pub logo: String,
    pub deinterlace: bool,
    pub low_latency: bool,
}

/// Stream facts reported by the player once decoding has started.
///
/// Every field is optional: only known values overwrite what the banner
/// already displays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodecInfo {
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    /// Vertical resolution in lines
    pub resolution: Option<u32>,
    pub interlaced: Option<bool>,
}

impl CodecInfo {
    pub fn is_empty(&self) -> bool {
        self.video_codec.is_none()
            && self.audio_codec.is_none()
            && self.resolution.is_none()
            && self.interlaced.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VolumeSnapshot {
    pub level: u8,
    pub muted: bool,
}

impl VolumeSnapshot {
    /// Level shown on screen: a muted mixer always displays 0.
    pub fn displayed_level(&self) -> u8 {
        if self.muted { 0 } else { self.level.min(100) }
    }
}

/// Messages understood by the overlay coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayCommand {
    ShowChannelOverlay(ChannelSnapshot),
    UpdateCodecInfo(CodecInfo),
    StartAutoCloseTimer,
    CloseChannelOverlay,
    ShowVolumeOverlay(VolumeSnapshot),
    CloseVolumeOverlay,
}

impl OverlayCommand {
    pub fn name(&self) -> &'static str {
        match self {
            OverlayCommand::ShowChannelOverlay(_) => "show_channel",
            OverlayCommand::UpdateCodecInfo(_) => "update_codecs",
            OverlayCommand::StartAutoCloseTimer => "start_close",
            OverlayCommand::CloseChannelOverlay => "close_channel",
            OverlayCommand::ShowVolumeOverlay(_) => "show_volume",
            OverlayCommand::CloseVolumeOverlay => "close_volume",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn muted_volume_displays_zero() {
        let v = VolumeSnapshot { level: 70, muted: true };
        assert_eq!(v.displayed_level(), 0);
        let v = VolumeSnapshot { level: 70, muted: false };
        assert_eq!(v.displayed_level(), 70);
    }
}
