use crate::{ChannelSnapshot, CodecInfo, VolumeSnapshot};

/// Channel banner content: name, playback flags and codec badges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelWidget {
    pub snapshot: ChannelSnapshot,
    pub codecs: CodecInfo,
}

impl ChannelWidget {
    pub fn new(snapshot: ChannelSnapshot) -> Self {
        Self {
            snapshot,
            codecs: CodecInfo::default(),
        }
    }

    /// Merges newly reported facts; unknown fields keep their current value.
    pub fn apply_codecs(&mut self, info: &CodecInfo) {
        if let Some(v) = info.video_codec.as_ref().filter(|v| !v.is_empty()) {
            self.codecs.video_codec = Some(v.clone());
        }
        if let Some(a) = info.audio_codec.as_ref().filter(|a| !a.is_empty()) {
            self.codecs.audio_codec = Some(a.clone());
        }
        if let Some(r) = info.resolution.filter(|r| *r > 0) {
            self.codecs.resolution = Some(r);
        }
        if info.interlaced.is_some() {
            self.codecs.interlaced = info.interlaced;
        }
    }

    pub fn text_lines(&self) -> Vec<String> {
        vec![
            self.snapshot.name.clone(),
            format!(
                "Deinterlacing {}",
                if self.snapshot.deinterlace { "on" } else { "off" }
            ),
            format!(
                "{} latency",
                if self.snapshot.low_latency { "Low" } else { "High" }
            ),
        ]
    }

    /// Badges in display order: resolution, video codec, audio codec.
    pub fn badges(&self) -> Vec<String> {
        let mut badges = Vec::new();
        if let Some(res) = self.codecs.resolution {
            let scan = match self.codecs.interlaced {
                Some(true) => "i",
                Some(false) => "p",
                None => "",
            };
            badges.push(format!("{res}{scan}"));
        }
        if let Some(v) = &self.codecs.video_codec {
            badges.push(v.clone());
        }
        if let Some(a) = &self.codecs.audio_codec {
            badges.push(a.clone());
        }
        badges
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeWidget {
    /// Level as drawn, already forced to 0 when muted
    pub level: u8,
    pub muted: bool,
}

impl From<VolumeSnapshot> for VolumeWidget {
    fn from(snapshot: VolumeSnapshot) -> Self {
        Self {
            level: snapshot.displayed_level(),
            muted: snapshot.muted,
        }
    }
}

impl VolumeWidget {
    pub fn label(&self) -> String {
        format!("Volume {}%", self.level)
    }
}
