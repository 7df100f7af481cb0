use tracing::info;

use crate::{ChannelWidget, VolumeWidget};

/// Rendering backend driven by the coordinator.
///
/// The coordinator guarantees at most one channel widget and one volume
/// widget on a surface at any time: a `show_*` is always preceded by the
/// matching `hide_*` when a widget of that kind was already displayed.
pub trait OverlaySurface: Send {
    fn show_channel(&mut self, widget: &ChannelWidget);
    fn refresh_channel(&mut self, widget: &ChannelWidget);
    fn hide_channel(&mut self);
    fn show_volume(&mut self, widget: &VolumeWidget);
    fn hide_volume(&mut self);
}

/// Surface that renders overlays as structured log lines.
#[derive(Debug, Clone)]
pub struct TracingSurface {
    corner_radius: usize,
}

impl TracingSurface {
    pub fn new(corner_radius: usize) -> Self {
        Self { corner_radius }
    }
}

impl Default for TracingSurface {
    fn default() -> Self {
        Self::new(15)
    }
}

impl OverlaySurface for TracingSurface {
    fn show_channel(&mut self, widget: &ChannelWidget) {
        info!(
            target: "ipmosd::surface",
            logo = widget.snapshot.logo.as_str(),
            radius = self.corner_radius,
            "📺 {}",
            widget.text_lines().join(" | ")
        );
    }

    fn refresh_channel(&mut self, widget: &ChannelWidget) {
        info!(
            target: "ipmosd::surface",
            "📺 {} [{}]",
            widget.snapshot.name,
            widget.badges().join("] [")
        );
    }

    fn hide_channel(&mut self) {
        info!(target: "ipmosd::surface", "Channel overlay closed");
    }

    fn show_volume(&mut self, widget: &VolumeWidget) {
        info!(
            target: "ipmosd::surface",
            radius = self.corner_radius,
            muted = widget.muted,
            "🔊 {}",
            widget.label()
        );
    }

    fn hide_volume(&mut self) {
        info!(target: "ipmosd::surface", "Volume overlay closed");
    }
}
