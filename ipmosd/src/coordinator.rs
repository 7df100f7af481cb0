use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use ipmconfig::Config;
use tracing::{debug, info};

use crate::{
    ChannelWidget, OverlayCommand, OverlayMachine, OverlayState, OverlaySurface, VolumeWidget,
};

const DEFAULT_CHANNEL_CLOSE: Duration = Duration::from_secs(5);
const DEFAULT_VOLUME_CLOSE: Duration = Duration::from_secs(2);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct CoordinatorOptions {
    pub channel_close_after: Duration,
    pub volume_close_after: Duration,
    pub poll_interval: Duration,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            channel_close_after: DEFAULT_CHANNEL_CLOSE,
            volume_close_after: DEFAULT_VOLUME_CLOSE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl CoordinatorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            channel_close_after: config.get_channel_osd_timeout(),
            volume_close_after: config.get_volume_osd_timeout(),
            poll_interval: config.get_osd_poll_interval().max(Duration::from_millis(10)),
        }
    }
}

/// Single owner of the channel and volume overlays.
///
/// Commands are applied strictly in arrival order. A command cannot be
/// recognized as stale: an `UpdateCodecInfo` from a superseded load simply
/// updates whatever banner is visible.
pub struct OverlayCoordinator<S: OverlaySurface> {
    channel: OverlayMachine<ChannelWidget>,
    volume: OverlayMachine<VolumeWidget>,
    surface: S,
}

impl<S: OverlaySurface> OverlayCoordinator<S> {
    pub fn new(surface: S, options: &CoordinatorOptions) -> Self {
        Self {
            channel: OverlayMachine::new(options.channel_close_after),
            volume: OverlayMachine::new(options.volume_close_after),
            surface,
        }
    }

    pub fn channel_state(&self) -> OverlayState {
        self.channel.state()
    }

    pub fn volume_state(&self) -> OverlayState {
        self.volume.state()
    }

    pub fn channel_widget(&self) -> Option<&ChannelWidget> {
        self.channel.widget()
    }

    pub fn volume_widget(&self) -> Option<&VolumeWidget> {
        self.volume.widget()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn apply(&mut self, command: OverlayCommand, now: Instant) {
        debug!(command = command.name(), "Applying overlay command");

        match command {
            OverlayCommand::ShowChannelOverlay(snapshot) => {
                let widget = ChannelWidget::new(snapshot);
                if self.channel.show(widget).is_some() {
                    self.surface.hide_channel();
                }
                if let Some(widget) = self.channel.widget() {
                    self.surface.show_channel(widget);
                }
            }
            OverlayCommand::UpdateCodecInfo(info) => {
                if self.channel.update(|w| w.apply_codecs(&info)) {
                    if let Some(widget) = self.channel.widget() {
                        self.surface.refresh_channel(widget);
                    }
                } else {
                    debug!("Codec info received while channel overlay is hidden, dropped");
                }
            }
            OverlayCommand::StartAutoCloseTimer => {
                self.channel.arm(now);
            }
            OverlayCommand::CloseChannelOverlay => {
                if self.channel.close().is_some() {
                    self.surface.hide_channel();
                }
            }
            OverlayCommand::ShowVolumeOverlay(snapshot) => {
                if self.volume.show(VolumeWidget::from(snapshot)).is_some() {
                    self.surface.hide_volume();
                }
                if let Some(widget) = self.volume.widget() {
                    self.surface.show_volume(widget);
                }
                // Each volume change restarts the countdown
                self.volume.arm(now);
            }
            OverlayCommand::CloseVolumeOverlay => {
                if self.volume.close().is_some() {
                    self.surface.hide_volume();
                }
            }
        }
    }

    /// Closes the overlays whose deadline has passed.
    pub fn tick(&mut self, now: Instant) {
        if self.channel.expire(now).is_some() {
            debug!("Channel overlay auto-closed");
            self.surface.hide_channel();
        }
        if self.volume.expire(now).is_some() {
            debug!("Volume overlay auto-closed");
            self.surface.hide_volume();
        }
    }

    /// Runs until every [`crate::OverlayInbox`] has been dropped.
    pub fn run(mut self, rx: Receiver<OverlayCommand>, poll_interval: Duration) {
        info!("🪟 Overlay coordinator started");

        loop {
            match rx.recv_timeout(poll_interval) {
                Ok(command) => {
                    self.apply(command, Instant::now());
                    for command in rx.try_iter() {
                        self.apply(command, Instant::now());
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.tick(Instant::now());
        }

        if self.channel.close().is_some() {
            self.surface.hide_channel();
        }
        if self.volume.close().is_some() {
            self.surface.hide_volume();
        }
        info!("Overlay coordinator stopped");
    }
}

/// Starts the coordinator on its own thread.
pub fn spawn_coordinator<S>(
    rx: Receiver<OverlayCommand>,
    surface: S,
    options: CoordinatorOptions,
) -> io::Result<JoinHandle<()>>
where
    S: OverlaySurface + 'static,
{
    thread::Builder::new()
        .name("osd-coordinator".into())
        .spawn(move || OverlayCoordinator::new(surface, &options).run(rx, options.poll_interval))
}
