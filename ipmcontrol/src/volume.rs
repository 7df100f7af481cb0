//! Volume session: mixer access plus the volume overlay.

use ipmconfig::Config;
use ipmosd::{OverlayCommand, OverlayInbox, VolumeSnapshot};
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::errors::MixerError;
use crate::mixer::{AlsaMixer, Mixer};

pub struct VolumeSession {
    mixer: Option<Box<dyn Mixer>>,
    default_step: u8,
    overlay: OverlayInbox,
    // Serializes read-modify-write cycles on the mixer
    adjust_lock: Mutex<()>,
}

impl VolumeSession {
    /// `mixer = None` gives a degraded session: every call reports 0/false.
    pub fn new(mixer: Option<Box<dyn Mixer>>, default_step: u8, overlay: OverlayInbox) -> Self {
        Self {
            mixer,
            default_step,
            overlay,
            adjust_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &Config, overlay: OverlayInbox) -> Self {
        let mixer = match AlsaMixer::open_with_fallback(&config.get_mixer_name()) {
            Ok(mixer) => Some(Box::new(mixer) as Box<dyn Mixer>),
            Err(e) => {
                error!("Volume control not available: {}", e);
                None
            }
        };
        let step = config
            .get_volume_step()
            .ok()
            .and_then(|s| u8::try_from(s).ok())
            .unwrap_or(5);

        Self::new(mixer, step, overlay)
    }

    pub fn is_available(&self) -> bool {
        self.mixer.is_some()
    }

    pub fn default_step(&self) -> u8 {
        self.default_step
    }

    pub fn level(&self) -> u8 {
        let Some(mixer) = &self.mixer else {
            return 0;
        };
        mixer.volume().unwrap_or_else(|e| {
            error!("Error getting volume: {}", e);
            0
        })
    }

    pub fn is_muted(&self) -> bool {
        let Some(mixer) = &self.mixer else {
            return false;
        };
        mixer.is_muted().unwrap_or_else(|e| {
            error!("Error checking mute state: {}", e);
            false
        })
    }

    /// Shifts the level by `delta`, clamped to `[0, 100]`.
    ///
    /// A positive change unmutes. Returns the new level.
    pub fn adjust(&self, delta: i32) -> u8 {
        let Some(mixer) = &self.mixer else {
            warn!("Volume control not available");
            return 0;
        };

        let result = {
            let _guard = self.adjust_lock.lock();
            Self::apply_delta(mixer.as_ref(), delta)
        };

        match result {
            Ok(snapshot) => {
                info!(level = snapshot.level, muted = snapshot.muted, "Volume adjusted");
                self.overlay.send(OverlayCommand::ShowVolumeOverlay(snapshot));
                snapshot.level
            }
            Err(e) => {
                error!("Error adjusting volume: {}", e);
                self.level()
            }
        }
    }

    fn apply_delta(mixer: &dyn Mixer, delta: i32) -> Result<VolumeSnapshot, MixerError> {
        let current = i32::from(mixer.volume()?);
        let level = u8::try_from((current + delta).clamp(0, 100)).unwrap_or(100);
        mixer.set_volume(level)?;

        let mut muted = mixer.is_muted()?;
        if delta > 0 && muted {
            mixer.set_muted(false)?;
            muted = false;
        }
        Ok(VolumeSnapshot { level, muted })
    }

    pub fn volume_up(&self, step: Option<u8>) -> u8 {
        self.adjust(i32::from(step.unwrap_or(self.default_step)))
    }

    pub fn volume_down(&self, step: Option<u8>) -> u8 {
        self.adjust(-i32::from(step.unwrap_or(self.default_step)))
    }

    /// Flips the mute switch. Returns the new state.
    pub fn toggle_mute(&self) -> bool {
        let Some(mixer) = &self.mixer else {
            warn!("Volume control not available");
            return false;
        };

        let result = {
            let _guard = self.adjust_lock.lock();
            mixer
                .is_muted()
                .and_then(|muted| mixer.set_muted(!muted).map(|_| !muted))
        };

        match result {
            Ok(muted) => {
                let level = self.level();
                info!(muted, "Mute toggled");
                self.overlay
                    .send(OverlayCommand::ShowVolumeOverlay(VolumeSnapshot { level, muted }));
                muted
            }
            Err(e) => {
                error!("Error toggling mute: {}", e);
                self.is_muted()
            }
        }
    }
}
