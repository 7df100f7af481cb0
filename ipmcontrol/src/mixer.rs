//! Audio mixer capability and its ALSA implementation over `amixer`.

use std::process::Command;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::errors::MixerError;

/// Controls tried, in order, when the configured one cannot be opened.
pub const FALLBACK_CONTROLS: [&str; 5] = ["PCM", "Speaker", "Master", "Front", "Headphone"];

lazy_static! {
    static ref PERCENT_RE: Regex = Regex::new(r"\[(\d{1,3})%\]").expect("valid percent regex");
    static ref SWITCH_RE: Regex = Regex::new(r"\[(on|off)\]").expect("valid switch regex");
    static ref CONTROL_RE: Regex = Regex::new(r"'([^']+)'").expect("valid control regex");
}

pub trait Mixer: Send + Sync {
    fn name(&self) -> &str;

    /// Level in percent, averaged over channels.
    fn volume(&self) -> Result<u8, MixerError>;

    fn set_volume(&self, level: u8) -> Result<(), MixerError>;

    /// `true` as soon as one channel is muted.
    fn is_muted(&self) -> Result<bool, MixerError>;

    fn set_muted(&self, muted: bool) -> Result<(), MixerError>;
}

/// Per-channel values read from `amixer sget`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MixerReading {
    pub levels: Vec<u8>,
    pub switches: Vec<bool>,
}

impl MixerReading {
    pub fn parse(output: &str) -> Self {
        let mut reading = MixerReading::default();

        for line in output.lines() {
            // "  Front Left: Playback 45 [70%] [-10.50dB] [on]"
            if !line.contains(':') {
                continue;
            }
            if let Some(level) = PERCENT_RE
                .captures(line)
                .and_then(|c| c[1].parse::<u8>().ok())
            {
                reading.levels.push(level.min(100));
            }
            if let Some(switch) = SWITCH_RE.captures(line) {
                reading.switches.push(&switch[1] == "on");
            }
        }

        reading
    }

    pub fn level(&self) -> Option<u8> {
        if self.levels.is_empty() {
            return None;
        }
        let sum: usize = self.levels.iter().map(|l| *l as usize).sum();
        u8::try_from(sum / self.levels.len()).ok()
    }

    /// A control without playback switch is never muted.
    pub fn muted(&self) -> bool {
        self.switches.iter().any(|on| !on)
    }
}

/// Simple mixer control driven through the `amixer` command.
#[derive(Debug, Clone)]
pub struct AlsaMixer {
    control: String,
}

impl AlsaMixer {
    /// Opens `control`, checking that it reports a playback volume.
    pub fn open(control: &str) -> Result<Self, MixerError> {
        let mixer = Self {
            control: control.to_string(),
        };
        mixer.read()?.level().ok_or(MixerError::Parse("volume"))?;
        Ok(mixer)
    }

    /// Opens `preferred`, or the first usable control of [`FALLBACK_CONTROLS`].
    pub fn open_with_fallback(preferred: &str) -> Result<Self, MixerError> {
        match Self::open(preferred) {
            Ok(mixer) => {
                info!("Successfully initialized ALSA mixer: {}", preferred);
                return Ok(mixer);
            }
            Err(e) => warn!("Error initializing mixer '{}': {}", preferred, e),
        }

        let available = Self::list_controls().unwrap_or_else(|e| {
            warn!("Cannot list mixer controls: {}", e);
            Vec::new()
        });
        info!("Available mixers: {:?}", available);

        for candidate in FALLBACK_CONTROLS {
            if !available.iter().any(|c| c == candidate) {
                continue;
            }
            match Self::open(candidate) {
                Ok(mixer) => {
                    info!("Using fallback mixer: {}", candidate);
                    return Ok(mixer);
                }
                Err(e) => debug!("Fallback mixer {} unusable: {}", candidate, e),
            }
        }

        Err(MixerError::NoControl(format!(
            "{}, {}",
            preferred,
            FALLBACK_CONTROLS.join(", ")
        )))
    }

    pub fn list_controls() -> Result<Vec<String>, MixerError> {
        let output = amixer(&["scontrols"])?;
        Ok(output
            .lines()
            .filter_map(|line| CONTROL_RE.captures(line).map(|c| c[1].to_string()))
            .collect())
    }

    fn read(&self) -> Result<MixerReading, MixerError> {
        Ok(MixerReading::parse(&amixer(&["sget", &self.control])?))
    }
}

fn amixer(args: &[&str]) -> Result<String, MixerError> {
    let output = Command::new("amixer").args(args).output()?;
    if !output.status.success() {
        return Err(MixerError::Command(
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl Mixer for AlsaMixer {
    fn name(&self) -> &str {
        &self.control
    }

    fn volume(&self) -> Result<u8, MixerError> {
        self.read()?.level().ok_or(MixerError::Parse("volume"))
    }

    fn set_volume(&self, level: u8) -> Result<(), MixerError> {
        let level = format!("{}%", level.min(100));
        amixer(&["-q", "sset", &self.control, &level]).map(|_| ())
    }

    fn is_muted(&self) -> Result<bool, MixerError> {
        Ok(self.read()?.muted())
    }

    fn set_muted(&self, muted: bool) -> Result<(), MixerError> {
        let switch = if muted { "mute" } else { "unmute" };
        amixer(&["-q", "sset", &self.control, switch]).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEREO: &str = "Simple mixer control 'Master',0
  Capabilities: pvolume pswitch pswitch-joined
  Playback channels: Front Left - Front Right
  Limits: Playback 0 - 87
  Mono:
  Front Left: Playback 61 [70%] [-19.50dB] [on]
  Front Right: Playback 60 [69%] [-20.25dB] [off]
";

    const MONO_NO_SWITCH: &str = "Simple mixer control 'PCM',0
  Capabilities: pvolume pvolume-joined
  Playback channels: Mono
  Limits: Playback -10239 - 400
  Mono: Playback -2000 [81%] [-20.00dB]
";

    #[test]
    fn stereo_level_is_average_and_any_off_is_muted() {
        let reading = MixerReading::parse(STEREO);
        assert_eq!(reading.levels, vec![70, 69]);
        assert_eq!(reading.level(), Some(69));
        assert!(reading.muted());
    }

    #[test]
    fn control_without_switch_is_not_muted() {
        let reading = MixerReading::parse(MONO_NO_SWITCH);
        assert_eq!(reading.level(), Some(81));
        assert!(!reading.muted());
    }

    #[test]
    fn empty_output_has_no_level() {
        assert_eq!(MixerReading::parse("").level(), None);
    }
}
