//! Composite output resolution, switched through `xrandr` or `wlr-randr`.

use std::fmt;
use std::process::Command;

use ipmconfig::Config;
use ipmutils::DisplaySession;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{error, info};

use crate::errors::DisplayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Resolution {
    #[serde(rename = "480i")]
    R480i,
    #[serde(rename = "240p")]
    R240p,
    #[serde(rename = "576i")]
    R576i,
    #[serde(rename = "288p")]
    R288p,
    #[serde(rename = "UNK")]
    Unknown,
}

impl Resolution {
    pub fn label(self) -> &'static str {
        match self {
            Resolution::R480i => "480i",
            Resolution::R240p => "240p",
            Resolution::R576i => "576i",
            Resolution::R288p => "288p",
            Resolution::Unknown => "UNK",
        }
    }

    /// Recognizes the mode size mentioned in a line of tool output.
    fn from_mode_text(text: &str) -> Option<Self> {
        [
            ("720x480", Resolution::R480i),
            ("720x240", Resolution::R240p),
            ("720x576", Resolution::R576i),
            ("720x288", Resolution::R288p),
        ]
        .into_iter()
        .find(|(mode, _)| text.contains(mode))
        .map(|(_, res)| res)
    }

    /// Mode to request to leave `self`: 480i ↔ 240p and 576i ↔ 288p.
    ///
    /// X11 needs the explicit interlaced mode names.
    pub fn next_mode(self, session: DisplaySession) -> Option<&'static str> {
        let wayland = session.is_wayland();
        match self {
            Resolution::R480i => Some("720x240"),
            Resolution::R240p => Some(if wayland { "720x480" } else { "720x480i" }),
            Resolution::R576i => Some("720x288"),
            Resolution::R288p => Some(if wayland { "720x576" } else { "720x576i" }),
            Resolution::Unknown => None,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `xrandr` lists the active mode on the output line itself.
pub fn parse_xrandr(output: &str, name: &str) -> Resolution {
    output
        .lines()
        .filter(|line| line.contains(name))
        .find_map(Resolution::from_mode_text)
        .unwrap_or(Resolution::Unknown)
}

/// `wlr-randr` prints one block per output, the active mode marked `current`.
pub fn parse_wlr_randr(output: &str, name: &str) -> Resolution {
    let mut in_output = false;

    for line in output.lines() {
        if !line.starts_with(char::is_whitespace) {
            in_output = line.starts_with(name);
            continue;
        }
        if in_output && line.contains("current") {
            if let Some(res) = Resolution::from_mode_text(line) {
                return res;
            }
        }
    }

    Resolution::Unknown
}

pub struct DisplayController {
    session: DisplaySession,
    output: String,
    current: RwLock<Resolution>,
}

impl DisplayController {
    pub fn new(session: DisplaySession, output: impl Into<String>) -> Self {
        Self {
            session,
            output: output.into(),
            current: RwLock::new(Resolution::Unknown),
        }
    }

    /// Detects the session type and probes the configured output.
    pub fn from_config(config: &Config) -> Self {
        let controller = Self::new(DisplaySession::detect(), config.get_display_output());
        controller.probe();
        controller
    }

    pub fn current(&self) -> Resolution {
        *self.current.read()
    }

    fn tool(&self) -> &'static str {
        if self.session.is_wayland() {
            "wlr-randr"
        } else {
            "xrandr"
        }
    }

    fn query(&self) -> Result<Resolution, DisplayError> {
        let tool = self.tool();
        let output = Command::new(tool)
            .output()
            .map_err(|e| DisplayError::Tool(tool, e))?;
        if !output.status.success() {
            return Err(DisplayError::Status(tool, output.status));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(if self.session.is_wayland() {
            parse_wlr_randr(&text, &self.output)
        } else {
            parse_xrandr(&text, &self.output)
        })
    }

    /// Reads the active mode. Tool failures report `UNK`.
    pub fn probe(&self) -> Resolution {
        let resolution = self.query().unwrap_or_else(|e| {
            error!("Cannot get display resolution: {}", e);
            Resolution::Unknown
        });
        *self.current.write() = resolution;
        resolution
    }

    fn switch_mode(&self, mode: &str) -> Result<(), DisplayError> {
        let tool = self.tool();
        let status = Command::new(tool)
            .args(["--output", &self.output, "--mode", mode])
            .env("DISPLAY", ":0")
            .status()
            .map_err(|e| DisplayError::Tool(tool, e))?;
        if !status.success() {
            return Err(DisplayError::Status(tool, status));
        }
        Ok(())
    }

    /// Switches to the paired mode and returns the re-probed resolution.
    ///
    /// When the switch fails the previous value is kept and returned.
    pub fn cycle(&self) -> Resolution {
        let current = self.current();
        let Some(mode) = current.next_mode(self.session) else {
            info!("Current resolution unknown, not switching");
            return current;
        };

        match self.switch_mode(mode) {
            Ok(()) => {
                let resolution = self.probe();
                info!(from = current.label(), to = resolution.label(), "Resolution switched");
                resolution
            }
            Err(e) => {
                error!("Cannot switch {} to {}: {}", self.output, mode, e);
                current
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XRANDR: &str = "Screen 0: minimum 320 x 200, current 720 x 480, maximum 2048 x 2048
HDMI-1 disconnected (normal left inverted right x axis y axis)
Composite-1 connected primary 720x480+0+0 (normal left inverted right x axis y axis) 0mm x 0mm
   720x480i      59.94*+
   720x240       60.05
";

    const WLR_RANDR: &str = "HDMI-A-1 \"Unknown\"
  Enabled: no
  Modes:
    1920x1080 px, 60.000000 Hz (preferred, current)
Composite-1 \"Unknown\"
  Enabled: yes
  Modes:
    720x480 px, 29.970000 Hz
    720x288 px, 50.080000 Hz (current)
    720x576 px, 25.000000 Hz
";

    #[test]
    fn xrandr_reads_mode_from_output_line() {
        assert_eq!(parse_xrandr(XRANDR, "Composite-1"), Resolution::R480i);
        assert_eq!(parse_xrandr(XRANDR, "VGA-1"), Resolution::Unknown);
    }

    #[test]
    fn wlr_randr_reads_current_mode_of_named_output_only() {
        assert_eq!(parse_wlr_randr(WLR_RANDR, "Composite-1"), Resolution::R288p);
        assert_eq!(parse_wlr_randr(WLR_RANDR, "HDMI-A-1"), Resolution::Unknown);
    }

    #[test]
    fn cycle_table_pairs_modes() {
        let x11 = DisplaySession::X11;
        let wl = DisplaySession::Wayland;
        assert_eq!(Resolution::R480i.next_mode(x11), Some("720x240"));
        assert_eq!(Resolution::R240p.next_mode(x11), Some("720x480i"));
        assert_eq!(Resolution::R240p.next_mode(wl), Some("720x480"));
        assert_eq!(Resolution::R576i.next_mode(wl), Some("720x288"));
        assert_eq!(Resolution::R288p.next_mode(x11), Some("720x576i"));
        assert_eq!(Resolution::R288p.next_mode(wl), Some("720x576"));
        assert_eq!(Resolution::Unknown.next_mode(x11), None);
    }

    #[test]
    fn unknown_resolution_does_not_switch() {
        let controller = DisplayController::new(DisplaySession::X11, "Composite-1");
        assert_eq!(controller.cycle(), Resolution::Unknown);
    }

    #[test]
    fn resolution_serializes_as_label() {
        assert_eq!(
            serde_json::to_value(Resolution::R576i).unwrap(),
            serde_json::json!("576i")
        );
        assert_eq!(Resolution::Unknown.to_string(), "UNK");
    }
}
