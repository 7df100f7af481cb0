//! Media session: the single owner of the playback engine.

use std::io;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use ipmchannels::{Channel, ChannelDirectory};
use ipmconfig::Config;
use ipmosd::{ChannelSnapshot, CodecInfo, OverlayCommand, OverlayInbox};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::engine::{EngineLogMessage, MediaEngine, PropertyChange};
use crate::errors::EngineError;

const VIDEO_FORMAT: &str = "video-format";
const AUDIO_CODEC: &str = "audio-codec-name";

/// Engine settings applied by the low-latency toggle, ON values vs OFF values.
pub fn low_latency_settings(enabled: bool) -> [(&'static str, &'static str); 10] {
    let pick = |on, off| if enabled { on } else { off };
    [
        ("audio-buffer", pick("0", "0.2")),
        ("vd-lavc-threads", pick("1", "0")),
        ("cache-pause", pick("no", "yes")),
        (
            "demuxer-lavf-o",
            pick("reconnect=1,fflags=+nobuffer", "reconnect=1"),
        ),
        ("demuxer-lavf-probe-info", pick("nostreams", "auto")),
        ("demuxer-lavf-analyzeduration", pick("0.1", "0")),
        ("video-sync", "audio"),
        ("interpolation", "no"),
        ("video-latency-hacks", pick("yes", "no")),
        ("stream-buffer-size", pick("4k", "128k")),
    ]
}

/// What is supposed to be playing, and how.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub current_index: Option<usize>,
    pub deinterlace: bool,
    pub low_latency: bool,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub resolution: Option<u32>,
    pub interlaced: Option<bool>,
    /// Incremented by every load request; lets a reader tell that a newer
    /// change has started since it sampled the state.
    pub change_counter: u64,
}

impl SessionState {
    fn clear_stream_facts(&mut self) {
        self.video_codec = None;
        self.audio_codec = None;
        self.resolution = None;
        self.interlaced = None;
    }

    pub fn codec_info(&self) -> CodecInfo {
        CodecInfo {
            video_codec: self.video_codec.clone(),
            audio_codec: self.audio_codec.clone(),
            resolution: self.resolution,
            interlaced: self.interlaced,
        }
    }
}

/// Placeholder images shown while a stream loads or after it failed.
#[derive(Debug, Clone)]
pub struct Placeholders {
    pub novideo: String,
    pub nosignal: String,
}

impl Placeholders {
    pub fn from_config(config: &Config) -> Self {
        Self {
            novideo: config.get_novideo_image(),
            nosignal: config.get_nosignal_image(),
        }
    }
}

#[derive(Default)]
struct CodecSubscriptions {
    video: Option<Receiver<PropertyChange>>,
    audio: Option<Receiver<PropertyChange>>,
}

/// Latest non-empty value pending on a subscription, upper-cased.
fn latest_value(rx: Option<&Receiver<PropertyChange>>) -> Option<String> {
    rx?.try_iter()
        .filter_map(|change| change.value.as_str().map(str::to_string))
        .filter(|v| !v.is_empty())
        .last()
        .map(|v| v.to_uppercase())
}

fn string_property(engine: &dyn MediaEngine, name: &str) -> Option<String> {
    engine
        .get_property(name)
        .ok()
        .and_then(|v| v.as_str().map(str::to_uppercase))
        .filter(|v| !v.is_empty())
}

pub struct MediaSession {
    engine: Arc<dyn MediaEngine>,
    channels: Arc<ChannelDirectory>,
    overlay: OverlayInbox,
    placeholders: Placeholders,
    state: RwLock<SessionState>,
    codecs: Mutex<CodecSubscriptions>,
}

impl MediaSession {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        channels: Arc<ChannelDirectory>,
        overlay: OverlayInbox,
        placeholders: Placeholders,
    ) -> Self {
        let subscribe = |name: &str| match engine.observe(name) {
            Ok(rx) => Some(rx),
            Err(e) => {
                warn!("Cannot observe {}: {}", name, e);
                None
            }
        };
        let codecs = CodecSubscriptions {
            video: subscribe(VIDEO_FORMAT),
            audio: subscribe(AUDIO_CODEC),
        };

        Self {
            engine,
            channels,
            overlay,
            placeholders,
            state: RwLock::new(SessionState::default()),
            codecs: Mutex::new(codecs),
        }
    }

    pub fn channels(&self) -> &Arc<ChannelDirectory> {
        &self.channels
    }

    /// Snapshot of the session, with pending codec updates folded in.
    pub fn state(&self) -> SessionState {
        self.absorb_codec_updates();
        self.state.read().clone()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.state.read().current_index
    }

    pub fn current_channel(&self) -> Option<Channel> {
        let index = self.current_index()?;
        self.channels.get(index).cloned()
    }

    fn absorb_codec_updates(&self) {
        let codecs = self.codecs.lock();
        let video = latest_value(codecs.video.as_ref());
        let audio = latest_value(codecs.audio.as_ref());
        drop(codecs);

        if video.is_none() && audio.is_none() {
            return;
        }
        let mut state = self.state.write();
        if video.is_some() {
            state.video_codec = video;
        }
        if audio.is_some() {
            state.audio_codec = audio;
        }
    }

    fn discard_codec_updates(&self) {
        let codecs = self.codecs.lock();
        for rx in [codecs.video.as_ref(), codecs.audio.as_ref()].into_iter().flatten() {
            rx.try_iter().for_each(drop);
        }
    }

    fn snapshot_of(&self, channel: &Channel) -> ChannelSnapshot {
        let state = self.state.read();
        ChannelSnapshot {
            name: channel.name.clone(),
            logo: channel.logo.clone(),
            deinterlace: state.deinterlace,
            low_latency: state.low_latency,
        }
    }

    /// Plays the channel at `index` modulo the channel count.
    ///
    /// Blocks until the stream has started. Failures are logged and never
    /// returned; the channel overlay close timer is armed in every case.
    pub fn play_channel(&self, index: i64) {
        let Some(index) = self.channels.normalize(index) else {
            warn!("No channels to play");
            return;
        };
        let Some(channel) = self.channels.get(index).cloned() else {
            return;
        };

        let change = {
            let mut state = self.state.write();
            state.change_counter += 1;
            state.current_index = Some(index);
            state.clear_stream_facts();
            state.change_counter
        };

        info!(
            change,
            index,
            url = channel.url.as_str(),
            "=== Changing channel to {} ===",
            channel.name
        );

        if let Err(e) = self.load_channel(&channel, change) {
            error!(change, index, "Error in play_channel: {}", e);
        }

        self.overlay.send(OverlayCommand::StartAutoCloseTimer);
    }

    fn load_channel(&self, channel: &Channel, change: u64) -> Result<(), EngineError> {
        let ticket = self.engine.load(&self.placeholders.novideo)?;
        self.engine.wait_until_started(ticket)?;

        // Whatever the observers reported so far describes the placeholder
        self.discard_codec_updates();
        self.overlay
            .send(OverlayCommand::ShowChannelOverlay(self.snapshot_of(channel)));

        let ticket = self.engine.load(&channel.url)?;
        self.engine.wait_until_started(ticket)?;

        let info = self.read_stream_facts();
        if self.state.read().change_counter != change {
            debug!(change, "A newer channel change is running, codec info may be stale");
        }

        match info {
            Some(info) => self.overlay.send(OverlayCommand::UpdateCodecInfo(info)),
            None => debug!(change, "No video parameters reported"),
        }
        Ok(())
    }

    /// Reads codec and frame facts of the playing stream into the state.
    ///
    /// Returns `None` when the engine has no video parameters yet.
    fn read_stream_facts(&self) -> Option<CodecInfo> {
        self.absorb_codec_updates();

        let height = self
            .engine
            .get_property("video-params")
            .ok()
            .and_then(|p| p.get("h").and_then(Value::as_u64))
            .and_then(|h| u32::try_from(h).ok());
        let interlaced = self
            .engine
            .get_property("video-frame-info")
            .ok()
            .and_then(|f| f.get("interlaced").and_then(Value::as_bool));

        let (need_video, need_audio) = {
            let state = self.state.read();
            (state.video_codec.is_none(), state.audio_codec.is_none())
        };
        let video = need_video
            .then(|| string_property(self.engine.as_ref(), VIDEO_FORMAT))
            .flatten();
        let audio = need_audio
            .then(|| string_property(self.engine.as_ref(), AUDIO_CODEC))
            .flatten();

        let mut state = self.state.write();
        if video.is_some() {
            state.video_codec = video;
        }
        if audio.is_some() {
            state.audio_codec = audio;
        }
        state.resolution = height;
        state.interlaced = interlaced;

        height.map(|_| state.codec_info())
    }

    /// Runs [`MediaSession::play_channel`] on a detached worker thread.
    ///
    /// Workers are never joined: a newer change simply makes an older one
    /// irrelevant once its load is superseded.
    pub fn spawn_play_channel(self: &Arc<Self>, index: i64) -> io::Result<()> {
        let session = Arc::clone(self);
        thread::Builder::new()
            .name("channel-change".into())
            .spawn(move || session.play_channel(index))
            .map(|_| ())
    }

    /// Plays an arbitrary (already validated) URL.
    pub fn play_url(&self, url: &str) -> Result<(), EngineError> {
        self.engine.load(url)?;
        let mut state = self.state.write();
        state.change_counter += 1;
        state.current_index = None;
        state.clear_stream_facts();
        info!(url, "Playing custom URL");
        Ok(())
    }

    pub fn toggle_deinterlace(&self) -> bool {
        let enabled = {
            let mut state = self.state.write();
            state.deinterlace = !state.deinterlace;
            state.deinterlace
        };

        let filter = if enabled { "yadif=0" } else { "" };
        if let Err(e) = self.engine.set_property("vf", filter) {
            error!("Cannot set video filter '{}': {}", filter, e);
        }
        info!(enabled, "Deinterlacing toggled");
        enabled
    }

    pub fn toggle_low_latency(&self) -> bool {
        let enabled = {
            let mut state = self.state.write();
            state.low_latency = !state.low_latency;
            state.low_latency
        };

        for (name, value) in low_latency_settings(enabled) {
            if let Err(e) = self.engine.set_property(name, value) {
                error!("Cannot set {}={}: {}", name, value, e);
            }
        }
        info!(enabled, "Low latency toggled");
        enabled
    }

    pub fn stop(&self) {
        if let Err(e) = self.engine.stop() {
            error!("Cannot stop player: {}", e);
        }
        self.state.write().current_index = None;
    }

    /// Snapshot and last known codec facts of the current channel.
    pub fn current_channel_overlay(&self) -> Option<(ChannelSnapshot, CodecInfo)> {
        let channel = self.current_channel()?;
        self.absorb_codec_updates();
        let info = self.state.read().codec_info();
        Some((self.snapshot_of(&channel), info))
    }

    /// Re-opens the channel banner for what is playing. `false` if nothing is.
    pub fn show_overlay(&self) -> bool {
        let Some((snapshot, info)) = self.current_channel_overlay() else {
            return false;
        };
        self.overlay.send(OverlayCommand::ShowChannelOverlay(snapshot));
        self.overlay.send(OverlayCommand::UpdateCodecInfo(info));
        true
    }

    pub fn hide_overlay(&self) {
        self.overlay.send(OverlayCommand::CloseChannelOverlay);
    }

    /// Replaces a dead stream with the "no signal" image.
    pub fn handle_stream_failure(&self, message: &EngineLogMessage) {
        warn!(
            component = message.component.as_str(),
            "Stream failure, showing no-signal image: {}", message.text
        );
        if let Err(e) = self.engine.load(&self.placeholders.nosignal) {
            error!("Cannot load no-signal image: {}", e);
        }
        self.overlay.send(OverlayCommand::StartAutoCloseTimer);
    }

    /// Watches the engine log for fatal stream errors.
    ///
    /// The thread ends when the engine closes its log stream or the session
    /// is dropped.
    pub fn spawn_log_watcher(self: &Arc<Self>) -> io::Result<JoinHandle<()>> {
        let rx = self.engine.log_messages();
        let session: Weak<Self> = Arc::downgrade(self);

        thread::Builder::new()
            .name("engine-log-watch".into())
            .spawn(move || {
                for message in rx {
                    if !message.is_stream_failure() {
                        continue;
                    }
                    let Some(session) = session.upgrade() else {
                        break;
                    };
                    session.handle_stream_failure(&message);
                }
                debug!("Engine log watcher stopped");
            })
    }
}
