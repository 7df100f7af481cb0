mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeEngine, NOSIGNAL, NOVIDEO, channels};
use ipmcontrol::{MediaSession, Placeholders};
use ipmosd::{CodecInfo, OverlayCommand, overlay_channel};
use serde_json::json;

fn placeholders() -> Placeholders {
    Placeholders {
        novideo: NOVIDEO.into(),
        nosignal: NOSIGNAL.into(),
    }
}

#[test]
fn negative_index_wraps_to_last_channel() {
    let engine = Arc::new(FakeEngine::with_video(480, true, "h264"));
    let (inbox, rx) = overlay_channel();
    let session = MediaSession::new(engine.clone(), channels(5), inbox, placeholders());

    session.play_channel(-1);

    assert_eq!(session.current_index(), Some(4));
    assert_eq!(
        engine.loads(),
        vec![NOVIDEO.to_string(), "http://streams.example/4.m3u8".to_string()]
    );

    let commands: Vec<_> = rx.try_iter().collect();
    assert_eq!(commands.len(), 3);
    match &commands[0] {
        OverlayCommand::ShowChannelOverlay(snapshot) => {
            assert_eq!(snapshot.name, "Channel 4");
            assert_eq!(snapshot.logo, "http://logos.example/4.png");
        }
        other => panic!("unexpected first command {:?}", other),
    }
    assert_eq!(
        commands[1],
        OverlayCommand::UpdateCodecInfo(CodecInfo {
            video_codec: Some("H264".into()),
            audio_codec: None,
            resolution: Some(480),
            interlaced: Some(true),
        })
    );
    assert_eq!(commands[2], OverlayCommand::StartAutoCloseTimer);
}

#[test]
fn index_past_the_end_wraps_around() {
    let engine = Arc::new(FakeEngine::default());
    let (inbox, _rx) = overlay_channel();
    let session = MediaSession::new(engine, channels(3), inbox, placeholders());

    session.play_channel(7);
    assert_eq!(session.current_index(), Some(1));
}

#[test]
fn observed_codecs_win_over_property_reads() {
    let engine = Arc::new(FakeEngine::with_video(576, false, "mpeg2video"));
    let (inbox, rx) = overlay_channel();
    let session = MediaSession::new(engine.clone(), channels(2), inbox, placeholders());

    session.play_channel(0);
    rx.try_iter().for_each(drop);

    engine.emit("audio-codec-name", json!("aac"));
    let state = session.state();
    assert_eq!(state.audio_codec.as_deref(), Some("AAC"));
    assert_eq!(state.video_codec.as_deref(), Some("MPEG2VIDEO"));
    assert_eq!(state.resolution, Some(576));
}

#[test]
fn unknown_height_skips_codec_update() {
    let engine = Arc::new(FakeEngine::default());
    let (inbox, rx) = overlay_channel();
    let session = MediaSession::new(engine, channels(2), inbox, placeholders());

    session.play_channel(1);

    let names: Vec<_> = rx.try_iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["show_channel", "start_close"]);
}

#[test]
fn failed_load_still_arms_the_close_timer() {
    let engine = Arc::new(FakeEngine::default());
    *engine.fail_loads.lock() = true;
    let (inbox, rx) = overlay_channel();
    let session = MediaSession::new(engine.clone(), channels(2), inbox, placeholders());

    session.play_channel(0);

    assert_eq!(session.current_index(), Some(0));
    let commands: Vec<_> = rx.try_iter().collect();
    assert_eq!(commands, vec![OverlayCommand::StartAutoCloseTimer]);
}

#[test]
fn every_change_bumps_the_counter() {
    let engine = Arc::new(FakeEngine::default());
    let (inbox, _rx) = overlay_channel();
    let session = MediaSession::new(engine, channels(4), inbox, placeholders());

    session.play_channel(0);
    session.play_channel(1);
    session
        .play_url("https://example.com/live.m3u8")
        .expect("custom url plays");

    let state = session.state();
    assert_eq!(state.change_counter, 3);
    assert_eq!(state.current_index, None);
}

#[test]
fn toggles_push_engine_settings() {
    let engine = Arc::new(FakeEngine::default());
    let (inbox, _rx) = overlay_channel();
    let session = MediaSession::new(engine.clone(), channels(1), inbox, placeholders());

    assert!(session.toggle_deinterlace());
    assert!(!session.toggle_deinterlace());
    assert!(session.toggle_low_latency());

    let calls = engine.calls();
    assert_eq!(calls[0], "set vf=yadif=0");
    assert_eq!(calls[1], "set vf=");
    assert!(calls.contains(&"set audio-buffer=0".to_string()));
    assert!(calls.contains(&"set stream-buffer-size=4k".to_string()));
    assert!(session.state().low_latency);
}

#[test]
fn show_overlay_needs_a_current_channel() {
    let engine = Arc::new(FakeEngine::with_video(480, true, "h264"));
    let (inbox, rx) = overlay_channel();
    let session = MediaSession::new(engine, channels(3), inbox, placeholders());

    assert!(!session.show_overlay());
    assert!(rx.try_recv().is_err());

    session.play_channel(2);
    rx.try_iter().for_each(drop);

    assert!(session.show_overlay());
    let commands: Vec<_> = rx.try_iter().collect();
    assert!(matches!(commands[0], OverlayCommand::ShowChannelOverlay(ref s) if s.name == "Channel 2"));
    assert!(matches!(commands[1], OverlayCommand::UpdateCodecInfo(ref i) if i.resolution == Some(480)));
}

#[test]
fn stream_failure_loads_no_signal_image() {
    let engine = Arc::new(FakeEngine::default());
    let (inbox, rx) = overlay_channel();
    let session = Arc::new(MediaSession::new(
        engine.clone(),
        channels(1),
        inbox,
        placeholders(),
    ));
    let watcher = session.spawn_log_watcher().expect("watcher thread");

    engine.emit_log("error", "ffmpeg", "tcp://1.2.3.4: Failed to connect");
    engine.emit_log("error", "vo/gpu", "Failed to create context");

    let command = rx
        .recv_timeout(Duration::from_secs(2))
        .expect("overlay command after failure");
    assert_eq!(command, OverlayCommand::StartAutoCloseTimer);

    engine.close_logs();
    watcher.join().expect("watcher ends with the log stream");
    assert_eq!(engine.loads(), vec![NOSIGNAL.to_string()]);
}
