mod common;

use std::sync::Arc;
use std::thread;

use common::{FakeMixer, SharedMixer};
use ipmcontrol::VolumeSession;
use ipmosd::{OverlayCommand, VolumeSnapshot, overlay_channel};

fn session(level: u8, muted: bool) -> (VolumeSession, Arc<FakeMixer>, crossbeam_channel::Receiver<OverlayCommand>) {
    let mixer = Arc::new(FakeMixer::new(level, muted));
    let (inbox, rx) = overlay_channel();
    let session = VolumeSession::new(Some(Box::new(SharedMixer(mixer.clone()))), 5, inbox);
    (session, mixer, rx)
}

#[test]
fn adjust_clamps_to_bounds() {
    let (session, _mixer, _rx) = session(50, false);

    assert_eq!(session.adjust(150), 100);
    assert_eq!(session.adjust(-150), 0);
    assert_eq!(session.adjust(-5), 0);
}

#[test]
fn raising_the_volume_unmutes() {
    let (session, mixer, rx) = session(30, true);

    assert_eq!(session.adjust(5), 35);
    assert!(!*mixer.muted.lock());
    assert_eq!(
        rx.try_recv().expect("volume overlay"),
        OverlayCommand::ShowVolumeOverlay(VolumeSnapshot {
            level: 35,
            muted: false
        })
    );
}

#[test]
fn lowering_the_volume_keeps_mute() {
    let (session, mixer, rx) = session(30, true);

    assert_eq!(session.volume_down(None), 25);
    assert!(*mixer.muted.lock());
    assert_eq!(
        rx.try_recv().expect("volume overlay"),
        OverlayCommand::ShowVolumeOverlay(VolumeSnapshot {
            level: 25,
            muted: true
        })
    );
}

#[test]
fn step_defaults_to_configured_value() {
    let (session, _mixer, _rx) = session(40, false);

    assert_eq!(session.volume_up(None), 45);
    assert_eq!(session.volume_up(Some(10)), 55);
    assert_eq!(session.volume_down(Some(55)), 0);
}

#[test]
fn toggle_mute_reports_new_state() {
    let (session, _mixer, rx) = session(60, false);

    assert!(session.toggle_mute());
    assert!(session.is_muted());
    match rx.try_recv().expect("volume overlay") {
        OverlayCommand::ShowVolumeOverlay(snapshot) => {
            assert!(snapshot.muted);
            assert_eq!(snapshot.displayed_level(), 0);
        }
        other => panic!("unexpected command {:?}", other),
    }

    assert!(!session.toggle_mute());
}

#[test]
fn concurrent_adjustments_are_not_lost() {
    let (session, mixer, _rx) = session(0, false);
    let session = Arc::new(session);

    let workers: Vec<_> = (0..10)
        .map(|_| {
            let session = session.clone();
            thread::spawn(move || {
                session.adjust(5);
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker");
    }

    assert_eq!(*mixer.level.lock(), 50);
}

#[test]
fn degraded_session_reports_zero() {
    let (inbox, rx) = overlay_channel();
    let session = VolumeSession::new(None, 5, inbox);

    assert!(!session.is_available());
    assert_eq!(session.volume_up(None), 0);
    assert_eq!(session.level(), 0);
    assert!(!session.toggle_mute());
    assert!(rx.try_recv().is_err());
}
