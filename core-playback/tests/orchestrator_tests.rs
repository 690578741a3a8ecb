//! Integration tests for the playback state machine: transport operations,
//! resolution, error policy and stale-event rejection.

mod common;

use bridge_traits::DeviceEvent;
use common::*;
use core_playback::{
    ActiveVerse, AudioState, PlaybackError, PlaybackMode, PlaybackOrchestrator, PlaybackPhase,
    Reciter, ReciterRegistry,
};
use core_runtime::config::PlaybackSettings;
use std::sync::Arc;
use std::time::Duration;

const URL_A: &str = "https://cdn.example/verses/002002.mp3";

// ============================================================================
// Single verse
// ============================================================================

#[test]
fn test_play_verse_updates_state_optimistically() {
    let device = FakeDevice::new();
    let mut orch = orchestrator(&device);
    let state_rx = orch.subscribe_state();

    orch.play_verse(2, Some(URL_A.to_string()), None).unwrap();

    assert_eq!(device.opened(), 1);
    assert_eq!(device.latest().request.url, URL_A);
    assert_eq!(orch.phase(), PlaybackPhase::Loading);

    let state = state_rx.borrow().clone();
    assert!(state.is_playing);
    assert!(!state.is_paused);
    assert_eq!(state.current_verse, Some(ActiveVerse::Verse(2)));
    assert_eq!(state.current_mode, PlaybackMode::SingleVerse);
    assert_eq!(state.progress, 0.0);

    start_latest(&mut orch, &device);
    assert_eq!(orch.phase(), PlaybackPhase::Playing);
    assert!(orch.state().is_consistent());
}

#[test]
fn test_play_same_verse_twice_toggles_instead_of_reloading() {
    let device = FakeDevice::new();
    let mut orch = orchestrator(&device);

    orch.play_verse(2, Some(URL_A.to_string()), None).unwrap();
    orch.play_verse(2, Some(URL_A.to_string()), None).unwrap();

    assert_eq!(device.opened(), 1);
    assert_eq!(orch.phase(), PlaybackPhase::Paused);
    assert!(orch.state().is_paused);
    assert!(!orch.state().is_playing);

    orch.play_verse(2, Some(URL_A.to_string()), None).unwrap();
    assert_eq!(device.opened(), 1);
    assert!(orch.state().is_playing);
    assert_eq!(
        device.latest().commands.lock().clone(),
        vec![
            SessionCommand::Play,
            SessionCommand::Pause,
            SessionCommand::Resume
        ]
    );
}

#[test]
fn test_play_different_verse_replaces_adapter() {
    let device = FakeDevice::new();
    let mut orch = orchestrator(&device);

    orch.play_verse(1, Some("https://cdn.example/1.mp3".into()), None)
        .unwrap();
    orch.play_verse(2, Some("https://cdn.example/2.mp3".into()), None)
        .unwrap();

    assert_eq!(device.opened(), 2);
    assert!(!device.session(0).is_live());
    assert!(device.session(1).is_live());
    assert_eq!(device.max_live(), 1);
    assert_eq!(orch.state().current_verse, Some(ActiveVerse::Verse(2)));
}

#[test]
fn test_play_verse_url_preference() {
    let device = FakeDevice::new();
    let mut orch = orchestrator(&device);

    let mut ctx = context(1, 1..=7);
    ctx = core_playback::NavigationContext::new(
        ctx.chapter(),
        ctx.verses()
            .iter()
            .cloned()
            .map(|v| {
                if v.verse_number == 3 {
                    v.with_audio_url("https://provider.example/001003.mp3")
                } else {
                    v
                }
            })
            .collect(),
    );

    // Verse URL from the content provider.
    orch.play_verse(3, None, Some(ctx)).unwrap();
    assert_eq!(device.latest().request.url, "https://provider.example/001003.mp3");

    // Resolver with the selected reciter.
    orch.play_verse(4, None, None).unwrap();
    assert_eq!(
        device.latest().request.url,
        "https://everyayah.com/data/Alafasy_128kbps/001004.mp3"
    );

    // Explicit URL wins.
    orch.play_verse(5, Some(URL_A.to_string()), None).unwrap();
    assert_eq!(device.latest().request.url, URL_A);

    let metadata = &device.latest().request.metadata;
    assert_eq!(metadata.chapter, Some(1));
    assert_eq!(metadata.verse, Some(5));
    assert_eq!(metadata.reciter_id.as_deref(), Some("alafasy"));
}

#[test]
fn test_play_verse_refreshes_context_without_changing_mode() {
    let device = FakeDevice::new();
    let mut orch = orchestrator(&device);

    orch.play_verse(1, Some(URL_A.to_string()), Some(context(2, 1..=3)))
        .unwrap();
    assert_eq!(orch.navigation().map(|c| c.chapter()), Some(2));
    assert_eq!(orch.state().current_mode, PlaybackMode::SingleVerse);

    orch.play_verse(1, Some(URL_A.to_string()), Some(context(2, 1..=10)))
        .unwrap();
    assert_eq!(orch.navigation().map(|c| c.len()), Some(10));
    assert_eq!(orch.state().current_mode, PlaybackMode::SingleVerse);
    assert_eq!(device.opened(), 1);
}

#[test]
fn test_single_verse_end_completes_session() {
    let device = FakeDevice::new();
    let observer = RecordingObserver::new();
    let mut orch = orchestrator(&device).with_observer(observer.clone());

    orch.play_verse(2, Some(URL_A.to_string()), Some(context(2, 1..=5)))
        .unwrap();
    start_latest(&mut orch, &device);
    end_latest(&mut orch, &device);

    assert_eq!(
        observer.callbacks(),
        vec![
            Callback::VerseComplete(ActiveVerse::Verse(2)),
            Callback::SessionComplete(PlaybackMode::SingleVerse),
        ]
    );
    assert_eq!(orch.phase(), PlaybackPhase::Idle);
    assert_eq!(orch.state(), &AudioState::idle());
    assert_eq!(orch.pending_advance(), None);
    assert_eq!(device.live(), 0);
}

// ============================================================================
// Complete chapter
// ============================================================================

#[test]
fn test_play_complete_uses_selected_reciter() {
    let device = FakeDevice::new();
    let observer = RecordingObserver::new();
    let mut orch = orchestrator(&device).with_observer(observer.clone());

    orch.set_selected_reciter("husary").unwrap();
    orch.play_complete(36).unwrap();

    assert_eq!(
        device.latest().request.url,
        "https://server13.mp3quran.net/husr/036.mp3"
    );
    assert_eq!(orch.state().current_verse_number(), Some(-1));
    assert_eq!(orch.state().current_mode, PlaybackMode::CompleteChapter);
    assert_eq!(orch.state().chapter, Some(36));

    start_latest(&mut orch, &device);
    end_latest(&mut orch, &device);

    assert_eq!(observer.completed_verses(), vec![ActiveVerse::WholeChapter]);
    assert_eq!(observer.session_completions(), 1);
    assert!(orch.state().is_idle());
}

#[test]
fn test_next_is_noop_in_complete_chapter_mode() {
    let device = FakeDevice::new();
    let mut orch = orchestrator(&device);

    orch.play_complete(1).unwrap();
    orch.next().unwrap();
    orch.previous().unwrap();

    assert_eq!(device.opened(), 1);
    assert_eq!(orch.state().current_mode, PlaybackMode::CompleteChapter);
}

// ============================================================================
// Transport
// ============================================================================

#[test]
fn test_invalid_transport_operations_are_noops() {
    let device = FakeDevice::new();
    let mut orch = orchestrator(&device);

    orch.pause().unwrap();
    orch.resume().unwrap();
    orch.toggle().unwrap();
    orch.seek(50.0).unwrap();
    orch.next().unwrap();
    orch.previous().unwrap();
    assert_eq!(device.opened(), 0);
    assert_eq!(orch.state(), &AudioState::idle());

    orch.play_verse(1, Some(URL_A.to_string()), None).unwrap();
    start_latest(&mut orch, &device);
    orch.resume().unwrap();
    assert_eq!(device.latest().commands.lock().clone(), vec![SessionCommand::Play]);
}

#[test]
fn test_started_while_paused_keeps_paused() {
    let device = FakeDevice::new();
    let mut orch = orchestrator(&device);

    orch.play_verse(1, Some(URL_A.to_string()), None).unwrap();
    orch.pause().unwrap();
    start_latest(&mut orch, &device);

    assert_eq!(orch.phase(), PlaybackPhase::Paused);
    assert!(orch.state().is_paused);
}

#[test]
fn test_stop_is_always_safe() {
    let device = FakeDevice::new();
    let mut orch = orchestrator(&device);

    orch.stop();
    assert_eq!(orch.state(), &AudioState::idle());

    orch.play_auto_mode(1, context(1, 1..=7)).unwrap();
    start_latest(&mut orch, &device);
    device.emit_latest(DeviceEvent::TimeUpdate {
        current_time: Duration::from_secs(3),
        duration: Some(Duration::from_secs(12)),
    });
    orch.pump();
    assert!(orch.state().progress > 0.0);

    orch.stop();
    assert_eq!(orch.phase(), PlaybackPhase::Idle);
    assert_eq!(orch.state(), &AudioState::idle());
    assert!(orch.navigation().is_none());
    assert_eq!(device.live(), 0);

    orch.stop();
    assert_eq!(device.live(), 0);
}

#[test]
fn test_seek_requires_known_duration() {
    let device = FakeDevice::new();
    let mut orch = orchestrator(&device);

    orch.play_verse(1, Some(URL_A.to_string()), None).unwrap();
    start_latest(&mut orch, &device);
    orch.seek(50.0).unwrap();
    assert_eq!(device.latest().commands.lock().len(), 1);

    device.emit_latest(DeviceEvent::MetadataLoaded {
        duration: Duration::from_secs(20),
    });
    orch.pump();
    orch.seek(50.0).unwrap();

    assert_eq!(
        device.latest().commands.lock().last(),
        Some(&SessionCommand::Seek(Duration::from_secs(10)))
    );
    assert_eq!(orch.state().current_time, 10.0);
    assert_eq!(orch.state().progress, 50.0);

    orch.seek(250.0).unwrap();
    assert_eq!(orch.state().progress, 100.0);

    assert!(matches!(
        orch.seek(f64::NAN),
        Err(PlaybackError::InvalidProgress(_))
    ));
}

#[test]
fn test_progress_is_monotonic_between_seeks() {
    let device = FakeDevice::new();
    let observer = RecordingObserver::new();
    let mut orch = orchestrator(&device).with_observer(observer.clone());

    orch.play_verse(1, Some(URL_A.to_string()), None).unwrap();
    start_latest(&mut orch, &device);

    for secs in [2, 5, 3, 6] {
        device.emit_latest(DeviceEvent::TimeUpdate {
            current_time: Duration::from_secs(secs),
            duration: Some(Duration::from_secs(10)),
        });
    }
    orch.pump();

    let ticks: Vec<_> = observer
        .callbacks()
        .into_iter()
        .filter(|c| matches!(c, Callback::TimeUpdate(..)))
        .collect();
    assert_eq!(
        ticks,
        vec![
            Callback::TimeUpdate(2.0, 10.0),
            Callback::TimeUpdate(5.0, 10.0),
            Callback::TimeUpdate(6.0, 10.0),
        ]
    );
    assert_eq!(orch.state().progress, 60.0);

    orch.seek(10.0).unwrap();
    assert_eq!(orch.state().current_time, 1.0);
}

#[test]
fn test_ticks_queued_before_backward_seek_are_dropped() {
    let device = FakeDevice::new();
    let observer = RecordingObserver::new();
    let mut orch = orchestrator(&device).with_observer(observer.clone());

    orch.play_verse(1, Some(URL_A.to_string()), None).unwrap();
    start_latest(&mut orch, &device);

    let tick = |secs| DeviceEvent::TimeUpdate {
        current_time: Duration::from_secs(secs),
        duration: Some(Duration::from_secs(100)),
    };
    device.emit_latest(tick(80));
    orch.pump();
    assert_eq!(orch.state().current_time, 80.0);

    // Measured before the seek but handled after it.
    device.emit_latest(tick(81));
    orch.seek(10.0).unwrap();
    assert_eq!(orch.state().current_time, 10.0);
    assert_eq!(orch.pump(), 1);
    assert_eq!(orch.state().current_time, 10.0);

    for secs in [11, 12, 13] {
        device.emit_latest(tick(secs));
    }
    orch.pump();

    let state = orch.state();
    assert_eq!(state.current_time, 13.0);
    assert_eq!(state.progress, 13.0);
    assert!(!observer
        .callbacks()
        .contains(&Callback::TimeUpdate(81.0, 100.0)));
    assert_eq!(
        observer.callbacks().last(),
        Some(&Callback::TimeUpdate(13.0, 100.0))
    );
}

// ============================================================================
// Stale events
// ============================================================================

#[test]
fn test_events_from_replaced_adapter_are_ignored() {
    let device = FakeDevice::new();
    let observer = RecordingObserver::new();
    let mut orch = orchestrator(&device).with_observer(observer.clone());

    orch.play_auto_mode(1, context(1, 1..=7)).unwrap();
    start_latest(&mut orch, &device);

    // Queued before the replacement, delivered after it.
    device.emit(0, DeviceEvent::Ended);
    orch.play_verse(5, None, None).unwrap();
    // Fired by the host after teardown.
    device.emit(0, DeviceEvent::Ended);
    device.emit(
        0,
        DeviceEvent::Error {
            message: "late failure".into(),
        },
    );
    orch.pump();

    assert!(observer.callbacks().is_empty());
    assert_eq!(orch.state().current_verse, Some(ActiveVerse::Verse(5)));
    assert_eq!(orch.state().current_mode, PlaybackMode::SingleVerse);
    assert_eq!(orch.phase(), PlaybackPhase::Loading);
}

#[test]
fn test_events_after_stop_are_ignored() {
    let device = FakeDevice::new();
    let observer = RecordingObserver::new();
    let mut orch = orchestrator(&device).with_observer(observer.clone());

    orch.play_verse(1, Some(URL_A.to_string()), None).unwrap();
    device.emit_latest(DeviceEvent::Started);
    orch.stop();
    device.emit_latest(DeviceEvent::Ended);

    assert_eq!(orch.pump(), 1);
    assert!(observer.callbacks().is_empty());
    assert_eq!(orch.state(), &AudioState::idle());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_device_error_returns_to_idle_once() {
    let device = FakeDevice::new();
    let observer = RecordingObserver::new();
    let mut orch = orchestrator(&device).with_observer(observer.clone());

    orch.play_auto_mode(2, context(1, 1..=7)).unwrap();
    start_latest(&mut orch, &device);
    device.emit_latest(DeviceEvent::Error {
        message: "network unreachable".into(),
    });
    device.emit_latest(DeviceEvent::Ended);
    orch.pump();

    assert_eq!(observer.errors(), vec!["network unreachable".to_string()]);
    assert!(observer.completed_verses().is_empty());
    assert_eq!(orch.phase(), PlaybackPhase::Idle);
    assert_eq!(orch.state(), &AudioState::idle());
    assert_eq!(orch.pending_advance(), None);
    assert_eq!(device.live(), 0);
    assert_eq!(device.opened(), 1);

    // Clean state: any operation can be retried.
    orch.play_auto_mode(2, context(1, 1..=7)).unwrap();
    assert_eq!(device.opened(), 2);
}

#[test]
fn test_load_failure_is_reported_and_returned() {
    let device = FakeDevice::new();
    let observer = RecordingObserver::new();
    let mut orch = orchestrator(&device).with_observer(observer.clone());

    orch.play_verse(1, Some(URL_A.to_string()), None).unwrap();
    device.fail_next_open("codec unsupported");
    let err = orch
        .play_verse(2, Some("https://cdn.example/2.mp3".into()), None)
        .unwrap_err();

    assert!(matches!(err, PlaybackError::LoadFailed { ref url, .. } if url == "https://cdn.example/2.mp3"));
    assert!(err.is_device_error());
    assert_eq!(observer.errors().len(), 1);
    assert!(orch.state().is_idle());
    assert_eq!(device.live(), 0);

    device.fail_next_play("autoplay blocked");
    assert!(orch.play_complete(2).is_err());
    assert_eq!(observer.errors().len(), 2);
    assert_eq!(device.live(), 0);
    assert!(orch.state().is_consistent());
}

#[test]
fn test_missing_chapter_is_a_resolution_error() {
    let device = FakeDevice::new();
    let observer = RecordingObserver::new();
    let mut orch = orchestrator(&device).with_observer(observer.clone());

    let err = orch.play_verse(4, None, None).unwrap_err();
    assert!(matches!(err, PlaybackError::MissingChapter(4)));
    assert!(err.is_resolution_error());
    assert_eq!(device.opened(), 0);
    assert_eq!(observer.errors().len(), 1);

    assert!(matches!(
        orch.play_complete(0),
        Err(PlaybackError::InvalidChapter(0))
    ));
    assert!(orch.state().is_idle());
}

// ============================================================================
// Reciter selection and volume
// ============================================================================

#[test]
fn test_reciter_selection_never_interrupts_playback() {
    let device = FakeDevice::new();
    let observer = RecordingObserver::new();
    let mut orch = orchestrator(&device).with_observer(observer.clone());

    orch.play_complete(1).unwrap();
    start_latest(&mut orch, &device);
    let before = orch.state().clone();

    assert!(matches!(
        orch.set_selected_reciter("nobody"),
        Err(PlaybackError::UnknownReciter(_))
    ));
    orch.set_selected_reciter("sudais").unwrap();
    orch.set_selected_reciter("sudais").unwrap();

    assert_eq!(orch.state(), &before);
    assert_eq!(device.opened(), 1);
    assert!(device.latest().is_live());
    assert_eq!(orch.selected_reciter(), "sudais");
    assert_eq!(
        observer.callbacks(),
        vec![Callback::ReciterChanged("sudais".to_string())]
    );

    orch.play_complete(2).unwrap();
    assert_eq!(
        device.latest().request.url,
        "https://server11.mp3quran.net/sds/002.mp3"
    );
}

#[test]
fn test_verse_playback_falls_back_for_reciter_without_verse_audio() {
    let device = FakeDevice::new();
    let mut orch = orchestrator(&device);

    orch.set_selected_reciter("minshawi").unwrap();
    orch.play_auto_mode(1, context(112, 1..=4)).unwrap();

    assert_eq!(
        device.latest().request.url,
        "https://everyayah.com/data/Alafasy_128kbps/112001.mp3"
    );
}

#[test]
fn test_volume_applies_to_live_and_future_sessions() {
    let device = FakeDevice::new();
    let mut orch = orchestrator(&device);

    assert!(matches!(
        orch.set_volume(1.5),
        Err(PlaybackError::InvalidVolume(_))
    ));

    orch.play_verse(1, Some(URL_A.to_string()), None).unwrap();
    assert_eq!(device.latest().request.options.initial_volume, 1.0);

    orch.set_volume(0.25).unwrap();
    assert_eq!(
        device.latest().commands.lock().last(),
        Some(&SessionCommand::SetVolume(0.25))
    );

    orch.play_verse(2, Some(URL_A.to_string()), None).unwrap();
    assert_eq!(device.latest().request.options.initial_volume, 0.25);
    assert_eq!(orch.volume(), 0.25);
}

// ============================================================================
// Construction and lifecycle
// ============================================================================

#[test]
fn test_construction_validates_reciters() {
    let device = FakeDevice::new();
    let registry = Arc::new(ReciterRegistry::builtin());

    let unknown_default = PlaybackSettings {
        default_reciter: Some("nobody".into()),
        ..Default::default()
    };
    assert!(matches!(
        PlaybackOrchestrator::new(device.clone(), registry.clone(), &unknown_default),
        Err(PlaybackError::UnknownReciter(_))
    ));

    let fallback_without_verses = PlaybackSettings {
        verse_fallback_reciter: "maher".into(),
        ..Default::default()
    };
    assert!(PlaybackOrchestrator::new(device.clone(), registry.clone(), &fallback_without_verses).is_err());

    let mislabelled = Arc::new(
        ReciterRegistry::new(vec![
            Reciter::new("alafasy", "Mishary Rashid Alafasy", "reciters/alafasy.jpg", true),
            Reciter::new("shuraym", "Saud Al-Shuraim", "reciters/shuraym.jpg", true),
        ])
        .unwrap(),
    );
    assert!(matches!(
        PlaybackOrchestrator::new(device.clone(), mislabelled, &PlaybackSettings::default()),
        Err(PlaybackError::Resolution(_))
    ));

    let invalid = PlaybackSettings {
        initial_volume: 3.0,
        ..Default::default()
    };
    assert!(matches!(
        PlaybackOrchestrator::new(device.clone(), registry.clone(), &invalid),
        Err(PlaybackError::Config(_))
    ));

    let husary = PlaybackSettings {
        default_reciter: Some("husary".into()),
        ..Default::default()
    };
    let orch = PlaybackOrchestrator::new(device, registry, &husary).unwrap();
    assert_eq!(orch.selected_reciter(), "husary");
}

#[test]
fn test_dropping_orchestrator_tears_down_adapter() {
    let device = FakeDevice::new();
    let mut orch = orchestrator(&device);

    orch.play_verse(1, Some(URL_A.to_string()), None).unwrap();
    assert_eq!(device.live(), 1);

    drop(orch);
    assert_eq!(device.live(), 0);
}

#[test]
fn test_independent_orchestrators_do_not_interfere() {
    let device = FakeDevice::new();
    let mut first = orchestrator(&device);
    let mut second = orchestrator(&device);

    first.play_verse(1, Some(URL_A.to_string()), None).unwrap();
    second.play_complete(18).unwrap();
    first.stop();

    assert!(first.state().is_idle());
    assert_eq!(second.state().current_mode, PlaybackMode::CompleteChapter);
    assert!(device.session(1).is_live());
}
