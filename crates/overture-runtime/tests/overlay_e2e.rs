#![forbid(unsafe_code)]

//! End-to-end overlay sessions driven by the deterministic simulator.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use overture_core::{Control, InputEvent, KeyCode};
use overture_runtime::{
    AudioCue, AudioError, Choreography, DEFAULT_SKIP_KEY, DisabledStorage, FixedEngine,
    IntroEventKind, IntroOverlay, Layer, MemorySink, MemoryStorage, MotionPreferenceDetector,
    OverlayBuilder, OverlayConfig, OverlaySimulator, OverlayState, RevealReason, SkipPersistence,
    SkipSource, StorageBackend, UnavailableEngine, ViewportDetector,
};
use overture_core::{Pose, PoseProps, Position, Timeline, Tween};
use pretty_assertions::assert_eq;

use OverlayState::{Animating, ContentShown, Dismissed, Loading};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

struct Session {
    sim: OverlaySimulator,
    completions: Rc<Cell<u32>>,
    events: MemorySink,
    storage: Arc<MemoryStorage>,
}

impl Session {
    fn with(configure: impl FnOnce(OverlayBuilder) -> OverlayBuilder) -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()), configure)
    }

    fn with_storage(
        storage: Arc<MemoryStorage>,
        configure: impl FnOnce(OverlayBuilder) -> OverlayBuilder,
    ) -> Self {
        let completions = Rc::new(Cell::new(0));
        let events = MemorySink::new();
        let c = Rc::clone(&completions);
        let builder = IntroOverlay::builder()
            .storage(storage.clone())
            .event_sink(events.clone())
            .on_complete(move || c.set(c.get() + 1));
        Self {
            sim: OverlaySimulator::new(configure(builder).build()),
            completions,
            events,
            storage,
        }
    }

    fn fresh() -> Self {
        Self::with(|b| b)
    }

    fn flag(&self) -> Option<String> {
        self.storage.get(DEFAULT_SKIP_KEY).unwrap()
    }

    fn history(&self) -> Vec<OverlayState> {
        self.sim.overlay().history().to_vec()
    }
}

#[test]
fn fresh_session_plays_then_cta_completes() {
    let mut s = Session::fresh();
    s.sim.mount();
    assert_eq!(s.sim.state(), Animating);

    s.sim.run_for(ms(6300));
    assert_eq!(s.sim.state(), Animating);
    assert!(s.sim.run_until(ContentShown, ms(500)));
    assert_eq!(s.completions.get(), 0);

    s.sim.dispatch(Control::PrimaryCta);
    assert_eq!(s.sim.state(), Dismissed);
    assert_eq!(s.completions.get(), 1);
    assert_eq!(s.history(), vec![Loading, Animating, ContentShown, Dismissed]);
    assert_eq!(s.flag(), None, "watching to the end does not persist by default");
    assert_eq!(
        s.events.kinds(),
        vec![
            IntroEventKind::Shown,
            IntroEventKind::Revealed {
                reason: RevealReason::Completed
            },
            IntroEventKind::Completed { skipped: false },
        ]
    );
    assert_eq!(s.sim.overlay().scheduler().active_count(), 0);
}

#[test]
fn reduced_motion_never_animates() {
    let mut s = Session::with(|b| b.motion(MotionPreferenceDetector::new(Some(true))));
    s.sim.mount();
    assert_eq!(s.sim.state(), ContentShown);
    assert_eq!(s.completions.get(), 0);
    assert_eq!(s.sim.overlay().scheduler().active_count(), 0);

    s.sim.dispatch(Control::ScrollHint);
    assert_eq!(s.completions.get(), 1);
    assert!(!s.history().contains(&Animating));
    assert_eq!(s.history(), vec![Loading, ContentShown, Dismissed]);
}

#[test]
fn returning_skipper_never_sees_body() {
    let storage = Arc::new(MemoryStorage::with_entries([(DEFAULT_SKIP_KEY, "1")]));
    let mut s = Session::with_storage(storage, |b| b);
    s.sim.mount();
    assert_eq!(s.sim.state(), Dismissed);
    assert_eq!(s.completions.get(), 1);
    assert!(!s.sim.overlay().view().body_visible);

    s.sim.run_for(ms(10_000));
    s.sim.dispatch(KeyCode::Escape);
    assert_eq!(s.completions.get(), 1);
    assert_eq!(s.history(), vec![Loading, Dismissed]);
    assert_eq!(
        s.events.kinds(),
        vec![IntroEventKind::Restored, IntroEventKind::Completed { skipped: true }]
    );
}

#[test]
fn non_exact_flag_value_still_plays() {
    let storage = Arc::new(MemoryStorage::with_entries([(DEFAULT_SKIP_KEY, "true")]));
    let mut s = Session::with_storage(storage, |b| b);
    s.sim.mount();
    assert_eq!(s.sim.state(), Animating);
}

#[test]
fn double_escape_completes_once_and_persists() {
    let mut s = Session::fresh();
    s.sim.mount();
    s.sim.run_for(ms(1000));
    s.sim.dispatch(KeyCode::Escape);
    assert_eq!(s.sim.state(), ContentShown);
    s.sim.dispatch(KeyCode::Escape);
    s.sim.dispatch(KeyCode::Escape);
    assert_eq!(s.sim.state(), Dismissed);
    assert_eq!(s.completions.get(), 1);
    assert_eq!(s.flag().as_deref(), Some("1"));
}

#[test]
fn skip_and_completion_in_same_turn() {
    let mut s = Session::fresh();
    s.sim.mount();
    s.sim.run_for(ms(6384));
    assert_eq!(s.sim.state(), Animating);

    // The next frame crosses the 6.4 s end while Escape arrives.
    s.sim.turn([InputEvent::Key(KeyCode::Escape)]);
    assert_eq!(s.sim.state(), ContentShown);
    s.sim.run_for(ms(1000));
    assert_eq!(
        s.history().iter().filter(|st| **st == ContentShown).count(),
        1
    );
    assert_eq!(
        s.events.kinds(),
        vec![
            IntroEventKind::Shown,
            IntroEventKind::Skipped {
                source: SkipSource::EscapeKey
            },
            IntroEventKind::Revealed {
                reason: RevealReason::Skipped
            },
        ]
    );
}

#[test]
fn completion_then_skip_in_separate_turns() {
    let mut s = Session::fresh();
    s.sim.mount();
    assert!(s.sim.run_until(ContentShown, ms(7000)));
    s.sim.dispatch(Control::SkipButton);
    assert_eq!(s.sim.state(), Dismissed);
    assert_eq!(s.completions.get(), 1);
    assert_eq!(s.flag().as_deref(), Some("1"));
}

#[test]
fn skip_flag_written_before_completion_callback() {
    let storage = Arc::new(MemoryStorage::new());
    let seen = Rc::new(RefCell::new(None));
    let (store, seen_in) = (storage.clone(), Rc::clone(&seen));
    let mut overlay = IntroOverlay::builder()
        .storage(storage.clone())
        .on_complete(move || {
            *seen_in.borrow_mut() = store.get(DEFAULT_SKIP_KEY).unwrap();
        })
        .build();
    overlay.mount(ms(0));
    overlay.dispatch(KeyCode::Enter.into(), ms(10));
    overlay.dispatch(KeyCode::Enter.into(), ms(20));
    assert_eq!(seen.borrow().as_deref(), Some("1"));
}

#[test]
fn persistence_policy_any_completion() {
    let mut s = Session::with(|b| {
        b.config(OverlayConfig::default().with_skip_persistence(SkipPersistence::OnAnyCompletion))
    });
    s.sim.mount();
    assert!(s.sim.run_until(ContentShown, ms(7000)));
    s.sim.dispatch(Control::PrimaryCta);
    assert_eq!(s.flag().as_deref(), Some("1"));
}

#[test]
fn unavailable_storage_degrades_silently() {
    let calls = Rc::new(Cell::new(0));
    let c = Rc::clone(&calls);
    let mut overlay = IntroOverlay::builder()
        .storage(Arc::new(DisabledStorage))
        .on_complete(move || c.set(c.get() + 1))
        .build();
    overlay.mount(ms(0));
    assert_eq!(overlay.state(), Animating);
    overlay.dispatch(Control::SkipButton.into(), ms(5));
    overlay.dispatch(Control::SkipButton.into(), ms(6));
    assert_eq!(overlay.state(), Dismissed);
    assert_eq!(calls.get(), 1);
}

#[test]
fn engine_failure_fails_open() {
    let mut s = Session::with(|b| {
        b.engine(UnavailableEngine {
            reason: "script blocked".into(),
        })
    });
    s.sim.mount();
    assert_eq!(s.sim.state(), ContentShown);
    assert_eq!(
        s.events.kinds(),
        vec![IntroEventKind::Revealed {
            reason: RevealReason::FailOpen
        }]
    );
}

#[test]
fn timeout_reveals_stuck_intro() {
    let slow = Choreography {
        intro: Timeline::new().to(
            Layer::Background,
            Pose::REST,
            PoseProps::OPACITY,
            Tween::new(Duration::from_secs(60)),
            Position::Append,
        ),
        loops: Vec::new(),
    };
    let mut s = Session::with(|b| {
        b.engine(FixedEngine::new(slow))
            .config(OverlayConfig::default().with_intro_timeout(Some(ms(2000))))
    });
    s.sim.mount();
    s.sim.run_for(ms(1984));
    assert_eq!(s.sim.state(), Animating);
    assert!(s.sim.run_until(ContentShown, ms(100)));
    assert!(s.events.kinds().contains(&IntroEventKind::Revealed {
        reason: RevealReason::Timeout
    }));
}

#[test]
fn timeout_disabled_waits_for_timeline() {
    let mut s = Session::with(|b| b.config(OverlayConfig::default().with_intro_timeout(None)));
    s.sim.mount();
    assert!(s.sim.run_until(ContentShown, ms(7000)));
    assert!(s.events.kinds().contains(&IntroEventKind::Revealed {
        reason: RevealReason::Completed
    }));
}

#[test]
fn reduced_motion_mid_animation_stops_everything() {
    let motion = MotionPreferenceDetector::new(Some(false));
    let mut s = Session::with(|b| b.motion(motion.clone()));
    s.sim.mount();
    s.sim.run_for(ms(2000));
    assert_eq!(s.sim.overlay().controller().active_loops(), 5);

    motion.set(Some(true));
    s.sim.step();
    assert_eq!(s.sim.state(), ContentShown);
    let overlay = s.sim.overlay();
    assert!(!overlay.controller().is_playing());
    assert_eq!(overlay.controller().active_loops(), 0);
    assert!(!overlay.ticker().has_frame_callback());
    assert_eq!(overlay.scheduler().active_count(), 0);
    assert_eq!(overlay.view().pose(Layer::Accent), Pose::REST);

    motion.set(Some(false));
    s.sim.step();
    assert_eq!(s.sim.state(), ContentShown);
}

#[test]
fn leaving_animating_stops_progress() {
    let mut s = Session::fresh();
    s.sim.mount();
    s.sim.run_for(ms(1000));
    let progress = s.sim.overlay().ticker().value();
    assert!(progress > 0.0 && progress < 1.0);
    s.sim.dispatch(KeyCode::Escape);
    assert!(!s.sim.overlay().ticker().is_running());
    s.sim.run_for(ms(5000));
    assert_eq!(s.sim.overlay().ticker().value(), progress);
}

#[test]
fn unmount_releases_and_freezes() {
    let mut s = Session::fresh();
    s.sim.mount();
    s.sim.run_for(ms(500));
    let mut stale = s.sim.overlay().ticker().frame_callback();
    let before = s.sim.overlay().ticker().value();

    s.sim.overlay_mut().unmount();
    assert_eq!(s.sim.overlay().scheduler().active_count(), 0);
    assert!(!s.sim.overlay().controller().has_frame_callback());

    assert_eq!(stale(ms(4000)), overture_runtime::FrameControl::Stop);
    assert_eq!(s.sim.overlay().ticker().value(), before);

    s.sim.run_for(ms(10_000));
    s.sim.dispatch(KeyCode::Escape);
    assert_eq!(s.sim.state(), Animating);
    assert_eq!(s.completions.get(), 0);
}

fn shared_detectors() -> (MotionPreferenceDetector, ViewportDetector) {
    (
        MotionPreferenceDetector::new(Some(false)),
        ViewportDetector::new(1280, 640),
    )
}

#[test]
fn host_listeners_released_at_dismissal() {
    let (motion, viewport) = shared_detectors();
    let mut s = Session::with(|b| b.motion(motion.clone()).viewport(viewport.clone()));
    assert_eq!((motion.subscriber_count(), viewport.subscriber_count()), (0, 0));

    s.sim.mount();
    assert_eq!((motion.subscriber_count(), viewport.subscriber_count()), (1, 1));
    assert_eq!(s.sim.overlay().parallax().listener_count(), 1);

    s.sim.dispatch(KeyCode::Escape);
    s.sim.dispatch(Control::PrimaryCta);
    assert_eq!(s.sim.state(), Dismissed);
    assert_eq!((motion.subscriber_count(), viewport.subscriber_count()), (0, 0));
    assert_eq!(s.sim.overlay().parallax().listener_count(), 0);

    // Host changes after dismissal reach nobody.
    viewport.resize(320);
    motion.set(Some(true));
    s.sim.step();
    assert_eq!(s.history(), vec![Loading, Animating, ContentShown, Dismissed]);
}

#[test]
fn host_listeners_released_at_unmount() {
    let (motion, viewport) = shared_detectors();
    let mut s = Session::with(|b| b.motion(motion.clone()).viewport(viewport.clone()));
    s.sim.mount();
    s.sim.dispatch(InputEvent::Pointer { x: 0.5, y: 0.5 });
    let offset = s.sim.overlay().view().background_offset;

    s.sim.overlay_mut().unmount();
    assert_eq!((motion.subscriber_count(), viewport.subscriber_count()), (0, 0));
    assert_eq!(s.sim.overlay().parallax().listener_count(), 0);

    s.sim.dispatch(InputEvent::Pointer { x: 1.0, y: 1.0 });
    assert_eq!(s.sim.overlay().view().background_offset, offset);
    assert_eq!(s.completions.get(), 0);
}

#[test]
fn restored_session_holds_no_listeners() {
    let storage = Arc::new(MemoryStorage::with_entries([(DEFAULT_SKIP_KEY, "1")]));
    let (motion, viewport) = shared_detectors();
    let mut s = Session::with_storage(storage, |b| {
        b.motion(motion.clone()).viewport(viewport.clone())
    });
    s.sim.mount();
    assert_eq!(s.sim.state(), Dismissed);
    assert_eq!((motion.subscriber_count(), viewport.subscriber_count()), (0, 0));
    assert_eq!(s.sim.overlay().parallax().listener_count(), 0);
}

#[test]
fn theme_and_parallax_follow_the_user() {
    let mut s = Session::fresh();
    s.sim.mount();
    assert_eq!(s.sim.overlay().view().theme.class_name(), "theme-dark");
    s.sim.dispatch(Control::ThemeToggle);
    s.sim.dispatch(InputEvent::pointer_at(1280.0, 0.0, 1280.0, 720.0));
    let view = s.sim.overlay().view();
    assert_eq!(view.theme.class_name(), "theme-light");
    assert_eq!(view.background_offset.to_string(), "60% 50%");
    assert_eq!(s.sim.state(), Animating);
    assert!(s.events.kinds().iter().all(|k| !matches!(k, IntroEventKind::Skipped { .. })));
}

#[test]
fn audio_plays_once_unless_muted_and_failures_are_swallowed() {
    struct Recorder {
        plays: Rc<RefCell<Vec<(String, f32)>>>,
        fail: bool,
    }
    impl AudioCue for Recorder {
        fn play(&self, asset: &str, volume: f32) -> Result<(), AudioError> {
            self.plays.borrow_mut().push((asset.to_owned(), volume));
            if self.fail {
                Err(AudioError::AutoplayBlocked)
            } else {
                Ok(())
            }
        }
    }

    let plays = Rc::new(RefCell::new(Vec::new()));
    let mut s = Session::with(|b| {
        b.audio(Recorder {
            plays: Rc::clone(&plays),
            fail: true,
        })
    });
    s.sim.mount();
    assert_eq!(s.sim.state(), Animating);
    assert_eq!(*plays.borrow(), vec![("/chime.mp3".to_owned(), 0.5)]);

    let muted_plays = Rc::new(RefCell::new(Vec::new()));
    let mut muted = Session::with(|b| {
        b.config(OverlayConfig::default().with_start_muted(true))
            .audio(Recorder {
                plays: Rc::clone(&muted_plays),
                fail: false,
            })
    });
    muted.sim.mount();
    assert!(muted_plays.borrow().is_empty());
}
