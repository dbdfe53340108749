#![forbid(unsafe_code)]

//! Plays the intro choreography.
//!
//! # State Machine
//!
//! ```text
//!   Idle ──start(reduced)──────────────► Idle  (Launch::Immediate)
//!     │
//!     └─start(motion ok)─► Playing ──frame──► Playing
//!                            │  timeline end: post completion message once
//!                            │  finish_intro(): jump to end, no message
//!                            ▼
//!                        teardown() ─► TornDown (loops stopped, callback released)
//! ```
//!
//! The controller never calls back into its owner. Completion is a message
//! posted to the owner's [`Mailbox`].
//!
//! # Invariants
//!
//! 1. Reduced motion is checked before the engine is asked for anything.
//! 2. The completion message is posted at most once per start.
//! 3. After `teardown` the frame callback is released and a stale copy of it
//!    changes nothing.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use overture_core::animation::{Callbacks, Milestone};
use overture_core::{Animation, AnimationGroup, Disposable, Pose, Timeline};

use crate::analytics::RevealReason;
use crate::choreography::{Layer, LoopSpec, MotionEngine};
use crate::frame::{FrameControl, FrameHandle, FrameScheduler};
use crate::mailbox::Mailbox;

/// Outcome of [`TimelineController::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// Nothing will animate; show the content now.
    Immediate(RevealReason),
    /// The intro is playing; completion arrives through the mailbox.
    Running,
}

#[derive(Default)]
struct Playback {
    intro: Option<Callbacks<Timeline<Layer>>>,
    loops: AnimationGroup,
    specs: Vec<LoopSpec>,
    last_frame: Option<Duration>,
    signalled: bool,
    torn_down: bool,
}

impl Playback {
    fn advance(&mut self, now: Duration) -> bool {
        let dt = self
            .last_frame
            .map_or(Duration::ZERO, |last| now.saturating_sub(last));
        self.last_frame = Some(now.max(self.last_frame.unwrap_or_default()));

        let mut completed = false;
        if let Some(intro) = self.intro.as_mut() {
            intro.tick(dt);
            for milestone in intro.drain() {
                match milestone {
                    Milestone::Started => tracing::debug!("intro timeline started"),
                    Milestone::Completed if !self.signalled => {
                        self.signalled = true;
                        completed = true;
                    }
                    _ => {}
                }
            }
        }
        self.loops.tick(dt);
        completed
    }
}

/// Owns the one-shot intro and the decorative loops.
pub struct TimelineController {
    playback: Rc<RefCell<Playback>>,
    handle: Option<FrameHandle>,
}

impl std::fmt::Debug for TimelineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let playback = self.playback.borrow();
        f.debug_struct("TimelineController")
            .field("playing", &playback.intro.is_some())
            .field("loops", &playback.loops.len())
            .field("torn_down", &playback.torn_down)
            .finish()
    }
}

impl Default for TimelineController {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            playback: Rc::new(RefCell::new(Playback::default())),
            handle: None,
        }
    }

    /// Start playing, or report why nothing will play.
    ///
    /// On [`Launch::Running`], `message` is posted to `mailbox` once the
    /// intro reaches its end. Any previous run is torn down first.
    pub fn start<M: Clone + 'static>(
        &mut self,
        reduced_motion: bool,
        engine: &dyn MotionEngine,
        scheduler: &FrameScheduler,
        mailbox: Mailbox<M>,
        message: M,
        now: Duration,
    ) -> Launch {
        self.teardown();

        if reduced_motion {
            tracing::debug!("reduced motion requested, intro not loaded");
            return Launch::Immediate(RevealReason::ReducedMotion);
        }

        let choreography = match engine.load() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(engine = engine.name(), error = %e, "animation engine failed, showing content");
                return Launch::Immediate(RevealReason::FailOpen);
            }
        };

        let mut loops = AnimationGroup::new();
        for spec in &choreography.loops {
            loops.insert(spec.label, Box::new(spec.repeat));
        }
        let intro = Callbacks::new(choreography.intro).on_start().on_complete();
        tracing::info!(
            engine = engine.name(),
            duration_ms = intro.inner().duration().as_millis() as u64,
            loops = choreography.loops.len(),
            "intro timeline loaded"
        );

        self.playback = Rc::new(RefCell::new(Playback {
            intro: Some(intro),
            loops,
            specs: choreography.loops,
            last_frame: Some(now),
            signalled: false,
            torn_down: false,
        }));

        let playback = Rc::clone(&self.playback);
        self.handle = Some(scheduler.request("intro_timeline", move |now| {
            let mut playback = playback.borrow_mut();
            if playback.torn_down {
                return FrameControl::Stop;
            }
            if playback.advance(now) {
                mailbox.post(message.clone());
            }
            FrameControl::Continue
        }));
        Launch::Running
    }

    /// Snap the intro to its end without posting the completion message.
    /// Loops keep running.
    pub fn finish_intro(&mut self) {
        let mut playback = self.playback.borrow_mut();
        playback.signalled = true;
        if let Some(intro) = playback.intro.as_mut() {
            intro.inner_mut().finish();
        }
    }

    /// Stop everything and release the frame callback. Idempotent.
    pub fn teardown(&mut self) {
        {
            let mut playback = self.playback.borrow_mut();
            if !playback.torn_down && playback.intro.is_some() {
                tracing::debug!(loops = playback.loops.len(), "intro timeline torn down");
            }
            playback.torn_down = true;
            playback.intro = None;
            playback.loops.stop_all();
        }
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }

    /// Pose of `layer` with vertical distances scaled by `travel`.
    ///
    /// Layers rest when nothing is playing.
    #[must_use]
    pub fn pose(&self, layer: Layer, travel: f32) -> Pose {
        let playback = self.playback.borrow();
        let Some(intro) = playback.intro.as_ref() else {
            return Pose::REST;
        };
        let mut pose = intro.inner().pose(layer).unwrap_or(Pose::REST);
        pose.y *= travel;
        for spec in playback.specs.iter().filter(|s| s.layer == layer) {
            if let Some(value) = playback.loops.value_of(spec.label) {
                spec.apply(&mut pose, value, travel);
            }
        }
        pose
    }

    /// Whether an intro is loaded and not torn down.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playback.borrow().intro.is_some()
    }

    /// Whether the one-shot intro has reached its end.
    #[must_use]
    pub fn is_intro_complete(&self) -> bool {
        self.playback
            .borrow()
            .intro
            .as_ref()
            .is_some_and(|i| i.is_complete())
    }

    /// Length of the loaded intro.
    #[must_use]
    pub fn intro_duration(&self) -> Option<Duration> {
        self.playback
            .borrow()
            .intro
            .as_ref()
            .map(|i| i.inner().duration())
    }

    /// Number of live decorative loops.
    #[must_use]
    pub fn active_loops(&self) -> usize {
        self.playback.borrow().loops.len()
    }

    /// Whether the frame callback is still registered.
    #[must_use]
    pub fn has_frame_callback(&self) -> bool {
        self.handle.as_ref().is_some_and(FrameHandle::is_active)
    }
}

impl Disposable for TimelineController {
    fn dispose(&mut self) {
        self.teardown();
    }

    fn is_disposed(&self) -> bool {
        self.playback.borrow().torn_down
    }
}

impl Drop for TimelineController {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choreography::{CascadeEngine, UnavailableEngine};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    struct Rig {
        scheduler: FrameScheduler,
        mailbox: Mailbox<&'static str>,
        controller: TimelineController,
    }

    fn rig() -> Rig {
        Rig {
            scheduler: FrameScheduler::new(),
            mailbox: Mailbox::new(),
            controller: TimelineController::new(),
        }
    }

    impl Rig {
        fn start(&mut self, reduced: bool, engine: &dyn MotionEngine) -> Launch {
            self.controller
                .start(reduced, engine, &self.scheduler, self.mailbox.clone(), "done", ms(0))
        }

        fn run_until(&self, end_ms: u64) {
            let mut t = 0;
            while t <= end_ms {
                self.scheduler.pump(ms(t));
                t += 16;
            }
        }
    }

    #[test]
    fn reduced_motion_never_loads() {
        struct Panicking;
        impl MotionEngine for Panicking {
            fn name(&self) -> &str {
                "panicking"
            }
            fn load(&self) -> Result<crate::choreography::Choreography, crate::choreography::EngineError> {
                panic!("engine consulted under reduced motion");
            }
        }
        let mut rig = rig();
        assert_eq!(
            rig.start(true, &Panicking),
            Launch::Immediate(RevealReason::ReducedMotion)
        );
        assert_eq!(rig.scheduler.active_count(), 0);
    }

    #[test]
    fn engine_failure_fails_open() {
        let mut rig = rig();
        let engine = UnavailableEngine {
            reason: "blocked".into(),
        };
        assert_eq!(rig.start(false, &engine), Launch::Immediate(RevealReason::FailOpen));
        assert!(!rig.controller.is_playing());
    }

    #[test]
    fn completion_posted_exactly_once() {
        let mut rig = rig();
        assert_eq!(rig.start(false, &CascadeEngine), Launch::Running);
        rig.run_until(6000);
        assert!(rig.mailbox.is_empty());
        rig.run_until(20_000);
        assert_eq!(rig.mailbox.drain(), vec!["done"]);
        assert!(rig.controller.is_intro_complete());
        assert_eq!(rig.controller.active_loops(), 5);
    }

    #[test]
    fn finish_intro_is_silent() {
        let mut rig = rig();
        rig.start(false, &CascadeEngine);
        rig.scheduler.pump(ms(100));
        rig.controller.finish_intro();
        rig.run_until(10_000);
        assert!(rig.mailbox.is_empty());
        assert!(rig.controller.is_intro_complete());
    }

    #[test]
    fn teardown_releases_everything() {
        let mut rig = rig();
        rig.start(false, &CascadeEngine);
        rig.scheduler.pump(ms(16));
        rig.controller.teardown();
        rig.controller.teardown();
        assert!(!rig.controller.has_frame_callback());
        assert_eq!(rig.scheduler.active_count(), 0);
        assert_eq!(rig.controller.active_loops(), 0);
        assert_eq!(rig.controller.pose(Layer::Accent, 1.0), Pose::REST);
        rig.run_until(10_000);
        assert!(rig.mailbox.is_empty());
    }

    #[test]
    fn travel_scales_vertical_offsets() {
        let mut rig = rig();
        rig.start(false, &CascadeEngine);
        let desktop = rig.controller.pose(Layer::Background, 1.0);
        let mobile = rig.controller.pose(Layer::Background, 0.6);
        assert_eq!(desktop.y, 200.0);
        assert!((mobile.y - 120.0).abs() < 1e-3);
    }

    #[test]
    fn loops_decorate_after_intro() {
        let mut rig = rig();
        rig.start(false, &CascadeEngine);
        rig.controller.finish_intro();
        rig.scheduler.pump(ms(1000));
        let sun = rig.controller.pose(Layer::Accent, 1.0);
        assert!(sun.rotation > 0.0);
        assert!(sun.scale > 1.0);
    }
}
