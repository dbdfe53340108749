#![forbid(unsafe_code)]

//! Milestone events for any [`Animation`].
//!
//! [`Callbacks`] wraps an animation and queues [`Milestone`]s while it is
//! ticked. The owner drains the queue after each tick, so no closure ever
//! runs inside the animation and the wrapped value stays `'static`-free.
//!
//! ```ignore
//! use std::time::Duration;
//! use overture_core::animation::{Tween, callbacks::{Callbacks, Milestone}};
//!
//! let mut anim = Callbacks::new(Tween::new(Duration::from_millis(500)))
//!     .on_start()
//!     .on_complete();
//! anim.tick(Duration::from_millis(600));
//! assert_eq!(anim.drain(), vec![Milestone::Started, Milestone::Completed]);
//! ```
//!
//! # Invariants
//!
//! 1. `Started` fires at most once per play-through, on the first tick.
//! 2. Thresholds fire at most once each, in ascending order.
//! 3. `Completed` fires at most once, on the tick where the inner animation
//!    first reports completion, and always after every threshold.
//! 4. `reset()` re-arms every milestone and discards queued ones.

use std::time::Duration;

use super::Animation;

/// A milestone reached by a [`Callbacks`]-wrapped animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Milestone {
    /// First tick received.
    Started,
    /// Value crossed the threshold (in [0.0, 1.0]).
    Progress(f32),
    /// Inner animation completed.
    Completed,
}

#[derive(Debug, Clone, Default)]
struct Armed {
    start: bool,
    complete: bool,
    /// Sorted ascending; `bool` is "already fired".
    thresholds: Vec<(f32, bool)>,
    started_fired: bool,
    completed_fired: bool,
}

/// Animation wrapper that queues [`Milestone`]s during `tick()`.
#[derive(Debug, Clone)]
pub struct Callbacks<A> {
    inner: A,
    armed: Armed,
    queue: Vec<Milestone>,
}

impl<A: Animation> Callbacks<A> {
    /// Wrap `inner` with no milestones armed.
    #[must_use]
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            armed: Armed::default(),
            queue: Vec::new(),
        }
    }

    /// Arm the `Started` milestone.
    #[must_use]
    pub fn on_start(mut self) -> Self {
        self.armed.start = true;
        self
    }

    /// Arm the `Completed` milestone.
    #[must_use]
    pub fn on_complete(mut self) -> Self {
        self.armed.complete = true;
        self
    }

    /// Arm a progress threshold, clamped to [0.0, 1.0]. Non-finite values are
    /// ignored.
    #[must_use]
    pub fn at_progress(mut self, threshold: f32) -> Self {
        if threshold.is_finite() {
            let t = threshold.clamp(0.0, 1.0);
            let idx = self.armed.thresholds.partition_point(|&(v, _)| v <= t);
            self.armed.thresholds.insert(idx, (t, false));
        }
        self
    }

    /// The wrapped animation.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Mutable access to the wrapped animation. Changes made through this
    /// handle are not observed until the next tick.
    pub fn inner_mut(&mut self) -> &mut A {
        &mut self.inner
    }

    /// Take every queued milestone.
    pub fn drain(&mut self) -> Vec<Milestone> {
        std::mem::take(&mut self.queue)
    }

    /// Number of queued milestones.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn observe(&mut self) {
        if self.armed.start && !self.armed.started_fired {
            self.armed.started_fired = true;
            self.queue.push(Milestone::Started);
        }

        let value = self.inner.value();
        let complete = self.inner.is_complete();
        for (threshold, fired) in &mut self.armed.thresholds {
            if !*fired && (value >= *threshold || complete) {
                *fired = true;
                self.queue.push(Milestone::Progress(*threshold));
            }
        }

        if self.armed.complete && !self.armed.completed_fired && complete {
            self.armed.completed_fired = true;
            self.queue.push(Milestone::Completed);
        }
    }
}

impl<A: Animation> Animation for Callbacks<A> {
    fn tick(&mut self, dt: Duration) {
        self.inner.tick(dt);
        self.observe();
    }

    fn is_complete(&self) -> bool {
        self.inner.is_complete()
    }

    fn value(&self) -> f32 {
        self.inner.value()
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.armed.started_fired = false;
        self.armed.completed_fired = false;
        for (_, fired) in &mut self.armed.thresholds {
            *fired = false;
        }
        self.queue.clear();
    }

    fn overshoot(&self) -> Duration {
        self.inner.overshoot()
    }
}
