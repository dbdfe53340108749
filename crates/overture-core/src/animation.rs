#![forbid(unsafe_code)]

//! Composable animation primitives.
//!
//! Animations are plain values advanced by an explicit `dt`; nothing here
//! reads a clock or schedules work. The runtime decides when to call
//! [`Animation::tick`] (normally once per frame) and what to do with the
//! resulting values.
//!
//! - [`Tween`]: finite 0→1 progress with an easing curve.
//! - [`Repeat`]: infinite loop, optionally reversing (yoyo) and delayed.
//! - [`Pose`] / [`PoseProps`]: the visual properties a tween interpolates.
//! - [`Timeline`]: offset-positioned segments with a single end.
//! - [`AnimationGroup`]: labeled set of animations with shared lifecycle.
//! - [`callbacks::Callbacks`]: milestone events for any animation.

pub mod callbacks;
pub mod group;
pub mod timeline;

pub use callbacks::{Callbacks, Milestone};
pub use group::AnimationGroup;
pub use timeline::{Position, Segment, Timeline};

use std::f32::consts::TAU;
use std::time::Duration;

use bitflags::bitflags;

// ---------------------------------------------------------------------------
// Easing functions
// ---------------------------------------------------------------------------

/// Easing function signature: maps `t` in [0, 1] to an eased value.
///
/// Elastic and back curves overshoot past 1.0 before settling; every curve
/// maps 0 to 0 and 1 to 1.
pub type EasingFn = fn(f32) -> f32;

/// Identity easing (constant velocity).
#[inline]
pub fn linear(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Quadratic ease-in (slow start).
#[inline]
pub fn ease_in(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

/// Quadratic ease-out (slow end).
#[inline]
pub fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Quadratic ease-in-out, a.k.a. `power2.inOut`.
#[inline]
pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Cubic ease-out.
#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Elastic ease-out with explicit amplitude and period.
///
/// `amplitude` below 1.0 is treated as 1.0. The endpoints are exact.
pub fn elastic_out(t: f32, amplitude: f32, period: f32) -> f32 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let amplitude = amplitude.max(1.0);
    let period = if period > 0.0 { period } else { 0.3 };
    let shift = period / TAU * (1.0 / amplitude).asin();
    amplitude * 2f32.powf(-10.0 * t) * ((t - shift) * TAU / period).sin() + 1.0
}

/// `elastic.out(1, 0.3)`: tight, springy settle.
#[inline]
pub fn elastic_out_soft(t: f32) -> f32 {
    elastic_out(t, 1.0, 0.3)
}

/// `elastic.out(1, 0.5)`: slower, wider oscillation.
#[inline]
pub fn elastic_out_bouncy(t: f32) -> f32 {
    elastic_out(t, 1.0, 0.5)
}

/// `back.out(1.7)`: overshoots slightly, then settles.
#[inline]
pub fn back_out(t: f32) -> f32 {
    const OVERSHOOT: f32 = 1.7;
    let t = t.clamp(0.0, 1.0) - 1.0;
    t * t * ((OVERSHOOT + 1.0) * t + OVERSHOOT) + 1.0
}

// ---------------------------------------------------------------------------
// Animation trait
// ---------------------------------------------------------------------------

/// A time-based animation.
pub trait Animation {
    /// Advance the animation by `dt`.
    fn tick(&mut self, dt: Duration);

    /// Whether the animation has reached its end. Loops never do.
    fn is_complete(&self) -> bool;

    /// Current eased value. Starts at 0.0 and ends at 1.0, but may
    /// overshoot in between for elastic and back curves.
    fn value(&self) -> f32;

    /// Reset the animation to its initial state.
    fn reset(&mut self);

    /// Time elapsed past completion. Zero for animations that never complete.
    fn overshoot(&self) -> Duration {
        Duration::ZERO
    }
}

/// Fraction of `total` covered by `elapsed`, clamped to [0, 1].
///
/// A zero `total` counts as already finished.
#[inline]
pub(crate) fn fraction(elapsed: Duration, total: Duration) -> f32 {
    if total.is_zero() {
        return 1.0;
    }
    ((elapsed.as_secs_f64() / total.as_secs_f64()) as f32).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Tween
// ---------------------------------------------------------------------------

/// Finite progression from 0.0 to 1.0 over a duration, shaped by an easing.
///
/// Elapsed time is accumulated as a [`Duration`] so long runs of small ticks
/// do not drift.
#[derive(Debug, Clone, Copy)]
pub struct Tween {
    elapsed: Duration,
    duration: Duration,
    easing: EasingFn,
}

impl Tween {
    /// Create a tween with linear easing.
    pub fn new(duration: Duration) -> Self {
        Self {
            elapsed: Duration::ZERO,
            duration,
            easing: linear,
        }
    }

    /// Set the easing function.
    #[must_use]
    pub fn easing(mut self, easing: EasingFn) -> Self {
        self.easing = easing;
        self
    }

    /// Configured duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Linear progress before easing, in [0.0, 1.0].
    pub fn progress(&self) -> f32 {
        fraction(self.elapsed, self.duration)
    }

    /// Eased value at an arbitrary linear progress `t`.
    pub fn sample(&self, t: f32) -> f32 {
        (self.easing)(t.clamp(0.0, 1.0))
    }

    /// Jump straight to the end.
    pub fn finish(&mut self) {
        self.elapsed = self.elapsed.max(self.duration);
    }
}

impl Animation for Tween {
    fn tick(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    fn value(&self) -> f32 {
        self.sample(self.progress())
    }

    fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    fn overshoot(&self) -> Duration {
        self.elapsed.saturating_sub(self.duration)
    }
}

// ---------------------------------------------------------------------------
// Repeat
// ---------------------------------------------------------------------------

/// Infinite loop over `period`. Never completes.
///
/// Without yoyo the value climbs 0→1 and wraps back to 0 every period, which
/// suits rotations where 1.0 and 0.0 look identical. With yoyo the value
/// climbs in one period and descends in the next.
#[derive(Debug, Clone, Copy)]
pub struct Repeat {
    period: Duration,
    delay: Duration,
    yoyo: bool,
    easing: EasingFn,
    /// Time since the delay expired, kept below two periods.
    phase: Duration,
    waited: Duration,
}

impl Repeat {
    /// Loop with linear easing, no yoyo and no delay.
    pub fn new(period: Duration) -> Self {
        Self {
            period: if period.is_zero() {
                Duration::from_millis(1)
            } else {
                period
            },
            delay: Duration::ZERO,
            yoyo: false,
            easing: linear,
            phase: Duration::ZERO,
            waited: Duration::ZERO,
        }
    }

    /// Reverse direction every period.
    #[must_use]
    pub fn yoyo(mut self) -> Self {
        self.yoyo = true;
        self
    }

    /// Hold at 0.0 for `delay` before the first cycle.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the easing applied within each cycle.
    #[must_use]
    pub fn easing(mut self, easing: EasingFn) -> Self {
        self.easing = easing;
        self
    }

    /// Whether the initial delay has elapsed.
    pub fn has_started(&self) -> bool {
        self.waited >= self.delay
    }

    /// Number of the current cycle modulo 2 (0 = forward leg).
    fn leg(&self) -> u32 {
        if self.phase >= self.period { 1 } else { 0 }
    }
}

impl Animation for Repeat {
    fn tick(&mut self, dt: Duration) {
        let mut dt = dt;
        if self.waited < self.delay {
            let remaining = self.delay - self.waited;
            if dt < remaining {
                self.waited += dt;
                return;
            }
            self.waited = self.delay;
            dt -= remaining;
        }
        let span = self.period.as_nanos() * 2;
        let phase = (self.phase.as_nanos() + dt.as_nanos()) % span;
        self.phase = Duration::from_nanos(phase as u64);
    }

    fn is_complete(&self) -> bool {
        false
    }

    fn value(&self) -> f32 {
        if !self.has_started() {
            return 0.0;
        }
        let within = if self.leg() == 0 {
            self.phase
        } else {
            self.phase - self.period
        };
        let t = fraction(within, self.period);
        let t = if self.yoyo && self.leg() == 1 {
            1.0 - t
        } else {
            t
        };
        (self.easing)(t)
    }

    fn reset(&mut self) {
        self.phase = Duration::ZERO;
        self.waited = Duration::ZERO;
    }
}

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

bitflags! {
    /// Which [`Pose`] fields a tween drives.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PoseProps: u8 {
        const OPACITY  = 1 << 0;
        const Y        = 1 << 1;
        const SCALE    = 1 << 2;
        const ROTATION = 1 << 3;
        const BLUR     = 1 << 4;
        const SKEW_X   = 1 << 5;
        const GLOW     = 1 << 6;
    }
}

/// Visual state of one layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// 0.0 (invisible) to 1.0.
    pub opacity: f32,
    /// Vertical offset in pixels, positive is down.
    pub y: f32,
    pub scale: f32,
    /// Degrees.
    pub rotation: f32,
    /// Blur radius in pixels.
    pub blur: f32,
    /// Horizontal skew in degrees.
    pub skew_x: f32,
    /// Glow intensity, 0.0 to 1.0.
    pub glow: f32,
}

impl Pose {
    /// Fully visible, untransformed.
    pub const REST: Pose = Pose {
        opacity: 1.0,
        y: 0.0,
        scale: 1.0,
        rotation: 0.0,
        blur: 0.0,
        skew_x: 0.0,
        glow: 0.0,
    };

    /// Interpolate the fields in `props` from `self` toward `to` by eased `t`.
    ///
    /// Fields outside `props` keep `self`'s value. `t` may overshoot; opacity,
    /// blur and glow are clamped to their valid ranges afterwards.
    #[must_use]
    pub fn lerp(&self, to: &Pose, t: f32, props: PoseProps) -> Pose {
        let mix = |flag: PoseProps, a: f32, b: f32| {
            if props.contains(flag) { a + (b - a) * t } else { a }
        };
        Pose {
            opacity: mix(PoseProps::OPACITY, self.opacity, to.opacity).clamp(0.0, 1.0),
            y: mix(PoseProps::Y, self.y, to.y),
            scale: mix(PoseProps::SCALE, self.scale, to.scale),
            rotation: mix(PoseProps::ROTATION, self.rotation, to.rotation),
            blur: mix(PoseProps::BLUR, self.blur, to.blur).max(0.0),
            skew_x: mix(PoseProps::SKEW_X, self.skew_x, to.skew_x),
            glow: mix(PoseProps::GLOW, self.glow, to.glow).clamp(0.0, 1.0),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::REST
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
