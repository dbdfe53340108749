#![forbid(unsafe_code)]

//! Offset-positioned timelines.
//!
//! A [`Timeline`] is an ordered list of [`Segment`]s, each tweening one target
//! from a [`Pose`] to another. Segments are placed relative to the timeline's
//! current end, so a later segment can start before an earlier one finishes:
//!
//! ```text
//!   background ██████████████
//!   accent           ██████████████          (overlap 1.5s)
//!   text                          ███████████   (append)
//!   cta                                  ███████ (overlap 0.8s)
//! ```
//!
//! The timeline as a whole is an [`Animation`] whose value is linear progress
//! toward its end. Wrap it in [`Callbacks`](super::callbacks::Callbacks) to
//! be told when it completes.
//!
//! # Invariants
//!
//! 1. The end is the maximum `start + duration` over all segments.
//! 2. Before its first segment starts, a target shows its initial pose.
//! 3. A target's pose is driven by the latest-started segment for it.
//! 4. After completion every target rests at its last segment's `to` pose.

use std::time::Duration;

use super::{Animation, Pose, PoseProps, Tween, fraction};

/// Where a segment starts, relative to the timeline built so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// At the current end.
    Append,
    /// This long before the current end (clamped at zero).
    Overlap(Duration),
    /// This long after the current end.
    Gap(Duration),
    /// At an absolute offset from the timeline start.
    At(Duration),
}

/// One tween on one target.
#[derive(Debug, Clone, Copy)]
pub struct Segment<T> {
    pub target: T,
    pub start: Duration,
    pub tween: Tween,
    pub from: Pose,
    pub to: Pose,
    pub props: PoseProps,
}

impl<T> Segment<T> {
    /// Offset at which this segment finishes.
    pub fn end(&self) -> Duration {
        self.start.saturating_add(self.tween.duration())
    }

    fn pose_at(&self, elapsed: Duration) -> Pose {
        let local = elapsed.saturating_sub(self.start);
        let t = fraction(local, self.tween.duration());
        self.from.lerp(&self.to, self.tween.sample(t), self.props)
    }
}

/// An ordered, overlapping sequence of tweens with a single end.
#[derive(Debug, Clone)]
pub struct Timeline<T> {
    initial: Vec<(T, Pose)>,
    segments: Vec<Segment<T>>,
    end: Duration,
    elapsed: Duration,
}

impl<T: Copy + PartialEq> Default for Timeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + PartialEq> Timeline<T> {
    /// Create an empty timeline. An empty timeline is already complete.
    #[must_use]
    pub fn new() -> Self {
        Self {
            initial: Vec::new(),
            segments: Vec::new(),
            end: Duration::ZERO,
            elapsed: Duration::ZERO,
        }
    }

    /// Set the pose `target` shows before any of its segments start.
    #[must_use]
    pub fn set(mut self, target: T, pose: Pose) -> Self {
        match self.initial.iter_mut().find(|(t, _)| *t == target) {
            Some(entry) => entry.1 = pose,
            None => self.initial.push((target, pose)),
        }
        self
    }

    /// Append a segment tweening `props` of `target` toward `to`.
    ///
    /// The segment starts from wherever the target's previous segment ended,
    /// or from its initial pose.
    #[must_use]
    pub fn to(
        mut self,
        target: T,
        to: Pose,
        props: PoseProps,
        tween: Tween,
        position: Position,
    ) -> Self {
        let start = match position {
            Position::Append => self.end,
            Position::Overlap(d) => self.end.saturating_sub(d),
            Position::Gap(d) => self.end.saturating_add(d),
            Position::At(t) => t,
        };
        let from = self.resting_pose(target);
        let segment = Segment {
            target,
            start,
            tween,
            from,
            to,
            props,
        };
        self.end = self.end.max(segment.end());
        self.segments.push(segment);
        self
    }

    /// Pose a target would hold after all segments added so far.
    fn resting_pose(&self, target: T) -> Pose {
        self.segments
            .iter()
            .rev()
            .find(|s| s.target == target)
            .map(|s| s.to)
            .or_else(|| self.initial_pose(target))
            .unwrap_or(Pose::REST)
    }

    fn initial_pose(&self, target: T) -> Option<Pose> {
        self.initial
            .iter()
            .find(|(t, _)| *t == target)
            .map(|(_, p)| *p)
    }

    /// Total length.
    pub fn duration(&self) -> Duration {
        self.end
    }

    /// Time played so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Segments in insertion order.
    pub fn segments(&self) -> &[Segment<T>] {
        &self.segments
    }

    /// Current pose of `target`, or `None` if the timeline never mentions it.
    pub fn pose(&self, target: T) -> Option<Pose> {
        let mut active: Option<&Segment<T>> = None;
        let mut first: Option<&Segment<T>> = None;
        for segment in self.segments.iter().filter(|s| s.target == target) {
            if first.is_none() {
                first = Some(segment);
            }
            if segment.start <= self.elapsed
                && active.is_none_or(|a| segment.start >= a.start)
            {
                active = Some(segment);
            }
        }
        match (active, first) {
            (Some(segment), _) => Some(segment.pose_at(self.elapsed)),
            (None, Some(segment)) => Some(segment.from),
            (None, None) => self.initial_pose(target),
        }
    }

    /// Jump to the end; every target snaps to its final pose.
    pub fn finish(&mut self) {
        self.elapsed = self.elapsed.max(self.end);
    }
}

impl<T: Copy + PartialEq> Animation for Timeline<T> {
    fn tick(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.end
    }

    /// Linear progress toward the end, ignoring per-segment easing.
    fn value(&self) -> f32 {
        fraction(self.elapsed, self.end)
    }

    fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    fn overshoot(&self) -> Duration {
        self.elapsed.saturating_sub(self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::linear;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Layer {
        Back,
        Front,
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn hidden() -> Pose {
        Pose {
            opacity: 0.0,
            y: 100.0,
            ..Pose::REST
        }
    }

    fn two_layers() -> Timeline<Layer> {
        Timeline::new()
            .set(Layer::Back, hidden())
            .set(Layer::Front, hidden())
            .to(
                Layer::Back,
                Pose::REST,
                PoseProps::OPACITY | PoseProps::Y,
                Tween::new(ms(1000)).easing(linear),
                Position::Append,
            )
            .to(
                Layer::Front,
                Pose::REST,
                PoseProps::OPACITY | PoseProps::Y,
                Tween::new(ms(1000)).easing(linear),
                Position::Overlap(ms(400)),
            )
    }

    #[test]
    fn overlap_starts_before_previous_end() {
        let tl = two_layers();
        assert_eq!(tl.segments()[1].start, ms(600));
        assert_eq!(tl.duration(), ms(1600));
    }

    #[test]
    fn gap_and_absolute_positions() {
        let tl = Timeline::new()
            .to(1u8, Pose::REST, PoseProps::OPACITY, Tween::new(ms(100)), Position::Append)
            .to(2u8, Pose::REST, PoseProps::OPACITY, Tween::new(ms(100)), Position::Gap(ms(50)))
            .to(3u8, Pose::REST, PoseProps::OPACITY, Tween::new(ms(10)), Position::At(ms(5)));
        assert_eq!(tl.segments()[1].start, ms(150));
        assert_eq!(tl.segments()[2].start, ms(5));
        assert_eq!(tl.duration(), ms(250));
    }

    #[test]
    fn overlap_larger_than_timeline_clamps_to_zero() {
        let tl = Timeline::new()
            .to(1u8, Pose::REST, PoseProps::Y, Tween::new(ms(100)), Position::Append)
            .to(2u8, Pose::REST, PoseProps::Y, Tween::new(ms(100)), Position::Overlap(ms(900)));
        assert_eq!(tl.segments()[1].start, Duration::ZERO);
    }

    #[test]
    fn target_holds_initial_pose_until_its_segment_starts() {
        let mut tl = two_layers();
        tl.tick(ms(500));
        assert_eq!(tl.pose(Layer::Front), Some(hidden()));
        let back = tl.pose(Layer::Back).unwrap();
        assert!((back.opacity - 0.5).abs() < 0.01);
        assert!((back.y - 50.0).abs() < 0.5);
    }

    #[test]
    fn completion_rests_every_target() {
        let mut tl = two_layers();
        tl.tick(ms(5000));
        assert!(tl.is_complete());
        assert_eq!(tl.pose(Layer::Back), Some(Pose::REST));
        assert_eq!(tl.pose(Layer::Front), Some(Pose::REST));
        assert_eq!(tl.overshoot(), ms(3400));
    }

    #[test]
    fn finish_snaps_to_end() {
        let mut tl = two_layers();
        tl.tick(ms(10));
        tl.finish();
        assert!(tl.is_complete());
        assert!((tl.value() - 1.0).abs() < f32::EPSILON);
        assert_eq!(tl.pose(Layer::Front), Some(Pose::REST));
    }

    #[test]
    fn unknown_target_has_no_pose() {
        let tl: Timeline<u8> = Timeline::new();
        assert_eq!(tl.pose(7), None);
        assert!(tl.is_complete());
    }

    #[test]
    fn second_segment_chains_from_first() {
        let lifted = Pose {
            y: -20.0,
            ..Pose::REST
        };
        let tl = Timeline::new()
            .set(1u8, hidden())
            .to(1u8, Pose::REST, PoseProps::all(), Tween::new(ms(100)), Position::Append)
            .to(1u8, lifted, PoseProps::Y, Tween::new(ms(100)), Position::Append);
        assert_eq!(tl.segments()[1].from, Pose::REST);
    }
}
