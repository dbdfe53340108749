#![forbid(unsafe_code)]

//! Labeled animations sharing one lifecycle.
//!
//! An [`AnimationGroup`] owns a set of boxed animations addressed by label.
//! It is how the decorative loops of an overlay are held: they are ticked
//! together every frame and stopped together on teardown.
//!
//! # Invariants
//!
//! 1. Labels are unique; inserting an existing label replaces the member.
//! 2. After [`stop_all`](AnimationGroup::stop_all) the group is empty, ticks
//!    are ignored and inserts are rejected. Stopping is permanent.
//! 3. `is_complete()` is true iff the group is stopped, empty, or every
//!    member is complete. A group containing a loop is never complete.

use std::time::Duration;

use super::Animation;

struct Member {
    label: String,
    animation: Box<dyn Animation>,
}

/// A collection of labeled animations.
#[derive(Default)]
pub struct AnimationGroup {
    members: Vec<Member>,
    stopped: bool,
}

impl std::fmt::Debug for AnimationGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationGroup")
            .field("labels", &self.labels().collect::<Vec<_>>())
            .field("stopped", &self.stopped)
            .finish()
    }
}

impl AnimationGroup {
    /// Create an empty, running group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member (builder form of [`insert`](Self::insert)).
    #[must_use]
    pub fn add(mut self, label: &str, animation: impl Animation + 'static) -> Self {
        self.insert(label, Box::new(animation));
        self
    }

    /// Insert or replace a member. Returns `false` if the group was stopped.
    pub fn insert(&mut self, label: &str, animation: Box<dyn Animation>) -> bool {
        if self.stopped {
            return false;
        }
        match self.members.iter_mut().find(|m| m.label == label) {
            Some(existing) => existing.animation = animation,
            None => self.members.push(Member {
                label: label.to_owned(),
                animation,
            }),
        }
        true
    }

    /// Remove a member. Returns `true` if it existed.
    pub fn remove(&mut self, label: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.label != label);
        self.members.len() < before
    }

    /// Current value of a member.
    #[must_use]
    pub fn value_of(&self, label: &str) -> Option<f32> {
        self.members
            .iter()
            .find(|m| m.label == label)
            .map(|m| m.animation.value())
    }

    /// Member labels in insertion order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.label.as_str())
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether [`stop_all`](Self::stop_all) has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Stop and drop every member. Permanent.
    pub fn stop_all(&mut self) {
        if !self.stopped {
            crate::trace!(members = self.members.len(), "animation group stopped");
        }
        self.stopped = true;
        self.members.clear();
    }
}

impl Animation for AnimationGroup {
    fn tick(&mut self, dt: Duration) {
        if self.stopped {
            return;
        }
        for member in &mut self.members {
            member.animation.tick(dt);
        }
    }

    fn is_complete(&self) -> bool {
        self.stopped || self.members.iter().all(|m| m.animation.is_complete())
    }

    /// Mean value of all members; 0.0 when empty.
    fn value(&self) -> f32 {
        if self.members.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.members.iter().map(|m| m.animation.value()).sum();
        sum / self.members.len() as f32
    }

    fn reset(&mut self) {
        for member in &mut self.members {
            member.animation.reset();
        }
    }
}
