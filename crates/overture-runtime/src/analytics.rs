#![forbid(unsafe_code)]

//! Intro lifecycle events delivered to a host-owned sink.
//!
//! The overlay never keeps a global event log. The host injects an
//! [`EventSink`] and decides where events go.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// What triggered an explicit skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipSource {
    Button,
    EscapeKey,
    EnterKey,
}

impl SkipSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SkipSource::Button => "button",
            SkipSource::EscapeKey => "escape",
            SkipSource::EnterKey => "enter",
        }
    }
}

/// Why the content became visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RevealReason {
    /// The intro timeline ran to its end.
    Completed,
    /// The user skipped mid-animation.
    Skipped,
    /// Reduced motion was requested.
    ReducedMotion,
    /// The animation engine could not be loaded.
    FailOpen,
    /// The safety timeout expired first.
    Timeout,
}

impl RevealReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RevealReason::Completed => "completed",
            RevealReason::Skipped => "skipped",
            RevealReason::ReducedMotion => "reduced_motion",
            RevealReason::FailOpen => "fail_open",
            RevealReason::Timeout => "timeout",
        }
    }
}

/// Lifecycle event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroEventKind {
    /// The animated intro started.
    Shown,
    /// The user asked to skip.
    Skipped { source: SkipSource },
    /// The overlay body became fully visible.
    Revealed { reason: RevealReason },
    /// The host was handed control.
    Completed { skipped: bool },
    /// The skip flag was already set at mount.
    Restored,
}

impl IntroEventKind {
    /// Stable snake_case name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            IntroEventKind::Shown => "intro_shown",
            IntroEventKind::Skipped { .. } => "intro_skipped",
            IntroEventKind::Revealed { .. } => "intro_revealed",
            IntroEventKind::Completed { .. } => "intro_completed",
            IntroEventKind::Restored => "intro_restored",
        }
    }
}

/// A lifecycle event stamped with host time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntroEvent {
    pub kind: IntroEventKind,
    pub at: Duration,
}

impl fmt::Display for IntroEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}ms", self.kind.name(), self.at.as_millis())?;
        match self.kind {
            IntroEventKind::Skipped { source } => write!(f, " source={}", source.as_str()),
            IntroEventKind::Revealed { reason } => write!(f, " reason={}", reason.as_str()),
            IntroEventKind::Completed { skipped } => write!(f, " skipped={skipped}"),
            IntroEventKind::Shown | IntroEventKind::Restored => Ok(()),
        }
    }
}

/// Receiver of lifecycle events.
pub trait EventSink {
    fn record(&self, event: IntroEvent);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: IntroEvent) {}
}

/// Buffers events in memory. Clones share the buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Rc<RefCell<Vec<IntroEvent>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<IntroEvent> {
        self.events.borrow().clone()
    }

    /// Event kinds only, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<IntroEventKind> {
        self.events.borrow().iter().map(|e| e.kind).collect()
    }

    /// Take and clear the buffer.
    pub fn take(&self) -> Vec<IntroEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: IntroEvent) {
        self.events.borrow_mut().push(event);
    }
}

/// Emits each event as a structured `tracing` event at INFO.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: IntroEvent) {
        let at_ms = event.at.as_millis() as u64;
        match event.kind {
            IntroEventKind::Skipped { source } => {
                tracing::info!(event = event.kind.name(), at_ms, source = source.as_str());
            }
            IntroEventKind::Revealed { reason } => {
                tracing::info!(event = event.kind.name(), at_ms, reason = reason.as_str());
            }
            IntroEventKind::Completed { skipped } => {
                tracing::info!(event = event.kind.name(), at_ms, skipped);
            }
            IntroEventKind::Shown | IntroEventKind::Restored => {
                tracing::info!(event = event.kind.name(), at_ms);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_clones_share_buffer() {
        let sink = MemorySink::new();
        let host_view = sink.clone();
        sink.record(IntroEvent {
            kind: IntroEventKind::Shown,
            at: Duration::from_millis(5),
        });
        assert_eq!(host_view.kinds(), vec![IntroEventKind::Shown]);
        assert_eq!(host_view.take().len(), 1);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn display_includes_detail() {
        let event = IntroEvent {
            kind: IntroEventKind::Revealed {
                reason: RevealReason::Timeout,
            },
            at: Duration::from_millis(10_000),
        };
        assert_eq!(event.to_string(), "intro_revealed@10000ms reason=timeout");
    }
}
