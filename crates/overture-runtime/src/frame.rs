#![forbid(unsafe_code)]

//! Host-driven frame callbacks.
//!
//! [`FrameScheduler`] is the runtime's `requestAnimationFrame`: callbacks are
//! registered once and invoked on every [`pump`](FrameScheduler::pump) until
//! they return [`FrameControl::Stop`] or their [`FrameHandle`] is cancelled.
//! The host calls `pump(now)` once per display frame.
//!
//! # Invariants
//!
//! 1. A callback registered during a pump first runs on the next pump.
//! 2. A callback cancelled during a pump (by itself or by another callback)
//!    is not invoked again, including later in the same pump.
//! 3. Callbacks run in registration order.
//! 4. No internal borrow is held while a callback runs, so callbacks may
//!    register or cancel freely.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use overture_core::Disposable;

/// What a frame callback wants after running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameControl {
    /// Run again next frame.
    Continue,
    /// Release this callback.
    Stop,
}

/// A per-frame callback receiving the host's monotonic time.
pub type FrameCallback = Box<dyn FnMut(Duration) -> FrameControl>;

/// Identifier of a registered callback.
pub type FrameId = u64;

struct Slot {
    id: FrameId,
    label: &'static str,
    callback: FrameCallback,
}

#[derive(Default)]
struct Inner {
    next_id: FrameId,
    slots: Vec<Slot>,
    /// Ids cancelled while their slot was checked out by a pump.
    cancelled: HashSet<FrameId>,
    /// Ids checked out by the pump in progress.
    in_flight: HashSet<FrameId>,
    frames: u64,
}

/// Registry of per-frame callbacks. Clones share the registry.
#[derive(Clone, Default)]
pub struct FrameScheduler {
    inner: Rc<RefCell<Inner>>,
}

impl fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("FrameScheduler")
            .field(
                "active",
                &inner.slots.iter().map(|s| s.label).collect::<Vec<_>>(),
            )
            .field("frames", &inner.frames)
            .finish()
    }
}

impl FrameScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` to run every frame.
    pub fn request(
        &self,
        label: &'static str,
        callback: impl FnMut(Duration) -> FrameControl + 'static,
    ) -> FrameHandle {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.slots.push(Slot {
            id,
            label,
            callback: Box::new(callback),
        });
        tracing::trace!(frame_id = id, label, "frame callback requested");
        FrameHandle {
            id,
            scheduler: Rc::downgrade(&self.inner),
        }
    }

    /// Run every registered callback once. Returns how many ran.
    pub fn pump(&self, now: Duration) -> usize {
        let batch = {
            let mut inner = self.inner.borrow_mut();
            inner.frames += 1;
            let batch = std::mem::take(&mut inner.slots);
            inner.in_flight = batch.iter().map(|s| s.id).collect();
            batch
        };

        let mut kept = Vec::with_capacity(batch.len());
        let mut ran = 0;
        for mut slot in batch {
            if self.inner.borrow().cancelled.contains(&slot.id) {
                continue;
            }
            ran += 1;
            match (slot.callback)(now) {
                FrameControl::Continue => kept.push(slot),
                FrameControl::Stop => {
                    tracing::trace!(frame_id = slot.id, label = slot.label, "frame callback finished");
                }
            }
        }

        let mut inner = self.inner.borrow_mut();
        let cancelled = std::mem::take(&mut inner.cancelled);
        inner.in_flight.clear();
        kept.retain(|s| !cancelled.contains(&s.id));
        let fresh = std::mem::take(&mut inner.slots);
        kept.extend(fresh);
        inner.slots = kept;
        ran
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.borrow().slots.len()
    }

    /// Number of pumps so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.inner.borrow().frames
    }

    /// Cancel every registered callback.
    pub fn cancel_all(&self) {
        let mut inner = self.inner.borrow_mut();
        let in_flight: Vec<FrameId> = inner.in_flight.iter().copied().collect();
        inner.cancelled.extend(in_flight);
        inner.slots.clear();
    }
}

fn cancel_in(inner: &Rc<RefCell<Inner>>, id: FrameId) -> bool {
    let mut inner = inner.borrow_mut();
    let before = inner.slots.len();
    inner.slots.retain(|s| s.id != id);
    if inner.slots.len() < before {
        return true;
    }
    if inner.in_flight.contains(&id) {
        return inner.cancelled.insert(id);
    }
    false
}

/// Handle to a registered frame callback.
///
/// Clones refer to the same callback; cancelling through any clone cancels
/// it. Dropping a handle does not cancel; dispose it or hold it in a
/// [`DisposeBag`](overture_core::DisposeBag).
#[derive(Clone)]
pub struct FrameHandle {
    id: FrameId,
    scheduler: Weak<RefCell<Inner>>,
}

impl fmt::Debug for FrameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl FrameHandle {
    /// Identifier of the callback.
    #[must_use]
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// Cancel the callback. Returns whether it was still registered.
    pub fn cancel(&self) -> bool {
        match self.scheduler.upgrade() {
            Some(inner) => {
                let cancelled = cancel_in(&inner, self.id);
                if cancelled {
                    tracing::trace!(frame_id = self.id, "frame callback cancelled");
                }
                cancelled
            }
            None => false,
        }
    }

    /// Whether the callback will run on a future pump.
    #[must_use]
    pub fn is_active(&self) -> bool {
        let Some(inner) = self.scheduler.upgrade() else {
            return false;
        };
        let inner = inner.borrow();
        if inner.cancelled.contains(&self.id) {
            return false;
        }
        inner.slots.iter().any(|s| s.id == self.id) || inner.in_flight.contains(&self.id)
    }
}

impl Disposable for FrameHandle {
    fn dispose(&mut self) {
        self.cancel();
    }

    fn is_disposed(&self) -> bool {
        !self.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn counter(scheduler: &FrameScheduler, hits: &Rc<Cell<u32>>) -> FrameHandle {
        let hits = Rc::clone(hits);
        scheduler.request("counter", move |_| {
            hits.set(hits.get() + 1);
            FrameControl::Continue
        })
    }

    #[test]
    fn runs_every_pump_until_stop() {
        let scheduler = FrameScheduler::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let handle = scheduler.request("three", move |_| {
            h.set(h.get() + 1);
            if h.get() == 3 {
                FrameControl::Stop
            } else {
                FrameControl::Continue
            }
        });
        for i in 0..5 {
            scheduler.pump(ms(i * 16));
        }
        assert_eq!(hits.get(), 3);
        assert!(!handle.is_active());
        assert_eq!(scheduler.active_count(), 0);
    }

    #[test]
    fn cancel_outside_pump() {
        let scheduler = FrameScheduler::new();
        let hits = Rc::new(Cell::new(0));
        let handle = counter(&scheduler, &hits);
        scheduler.pump(ms(0));
        assert!(handle.cancel());
        assert!(!handle.cancel());
        scheduler.pump(ms(16));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn cancel_from_earlier_callback_in_same_pump() {
        let scheduler = FrameScheduler::new();
        let hits = Rc::new(Cell::new(0));
        let victim: Rc<RefCell<Option<FrameHandle>>> = Rc::new(RefCell::new(None));
        let v = Rc::clone(&victim);
        let _killer = scheduler.request("killer", move |_| {
            if let Some(handle) = v.borrow().as_ref() {
                handle.cancel();
            }
            FrameControl::Continue
        });
        *victim.borrow_mut() = Some(counter(&scheduler, &hits));
        scheduler.pump(ms(0));
        scheduler.pump(ms(16));
        assert_eq!(hits.get(), 0);
        assert_eq!(scheduler.active_count(), 1);
    }

    #[test]
    fn self_cancel_is_honored() {
        let scheduler = FrameScheduler::new();
        let me: Rc<RefCell<Option<FrameHandle>>> = Rc::new(RefCell::new(None));
        let hits = Rc::new(Cell::new(0));
        let (m, h) = (Rc::clone(&me), Rc::clone(&hits));
        let handle = scheduler.request("self", move |_| {
            h.set(h.get() + 1);
            if let Some(handle) = m.borrow().as_ref() {
                handle.cancel();
            }
            FrameControl::Continue
        });
        *me.borrow_mut() = Some(handle);
        scheduler.pump(ms(0));
        scheduler.pump(ms(16));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn request_during_pump_runs_next_frame() {
        let scheduler = FrameScheduler::new();
        let hits = Rc::new(Cell::new(0));
        let (s, h) = (scheduler.clone(), Rc::clone(&hits));
        let _spawner = scheduler.request("spawner", move |_| {
            let h = Rc::clone(&h);
            let _ = s.request("child", move |_| {
                h.set(h.get() + 1);
                FrameControl::Stop
            });
            FrameControl::Stop
        });
        assert_eq!(scheduler.pump(ms(0)), 1);
        assert_eq!(hits.get(), 0);
        assert_eq!(scheduler.pump(ms(16)), 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn dispose_via_bag() {
        let scheduler = FrameScheduler::new();
        let hits = Rc::new(Cell::new(0));
        let mut bag = overture_core::DisposeBag::new();
        bag.hold("counter", counter(&scheduler, &hits));
        bag.dispose_all();
        scheduler.pump(ms(0));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn cancel_all_clears() {
        let scheduler = FrameScheduler::new();
        let hits = Rc::new(Cell::new(0));
        let a = counter(&scheduler, &hits);
        let _b = counter(&scheduler, &hits);
        scheduler.cancel_all();
        scheduler.pump(ms(0));
        assert_eq!(hits.get(), 0);
        assert!(!a.is_active());
    }
}
