#![forbid(unsafe_code)]

//! Scoped resource handles.
//!
//! Anything that keeps running after it is registered (a frame callback, a
//! subscription, a timer) hands back a [`Disposable`]. Owners collect them in
//! a [`DisposeBag`] and dispose the bag when the scope that created them ends.
//! Dropping a bag disposes whatever it still holds, so early returns and
//! panics cannot leak a registration.
//!
//! # Invariants
//!
//! 1. `dispose()` is idempotent on every implementation.
//! 2. A bag disposes its handles in reverse registration order.
//! 3. A disposed bag is empty and can be reused.

/// A registration that must be released.
pub trait Disposable {
    /// Release the underlying registration. Calling this twice is harmless.
    fn dispose(&mut self);

    /// Whether [`dispose`](Self::dispose) has taken effect.
    fn is_disposed(&self) -> bool;
}

/// Owner of a set of [`Disposable`]s released together.
#[derive(Default)]
pub struct DisposeBag {
    items: Vec<(&'static str, Box<dyn Disposable>)>,
}

impl std::fmt::Debug for DisposeBag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposeBag")
            .field("held", &self.items.iter().map(|(l, _)| *l).collect::<Vec<_>>())
            .finish()
    }
}

impl DisposeBag {
    /// Create an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `item`, labelled for diagnostics.
    pub fn hold(&mut self, label: &'static str, item: impl Disposable + 'static) {
        self.items.push((label, Box::new(item)));
    }

    /// Number of handles held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the bag holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Dispose every handle, newest first, and empty the bag.
    pub fn dispose_all(&mut self) {
        while let Some((label, mut item)) = self.items.pop() {
            item.dispose();
            crate::trace!(resource = label, "disposed");
        }
    }
}

impl Drop for DisposeBag {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
