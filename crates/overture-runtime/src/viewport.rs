#![forbid(unsafe_code)]

//! Narrow/wide device classification.

use crate::reactive::{Observable, Subscription};

/// Widths below this many CSS pixels are mobile.
pub const DEFAULT_MOBILE_BREAKPOINT: u32 = 640;

/// Device class derived from viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewportClass {
    Mobile,
    Desktop,
}

impl ViewportClass {
    /// Classify `width` against `breakpoint`.
    #[must_use]
    pub const fn classify(width: u32, breakpoint: u32) -> Self {
        if width < breakpoint {
            ViewportClass::Mobile
        } else {
            ViewportClass::Desktop
        }
    }

    /// Visual magnitudes for this class.
    #[must_use]
    pub const fn scale(self) -> VisualScale {
        match self {
            ViewportClass::Mobile => VisualScale {
                logo_size: 64,
                chevron_size: 24,
                travel: 0.6,
            },
            ViewportClass::Desktop => VisualScale {
                logo_size: 96,
                chevron_size: 32,
                travel: 1.0,
            },
        }
    }
}

/// Size and motion magnitudes that depend on the device class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualScale {
    /// Logo edge in pixels.
    pub logo_size: u16,
    /// Scroll-hint chevron edge in pixels.
    pub chevron_size: u16,
    /// Multiplier applied to every vertical travel distance.
    pub travel: f32,
}

/// Observable device class, recomputed on resize.
#[derive(Clone, Debug)]
pub struct ViewportDetector {
    breakpoint: u32,
    width: Observable<u32>,
    class: Observable<ViewportClass>,
}

impl ViewportDetector {
    /// Start at `width` with the given breakpoint.
    #[must_use]
    pub fn new(width: u32, breakpoint: u32) -> Self {
        Self {
            breakpoint,
            width: Observable::new(width),
            class: Observable::new(ViewportClass::classify(width, breakpoint)),
        }
    }

    /// Host notification of a new viewport width.
    pub fn resize(&self, width: u32) {
        self.width.set(width);
        let class = ViewportClass::classify(width, self.breakpoint);
        if self.class.set(class) {
            tracing::debug!(width, ?class, "viewport class changed");
        }
    }

    /// Last reported width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width.get()
    }

    /// Current class.
    #[must_use]
    pub fn class(&self) -> ViewportClass {
        self.class.get()
    }

    /// Breakpoint in use.
    #[must_use]
    pub fn breakpoint(&self) -> u32 {
        self.breakpoint
    }

    /// Be told when the class (not merely the width) changes.
    pub fn subscribe(&self, callback: impl Fn(ViewportClass) + 'static) -> Subscription {
        self.class.subscribe(move |c| callback(*c))
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.class.subscriber_count()
    }
}
