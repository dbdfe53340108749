#![forbid(unsafe_code)]

//! Overlay backdrop: colour theme and pointer parallax.
//!
//! The background image sits centred (50% 50%) and drifts up to ten percent
//! toward the pointer. Pointer positions arrive normalized to the viewport,
//! `0.0` at the left/top edge and `1.0` at the right/bottom edge.
//!
//! Parallax only follows the pointer while a [`PointerListener`] is alive.
//! The overlay holds that listener for the whole session and releases it on
//! dismissal or unmount, after which pointer movement is ignored.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use overture_core::Disposable;

/// Background position when the pointer is centred or unknown, in percent.
pub const PARALLAX_CENTER: f32 = 50.0;

/// Maximum drift from the centre, in percent.
pub const PARALLAX_RANGE: f32 = 10.0;

/// Colour theme of the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    /// The other theme.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    /// Style class applied to the overlay root.
    #[must_use]
    pub const fn class_name(self) -> &'static str {
        match self {
            Theme::Dark => "theme-dark",
            Theme::Light => "theme-light",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a theme name other than `dark` or `light`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTheme(pub String);

impl fmt::Display for UnknownTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown theme {:?} (expected dark or light)", self.0)
    }
}

impl std::error::Error for UnknownTheme {}

impl std::str::FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            _ => Err(UnknownTheme(s.to_owned())),
        }
    }
}

/// Background position in percent of the overlay box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundOffset {
    pub x: f32,
    pub y: f32,
}

impl Default for BackgroundOffset {
    fn default() -> Self {
        Self::CENTER
    }
}

impl BackgroundOffset {
    pub const CENTER: Self = Self {
        x: PARALLAX_CENTER,
        y: PARALLAX_CENTER,
    };

    /// Offset for a normalized pointer position. Coordinates are clamped to
    /// `0.0..=1.0`.
    #[must_use]
    pub fn from_pointer(x: f32, y: f32) -> Self {
        Self {
            x: PARALLAX_CENTER + x.clamp(0.0, 1.0) * PARALLAX_RANGE,
            y: PARALLAX_CENTER + y.clamp(0.0, 1.0) * PARALLAX_RANGE,
        }
    }
}

impl fmt::Display for BackgroundOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}% {}%", self.x, self.y)
    }
}

#[derive(Debug, Default)]
struct ParallaxState {
    offset: BackgroundOffset,
    listeners: usize,
}

/// Pointer-driven background offset.
#[derive(Debug, Clone, Default)]
pub struct Parallax {
    state: Rc<RefCell<ParallaxState>>,
}

impl Parallax {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start following the pointer until the returned listener is disposed.
    pub fn listen(&self) -> PointerListener {
        self.state.borrow_mut().listeners += 1;
        PointerListener {
            state: Rc::downgrade(&self.state),
            active: true,
        }
    }

    /// Feed a normalized pointer position.
    ///
    /// Returns whether the offset moved. Ignored without a live listener or
    /// for non-finite coordinates.
    pub fn pointer_moved(&self, x: f32, y: f32) -> bool {
        if !x.is_finite() || !y.is_finite() {
            return false;
        }
        let mut state = self.state.borrow_mut();
        if state.listeners == 0 {
            return false;
        }
        let next = BackgroundOffset::from_pointer(x, y);
        if state.offset == next {
            return false;
        }
        state.offset = next;
        true
    }

    #[must_use]
    pub fn offset(&self) -> BackgroundOffset {
        self.state.borrow().offset
    }

    /// Number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners
    }
}

/// Guard returned by [`Parallax::listen`].
#[derive(Debug)]
#[must_use = "dropping a PointerListener stops parallax immediately"]
pub struct PointerListener {
    state: Weak<RefCell<ParallaxState>>,
    active: bool,
}

impl Disposable for PointerListener {
    fn dispose(&mut self) {
        if !std::mem::replace(&mut self.active, false) {
            return;
        }
        if let Some(state) = self.state.upgrade() {
            let mut state = state.borrow_mut();
            state.listeners = state.listeners.saturating_sub(1);
        }
    }

    fn is_disposed(&self) -> bool {
        !self.active
    }
}

impl Drop for PointerListener {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_toggles_back_and_forth() {
        assert_eq!(Theme::default(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!(Theme::Light.toggled().class_name(), "theme-dark");
        assert_eq!(" Light ".parse::<Theme>(), Ok(Theme::Light));
        assert!("sepia".parse::<Theme>().is_err());
    }

    #[test]
    fn offset_follows_pointer_range() {
        assert_eq!(BackgroundOffset::from_pointer(0.0, 0.0), BackgroundOffset::CENTER);
        let corner = BackgroundOffset::from_pointer(1.0, 0.5);
        assert_eq!((corner.x, corner.y), (60.0, 55.0));
        assert_eq!(BackgroundOffset::from_pointer(3.0, -1.0).x, 60.0);
        assert_eq!(corner.to_string(), "60% 55%");
    }

    #[test]
    fn pointer_ignored_without_listener() {
        let parallax = Parallax::new();
        assert!(!parallax.pointer_moved(1.0, 1.0));
        assert_eq!(parallax.offset(), BackgroundOffset::CENTER);

        let mut listener = parallax.listen();
        assert!(parallax.pointer_moved(1.0, 1.0));
        assert!(!parallax.pointer_moved(1.0, 1.0));
        assert!(!parallax.pointer_moved(f32::NAN, 0.5));

        listener.dispose();
        listener.dispose();
        assert!(listener.is_disposed());
        assert_eq!(parallax.listener_count(), 0);
        assert!(!parallax.pointer_moved(0.0, 0.0));
        assert_eq!(parallax.offset(), BackgroundOffset::from_pointer(1.0, 1.0));
    }

    #[test]
    fn dropping_listener_releases_it() {
        let parallax = Parallax::new();
        {
            let _listener = parallax.listen();
            assert_eq!(parallax.listener_count(), 1);
        }
        assert_eq!(parallax.listener_count(), 0);
    }
}
