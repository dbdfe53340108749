#![forbid(unsafe_code)]

//! Input events delivered by the host to an overlay.

/// Keys the overlay distinguishes. Everything else arrives as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Escape,
    Enter,
    Tab,
    Char(char),
    Other,
}

impl KeyCode {
    /// Escape and Enter both skip the intro.
    #[must_use]
    pub const fn is_skip(self) -> bool {
        matches!(self, KeyCode::Escape | KeyCode::Enter)
    }
}

/// Interactive controls rendered on the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// "Start your journey" button.
    PrimaryCta,
    /// Chevron under the call to action.
    ScrollHint,
    /// Top-right skip button.
    SkipButton,
    /// Sound on/off.
    MuteToggle,
    /// Dark/light theme switch.
    ThemeToggle,
}

/// A host event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Key pressed anywhere while the overlay is mounted.
    Key(KeyCode),
    /// Pointer activation (click, tap, or keyboard activation) of a control.
    Click(Control),
    /// Viewport width changed, in CSS pixels.
    Resize { width: u32 },
    /// Mouse or touch moved, normalized to the viewport (`0.0..=1.0` on each
    /// axis, origin top-left).
    Pointer { x: f32, y: f32 },
}

impl InputEvent {
    /// Pointer event from pixel coordinates within a `width` x `height`
    /// viewport. A zero dimension maps to the centre of that axis.
    #[must_use]
    pub fn pointer_at(px: f32, py: f32, width: f32, height: f32) -> Self {
        let norm = |v: f32, extent: f32| if extent > 0.0 { v / extent } else { 0.5 };
        InputEvent::Pointer {
            x: norm(px, width),
            y: norm(py, height),
        }
    }
}

impl From<KeyCode> for InputEvent {
    fn from(key: KeyCode) -> Self {
        InputEvent::Key(key)
    }
}

impl From<Control> for InputEvent {
    fn from(control: Control) -> Self {
        InputEvent::Click(control)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_escape_and_enter_skip() {
        assert!(KeyCode::Escape.is_skip());
        assert!(KeyCode::Enter.is_skip());
        assert!(!KeyCode::Tab.is_skip());
        assert!(!KeyCode::Char(' ').is_skip());
    }

    #[test]
    fn conversions() {
        assert_eq!(InputEvent::from(KeyCode::Enter), InputEvent::Key(KeyCode::Enter));
        assert_eq!(
            InputEvent::from(Control::SkipButton),
            InputEvent::Click(Control::SkipButton)
        );
    }

    #[test]
    fn pointer_pixels_normalize() {
        assert_eq!(
            InputEvent::pointer_at(640.0, 180.0, 1280.0, 720.0),
            InputEvent::Pointer { x: 0.5, y: 0.25 }
        );
        assert_eq!(
            InputEvent::pointer_at(10.0, 10.0, 0.0, 20.0),
            InputEvent::Pointer { x: 0.5, y: 0.5 }
        );
    }
}
