#![forbid(unsafe_code)]

//! Reduced-motion preference.
//!
//! The host knows the platform setting (a media query in a browser, an
//! accessibility flag on a desktop, an environment variable in a terminal)
//! and pushes it into a [`MotionPreferenceDetector`]. An unknown setting
//! counts as "no preference".

use std::env;

use crate::reactive::{Observable, Subscription};

/// Environment variables consulted by [`MotionPreferenceDetector::from_env`],
/// in order.
pub const REDUCED_MOTION_ENV: [&str; 2] = ["OVERTURE_REDUCED_MOTION", "REDUCE_MOTION"];

/// Observable "prefers reduced motion" flag.
#[derive(Clone, Debug)]
pub struct MotionPreferenceDetector {
    reduced: Observable<bool>,
}

impl Default for MotionPreferenceDetector {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MotionPreferenceDetector {
    /// Start from a platform reading; `None` means the signal is unavailable.
    #[must_use]
    pub fn new(platform: Option<bool>) -> Self {
        Self {
            reduced: Observable::new(platform.unwrap_or(false)),
        }
    }

    /// Read the preference from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let reading = REDUCED_MOTION_ENV
            .iter()
            .find_map(|key| env::var(key).ok())
            .and_then(|v| parse_flag(&v));
        Self::new(reading)
    }

    /// Whether reduced motion is requested.
    #[must_use]
    pub fn prefers_reduced_motion(&self) -> bool {
        self.reduced.get()
    }

    /// Host notification that the platform setting changed.
    pub fn set(&self, platform: Option<bool>) {
        let value = platform.unwrap_or(false);
        if self.reduced.set(value) {
            tracing::debug!(reduced_motion = value, "motion preference changed");
        }
    }

    /// Be told about future changes.
    pub fn subscribe(&self, callback: impl Fn(bool) + 'static) -> Subscription {
        self.reduced.subscribe(move |v| callback(*v))
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.reduced.subscriber_count()
    }
}

/// Parse common boolean spellings. Unknown text yields `None`.
pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "reduce" => Some(true),
        "0" | "false" | "no" | "off" | "no-preference" => Some(false),
        _ => None,
    }
}
