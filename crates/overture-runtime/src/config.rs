#![forbid(unsafe_code)]

//! Overlay configuration.
//!
//! Defaults reproduce the shipped behaviour. Hosts adjust them with the
//! `with_*` builders or with `OVERTURE_*` environment variables:
//!
//! | Variable | Field | Format |
//! |----------|-------|--------|
//! | `OVERTURE_STORAGE_KEY` | `storage_key` | string |
//! | `OVERTURE_PROGRESS_MS` | `progress_duration` | milliseconds |
//! | `OVERTURE_INTRO_TIMEOUT_MS` | `intro_timeout` | milliseconds, `0`/`off` disables |
//! | `OVERTURE_MOBILE_BREAKPOINT` | `mobile_breakpoint` | pixels |
//! | `OVERTURE_CHIME` | `chime_asset` | path, empty disables |
//! | `OVERTURE_CHIME_VOLUME` | `chime_volume` | 0.0 to 1.0 |
//! | `OVERTURE_MUTED` | `start_muted` | boolean |
//! | `OVERTURE_SKIP_PERSISTENCE` | `skip_persistence` | `explicit` or `always` |
//! | `OVERTURE_LOCALE` | `locale` | `en`, `hi`, `hi_IN.UTF-8`, ... |
//! | `OVERTURE_THEME` | `theme` | `dark` or `light` |
//!
//! Invalid values are logged and ignored.

use std::fmt;
use std::time::Duration;

use crate::audio::{DEFAULT_CHIME, DEFAULT_VOLUME};
use crate::backdrop::Theme;
use crate::locale::{Locale, detect_system_locale_from};
use crate::motion::parse_flag;
use crate::skip_flag::DEFAULT_SKIP_KEY;
use crate::viewport::DEFAULT_MOBILE_BREAKPOINT;

const ENV_STORAGE_KEY: &str = "OVERTURE_STORAGE_KEY";
const ENV_PROGRESS_MS: &str = "OVERTURE_PROGRESS_MS";
const ENV_INTRO_TIMEOUT_MS: &str = "OVERTURE_INTRO_TIMEOUT_MS";
const ENV_MOBILE_BREAKPOINT: &str = "OVERTURE_MOBILE_BREAKPOINT";
const ENV_CHIME: &str = "OVERTURE_CHIME";
const ENV_CHIME_VOLUME: &str = "OVERTURE_CHIME_VOLUME";
const ENV_MUTED: &str = "OVERTURE_MUTED";
const ENV_SKIP_PERSISTENCE: &str = "OVERTURE_SKIP_PERSISTENCE";
const ENV_LOCALE: &str = "OVERTURE_LOCALE";
const ENV_THEME: &str = "OVERTURE_THEME";

/// When the skip flag is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkipPersistence {
    /// Only when the user explicitly skipped. Returning visitors who watched
    /// to the end see the intro again.
    #[default]
    OnExplicitSkip,
    /// Whenever the overlay is dismissed.
    OnAnyCompletion,
}

impl std::str::FromStr for SkipPersistence {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "explicit" | "on-explicit-skip" | "skip" => Ok(SkipPersistence::OnExplicitSkip),
            "always" | "any" | "on-any-completion" => Ok(SkipPersistence::OnAnyCompletion),
            _ => Err(ConfigError::invalid(ENV_SKIP_PERSISTENCE, s)),
        }
    }
}

/// A configuration value that could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `key` held `value`, which does not parse.
    Invalid { key: &'static str, value: String },
    /// `key` parsed but lies outside its allowed range.
    OutOfRange { key: &'static str, value: String },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str) -> Self {
        ConfigError::Invalid {
            key,
            value: value.to_owned(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, value } => write!(f, "{key}: cannot parse {value:?}"),
            ConfigError::OutOfRange { key, value } => write!(f, "{key}: {value:?} out of range"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Everything tunable about one overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Storage key of the skip flag.
    pub storage_key: String,
    /// Length of the cosmetic progress bar.
    pub progress_duration: Duration,
    /// Reveal the content if the intro has not finished by then.
    pub intro_timeout: Option<Duration>,
    /// Widths below this are mobile.
    pub mobile_breakpoint: u32,
    /// Chime played when the intro starts; `None` disables it.
    pub chime_asset: Option<String>,
    pub chime_volume: f32,
    pub start_muted: bool,
    pub skip_persistence: SkipPersistence,
    pub locale: Locale,
    /// Theme at mount; the user may toggle it afterwards.
    pub theme: Theme,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_SKIP_KEY.to_owned(),
            progress_duration: Duration::from_secs(5),
            intro_timeout: Some(Duration::from_secs(10)),
            mobile_breakpoint: DEFAULT_MOBILE_BREAKPOINT,
            chime_asset: Some(DEFAULT_CHIME.to_owned()),
            chime_volume: DEFAULT_VOLUME,
            start_muted: false,
            skip_persistence: SkipPersistence::default(),
            locale: Locale::default(),
            theme: Theme::default(),
        }
    }
}

impl OverlayConfig {
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    #[must_use]
    pub fn with_progress_duration(mut self, duration: Duration) -> Self {
        self.progress_duration = duration;
        self
    }

    #[must_use]
    pub fn with_intro_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.intro_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_mobile_breakpoint(mut self, px: u32) -> Self {
        self.mobile_breakpoint = px;
        self
    }

    #[must_use]
    pub fn with_chime(mut self, asset: Option<String>, volume: f32) -> Self {
        self.chime_asset = asset;
        self.chime_volume = volume.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn with_start_muted(mut self, muted: bool) -> Self {
        self.start_muted = muted;
        self
    }

    #[must_use]
    pub fn with_skip_persistence(mut self, policy: SkipPersistence) -> Self {
        self.skip_persistence = policy;
        self
    }

    #[must_use]
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    #[must_use]
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Defaults, with the system locale and `OVERTURE_*` overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        let get = |key: &str| std::env::var(key).ok();
        let mut config = Self::default().with_locale(detect_system_locale_from(
            get("LC_ALL"),
            get("LANG"),
        ));
        config.apply_env_with(get);
        config
    }

    /// Apply overrides from a custom lookup (for tests).
    ///
    /// Returns the rejected values; each has already been logged.
    pub fn apply_env_with<F>(&mut self, get_env: F) -> Vec<ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut errors = Vec::new();
        let mut note = |result: Result<(), ConfigError>| {
            if let Err(e) = result {
                tracing::warn!(error = %e, "ignoring configuration override");
                errors.push(e);
            }
        };

        if let Some(key) = get_env(ENV_STORAGE_KEY) {
            note(if key.trim().is_empty() {
                Err(ConfigError::invalid(ENV_STORAGE_KEY, &key))
            } else {
                self.storage_key = key;
                Ok(())
            });
        }
        if let Some(raw) = get_env(ENV_PROGRESS_MS) {
            note(parse_millis(ENV_PROGRESS_MS, &raw).map(|d| self.progress_duration = d));
        }
        if let Some(raw) = get_env(ENV_INTRO_TIMEOUT_MS) {
            let off = matches!(raw.trim(), "0" | "off" | "none");
            note(if off {
                self.intro_timeout = None;
                Ok(())
            } else {
                parse_millis(ENV_INTRO_TIMEOUT_MS, &raw).map(|d| self.intro_timeout = Some(d))
            });
        }
        if let Some(raw) = get_env(ENV_MOBILE_BREAKPOINT) {
            note(
                raw.trim()
                    .parse::<u32>()
                    .map(|px| self.mobile_breakpoint = px)
                    .map_err(|_| ConfigError::invalid(ENV_MOBILE_BREAKPOINT, &raw)),
            );
        }
        if let Some(asset) = get_env(ENV_CHIME) {
            self.chime_asset = (!asset.trim().is_empty()).then_some(asset);
        }
        if let Some(raw) = get_env(ENV_CHIME_VOLUME) {
            note(match raw.trim().parse::<f32>() {
                Ok(v) if (0.0..=1.0).contains(&v) => {
                    self.chime_volume = v;
                    Ok(())
                }
                Ok(_) => Err(ConfigError::OutOfRange {
                    key: ENV_CHIME_VOLUME,
                    value: raw.clone(),
                }),
                Err(_) => Err(ConfigError::invalid(ENV_CHIME_VOLUME, &raw)),
            });
        }
        if let Some(raw) = get_env(ENV_MUTED) {
            note(match parse_flag(&raw) {
                Some(muted) => {
                    self.start_muted = muted;
                    Ok(())
                }
                None => Err(ConfigError::invalid(ENV_MUTED, &raw)),
            });
        }
        if let Some(raw) = get_env(ENV_SKIP_PERSISTENCE) {
            note(raw.parse().map(|p| self.skip_persistence = p));
        }
        if let Some(raw) = get_env(ENV_LOCALE) {
            note(
                raw.parse()
                    .map(|l| self.locale = l)
                    .map_err(|_| ConfigError::invalid(ENV_LOCALE, &raw)),
            );
        }
        if let Some(raw) = get_env(ENV_THEME) {
            note(
                raw.parse()
                    .map(|t| self.theme = t)
                    .map_err(|_| ConfigError::invalid(ENV_THEME, &raw)),
            );
        }
        errors
    }
}

fn parse_millis(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::invalid(key, raw))
}
