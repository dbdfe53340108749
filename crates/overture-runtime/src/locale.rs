#![forbid(unsafe_code)]

//! UI string tables.

use std::env;
use std::fmt;
use std::str::FromStr;

/// Supported interface languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    En,
    Hi,
}

/// Every user-visible string the overlay shows or announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strings {
    pub start: &'static str,
    pub skip: &'static str,
    pub scroll: &'static str,
    pub mute: &'static str,
    pub unmute: &'static str,
    /// Read by assistive technology once the content is shown.
    pub announcement: &'static str,
}

const EN: Strings = Strings {
    start: "Start Your Journey",
    skip: "Skip",
    scroll: "Scroll to explore",
    mute: "Mute Sound",
    unmute: "Unmute Sound",
    announcement: "Intro complete. Main content loaded.",
};

const HI: Strings = Strings {
    start: "अपनी यात्रा शुरू करें",
    skip: "छोड़ें",
    scroll: "एक्सप्लोर करने के लिए स्क्रॉल करें",
    mute: "ध्वनि बंद करें",
    unmute: "ध्वनि चालू करें",
    announcement: "परिचय पूरा। मुख्य सामग्री लोड हो गई।",
};

impl Locale {
    /// All locales.
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Hi];

    /// String table for this locale.
    #[must_use]
    pub const fn strings(self) -> &'static Strings {
        match self {
            Locale::En => &EN,
            Locale::Hi => &HI,
        }
    }

    /// Two-letter language code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Hi => "hi",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Unrecognized language tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLocale(pub String);

impl fmt::Display for UnknownLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown locale: {:?}", self.0)
    }
}

impl std::error::Error for UnknownLocale {}

impl FromStr for Locale {
    type Err = UnknownLocale;

    /// Accepts `en`, `hi`, BCP 47 tags (`hi-IN`) and POSIX names
    /// (`hi_IN.UTF-8`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lang = s
            .trim()
            .split(['_', '-', '.', '@'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match lang.as_str() {
            "en" => Ok(Locale::En),
            "hi" => Ok(Locale::Hi),
            _ => Err(UnknownLocale(s.to_owned())),
        }
    }
}

/// Locale from the first non-empty of `LC_ALL` and `LANG`; English when
/// that value names an unsupported language.
#[must_use]
pub fn detect_system_locale() -> Locale {
    detect_system_locale_from(env::var("LC_ALL").ok(), env::var("LANG").ok())
}

/// [`detect_system_locale`] over explicit values.
#[must_use]
pub fn detect_system_locale_from(lc_all: Option<String>, lang: Option<String>) -> Locale {
    [lc_all, lang]
        .into_iter()
        .flatten()
        .find(|v| !v.trim().is_empty())
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_tags() {
        assert_eq!("en".parse(), Ok(Locale::En));
        assert_eq!("HI".parse(), Ok(Locale::Hi));
        assert_eq!("hi_IN.UTF-8".parse(), Ok(Locale::Hi));
        assert_eq!("en-GB".parse(), Ok(Locale::En));
        assert!("fr_FR".parse::<Locale>().is_err());
        assert!("".parse::<Locale>().is_err());
    }

    #[test]
    fn tables_are_complete() {
        for locale in Locale::ALL {
            let s = locale.strings();
            for text in [s.start, s.skip, s.scroll, s.mute, s.unmute, s.announcement] {
                assert!(!text.is_empty(), "{locale}");
            }
        }
        assert_ne!(Locale::En.strings(), Locale::Hi.strings());
    }

    #[test]
    fn detection_order() {
        assert_eq!(
            detect_system_locale_from(Some("hi_IN.UTF-8".into()), Some("en_US.UTF-8".into())),
            Locale::Hi
        );
        assert_eq!(
            detect_system_locale_from(Some(String::new()), Some("hi".into())),
            Locale::Hi
        );
        assert_eq!(detect_system_locale_from(Some("C".into()), None), Locale::En);
        assert_eq!(
            detect_system_locale_from(Some("fr_FR.UTF-8".into()), Some("hi_IN".into())),
            Locale::En
        );
        assert_eq!(
            detect_system_locale_from(Some("  ".into()), Some("hi_IN".into())),
            Locale::Hi
        );
        assert_eq!(detect_system_locale_from(None, None), Locale::En);
    }
}
