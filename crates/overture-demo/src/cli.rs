#![forbid(unsafe_code)]

//! Command-line argument parsing for the demo.
//!
//! Parses args manually to keep the binary lean. Supports environment
//! variable overrides via the `OVERTURE_DEMO_*` prefix; explicit flags win.

use std::env;
use std::path::PathBuf;
use std::process;

use overture_runtime::{Locale, SkipPersistence};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const HELP_TEXT: &str = "\
Overture Demo: one simulated intro overlay session

USAGE:
    overture-demo [OPTIONS]

OPTIONS:
    --lang=CODE            Interface language: en (default) or hi
    --width=N              Viewport width in pixels (default: 1280)
    --reduced-motion       Behave as if the system requests reduced motion
    --mute                 Start with the chime muted
    --skip-at-ms=N         Press Escape N ms after mount
    --cta-after-ms=N       Click the call to action N ms after the content shows (default: 1500)
    --resize-at-ms=N:W     Resize the viewport to W pixels at N ms
    --state-file=PATH      Persist the skip flag in PATH (default: in memory)
    --reset                Clear the stored skip flag before starting
    --persist-on-complete  Remember the dismissal even without a skip
    --realtime             Pace frames against the wall clock
    --print-every-ms=N     Print a frame line every N ms (default: 250, 0 = never)
    --events-jsonl=PATH    Append lifecycle events as JSON lines to PATH
    --log-json             Emit logs as JSON on stderr
    --help, -h             Show this help message
    --version, -V          Show version

ENVIRONMENT VARIABLES:
    OVERTURE_DEMO_LANG         Override --lang
    OVERTURE_DEMO_WIDTH        Override --width
    OVERTURE_DEMO_SKIP_AT_MS   Override --skip-at-ms
    OVERTURE_DEMO_STATE_FILE   Override --state-file
    OVERTURE_DEMO_EVENTS_JSONL Override --events-jsonl
    RUST_LOG                   Log filter (default: info)";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq)]
pub struct Opts {
    pub locale: Option<Locale>,
    pub width: u32,
    pub reduced_motion: bool,
    pub muted: bool,
    pub skip_at_ms: Option<u64>,
    pub cta_after_ms: u64,
    pub resize_at: Option<(u64, u32)>,
    pub state_file: Option<PathBuf>,
    pub reset: bool,
    pub persistence: SkipPersistence,
    pub realtime: bool,
    pub print_every_ms: u64,
    pub events_jsonl: Option<PathBuf>,
    pub log_json: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            locale: None,
            width: 1280,
            reduced_motion: false,
            muted: false,
            skip_at_ms: None,
            cta_after_ms: 1500,
            resize_at: None,
            state_file: None,
            reset: false,
            persistence: SkipPersistence::OnExplicitSkip,
            realtime: false,
            print_every_ms: 250,
            events_jsonl: None,
            log_json: false,
        }
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(Opts),
    Help,
    Version,
}

impl Opts {
    /// Parse the process arguments and environment, exiting on `--help`,
    /// `--version` or invalid input.
    pub fn parse() -> Self {
        let args: Vec<String> = env::args().skip(1).collect();
        match Self::parse_from(&args, |key| env::var(key).ok()) {
            Ok(Command::Run(opts)) => opts,
            Ok(Command::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Command::Version) => {
                println!("overture-demo {VERSION}");
                process::exit(0);
            }
            Err(msg) => {
                eprintln!("{msg}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    /// Parse explicit arguments with a custom environment lookup (for tests).
    pub fn parse_from<F>(args: &[String], get_env: F) -> Result<Command, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        // Apply environment variable defaults first
        if let Some(val) = get_env("OVERTURE_DEMO_LANG")
            && let Ok(locale) = val.parse()
        {
            opts.locale = Some(locale);
        }
        if let Some(val) = get_env("OVERTURE_DEMO_WIDTH")
            && let Ok(n) = val.parse()
        {
            opts.width = n;
        }
        if let Some(val) = get_env("OVERTURE_DEMO_SKIP_AT_MS")
            && let Ok(n) = val.parse()
        {
            opts.skip_at_ms = Some(n);
        }
        if let Some(val) = get_env("OVERTURE_DEMO_STATE_FILE") {
            opts.state_file = Some(PathBuf::from(val));
        }
        if let Some(val) = get_env("OVERTURE_DEMO_EVENTS_JSONL") {
            opts.events_jsonl = Some(PathBuf::from(val));
        }

        // Parse command-line args (override env vars)
        for arg in args {
            match arg.as_str() {
                "--help" | "-h" => return Ok(Command::Help),
                "--version" | "-V" => return Ok(Command::Version),
                "--reduced-motion" => opts.reduced_motion = true,
                "--mute" => opts.muted = true,
                "--reset" => opts.reset = true,
                "--persist-on-complete" => opts.persistence = SkipPersistence::OnAnyCompletion,
                "--realtime" => opts.realtime = true,
                "--log-json" => opts.log_json = true,
                other => {
                    if let Some(val) = other.strip_prefix("--lang=") {
                        opts.locale = Some(
                            val.parse()
                                .map_err(|_| format!("Invalid --lang value: {val}"))?,
                        );
                    } else if let Some(val) = other.strip_prefix("--width=") {
                        opts.width = number("--width", val)?;
                    } else if let Some(val) = other.strip_prefix("--skip-at-ms=") {
                        opts.skip_at_ms = Some(number("--skip-at-ms", val)?);
                    } else if let Some(val) = other.strip_prefix("--cta-after-ms=") {
                        opts.cta_after_ms = number("--cta-after-ms", val)?;
                    } else if let Some(val) = other.strip_prefix("--resize-at-ms=") {
                        let (at, width) = val
                            .split_once(':')
                            .ok_or_else(|| format!("Invalid --resize-at-ms value: {val}"))?;
                        opts.resize_at =
                            Some((number("--resize-at-ms", at)?, number("--resize-at-ms", width)?));
                    } else if let Some(val) = other.strip_prefix("--state-file=") {
                        opts.state_file = Some(PathBuf::from(val));
                    } else if let Some(val) = other.strip_prefix("--print-every-ms=") {
                        opts.print_every_ms = number("--print-every-ms", val)?;
                    } else if let Some(val) = other.strip_prefix("--events-jsonl=") {
                        opts.events_jsonl = Some(PathBuf::from(val));
                    } else {
                        return Err(format!("Unknown argument: {other}"));
                    }
                }
            }
        }

        Ok(Command::Run(opts))
    }
}

fn number<T: std::str::FromStr>(flag: &str, val: &str) -> Result<T, String> {
    val.parse().map_err(|_| format!("Invalid {flag} value: {val}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, String> {
        let args: Vec<String> = args.iter().map(|s| (*s).to_owned()).collect();
        Opts::parse_from(&args, |_| None)
    }

    #[test]
    fn defaults() {
        assert_eq!(parse(&[]), Ok(Command::Run(Opts::default())));
    }

    #[test]
    fn flags_parse() {
        let Ok(Command::Run(opts)) = parse(&[
            "--lang=hi",
            "--width=375",
            "--skip-at-ms=1200",
            "--resize-at-ms=500:900",
            "--reduced-motion",
            "--persist-on-complete",
        ]) else {
            panic!("expected run");
        };
        assert_eq!(opts.locale, Some(Locale::Hi));
        assert_eq!(opts.width, 375);
        assert_eq!(opts.skip_at_ms, Some(1200));
        assert_eq!(opts.resize_at, Some((500, 900)));
        assert!(opts.reduced_motion);
        assert_eq!(opts.persistence, SkipPersistence::OnAnyCompletion);
    }

    #[test]
    fn flags_override_env() {
        let args = vec!["--width=800".to_owned()];
        let env = |key: &str| match key {
            "OVERTURE_DEMO_WIDTH" => Some("320".to_owned()),
            "OVERTURE_DEMO_LANG" => Some("hi".to_owned()),
            _ => None,
        };
        let Ok(Command::Run(opts)) = Opts::parse_from(&args, env) else {
            panic!("expected run");
        };
        assert_eq!(opts.width, 800);
        assert_eq!(opts.locale, Some(Locale::Hi));
    }

    #[test]
    fn errors_and_meta() {
        assert_eq!(parse(&["--help"]), Ok(Command::Help));
        assert_eq!(parse(&["-V"]), Ok(Command::Version));
        assert!(parse(&["--width=wide"]).is_err());
        assert!(parse(&["--lang=fr"]).is_err());
        assert!(parse(&["--resize-at-ms=100"]).is_err());
        assert!(parse(&["--bogus"]).is_err());
    }

    #[test]
    fn help_mentions_every_env_override() {
        for key in [
            "OVERTURE_DEMO_LANG",
            "OVERTURE_DEMO_WIDTH",
            "OVERTURE_DEMO_SKIP_AT_MS",
            "OVERTURE_DEMO_STATE_FILE",
            "OVERTURE_DEMO_EVENTS_JSONL",
        ] {
            assert!(HELP_TEXT.contains(key), "{key}");
        }
        assert!(!VERSION.is_empty());
    }
}
