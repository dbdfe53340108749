#![forbid(unsafe_code)]

//! Logging for hot animation paths.
//!
//! Ticks run once per frame, so logging here is opt-in. With the `tracing`
//! feature the real macros are re-exported; without it `trace!`, `debug!` and
//! `warn!` expand to nothing and no `tracing` code is linked.
//!
//! Log through `crate::trace!` and friends so both configurations compile.

#[cfg(feature = "tracing")]
pub use tracing::{debug, trace, warn};

#[cfg(not(feature = "tracing"))]
mod disabled {
    /// Expands to nothing without the `tracing` feature.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {};
    }
}

/// Install a JSON subscriber on stderr filtered by `RUST_LOG`.
///
/// Falls back to `default_filter` when `RUST_LOG` is unset or does not
/// parse. Returns `false` if a global subscriber already exists.
#[cfg(feature = "tracing-json")]
pub fn init_json_subscriber(default_filter: &str) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
