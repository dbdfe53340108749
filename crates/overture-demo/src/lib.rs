#![forbid(unsafe_code)]

//! Overture headless demo library.
//!
//! Exposes the CLI parser and session driver so integration tests can run a
//! session without spawning the binary.

pub mod cli;
pub mod session;

use tracing_subscriber::EnvFilter;

/// Install the global log subscriber on stderr. `RUST_LOG` overrides the
/// `info` default. Returns `false` if one was already installed.
pub fn init_logging(json: bool) -> bool {
    if json {
        return overture_core::init_json_subscriber("info");
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}
