#![forbid(unsafe_code)]

//! Overture headless demo binary entry point.

use std::io;

use overture_demo::{cli, init_logging, session};

fn main() {
    let opts = cli::Opts::parse();
    init_logging(opts.log_json);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match session::run(&opts, &mut out) {
        Ok(report) if report.completed => {}
        Ok(report) => {
            eprintln!(
                "Session stopped after {}ms without completing",
                report.elapsed.as_millis()
            );
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Session failed: {e}");
            std::process::exit(1);
        }
    }
}
