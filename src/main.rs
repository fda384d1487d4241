//! CLI binary for `race_checklist`.
//!
//! This binary is a thin wrapper that sets up logging, parses arguments and
//! delegates to the library.

use std::process::ExitCode;

use clap::Parser;
use race_checklist::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `race_checklist=debug`.
const LOG_ENV: &str = "RACE_CHECKLIST_LOG";

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let output = run(Cli::parse());

    for line in output.stdout {
        println!("{line}");
    }
    for line in output.stderr {
        eprintln!("{line}");
    }

    output.exit_code
}
