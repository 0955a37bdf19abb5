//! Logging setup
//!
//! Routes the `log` facade through `env_logger`, writing timestamped lines
//! to the server log file. `RUST_LOG` still overrides the default `info`
//! filter.

use chrono::Local;
use env_logger::{Builder, Env, Target};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Initializes the global logger.
///
/// Falls back to stderr if `log_file` cannot be opened for appending.
/// Calling this twice keeps the first logger.
pub fn init(log_file: Option<&Path>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} {:<5} {}",
            Local::now().format("%x %X%.6f"),
            record.level(),
            record.args()
        )
    });

    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!(
                    "Cannot open log file {}: {}; logging to stderr",
                    path.display(),
                    e
                );
            }
        }
    }

    let _ = builder.try_init();
}
