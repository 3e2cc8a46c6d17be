//! Logging initialization.
//!
//! Uses the `tracing` ecosystem with either human-readable or JSON output.
//! Logs go to stderr; stdout carries the story itself.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter directive for a level: our crates at `level`, everything
/// else (hyper, reqwest, rustls) at warn.
fn default_directive(level: &str) -> String {
    format!("warn,storylens={level},storylens_core={level}")
}

/// Initialize the logging subsystem.
///
/// The RUST_LOG environment variable, when set, replaces the level entirely.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` config section.
///
/// `--verbose` raises the level to debug unless the config already asks
/// for trace; `--json-logs` forces JSON output.
pub fn init_from_config(
    config: &storylens_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let level = match config.logging.level.as_str() {
        "trace" => "trace",
        _ if verbose_override => "debug",
        other => other,
    };
    let json_format = json_logs_override || config.logging.format == "json";
    init(level, json_format);
}
