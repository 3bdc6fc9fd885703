//! Logging setup
//!
//! `RUST_LOG` wins when set. Otherwise both crates log at a level chosen by
//! `-v` (warn, info, debug, trace). Output goes to the configured log file
//! without ANSI colors, or to stderr.

use std::fs::{self, OpenOptions};

use pvault_core::Config;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber; safe to call more than once
pub fn init(config: &Config, verbosity: u8) {
    let level = level_for(verbosity);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let Some(ref log_path) = config.log_file else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
        return;
    };

    if let Some(parent) = log_path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    debug!("Logging to {:?}", log_path);
}

fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn default_directives(level: &str) -> String {
    format!("pvault_core={},pvault_cli={}", level, level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for(0), "warn");
        assert_eq!(level_for(1), "info");
        assert_eq!(level_for(2), "debug");
        assert_eq!(level_for(9), "trace");
    }

    #[test]
    fn test_default_directives() {
        assert_eq!(
            default_directives("debug"),
            "pvault_core=debug,pvault_cli=debug"
        );
    }
}
