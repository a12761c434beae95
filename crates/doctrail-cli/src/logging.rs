//! File logging
//!
//! Logs go to `config.log_file` (default `{data_dir}/doctrail.log`) so they
//! never interleave with command output. The level comes from
//! `config.log_level`; "off" disables logging.

use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::EnvFilter;

use doctrail_core::Config;

/// Initialize file-based logging for the CLI
pub fn init(config: &Config) {
    let log_level = config.log_level.trim();
    if log_level.eq_ignore_ascii_case("off") {
        return;
    }

    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory {:?}: {}", parent, e);
            return;
        }
    }

    let log_file = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(filter_directive(log_level));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}

fn filter_directive(level: &str) -> String {
    format!("doctrail_core={},doctrail_cli={}", level, level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_covers_both_crates() {
        assert_eq!(
            filter_directive("debug"),
            "doctrail_core=debug,doctrail_cli=debug"
        );
    }
}
