//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use doctrail_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "log_file": config.log_path(),
                    "log_level": config.log_level,
                    "request_timeout_secs": config.request_timeout_secs
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:             {}", config.data_dir.display());
            println!(
                "  log_file:             {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| format!("(default: {})", config.log_path().display()))
            );
            println!("  log_level:            {}", config.log_level);
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!();
            println!("Config file: {}", effective_path.display());
            println!("Remote mirror settings are managed with `doctrail remote`.");
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        "log_level" => {
            if !matches!(value, "off" | "error" | "warn" | "info" | "debug" | "trace") {
                bail!("Invalid log level '{}'. Use off, error, warn, info, debug or trace.", value);
            }
            config.log_level = value.to_string();
        }
        "request_timeout_secs" => {
            let secs: u64 = value
                .parse()
                .context("Invalid value for request_timeout_secs. Use a whole number of seconds.")?;
            if secs == 0 {
                bail!("request_timeout_secs must be at least 1");
            }
            config.request_timeout_secs = secs;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, log_file, log_level, request_timeout_secs",
                key
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "log_level", "debug").unwrap();
        apply(&mut config, "request_timeout_secs", "30").unwrap();
        apply(&mut config, "log_file", "/tmp/doctrail.log").unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/doctrail.log")));

        apply(&mut config, "log_file", "none").unwrap();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();

        assert!(apply(&mut config, "log_level", "loud").is_err());
        assert!(apply(&mut config, "request_timeout_secs", "0").is_err());
        assert!(apply(&mut config, "request_timeout_secs", "soon").is_err());
        assert!(apply(&mut config, "sync_url", "x").is_err());
    }
}
