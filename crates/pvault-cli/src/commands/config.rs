//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use pvault_core::Config;

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str = "data_dir, storage_quota_bytes, log_file, refine.api_key, refine.model, refine.base_url, refine.timeout_secs";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    let api_key_state = if config.refine.api_key.is_some() {
        "(set)"
    } else {
        "(not set)"
    };

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "database": config.sqlite_path(),
                    "storage_quota_bytes": config.storage_quota_bytes,
                    "log_file": config.log_file,
                    "refine": {
                        "api_key_set": config.refine.api_key.is_some(),
                        "model": config.refine.model,
                        "base_url": config.refine.base_url,
                        "timeout_secs": config.refine.timeout_secs
                    }
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
                "  storage_quota_bytes:  {}",
                config
                    .storage_quota_bytes
                    .map(|q| q.to_string())
                    .unwrap_or_else(|| "(unlimited)".to_string())
            );
            println!(
                "  log_file:             {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  refine.api_key:       {}", api_key_state);
            println!("  refine.model:         {}", config.refine.model);
            println!("  refine.base_url:      {}", config.refine.base_url);
            println!("  refine.timeout_secs:  {}", config.refine.timeout_secs);
            println!();
            println!("Config file: {}", effective_path.display());
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

    match config_path {
        Some(path) => config.save_to_path(path),
        None => config.save(),
    }
    .context("Failed to save configuration")?;

    let shown = if key == "refine.api_key" && !is_unset(&value) {
        "(hidden)"
    } else {
        value.as_str()
    };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            if is_unset(value) {
                bail!("data_dir cannot be empty");
            }
            config.data_dir = value.into();
        }
        "storage_quota_bytes" => {
            config.storage_quota_bytes = if is_unset(value) {
                None
            } else {
                Some(value.parse().context(
                    "Invalid value for storage_quota_bytes. Use a number of bytes or 'none'.",
                )?)
            };
        }
        "log_file" => {
            config.log_file = if is_unset(value) {
                None
            } else {
                Some(value.into())
            };
        }
        "refine.api_key" => {
            config.refine.api_key = if is_unset(value) {
                None
            } else {
                Some(value.to_string())
            };
        }
        "refine.model" => {
            if is_unset(value) {
                bail!("refine.model cannot be empty");
            }
            config.refine.model = value.to_string();
        }
        "refine.base_url" => {
            if is_unset(value) {
                bail!("refine.base_url cannot be empty");
            }
            config.refine.base_url = value.to_string();
        }
        "refine.timeout_secs" => {
            config.refine.timeout_secs = value
                .parse()
                .context("Invalid value for refine.timeout_secs. Use a number of seconds.")?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }
    Ok(())
}

fn is_unset(value: &str) -> bool {
    value.is_empty() || value == "none"
}
