//! Config command handlers

use anyhow::{bail, Context, Result};

use hubsync_core::Config;

use crate::output::{Output, OutputFormat};

/// Keys accepted by `config set`
const KEYS: &str = "data_dir, hub_url, database, database_name, request_timeout_secs";

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&config).context("Failed to serialize config")?
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:             {}", config.data_dir.display());
            println!(
                "  hub_url:              {}",
                config.hub_url.as_deref().unwrap_or("(not set)")
            );
            println!("  database:             {}", config.database);
            println!(
                "  database_name:        {}",
                config.database_name.as_deref().unwrap_or("(not set)")
            );
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    config.save().context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Apply one `key = value` assignment
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "hub_url" => {
            config.hub_url = optional(value);
        }
        "database" => {
            if value.is_empty() {
                bail!("database must not be empty");
            }
            config.database = value.to_string();
        }
        "database_name" => {
            config.database_name = optional(value);
        }
        "request_timeout_secs" => {
            config.request_timeout_secs = value
                .parse()
                .context("Invalid value for request_timeout_secs. Use a whole number of seconds.")?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                KEYS
            );
        }
    }

    Ok(())
}

/// Empty and "none" clear optional values
fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "hub_url", "ws://hub:5000").unwrap();
        apply(&mut config, "database", "orders").unwrap();
        apply(&mut config, "database_name", "Orders").unwrap();
        apply(&mut config, "request_timeout_secs", "30").unwrap();
        apply(&mut config, "data_dir", "/tmp/hubsync-test").unwrap();

        assert_eq!(config.hub_url.as_deref(), Some("ws://hub:5000"));
        assert_eq!(config.database, "orders");
        assert_eq!(config.database_name.as_deref(), Some("Orders"));
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.data_dir, std::path::PathBuf::from("/tmp/hubsync-test"));
    }

    #[test]
    fn test_apply_clears_optional_values() {
        let mut config = Config {
            hub_url: Some("ws://hub:5000".to_string()),
            ..Config::default()
        };

        apply(&mut config, "hub_url", "none").unwrap();
        assert!(config.hub_url.is_none());
    }

    #[test]
    fn test_apply_rejects_bad_input() {
        let mut config = Config::default();

        assert!(apply(&mut config, "request_timeout_secs", "soon").is_err());
        assert!(apply(&mut config, "database", "").is_err());

        let err = apply(&mut config, "sync_url", "x").unwrap_err();
        assert!(err.to_string().contains("Valid keys"));
    }
}
