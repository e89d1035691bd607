//! Status command handler

use anyhow::{Context, Result};

use hubsync_core::{Config, SqliteStore};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(config: &Config, output: &Output) -> Result<()> {
    let store = SqliteStore::open(config).context("Failed to open local document store")?;
    let stats = store.stats().context("Failed to read store statistics")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "hub_url": config.hub_url,
                    "database": config.database,
                    "data_dir": config.data_dir,
                    "store": {
                        "path": config.sqlite_path(),
                        "documents": stats.documents,
                        "revisions": stats.revisions
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", stats.documents);
        }
        OutputFormat::Human => {
            println!("HubSync Status");
            println!("==============");
            println!();
            println!("Hub:");
            println!(
                "  Server:   {}",
                config.hub_url.as_deref().unwrap_or("(not set)")
            );
            println!("  Database: {}", config.database);
            println!();
            println!("Local store:");
            println!("  Location:  {}", config.sqlite_path().display());
            println!("  Documents: {}", stats.documents);
            println!("  Revisions: {}", stats.revisions);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_status_on_fresh_store() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };

        show(&config, &Output::new(OutputFormat::Quiet)).unwrap();
        assert!(config.sqlite_path().exists());
    }
}
