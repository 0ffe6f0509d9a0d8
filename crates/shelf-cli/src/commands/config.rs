//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use shelf_core::Config;

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
                    "catalog_url": config.catalog_url,
                    "catalog_api_key": config.catalog_api_key.as_ref().map(|_| "(set)"),
                    "max_results": config.max_results,
                    "top_n": config.top_n,
                    "log_file": config.log_file
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
            println!("  data_dir:        {}", config.data_dir.display());
            println!("  catalog_url:     {}", config.catalog_url);
            println!(
                "  catalog_api_key: {}",
                if config.catalog_api_key.is_some() {
                    "(set)"
                } else {
                    "(not set)"
                }
            );
            println!("  max_results:     {}", config.max_results);
            println!("  top_n:           {}", config.top_n);
            println!(
                "  log_file:        {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
            println!("Library:     {}", config.storage_dir().display());
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

    let shown = if key == "catalog_api_key" { "(set)" } else { value.as_str() };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let unset = value.is_empty() || value == "none";

    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "catalog_url" => {
            if unset {
                bail!("catalog_url cannot be empty");
            }
            config.catalog_url = value.trim_end_matches('/').to_string();
        }
        "catalog_api_key" => {
            config.catalog_api_key = if unset { None } else { Some(value.to_string()) };
        }
        "max_results" => {
            let n: u32 = value
                .parse()
                .context("Invalid value for max_results. Use a number from 1 to 40.")?;
            if !(1..=shelf_core::catalog::MAX_PAGE_SIZE).contains(&n) {
                bail!("Invalid value for max_results. Use a number from 1 to 40.");
            }
            config.max_results = n;
        }
        "top_n" => {
            config.top_n = value
                .parse()
                .context("Invalid value for top_n. Use a positive number.")?;
        }
        "log_file" => {
            config.log_file = if unset { None } else { Some(value.into()) };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, catalog_url, catalog_api_key, max_results, top_n, log_file",
                key
            );
        }
    }

    Ok(())
}
