//! Configuration view and validation commands - `checker config`.

use std::path::Path;

use anyhow::Result;
use checker_builder::config::{CONFIG_DIR, CONFIG_FILE, CheckerToml};
use console::style;

use super::super::ConfigCommands;

pub fn cmd_config(
    project_dir: &Path,
    effective: &CheckerToml,
    command: Option<ConfigCommands>,
) -> Result<()> {
    let config_dir = project_dir.join(CONFIG_DIR);
    let config_path = config_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("{}", style("Checker Configuration").bold().cyan());
            println!();
            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No checker.toml found at {}", config_path.display());
                println!("Run 'checker config init' to create one.");
            }
            println!();

            println!("Effective values (with env/CLI overrides):");
            println!("[server]");
            println!("  port = {}", effective.server.port);
            println!("  db_path = \"{}\"", effective.server.db_path.display());
            println!("  dev = {}", effective.server.dev);
            println!("[client]");
            println!("  base_url = \"{}\"", effective.client.base_url);
            println!("  timeout_secs = {}", effective.client.timeout_secs);
            println!("  retries = {}", effective.client.retries);
            println!("[logging]");
            println!("  level = \"{}\"", effective.logging.level);
            println!("  json = {}", effective.logging.json);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            if !config_path.exists() {
                println!("No checker.toml found. Using defaults (valid).");
                return Ok(());
            }

            let warnings = CheckerToml::load(&config_path)?.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("{}", style("Configuration warnings:").yellow());
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("checker.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            std::fs::create_dir_all(&config_dir)?;
            CheckerToml::default().save(&config_path)?;
            println!("Created checker.toml at {}", config_path.display());
        }
    }

    Ok(())
}
