//! Persistence endpoint commands - `checker serve` and `checker init-db`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use checker_builder::builder::server::{open_database, start_server};
use checker_builder::config::CheckerToml;

/// Relative database paths are taken from the project directory.
fn resolve_db_path(project_dir: &Path, settings: &CheckerToml, db_path: Option<&Path>) -> PathBuf {
    let path = db_path.unwrap_or(&settings.server.db_path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}

pub async fn cmd_serve(
    project_dir: &Path,
    settings: &CheckerToml,
    port: Option<u16>,
    db_path: Option<&Path>,
    dev: bool,
) -> Result<()> {
    let mut config = settings.server_config();
    config.db_path = resolve_db_path(project_dir, settings, db_path);
    if let Some(port) = port {
        config.port = port;
    }
    config.dev_mode |= dev;

    start_server(config).await
}

pub fn cmd_init_db(project_dir: &Path, settings: &CheckerToml, db_path: Option<&Path>) -> Result<()> {
    let db_path = resolve_db_path(project_dir, settings, db_path);
    open_database(&db_path)?;
    println!("Checker database initialized at {}", db_path.display());
    Ok(())
}
