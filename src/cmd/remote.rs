//! Client commands against the persistence endpoint - `checker list`,
//! `pull`, `push` and `publish`.

use std::path::Path;

use anyhow::{Context, Result};
use checker_builder::builder::{Checker, CheckerClient, CheckerId, CheckerRemote, CheckerStore};
use checker_builder::config::CheckerToml;
use console::style;

fn connect(settings: &CheckerToml) -> Result<CheckerClient> {
    CheckerClient::new(&settings.client_config()).context("Failed to build HTTP client")
}

pub async fn cmd_list(settings: &CheckerToml) -> Result<()> {
    let client = connect(settings)?;
    let checkers = client
        .list()
        .await
        .with_context(|| format!("Failed to list checkers at {}", client.base_url()))?;

    if checkers.is_empty() {
        println!("No checkers stored at {}", client.base_url());
        return Ok(());
    }

    println!("{:<30} {:<20} Title", "Id", "Updated");
    println!("{:<30} {:<20} -----", "-".repeat(30), "-".repeat(20));
    for summary in &checkers {
        println!(
            "{:<30} {:<20} {}",
            summary.id.as_str(),
            summary.updated_at,
            summary.title
        );
    }
    Ok(())
}

pub async fn cmd_pull(settings: &CheckerToml, id: &str, output: Option<&Path>) -> Result<()> {
    let id = CheckerId::parse(id)?;
    let mut store = CheckerStore::new(connect(settings)?);
    store
        .load(&id)
        .await
        .with_context(|| format!("Failed to load checker '{}'", id))?;

    let json = serde_json::to_string_pretty(store.config())?;
    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} {} -> {}", style("Pulled").green(), id, path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub async fn cmd_push(settings: &CheckerToml, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let checker = Checker::from_json(&content)
        .with_context(|| format!("{} is not a checker document", file.display()))?;

    let mut store = CheckerStore::with_config(connect(settings)?, checker);
    let saved = store.save().await.context("Failed to save checker")?;
    println!(
        "{} {} (updated {})",
        style("Saved").green(),
        saved.id,
        saved.updated_at.as_deref().unwrap_or("-")
    );
    Ok(())
}

pub async fn cmd_publish(settings: &CheckerToml, id: &str) -> Result<()> {
    let id = CheckerId::parse(id)?;
    let mut store = CheckerStore::new(connect(settings)?);
    store
        .load(&id)
        .await
        .with_context(|| format!("Failed to load checker '{}'", id))?;
    let published = store
        .publish()
        .await
        .with_context(|| format!("Failed to publish checker '{}'", id))?;

    println!(
        "{} {} as snapshot #{} at {}",
        style("Published").green().bold(),
        published.checker_id,
        published.id,
        published.created_at
    );
    Ok(())
}
