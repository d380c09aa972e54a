//! Offline editing - `checker apply`.

use std::path::Path;

use anyhow::{Context, Result};
use checker_builder::builder::{Checker, parse_actions, reduce_all};

/// Read a document and an action list, then run every action through the
/// reducer. Nothing is written when an action is rejected.
pub fn apply_files(document: &Path, actions: &Path) -> Result<Checker> {
    let content = std::fs::read_to_string(document)
        .with_context(|| format!("Failed to read {}", document.display()))?;
    let checker = Checker::from_json(&content)
        .with_context(|| format!("{} is not a checker document", document.display()))?;

    let content = std::fs::read_to_string(actions)
        .with_context(|| format!("Failed to read {}", actions.display()))?;
    let actions = parse_actions(&content)
        .with_context(|| format!("{} is not a list of actions", actions.display()))?;
    let count = actions.len();

    let result = reduce_all(&checker, actions).map_err(|(position, e)| {
        anyhow::Error::new(e).context(format!("Action #{} was rejected", position + 1))
    })?;
    tracing::debug!(checker = %result.id, actions = count, "actions applied");
    Ok(result)
}

pub fn cmd_apply(document: &Path, actions: &Path, output: Option<&Path>) -> Result<()> {
    let result = apply_files(document, actions)?;
    let json = serde_json::to_string_pretty(&result)?;

    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
