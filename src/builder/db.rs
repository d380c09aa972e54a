use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use super::models::*;

/// Async-safe handle to the checker database.
///
/// Wraps `CheckerDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, preventing synchronous SQLite
/// I/O from tying up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<CheckerDb>>,
}

impl DbHandle {
    pub fn new(db: CheckerDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&CheckerDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

pub struct CheckerDb {
    conn: Connection,
}

/// Raw `checkers` row; sequences are still JSON text.
struct CheckerRow {
    id: String,
    title: String,
    description: Option<String>,
    fields: String,
    constants: String,
    operations: String,
    displays: String,
    created_at: String,
    updated_at: String,
}

const CHECKER_COLUMNS: &str =
    "id, title, description, fields, constants, operations, displays, created_at, updated_at";

impl CheckerDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS checkers (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT,
                    fields TEXT NOT NULL DEFAULT '[]',
                    constants TEXT NOT NULL DEFAULT '[]',
                    operations TEXT NOT NULL DEFAULT '[]',
                    displays TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS published_checkers (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    checker_id TEXT NOT NULL REFERENCES checkers(id) ON DELETE CASCADE,
                    snapshot TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE INDEX IF NOT EXISTS idx_published_checker ON published_checkers(checker_id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Checker CRUD ──────────────────────────────────────────────────

    pub fn get_checker(&self, id: &CheckerId) -> Result<Option<Checker>> {
        let sql = format!("SELECT {} FROM checkers WHERE id = ?1", CHECKER_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![id.as_str()], read_checker_row)
            .optional()
            .context("Failed to query checker")?;
        row.map(CheckerRow::into_checker).transpose()
    }

    /// Insert or overwrite a checker. `created_at` survives overwrites;
    /// `updated_at` is bumped on every write. Client-supplied timestamps
    /// are ignored.
    pub fn put_checker(&self, checker: &Checker) -> Result<Checker> {
        self.conn
            .execute(
                "INSERT INTO checkers (id, title, description, fields, constants, operations, displays)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    fields = excluded.fields,
                    constants = excluded.constants,
                    operations = excluded.operations,
                    displays = excluded.displays,
                    updated_at = datetime('now')",
                params![
                    checker.id.as_str(),
                    checker.title,
                    checker.description,
                    to_json(&checker.fields)?,
                    to_json(&checker.constants)?,
                    to_json(&checker.operations)?,
                    to_json(&checker.displays)?,
                ],
            )
            .context("Failed to upsert checker")?;
        self.get_checker(&checker.id)?
            .context("Checker not found after upsert")
    }

    pub fn list_checkers(&self) -> Result<Vec<CheckerSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, updated_at FROM checkers ORDER BY id")
            .context("Failed to prepare list_checkers")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .context("Failed to query checkers")?;
        let mut summaries = Vec::new();
        for row in rows {
            let (id, title, updated_at) = row.context("Failed to read checker row")?;
            summaries.push(CheckerSummary {
                id: CheckerId::parse(id)?,
                title,
                updated_at,
            });
        }
        Ok(summaries)
    }

    pub fn delete_checker(&self, id: &CheckerId) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM checkers WHERE id = ?1", params![id.as_str()])
            .context("Failed to delete checker")?;
        Ok(affected > 0)
    }

    // ── Publishing ────────────────────────────────────────────────────

    /// Snapshot the stored checker. Returns `None` when nothing is stored
    /// under `id`.
    pub fn publish_checker(&self, id: &CheckerId) -> Result<Option<PublishedChecker>> {
        let Some(checker) = self.get_checker(id)? else {
            return Ok(None);
        };
        let snapshot = serde_json::to_string(&checker).context("Failed to serialize snapshot")?;
        self.conn
            .execute(
                "INSERT INTO published_checkers (checker_id, snapshot) VALUES (?1, ?2)",
                params![id.as_str(), snapshot],
            )
            .context("Failed to insert published checker")?;
        let published_id = self.conn.last_insert_rowid();
        self.get_published(published_id)
    }

    /// The most recent published snapshot of `id`.
    pub fn latest_published(&self, id: &CheckerId) -> Result<Option<PublishedChecker>> {
        let published_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM published_checkers WHERE checker_id = ?1 ORDER BY id DESC LIMIT 1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query latest published checker")?;
        match published_id {
            Some(published_id) => self.get_published(published_id),
            None => Ok(None),
        }
    }

    fn get_published(&self, published_id: i64) -> Result<Option<PublishedChecker>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, checker_id, snapshot, created_at FROM published_checkers WHERE id = ?1",
                params![published_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .context("Failed to query published checker")?;
        let Some((id, checker_id, snapshot, created_at)) = row else {
            return Ok(None);
        };
        Ok(Some(PublishedChecker {
            id,
            checker_id: CheckerId::parse(checker_id)?,
            checker: serde_json::from_str(&snapshot).context("Corrupt published snapshot")?,
            created_at,
        }))
    }
}

fn read_checker_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CheckerRow> {
    Ok(CheckerRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        fields: row.get(3)?,
        constants: row.get(4)?,
        operations: row.get(5)?,
        displays: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn to_json(elements: &[Element]) -> Result<String> {
    serde_json::to_string(elements).context("Failed to serialize sequence")
}

fn from_json(column: &str, raw: &str) -> Result<Vec<Element>> {
    serde_json::from_str(raw).with_context(|| format!("Corrupt JSON in column '{}'", column))
}

impl CheckerRow {
    fn into_checker(self) -> Result<Checker> {
        Ok(Checker {
            id: CheckerId::parse(self.id)?,
            title: self.title,
            description: self.description,
            fields: from_json("fields", &self.fields)?,
            constants: from_json("constants", &self.constants)?,
            operations: from_json("operations", &self.operations)?,
            displays: from_json("displays", &self.displays)?,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(id: &str) -> Checker {
        let mut checker = Checker::new(CheckerId::parse(id).unwrap(), "Eligibility");
        checker.description = Some("Am I eligible?".into());
        checker.fields = vec![
            Element::try_from(json!({"id": "F1", "type": "NUMERIC", "title": "Age"})).unwrap(),
        ];
        checker.operations = vec![
            Element::try_from(json!({"id": "O1", "type": "ADD", "expression": "F1 + 1"})).unwrap(),
        ];
        checker
    }

    #[test]
    fn test_create_database_and_run_migrations() -> Result<()> {
        let db = CheckerDb::new_in_memory()?;
        let tables: Vec<String> = db
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        assert!(tables.contains(&"checkers".to_string()));
        assert!(tables.contains(&"published_checkers".to_string()));

        // Re-running migrations is harmless
        db.run_migrations()?;
        Ok(())
    }

    #[test]
    fn test_get_missing_checker_returns_none() -> Result<()> {
        let db = CheckerDb::new_in_memory()?;
        assert!(db.get_checker(&CheckerId::parse("nope")?)?.is_none());
        Ok(())
    }

    #[test]
    fn test_put_and_get_checker() -> Result<()> {
        let db = CheckerDb::new_in_memory()?;
        let checker = sample("eligibility");

        let stored = db.put_checker(&checker)?;
        assert!(stored.content_eq(&checker));
        assert!(stored.created_at.is_some());
        assert!(stored.updated_at.is_some());

        let fetched = db.get_checker(&checker.id)?.expect("checker should exist");
        assert_eq!(fetched, stored);
        assert_eq!(fetched.fields[0].kind(), Some("NUMERIC"));
        Ok(())
    }

    #[test]
    fn test_put_overwrites_and_keeps_created_at() -> Result<()> {
        let db = CheckerDb::new_in_memory()?;
        let first = db.put_checker(&sample("overwrite"))?;

        let mut edited = sample("overwrite");
        edited.title = "Renamed".into();
        edited.fields.clear();
        edited.created_at = Some("1999-01-01 00:00:00".into());
        let second = db.put_checker(&edited)?;

        assert_eq!(second.title, "Renamed");
        assert!(second.fields.is_empty());
        assert_eq!(second.created_at, first.created_at);
        Ok(())
    }

    #[test]
    fn test_list_checkers_ordered_by_id() -> Result<()> {
        let db = CheckerDb::new_in_memory()?;
        db.put_checker(&sample("zeta"))?;
        db.put_checker(&sample("alpha"))?;

        let list = db.list_checkers()?;
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id.as_str(), "alpha");
        assert_eq!(list[1].id.as_str(), "zeta");
        assert_eq!(list[0].title, "Eligibility");
        Ok(())
    }

    #[test]
    fn test_publish_requires_stored_checker() -> Result<()> {
        let db = CheckerDb::new_in_memory()?;
        assert!(db.publish_checker(&CheckerId::parse("ghost")?)?.is_none());
        Ok(())
    }

    #[test]
    fn test_publish_snapshots_current_version() -> Result<()> {
        let db = CheckerDb::new_in_memory()?;
        let id = CheckerId::parse("snap")?;
        db.put_checker(&sample("snap"))?;
        let first = db.publish_checker(&id)?.expect("published");
        assert_eq!(first.checker_id, id);
        assert_eq!(first.checker.title, "Eligibility");

        let mut edited = sample("snap");
        edited.title = "Second".into();
        db.put_checker(&edited)?;

        // Earlier snapshot is unaffected by later edits
        let latest = db.latest_published(&id)?.expect("latest");
        assert_eq!(latest.id, first.id);
        assert_eq!(latest.checker.title, "Eligibility");

        let second = db.publish_checker(&id)?.expect("published");
        assert!(second.id > first.id);
        assert_eq!(db.latest_published(&id)?.unwrap().checker.title, "Second");
        Ok(())
    }

    #[test]
    fn test_delete_checker_cascades_to_published() -> Result<()> {
        let db = CheckerDb::new_in_memory()?;
        let id = CheckerId::parse("gone")?;
        db.put_checker(&sample("gone"))?;
        db.publish_checker(&id)?;

        assert!(db.delete_checker(&id)?);
        assert!(db.get_checker(&id)?.is_none());
        assert!(db.latest_published(&id)?.is_none());
        assert!(!db.delete_checker(&id)?);
        Ok(())
    }

    #[test]
    fn test_database_file_persists_between_opens() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("checkers.db");
        {
            let db = CheckerDb::new(&path)?;
            db.put_checker(&sample("durable"))?;
        }
        let reopened = CheckerDb::new(&path)?;
        assert!(reopened.get_checker(&CheckerId::parse("durable")?)?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_db_handle_call_runs_on_blocking_pool() -> Result<()> {
        let handle = DbHandle::new(CheckerDb::new_in_memory()?);
        let stored = handle
            .call(|db| db.put_checker(&sample("handle")))
            .await?;
        let id = stored.id.clone();
        let fetched = handle.call(move |db| db.get_checker(&id)).await?;
        assert_eq!(fetched, Some(stored));
        Ok(())
    }
}
