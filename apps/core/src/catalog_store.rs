use std::collections::HashSet;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::config::Config;
use crate::model::{ApplicationRecord, Category};

pub const MOST_USED_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS application (
    id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    secondary_name TEXT,
    version_label TEXT NOT NULL DEFAULT '',
    version_ordinal INTEGER NOT NULL DEFAULT 0,
    is_system_component INTEGER NOT NULL DEFAULT 0,
    installed_at INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL DEFAULT 0,
    category TEXT NOT NULL DEFAULT 'other',
    enabled INTEGER NOT NULL DEFAULT 1,
    launch_count INTEGER NOT NULL DEFAULT 0,
    last_launched_at INTEGER,
    is_favorite INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_application_favorite ON application(is_favorite);
CREATE INDEX IF NOT EXISTS idx_application_launch_count ON application(launch_count DESC);
";

const SELECT_COLUMNS: &str = "SELECT id, display_name, secondary_name, version_label, version_ordinal,
        is_system_component, installed_at, updated_at, category, enabled,
        launch_count, last_launched_at, is_favorite
     FROM application";

pub fn open_memory() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

pub fn open_file(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

pub fn open_from_config(cfg: &Config) -> Result<Connection, StoreError> {
    open_file(&cfg.catalog_db_path)
}

/// Inserts new ids with zero statistics; existing ids get identity fields refreshed
/// while launch count, last launch and favorite flag stay untouched.
/// Returns the number of newly inserted ids.
pub fn upsert_records(db: &Connection, records: &[ApplicationRecord]) -> Result<usize, StoreError> {
    let tx = db.unchecked_transaction()?;
    let inserted = write_identity(&tx, records)?;
    tx.commit()?;
    Ok(inserted)
}

pub(crate) fn write_identity(
    db: &Connection,
    records: &[ApplicationRecord],
) -> Result<usize, StoreError> {
    let mut exists = db.prepare_cached("SELECT 1 FROM application WHERE id = ?1")?;
    let mut upsert = db.prepare_cached(
        "INSERT INTO application (id, display_name, secondary_name, version_label, version_ordinal,
             is_system_component, installed_at, updated_at, category, enabled)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
             display_name = excluded.display_name,
             secondary_name = excluded.secondary_name,
             version_label = excluded.version_label,
             version_ordinal = excluded.version_ordinal,
             is_system_component = excluded.is_system_component,
             installed_at = excluded.installed_at,
             updated_at = excluded.updated_at,
             category = excluded.category,
             enabled = excluded.enabled",
    )?;

    let mut inserted = 0;
    for record in records {
        if !exists.exists(params![record.id])? {
            inserted += 1;
        }
        upsert.execute(params![
            record.id,
            record.display_name,
            record.secondary_name,
            record.version_label,
            record.version_ordinal,
            record.is_system_component,
            record.installed_at,
            record.updated_at,
            record.category.as_str(),
            record.enabled,
        ])?;
    }
    Ok(inserted)
}

/// Writes a record including its statistics. Used for seeding and imports.
pub fn insert_record(db: &Connection, record: &ApplicationRecord) -> Result<(), StoreError> {
    db.execute(
        "INSERT OR REPLACE INTO application (id, display_name, secondary_name, version_label,
             version_ordinal, is_system_component, installed_at, updated_at, category, enabled,
             launch_count, last_launched_at, is_favorite)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            record.id,
            record.display_name,
            record.secondary_name,
            record.version_label,
            record.version_ordinal,
            record.is_system_component,
            record.installed_at,
            record.updated_at,
            record.category.as_str(),
            record.enabled,
            record.launch_count,
            record.last_launched_at,
            record.is_favorite,
        ],
    )?;
    Ok(())
}

pub fn get_record(db: &Connection, id: &str) -> Result<Option<ApplicationRecord>, StoreError> {
    let mut stmt = db.prepare_cached(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
    let record = stmt.query_row(params![id], record_from_row).optional()?;
    Ok(record)
}

pub fn list_records(db: &Connection) -> Result<Vec<ApplicationRecord>, StoreError> {
    query_records(db, &format!("{SELECT_COLUMNS} ORDER BY id"), [])
}

pub fn list_favorites(db: &Connection) -> Result<Vec<ApplicationRecord>, StoreError> {
    query_records(
        db,
        &format!(
            "{SELECT_COLUMNS} WHERE is_favorite = 1 AND enabled = 1
             ORDER BY display_name COLLATE NOCASE, id"
        ),
        [],
    )
}

/// Most launched records, capped at [`MOST_USED_LIMIT`]. Never-launched records are left out.
pub fn list_most_used(db: &Connection, limit: usize) -> Result<Vec<ApplicationRecord>, StoreError> {
    let limit = limit.min(MOST_USED_LIMIT) as i64;
    query_records(
        db,
        &format!(
            "{SELECT_COLUMNS} WHERE launch_count > 0 AND enabled = 1
             ORDER BY launch_count DESC, display_name COLLATE NOCASE, id LIMIT ?1"
        ),
        params![limit],
    )
}

pub fn count(db: &Connection) -> Result<usize, StoreError> {
    let total: i64 = db.query_row("SELECT COUNT(*) FROM application", [], |row| row.get(0))?;
    Ok(total as usize)
}

pub fn ids(db: &Connection) -> Result<HashSet<String>, StoreError> {
    let mut stmt = db.prepare_cached("SELECT id FROM application")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut out = HashSet::new();
    for id in rows {
        out.insert(id?);
    }
    Ok(out)
}

pub fn delete_record(db: &Connection, id: &str) -> Result<bool, StoreError> {
    let changed = db.execute("DELETE FROM application WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

/// Deletes every record whose id is not in `keep`. Returns the number removed.
pub fn delete_missing(db: &Connection, keep: &HashSet<String>) -> Result<usize, StoreError> {
    let tx = db.unchecked_transaction()?;
    let removed = remove_absent(&tx, keep)?;
    tx.commit()?;
    Ok(removed)
}

pub(crate) fn remove_absent(db: &Connection, keep: &HashSet<String>) -> Result<usize, StoreError> {
    let stale: Vec<String> = ids(db)?
        .into_iter()
        .filter(|id| !keep.contains(id))
        .collect();
    let mut delete = db.prepare_cached("DELETE FROM application WHERE id = ?1")?;
    for id in &stale {
        delete.execute(params![id])?;
    }
    Ok(stale.len())
}

/// Increments the launch count and stamps the launch time in one statement.
/// Returns false when the id is unknown.
pub fn record_launch(db: &Connection, id: &str, now: i64) -> Result<bool, StoreError> {
    let changed = db.execute(
        "UPDATE application SET launch_count = launch_count + 1, last_launched_at = ?2 WHERE id = ?1",
        params![id, now],
    )?;
    Ok(changed > 0)
}

pub fn set_favorite(db: &Connection, id: &str, favorite: bool) -> Result<bool, StoreError> {
    let changed = db.execute(
        "UPDATE application SET is_favorite = ?2 WHERE id = ?1",
        params![id, favorite],
    )?;
    Ok(changed > 0)
}

/// Flips the favorite flag. `None` when the id is unknown.
pub fn toggle_favorite(db: &Connection, id: &str) -> Result<Option<bool>, StoreError> {
    let tx = db.unchecked_transaction()?;
    let current: Option<bool> = tx
        .query_row(
            "SELECT is_favorite FROM application WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(current) = current else {
        return Ok(None);
    };
    tx.execute(
        "UPDATE application SET is_favorite = ?2 WHERE id = ?1",
        params![id, !current],
    )?;
    tx.commit()?;
    Ok(Some(!current))
}

/// Housekeeping: drops never-launched, non-favorite records not updated within `max_age_secs`.
pub fn sweep_retention(db: &Connection, now: i64, max_age_secs: i64) -> Result<usize, StoreError> {
    let cutoff = now.saturating_sub(max_age_secs);
    let removed = db.execute(
        "DELETE FROM application WHERE launch_count = 0 AND is_favorite = 0 AND updated_at < ?1",
        params![cutoff],
    )?;
    Ok(removed)
}

fn query_records<P: rusqlite::Params>(
    db: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<ApplicationRecord>, StoreError> {
    let mut stmt = db.prepare_cached(sql)?;
    let rows = stmt.query_map(params, record_from_row)?;
    let mut out = Vec::new();
    for record in rows {
        out.push(record?);
    }
    Ok(out)
}

fn record_from_row(row: &Row<'_>) -> Result<ApplicationRecord, rusqlite::Error> {
    let category: String = row.get(8)?;
    Ok(ApplicationRecord {
        id: row.get(0)?,
        display_name: row.get(1)?,
        secondary_name: row.get(2)?,
        version_label: row.get(3)?,
        version_ordinal: row.get(4)?,
        is_system_component: row.get(5)?,
        installed_at: row.get(6)?,
        updated_at: row.get(7)?,
        category: Category::parse(&category),
        enabled: row.get(9)?,
        launch_count: row.get(10)?,
        last_launched_at: row.get(11)?,
        is_favorite: row.get(12)?,
        transient_score: None,
    })
}
