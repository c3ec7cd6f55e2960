mod schema;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::models::*;

/// File name of the index inside the scrap directory.
pub const INDEX_FILE: &str = ".index.db";

/// Files owned by the index. Never offered as destination names and never
/// reported as untracked items.
pub const RESERVED_NAMES: &[&str] = &[INDEX_FILE, ".index.db-journal"];

/// The scrap index: which items live in the scrap directory and what has
/// happened to them.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open scrap index at {}", path.display()))?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn migrate(&self) -> Result<()> {
        schema::run_migrations(&self.conn)
    }

    // ============================================================
    // Entry operations
    // ============================================================

    pub fn create_entry(&self, input: CreateEntryInput) -> Result<ScrapEntry> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        self.conn
            .execute(
                "INSERT INTO entries (id, name, original_path, kind, size_bytes, scrapped_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                (
                    id.to_string(),
                    &input.name,
                    &input.original_path,
                    input.kind.as_str(),
                    input.size_bytes as i64,
                    now.to_rfc3339(),
                ),
            )
            .with_context(|| format!("Failed to record entry {}", input.name))?;

        Ok(ScrapEntry {
            id,
            name: input.name,
            original_path: input.original_path,
            kind: input.kind,
            size_bytes: input.size_bytes,
            scrapped_at: now,
        })
    }

    pub fn get_all_entries(&self) -> Result<Vec<ScrapEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, original_path, kind, size_bytes, scrapped_at
             FROM entries ORDER BY rowid",
        )?;

        let entries = stmt
            .query_map([], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    pub fn get_entry_by_name(&self, name: &str) -> Result<Option<ScrapEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, original_path, kind, size_bytes, scrapped_at
             FROM entries WHERE name = ?",
        )?;

        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            Ok(Some(entry_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Case-insensitive substring search over stored name and original path.
    pub fn search_entries(&self, query: &str) -> Result<Vec<ScrapEntry>> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let mut stmt = self.conn.prepare(
            "SELECT id, name, original_path, kind, size_bytes, scrapped_at
             FROM entries
             WHERE LOWER(name) LIKE ?1 ESCAPE '\\' OR LOWER(original_path) LIKE ?1 ESCAPE '\\'
             ORDER BY rowid",
        )?;

        let entries = stmt
            .query_map([pattern], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Entries scrapped strictly before `cutoff`.
    pub fn get_entries_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<ScrapEntry>> {
        // Compared as parsed timestamps; stored strings vary in fractional digits.
        let entries = self
            .get_all_entries()?
            .into_iter()
            .filter(|e| e.scrapped_at < cutoff)
            .collect();
        Ok(entries)
    }

    pub fn delete_entry(&self, id: Uuid) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // History operations
    // ============================================================

    pub fn create_history_event(&self, input: CreateHistoryInput) -> Result<HistoryEvent> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        self.conn.execute(
            "INSERT INTO history (id, action, name, original_path, detail, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                input.action.as_str(),
                &input.name,
                &input.original_path,
                &input.detail,
                now.to_rfc3339(),
            ),
        )?;

        Ok(HistoryEvent {
            id,
            action: input.action,
            name: input.name,
            original_path: input.original_path,
            detail: input.detail,
            created_at: now,
        })
    }

    /// Most recent events first. `None` returns the whole log.
    pub fn get_history(&self, limit: Option<usize>) -> Result<Vec<HistoryEvent>> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = self.conn.prepare(
            "SELECT id, action, name, original_path, detail, created_at
             FROM history ORDER BY rowid DESC LIMIT ?",
        )?;

        let events = stmt
            .query_map([limit], |row| {
                Ok(HistoryEvent {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    action: HistoryAction::from_str(&row.get::<_, String>(1)?)
                        .unwrap_or(HistoryAction::Scrapped),
                    name: row.get(2)?,
                    original_path: row.get(3)?,
                    detail: row.get(4)?,
                    created_at: parse_datetime(row.get::<_, String>(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events)
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<ScrapEntry> {
    Ok(ScrapEntry {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        original_path: row.get(2)?,
        kind: EntryKind::from_str(&row.get::<_, String>(3)?).unwrap_or(EntryKind::File),
        size_bytes: row.get::<_, i64>(4)?.max(0) as u64,
        scrapped_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
