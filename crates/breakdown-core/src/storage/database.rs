//! SQLite-based local storage.
//!
//! Provides persistent storage for:
//! - Completed phases (work and break history) and statistics
//! - Per-user task checklists
//! - Key-value store for per-user integration state

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::data_dir;
use crate::error::{DatabaseError, Result};
use crate::identity::UserId;
use crate::tasks::TaskRecord;
use crate::timer::SessionKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub id: i64,
    pub kind: SessionKind,
    pub duration_secs: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Stats {
    pub completed_work_sessions: u64,
    pub total_work_secs: u64,
    pub total_break_secs: u64,
    pub today_work_sessions: u64,
    pub today_work_secs: u64,
}

/// SQLite database for phase history, tasks and integration state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/breakdown.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("breakdown.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS phases (
                    id            INTEGER PRIMARY KEY AUTOINCREMENT,
                    kind          TEXT NOT NULL,
                    duration_secs INTEGER NOT NULL,
                    started_at    TEXT NOT NULL,
                    completed_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS tasks (
                    user_id    TEXT NOT NULL,
                    id         TEXT NOT NULL,
                    text       TEXT NOT NULL,
                    done       INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, id)
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_phases_completed_at ON phases(completed_at);
                CREATE INDEX IF NOT EXISTS idx_tasks_user_created ON tasks(user_id, created_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    // ── Phase history ────────────────────────────────────────────────

    /// Record a phase that ran to completion.
    pub fn record_phase(
        &self,
        kind: SessionKind,
        duration_secs: u64,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO phases (kind, duration_secs, started_at, completed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                kind.as_str(),
                duration_secs,
                started_at.to_rfc3339(),
                completed_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent phases first.
    pub fn recent_phases(&self, limit: usize) -> Result<Vec<PhaseRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, duration_secs, started_at, completed_at
             FROM phases ORDER BY completed_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let kind: String = row.get(1)?;
            let started: String = row.get(3)?;
            let completed: String = row.get(4)?;
            Ok(PhaseRecord {
                id: row.get(0)?,
                kind: SessionKind::parse(&kind).unwrap_or(SessionKind::Work),
                duration_secs: row.get(2)?,
                started_at: parse_datetime(&started),
                completed_at: parse_datetime(&completed),
            })
        })?;
        rows.collect()
    }

    pub fn stats_today(&self) -> Result<Stats, rusqlite::Error> {
        let midnight = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| Utc.from_utc_datetime(&dt))
            .unwrap_or_else(Utc::now);
        let mut stats = self.stats_since(midnight)?;
        stats.today_work_sessions = stats.completed_work_sessions;
        stats.today_work_secs = stats.total_work_secs;
        Ok(stats)
    }

    pub fn stats_all(&self) -> Result<Stats, rusqlite::Error> {
        let all = DateTime::<Utc>::UNIX_EPOCH;
        let mut stats = self.stats_since(all)?;
        let today = self.stats_today()?;
        stats.today_work_sessions = today.today_work_sessions;
        stats.today_work_secs = today.today_work_secs;
        Ok(stats)
    }

    /// Totals over phases completed at or after `since`.
    /// The `today_*` fields are left at zero.
    pub fn stats_since(&self, since: DateTime<Utc>) -> Result<Stats, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, COUNT(*), COALESCE(SUM(duration_secs), 0)
             FROM phases
             WHERE completed_at >= ?1
             GROUP BY kind",
        )?;

        let mut stats = Stats::default();
        let rows = stmt.query_map(params![since.to_rfc3339()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
            ))
        })?;

        for row in rows {
            let (kind, count, secs) = row?;
            match SessionKind::parse(&kind) {
                Some(SessionKind::Work) => {
                    stats.completed_work_sessions += count;
                    stats.total_work_secs += secs;
                }
                Some(SessionKind::ShortBreak | SessionKind::LongBreak) => {
                    stats.total_break_secs += secs;
                }
                None => {}
            }
        }
        Ok(stats)
    }

    // ── Tasks ────────────────────────────────────────────────────────

    pub fn insert_task(&self, user: &UserId, task: &TaskRecord) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO tasks (user_id, id, text, done, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.as_str(),
                task.id,
                task.text,
                task.done,
                task.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_task(&self, user: &UserId, id: &str) -> Result<Option<TaskRecord>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, text, done, created_at FROM tasks WHERE user_id = ?1 AND id = ?2",
                params![user.as_str(), id],
                task_from_row,
            )
            .optional()
    }

    /// Returns whether a row was updated.
    pub fn set_task_done(&self, user: &UserId, id: &str, done: bool) -> Result<bool, rusqlite::Error> {
        let n = self.conn.execute(
            "UPDATE tasks SET done = ?3 WHERE user_id = ?1 AND id = ?2",
            params![user.as_str(), id, done],
        )?;
        Ok(n > 0)
    }

    /// Returns whether a row was deleted.
    pub fn delete_task(&self, user: &UserId, id: &str) -> Result<bool, rusqlite::Error> {
        let n = self.conn.execute(
            "DELETE FROM tasks WHERE user_id = ?1 AND id = ?2",
            params![user.as_str(), id],
        )?;
        Ok(n > 0)
    }

    /// Oldest first.
    pub fn list_tasks(&self, user: &UserId) -> Result<Vec<TaskRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, text, done, created_at FROM tasks
             WHERE user_id = ?1 ORDER BY created_at, rowid",
        )?;
        let rows = stmt.query_map(params![user.as_str()], task_from_row)?;
        rows.collect()
    }

    // ── Key-value ────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRecord> {
    let created: String = row.get(3)?;
    Ok(TaskRecord {
        id: row.get(0)?,
        text: row.get(1)?,
        done: row.get(2)?,
        created_at: parse_datetime(&created),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.record_phase(SessionKind::Work, 1500, now - Duration::seconds(1500), now)
            .unwrap();
        db.record_phase(SessionKind::ShortBreak, 300, now, now + Duration::seconds(300))
            .unwrap();
        let stats = db.stats_all().unwrap();
        assert_eq!(stats.completed_work_sessions, 1);
        assert_eq!(stats.total_work_secs, 1500);
        assert_eq!(stats.total_break_secs, 300);
        assert_eq!(stats.today_work_sessions, 1);
    }

    #[test]
    fn stats_since_excludes_older_phases() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        let old = now - Duration::days(3);
        db.record_phase(SessionKind::Work, 1500, old, old).unwrap();
        db.record_phase(SessionKind::Work, 1200, now, now).unwrap();
        let recent = db.stats_since(now - Duration::hours(1)).unwrap();
        assert_eq!(recent.completed_work_sessions, 1);
        assert_eq!(recent.total_work_secs, 1200);
        assert_eq!(db.stats_all().unwrap().completed_work_sessions, 2);
    }

    #[test]
    fn recent_phases_newest_first() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.record_phase(SessionKind::Work, 60, now, now).unwrap();
        db.record_phase(SessionKind::LongBreak, 30, now, now + Duration::seconds(30))
            .unwrap();
        let phases = db.recent_phases(10).unwrap();
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].kind, SessionKind::LongBreak);
    }

    #[test]
    fn tasks_are_scoped_per_user() {
        let db = Database::open_memory().unwrap();
        let ada = UserId::new("ada").unwrap();
        let bob = UserId::new("bob").unwrap();
        let task = TaskRecord::new("write report");
        db.insert_task(&ada, &task).unwrap();

        assert_eq!(db.list_tasks(&ada).unwrap().len(), 1);
        assert!(db.list_tasks(&bob).unwrap().is_empty());
        assert!(!db.set_task_done(&bob, &task.id, true).unwrap());
        assert!(db.set_task_done(&ada, &task.id, true).unwrap());
        assert!(db.get_task(&ada, &task.id).unwrap().unwrap().done);
        assert!(db.delete_task(&ada, &task.id).unwrap());
        assert!(db.get_task(&ada, &task.id).unwrap().is_none());
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_delete("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("breakdown.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.kv_set("k", "v").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.kv_get("k").unwrap().as_deref(), Some("v"));
    }
}
