//! SQLite-backed storage for tasks and their completed intervals.

use crate::error::{Error, Result};
use crate::task::{Pomodoro, Tags, Task};
use chrono::{DateTime, Local};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Where the runner records each interval it finishes
pub trait IntervalStore: Send + Sync {
    /// Appends one closed interval under `task_id` as a single atomic unit.
    fn append_interval(&self, task_id: i64, pomodoro: &Pomodoro) -> Result<()>;
}

impl<S: IntervalStore + ?Sized> IntervalStore for Arc<S> {
    fn append_interval(&self, task_id: i64, pomodoro: &Pomodoro) -> Result<()> {
        (**self).append_interval(task_id, pomodoro)
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS task (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    message     TEXT NOT NULL,
    duration_ms INTEGER NOT NULL,
    n_pomodoros INTEGER NOT NULL,
    tags        TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS pomodoro (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id    INTEGER NOT NULL REFERENCES task(id) ON DELETE CASCADE,
    started_at TEXT NOT NULL,
    ended_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pomodoro_task_id ON pomodoro(task_id);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database file and its schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        debug!("Opened store at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Runs `f` inside one transaction. Commits when `f` returns Ok, rolls
    /// back otherwise.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Inserts the task and writes the assigned id back into it.
    pub fn create_task(&self, task: &mut Task) -> Result<()> {
        let tags = serde_json::to_string(&task.tags)?;
        let duration_ms = duration_to_ms(task.duration)?;
        let id = self.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO task (message, duration_ms, n_pomodoros, tags)
                 VALUES (?1, ?2, ?3, ?4)",
                params![task.message, duration_ms, task.n_pomodoros, tags],
            )?;
            let id = tx.last_insert_rowid();
            for pomodoro in &task.pomodoros {
                insert_pomodoro(tx, id, pomodoro)?;
            }
            Ok(id)
        })?;
        task.id = id;
        Ok(())
    }

    pub fn get_task(&self, id: i64) -> Result<Task> {
        let conn = self.lock();
        load_task(&conn, id)
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        let conn = self.lock();
        let ids = {
            let mut stmt = conn.prepare("SELECT id FROM task ORDER BY id")?;
            let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        ids.into_iter().map(|id| load_task(&conn, id)).collect()
    }

    /// Rewrites the task's message, interval length, target and tags. Its
    /// recorded intervals are left alone.
    pub fn update_task(&self, task: &Task) -> Result<()> {
        let tags = serde_json::to_string(&task.tags)?;
        let duration_ms = duration_to_ms(task.duration)?;
        self.with_transaction(|tx| {
            let updated = tx.execute(
                "UPDATE task SET message = ?1, duration_ms = ?2, n_pomodoros = ?3, tags = ?4
                 WHERE id = ?5",
                params![task.message, duration_ms, task.n_pomodoros, tags, task.id],
            )?;
            if updated == 0 {
                return Err(Error::TaskNotFound(task.id));
            }
            Ok(())
        })
    }

    /// Deletes the task together with its intervals.
    pub fn delete_task(&self, id: i64) -> Result<()> {
        self.with_transaction(|tx| {
            let deleted = tx.execute("DELETE FROM task WHERE id = ?1", params![id])?;
            if deleted == 0 {
                return Err(Error::TaskNotFound(id));
            }
            Ok(())
        })
    }
}

impl IntervalStore for SqliteStore {
    fn append_interval(&self, task_id: i64, pomodoro: &Pomodoro) -> Result<()> {
        self.with_transaction(|tx| {
            if !task_exists(tx, task_id)? {
                return Err(Error::TaskNotFound(task_id));
            }
            insert_pomodoro(tx, task_id, pomodoro)
        })
    }
}

fn task_exists(conn: &Connection, id: i64) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM task WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn insert_pomodoro(conn: &Connection, task_id: i64, pomodoro: &Pomodoro) -> Result<()> {
    conn.execute(
        "INSERT INTO pomodoro (task_id, started_at, ended_at) VALUES (?1, ?2, ?3)",
        params![task_id, pomodoro.start.to_rfc3339(), pomodoro.end.to_rfc3339()],
    )?;
    Ok(())
}

fn load_task(conn: &Connection, id: i64) -> Result<Task> {
    let row = conn
        .query_row(
            "SELECT message, duration_ms, n_pomodoros, tags FROM task WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;
    let (message, duration_ms, n_pomodoros, tags) = row.ok_or(Error::TaskNotFound(id))?;
    let tags: Tags = serde_json::from_str(&tags)?;

    let mut stmt =
        conn.prepare("SELECT started_at, ended_at FROM pomodoro WHERE task_id = ?1 ORDER BY id")?;
    let pomodoros = stmt
        .query_map(params![id], |row| {
            let start = parse_timestamp(row.get::<_, String>(0)?, 0)?;
            let end = parse_timestamp(row.get::<_, String>(1)?, 1)?;
            Ok(Pomodoro { start, end })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Task {
        id,
        message,
        duration: Duration::from_millis(u64::try_from(duration_ms).unwrap_or_default()),
        n_pomodoros,
        pomodoros,
        tags,
    })
}

fn parse_timestamp(value: String, column: usize) -> rusqlite::Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err)))
}

fn duration_to_ms(duration: Duration) -> Result<i64> {
    i64::try_from(duration.as_millis())
        .map_err(|_| Error::InvalidTask(format!("duration {duration:?} is too large to store")))
}
