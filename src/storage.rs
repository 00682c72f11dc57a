//!
//! taskboard storage module
//! ------------------------
//! SQLite-backed persistence for users, tasks and projects. The `Store` trait
//! is the seam between the HTTP layer (including the auth gate's identity
//! lookup) and the backing engine; `SqliteStore` is the production
//! implementation, a `rusqlite` connection behind a `parking_lot` mutex.
//!
//! Entity ids arrive as strings from URLs and token claims and are bound
//! directly; SQLite's integer affinity resolves the comparison.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A registered user. The password hash never serializes into responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a user; the password arrives already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub status: String,
    #[serde(rename = "projectID")]
    pub project_id: i64,
    #[serde(rename = "assignedTo")]
    pub assigned_to_id: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Persistence operations keyed by entity id. Failures are either `NotFound`
/// or an underlying engine error; callers that must not leak the distinction
/// (the auth gate) collapse both.
pub trait Store: Send + Sync {
    // Users
    fn create_user(&self, user: NewUser) -> StoreResult<User>;
    fn get_user_by_id(&self, id: &str) -> StoreResult<User>;
    fn get_user_by_email(&self, email: &str) -> StoreResult<User>;
    // Tasks
    fn create_task(&self, name: &str, status: &str, project_id: i64, assigned_to_id: i64) -> StoreResult<Task>;
    fn get_task(&self, id: &str) -> StoreResult<Task>;
    fn update_task(&self, task: &Task) -> StoreResult<Task>;
    fn delete_task(&self, id: &str) -> StoreResult<()>;
    // Projects
    fn create_project(&self, name: &str) -> StoreResult<Project>;
    fn get_project(&self, id: &str) -> StoreResult<Project>;
    fn update_project(&self, project: &Project) -> StoreResult<Project>;
    fn delete_project(&self, id: &str) -> StoreResult<()>;
}

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        // WAL for concurrent reads; no-op on in-memory databases
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;",
        )?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                firstName TEXT NOT NULL,
                lastName TEXT NOT NULL,
                password TEXT NOT NULL,
                createdAt TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                createdAt TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                projectId INTEGER NOT NULL,
                assignedToID INTEGER NOT NULL,
                createdAt TEXT NOT NULL
            );",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        password_hash: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        name: row.get(1)?,
        status: row.get(2)?,
        project_id: row.get(3)?,
        assigned_to_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project { id: row.get(0)?, name: row.get(1)?, created_at: row.get(2)? })
}

fn map_query(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

impl Store for SqliteStore {
    fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO users (email, firstName, lastName, password, createdAt) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![user.email, user.first_name, user.last_name, user.password_hash, now],
        )?;
        let id = conn.last_insert_rowid();
        debug!(target: "taskboard::storage", "created user id={id}");
        Ok(User {
            id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            created_at: now,
        })
    }

    fn get_user_by_id(&self, id: &str) -> StoreResult<User> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, email, firstName, lastName, password, createdAt FROM users WHERE id = ?1",
            [id],
            row_to_user,
        )
        .map_err(map_query)
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, email, firstName, lastName, password, createdAt FROM users WHERE email = ?1",
            [email],
            row_to_user,
        )
        .map_err(map_query)
    }

    fn create_task(&self, name: &str, status: &str, project_id: i64, assigned_to_id: i64) -> StoreResult<Task> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO tasks (name, status, projectId, assignedToID, createdAt) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![name, status, project_id, assigned_to_id, now],
        )?;
        let id = conn.last_insert_rowid();
        debug!(target: "taskboard::storage", "created task id={id}");
        Ok(Task {
            id,
            name: name.to_string(),
            status: status.to_string(),
            project_id,
            assigned_to_id,
            created_at: now,
        })
    }

    fn get_task(&self, id: &str) -> StoreResult<Task> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, status, projectId, assignedToID, createdAt FROM tasks WHERE id = ?1",
            [id],
            row_to_task,
        )
        .map_err(map_query)
    }

    fn update_task(&self, task: &Task) -> StoreResult<Task> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "UPDATE tasks SET name = ?1, status = ?2, projectId = ?3, assignedToID = ?4 WHERE id = ?5",
            rusqlite::params![task.name, task.status, task.project_id, task.assigned_to_id, task.id],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(task.clone())
    }

    fn delete_task(&self, id: &str) -> StoreResult<()> {
        let conn = self.conn.lock();
        let n = conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(StoreError::NotFound);
        }
        debug!(target: "taskboard::storage", "deleted task id={id}");
        Ok(())
    }

    fn create_project(&self, name: &str) -> StoreResult<Project> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO projects (name, createdAt) VALUES (?1, ?2)",
            rusqlite::params![name, now],
        )?;
        let id = conn.last_insert_rowid();
        debug!(target: "taskboard::storage", "created project id={id}");
        Ok(Project { id, name: name.to_string(), created_at: now })
    }

    fn get_project(&self, id: &str) -> StoreResult<Project> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, createdAt FROM projects WHERE id = ?1",
            [id],
            row_to_project,
        )
        .map_err(map_query)
    }

    fn update_project(&self, project: &Project) -> StoreResult<Project> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "UPDATE projects SET name = ?1 WHERE id = ?2",
            rusqlite::params![project.name, project.id],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(project.clone())
    }

    fn delete_project(&self, id: &str) -> StoreResult<()> {
        let conn = self.conn.lock();
        let n = conn.execute("DELETE FROM projects WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(StoreError::NotFound);
        }
        debug!(target: "taskboard::storage", "deleted project id={id}");
        Ok(())
    }
}
