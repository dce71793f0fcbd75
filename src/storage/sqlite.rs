//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the [`Client`] trait.

use crate::storage::schema::initialize_schema;
use crate::storage::{Client, Host, Image, StorageError, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
///
/// The connection sits behind a mutex so the client can be shared between the
/// crawl loop and whatever else holds it.
pub struct SqliteClient {
    conn: Mutex<Connection>,
}

impl SqliteClient {
    /// Opens (or creates) the database file
    ///
    /// The schema is not touched until [`Client::test`] is called.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteClient)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Gets total host count
    pub fn count_hosts(&self) -> StorageResult<u64> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM hosts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Gets total image count
    pub fn count_images(&self) -> StorageResult<u64> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Loads the most recently inspected hosts, newest first
    pub fn recent_hosts(&self, limit: usize) -> StorageResult<Vec<Host>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT title, addr, contents, keywords FROM hosts ORDER BY id DESC LIMIT ?1",
        )?;

        let hosts = stmt
            .query_map(params![limit as i64], |row| {
                Ok(Host {
                    title: row.get(0)?,
                    addr: row.get(1)?,
                    contents: row.get(2)?,
                    keywords: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(hosts)
    }

    /// Loads every image found on the given page
    pub fn images_for(&self, addr: &str) -> StorageResult<Vec<Image>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT src, dsc, addr FROM images WHERE addr = ?1 ORDER BY id")?;

        let images = stmt
            .query_map(params![addr], |row| {
                Ok(Image {
                    src: row.get(0)?,
                    dsc: row.get(1)?,
                    addr: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(images)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl Client for SqliteClient {
    fn test(&self) -> StorageResult<()> {
        let conn = self.lock()?;
        initialize_schema(&conn)?;
        Ok(())
    }

    fn push(&self, host: &Host) -> StorageResult<()> {
        self.lock()?.execute(
            "INSERT INTO hosts (title, addr, contents, keywords, inspected_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                host.title,
                host.addr,
                host.contents,
                host.keywords,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn push_img(&self, image: &Image) -> StorageResult<()> {
        self.lock()?.execute(
            "INSERT INTO images (src, dsc, addr) VALUES (?1, ?2, ?3)",
            params![image.src, image.dsc, image.addr],
        )?;
        Ok(())
    }
}
