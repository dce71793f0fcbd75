//! Database schema definitions
//!
//! Column widths mirror the bounds the inspector trims to.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Inspected hosts
CREATE TABLE IF NOT EXISTS hosts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title VARCHAR(120) NOT NULL,
    addr VARCHAR(120) NOT NULL,
    contents VARCHAR(65535) NOT NULL,
    keywords VARCHAR(255) NOT NULL,
    inspected_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_hosts_addr ON hosts(addr);

-- Images found on inspected hosts
CREATE TABLE IF NOT EXISTS images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    src VARCHAR(255) NOT NULL,
    dsc VARCHAR(128) NOT NULL,
    addr VARCHAR(120) NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_images_addr ON images(addr);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
