//! Database migration system for flashcards.
//!
//! This module handles database schema versioning and migrations. Each
//! migration runs in its own transaction and records the version it reached.

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::schema::{
    ADD_CATEGORY_COLUMN, ADD_CREATED_AT_COLUMN, ADD_UPDATED_AT_COLUMN, CREATE_CATEGORY_INDEX,
    CREATE_FLASHCARDS_TABLE, SCHEMA_STATEMENTS,
};

/// The current schema version.
pub const CURRENT_VERSION: i32 = 3;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Initialize the database schema.
///
/// Creates the metadata table if it doesn't exist, then runs any pending
/// migrations to bring the schema up to the current version.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = get_schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }
    if version < CURRENT_VERSION {
        run_migrations(conn, version)?;
    }

    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run migrations from the given version to the current version.
fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    let mut current = from_version;

    while current < CURRENT_VERSION {
        current += 1;
        let tx = conn.unchecked_transaction()?;
        run_migration(&tx, current)?;
        set_schema_version(&tx, current)?;
        tx.commit()?;
        debug!("Applied schema migration {}", current);
    }

    info!("Database schema at version {}", CURRENT_VERSION);
    Ok(())
}

/// Run a specific migration version.
fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        2 => migrate_v2(conn),
        3 => migrate_v3(conn),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

/// Migration to version 1: the question/answer table.
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_FLASHCARDS_TABLE, [])?;
    Ok(())
}

/// Migration to version 2: categories.
fn migrate_v2(conn: &Connection) -> Result<()> {
    if !column_exists(conn, "flashcards", "category")? {
        conn.execute(ADD_CATEGORY_COLUMN, [])?;
    }
    conn.execute(CREATE_CATEGORY_INDEX, [])?;
    Ok(())
}

/// Migration to version 3: timestamps.
///
/// Existing rows are stamped with the migration time.
fn migrate_v3(conn: &Connection) -> Result<()> {
    if !column_exists(conn, "flashcards", "created_at")? {
        conn.execute(ADD_CREATED_AT_COLUMN, [])?;
    }
    if !column_exists(conn, "flashcards", "updated_at")? {
        conn.execute(ADD_UPDATED_AT_COLUMN, [])?;
    }

    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE flashcards SET created_at = ?1 WHERE created_at = ''",
        [&now],
    )?;
    conn.execute(
        "UPDATE flashcards SET updated_at = ?1 WHERE updated_at = ''",
        [&now],
    )?;
    Ok(())
}

/// Check whether `table` has a column called `column`.
fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        [table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
