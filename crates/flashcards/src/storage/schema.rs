//! `SQLite` schema definitions for flashcards.
//!
//! The `flashcards` table is built up by the versioned migrations in
//! [`super::migrations`]; only the metadata table is created unconditionally.

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Version 1: question/answer cards.
pub const CREATE_FLASHCARDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS flashcards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    question TEXT NOT NULL,
    answer TEXT NOT NULL
)
";

/// Version 2: optional category column.
pub const ADD_CATEGORY_COLUMN: &str = r"
ALTER TABLE flashcards ADD COLUMN category TEXT
";

/// Version 2: index on `category` for filtered listings.
pub const CREATE_CATEGORY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_flashcards_category ON flashcards(category)
";

/// Version 3: creation timestamp.
pub const ADD_CREATED_AT_COLUMN: &str = r"
ALTER TABLE flashcards ADD COLUMN created_at TEXT NOT NULL DEFAULT ''
";

/// Version 3: modification timestamp.
pub const ADD_UPDATED_AT_COLUMN: &str = r"
ALTER TABLE flashcards ADD COLUMN updated_at TEXT NOT NULL DEFAULT ''
";

/// Statements that are safe to run on every open.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_METADATA_TABLE];

/// Columns selected when reading a flashcard row, in `row_to_flashcard` order.
pub const FLASHCARD_COLUMNS: &str = "id, question, answer, category, created_at, updated_at";
