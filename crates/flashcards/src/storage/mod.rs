//! Storage layer for flashcards.
//!
//! This module provides `SQLite`-based persistent storage for flashcards,
//! including filtered and paginated listing, substring search and partial
//! updates.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::flashcard::{Flashcard, FlashcardPage, FlashcardUpdate, ListQuery, NewFlashcard, SortField};

use self::schema::FLASHCARD_COLUMNS;

/// Storage engine for flashcards.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Validated inserts and partial updates
/// - Category filtering, sorting and pagination
/// - Case-insensitive substring search over questions and answers
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes or migrates the schema as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate and insert a new flashcard.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the payload is invalid, or a database
    /// error if the insert fails. Nothing is written on validation failure.
    pub fn insert(&self, new: &NewFlashcard) -> Result<Flashcard> {
        let fields = new.validate()?;
        let now = Utc::now();
        let stamp = now.to_rfc3339();

        self.conn.execute(
            r"
            INSERT INTO flashcards (question, answer, category, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ",
            params![fields.question, fields.answer, fields.category, stamp],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted flashcard with id {}", id);

        Ok(Flashcard {
            id,
            question: fields.question,
            answer: fields.answer,
            category: fields.category,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a flashcard by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<Flashcard>> {
        let sql = format!("SELECT {FLASHCARD_COLUMNS} FROM flashcards WHERE id = ?1");
        let result = self
            .conn
            .query_row(&sql, [id], Self::row_to_flashcard)
            .optional()?;
        Ok(result)
    }

    /// List one page of flashcards.
    ///
    /// Non-unique sort columns are tie-broken by id so that page boundaries
    /// are stable.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list(&self, query: &ListQuery) -> Result<FlashcardPage> {
        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM flashcards WHERE (?1 IS NULL OR category = ?1)",
            [&query.category],
            |row| row.get(0),
        )?;
        let total = u64::try_from(total).unwrap_or(0);

        let tiebreak = if query.sort_by == SortField::Id {
            ""
        } else {
            ", id ASC"
        };
        let sql = format!(
            r"
            SELECT {FLASHCARD_COLUMNS} FROM flashcards
            WHERE (?1 IS NULL OR category = ?1)
            ORDER BY {} {}{tiebreak}
            LIMIT ?2 OFFSET ?3
            ",
            query.sort_by.column(),
            query.order.keyword(),
        );

        let limit = i64::from(query.per_page);
        let offset = i64::try_from(query.offset()).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&sql)?;
        let flashcards = stmt
            .query_map(
                params![query.category, limit, offset],
                Self::row_to_flashcard,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(
            "Listed {} of {} flashcards (page {}, per_page {})",
            flashcards.len(),
            total,
            query.page,
            query.per_page
        );

        Ok(FlashcardPage {
            flashcards,
            total,
            pages: FlashcardPage::page_count(total, query.per_page),
            page: query.page,
            per_page: query.per_page,
        })
    }

    /// Apply a partial update to a flashcard and return the stored result.
    ///
    /// The read and the write happen in one transaction. An empty update
    /// returns the card unchanged without touching `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no card has this id, [`Error::Validation`]
    /// if the update would break a field constraint, or a database error.
    pub fn update(&self, id: i64, update: &FlashcardUpdate) -> Result<Flashcard> {
        let tx = self.conn.unchecked_transaction()?;

        let sql = format!("SELECT {FLASHCARD_COLUMNS} FROM flashcards WHERE id = ?1");
        let mut card = tx
            .query_row(&sql, [id], Self::row_to_flashcard)
            .optional()?
            .ok_or_else(|| Error::not_found(id))?;

        if update.is_empty() {
            return Ok(card);
        }

        update.apply_to(&mut card)?;
        card.updated_at = Utc::now();

        tx.execute(
            r"
            UPDATE flashcards
            SET question = ?1, answer = ?2, category = ?3, updated_at = ?4
            WHERE id = ?5
            ",
            params![
                card.question,
                card.answer,
                card.category,
                card.updated_at.to_rfc3339(),
                id
            ],
        )?;
        tx.commit()?;

        debug!("Updated flashcard {}", id);
        Ok(card)
    }

    /// Delete a flashcard by ID.
    ///
    /// Returns `true` if a flashcard was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM flashcards WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    /// Search flashcards by question or answer.
    ///
    /// Performs a case-insensitive substring search. `%` and `_` in the query
    /// are matched literally; an empty query matches everything.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn search(&self, query: &str) -> Result<Vec<Flashcard>> {
        let pattern = format!("%{}%", escape_like(query));
        let sql = format!(
            r"
            SELECT {FLASHCARD_COLUMNS} FROM flashcards
            WHERE question LIKE ?1 ESCAPE '\' OR answer LIKE ?1 ESCAPE '\'
            ORDER BY id ASC
            "
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let flashcards = stmt
            .query_map([pattern], Self::row_to_flashcard)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!("Search {:?} matched {} flashcards", query, flashcards.len());
        Ok(flashcards)
    }

    /// Count total flashcards in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM flashcards", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Distinct categories in use, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn categories(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT DISTINCT category FROM flashcards
            WHERE category IS NOT NULL
            ORDER BY category ASC
            ",
        )?;
        let categories = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(categories)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_flashcards = self.count()?;
        let categories = self.categories()?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_flashcards,
            categories,
            db_size_bytes,
        })
    }

    /// Convert a database row to a Flashcard struct.
    fn row_to_flashcard(row: &rusqlite::Row) -> rusqlite::Result<Flashcard> {
        let id: i64 = row.get(0)?;
        let created_at: String = row.get(4)?;
        let updated_at: String = row.get(5)?;

        Ok(Flashcard {
            id,
            question: row.get(1)?,
            answer: row.get(2)?,
            category: row.get(3)?,
            created_at: parse_timestamp(id, &created_at),
            updated_at: parse_timestamp(id, &updated_at),
        })
    }
}

fn parse_timestamp(id: i64, value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).map_or_else(
        |_| {
            warn!("Flashcard {} has unreadable timestamp {:?}", id, value);
            DateTime::<Utc>::UNIX_EPOCH
        },
        |dt| dt.with_timezone(&Utc),
    )
}

/// Escape `LIKE` wildcards so the query matches literally (escape char `\`).
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of flashcards stored.
    pub total_flashcards: i64,
    /// Distinct categories in use.
    pub categories: Vec<String>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flashcard::SortOrder;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn add(storage: &Storage, question: &str, answer: &str, category: Option<&str>) -> Flashcard {
        let mut new = NewFlashcard::new(question, answer);
        if let Some(category) = category {
            new = new.with_category(category);
        }
        storage.insert(&new).unwrap()
    }

    fn questions(page: &FlashcardPage) -> Vec<&str> {
        page.flashcards.iter().map(|c| c.question.as_str()).collect()
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_insert_and_get() {
        let storage = create_test_storage();
        let card = add(&storage, "Q", "A", Some("C"));

        let retrieved = storage.get(card.id).unwrap().unwrap();
        assert_eq!(retrieved.question, "Q");
        assert_eq!(retrieved.answer, "A");
        assert_eq!(retrieved.category, Some("C".to_string()));
        assert_eq!(retrieved, card);
    }

    #[test]
    fn test_insert_assigns_distinct_ids() {
        let storage = create_test_storage();
        let first = add(&storage, "One", "1", None);
        let second = add(&storage, "Two", "2", None);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_insert_invalid_writes_nothing() {
        let storage = create_test_storage();

        let err = storage.insert(&NewFlashcard::new("", "A")).unwrap_err();
        assert!(err.is_validation());
        let err = storage.insert(&NewFlashcard::new("Q", "")).unwrap_err();
        assert!(err.is_validation());

        assert_eq!(storage.count().unwrap(), 0);
    }

    #[test]
    fn test_get_nonexistent() {
        let storage = create_test_storage();
        assert!(storage.get(99999).unwrap().is_none());
    }

    #[test]
    fn test_list_second_page() {
        let storage = create_test_storage();
        for i in 1..=5 {
            add(&storage, &format!("Q{i}"), &format!("A{i}"), None);
        }

        let page = storage
            .list(&ListQuery {
                page: 2,
                per_page: 2,
                ..ListQuery::default()
            })
            .unwrap();

        assert_eq!(questions(&page), vec!["Q3", "Q4"]);
        assert_eq!(page.total, 5);
        assert_eq!(page.pages, 3);
        assert_eq!(page.page, 2);
    }

    #[test]
    fn test_list_past_last_page() {
        let storage = create_test_storage();
        add(&storage, "Only", "1", None);

        let page = storage
            .list(&ListQuery {
                page: 9,
                ..ListQuery::default()
            })
            .unwrap();
        assert!(page.flashcards.is_empty());
        assert_eq!(page.total, 1);
        assert_eq!(page.pages, 1);
    }

    #[test]
    fn test_list_empty() {
        let storage = create_test_storage();
        let page = storage.list(&ListQuery::default()).unwrap();
        assert!(page.flashcards.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.pages, 0);
    }

    #[test]
    fn test_list_filters_by_category() {
        let storage = create_test_storage();
        add(&storage, "Paris?", "France", Some("Geography"));
        add(&storage, "1066?", "Hastings", Some("History"));
        add(&storage, "Rome?", "Italy", Some("Geography"));
        add(&storage, "Loose", "card", None);

        let page = storage
            .list(&ListQuery {
                category: Some("Geography".to_string()),
                ..ListQuery::default()
            })
            .unwrap();
        assert_eq!(questions(&page), vec!["Paris?", "Rome?"]);
        assert_eq!(page.total, 2);

        let page = storage
            .list(&ListQuery {
                category: Some("geography".to_string()),
                ..ListQuery::default()
            })
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_list_sorted_by_question_desc() {
        let storage = create_test_storage();
        add(&storage, "banana", "1", None);
        add(&storage, "cherry", "2", None);
        add(&storage, "apple", "3", None);

        let page = storage
            .list(&ListQuery {
                sort_by: SortField::Question,
                order: SortOrder::Desc,
                ..ListQuery::default()
            })
            .unwrap();
        assert_eq!(questions(&page), vec!["cherry", "banana", "apple"]);
    }

    #[test]
    fn test_list_sorted_by_category_breaks_ties_by_id() {
        let storage = create_test_storage();
        add(&storage, "first", "1", Some("b"));
        add(&storage, "second", "2", Some("a"));
        add(&storage, "third", "3", Some("b"));
        add(&storage, "fourth", "4", Some("a"));

        let page = storage
            .list(&ListQuery {
                sort_by: SortField::Category,
                ..ListQuery::default()
            })
            .unwrap();
        assert_eq!(questions(&page), vec!["second", "fourth", "first", "third"]);
    }

    #[test]
    fn test_list_by_id_desc() {
        let storage = create_test_storage();
        for i in 1..=3 {
            add(&storage, &format!("Q{i}"), "A", None);
        }
        let page = storage
            .list(&ListQuery {
                order: SortOrder::Desc,
                ..ListQuery::default()
            })
            .unwrap();
        assert_eq!(questions(&page), vec!["Q3", "Q2", "Q1"]);
    }

    #[test]
    fn test_update_partial() {
        let storage = create_test_storage();
        let card = add(&storage, "Q", "A", Some("C"));

        let update = FlashcardUpdate {
            answer: Some(Some("B".to_string())),
            ..FlashcardUpdate::default()
        };
        let updated = storage.update(card.id, &update).unwrap();
        assert_eq!(updated.answer, "B");

        let stored = storage.get(card.id).unwrap().unwrap();
        assert_eq!(stored.question, "Q");
        assert_eq!(stored.answer, "B");
        assert_eq!(stored.category, Some("C".to_string()));
        assert_eq!(stored.created_at, card.created_at);
        assert!(stored.updated_at >= card.updated_at);
    }

    #[test]
    fn test_update_nonexistent() {
        let storage = create_test_storage();
        let update = FlashcardUpdate {
            answer: Some(Some("B".to_string())),
            ..FlashcardUpdate::default()
        };
        let err = storage.update(404, &update).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_invalid_leaves_row_untouched() {
        let storage = create_test_storage();
        let card = add(&storage, "Q", "A", None);

        let update = FlashcardUpdate {
            question: Some(Some("  ".to_string())),
            ..FlashcardUpdate::default()
        };
        assert!(storage.update(card.id, &update).unwrap_err().is_validation());
        assert_eq!(storage.get(card.id).unwrap().unwrap(), card);
    }

    #[test]
    fn test_update_empty_is_noop() {
        let storage = create_test_storage();
        let card = add(&storage, "Q", "A", None);

        let updated = storage.update(card.id, &FlashcardUpdate::default()).unwrap();
        assert_eq!(updated, card);
    }

    #[test]
    fn test_update_clears_category() {
        let storage = create_test_storage();
        let card = add(&storage, "Q", "A", Some("C"));

        let update = FlashcardUpdate {
            category: Some(None),
            ..FlashcardUpdate::default()
        };
        storage.update(card.id, &update).unwrap();
        assert!(storage.get(card.id).unwrap().unwrap().category.is_none());
    }

    #[test]
    fn test_delete() {
        let storage = create_test_storage();
        let card = add(&storage, "To delete", "A", None);

        assert!(storage.delete(card.id).unwrap());
        assert!(storage.get(card.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_nonexistent() {
        let storage = create_test_storage();
        add(&storage, "Keep", "me", None);

        assert!(!storage.delete(99999).unwrap());
        assert_eq!(storage.count().unwrap(), 1);
    }

    #[test]
    fn test_search_case_insensitive() {
        let storage = create_test_storage();
        add(&storage, "Capital of France is Paris", "yes", None);
        add(&storage, "Capital of Spain", "Madrid", None);

        let results = storage.search("paris").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].question, "Capital of France is Paris");
    }

    #[test]
    fn test_search_matches_answer() {
        let storage = create_test_storage();
        add(&storage, "Capital of Spain", "Madrid", None);
        add(&storage, "Capital of Italy", "Rome", None);

        let results = storage.search("MADRID").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].answer, "Madrid");

        let results = storage.search("capital").unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_search_is_not_paginated() {
        let storage = create_test_storage();
        for i in 0..25 {
            add(&storage, &format!("Question {i}"), "A", None);
        }
        assert_eq!(storage.search("question").unwrap().len(), 25);
    }

    #[test]
    fn test_search_wildcards_are_literal() {
        let storage = create_test_storage();
        add(&storage, "100% sure", "A", None);
        add(&storage, "snake_case", "B", None);
        add(&storage, "plain", "C", None);

        assert_eq!(storage.search("%").unwrap().len(), 1);
        assert_eq!(storage.search("_").unwrap().len(), 1);
        assert_eq!(storage.search("e_c").unwrap()[0].question, "snake_case");
    }

    #[test]
    fn test_search_empty_query() {
        let storage = create_test_storage();
        add(&storage, "Test content", "A", None);

        let results = storage.search("").unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_categories() {
        let storage = create_test_storage();
        add(&storage, "1", "A", Some("b"));
        add(&storage, "2", "A", Some("a"));
        add(&storage, "3", "A", Some("b"));
        add(&storage, "4", "A", None);

        assert_eq!(storage.categories().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_stats() {
        let storage = create_test_storage();
        add(&storage, "First", "A", Some("x"));
        add(&storage, "Second", "B", None);

        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_flashcards, 2);
        assert_eq!(stats.categories, vec!["x"]);
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_unicode_content() {
        let storage = create_test_storage();
        let card = add(&storage, "Hello 世界 🌍", "مرحبا", None);

        let retrieved = storage.get(card.id).unwrap().unwrap();
        assert_eq!(retrieved.question, "Hello 世界 🌍");
        assert_eq!(retrieved.answer, "مرحبا");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_path() {
        let storage = create_test_storage();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_open_file_based_persists() {
        let temp_dir = std::env::temp_dir();
        let db_path = temp_dir.join(format!("flashcards_test_{}.db", std::process::id()));

        let storage = Storage::open(&db_path).unwrap();
        let card = add(&storage, "Persisted", "yes", None);
        assert_eq!(storage.path(), db_path);
        drop(storage);

        let reopened = Storage::open(&db_path).unwrap();
        assert_eq!(reopened.get(card.id).unwrap().unwrap().question, "Persisted");
        assert!(reopened.stats().unwrap().db_size_bytes > 0);

        drop(reopened);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let temp_dir = std::env::temp_dir();
        let root = temp_dir.join(format!("flashcards_test_{}", std::process::id()));
        let nested_path = root.join("nested/db.sqlite");
        let _ = std::fs::remove_dir_all(&root);

        let storage = Storage::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(storage);
        let _ = std::fs::remove_dir_all(&root);
    }
}
