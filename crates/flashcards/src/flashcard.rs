//! Core flashcard types.
//!
//! This module defines the flashcard record, the payloads used to create and
//! partially update one, and the parameters that drive listing.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Maximum length of a question, in characters.
pub const MAX_QUESTION_LEN: usize = 200;

/// Maximum length of an answer, in characters.
pub const MAX_ANSWER_LEN: usize = 200;

/// Maximum length of a category, in characters.
pub const MAX_CATEGORY_LEN: usize = 100;

/// A stored flashcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    /// Identifier assigned by the storage layer.
    pub id: i64,

    /// The prompt side of the card.
    pub question: String,

    /// The answer side of the card.
    pub answer: String,

    /// Optional grouping label.
    pub category: Option<String>,

    /// When the card was created.
    pub created_at: DateTime<Utc>,

    /// When the card was last modified.
    pub updated_at: DateTime<Utc>,
}

/// Validated field values for a flashcard, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFields {
    /// The question text (non-blank).
    pub question: String,
    /// The answer text (non-blank).
    pub answer: String,
    /// The category, `None` when absent or blank.
    pub category: Option<String>,
}

/// Request payload for creating a flashcard.
///
/// Every field is optional at the wire level so that a missing field is
/// reported as a validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewFlashcard {
    /// The question text.
    pub question: Option<String>,
    /// The answer text.
    pub answer: Option<String>,
    /// The category.
    pub category: Option<String>,
}

impl NewFlashcard {
    /// Create a payload with a question and answer.
    #[must_use]
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: Some(question.into()),
            answer: Some(answer.into()),
            category: None,
        }
    }

    /// Set the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Check the payload and produce the values to store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the question or answer is missing or
    /// blank, or if any field exceeds its length bound.
    pub fn validate(&self) -> Result<CardFields> {
        let (Some(question), Some(answer)) = (self.question.as_deref(), self.answer.as_deref())
        else {
            return Err(Error::validation("question and answer are required"));
        };

        Ok(CardFields {
            question: required_text("question", question, MAX_QUESTION_LEN)?,
            answer: required_text("answer", answer, MAX_ANSWER_LEN)?,
            category: optional_category(self.category.as_deref())?,
        })
    }
}

/// Request payload for a partial update.
///
/// Fields left out of the request are `None` and keep their stored value.
/// An explicit `null` is distinguished from an absent key and arrives as
/// `Some(None)`: it clears the category and is rejected for question and
/// answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FlashcardUpdate {
    /// New question text; `Some(None)` is invalid.
    #[serde(default, deserialize_with = "present")]
    pub question: Option<Option<String>>,
    /// New answer text; `Some(None)` is invalid.
    #[serde(default, deserialize_with = "present")]
    pub answer: Option<Option<String>>,
    /// New category; `Some(None)` clears it.
    #[serde(default, deserialize_with = "present")]
    pub category: Option<Option<String>>,
}

/// Maps any present value (including `null`) to `Some`, so that an absent
/// key (handled by `#[serde(default)]`) stays `None`.
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl FlashcardUpdate {
    /// Returns `true` if the update would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.question.is_none() && self.answer.is_none() && self.category.is_none()
    }

    /// Apply the update to a card in place.
    ///
    /// The card is left untouched if validation fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if question or answer is null or blank,
    /// or if a provided field is too long.
    pub fn apply_to(&self, card: &mut Flashcard) -> Result<()> {
        let question = self
            .question
            .as_ref()
            .map(|q| required_update("question", q.as_deref(), MAX_QUESTION_LEN))
            .transpose()?;
        let answer = self
            .answer
            .as_ref()
            .map(|a| required_update("answer", a.as_deref(), MAX_ANSWER_LEN))
            .transpose()?;
        let category = self
            .category
            .as_ref()
            .map(|c| optional_category(c.as_deref()))
            .transpose()?;

        if let Some(question) = question {
            card.question = question;
        }
        if let Some(answer) = answer {
            card.answer = answer;
        }
        if let Some(category) = category {
            card.category = category;
        }
        Ok(())
    }
}

fn required_text(field: &str, value: &str, max_len: usize) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{field} must not be empty")));
    }
    check_len(field, value, max_len)?;
    Ok(value.to_string())
}

fn required_update(field: &str, value: Option<&str>, max_len: usize) -> Result<String> {
    let value = value.ok_or_else(|| Error::validation(format!("{field} must not be null")))?;
    required_text(field, value, max_len)
}

fn optional_category(value: Option<&str>) -> Result<Option<String>> {
    match value {
        Some(category) if !category.trim().is_empty() => {
            check_len("category", category, MAX_CATEGORY_LEN)?;
            Ok(Some(category.to_string()))
        }
        _ => Ok(None),
    }
}

fn check_len(field: &str, value: &str, max_len: usize) -> Result<()> {
    if value.chars().count() > max_len {
        return Err(Error::validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(())
}

/// Columns a listing may be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Sort by identifier (insertion order).
    #[default]
    Id,
    /// Sort by question text.
    Question,
    /// Sort by category.
    Category,
}

impl SortField {
    /// The column this field sorts on.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Question => "question",
            Self::Category => "category",
        }
    }
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "id" => Ok(Self::Id),
            "question" => Ok(Self::Question),
            "category" => Ok(Self::Category),
            other => Err(Error::validation(format!("unsupported sort field: {other}"))),
        }
    }
}

/// Direction of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    /// The SQL keyword for this direction.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(Error::validation(format!("unsupported sort order: {s}")))
        }
    }
}

/// Parameters for listing flashcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Only return cards whose category equals this value.
    pub category: Option<String>,
    /// 1-based page number.
    pub page: u32,
    /// Records per page.
    pub per_page: u32,
    /// Sort column.
    pub sort_by: SortField,
    /// Sort direction.
    pub order: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            category: None,
            page: 1,
            per_page: 10,
            sort_by: SortField::Id,
            order: SortOrder::Asc,
        }
    }
}

impl ListQuery {
    /// Number of records to skip for the current page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.per_page)
    }
}

/// One page of a flashcard listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardPage {
    /// The cards on this page.
    pub flashcards: Vec<Flashcard>,
    /// Number of cards matching the filter, across all pages.
    pub total: u64,
    /// Number of pages at the current page size.
    pub pages: u64,
    /// The page number returned.
    pub page: u32,
    /// The page size used.
    pub per_page: u32,
}

impl FlashcardPage {
    /// Number of pages needed to show `total` records `per_page` at a time.
    #[must_use]
    pub fn page_count(total: u64, per_page: u32) -> u64 {
        if per_page == 0 {
            0
        } else {
            total.div_ceil(u64::from(per_page))
        }
    }
}
