//! Request handlers for the flashcard endpoints.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::config::PaginationConfig;
use crate::error::Result;
use crate::flashcard::{
    Flashcard, FlashcardPage, FlashcardUpdate, ListQuery, NewFlashcard, SortField, SortOrder,
};

use super::AppState;

/// Query string accepted by `GET /flashcards`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListParams {
    /// Exact-match category filter.
    pub category: Option<String>,
    /// 1-based page number.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page: Option<i64>,
    /// Page size.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub per_page: Option<i64>,
    /// Sort column: `id`, `question` or `category`.
    pub sort_by: Option<String>,
    /// Sort direction: `asc` or `desc`.
    pub order: Option<String>,
}

/// Treats an empty numeric parameter (`?page=`) as absent.
fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("cannot parse {raw:?}: {e}"))),
        _ => Ok(None),
    }
}

impl ListParams {
    /// Resolve the raw parameters against the configured limits.
    ///
    /// Out-of-range pages are clamped, and unsupported sort fields or orders
    /// fall back to the defaults.
    #[must_use]
    pub fn into_query(self, limits: PaginationConfig) -> ListQuery {
        let page = match self.page {
            Some(page) if page >= 1 => u32::try_from(page).unwrap_or(u32::MAX),
            _ => 1,
        };
        let per_page = match self.per_page {
            Some(n) if n >= 1 => u32::try_from(n)
                .unwrap_or(u32::MAX)
                .min(limits.max_per_page),
            _ => limits.default_per_page,
        };

        let sort_by = self.sort_by.as_deref().map_or_else(SortField::default, |raw| {
            raw.parse().unwrap_or_else(|_| {
                debug!("Ignoring unsupported sort field {:?}", raw);
                SortField::default()
            })
        });
        let order = self.order.as_deref().map_or_else(SortOrder::default, |raw| {
            raw.parse().unwrap_or_else(|_| {
                debug!("Ignoring unsupported sort order {:?}", raw);
                SortOrder::default()
            })
        });

        ListQuery {
            category: self.category.filter(|c| !c.is_empty()),
            page,
            per_page,
            sort_by,
            order,
        }
    }
}

/// Query string accepted by `GET /search_flashcards`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchParams {
    /// Substring to look for.
    #[serde(default)]
    pub query: String,
}

/// Confirmation plus the affected record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardResponse {
    /// Confirmation text.
    pub message: String,
    /// The record as stored.
    pub flashcard: Flashcard,
}

/// Confirmation only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Confirmation text.
    pub message: String,
}

/// `GET /flashcards`
pub async fn list_flashcards(
    State(state): State<AppState>,
    params: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<FlashcardPage>> {
    let Query(params) = params?;
    let query = params.into_query(state.pagination());
    let page = state.with_storage(|storage| storage.list(&query))?;
    Ok(Json(page))
}

/// `POST /flashcards`
pub async fn create_flashcard(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewFlashcard>, JsonRejection>,
) -> Result<(StatusCode, Json<FlashcardResponse>)> {
    let Json(new) = payload?;
    let flashcard = state.with_storage(|storage| storage.insert(&new))?;
    info!("Created flashcard {}", flashcard.id);

    Ok((
        StatusCode::CREATED,
        Json(FlashcardResponse {
            message: "Flashcard added successfully!".to_string(),
            flashcard,
        }),
    ))
}

/// `GET /flashcards/{id}`
pub async fn get_flashcard(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Flashcard>> {
    let Path(id) = id?;
    let flashcard = state
        .with_storage(|storage| storage.get(id))?
        .ok_or_else(|| crate::Error::not_found(id))?;
    Ok(Json(flashcard))
}

/// `PUT /flashcards/{id}`
pub async fn update_flashcard(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<FlashcardUpdate>, JsonRejection>,
) -> Result<Json<FlashcardResponse>> {
    let Path(id) = id?;
    let Json(update) = payload?;
    let flashcard = state.with_storage(|storage| storage.update(id, &update))?;
    info!("Updated flashcard {}", id);

    Ok(Json(FlashcardResponse {
        message: "Flashcard updated successfully!".to_string(),
        flashcard,
    }))
}

/// `DELETE /flashcards/{id}`
pub async fn delete_flashcard(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>> {
    let Path(id) = id?;
    if !state.with_storage(|storage| storage.delete(id))? {
        return Err(crate::Error::not_found(id));
    }
    info!("Deleted flashcard {}", id);

    Ok(Json(MessageResponse {
        message: "Flashcard deleted successfully!".to_string(),
    }))
}

/// `GET /search_flashcards?query=`
pub async fn search_flashcards(
    State(state): State<AppState>,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<Flashcard>>> {
    let Query(params) = params?;
    let matches = state.with_storage(|storage| storage.search(&params.query))?;
    Ok(Json(matches))
}

/// `GET /categories`
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let categories = state.with_storage(crate::storage::Storage::categories)?;
    Ok(Json(categories))
}
