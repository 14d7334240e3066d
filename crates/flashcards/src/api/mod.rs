//! HTTP API for flashcards.
//!
//! Exposes the flashcard store over JSON endpoints:
//!
//! | Method | Path                      | Purpose                       |
//! |--------|---------------------------|-------------------------------|
//! | GET    | `/flashcards`             | list, filter, paginate, sort  |
//! | POST   | `/flashcards`             | create                        |
//! | GET    | `/flashcards/{id}`        | fetch one                     |
//! | PUT    | `/flashcards/{id}`        | partial update                |
//! | DELETE | `/flashcards/{id}`        | delete                        |
//! | GET    | `/search_flashcards`      | substring search (`?query=`)  |
//! | GET    | `/categories`             | distinct categories           |

pub mod error;
pub mod handlers;

use std::sync::{Arc, Mutex};

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{Config, PaginationConfig};
use crate::error::{Error, Result};
use crate::storage::Storage;

pub use error::ErrorBody;
pub use handlers::{FlashcardResponse, ListParams, MessageResponse, SearchParams};

/// State shared by all request handlers.
///
/// The connection sits behind a mutex, so each request's store access runs
/// to completion before the next one starts.
#[derive(Debug, Clone)]
pub struct AppState {
    storage: Arc<Mutex<Storage>>,
    pagination: PaginationConfig,
}

impl AppState {
    /// Wrap a storage handle for sharing between requests.
    #[must_use]
    pub fn new(storage: Storage, pagination: PaginationConfig) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            pagination,
        }
    }

    /// The pagination limits requests are resolved against.
    #[must_use]
    pub fn pagination(&self) -> PaginationConfig {
        self.pagination
    }

    /// Run `f` with exclusive access to the store.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or [`Error::Internal`] if the lock was
    /// poisoned by a panicking request.
    pub fn with_storage<T>(&self, f: impl FnOnce(&Storage) -> Result<T>) -> Result<T> {
        let storage = self
            .storage
            .lock()
            .map_err(|_| Error::internal("storage lock poisoned"))?;
        f(&storage)
    }
}

/// Build the application router.
pub fn router(state: AppState, cors_enabled: bool) -> Router {
    let app = Router::new()
        .route(
            "/flashcards",
            get(handlers::list_flashcards).post(handlers::create_flashcard),
        )
        .route(
            "/flashcards/{id}",
            get(handlers::get_flashcard)
                .put(handlers::update_flashcard)
                .delete(handlers::delete_flashcard),
        )
        .route("/search_flashcards", get(handlers::search_flashcards))
        .route("/categories", get(handlers::list_categories))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors_enabled {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Open the configured store and serve the API until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the database cannot be opened, the address cannot be
/// bound, or the server fails while running.
pub async fn serve(config: &Config) -> Result<()> {
    let storage = Storage::open(config.database_path())?;
    let state = AppState::new(storage, config.pagination);
    let app = router(state, config.server.cors_enabled);

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Unable to listen for Ctrl-C, serving until killed: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
