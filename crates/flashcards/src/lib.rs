//! `flashcards` - A flashcard management HTTP API
//!
//! This library provides the storage, validation and HTTP layers for a small
//! service that creates, lists, searches, updates and deletes question/answer
//! flashcards kept in a `SQLite` database.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod flashcard;
pub mod logging;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use flashcard::{Flashcard, FlashcardPage, FlashcardUpdate, ListQuery, NewFlashcard};
pub use logging::init_logging;
pub use storage::{Storage, StorageStats};
