//! Centralized error handling with typed error enums.
//!
//! Errors are designed to:
//! - Provide detailed context via Debug for logging (`{:?}`)
//! - Provide user-friendly messages via Display for API responses (`{}`)
//! - Enable pattern matching for programmatic handling (the insertion path
//!   matches on `IndexError::DuplicateDoc` to regenerate an ID)
//!
//! # Error Hierarchy
//!
//! ```text
//! EngineError (top-level)
//! ├── Query(QueryError)  - Query validation
//! ├── Index(IndexError)  - Lexicon, forward index, and barrel operations
//! └── Store(StoreError)  - Document store access
//! ```
//!
//! I/O failures propagate through the `anyhow` alias with call-site context;
//! a write that fails must never leave barrels and barrel metadata mutually
//! inconsistent, so writers order data files before metadata files.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::DocId;

/// A specialized Result type for engine operations.
///
/// This is an alias for `anyhow::Result` with context added via `.context()`
/// and `.with_context()` throughout the codebase.
pub type Result<T> = anyhow::Result<T>;

/// Primary error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Query validation errors
    #[error("{0}")]
    Query(#[from] QueryError),

    /// Index container errors (lexicon, forward index, barrels)
    #[error("{0}")]
    Index(#[from] IndexError),

    /// Document store access errors
    #[error("{0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Get optional help text for this error.
    pub fn help(&self) -> Option<&'static str> {
        match self {
            Self::Query(e) => e.help(),
            Self::Index(e) => e.help(),
            Self::Store(e) => e.help(),
        }
    }

    /// Get a user-friendly message with optional help text appended.
    pub fn user_message(&self) -> String {
        match self.help() {
            Some(help) => format!("{}\n\n{}", self, help),
            None => self.to_string(),
        }
    }
}

/// Errors raised while validating a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The query string is empty after trimming.
    #[error("empty query")]
    EmptyQuery,
}

impl QueryError {
    /// Get help text for this error.
    pub fn help(&self) -> Option<&'static str> {
        match self {
            Self::EmptyQuery => Some("Provide at least one search term."),
        }
    }
}

/// Errors raised by the index containers.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A serialized container failed to parse. The operation fails without
    /// partially ingesting the file.
    #[error("corrupt container at {path}: {reason}")]
    CorruptContainer { path: PathBuf, reason: String },

    /// Barrel metadata names a barrel whose file is absent.
    #[error("barrel {barrel_id} referenced by metadata is missing")]
    MissingBarrel { barrel_id: u32 },

    /// The forward index already holds an entry for this document.
    #[error("document '{doc_id}' is already indexed")]
    DuplicateDoc { doc_id: DocId },
}

impl IndexError {
    /// Get help text for this error.
    pub fn help(&self) -> Option<&'static str> {
        match self {
            Self::CorruptContainer { .. } => {
                Some("The on-disk index is damaged. Rebuild it from the corpus CSV.")
            }
            Self::MissingBarrel { .. } => Some(
                "Barrel metadata is ahead of the barrel files. Rebuild the inverted index\n\
                 from the forward index to re-derive authoritative barrel content.",
            ),
            Self::DuplicateDoc { .. } => {
                Some("Document IDs must be unique. Retry with a fresh ID.")
            }
        }
    }
}

/// Errors raised by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A fetch or append was attempted without an open corpus handle.
    /// Programmer error; fail fast.
    #[error("document store is not open")]
    NotOpen,
}

impl StoreError {
    /// Get help text for this error.
    pub fn help(&self) -> Option<&'static str> {
        match self {
            Self::NotOpen => Some("Call DocumentStore::open() before fetching or appending records."),
        }
    }
}
