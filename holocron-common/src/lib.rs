//! Common types and utilities shared across Holocron crates.
//!
//! This crate defines the row types every stage passes around, the shared error
//! taxonomy, and the observability helpers used by the binary and integration tests.
//! It stays dependency-light so the HTTP, store and app crates can all depend on it.
//!
//! # Overview
//!
//! - [`records`]: post/comment rows and the [`Batch`] produced by one fetch
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`HolocronError`] and [`Result`]: shared error handling
//!
//! # Examples
//!
//! ```rust
//! use holocron_common::{HolocronError, PostRecord};
//!
//! let post = PostRecord::new("123", "Andor");
//! assert_eq!(post.shares, 0);
//!
//! let err = HolocronError::Configuration("api_key missing".into());
//! assert_eq!(err.to_string(), "Configuration error: api_key missing");
//! ```

pub mod observability;
pub mod records;

pub use records::{Batch, CommentRecord, PostRecord};

/// Error types used across the Holocron system.
#[derive(thiserror::Error, Debug)]
pub enum HolocronError {
    /// The credential file or settings were missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request never produced a response (DNS, connect, reset, body read).
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP status error {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Reading or writing a store file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A store file could not be parsed or serialized as CSV.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Convenient alias for results that use [`HolocronError`].
pub type Result<T> = std::result::Result<T, HolocronError>;
