//! Core type definitions for lectern.
//!
//! This crate defines the small, domain-agnostic types every other crate
//! agrees on:
//! - Entity identifiers (UUID v7) and their file-name form
//! - Case-insensitive tags
//!
//! Domain records (songs, bibles, ...) live in `lectern-model`.

mod ids;
mod tag;

pub use ids::EntityId;
pub use tag::Tag;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),
}
