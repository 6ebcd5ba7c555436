//! Error types for the tracker client.
//!
//! # Design
//! Every failure the core can report lives in one enum. `Validation` covers
//! both structural mismatches and messages the service reported in an
//! `errors > error` body; the remaining variants are raised locally, before
//! or after the round trip.

use thiserror::Error;

use crate::story::StoryState;

/// Errors returned by the mapper, the validator and every client operation.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// The response did not have the expected shape, or the service sent an
    /// error message instead of the requested resource.
    #[error("{0}")]
    Validation(String),

    /// A leaf tagged with a type hint could not be coerced.
    #[error("invalid {hint} value: {value:?}")]
    Parse { hint: &'static str, value: String },

    /// The requested lifecycle state is not one of the known six.
    #[error("invalid state: {state}. valid states are: {}", StoryState::names().join(", "))]
    InvalidState { state: String },

    /// The referenced resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The transport could not complete the round trip.
    #[error("transport failed: {0}")]
    Transport(String),

    /// A typed projection or request needed a field the record lacks.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A request body could not be written.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
