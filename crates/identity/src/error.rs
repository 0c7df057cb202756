//! Error types for the identity store.
//!
//! The store keeps a deliberately narrow taxonomy: argument and state errors
//! are raised before any I/O, storage failures carry the raw Elasticsearch
//! response body, and "not found" is never an error — lookups return
//! `Ok(None)` instead.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all identity store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A required argument was missing or empty. Raised synchronously,
    /// before any network call.
    #[error("missing required argument: {0}")]
    InvalidArgument(&'static str),

    /// An index or entity name violated the naming rules at construction
    /// time. Names must match `[a-z0-9_-]+`.
    #[error("invalid {field} '{value}': only lowercase letters, digits, '-' and '_' are allowed")]
    InvalidName { field: &'static str, value: String },

    /// The configured endpoint could not be parsed, or the transport could
    /// not be built from it.
    #[error("connection failed to '{endpoint}': {message}")]
    Connection { endpoint: String, message: String },

    /// A create-only write collided with an existing document.
    #[error("user already exists: {user_name}")]
    AlreadyExists { user_name: String },

    /// A confirmation flag was set on a contact channel that is not present
    /// on the account.
    #[error("cannot confirm {channel}: no {channel} is set for this user")]
    MissingContactChannel { channel: &'static str },

    /// Index provisioning (create or delete) failed. Carries the raw
    /// response body for diagnostics.
    #[error("failed to provision index '{index}' (status {status}): {body}")]
    Provisioning {
        index: String,
        status: u16,
        body: String,
    },

    /// Elasticsearch answered an operation with an unexpected non-success
    /// status. Carries the raw response body for diagnostics.
    #[error("elasticsearch request failed (status {status}): {body}")]
    Request { status: u16, body: String },

    /// Transport-level failure (connection refused, timeout, TLS). Propagated
    /// verbatim; retry policy belongs to the caller.
    #[error("elasticsearch transport error: {0}")]
    Transport(#[from] elasticsearch::Error),

    /// A user record could not be converted to or from its document form.
    #[error("user document conversion failed: {0}")]
    Document(#[from] serde_json::Error),
}

/// Result type alias for identity store operations.
pub type StoreResult<T> = Result<T, StoreError>;
