//! Error types for mesh access and evaluation.

use thiserror::Error;
use tinshift_decode::DecodeError;

/// Errors raised while opening a mesh or looking up a point.
///
/// `Open`, `Metadata`, `Schema` and `QueryPreparation` only occur while a
/// mesh is being opened. `Decode` and `Sqlite` occur per lookup. A point
/// outside the mesh is not an error; lookups return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum Error {
    /// No access path could open the container.
    #[error("open of {location} failed: {reason}")]
    Open { location: String, reason: String },

    /// The metadata header is missing or invalid.
    #[error("invalid mesh metadata: {0}")]
    Metadata(String),

    /// The vertices table lacks columns required by the declared components.
    #[error("invalid vertices table: {0}")]
    Schema(String),

    /// The triangle query could not be prepared.
    #[error("cannot prepare triangle query: {0}")]
    QueryPreparation(#[source] rusqlite::Error),

    /// A vertex geometry could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The storage engine failed while stepping through rows.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A mesh being authored is inconsistent.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// I/O failure while writing or materialising a container.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
