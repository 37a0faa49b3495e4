//! Error types
//!
//! Only [`Error::Bootstrap`] is meant to stop a process. Everything else is
//! either returned to the single caller that caused it or recovered inside
//! the component that hit it.

use thiserror::Error;

use crate::registry::RegistryError;

/// Crate-level result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// A startup dependency stayed unreachable after every retry
    #[error("bootstrap failed after {attempts} attempt(s): {source}")]
    Bootstrap {
        /// Number of attempts made
        attempts: u32,
        /// Last error observed
        #[source]
        source: Box<Error>,
    },

    /// The content provider could not be queried
    #[error("content provider failure: {0}")]
    ContentProvider(String),

    /// The content provider answered, but with nothing usable
    #[error("content provider returned no usable content")]
    NoContent,

    /// An upstream capability (room directory, round stream) failed
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// Unknown room or connection
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Catalog or directory data failed to parse
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error must terminate the process
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Bootstrap { .. })
    }
}
