//! Error taxonomy for the ingest-and-land pipeline.
//!
//! Every failure surfaces to the caller. Retries happen inside the token cache
//! and the search fetcher; once those give up, the error that comes out here is
//! fatal to the operation that raised it.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Missing or empty configuration value (credentials, endpoints).
    #[error("configuration error: {0}")]
    Config(String),

    /// Token refresh gave up.
    #[error("token refresh failed after {attempts} attempt(s): {cause}")]
    Auth { attempts: u32, cause: String },

    /// Search call gave up, or hit a non-retryable client error.
    #[error("search request failed after {attempts} attempt(s): {cause}")]
    Fetch { attempts: u32, cause: String },

    /// Response document failed the structural gate.
    #[error("schema error: {0}")]
    Schema(String),

    /// Raw text handed to the lander is not JSON.
    #[error("raw_text is not valid JSON: {0}")]
    Validation(String),

    /// Filesystem write or read failed.
    #[error("storage error while {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The storage target itself is not reachable (e.g. mount point missing).
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl IngestError {
    pub(crate) fn storage(context: impl Into<String>, source: io::Error) -> Self {
        IngestError::Storage {
            context: context.into(),
            source,
        }
    }
}
