//! Error types shared by every stage of a scan.
//!
//! Only [`Error::NoCandidates`] aborts a scan. Remote and analysis failures are
//! recoverable: the hydrator degrades to raw episode numbering and records them.

use crate::ids::MediaId;

/// Common error type for episodex.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The candidate set is empty, so nothing can be matched.
    #[error("No candidate media available for matching")]
    NoCandidates,

    /// A remote catalog call failed (network, bad response, cancelled wait).
    #[error("Remote fetch failed [{operation}] for media {media_id}: {message}")]
    RemoteFetch {
        /// Catalog operation that failed (e.g. "media", "relations").
        operation: String,
        /// Media the call was made for ([`MediaId::UNMATCHED`] for searches).
        media_id: MediaId,
        /// Human-readable error description.
        message: String,
    },

    /// The relation tree was built but no episode mapping could be derived.
    #[error("Tree analysis unavailable for media {media_id}: {reason}")]
    AnalysisUnavailable {
        /// Root media of the tree.
        media_id: MediaId,
        /// Why the mapping could not be derived.
        reason: String,
    },

    /// A hydration group panicked; only that group is affected.
    #[error("Hydration group for media {media_id} panicked: {message}")]
    GroupPanicked {
        /// Media id of the group.
        media_id: MediaId,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// Configuration was invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new RemoteFetch error.
    pub fn remote<O, S>(operation: O, media_id: MediaId, message: S) -> Self
    where
        O: Into<String>,
        S: Into<String>,
    {
        Self::RemoteFetch {
            operation: operation.into(),
            media_id,
            message: message.into(),
        }
    }

    /// Create a new AnalysisUnavailable error.
    pub fn analysis_unavailable<S: Into<String>>(media_id: MediaId, reason: S) -> Self {
        Self::AnalysisUnavailable {
            media_id,
            reason: reason.into(),
        }
    }

    /// Create a new Config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the hydrator may fall back to best-effort numbering.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RemoteFetch { .. } | Self::AnalysisUnavailable { .. } | Self::GroupPanicked { .. }
        )
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
