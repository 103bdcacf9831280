//! Error taxonomy for the transform engine.
//!
//! Per-asset and per-widget failures are isolated and never abort the overall
//! transform; only [`PreviewError::PersistFailure`] blocks a save.

use thiserror::Error;

/// Transform engine errors
#[derive(Debug, Error)]
pub enum PreviewError {
    /// Malformed reference - left unresolved, transform continues.
    #[error("cannot resolve reference `{reference}`: {reason}")]
    PathResolution { reference: String, reason: String },

    /// A resolved asset failed its reachability probe. Advisory only.
    #[error("asset unreachable: `{url}`: {reason}")]
    AssetUnreachable { url: String, reason: String },

    /// A placeholder at restore time has no recoverable widget metadata.
    /// The placeholder is dropped and never persisted.
    #[error("widget placeholder `{0}` has no recoverable metadata")]
    WidgetRestoreUnmatched(String),

    /// The preview DOM could not be read back (sandbox/cross-origin denial)
    /// and no cached edit exists to fall back on.
    #[error("preview serialization unavailable: {0}")]
    SerializationUnavailable(String),

    /// Storage write rejected. Fatal for that save attempt only; the session
    /// stays in `Editing` for retry.
    #[error("storage write rejected: {0}")]
    PersistFailure(String),

    /// A pipeline operation was invoked in a state that does not allow it.
    #[error("invalid session state: {0}")]
    InvalidState(String),

    /// Storage collaborator failure outside of a save (read path).
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    /// Configuration file errors.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(std::path::PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}
