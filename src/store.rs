//! External collaborator interfaces.
//!
//! Storage, CDN and the image-repository picker live outside this crate;
//! these traits are the seams the pipeline talks through. The image-swap
//! hand-off is an explicit request/response pair correlated by session
//! token - never shared mutable state between a popup and its opener.

use thiserror::Error;

/// Storage collaborator failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("content not found at `{0}`")]
    NotFound(String),

    #[error("storage rejected the write: {0}")]
    Rejected(String),

    #[error("storage transport error: {0}")]
    Transport(String),
}

/// Object-storage access for page content.
///
/// `get` must read through a cache-bypassing path: the engine needs the
/// bytes the live site actually serves, not a stale CDN copy.
pub trait ContentStore {
    fn get(&self, path: &str) -> Result<String, StoreError>;
    fn put(&self, path: &str, html: &str) -> Result<(), StoreError>;
}

// =============================================================================
// Image replacement
// =============================================================================

/// A picker-initiated image swap, correlated to its originating session.
#[derive(Debug, Clone)]
pub struct ImageSwapRequest {
    /// Token of the session that opened the picker. Responses carrying a
    /// superseded token are dropped.
    pub session_token: u64,
    /// Reference as it appears in the stored markup.
    pub old_ref: String,
    /// Replacement URL chosen in the repository picker.
    pub new_url: String,
    pub account_id: String,
    /// Storage path of the page being edited.
    pub page_path: String,
}

/// What the collaborator changed.
#[derive(Debug, Clone, Default)]
pub struct ReplaceReport {
    /// Occurrences rewritten, as raw reference strings.
    pub occurrences: Vec<String>,
}

impl ReplaceReport {
    pub fn replaced(&self) -> usize {
        self.occurrences.len()
    }
}

/// Black-box global image replacement.
///
/// Performs the storage-side rewrite itself; the engine only refreshes its
/// in-memory HTML after a successful report.
pub trait ImageReplacer {
    fn replace(&self, request: &ImageSwapRequest) -> Result<ReplaceReport, StoreError>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_report_count() {
        let report = ReplaceReport {
            occurrences: vec!["img/a.png".to_string(), "img/a.png".to_string()],
        };
        assert_eq!(report.replaced(), 2);
        assert_eq!(ReplaceReport::default().replaced(), 0);
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Rejected("quota exceeded".to_string());
        assert!(format!("{err}").contains("quota exceeded"));
    }
}
