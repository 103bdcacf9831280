//! Reference classification and the asset data model.

use serde::Serialize;

// =============================================================================
// Syntactic classification
// =============================================================================

/// Syntactic classification of a raw reference string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind<'a> {
    /// External reference: URL scheme (`https://`), protocol-relative (`//`)
    /// or inline data (`data:`). Passed through untouched.
    External(&'a str),
    /// Root-relative path (/styles/main.css). Joined onto the storage root.
    RootRelative(&'a str),
    /// Dot-relative path (./logo.png). Value is the path without the `./`.
    DotRelative(&'a str),
    /// Parent-relative path (../shared/a.css). Value keeps its `../` runs.
    ParentRelative(&'a str),
    /// Bare relative path (photo.png). Joined onto the current directory.
    Bare(&'a str),
    /// Empty or malformed reference. Left untouched, classified `Other`.
    Unresolvable(&'a str),
}

impl<'a> RefKind<'a> {
    /// Parse a reference string into its syntactic kind.
    #[inline]
    pub fn parse(reference: &'a str) -> Self {
        if reference.trim().is_empty() {
            Self::Unresolvable(reference)
        } else if is_external(reference) {
            Self::External(reference)
        } else if reference.starts_with('/') {
            Self::RootRelative(reference)
        } else if let Some(rest) = reference.strip_prefix("./") {
            Self::DotRelative(rest)
        } else if reference.starts_with("../") {
            Self::ParentRelative(reference)
        } else {
            Self::Bare(reference)
        }
    }

    /// External and data references are already absolute; they are scanned
    /// but excluded from resolution and validation.
    #[inline]
    pub fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }
}

/// Check if a reference carries its own scheme or is protocol-relative.
#[inline]
pub(crate) fn is_external(reference: &str) -> bool {
    reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with("//")
        || reference.starts_with("data:")
}

// =============================================================================
// Asset data model
// =============================================================================

/// Asset category assigned during scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Css,
    Js,
    Image,
    Font,
    Other,
}

/// Extensions treated as fonts for `href` classification.
const FONT_EXTENSIONS: &[&str] = &["woff", "woff2", "ttf", "otf", "eot"];

/// Extensions treated as images for `src`/`url()` classification.
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "svg", "ico", "avif", "bmp",
];

impl AssetCategory {
    /// Classify a `<link href>` value: stylesheets are handled by the caller
    /// (rel check); everything font-shaped lands in `Font`.
    pub fn for_link_href(href: &str) -> Self {
        if Self::has_extension(href, FONT_EXTENSIONS) || href.contains("font") {
            Self::Font
        } else {
            Self::Other
        }
    }

    /// Classify an image-position reference (`<img src>`, CSS `url(...)`).
    pub fn for_image_ref(value: &str) -> Self {
        if Self::has_extension(value, IMAGE_EXTENSIONS) {
            Self::Image
        } else {
            Self::Other
        }
    }

    fn has_extension(value: &str, extensions: &[&str]) -> bool {
        // Strip query/fragment before looking at the extension
        let path = value.split(['?', '#']).next().unwrap_or(value);
        match path.rsplit_once('.') {
            Some((_, ext)) => extensions.contains(&ext.to_ascii_lowercase().as_str()),
            None => false,
        }
    }
}

/// A raw asset reference discovered in the document.
///
/// Created fresh per scan pass; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetReference {
    /// Reference exactly as written in the source markup.
    pub raw_path: String,
    /// Category assigned by the scanner rules.
    pub category: AssetCategory,
}

impl AssetReference {
    pub fn new(raw_path: impl Into<String>, category: AssetCategory) -> Self {
        Self {
            raw_path: raw_path.into(),
            category,
        }
    }
}

/// Validation status of a resolved asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Pending,
    Loading,
    Loaded,
    Error,
}

/// A scanned reference paired with its absolute URL and probe status.
///
/// One per unique raw path per session. The validator mutates `status` and
/// `error` in place through the session's shared table.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedAsset {
    #[serde(skip)]
    pub reference: AssetReference,
    pub resolved_url: String,
    pub status: AssetStatus,
    pub error: Option<String>,
}

impl ResolvedAsset {
    pub fn new(reference: AssetReference, resolved_url: impl Into<String>) -> Self {
        Self {
            reference,
            resolved_url: resolved_url.into(),
            status: AssetStatus::Pending,
            error: None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
