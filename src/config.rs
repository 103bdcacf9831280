//! Engine configuration for `retouch.toml`.
//!
//! # Sections
//!
//! | Section      | Purpose                                            |
//! |--------------|----------------------------------------------------|
//! | `[site]`     | Storage root and widget origin                     |
//! | `[widgets]`  | Fallback placeholder dimensions per widget kind    |
//! | `[validate]` | Asset reachability probes (pool size, timeout)     |
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration. Unknown keys are warned about and ignored.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::log;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing retouch.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Site settings (storage root, widget origin)
    #[serde(default)]
    pub site: SiteSection,

    /// Widget placeholder settings
    #[serde(default)]
    pub widgets: WidgetsSection,

    /// Asset validation settings
    #[serde(default)]
    pub validate: ValidateSection,
}

impl PreviewConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let (config, ignored) = Self::parse_with_ignored(content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored);
        }
        config.validated()
    }

    /// Load configuration from file path with unknown field detection
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String]) {
        log!("warning"; "unknown fields in retouch.toml, ignoring:");
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Validate field values, normalizing where possible.
    fn validated(mut self) -> Result<Self, ConfigError> {
        // Trailing slash on the storage root would double up in joins
        while self.site.base_url.ends_with('/') {
            self.site.base_url.pop();
        }

        if self.validate.concurrency == 0 {
            return Err(ConfigError::Validation(
                "validate.concurrency must be at least 1".to_string(),
            ));
        }
        if self.validate.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "validate.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

// ============================================================================
// [site]
// ============================================================================

/// Site settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSection {
    /// Cache-bypassing root under which page-relative assets are fetchable.
    /// Must serve the same bytes as the live site.
    #[serde(default)]
    pub base_url: String,

    /// Origin that serves first-party widget iframes. When set, rule-A widget
    /// detection additionally checks that an absolute iframe src starts here.
    #[serde(default)]
    pub widget_origin: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            widget_origin: String::new(),
        }
    }
}

// ============================================================================
// [widgets]
// ============================================================================

/// Fallback placeholder dimensions for a widget kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetDims {
    pub width: String,
    pub height: String,
}

impl WidgetDims {
    fn new(width: &str, height: &str) -> Self {
        Self {
            width: width.to_string(),
            height: height.to_string(),
        }
    }
}

/// Widget placeholder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetsSection {
    /// Fallback size for the shop-status badge
    #[serde(default = "WidgetsSection::default_shop_status")]
    pub shop_status: WidgetDims,

    /// Fallback size for the image gallery
    #[serde(default = "WidgetsSection::default_image_gallery")]
    pub image_gallery: WidgetDims,

    /// Fallback size for the contact form
    #[serde(default = "WidgetsSection::default_contact_us")]
    pub contact_us: WidgetDims,
}

impl WidgetsSection {
    fn default_shop_status() -> WidgetDims {
        WidgetDims::new("480", "60")
    }

    fn default_image_gallery() -> WidgetDims {
        WidgetDims::new("640", "320")
    }

    fn default_contact_us() -> WidgetDims {
        WidgetDims::new("480", "400")
    }
}

impl Default for WidgetsSection {
    fn default() -> Self {
        Self {
            shop_status: Self::default_shop_status(),
            image_gallery: Self::default_image_gallery(),
            contact_us: Self::default_contact_us(),
        }
    }
}

// ============================================================================
// [validate]
// ============================================================================

/// Asset validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateSection {
    /// Run reachability probes after the forward transform
    #[serde(default = "ValidateSection::default_enable")]
    pub enable: bool,

    /// Maximum concurrent probes
    #[serde(default = "ValidateSection::default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[serde(default = "ValidateSection::default_timeout")]
    pub timeout_secs: u64,
}

impl ValidateSection {
    fn default_enable() -> bool {
        true
    }

    fn default_concurrency() -> usize {
        8
    }

    fn default_timeout() -> u64 {
        10
    }
}

impl Default for ValidateSection {
    fn default() -> Self {
        Self {
            enable: Self::default_enable(),
            concurrency: Self::default_concurrency(),
            timeout_secs: Self::default_timeout(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
