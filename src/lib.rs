//! Retouch - preview and lightly edit deployed static sites in place.
//!
//! The engine turns stored HTML into an instrumented preview (forward
//! transform) and turns the edited preview back into storable HTML (reverse
//! transform). Asset references are resolved against the storage root, widget
//! iframes are swapped for inert placeholders, and text-bearing elements are
//! marked editable - all of it undone bit-for-bit on save.

pub mod config;
pub mod core;
pub mod dom;
pub mod editable;
pub mod error;
pub mod logger;
pub mod pipeline;
pub mod resolve;
pub mod scan;
pub mod store;
pub mod validate;
pub mod widget;

pub use crate::config::PreviewConfig;
pub use crate::core::{
    AssetCategory, AssetReference, AssetStatus, RefKind, ResolvedAsset, SessionState,
};
pub use crate::error::PreviewError;
pub use crate::pipeline::{DocumentTransformSession, TransformPipeline};
pub use crate::resolve::PathResolver;
pub use crate::scan::{AssetScanner, ScanReport};
pub use crate::store::{ContentStore, ImageReplacer, ImageSwapRequest, ReplaceReport, StoreError};
pub use crate::validate::{AssetValidator, ValidationHandle};
pub use crate::widget::{WidgetIsolator, WidgetKind, WidgetPlaceholder};
