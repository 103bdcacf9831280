//! Core types - pure abstractions shared across the codebase.

mod reference;
mod state;

pub use reference::{AssetCategory, AssetReference, AssetStatus, RefKind, ResolvedAsset};
pub use state::SessionState;
