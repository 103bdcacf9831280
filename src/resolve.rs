//! Path resolution and reversion against the storage root.
//!
//! The forward transform rewrites every relative reference to an absolute
//! URL under the cache-bypassing storage root; the reverse transform strips
//! those prefixes again so saved markup keeps its original relative form.
//!
//! # Resolution priority
//!
//! | Input                  | Result                              |
//! |------------------------|-------------------------------------|
//! | `https://...`, `//`, `data:` | Preserved as-is               |
//! | already under the root | Preserved as-is                     |
//! | `/styles/a.css`        | `{base}/styles/a.css`               |
//! | `./a.css`              | `{base}/{dir}/a.css`                |
//! | `../a.css`             | `{base}/{dir minus one}/a.css`      |
//! | `a.css`                | `{base}/{dir}/a.css`                |

use crate::core::RefKind;
use crate::debug;

/// Resolves raw references for one page and reverts them on save.
///
/// Pure and stateless beyond the two context strings; identical inputs
/// always resolve identically within a session.
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Directory of the page being edited, relative to the storage root.
    /// Held without leading/trailing slashes; empty for root pages.
    current_directory: String,
    /// Storage root, held without a trailing slash.
    base_url: String,
}

impl PathResolver {
    pub fn new(current_directory: &str, base_url: &str) -> Self {
        Self {
            current_directory: current_directory.trim_matches('/').to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve a raw reference to an absolute URL.
    ///
    /// Malformed references come back unchanged - resolution failures never
    /// abort the transform.
    pub fn resolve(&self, raw_path: &str) -> String {
        match RefKind::parse(raw_path) {
            RefKind::External(r) | RefKind::Unresolvable(r) => r.to_string(),

            RefKind::RootRelative(path) => {
                if self.is_under_base(raw_path) {
                    return raw_path.to_string();
                }
                format!("{}{}", self.base_url, path)
            }

            RefKind::DotRelative(rest) => self.join_current(rest),

            RefKind::ParentRelative(path) => {
                let (levels, rest) = strip_parent_runs(path);
                let dir = pop_segments(&self.current_directory, levels);
                self.join(&dir, rest)
            }

            RefKind::Bare(path) => {
                if self.is_under_base(raw_path) {
                    return raw_path.to_string();
                }
                self.join_current(path)
            }
        }
    }

    /// Invert resolution: strip the storage-root prefix from an absolute URL.
    ///
    /// Returns `None` when the URL does not point under the storage root;
    /// the caller leaves such values unchanged. URLs under the current
    /// directory revert to the bare relative remainder; URLs under the root
    /// but outside the current directory revert to root-relative form.
    pub fn revert(&self, url: &str) -> Option<String> {
        if self.base_url.is_empty() {
            return None;
        }

        if !self.current_directory.is_empty() {
            let dir_prefix = format!("{}/{}/", self.base_url, self.current_directory);
            if let Some(rest) = url.strip_prefix(&dir_prefix) {
                if !rest.is_empty() {
                    debug!("resolve"; "revert {} -> {}", url, rest);
                    return Some(rest.to_string());
                }
            }
        }

        let base_prefix = format!("{}/", self.base_url);
        if let Some(rest) = url.strip_prefix(&base_prefix) {
            if rest.is_empty() {
                return None;
            }
            // Root page: bare references resolved directly under the base,
            // so the bare remainder is the original form
            let reverted = if self.current_directory.is_empty() {
                rest.to_string()
            } else {
                format!("/{rest}")
            };
            debug!("resolve"; "revert {} -> {}", url, reverted);
            return Some(reverted);
        }

        None
    }

    /// Check if a value is already an absolute URL under the storage root.
    fn is_under_base(&self, value: &str) -> bool {
        !self.base_url.is_empty()
            && (value == self.base_url || value.starts_with(&format!("{}/", self.base_url)))
    }

    fn join_current(&self, rest: &str) -> String {
        self.join(&self.current_directory, rest)
    }

    /// Join base, directory and remainder without doubling separators.
    fn join(&self, dir: &str, rest: &str) -> String {
        if dir.is_empty() {
            format!("{}/{}", self.base_url, rest)
        } else {
            format!("{}/{}/{}", self.base_url, dir, rest)
        }
    }
}

/// Normalize a resolved URL for network probing.
///
/// Resolved URLs carry decoded, human-readable paths; the probe needs
/// percent-encoded ones. Relative values (no base configured) get a
/// conservative control-character encoding instead.
pub fn encode_probe_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => {
            use percent_encoding::{CONTROLS, utf8_percent_encode};
            utf8_percent_encode(url, CONTROLS).to_string()
        }
    }
}

/// Strip leading `../` runs, returning (count, remainder).
fn strip_parent_runs(path: &str) -> (usize, &str) {
    let mut rest = path;
    let mut levels = 0;
    while let Some(stripped) = rest.strip_prefix("../") {
        levels += 1;
        rest = stripped;
    }
    (levels, rest)
}

/// Pop `count` trailing segments from a directory path, flooring at empty.
fn pop_segments(dir: &str, count: usize) -> String {
    if dir.is_empty() {
        return String::new();
    }
    let segments: Vec<&str> = dir.split('/').collect();
    let keep = segments.len().saturating_sub(count);
    segments[..keep].join("/")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PathResolver {
        PathResolver::new("blog/posts", "https://cdn.example/sites/42")
    }

    #[test]
    fn test_resolve_dot_relative() {
        assert_eq!(
            resolver().resolve("./a.css"),
            "https://cdn.example/sites/42/blog/posts/a.css"
        );
    }

    #[test]
    fn test_resolve_parent_relative() {
        assert_eq!(
            resolver().resolve("../a.css"),
            "https://cdn.example/sites/42/blog/a.css"
        );
    }

    #[test]
    fn test_resolve_parent_relative_floors_at_root() {
        assert_eq!(
            resolver().resolve("../../../a.css"),
            "https://cdn.example/sites/42/a.css"
        );
    }

    #[test]
    fn test_resolve_root_relative() {
        assert_eq!(
            resolver().resolve("/a.css"),
            "https://cdn.example/sites/42/a.css"
        );
    }

    #[test]
    fn test_resolve_bare() {
        assert_eq!(
            resolver().resolve("a.css"),
            "https://cdn.example/sites/42/blog/posts/a.css"
        );
    }

    #[test]
    fn test_resolve_external_untouched() {
        assert_eq!(
            resolver().resolve("https://other.example/x.js"),
            "https://other.example/x.js"
        );
        assert_eq!(resolver().resolve("//cdn.other/y.css"), "//cdn.other/y.css");
        assert_eq!(
            resolver().resolve("data:image/png;base64,AA"),
            "data:image/png;base64,AA"
        );
    }

    #[test]
    fn test_resolve_already_absolute_to_base() {
        assert_eq!(
            resolver().resolve("https://cdn.example/sites/42/x/y.png"),
            "https://cdn.example/sites/42/x/y.png"
        );
    }

    #[test]
    fn test_resolve_empty_untouched() {
        assert_eq!(resolver().resolve(""), "");
    }

    #[test]
    fn test_resolve_empty_directory() {
        let resolver = PathResolver::new("", "https://cdn.example/sites/42");
        assert_eq!(
            resolver.resolve("a.css"),
            "https://cdn.example/sites/42/a.css"
        );
        assert_eq!(
            resolver.resolve("./a.css"),
            "https://cdn.example/sites/42/a.css"
        );
    }

    #[test]
    fn test_identical_raw_paths_resolve_identically() {
        let resolver = resolver();
        assert_eq!(resolver.resolve("a.css"), resolver.resolve("a.css"));
    }

    #[test]
    fn test_revert_under_directory() {
        let resolver = PathResolver::new("shop", "https://cdn/x");
        assert_eq!(
            resolver.revert("https://cdn/x/shop/photo.png"),
            Some("photo.png".to_string())
        );
    }

    #[test]
    fn test_revert_keeps_subpath() {
        assert_eq!(
            resolver().revert("https://cdn.example/sites/42/blog/posts/img/a.png"),
            Some("img/a.png".to_string())
        );
    }

    #[test]
    fn test_revert_outside_directory_goes_root_relative() {
        assert_eq!(
            resolver().revert("https://cdn.example/sites/42/styles/main.css"),
            Some("/styles/main.css".to_string())
        );
    }

    #[test]
    fn test_revert_foreign_url_untouched() {
        assert_eq!(resolver().revert("https://other.example/a.png"), None);
    }

    #[test]
    fn test_revert_empty_directory() {
        let resolver = PathResolver::new("", "https://cdn/x");
        assert_eq!(
            resolver.revert("https://cdn/x/photo.png"),
            Some("photo.png".to_string())
        );
    }

    #[test]
    fn test_revert_inverts_resolve() {
        let resolver = resolver();
        for raw in ["a.css", "img/b.png", "/styles/c.css"] {
            let resolved = resolver.resolve(raw);
            let reverted = resolver.revert(&resolved).unwrap();
            // Bare stays bare, root-relative stays root-relative
            assert_eq!(reverted, *raw);
        }
    }

    #[test]
    fn test_revert_dot_relative_collapses_to_bare() {
        let resolver = resolver();
        let resolved = resolver.resolve("./a.css");
        assert_eq!(resolver.revert(&resolved), Some("a.css".to_string()));
    }

    #[test]
    fn test_encode_probe_url() {
        assert_eq!(
            encode_probe_url("https://cdn.example/sites/42/my photo.png"),
            "https://cdn.example/sites/42/my%20photo.png"
        );
        // Already-encoded URLs pass through unchanged
        assert_eq!(
            encode_probe_url("https://cdn.example/a%20b.png"),
            "https://cdn.example/a%20b.png"
        );
        // Relative values survive un-mangled
        assert_eq!(encode_probe_url("broken ref"), "broken ref");
    }
}
