//! Asset reference scanning (pure, no side effects).
//!
//! Walks the parsed tree and collects every asset reference by category:
//!
//! - `<link rel="stylesheet" href>` -> css
//! - any `<link href>` with a font extension or containing "font" -> fonts
//! - `<script src>` -> js
//! - `<img src>` and `url(...)` in style content with an image extension
//!   -> images, otherwise -> other
//! - `<video|audio|source|track src>` -> rewritten like every other
//!   reference but not separately categorized (lands in other)
//!
//! External and data references are scanned too, but callers exclude them
//! from resolution and validation - they are already absolute.

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::{AssetCategory, AssetReference, RefKind};
use crate::dom::{self, Document, Element};

/// `url(...)` occurrences inside stylesheet text or inline style attributes.
static STYLE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).unwrap());

/// Tags whose `src` is a media reference.
pub(crate) const MEDIA_TAGS: &[&str] = &["video", "audio", "source", "track"];

/// Categorized scan result.
///
/// References are deduplicated by raw path; the first category assigned wins,
/// so one `ResolvedAsset` exists per unique raw path downstream.
#[derive(Debug, Default)]
pub struct ScanReport {
    references: Vec<AssetReference>,
    seen: FxHashSet<String>,
}

impl ScanReport {
    fn add(&mut self, raw: &str, category: AssetCategory) {
        if raw.trim().is_empty() || self.seen.contains(raw) {
            return;
        }
        self.seen.insert(raw.to_string());
        self.references.push(AssetReference::new(raw, category));
    }

    /// All discovered references in document order.
    pub fn references(&self) -> &[AssetReference] {
        &self.references
    }

    /// References that need resolution and validation (external and data
    /// references are already absolute).
    pub fn resolvable(&self) -> impl Iterator<Item = &AssetReference> {
        self.references
            .iter()
            .filter(|r| !RefKind::parse(&r.raw_path).is_external())
    }

    /// Raw reference strings for one category.
    pub fn by_category(&self, category: AssetCategory) -> FxHashSet<&str> {
        self.references
            .iter()
            .filter(|r| r.category == category)
            .map(|r| r.raw_path.as_str())
            .collect()
    }

    /// Category counts, cheap status-surface summary.
    pub fn counts(&self) -> FxHashMap<AssetCategory, usize> {
        let mut counts = FxHashMap::default();
        for reference in &self.references {
            *counts.entry(reference.category).or_insert(0) += 1;
        }
        counts
    }
}

/// Extracts categorized asset references from HTML.
#[derive(Debug, Default)]
pub struct AssetScanner;

impl AssetScanner {
    /// Scan raw HTML. Convenience wrapper over [`AssetScanner::scan_doc`].
    pub fn scan(html: &str) -> ScanReport {
        Self::scan_doc(&dom::parse(html))
    }

    /// Scan a parsed document.
    pub fn scan_doc(doc: &Document) -> ScanReport {
        let mut report = ScanReport::default();

        doc.for_each_element(&mut |elem| {
            scan_element(elem, &mut report);
        });

        report
    }
}

fn scan_element(elem: &Element, report: &mut ScanReport) {
    match elem.tag.as_str() {
        "link" => {
            if let Some(href) = elem.get_attr("href") {
                let rel = elem.get_attr("rel").unwrap_or_default();
                let category = if rel.eq_ignore_ascii_case("stylesheet") {
                    AssetCategory::Css
                } else {
                    AssetCategory::for_link_href(href)
                };
                report.add(href, category);
            }
        }
        "script" => {
            if let Some(src) = elem.get_attr("src") {
                report.add(src, AssetCategory::Js);
            }
        }
        "img" => {
            if let Some(src) = elem.get_attr("src") {
                report.add(src, AssetCategory::for_image_ref(src));
            }
        }
        "style" => {
            scan_style_text(&elem.direct_text(), report);
        }
        tag if MEDIA_TAGS.contains(&tag) => {
            if let Some(src) = elem.get_attr("src") {
                report.add(src, AssetCategory::Other);
            }
        }
        _ => {}
    }

    // Inline style attributes can reference images on any element
    if let Some(style) = elem.get_attr("style") {
        scan_style_text(style, report);
    }
}

/// Collect `url(...)` references out of CSS text.
fn scan_style_text(css: &str, report: &mut ScanReport) {
    for caps in STYLE_URL_RE.captures_iter(css) {
        let raw = &caps[1];
        report.add(raw, AssetCategory::for_image_ref(raw));
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_stylesheet() {
        let report = AssetScanner::scan(r#"<link rel="stylesheet" href="main.css">"#);
        assert!(report.by_category(AssetCategory::Css).contains("main.css"));
    }

    #[test]
    fn test_scan_font_by_extension() {
        let report = AssetScanner::scan(r#"<link rel="preload" href="title.woff2">"#);
        assert!(report.by_category(AssetCategory::Font).contains("title.woff2"));
    }

    #[test]
    fn test_scan_font_by_name() {
        let report = AssetScanner::scan(r#"<link rel="preload" href="/assets/webfont.css">"#);
        assert!(
            report
                .by_category(AssetCategory::Font)
                .contains("/assets/webfont.css")
        );
    }

    #[test]
    fn test_scan_script() {
        let report = AssetScanner::scan(r#"<script src="app.js"></script>"#);
        assert!(report.by_category(AssetCategory::Js).contains("app.js"));
    }

    #[test]
    fn test_scan_img() {
        let report = AssetScanner::scan(r#"<img src="photo.png">"#);
        assert!(report.by_category(AssetCategory::Image).contains("photo.png"));
    }

    #[test]
    fn test_scan_img_unknown_extension_is_other() {
        let report = AssetScanner::scan(r#"<img src="capture.dat">"#);
        assert!(report.by_category(AssetCategory::Other).contains("capture.dat"));
    }

    #[test]
    fn test_scan_style_block_url() {
        let report =
            AssetScanner::scan("<style>body { background: url('bg.jpg'); }</style>");
        assert!(report.by_category(AssetCategory::Image).contains("bg.jpg"));
    }

    #[test]
    fn test_scan_inline_style_url() {
        let report =
            AssetScanner::scan(r#"<div style="background-image: url(hero.webp)"></div>"#);
        assert!(report.by_category(AssetCategory::Image).contains("hero.webp"));
    }

    #[test]
    fn test_scan_media_src_is_other() {
        let report = AssetScanner::scan(r#"<video src="intro.mp4"></video>"#);
        assert!(report.by_category(AssetCategory::Other).contains("intro.mp4"));

        let report = AssetScanner::scan(r#"<audio src="jingle.mp3"></audio>"#);
        assert!(report.by_category(AssetCategory::Other).contains("jingle.mp3"));
    }

    #[test]
    fn test_scan_dedup() {
        let report = AssetScanner::scan(
            r#"<img src="photo.png"><img src="photo.png"><img src="photo.png">"#,
        );
        assert_eq!(report.references().len(), 1);
    }

    #[test]
    fn test_scan_external_excluded_from_resolvable() {
        let report = AssetScanner::scan(
            r#"<script src="https://other.example/x.js"></script><script src="app.js"></script>"#,
        );
        assert_eq!(report.references().len(), 2);
        let resolvable: Vec<_> = report.resolvable().collect();
        assert_eq!(resolvable.len(), 1);
        assert_eq!(resolvable[0].raw_path, "app.js");
    }

    #[test]
    fn test_scan_data_uri_excluded_from_resolvable() {
        let report = AssetScanner::scan(r#"<img src="data:image/png;base64,AAAA">"#);
        assert_eq!(report.resolvable().count(), 0);
    }

    #[test]
    fn test_scan_empty_src_skipped() {
        let report = AssetScanner::scan(r#"<img src="">"#);
        assert!(report.references().is_empty());
    }

    #[test]
    fn test_counts() {
        let report = AssetScanner::scan(
            r#"<link rel="stylesheet" href="a.css"><img src="b.png"><img src="c.png">"#,
        );
        let counts = report.counts();
        assert_eq!(counts.get(&AssetCategory::Css), Some(&1));
        assert_eq!(counts.get(&AssetCategory::Image), Some(&2));
    }
}
