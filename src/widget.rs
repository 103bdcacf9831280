//! Widget iframe isolation.
//!
//! First-party widget iframes (status badge, gallery, contact form) must keep
//! working on the live site but must not reload, re-initialize, or become
//! editable inside the preview. The isolator swaps each one for an inert
//! placeholder div at forward time and reconstructs the iframe at save time.
//!
//! Detection:
//! - Rule A: iframe `src` matching `/widget-preview/{account_id}/{kind}`.
//! - Rule B: iframe with empty/absent `src` whose `id` fuzzy-matches a
//!   widget keyword - covers widgets whose src is filled in by client
//!   script after load.

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::config::{WidgetDims, WidgetsSection};
use crate::dom::{Document, Element, Node};
use crate::log;

/// Rule A: widget-preview src path with a known kind.
static WIDGET_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/widget-preview/([^/?#]+)/(shop-status|image-gallery|contact-us)(?:[/?#]|$)")
        .unwrap()
});

/// Inline `min-height` fallback for dimension capture.
static MIN_HEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"min-height:\s*([0-9]+(?:\.[0-9]+)?(?:px|%|em|rem|vh)?)").unwrap());

pub const PLACEHOLDER_ATTR: &str = "data-widget-placeholder";

// =============================================================================
// Widget kinds
// =============================================================================

/// The known first-party widget kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    ShopStatus,
    ImageGallery,
    ContactUs,
}

impl WidgetKind {
    /// Parse the kind segment of a widget-preview src path.
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "shop-status" => Some(Self::ShopStatus),
            "image-gallery" => Some(Self::ImageGallery),
            "contact-us" => Some(Self::ContactUs),
            _ => None,
        }
    }

    /// Fuzzy-match an element id against widget keywords (rule B).
    pub fn from_fuzzy_id(id: &str) -> Option<Self> {
        let id = id.to_ascii_lowercase();
        if id.contains("contact") {
            Some(Self::ContactUs)
        } else if id.contains("gallery") || id.contains("image") {
            Some(Self::ImageGallery)
        } else if id.contains("shop") || id.contains("status") {
            Some(Self::ShopStatus)
        } else {
            None
        }
    }

    /// Kind segment as it appears in widget-preview paths.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShopStatus => "shop-status",
            Self::ImageGallery => "image-gallery",
            Self::ContactUs => "contact-us",
        }
    }

    /// Human-facing name for the disabled card.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::ShopStatus => "Shop status",
            Self::ImageGallery => "Image gallery",
            Self::ContactUs => "Contact form",
        }
    }

    fn fallback_dims(self, widgets: &WidgetsSection) -> WidgetDims {
        match self {
            Self::ShopStatus => widgets.shop_status.clone(),
            Self::ImageGallery => widgets.image_gallery.clone(),
            Self::ContactUs => widgets.contact_us.clone(),
        }
    }
}

// =============================================================================
// Placeholder records
// =============================================================================

/// Session record for one isolated widget.
///
/// Created at forward time, consumed and deleted at reverse time.
#[derive(Debug, Clone)]
pub struct WidgetPlaceholder {
    /// Unique per session, never reused after restoration.
    pub placeholder_id: String,
    pub original_src: String,
    /// Present for rule-B widgets; restore emits a bare `<iframe id src="">`.
    pub original_element_id: Option<String>,
    /// (width, height) as captured or defaulted.
    pub original_dimensions: (String, String),
    pub widget_kind: WidgetKind,
}

/// Placeholder id -> record, owned by one session.
pub type PlaceholderTable = FxHashMap<String, WidgetPlaceholder>;

// =============================================================================
// Isolator
// =============================================================================

/// Swaps widget iframes for inert placeholders and back.
pub struct WidgetIsolator<'a> {
    widgets: &'a WidgetsSection,
    /// When configured, absolute rule-A srcs must start here.
    widget_origin: &'a str,
    counter: u64,
}

impl<'a> WidgetIsolator<'a> {
    pub fn new(widgets: &'a WidgetsSection, widget_origin: &'a str) -> Self {
        Self {
            widgets,
            widget_origin,
            counter: 0,
        }
    }

    /// Replace every detected widget iframe with a placeholder div.
    pub fn isolate_doc(&mut self, doc: &mut Document) -> PlaceholderTable {
        let mut table = PlaceholderTable::default();
        self.isolate_children(&mut doc.children, &mut table);
        table
    }

    /// String-level convenience: isolate raw HTML.
    pub fn isolate(&mut self, html: &str) -> (String, PlaceholderTable) {
        let mut doc = crate::dom::parse(html);
        let table = self.isolate_doc(&mut doc);
        (crate::dom::render(&doc), table)
    }

    fn isolate_children(
        &mut self,
        children: &mut SmallVec<[Node; 4]>,
        table: &mut PlaceholderTable,
    ) {
        for node in children.iter_mut() {
            let Node::Element(elem) = node else { continue };

            if elem.is_tag("iframe") {
                if let Some(record) = self.detect(elem) {
                    let placeholder = build_placeholder(&record);
                    table.insert(record.placeholder_id.clone(), record);
                    *node = Node::Element(Box::new(placeholder));
                    continue;
                }
            }

            self.isolate_children(&mut elem.children, table);
        }
    }

    /// Apply detection rules to one iframe.
    fn detect(&mut self, elem: &Element) -> Option<WidgetPlaceholder> {
        let src = elem.get_attr("src").unwrap_or_default();

        // Rule A: widget-preview src
        if !src.is_empty() {
            let caps = WIDGET_SRC_RE.captures(src)?;
            if !self.origin_matches(src) {
                return None;
            }
            let kind = WidgetKind::from_path_segment(&caps[2])?;
            return Some(self.record(elem, src, None, kind));
        }

        // Rule B: empty src, fuzzy id
        let id = elem.get_attr("id")?;
        let kind = WidgetKind::from_fuzzy_id(id)?;
        Some(self.record(elem, "", Some(id.to_string()), kind))
    }

    /// Absolute srcs must come from the configured widget origin.
    fn origin_matches(&self, src: &str) -> bool {
        if self.widget_origin.is_empty() || !src.starts_with("http") {
            return true;
        }
        src.starts_with(self.widget_origin)
    }

    fn record(
        &mut self,
        elem: &Element,
        src: &str,
        element_id: Option<String>,
        kind: WidgetKind,
    ) -> WidgetPlaceholder {
        self.counter += 1;
        WidgetPlaceholder {
            placeholder_id: format!("widget-ph-{}", self.counter),
            original_src: src.to_string(),
            original_element_id: element_id,
            original_dimensions: capture_dimensions(elem, kind, self.widgets),
            widget_kind: kind,
        }
    }
}

/// Capture (width, height): attributes first, then an inline `min-height`
/// for the height, then the configured kind defaults.
fn capture_dimensions(
    elem: &Element,
    kind: WidgetKind,
    widgets: &WidgetsSection,
) -> (String, String) {
    let fallback = kind.fallback_dims(widgets);

    let width = elem
        .get_attr("width")
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .unwrap_or(fallback.width);

    let height = elem
        .get_attr("height")
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .or_else(|| {
            elem.get_attr("style")
                .and_then(|style| MIN_HEIGHT_RE.captures(style))
                .map(|caps| caps[1].trim_end_matches("px").to_string())
        })
        .unwrap_or(fallback.height);

    (width, height)
}

/// Build the inert stand-in div for one record.
fn build_placeholder(record: &WidgetPlaceholder) -> Element {
    let mut div = Element::new("div");
    div.set_attr(PLACEHOLDER_ATTR, record.placeholder_id.clone());
    div.set_attr("data-widget-kind", record.widget_kind.as_str());
    if !record.original_src.is_empty() {
        div.set_attr("data-original-src", record.original_src.clone());
    }
    if let Some(id) = &record.original_element_id {
        div.set_attr("data-original-id", id.clone());
    }
    let (width, height) = &record.original_dimensions;
    div.set_attr("data-original-width", width.clone());
    div.set_attr("data-original-height", height.clone());

    // Inert: no pointer events, never editable, so later stages skip it
    div.set_attr(
        "style",
        format!(
            "width:{};min-height:{};pointer-events:none;border:1px dashed #bbb;\
             display:flex;align-items:center;justify-content:center;\
             background:#fafafa;color:#888;font:13px sans-serif;",
            css_length(width),
            css_length(height)
        ),
    );
    div.set_attr("contenteditable", "false");

    let mut card = Element::new("span");
    card.children.push(Node::Text(format!(
        "{} widget (disabled while editing)",
        record.widget_kind.display_name()
    )));
    div.children.push(Node::Element(Box::new(card)));

    div
}

/// Bare numbers are pixel lengths; anything else passes through.
fn css_length(value: &str) -> String {
    if value.chars().all(|c| c.is_ascii_digit() || c == '.') && !value.is_empty() {
        format!("{value}px")
    } else {
        value.to_string()
    }
}

// =============================================================================
// Restore
// =============================================================================

/// Reconstruct iframes from placeholder divs.
///
/// Matching is structural (the placeholder attribute), never by inner
/// content - edits may have mutated the card text. Metadata comes from the
/// session table first, then from the div's own data attributes. Placeholders
/// with no recoverable metadata are dropped and logged, never persisted.
pub fn restore_doc(doc: &mut Document, table: &mut PlaceholderTable) {
    restore_children(&mut doc.children, table);
}

/// String-level convenience: restore raw HTML.
pub fn restore(html: &str, table: &mut PlaceholderTable) -> String {
    let mut doc = crate::dom::parse(html);
    restore_doc(&mut doc, table);
    crate::dom::render(&doc)
}

fn restore_children(children: &mut SmallVec<[Node; 4]>, table: &mut PlaceholderTable) {
    let mut restored: SmallVec<[Node; 4]> = SmallVec::with_capacity(children.len());

    for mut node in children.drain(..) {
        if let Node::Element(elem) = &mut node {
            if let Some(placeholder_id) = elem.get_attr(PLACEHOLDER_ATTR) {
                let placeholder_id = placeholder_id.to_string();
                match recover_metadata(elem, table.remove(&placeholder_id)) {
                    Some(iframe) => restored.push(Node::Element(Box::new(iframe))),
                    None => {
                        log!("warning"; "dropping orphan widget placeholder `{}`", placeholder_id);
                    }
                }
                continue;
            }
            restore_children(&mut elem.children, table);
        }
        restored.push(node);
    }

    *children = restored;
}

/// Rebuild the iframe from the table record or the div's data attributes.
fn recover_metadata(elem: &Element, record: Option<WidgetPlaceholder>) -> Option<Element> {
    let (src, element_id, dims) = match record {
        Some(record) => (
            record.original_src,
            record.original_element_id,
            record.original_dimensions,
        ),
        None => {
            // Fall back to the placeholder's own attributes
            let src = elem.get_attr("data-original-src").unwrap_or_default();
            let element_id = elem.get_attr("data-original-id").map(str::to_string);
            if src.is_empty() && element_id.is_none() {
                return None;
            }
            (
                src.to_string(),
                element_id,
                (
                    elem.get_attr("data-original-width")
                        .unwrap_or_default()
                        .to_string(),
                    elem.get_attr("data-original-height")
                        .unwrap_or_default()
                        .to_string(),
                ),
            )
        }
    };

    let mut iframe = Element::new("iframe");

    // Dynamic-src widgets restore bare: client script re-fills the src
    if let Some(id) = element_id {
        iframe.set_attr("id", id);
        iframe.set_attr("src", "");
        return Some(iframe);
    }

    iframe.set_attr("src", src);
    let (width, height) = dims;
    if !width.is_empty() {
        iframe.set_attr("width", width);
    }
    if !height.is_empty() {
        iframe.set_attr("height", height);
    }
    Some(iframe)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn widgets() -> WidgetsSection {
        WidgetsSection::default()
    }

    fn isolate(html: &str) -> (String, PlaceholderTable) {
        let config = widgets();
        let mut isolator = WidgetIsolator::new(&config, "");
        isolator.isolate(html)
    }

    #[test]
    fn test_kind_from_path_segment() {
        assert_eq!(
            WidgetKind::from_path_segment("shop-status"),
            Some(WidgetKind::ShopStatus)
        );
        assert_eq!(
            WidgetKind::from_path_segment("image-gallery"),
            Some(WidgetKind::ImageGallery)
        );
        assert_eq!(
            WidgetKind::from_path_segment("contact-us"),
            Some(WidgetKind::ContactUs)
        );
        assert_eq!(WidgetKind::from_path_segment("unknown"), None);
    }

    #[test]
    fn test_kind_from_fuzzy_id() {
        assert_eq!(
            WidgetKind::from_fuzzy_id("contact-widget-1"),
            Some(WidgetKind::ContactUs)
        );
        assert_eq!(
            WidgetKind::from_fuzzy_id("photoGallery"),
            Some(WidgetKind::ImageGallery)
        );
        assert_eq!(
            WidgetKind::from_fuzzy_id("image-strip"),
            Some(WidgetKind::ImageGallery)
        );
        assert_eq!(
            WidgetKind::from_fuzzy_id("shopBadge"),
            Some(WidgetKind::ShopStatus)
        );
        assert_eq!(
            WidgetKind::from_fuzzy_id("status-banner"),
            Some(WidgetKind::ShopStatus)
        );
        assert_eq!(WidgetKind::from_fuzzy_id("sidebar"), None);
    }

    #[test]
    fn test_rule_a_isolation() {
        let html = r#"<iframe src="https://app.example/widget-preview/acct9/contact-us" width="500" height="420"></iframe>"#;
        let (out, table) = isolate(html);

        assert_eq!(table.len(), 1);
        let record = table.values().next().unwrap();
        assert_eq!(record.widget_kind, WidgetKind::ContactUs);
        assert_eq!(
            record.original_src,
            "https://app.example/widget-preview/acct9/contact-us"
        );
        assert_eq!(record.original_dimensions, ("500".into(), "420".into()));

        assert!(out.contains(PLACEHOLDER_ATTR));
        assert!(out.contains("pointer-events:none"));
        assert!(out.contains("Contact form widget"));
        assert!(!out.contains("<iframe"));
    }

    #[test]
    fn test_rule_a_origin_mismatch_skipped() {
        let config = widgets();
        let mut isolator = WidgetIsolator::new(&config, "https://app.example");
        let html = r#"<iframe src="https://evil.example/widget-preview/a/contact-us"></iframe>"#;
        let (out, table) = isolator.isolate(html);

        assert!(table.is_empty());
        assert!(out.contains("<iframe"));
    }

    #[test]
    fn test_rule_b_isolation() {
        let html = r#"<iframe id="contact-widget-1" src=""></iframe>"#;
        let (out, table) = isolate(html);

        assert_eq!(table.len(), 1);
        let record = table.values().next().unwrap();
        assert_eq!(record.original_element_id.as_deref(), Some("contact-widget-1"));
        assert_eq!(record.original_src, "");
        assert!(!out.contains("<iframe"));
    }

    #[test]
    fn test_plain_iframe_untouched() {
        let html = r#"<iframe src="https://maps.example/embed"></iframe>"#;
        let (out, table) = isolate(html);

        assert!(table.is_empty());
        assert!(out.contains("maps.example/embed"));
    }

    #[test]
    fn test_dimension_fallback_min_height() {
        let html = r#"<iframe id="gallery-main" src="" style="min-height: 280px"></iframe>"#;
        let (_, table) = isolate(html);
        let record = table.values().next().unwrap();
        // width falls back to the kind default, height comes from min-height
        assert_eq!(record.original_dimensions.1, "280");
        assert_eq!(record.original_dimensions.0, "640");
    }

    #[test]
    fn test_dimension_fallback_kind_defaults() {
        let html = r#"<iframe id="shop-status-box" src=""></iframe>"#;
        let (_, table) = isolate(html);
        let record = table.values().next().unwrap();
        assert_eq!(record.original_dimensions, ("480".into(), "60".into()));
    }

    #[test]
    fn test_placeholder_ids_unique() {
        let html = r#"
            <iframe id="contact-a" src=""></iframe>
            <iframe id="gallery-b" src=""></iframe>
            <iframe id="shop-c" src=""></iframe>
        "#;
        let (_, table) = isolate(html);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_restore_rule_a_roundtrip() {
        let html = r#"<div><iframe src="/widget-preview/acct9/image-gallery" width="640" height="320"></iframe></div>"#;
        let (preview, mut table) = isolate(html);

        let restored = restore(&preview, &mut table);
        assert!(restored.contains(r#"src="/widget-preview/acct9/image-gallery""#));
        assert!(restored.contains(r#"width="640""#));
        assert!(restored.contains(r#"height="320""#));
        assert!(!restored.contains(PLACEHOLDER_ATTR));
        assert!(table.is_empty());
    }

    #[test]
    fn test_restore_rule_b_roundtrip() {
        let html = r#"<iframe id="contact-widget-1" src=""></iframe>"#;
        let (preview, mut table) = isolate(html);

        let restored = restore(&preview, &mut table);
        assert!(restored.contains(r#"id="contact-widget-1""#));
        assert!(restored.contains(r#"src="""#));
        // Bare reconstruction: no dimensions on dynamic-src widgets
        assert!(!restored.contains("width="));
    }

    #[test]
    fn test_restore_survives_card_edits() {
        let html = r#"<iframe src="/widget-preview/a/shop-status"></iframe>"#;
        let (preview, mut table) = isolate(html);

        // Simulate the user mangling the card text in the preview
        let edited = preview.replace("Shop status widget (disabled while editing)", "oops");
        let restored = restore(&edited, &mut table);
        assert!(restored.contains(r#"src="/widget-preview/a/shop-status""#));
        assert!(!restored.contains("oops"));
    }

    #[test]
    fn test_restore_from_attributes_when_table_lost() {
        let html = r#"<iframe src="/widget-preview/a/contact-us" width="300" height="200"></iframe>"#;
        let (preview, _table) = isolate(html);

        // Fresh empty table: metadata must come from the div attributes
        let mut empty = PlaceholderTable::default();
        let restored = restore(&preview, &mut empty);
        assert!(restored.contains(r#"src="/widget-preview/a/contact-us""#));
        assert!(restored.contains(r#"width="300""#));
    }

    #[test]
    fn test_restore_drops_unrecoverable_placeholder() {
        let html = r#"<div data-widget-placeholder="widget-ph-99" data-widget-kind="contact-us"><span>card</span></div>"#;
        let mut table = PlaceholderTable::default();
        let restored = restore(html, &mut table);

        assert!(!restored.contains("widget-ph-99"));
        assert!(!restored.contains("<iframe"));
    }

    #[test]
    fn test_nested_widget_isolated() {
        let html = r#"<main><section><iframe id="imageGallery" src=""></iframe></section></main>"#;
        let (out, table) = isolate(html);
        assert_eq!(table.len(), 1);
        assert!(out.contains("<section>"));
        assert!(out.contains(PLACEHOLDER_ATTR));
    }
}
