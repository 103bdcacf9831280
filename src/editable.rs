//! Editability injection.
//!
//! Marks eligible text-bearing elements `contenteditable` for the preview
//! and strips every trace of that instrumentation before save. The tagging
//! pass never descends into protected regions (widget placeholders, anything
//! flagged `contenteditable="false"`), so placeholder internals stay inert.
//!
//! Idempotent: a second pass adds no new markers and no second style block.

use smallvec::SmallVec;

use crate::dom::{self, Document, Element, Node};
use crate::widget::PLACEHOLDER_ATTR;

/// Marker attribute identifying elements this engine made editable.
pub const EDITABLE_ATTR: &str = "data-editable";

/// Pre-edit text snapshot, kept for recovery until save strips it.
pub const ORIGINAL_TEXT_ATTR: &str = "data-original-text";

/// Cosmetic affordance class (hover/focus outline).
pub const EDITABLE_CLASS: &str = "rt-editable";

/// Id of the injected affordance stylesheet.
pub const STYLE_ID: &str = "rt-editable-style";

/// Allow-list of leaf text-bearing tags.
const EDITABLE_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "span", "a", "li", "td", "th", "div",
];

/// Hover/focus affordances for marked elements. Purely cosmetic; the whole
/// block is removed before save.
const AFFORDANCE_CSS: &str = "\
.rt-editable:hover{outline:1px dashed #4a90d9;outline-offset:2px;cursor:text;}\
.rt-editable:focus{outline:2px solid #4a90d9;outline-offset:2px;}";

/// Marks text-bearing elements editable and undoes it on save.
#[derive(Debug, Default)]
pub struct EditabilityInjector;

impl EditabilityInjector {
    /// Tag eligible elements in a parsed document.
    pub fn make_editable_doc(doc: &mut Document) {
        let mut marked_any = false;
        for node in &mut doc.children {
            tag_node(node, &mut marked_any);
        }

        if marked_any {
            inject_affordance_style(doc);
        }
    }

    /// String-level convenience: tag raw HTML.
    pub fn make_editable(html: &str) -> String {
        let mut doc = dom::parse(html);
        Self::make_editable_doc(&mut doc);
        dom::render(&doc)
    }

    /// Remove every injected marker, snapshot and affordance.
    pub fn strip_doc(doc: &mut Document) {
        remove_affordance_style(&mut doc.children);
        doc.for_each_element_mut(&mut |elem| {
            if elem.has_attr(EDITABLE_ATTR) {
                elem.remove_attr(EDITABLE_ATTR);
                elem.remove_attr("contenteditable");
                elem.remove_attr(ORIGINAL_TEXT_ATTR);
                elem.remove_class(EDITABLE_CLASS);
            }
        });
    }

    /// String-level convenience: strip raw HTML.
    pub fn strip(html: &str) -> String {
        let mut doc = dom::parse(html);
        Self::strip_doc(&mut doc);
        dom::render(&doc)
    }
}

// =============================================================================
// Tagging pass
// =============================================================================

fn tag_node(node: &mut Node, marked_any: &mut bool) {
    let Node::Element(elem) = node else { return };

    // Protected region: never descend
    if is_protected(elem) {
        return;
    }

    if is_eligible(elem) {
        mark(elem);
        *marked_any = true;
    }

    for child in &mut elem.children {
        tag_node(child, marked_any);
    }
}

/// Widget placeholders and explicit non-editable regions are skipped whole.
fn is_protected(elem: &Element) -> bool {
    elem.has_attr(PLACEHOLDER_ATTR)
        || elem
            .get_attr("contenteditable")
            .is_some_and(|v| v.eq_ignore_ascii_case("false"))
}

fn is_eligible(elem: &Element) -> bool {
    if !EDITABLE_TAGS.contains(&elem.tag.as_str()) {
        return false;
    }
    // Already marked, or author-managed contenteditable
    if elem.has_attr(EDITABLE_ATTR) || elem.has_attr("contenteditable") {
        return false;
    }
    if elem.direct_text().trim().is_empty() {
        return false;
    }
    // Image-led blocks are handled by the image-replace flow, not text editing
    if let Some(Node::Element(first)) = elem.first_meaningful_child() {
        if first.is_tag("img") {
            return false;
        }
    }
    true
}

fn mark(elem: &mut Element) {
    let original = elem.direct_text();
    elem.set_attr("contenteditable", "true");
    elem.set_attr(EDITABLE_ATTR, "true");
    elem.set_attr(ORIGINAL_TEXT_ATTR, original);
    elem.add_class(EDITABLE_CLASS);
}

// =============================================================================
// Affordance stylesheet
// =============================================================================

fn inject_affordance_style(doc: &mut Document) {
    let mut exists = false;
    doc.for_each_element(&mut |elem| {
        if elem.is_tag("style") && elem.get_attr("id") == Some(STYLE_ID) {
            exists = true;
        }
    });
    if exists {
        return;
    }

    let mut style = Element::new("style");
    style.set_attr("id", STYLE_ID);
    style.children.push(Node::Text(AFFORDANCE_CSS.to_string()));
    let style = Node::Element(Box::new(style));

    // Into <head> when there is one, else appended at document level
    match doc.find_element_mut(&|elem| elem.is_tag("head")) {
        Some(head) => head.children.push(style),
        None => doc.children.push(style),
    }
}

fn remove_affordance_style(children: &mut SmallVec<[Node; 4]>) {
    children.retain(|node| {
        !matches!(node, Node::Element(elem)
            if elem.is_tag("style") && elem.get_attr("id") == Some(STYLE_ID))
    });
    for node in children.iter_mut() {
        if let Node::Element(elem) = node {
            remove_affordance_style(&mut elem.children);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_paragraph() {
        let out = EditabilityInjector::make_editable("<p>hello</p>");
        assert!(out.contains(r#"contenteditable="true""#));
        assert!(out.contains(r#"data-editable="true""#));
        assert!(out.contains(r#"data-original-text="hello""#));
        assert!(out.contains(EDITABLE_CLASS));
    }

    #[test]
    fn test_marks_allow_list_only() {
        let out = EditabilityInjector::make_editable("<figcaption>skip me</figcaption>");
        assert!(!out.contains(EDITABLE_ATTR));
    }

    #[test]
    fn test_skips_empty_text() {
        let out = EditabilityInjector::make_editable("<p>   </p><p><b>nested only</b></p>");
        assert!(!out.contains(EDITABLE_ATTR));
    }

    #[test]
    fn test_skips_image_led_block() {
        let out = EditabilityInjector::make_editable(
            r#"<div><img src="hero.png"> caption text</div>"#,
        );
        assert!(!out.contains(EDITABLE_ATTR));
    }

    #[test]
    fn test_skips_non_editable_region() {
        let out = EditabilityInjector::make_editable(
            r#"<div contenteditable="false"><p>locked</p></div>"#,
        );
        assert!(!out.contains(EDITABLE_ATTR));
    }

    #[test]
    fn test_skips_placeholder_subtree() {
        let out = EditabilityInjector::make_editable(
            r#"<div data-widget-placeholder="widget-ph-1"><span>card text</span></div>"#,
        );
        assert!(!out.contains(EDITABLE_ATTR));
    }

    #[test]
    fn test_respects_author_contenteditable() {
        let html = r#"<p contenteditable="true">already editable</p>"#;
        let out = EditabilityInjector::make_editable(html);
        // Not ours to manage: no marker added, no snapshot taken
        assert!(!out.contains(EDITABLE_ATTR));
    }

    #[test]
    fn test_injects_style_once_into_head() {
        let out = EditabilityInjector::make_editable(
            "<html><head><title>t</title></head><body><p>x</p></body></html>",
        );
        assert_eq!(out.matches(STYLE_ID).count(), 1);
        let head_end = out.find("</head>").unwrap();
        assert!(out.find(STYLE_ID).unwrap() < head_end);
    }

    #[test]
    fn test_no_style_without_marks() {
        let out = EditabilityInjector::make_editable("<b>nothing eligible</b>");
        assert!(!out.contains(STYLE_ID));
    }

    #[test]
    fn test_idempotent() {
        let html = "<html><head></head><body><p>one</p><h2>two</h2></body></html>";
        let once = EditabilityInjector::make_editable(html);
        let twice = EditabilityInjector::make_editable(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_strip_removes_all_markers() {
        let html = "<html><head></head><body><p class=\"lead\">text</p></body></html>";
        let preview = EditabilityInjector::make_editable(html);
        let stripped = EditabilityInjector::strip(&preview);

        assert!(!stripped.contains(EDITABLE_ATTR));
        assert!(!stripped.contains("contenteditable"));
        assert!(!stripped.contains(ORIGINAL_TEXT_ATTR));
        assert!(!stripped.contains(EDITABLE_CLASS));
        assert!(!stripped.contains(STYLE_ID));
        // Author classes survive
        assert!(stripped.contains(r#"class="lead""#));
    }

    #[test]
    fn test_strip_keeps_author_non_editable_flag() {
        let html = r#"<div contenteditable="false"><p>locked</p></div>"#;
        let preview = EditabilityInjector::make_editable(html);
        let stripped = EditabilityInjector::strip(&preview);
        assert!(stripped.contains(r#"contenteditable="false""#));
    }

    #[test]
    fn test_marks_table_cells_and_list_items() {
        let out = EditabilityInjector::make_editable(
            "<table><tr><td>cell</td><th>head</th></tr></table><ul><li>item</li></ul>",
        );
        assert_eq!(out.matches(EDITABLE_ATTR).count(), 3);
    }
}
