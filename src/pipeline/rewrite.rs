//! URL rewrite passes over the parse tree.
//!
//! The forward pass swaps every relative reference for its absolute URL so
//! the preview loads real assets; the reverse pass strips those prefixes
//! again. Both touch the same attribute set the scanner reads, plus
//! `url(...)` occurrences in stylesheet text, and nothing else - widget
//! placeholders and page links stay untouched.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom::{Document, Element, Node};
use crate::resolve::PathResolver;
use crate::scan::MEDIA_TAGS;

/// `url(...)` with its quote style captured, so rewrites keep it.
static CSS_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url\(\s*(['"]?)([^'")\s]+)['"]?\s*\)"#).unwrap());

/// Forward pass: raw references -> absolute URLs.
pub fn resolve_pass(doc: &mut Document, resolver: &PathResolver) {
    rewrite_refs(doc, &|value| Some(resolver.resolve(value)));
}

/// Reverse pass: absolute URLs under the storage root -> original form.
pub fn revert_pass(doc: &mut Document, resolver: &PathResolver) {
    rewrite_refs(doc, &|value| resolver.revert(value));
}

/// Apply `f` to every asset-position reference. `None` leaves the value as
/// it stands.
fn rewrite_refs(doc: &mut Document, f: &impl Fn(&str) -> Option<String>) {
    doc.for_each_element_mut(&mut |elem| {
        match elem.tag.as_str() {
            "link" => rewrite_attr(elem, "href", f),
            "script" | "img" => rewrite_attr(elem, "src", f),
            "style" => rewrite_style_text(elem, f),
            tag if MEDIA_TAGS.contains(&tag) => rewrite_attr(elem, "src", f),
            _ => {}
        }

        if elem.has_attr("style") {
            rewrite_attr_css(elem, f);
        }
    });
}

fn rewrite_attr(elem: &mut Element, attr: &str, f: &impl Fn(&str) -> Option<String>) {
    let Some(value) = elem.get_attr(attr) else {
        return;
    };
    if let Some(rewritten) = f(value) {
        if rewritten != value {
            elem.set_attr(attr, rewritten);
        }
    }
}

fn rewrite_style_text(elem: &mut Element, f: &impl Fn(&str) -> Option<String>) {
    for child in &mut elem.children {
        if let Node::Text(css) = child {
            let rewritten = rewrite_css(css, f);
            if rewritten != *css {
                *css = rewritten;
            }
        }
    }
}

fn rewrite_attr_css(elem: &mut Element, f: &impl Fn(&str) -> Option<String>) {
    let Some(css) = elem.get_attr("style") else {
        return;
    };
    let rewritten = rewrite_css(css, f);
    if rewritten != css {
        elem.set_attr("style", rewritten);
    }
}

/// Rewrite each `url(...)` reference in CSS text, preserving quote style.
fn rewrite_css(css: &str, f: &impl Fn(&str) -> Option<String>) -> String {
    CSS_URL_RE
        .replace_all(css, |caps: &regex::Captures<'_>| {
            let quote = &caps[1];
            let raw = &caps[2];
            match f(raw) {
                Some(rewritten) => format!("url({quote}{rewritten}{quote})"),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

// =============================================================================
// Tests
// =============================================================================
