//! Lightweight owned HTML tree.
//!
//! The transform passes need a real parse tree, not regex passes over
//! strings: `parse()` builds an owned [`Node`] tree via the `tl` parser,
//! passes mutate it in place, and `render()` serializes it back.
//!
//! Fidelity rules:
//! - Text and comment nodes hold the raw source slice (entities intact) and
//!   are re-emitted verbatim, so unedited content round-trips unchanged.
//! - Attribute values are re-emitted with only `"` escaped; values the engine
//!   synthesizes itself must be pre-escaped with [`escape`].
//! - Tag and attribute names are lowercased (semantically equivalent per the
//!   HTML spec).

mod parse;
mod render;

use smallvec::SmallVec;
use std::borrow::Cow;

pub use parse::parse;
pub use render::render;

// =============================================================================
// Tree types
// =============================================================================

/// A parsed HTML document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Leading doctype declaration, re-emitted verbatim.
    pub doctype: Option<String>,
    pub children: SmallVec<[Node; 4]>,
}

/// One node of the tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Box<Element>),
    /// Raw text exactly as it appeared in the source (entities intact).
    Text(String),
    /// Comment, stored with its `<!-- -->` delimiters.
    Comment(String),
}

/// An element with ordered attributes and children
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Attrs,
    pub children: SmallVec<[Node; 4]>,
}

impl Element {
    /// Create an element with no attributes or children.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Attrs::default(),
            children: SmallVec::new(),
        }
    }

    #[inline]
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag == tag
    }

    #[inline]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name)
    }

    #[inline]
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        self.attrs.set(name, value);
    }

    #[inline]
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.attrs.remove(name)
    }

    #[inline]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.has(name)
    }

    /// Concatenated direct text children (not descendants).
    pub fn direct_text(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            if let Node::Text(t) = child {
                text.push_str(t);
            }
        }
        text
    }

    /// First child that is not whitespace-only text or a comment.
    pub fn first_meaningful_child(&self) -> Option<&Node> {
        self.children.iter().find(|child| match child {
            Node::Text(t) => !t.trim().is_empty(),
            Node::Comment(_) => false,
            Node::Element(_) => true,
        })
    }

    /// Check for a whitespace-separated class token.
    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class))
    }

    /// Append a class token if not already present.
    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        match self.get_attr("class") {
            Some(existing) if !existing.trim().is_empty() => {
                let merged = format!("{existing} {class}");
                self.set_attr("class", merged);
            }
            _ => self.set_attr("class", class),
        }
    }

    /// Remove a class token; drops the attribute when it becomes empty.
    pub fn remove_class(&mut self, class: &str) {
        let Some(existing) = self.get_attr("class") else {
            return;
        };
        let remaining: Vec<&str> = existing
            .split_ascii_whitespace()
            .filter(|c| *c != class)
            .collect();
        if remaining.is_empty() {
            self.remove_attr("class");
        } else {
            let joined = remaining.join(" ");
            self.set_attr("class", joined);
        }
    }
}

// =============================================================================
// Attributes
// =============================================================================

/// Ordered attribute list. `None` values are boolean attributes (`disabled`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attrs(Vec<(String, Option<String>)>);

impl Attrs {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Set a value, replacing an existing entry in place (order preserved).
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = Some(value),
            None => self.0.push((name.to_string(), Some(value))),
        }
    }

    /// Set a boolean (value-less) attribute.
    pub fn set_flag(&mut self, name: &str) {
        if !self.has(name) {
            self.0.push((name.to_string(), None));
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.0.iter().position(|(k, _)| k == name)?;
        self.0.remove(idx).1
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.iter().any(|(k, _)| k == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Attrs {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), Some(v.to_string())))
                .collect(),
        )
    }
}

// =============================================================================
// Escaping and element classification
// =============================================================================

/// Escape HTML special characters in synthesized text content.
///
/// Uses `Cow` to avoid allocation when no escaping is needed. Only for text
/// the engine creates itself - source text is stored pre-encoded.
pub fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['<', '>', '&', '"', '\'']) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Quote-escape an attribute value for double-quoted serialization.
///
/// Leaves `&` alone so source-encoded entities survive the round trip.
pub fn escape_attr_value(s: &str) -> Cow<'_, str> {
    if !s.contains('"') {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.replace('"', "&quot;"))
}

/// Check if an HTML tag is a void element (no closing tag).
#[inline]
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

// =============================================================================
// Traversal
// =============================================================================

impl Document {
    /// Pre-order visit of every element, mutably.
    pub fn for_each_element_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        for node in &mut self.children {
            visit_mut(node, f);
        }
    }

    /// Pre-order visit of every element.
    pub fn for_each_element(&self, f: &mut impl FnMut(&Element)) {
        for node in &self.children {
            visit(node, f);
        }
    }

    /// Find the first element matching a predicate, mutably.
    pub fn find_element_mut(
        &mut self,
        pred: &impl Fn(&Element) -> bool,
    ) -> Option<&mut Element> {
        for node in &mut self.children {
            if let Some(found) = find_mut(node, pred) {
                return Some(found);
            }
        }
        None
    }
}

fn visit_mut(node: &mut Node, f: &mut impl FnMut(&mut Element)) {
    if let Node::Element(elem) = node {
        f(elem);
        for child in &mut elem.children {
            visit_mut(child, f);
        }
    }
}

fn visit(node: &Node, f: &mut impl FnMut(&Element)) {
    if let Node::Element(elem) = node {
        f(elem);
        for child in &elem.children {
            visit(child, f);
        }
    }
}

fn find_mut<'a>(
    node: &'a mut Node,
    pred: &impl Fn(&Element) -> bool,
) -> Option<&'a mut Element> {
    let Node::Element(elem) = node else {
        return None;
    };
    if pred(elem) {
        return Some(elem);
    }
    for child in &mut elem.children {
        if let Some(found) = find_mut(child, pred) {
            return Some(found);
        }
    }
    None
}

// =============================================================================
// Tests
// =============================================================================
