//! HTML parsing - `tl` nodes into the owned tree.

use smallvec::SmallVec;

use super::{Attrs, Document, Element, Node};

/// Parse an HTML document into an owned tree.
///
/// Never fails outright: unparseable input degrades to a single text node so
/// the pipeline can still round-trip the original bytes.
pub fn parse(html: &str) -> Document {
    let (doctype, body) = split_doctype(html);

    let Ok(dom) = tl::parse(body, tl::ParserOptions::default()) else {
        let mut children = SmallVec::new();
        children.push(Node::Text(body.to_string()));
        return Document {
            doctype: doctype.map(str::to_string),
            children,
        };
    };

    let parser = dom.parser();
    let mut children: SmallVec<[Node; 4]> = SmallVec::new();
    for handle in dom.children() {
        if let Some(node) = convert(*handle, parser) {
            children.push(node);
        }
    }

    Document {
        doctype: doctype.map(str::to_string),
        children,
    }
}

/// Split a leading `<!DOCTYPE ...>` off the input, if present.
fn split_doctype(html: &str) -> (Option<&str>, &str) {
    let trimmed_start = html.len() - html.trim_start().len();
    let rest = &html[trimmed_start..];

    if rest.len() >= 9 && rest[..9].eq_ignore_ascii_case("<!doctype") {
        if let Some(end) = rest.find('>') {
            return (Some(&rest[..=end]), &rest[end + 1..]);
        }
    }
    (None, html)
}

/// Convert a tl node handle to an owned node.
fn convert(handle: tl::NodeHandle, parser: &tl::Parser) -> Option<Node> {
    let node = handle.get(parser)?;

    match node {
        tl::Node::Tag(tag) => {
            let tag_name = tag.name().as_utf8_str().to_lowercase();

            // Collect attributes, preserving order; value-less entries stay
            // boolean so they re-render bare
            let mut attrs = Attrs::default();
            for (key, value) in tag.attributes().iter() {
                let key_str: &str = key.as_ref();
                let key_lower = key_str.to_lowercase();
                match value {
                    Some(v) => attrs.set(&key_lower, v.to_string()),
                    None => attrs.set_flag(&key_lower),
                }
            }

            let mut elem = Element::new(tag_name);
            elem.attrs = attrs;

            let mut children: SmallVec<[Node; 4]> = SmallVec::new();
            for child_handle in tag.children().top().iter() {
                if let Some(child) = convert(*child_handle, parser) {
                    children.push(child);
                }
            }
            elem.children = children;

            Some(Node::Element(Box::new(elem)))
        }
        // Raw source slice, entities intact - kept verbatim (including
        // whitespace-only runs) so unedited content survives the round trip
        tl::Node::Raw(bytes) => Some(Node::Text(bytes.as_utf8_str().to_string())),
        tl::Node::Comment(bytes) => {
            let raw = bytes.as_utf8_str();
            let comment = if raw.starts_with("<!--") {
                raw.to_string()
            } else {
                format!("<!--{raw}-->")
            };
            Some(Node::Comment(comment))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let doc = parse("<p>hello</p>");
        assert_eq!(doc.children.len(), 1);
        let Node::Element(p) = &doc.children[0] else {
            panic!("expected element");
        };
        assert_eq!(p.tag, "p");
        assert_eq!(p.direct_text(), "hello");
    }

    #[test]
    fn test_parse_attributes() {
        let doc = parse(r#"<img src="a.png" width="10">"#);
        let Node::Element(img) = &doc.children[0] else {
            panic!("expected element");
        };
        assert_eq!(img.get_attr("src"), Some("a.png"));
        assert_eq!(img.get_attr("width"), Some("10"));
    }

    #[test]
    fn test_parse_nested() {
        let doc = parse("<div><span>a</span><span>b</span></div>");
        let Node::Element(div) = &doc.children[0] else {
            panic!("expected element");
        };
        assert_eq!(div.children.len(), 2);
    }

    #[test]
    fn test_parse_doctype_split() {
        let doc = parse("<!DOCTYPE html>\n<html><body></body></html>");
        assert_eq!(doc.doctype.as_deref(), Some("<!DOCTYPE html>"));
    }

    #[test]
    fn test_parse_no_doctype() {
        let doc = parse("<p>x</p>");
        assert!(doc.doctype.is_none());
    }

    #[test]
    fn test_parse_keeps_entities_raw() {
        let doc = parse("<p>a &amp; b</p>");
        let Node::Element(p) = &doc.children[0] else {
            panic!("expected element");
        };
        assert_eq!(p.direct_text(), "a &amp; b");
    }

    #[test]
    fn test_parse_keeps_whitespace_text() {
        let doc = parse("<div>\n  <p>x</p>\n</div>");
        let Node::Element(div) = &doc.children[0] else {
            panic!("expected element");
        };
        // whitespace, p, whitespace
        assert_eq!(div.children.len(), 3);
    }

    #[test]
    fn test_parse_lowercases_names() {
        let doc = parse(r#"<IMG SRC="a.png">"#);
        let Node::Element(img) = &doc.children[0] else {
            panic!("expected element");
        };
        assert_eq!(img.tag, "img");
        assert_eq!(img.get_attr("src"), Some("a.png"));
    }
}
