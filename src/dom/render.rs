//! HTML serialization - owned tree back to markup.

use super::{Document, Element, Node, escape_attr_value, is_void_element};

/// Serialize a document back to HTML.
pub fn render(doc: &Document) -> String {
    let mut out = String::with_capacity(1024);
    if let Some(doctype) = &doc.doctype {
        out.push_str(doctype);
    }
    for node in &doc.children {
        render_node(node, &mut out);
    }
    out
}

fn render_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(elem) => render_element(elem, out),
        // Source text is stored pre-encoded; emit verbatim
        Node::Text(text) => out.push_str(text),
        Node::Comment(comment) => out.push_str(comment),
    }
}

fn render_element(elem: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&elem.tag);

    for (name, value) in elem.attrs.iter() {
        out.push(' ');
        out.push_str(name);
        if let Some(value) = value {
            out.push_str("=\"");
            out.push_str(&escape_attr_value(value));
            out.push('"');
        }
    }
    out.push('>');

    if is_void_element(&elem.tag) {
        return;
    }

    for child in &elem.children {
        render_node(child, out);
    }

    out.push_str("</");
    out.push_str(&elem.tag);
    out.push('>');
}
