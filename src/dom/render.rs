//! Serialization of document subtrees.

use super::{Document, NodeId, NodeKind};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Serialize a subtree as HTML.
pub fn to_html(doc: &Document, node: NodeId) -> String {
    let mut output = String::new();
    write_node(doc, node, &mut output);
    output
}

fn write_node(doc: &Document, node: NodeId, output: &mut String) {
    match doc.kind(node) {
        NodeKind::Text(text) => output.push_str(&escape(text, false)),
        NodeKind::Comment(text) => {
            output.push_str("<!--");
            output.push_str(text);
            output.push_str("-->");
        }
        NodeKind::Element(el) => {
            output.push('<');
            output.push_str(&el.tag);
            for (name, value) in el.attrs() {
                output.push(' ');
                output.push_str(name);
                output.push_str("=\"");
                output.push_str(&escape(value, true));
                output.push('"');
            }
            output.push('>');

            if VOID_ELEMENTS.contains(&el.tag.as_str()) {
                return;
            }

            // Raw-text elements keep their contents verbatim.
            if el.tag == "style" || el.tag == "script" {
                output.push_str(&doc.text_content(node));
            } else {
                for child in doc.children(node) {
                    write_node(doc, *child, output);
                }
            }

            output.push_str("</");
            output.push_str(&el.tag);
            output.push('>');
        }
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the element structure of a subtree as an ASCII tree.
///
/// Example output:
/// ```text
/// body
/// ├── nav#navbar
/// │   └── ul.links
/// └── div#container
///     └── h1.title
/// ```
pub fn outline(doc: &Document, node: NodeId) -> String {
    let mut output = String::new();
    outline_node(doc, node, "", true, true, &mut output);
    output
}

fn label(doc: &Document, node: NodeId) -> Option<String> {
    let el = doc.element(node)?;
    let mut label = el.tag.clone();
    if let Some(id) = el.id() {
        label.push('#');
        label.push_str(id);
    }
    for class in el.classes() {
        label.push('.');
        label.push_str(class);
    }
    Some(label)
}

fn outline_node(
    doc: &Document,
    node: NodeId,
    prefix: &str,
    is_last: bool,
    is_root: bool,
    output: &mut String,
) {
    let Some(text) = label(doc, node) else {
        return;
    };

    if is_root {
        output.push_str(&text);
    } else {
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
        output.push_str(&text);
    }
    output.push('\n');

    let child_prefix = if is_root {
        String::new()
    } else {
        let continuation = if is_last { "    " } else { "│   " };
        format!("{}{}", prefix, continuation)
    };

    let elements: Vec<NodeId> = doc
        .children(node)
        .iter()
        .copied()
        .filter(|c| doc.element(*c).is_some())
        .collect();
    for (i, child) in elements.iter().enumerate() {
        let child_is_last = i == elements.len() - 1;
        outline_node(doc, *child, &child_prefix, child_is_last, false, output);
    }
}
