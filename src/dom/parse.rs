//! Markup parsing into the document arena.
//!
//! Uses `scraper` (html5ever) for tolerant HTML parsing and copies the result
//! into [`Document`] nodes. Nested component markers are extracted here as
//! typed [`ChildRef`]s so that mounting never has to look at class names.

use scraper::{Html, Node as HtmlNode};
use thiserror::Error;

use super::{Document, Element, NodeId};
use crate::models::LogicalPath;

/// Class-name prefix marking a placeholder for a nested component.
pub const CHILD_MARKER_SIGIL: char = '$';

/// Markup that could not be turned into a fragment at all.
///
/// Structural problems are repaired by the HTML parser; only undecodable
/// input ends up here.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("markup is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

/// Reference from a parsed fragment to a nested component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRef {
    /// Placeholder element to be replaced by the child's root.
    pub marker: NodeId,
    pub path: LogicalPath,
}

/// Detached top-level nodes produced by a parse, plus discovered children.
#[derive(Debug, Clone, Default)]
pub struct ParsedFragment {
    pub nodes: Vec<NodeId>,
    pub children: Vec<ChildRef>,
    /// Number of recoverable errors the HTML parser reported.
    pub repaired: usize,
}

/// Decode and parse a markup resource.
pub fn parse_markup(doc: &mut Document, bytes: &[u8]) -> Result<ParsedFragment, ParseError> {
    let text = std::str::from_utf8(bytes)?;
    Ok(parse_fragment(doc, text))
}

/// Parse markup text into detached nodes owned by `doc`.
pub fn parse_fragment(doc: &mut Document, text: &str) -> ParsedFragment {
    let html = Html::parse_fragment(text);
    let mut fragment = ParsedFragment {
        repaired: html.errors.len(),
        ..Default::default()
    };

    // parse_fragment wraps everything in a synthetic <html> element.
    let top: Vec<_> = html.root_element().children().collect();
    let mut stack: Vec<_> = top.into_iter().rev().map(|n| (n, None)).collect();

    while let Some((source, parent)) = stack.pop() {
        let node = match source.value() {
            HtmlNode::Text(text) => doc.create_text(text.text.to_string()),
            HtmlNode::Comment(comment) => doc.create_comment(comment.comment.to_string()),
            HtmlNode::Element(el) => {
                let mut element = Element::new(el.name());
                for (name, value) in el.attrs() {
                    element.set_attr(name, value);
                }
                let marker = child_marker(&element);
                let node = doc.push_element(element);
                if let Some(path) = marker {
                    fragment.children.push(ChildRef { marker: node, path });
                }
                node
            }
            _ => continue,
        };

        match parent {
            Some(parent) => doc.append_child(parent, node),
            None => fragment.nodes.push(node),
        }

        let children: Vec<_> = source.children().collect();
        for child in children.into_iter().rev() {
            stack.push((child, Some(node)));
        }
    }

    fragment
}

fn child_marker(element: &Element) -> Option<LogicalPath> {
    let class = element
        .classes()
        .find_map(|c| c.strip_prefix(CHILD_MARKER_SIGIL))?;

    match LogicalPath::parse(class) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::warn!("Ignoring malformed child marker {:?}: {}", class, e);
            None
        }
    }
}
