//! In-process document model.
//!
//! The live document is an arena of nodes addressed by [`NodeId`]. Nodes are
//! never freed: detaching a subtree only unlinks it from its parent, so a
//! component can keep owning its fragment while it is not mounted and
//! re-attach the very same nodes later.

mod parse;
mod render;

use std::cell::RefCell;
use std::rc::Rc;

pub use parse::*;
pub use render::*;

/// Handle to the document shared on the event loop.
pub type SharedDocument = Rc<RefCell<Document>>;

/// Index of a node in the document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let joined = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr("class", joined);
    }

    pub fn remove_class(&mut self, class: &str) {
        if !self.has_class(class) {
            return;
        }
        let remaining: Vec<&str> = self.classes().filter(|c| *c != class).collect();
        let joined = remaining.join(" ");
        self.set_attr("class", joined);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Loaded content of an embedded object (its content document).
    content: Option<NodeId>,
}

/// Arena-backed document with a fixed `html > head + body` skeleton.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    scroll_target: Option<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            scroll_target: None,
        };
        let root = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.append_child(root, head);
        doc.append_child(root, body);
        doc.root = root;
        doc.head = head;
        doc.body = body;
        doc
    }

    pub fn shared(self) -> SharedDocument {
        Rc::new(RefCell::new(self))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
            content: None,
        });
        id
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(Element::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment(text.into()))
    }

    pub(crate) fn push_element(&mut self, element: Element) -> NodeId {
        self.push(NodeKind::Element(element))
    }

    pub fn kind(&self, node: NodeId) -> &NodeKind {
        &self.nodes[node.0].kind
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        match &self.nodes[node.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[node.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Append `child` as the last child of `parent`, moving it if attached elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Unlink a node from its parent. The subtree stays intact.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    /// Put `new` where `old` is and detach `old`.
    ///
    /// Returns `false` (and leaves both untouched) when `old` has no parent.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> bool {
        let Some(parent) = self.nodes[old.0].parent else {
            return false;
        };
        if old == new {
            return true;
        }
        self.detach(new);
        let Some(position) = self.nodes[parent.0].children.iter().position(|c| *c == old) else {
            return false;
        };
        self.nodes[parent.0].children[position] = new;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[old.0].parent = None;
        true
    }

    /// Whether the node is reachable from the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// The node and all of its descendants in document order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            out.push(current);
            for child in self.nodes[current.0].children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// First attached element carrying the given id.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.element(*n).and_then(Element::id) == Some(id))
    }

    /// First element with the given tag inside `node` (inclusive).
    pub fn find_by_tag(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(node)
            .into_iter()
            .find(|n| self.element(*n).is_some_and(|el| el.tag == tag))
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for n in self.descendants(node) {
            if let NodeKind::Text(text) = &self.nodes[n.0].kind {
                out.push_str(text);
            }
        }
        out
    }

    /// Replace every child of `node` with a single text node.
    pub fn set_text_content(&mut self, node: NodeId, text: impl Into<String>) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        let text = self.create_text(text);
        self.append_child(node, text);
    }

    pub fn scroll_into_view(&mut self, node: NodeId) {
        self.scroll_target = Some(node);
    }

    /// Last node scrolled into view, if any.
    pub fn scroll_target(&self) -> Option<NodeId> {
        self.scroll_target
    }

    pub fn set_object_content(&mut self, object: NodeId, content: NodeId) {
        self.nodes[object.0].content = Some(content);
    }

    pub fn object_content(&self, object: NodeId) -> Option<NodeId> {
        self.nodes[object.0].content
    }

    /// Value of a custom property declared for `:root`.
    ///
    /// Declarations in attached `<style>` elements are applied in document
    /// order, then the root element's inline `style`; the last one wins.
    pub fn computed_root_property(&self, name: &str) -> Option<String> {
        let mut value = None;

        for node in self.descendants(self.root) {
            let Some(el) = self.element(node) else {
                continue;
            };
            if el.tag != "style" {
                continue;
            }
            let css = self.text_content(node);
            for block in root_blocks(&css) {
                if let Some(found) = declaration(block, name) {
                    value = Some(found);
                }
            }
        }

        if let Some(inline) = self.element(self.root).and_then(|el| el.attr("style")) {
            if let Some(found) = declaration(inline, name) {
                value = Some(found);
            }
        }

        value
    }
}

/// Bodies of every rule whose selector list includes `:root`.
fn root_blocks(css: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = css;
    while let Some(open) = rest.find('{') {
        let selector = &rest[..open];
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        let body = &rest[open + 1..open + close];
        let selector = selector.rsplit(['}', ';']).next().unwrap_or(selector);
        if selector.split(',').any(|s| s.trim() == ":root") {
            blocks.push(body);
        }
        rest = &rest[open + close + 1..];
    }
    blocks
}

fn declaration(block: &str, name: &str) -> Option<String> {
    let mut value = None;
    for decl in block.split(';') {
        if let Some((key, val)) = decl.split_once(':') {
            if key.trim() == name {
                value = Some(val.trim().to_string());
            }
        }
    }
    value
}
