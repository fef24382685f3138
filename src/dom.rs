//! In-memory live DOM.
//!
//! Pages are parsed with `scraper` (html5ever) and copied into an arena of
//! nodes addressed by [`NodeId`] handles, so elements can be matched,
//! rewritten and restored in place, then serialized back to HTML through
//! html5ever's serializer.
//!
//! The rest of the crate only talks to the page through the [`Dom`] trait.

use std::io;

use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use html5ever::{LocalName, Namespace, QualName};
use scraper::{ElementRef, Html, Node as HtmlNode};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Opaque handle to a node of a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Interaction handlers the rewriter attaches to page nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    /// Click on a single word unit
    WordClick,
    /// Modifier+click on a whole translated block
    SentenceClick,
}

/// The narrow interface the matcher, rewriter and interaction controller
/// require from a page.
pub trait Dom {
    /// The `<body>` element (matching never climbs past it)
    fn body(&self) -> NodeId;

    /// The `<html>` element
    fn document_element(&self) -> NodeId;

    /// Connected elements with one of the given tag names, in document order
    fn elements_by_tag(&self, tags: &[&str]) -> Vec<NodeId>;

    fn tag_name(&self, node: NodeId) -> Option<&str>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn element_children(&self, node: NodeId) -> Vec<NodeId>;

    /// All descendants of `node` (excluding itself) in document order
    fn descendants(&self, node: NodeId) -> Vec<NodeId>;

    /// Concatenated text of all descendant text nodes
    fn text_content(&self, node: NodeId) -> String;

    /// Replace all children with a single text node
    fn set_text_content(&mut self, node: NodeId, text: &str);

    /// Whether the node is still attached to the document
    fn is_connected(&self, node: NodeId) -> bool;

    fn metadata(&self, node: NodeId, key: &str) -> Option<&str>;

    fn set_metadata(&mut self, node: NodeId, key: &str, value: &str);

    fn remove_metadata(&mut self, node: NodeId, key: &str);

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    fn add_class(&mut self, node: NodeId, class: &str);

    fn remove_class(&mut self, node: NodeId, class: &str);

    /// The `class` attribute exactly as written, for a later
    /// [`Dom::set_class_attribute`]
    fn class_attribute(&self, node: NodeId) -> Option<&str>;

    /// Put back a value read with [`Dom::class_attribute`]; `None` removes
    /// the attribute
    fn set_class_attribute(&mut self, node: NodeId, value: Option<&str>);

    fn add_listener(&mut self, node: NodeId, listener: Listener);

    fn remove_listener(&mut self, node: NodeId, listener: Listener);

    fn has_listener(&self, node: NodeId, listener: Listener) -> bool;

    /// Detach and return all children of `node`
    fn take_children(&mut self, node: NodeId) -> Vec<NodeId>;

    /// Detach the current children of `node` and attach `children` instead
    fn replace_children(&mut self, node: NodeId, children: Vec<NodeId>);

    fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId;

    fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId;

    /// Nearest inclusive ancestor carrying `class`
    fn closest_with_class(&self, node: NodeId, class: &str) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.has_class(id, class) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Document,
    Doctype(String),
    Element {
        name: QualName,
        attrs: Vec<(QualName, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<Listener>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }
}

/// Arena-backed HTML document.
///
/// Nodes are never freed: detached subtrees (replaced word units, removed
/// stylesheets) stay allocated until the document is dropped, so each
/// translate/restore cycle grows the arena by the size of its rewrite.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    body: NodeId,
    html: NodeId,
}

impl Document {
    /// Parse a full HTML page
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut doc = Document {
            nodes: vec![Node::new(NodeData::Document)],
            body: NodeId(0),
            html: NodeId(0),
        };

        let root = doc.root();
        for child in parsed.tree.root().children() {
            match ElementRef::wrap(child) {
                Some(el) => doc.import_element(el, root),
                None => doc.import_leaf(child.value(), root),
            }
        }

        doc.html = doc
            .children_of(root)
            .into_iter()
            .find(|&id| doc.tag_name(id) == Some("html"))
            .unwrap_or(root);
        doc.body = doc
            .children_of(doc.html)
            .into_iter()
            .find(|&id| doc.tag_name(id) == Some("body"))
            .unwrap_or(doc.html);
        doc
    }

    fn import_element(&mut self, el: ElementRef<'_>, parent: NodeId) {
        let id = self.push(NodeData::Element {
            name: el.value().name.clone(),
            attrs: el
                .value()
                .attrs()
                .map(|(k, v)| (attribute_name(k), v.to_string()))
                .collect(),
        });
        self.attach(parent, id);

        for child in el.children() {
            match ElementRef::wrap(child) {
                Some(child_el) => self.import_element(child_el, id),
                None => self.import_leaf(child.value(), id),
            }
        }
    }

    fn import_leaf(&mut self, node: &HtmlNode, parent: NodeId) {
        let data = match node {
            HtmlNode::Doctype(doctype) => NodeData::Doctype(doctype.name().to_string()),
            HtmlNode::Comment(comment) => NodeData::Comment(comment.comment.to_string()),
            HtmlNode::Text(text) => NodeData::Text(text.text.to_string()),
            _ => return,
        };
        let id = self.push(data);
        self.attach(parent, id);
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Text of the `<title>` element, if any
    pub fn title(&self) -> Option<String> {
        self.elements_by_tag(&["title"])
            .first()
            .map(|&id| self.text_content(id).trim().to_string())
            .filter(|t| !t.is_empty())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| &*k.local == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data {
            match attrs.iter_mut().find(|(k, _)| &*k.local == name) {
                Some(entry) => entry.1 = value.to_string(),
                None => attrs.push((attribute_name(name), value.to_string())),
            }
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data {
            attrs.retain(|(k, _)| &*k.local != name);
        }
    }

    /// Remove `node` from its parent; the subtree stays in the arena
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    /// Serialize the whole document
    pub fn to_html(&self) -> String {
        self.render(self.root(), TraversalScope::ChildrenOnly(None))
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        let parent = match &self.nodes[node.0].data {
            NodeData::Element { name, .. } => Some(name.clone()),
            _ => None,
        };
        self.render(node, TraversalScope::ChildrenOnly(parent))
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        self.render(node, TraversalScope::IncludeNode)
    }

    fn render(&self, node: NodeId, scope: TraversalScope) -> String {
        let mut buf = Vec::new();
        let opts = SerializeOpts {
            traversal_scope: scope,
            ..SerializeOpts::default()
        };
        if let Err(e) = serialize(&mut buf, &Subtree { doc: self, node }, opts) {
            log::warn!("Failed to serialize node {:?}: {}", node, e);
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn write_node<S: Serializer>(&self, node: NodeId, serializer: &mut S) -> io::Result<()> {
        match &self.nodes[node.0].data {
            NodeData::Document => self.write_children(node, serializer),
            NodeData::Doctype(name) => serializer.write_doctype(name),
            NodeData::Comment(text) => serializer.write_comment(text),
            NodeData::Text(text) => serializer.write_text(text),
            NodeData::Element { name, attrs } => {
                serializer.start_elem(name.clone(), attrs.iter().map(|(k, v)| (k, v.as_str())))?;
                self.write_children(node, serializer)?;
                serializer.end_elem(name.clone())
            }
        }
    }

    fn write_children<S: Serializer>(&self, node: NodeId, serializer: &mut S) -> io::Result<()> {
        for &child in &self.nodes[node.0].children {
            self.write_node(child, serializer)?;
        }
        Ok(())
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node::new(data));
        NodeId(self.nodes.len() - 1)
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    fn children_of(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes[node.0].children.clone()
    }

    fn collect_descendants(&self, node: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.nodes[node.0].children {
            out.push(child);
            self.collect_descendants(child, out);
        }
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Comment(_) | NodeData::Doctype(_) => {}
            _ => {
                for &child in &self.nodes[node.0].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    fn class_list(&self, node: NodeId) -> Vec<&str> {
        self.attribute(node, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }
}

impl Dom for Document {
    fn body(&self) -> NodeId {
        self.body
    }

    fn document_element(&self) -> NodeId {
        self.html
    }

    fn elements_by_tag(&self, tags: &[&str]) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.tag_name(id).map(|t| tags.contains(&t)).unwrap_or(false))
            .collect()
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { name, .. } => Some(&*name.local),
            _ => None,
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes[node.0]
            .children
            .iter()
            .copied()
            .filter(|&id| self.tag_name(id).is_some())
            .collect()
    }

    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(node, &mut out);
        out
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn set_text_content(&mut self, node: NodeId, text: &str) {
        self.take_children(node);
        if !text.is_empty() {
            self.append_text(node, text);
        }
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root() {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn metadata(&self, node: NodeId, key: &str) -> Option<&str> {
        self.attribute(node, &format!("data-{}", key))
    }

    fn set_metadata(&mut self, node: NodeId, key: &str, value: &str) {
        self.set_attribute(node, &format!("data-{}", key), value);
    }

    fn remove_metadata(&mut self, node: NodeId, key: &str) {
        self.remove_attribute(node, &format!("data-{}", key));
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.class_list(node).contains(&class)
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if self.tag_name(node).is_none() || self.has_class(node, class) {
            return;
        }
        let value = match self.attribute(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attribute(node, "class", &value);
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        let remaining: Vec<&str> = self
            .class_list(node)
            .into_iter()
            .filter(|&c| c != class)
            .collect();
        if remaining.is_empty() {
            self.remove_attribute(node, "class");
        } else {
            let value = remaining.join(" ");
            self.set_attribute(node, "class", &value);
        }
    }

    fn class_attribute(&self, node: NodeId) -> Option<&str> {
        self.attribute(node, "class")
    }

    fn set_class_attribute(&mut self, node: NodeId, value: Option<&str>) {
        match value {
            Some(value) => self.set_attribute(node, "class", value),
            None => self.remove_attribute(node, "class"),
        }
    }

    fn add_listener(&mut self, node: NodeId, listener: Listener) {
        let listeners = &mut self.nodes[node.0].listeners;
        if !listeners.contains(&listener) {
            listeners.push(listener);
        }
    }

    fn remove_listener(&mut self, node: NodeId, listener: Listener) {
        self.nodes[node.0].listeners.retain(|&l| l != listener);
    }

    fn has_listener(&self, node: NodeId, listener: Listener) -> bool {
        self.nodes[node.0].listeners.contains(&listener)
    }

    fn take_children(&mut self, node: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for &child in &children {
            self.nodes[child.0].parent = None;
        }
        children
    }

    fn replace_children(&mut self, node: NodeId, children: Vec<NodeId>) {
        self.take_children(node);
        for child in children {
            if let Some(old_parent) = self.nodes[child.0].parent {
                self.nodes[old_parent.0].children.retain(|&c| c != child);
            }
            self.attach(node, child);
        }
    }

    fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.push(NodeData::Element {
            name: QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag)),
            attrs: Vec::new(),
        });
        self.attach(parent, id);
        id
    }

    fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.push(NodeData::Text(text.to_string()));
        self.attach(parent, id);
        id
    }
}

fn attribute_name(name: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(name))
}

/// A node and its subtree as html5ever sees them
struct Subtree<'a> {
    doc: &'a Document,
    node: NodeId,
}

impl Serialize for Subtree<'_> {
    fn serialize<S: Serializer>(&self, serializer: &mut S, scope: TraversalScope) -> io::Result<()> {
        match scope {
            TraversalScope::IncludeNode => self.doc.write_node(self.node, serializer),
            TraversalScope::ChildrenOnly(_) => self.doc.write_children(self.node, serializer),
        }
    }
}
