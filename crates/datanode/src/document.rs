//! The document tree host.
//!
//! Nodes are addressed by paths of child indices from the document root.
//! Paths descend through elements, pending placeholders and rendered results
//! alike.

use datanode_markup::node::push_line;
use datanode_render::{
    DataNode, DebugReport, Kind, MarkupParseError, MarkupParser, Node, Placeholder,
    PlaceholderData,
};

use crate::error::DocumentError;

/// A path of child indices from the document root.
pub type NodePath = Vec<usize>;

/// One document: a name and its top-level nodes.
#[derive(Debug, Clone, Default)]
pub struct Document {
    name: String,
    children: Vec<Node>,
}

impl Document {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Parses `text` as the document body.
    ///
    /// Parser diagnostics are appended as message nodes.
    pub fn from_markup(
        name: impl Into<String>,
        text: &str,
        parser: &dyn MarkupParser,
    ) -> Result<Self, MarkupParseError> {
        let parsed = parser.parse_block(text)?;
        let mut children = parsed.nodes;
        children.extend(parsed.diagnostics.into_iter().map(Node::Message));
        Ok(Self {
            name: name.into(),
            children,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    pub fn get(&self, path: &[usize]) -> Option<&Node> {
        let (last, parents) = path.split_last()?;
        let mut siblings = self.children.as_slice();
        for idx in parents {
            siblings = child_nodes(siblings.get(*idx)?);
        }
        siblings.get(*last)
    }

    pub fn get_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (last, parents) = path.split_last()?;
        self.siblings_mut(parents)?.get_mut(*last)
    }

    /// Inserts `node` so that it ends up at `path`.
    pub fn insert(&mut self, path: &[usize], node: Node) -> Result<(), DocumentError> {
        let (last, parents) = path.split_last().ok_or_else(|| invalid(path))?;
        let siblings = self.siblings_mut(parents).ok_or_else(|| invalid(path))?;
        if *last > siblings.len() {
            return Err(invalid(path));
        }
        siblings.insert(*last, node);
        Ok(())
    }

    pub fn remove(&mut self, path: &[usize]) -> Result<Node, DocumentError> {
        let (last, parents) = path.split_last().ok_or_else(|| invalid(path))?;
        let siblings = self.siblings_mut(parents).ok_or_else(|| invalid(path))?;
        if *last >= siblings.len() {
            return Err(invalid(path));
        }
        Ok(siblings.remove(*last))
    }

    /// Replaces the node at `path`, returning the old one.
    pub fn replace(&mut self, path: &[usize], node: Node) -> Result<Node, DocumentError> {
        let slot = self.get_mut(path).ok_or_else(|| invalid(path))?;
        Ok(std::mem::replace(slot, node))
    }

    /// Removes the pending placeholder at `path`.
    ///
    /// The slot is left holding an empty text node; callers are expected to
    /// [`replace`](Self::replace) it with the rendered output.
    pub fn take_pending(&mut self, path: &[usize]) -> Result<Placeholder, DocumentError> {
        let slot = self.get_mut(path).ok_or_else(|| invalid(path))?;
        if !matches!(slot, Node::Ext(DataNode::Pending(_))) {
            return Err(DocumentError::NotPending {
                path: path.to_vec(),
            });
        }
        match std::mem::replace(slot, Node::text("")) {
            Node::Ext(DataNode::Pending(placeholder)) => Ok(*placeholder),
            other => {
                *slot = other;
                Err(DocumentError::NotPending {
                    path: path.to_vec(),
                })
            }
        }
    }

    /// Paths of every node matching `pred`, in document order.
    pub fn find_all<F>(&self, pred: F) -> Vec<NodePath>
    where
        F: Fn(&Node) -> bool,
    {
        let mut found = Vec::new();
        let mut path = Vec::new();
        collect(&self.children, &pred, &mut path, &mut found);
        found
    }

    /// Paths of every element of `kind`.
    pub fn find_kind(&self, kind: Kind) -> Vec<NodePath> {
        self.find_all(|n| n.is_kind(kind))
    }

    /// Paths of every placeholder still waiting for its phase.
    pub fn pending_paths(&self) -> Vec<NodePath> {
        self.find_all(|n| matches!(n, Node::Ext(DataNode::Pending(_))))
    }

    /// Text of every title, in document order.
    ///
    /// A title waiting on its placeholder contributes the name it will render.
    pub fn titles(&self) -> Vec<String> {
        self.find_kind(Kind::Title)
            .iter()
            .filter_map(|path| self.get(path))
            .map(title_text)
            .collect()
    }

    /// Path of the title governing `path`: the closest title before it among
    /// its siblings, then among each ancestor's siblings.
    pub fn title_for(&self, path: &[usize]) -> Option<NodePath> {
        let mut prefix = path.to_vec();
        while let Some(last) = prefix.pop() {
            let siblings = self.children_at(&prefix)?;
            let before = &siblings[..last.min(siblings.len())];
            if let Some(idx) = before.iter().rposition(|n| n.is_kind(Kind::Title)) {
                prefix.push(idx);
                return Some(prefix);
            }
        }
        None
    }

    /// Every debug report in the tree, in document order.
    pub fn reports(&self) -> Vec<&DebugReport> {
        let mut reports = Vec::new();
        walk_reports(&self.children, &mut reports);
        reports
    }

    pub fn pformat(&self) -> String {
        let mut out = String::new();
        push_line(&mut out, 0, &format!("<document source=\"{}\">", self.name));
        for child in &self.children {
            child.pformat_into(&mut out, 1);
        }
        out
    }

    /// Children of the node at `path`; the top-level nodes for an empty path.
    pub fn children_at_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Node>> {
        self.siblings_mut(path)
    }

    /// Path of the closest block container enclosing `path` (empty for the
    /// document root).
    pub fn nearest_container(&self, path: &[usize]) -> NodePath {
        let mut prefix = path.to_vec();
        prefix.pop();
        while !prefix.is_empty() {
            match self.get(&prefix) {
                Some(Node::Element(e)) if is_container(e.kind) => return prefix,
                Some(Node::Ext(DataNode::Rendered(r))) if !r.is_inline() => return prefix,
                _ => {
                    prefix.pop();
                }
            }
        }
        prefix
    }

    fn children_at(&self, path: &[usize]) -> Option<&[Node]> {
        let mut siblings = self.children.as_slice();
        for idx in path {
            siblings = child_nodes(siblings.get(*idx)?);
        }
        Some(siblings)
    }

    fn siblings_mut(&mut self, parents: &[usize]) -> Option<&mut Vec<Node>> {
        let mut siblings = &mut self.children;
        for idx in parents {
            siblings = child_nodes_mut(siblings.get_mut(*idx)?)?;
        }
        Some(siblings)
    }
}

fn invalid(path: &[usize]) -> DocumentError {
    DocumentError::InvalidPath {
        path: path.to_vec(),
    }
}

/// Text of a title node, reading pending placeholders by their name.
pub(crate) fn title_text(node: &Node) -> String {
    match node {
        Node::Ext(DataNode::Pending(placeholder)) => match placeholder.data() {
            PlaceholderData::Pending(pending) => pending.raw.name.clone().unwrap_or_default(),
            PlaceholderData::Ready(_) => String::new(),
        },
        Node::Element(e) => e.children.iter().map(title_text).collect(),
        other => other.astext(),
    }
}

/// Element kinds that can hold relocated messages.
pub(crate) fn is_container(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::Document
            | Kind::Section
            | Kind::ListItem
            | Kind::FieldBody
            | Kind::BlockQuote
            | Kind::Admonition
            | Kind::Container
    )
}

/// Children of any container node.
pub(crate) fn child_nodes(node: &Node) -> &[Node] {
    match node {
        Node::Element(e) => &e.children,
        Node::Ext(DataNode::Pending(p)) => p.children(),
        Node::Ext(DataNode::Rendered(r)) => r.children(),
        _ => &[],
    }
}

pub(crate) fn child_nodes_mut(node: &mut Node) -> Option<&mut Vec<Node>> {
    match node {
        Node::Element(e) => Some(&mut e.children),
        Node::Ext(DataNode::Pending(p)) => Some(p.children_mut()),
        Node::Ext(DataNode::Rendered(r)) => Some(r.children_mut()),
        _ => None,
    }
}

fn collect<F>(nodes: &[Node], pred: &F, path: &mut NodePath, found: &mut Vec<NodePath>)
where
    F: Fn(&Node) -> bool,
{
    for (idx, node) in nodes.iter().enumerate() {
        path.push(idx);
        if pred(node) {
            found.push(path.clone());
        }
        collect(child_nodes(node), pred, path, found);
        path.pop();
    }
}

fn walk_reports<'a>(nodes: &'a [Node], out: &mut Vec<&'a DebugReport>) {
    for node in nodes {
        if let Node::Ext(DataNode::Report(report)) = node {
            out.push(report);
        }
        walk_reports(child_nodes(node), out);
    }
}
