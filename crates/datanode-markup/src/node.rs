//! Document tree model.
//!
//! The tree is generic over an extension payload `X`, so a host can hang its
//! own node types (pending units, rendered containers, reports) off the same
//! structure the parser produces. Parsed markup never contains [`Node::Ext`];
//! the default payload is [`Infallible`].

use std::collections::BTreeMap;
use std::convert::Infallible;

use crate::diagnostic::Diagnostic;

/// Element attributes, kept ordered so pretty printing is deterministic.
pub type Attributes = BTreeMap<String, String>;

/// Where a node came from in the author's sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Source file or document name.
    pub source: String,
    /// 1-based line number, if known.
    pub line: Option<usize>,
}

impl SourceLocation {
    pub fn new(source: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            source: source.into(),
            line,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.source, line),
            None => write!(f, "{}", self.source),
        }
    }
}

/// Element kinds understood by the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Document,
    Section,
    Title,
    Paragraph,
    BulletList,
    ListItem,
    FieldList,
    Field,
    FieldName,
    FieldBody,
    LiteralBlock,
    BlockQuote,
    Admonition,
    Container,
    Emphasis,
    Strong,
    Literal,
    Problematic,
}

impl Kind {
    /// The pseudo-XML tag name.
    pub fn tag(&self) -> &'static str {
        match self {
            Kind::Document => "document",
            Kind::Section => "section",
            Kind::Title => "title",
            Kind::Paragraph => "paragraph",
            Kind::BulletList => "bullet_list",
            Kind::ListItem => "list_item",
            Kind::FieldList => "field_list",
            Kind::Field => "field",
            Kind::FieldName => "field_name",
            Kind::FieldBody => "field_body",
            Kind::LiteralBlock => "literal_block",
            Kind::BlockQuote => "block_quote",
            Kind::Admonition => "admonition",
            Kind::Container => "container",
            Kind::Emphasis => "emphasis",
            Kind::Strong => "strong",
            Kind::Literal => "literal",
            Kind::Problematic => "problematic",
        }
    }

    /// Inline kinds may only appear inside text-bearing block elements.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Kind::Emphasis | Kind::Strong | Kind::Literal | Kind::Problematic
        )
    }

    pub fn is_block(&self) -> bool {
        !self.is_inline()
    }
}

/// Behavior a host extension payload contributes to the tree.
pub trait ExtNode {
    /// Appends a pseudo-XML rendering of this node at the given indent level.
    fn pformat_into(&self, out: &mut String, indent: usize);

    /// Plain text content of this node.
    fn astext(&self) -> String {
        String::new()
    }

    /// Whether this node can hold block-level children.
    fn is_block(&self) -> bool {
        true
    }
}

impl ExtNode for Infallible {
    fn pformat_into(&self, _out: &mut String, _indent: usize) {
        match *self {}
    }
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node<X = Infallible> {
    /// A run of plain text.
    Text(String),
    /// A structural or inline element.
    Element(Element<X>),
    /// A parser or host message (warnings, errors).
    Message(Diagnostic),
    /// A host-defined node.
    Ext(X),
}

/// An element with a kind, attributes, and children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element<X = Infallible> {
    pub kind: Kind,
    pub attrs: Attributes,
    pub source: Option<SourceLocation>,
    pub children: Vec<Node<X>>,
}

impl<X> Element<X> {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            attrs: Attributes::new(),
            source: None,
            children: Vec::new(),
        }
    }

    /// Builder: sets an attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Builder: replaces the children.
    pub fn with_children(mut self, children: Vec<Node<X>>) -> Self {
        self.children = children;
        self
    }

    /// Builder: a single text child.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children = vec![Node::Text(text.into())];
        self
    }

    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }

    pub fn push(&mut self, node: Node<X>) {
        self.children.push(node);
    }
}

impl<X> From<Element<X>> for Node<X> {
    fn from(element: Element<X>) -> Self {
        Node::Element(element)
    }
}

impl<X> Node<X> {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    /// Shorthand for an element node with the given children.
    pub fn element(kind: Kind, children: Vec<Node<X>>) -> Self {
        Node::Element(Element::new(kind).with_children(children))
    }

    pub fn as_element(&self) -> Option<&Element<X>> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element<X>> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_ext(&self) -> Option<&X> {
        match self {
            Node::Ext(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&Diagnostic> {
        match self {
            Node::Message(m) => Some(m),
            _ => None,
        }
    }

    /// Returns true for an element of the given kind.
    pub fn is_kind(&self, kind: Kind) -> bool {
        matches!(self, Node::Element(e) if e.kind == kind)
    }

    /// Children of this node, empty for leaves.
    pub fn children(&self) -> &[Node<X>] {
        match self {
            Node::Element(e) => &e.children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node<X>>> {
        match self {
            Node::Element(e) => Some(&mut e.children),
            _ => None,
        }
    }
}

impl<X: ExtNode> Node<X> {
    /// Plain text content, depth first.
    pub fn astext(&self) -> String {
        match self {
            Node::Text(t) => t.clone(),
            Node::Element(e) => e.children.iter().map(Node::astext).collect(),
            Node::Message(m) => m.message.clone(),
            Node::Ext(x) => x.astext(),
        }
    }

    pub fn is_block(&self) -> bool {
        match self {
            Node::Text(_) => false,
            Node::Element(e) => e.kind.is_block(),
            Node::Message(_) => true,
            Node::Ext(x) => x.is_block(),
        }
    }

    /// Pseudo-XML rendering of this node and its subtree.
    pub fn pformat(&self) -> String {
        let mut out = String::new();
        self.pformat_into(&mut out, 0);
        out
    }

    pub fn pformat_into(&self, out: &mut String, indent: usize) {
        match self {
            Node::Text(t) => {
                for line in t.lines() {
                    push_line(out, indent, line);
                }
            }
            Node::Element(e) => {
                let mut open = format!("<{}", e.kind.tag());
                for (k, v) in &e.attrs {
                    open.push_str(&format!(" {}=\"{}\"", k, v));
                }
                open.push('>');
                push_line(out, indent, &open);
                for child in &e.children {
                    child.pformat_into(out, indent + 1);
                }
            }
            Node::Message(m) => m.pformat_into(out, indent),
            Node::Ext(x) => x.pformat_into(out, indent),
        }
    }
}

/// Appends one indented line of pseudo-XML.
pub fn push_line(out: &mut String, indent: usize, line: &str) {
    for _ in 0..indent {
        out.push_str("    ");
    }
    out.push_str(line);
    out.push('\n');
}

/// Pretty prints a node list, separated by blank lines.
pub fn pformat_all<X: ExtNode>(nodes: &[Node<X>]) -> String {
    nodes
        .iter()
        .map(Node::pformat)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pformat_nests_children() {
        let node: Node = Node::element(
            Kind::Paragraph,
            vec![
                Node::text("hello "),
                Node::element(Kind::Strong, vec![Node::text("world")]),
            ],
        );
        assert_eq!(
            node.pformat(),
            "<paragraph>\n    hello \n    <strong>\n        world\n"
        );
    }

    #[test]
    fn pformat_renders_attrs_sorted() {
        let node: Node = Element::new(Kind::Admonition)
            .with_attr("kind", "note")
            .with_attr("class", "x")
            .into();
        assert_eq!(node.pformat(), "<admonition class=\"x\" kind=\"note\">\n");
    }

    #[test]
    fn astext_concatenates() {
        let node: Node = Node::element(
            Kind::Paragraph,
            vec![
                Node::text("a"),
                Node::element(Kind::Emphasis, vec![Node::text("b")]),
                Node::text("c"),
            ],
        );
        assert_eq!(node.astext(), "abc");
    }

    #[test]
    fn inline_kinds_are_not_blocks() {
        assert!(Kind::Emphasis.is_inline());
        assert!(Kind::Paragraph.is_block());
        let text: Node = Node::text("x");
        assert!(!text.is_block());
    }

    #[test]
    fn source_location_display() {
        assert_eq!(SourceLocation::new("index", Some(3)).to_string(), "index:3");
        assert_eq!(SourceLocation::new("index", None).to_string(), "index");
    }
}
