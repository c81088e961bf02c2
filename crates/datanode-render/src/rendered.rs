//! The terminal output of a render chain.

use datanode_markup::{Attributes, Element, Kind, SourceLocation};

use crate::data::Data;
use crate::node::{DataNode, Node};
use crate::report::DebugReport;

/// Elements produced by a render chain, plus the data that produced them.
///
/// A trailing [`DebugReport`] child is present when debugging was active,
/// the parser reported diagnostics, or a stage failed.
#[derive(Debug, Clone)]
pub struct RenderedResult {
    attrs: Attributes,
    source: Option<SourceLocation>,
    children: Vec<Node>,
    data: Option<Data>,
    inline: bool,
}

/// An inline result split for placement inside a paragraph.
#[derive(Debug, Clone, Default)]
pub struct Flattened {
    /// Nodes to splice in place of the placeholder.
    pub inline: Vec<Node>,
    /// Reports and messages to relocate to the nearest block container.
    pub messages: Vec<Node>,
}

impl RenderedResult {
    pub(crate) fn new(
        attrs: Attributes,
        source: Option<SourceLocation>,
        mut children: Vec<Node>,
        data: Option<Data>,
        inline: bool,
        report: Option<DebugReport>,
    ) -> Self {
        if let Some(report) = report.filter(|r| !r.is_empty()) {
            children.push(Node::Ext(DataNode::Report(report)));
        }
        Self {
            attrs,
            source,
            children,
            data,
            inline,
        }
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn source(&self) -> Option<&SourceLocation> {
        self.source.as_ref()
    }

    /// All children, reports included.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Children, for hosts scanning nested placeholders.
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// The data the template saw. `None` when validation failed.
    pub fn data(&self) -> Option<&Data> {
        self.data.as_ref()
    }

    pub fn is_inline(&self) -> bool {
        self.inline
    }

    /// Children that are not debug reports.
    pub fn elements(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(|n| !is_report(n))
    }

    pub fn reports(&self) -> impl Iterator<Item = &DebugReport> {
        self.children
            .iter()
            .filter_map(|n| n.as_ext().and_then(DataNode::as_report))
    }

    /// Whether any stage failed.
    pub fn is_failure(&self) -> bool {
        self.reports().any(DebugReport::is_failure)
    }

    /// Splits this result for inline placement.
    ///
    /// The first paragraph is unwrapped into its children; later ones stay
    /// as they are. Reports are replaced by a `problematic` marker and moved,
    /// together with parser messages, to [`Flattened::messages`].
    pub fn flatten(self) -> Flattened {
        let mut out = Flattened::default();
        let mut unwrapped = false;
        for child in self.children {
            match child {
                Node::Ext(DataNode::Report(report)) => {
                    let marker = Element::new(Kind::Problematic).with_text(report.summary());
                    out.inline.push(marker.into());
                    out.messages.push(Node::Ext(DataNode::Report(report)));
                }
                Node::Message(message) => out.messages.push(Node::Message(message)),
                Node::Element(element) if element.kind == Kind::Paragraph && !unwrapped => {
                    unwrapped = true;
                    out.inline.extend(element.children);
                }
                other => out.inline.push(other),
            }
        }
        out
    }
}

fn is_report(node: &Node) -> bool {
    matches!(node, Node::Ext(DataNode::Report(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Stage;
    use datanode_markup::Diagnostic;

    fn paragraph(text: &str) -> Node {
        Element::new(Kind::Paragraph).with_text(text).into()
    }

    #[test]
    fn empty_report_is_dropped() {
        let result = RenderedResult::new(
            Attributes::new(),
            None,
            vec![paragraph("x")],
            None,
            false,
            Some(DebugReport::new()),
        );
        assert_eq!(result.children().len(), 1);
        assert_eq!(result.reports().count(), 0);
    }

    #[test]
    fn flatten_unwraps_paragraph() {
        let result = RenderedResult::new(
            Attributes::new(),
            None,
            vec![paragraph("hello")],
            None,
            true,
            None,
        );
        let flat = result.flatten();
        assert_eq!(flat.inline.len(), 1);
        assert!(matches!(&flat.inline[0], Node::Text(t) if t == "hello"));
        assert!(flat.messages.is_empty());
    }

    #[test]
    fn flatten_unwraps_only_first_paragraph() {
        let result = RenderedResult::new(
            Attributes::new(),
            None,
            vec![paragraph("one"), paragraph("two")],
            None,
            true,
            None,
        );
        let flat = result.flatten();
        assert_eq!(flat.inline.len(), 2);
        assert!(matches!(&flat.inline[0], Node::Text(t) if t == "one"));
        assert!(flat.inline[1].is_kind(Kind::Paragraph));
        assert_eq!(flat.inline[1].astext(), "two");
    }

    #[test]
    fn flatten_relocates_reports_and_messages() {
        let mut report = DebugReport::new();
        report.fail(Stage::Template, &std::fmt::Error);
        let result = RenderedResult::new(
            Attributes::new(),
            None,
            vec![Node::Message(Diagnostic::warning("w"))],
            None,
            true,
            Some(report),
        );
        assert!(result.is_failure());
        let flat = result.flatten();
        assert_eq!(flat.inline.len(), 1);
        assert!(flat.inline[0].is_kind(Kind::Problematic));
        assert_eq!(flat.messages.len(), 2);
        assert!(flat.messages[0].as_message().is_some());
        assert!(flat.messages[1].as_ext().and_then(DataNode::as_report).is_some());
    }
}
