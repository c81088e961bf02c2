//! Tree nodes contributed by the render core.

use datanode_markup::node::push_line;
use datanode_markup::ExtNode;

use crate::pending::Placeholder;
use crate::rendered::RenderedResult;
use crate::report::DebugReport;

/// A document tree node that may hold render-core payloads.
pub type Node = datanode_markup::Node<DataNode>;

/// An element of a document tree.
pub type Element = datanode_markup::Element<DataNode>;

/// Render-core payloads carried in [`Node::Ext`](datanode_markup::Node::Ext).
#[derive(Debug, Clone)]
pub enum DataNode {
    /// Waiting for its phase.
    Pending(Box<Placeholder>),
    /// Terminal: the output of a render chain.
    Rendered(RenderedResult),
    /// A debug report relocated out of an inline result.
    Report(DebugReport),
}

impl DataNode {
    pub fn as_pending(&self) -> Option<&Placeholder> {
        match self {
            DataNode::Pending(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_rendered(&self) -> Option<&RenderedResult> {
        match self {
            DataNode::Rendered(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_report(&self) -> Option<&DebugReport> {
        match self {
            DataNode::Report(r) => Some(r),
            _ => None,
        }
    }
}

impl ExtNode for DataNode {
    fn pformat_into(&self, out: &mut String, indent: usize) {
        match self {
            DataNode::Pending(p) => {
                let mut open = format!("<pending_data phase=\"{}\"", p.phase());
                if p.is_inline() {
                    open.push_str(" inline=\"true\"");
                }
                open.push('>');
                push_line(out, indent, &open);
                for child in p.children() {
                    child.pformat_into(out, indent + 1);
                }
            }
            DataNode::Rendered(r) => {
                let mut open = "<rendered_data".to_string();
                for (k, v) in r.attrs() {
                    open.push_str(&format!(" {}=\"{}\"", k, v));
                }
                open.push('>');
                push_line(out, indent, &open);
                for child in r.children() {
                    child.pformat_into(out, indent + 1);
                }
            }
            DataNode::Report(report) => report.pformat_into(out, indent),
        }
    }

    fn astext(&self) -> String {
        match self {
            DataNode::Rendered(r) => r.elements().map(|n| n.astext()).collect(),
            DataNode::Pending(_) | DataNode::Report(_) => String::new(),
        }
    }

    fn is_block(&self) -> bool {
        match self {
            DataNode::Pending(p) => !p.is_inline(),
            DataNode::Rendered(r) => !r.is_inline(),
            DataNode::Report(_) => true,
        }
    }
}

impl From<Placeholder> for Node {
    fn from(placeholder: Placeholder) -> Self {
        Node::Ext(DataNode::Pending(Box::new(placeholder)))
    }
}

impl From<RenderedResult> for Node {
    fn from(result: RenderedResult) -> Self {
        Node::Ext(DataNode::Rendered(result))
    }
}

impl From<DebugReport> for Node {
    fn from(report: DebugReport) -> Self {
        Node::Ext(DataNode::Report(report))
    }
}
