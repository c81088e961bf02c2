//! Checkpoint scans.
//!
//! A scan walks one document at one checkpoint. Every placeholder it meets
//! accumulates that checkpoint's extra context, whatever its own phase.
//! Placeholders whose phase matches the checkpoint are rendered and replaced:
//! block placeholders by their result, inline placeholders by the flattened
//! result spliced into the surrounding text. Messages from inline results move
//! to the nearest enclosing block container.

use datanode_render::{DataNode, ExtraContextGenerator, HostContext, Node, Placeholder};

use crate::document::{child_nodes_mut, is_container, Document};

/// Counts from one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Placeholders seen.
    pub visited: usize,
    /// Placeholders rendered and replaced.
    pub rendered: usize,
    /// Rendered placeholders whose chain reported a failure.
    pub failed: usize,
    /// Placeholders left for a later checkpoint.
    pub pending: usize,
}

/// Runs the checkpoint described by `host` over `doc`.
pub fn scan(doc: &mut Document, host: &HostContext<'_>) -> ScanOutcome {
    tracing::debug!(checkpoint = %host.checkpoint, doc = %doc.name(), "checkpoint scan started");
    let scanner = Scanner {
        host,
        generator: ExtraContextGenerator::new(host),
    };
    let mut outcome = ScanOutcome::default();
    let relocated = scanner.nodes(doc.children_mut(), &mut outcome);
    doc.children_mut().extend(relocated);
    tracing::debug!(
        checkpoint = %host.checkpoint,
        doc = %doc.name(),
        visited = outcome.visited,
        rendered = outcome.rendered,
        failed = outcome.failed,
        pending = outcome.pending,
        "checkpoint scan finished"
    );
    outcome
}

struct Scanner<'h> {
    host: &'h HostContext<'h>,
    generator: ExtraContextGenerator<'h>,
}

impl Scanner<'_> {
    /// Scans `nodes` in place. Returns messages that must move further up.
    fn nodes(&self, nodes: &mut Vec<Node>, outcome: &mut ScanOutcome) -> Vec<Node> {
        let mut relocated = Vec::new();
        let mut i = 0;
        while i < nodes.len() {
            match std::mem::replace(&mut nodes[i], Node::text("")) {
                Node::Ext(DataNode::Pending(mut placeholder)) => {
                    outcome.visited += 1;
                    self.generator.on_checkpoint(&mut placeholder);
                    if placeholder.phase() != self.host.checkpoint {
                        outcome.pending += 1;
                        relocated.extend(self.nodes(placeholder.children_mut(), outcome));
                        tracing::debug!(phase = %placeholder.phase(), "placeholder left pending");
                        nodes[i] = Node::Ext(DataNode::Pending(placeholder));
                        i += 1;
                        continue;
                    }
                    let replacement = self.render(*placeholder, outcome, &mut relocated);
                    let count = replacement.len();
                    nodes.splice(i..=i, replacement);
                    i += count;
                }
                mut node => {
                    let inner = match child_nodes_mut(&mut node) {
                        Some(children) => self.nodes(children, outcome),
                        None => Vec::new(),
                    };
                    match &mut node {
                        Node::Element(e) if is_container(e.kind) => e.children.extend(inner),
                        Node::Ext(DataNode::Rendered(r)) if !r.is_inline() => {
                            r.children_mut().extend(inner)
                        }
                        _ => relocated.extend(inner),
                    }
                    nodes[i] = node;
                    i += 1;
                }
            }
        }
        relocated
    }

    fn render(
        &self,
        mut placeholder: Placeholder,
        outcome: &mut ScanOutcome,
        relocated: &mut Vec<Node>,
    ) -> Vec<Node> {
        self.generator.on_anytime(&mut placeholder);
        let inline = placeholder.is_inline();
        let result = placeholder.render(self.host);
        outcome.rendered += 1;
        if result.is_failure() {
            outcome.failed += 1;
        }

        if inline {
            let mut flat = result.flatten();
            relocated.extend(flat.messages);
            // Spliced children may hold placeholders of their own.
            let inner = self.nodes(&mut flat.inline, outcome);
            relocated.extend(inner);
            flat.inline
        } else {
            let mut node = Node::from(result);
            // Re-attached children may hold placeholders of their own.
            if let Some(children) = child_nodes_mut(&mut node) {
                let inner = self.nodes(children, outcome);
                children.extend(inner);
            }
            vec![node]
        }
    }
}
