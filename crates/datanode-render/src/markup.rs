//! Parsing rendered markup text into tree nodes.
//!
//! The host supplies a [`MarkupParser`] per checkpoint. Some checkpoints only
//! offer block parsing; [`MarkupRenderer`] then emulates inline parsing by
//! block-parsing the text and unwrapping the first paragraph.

use datanode_markup::{Diagnostic, Kind, MarkupParseError, Parsed, Parser};

use crate::node::{DataNode, Node};

/// A markup parser capability.
pub trait MarkupParser {
    fn parse_block(&self, text: &str) -> Result<Parsed<DataNode>, MarkupParseError>;

    fn parse_inline(&self, _text: &str) -> Result<Parsed<DataNode>, MarkupParseError> {
        Err(MarkupParseError::InlineUnsupported)
    }

    /// Whether [`parse_inline`](Self::parse_inline) is available.
    fn supports_inline(&self) -> bool {
        false
    }
}

/// The built-in markup language, with both entry points.
#[derive(Debug, Clone, Default)]
pub struct BuiltinParser {
    parser: Parser,
}

impl BuiltinParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parser(parser: Parser) -> Self {
        Self { parser }
    }
}

impl MarkupParser for BuiltinParser {
    fn parse_block(&self, text: &str) -> Result<Parsed<DataNode>, MarkupParseError> {
        self.parser.parse_block(text)
    }

    fn parse_inline(&self, text: &str) -> Result<Parsed<DataNode>, MarkupParseError> {
        self.parser.parse_inline(text)
    }

    fn supports_inline(&self) -> bool {
        true
    }
}

/// Restricts a parser to its block entry point.
#[derive(Debug, Clone, Default)]
pub struct BlockOnly<P>(pub P);

impl<P: MarkupParser> MarkupParser for BlockOnly<P> {
    fn parse_block(&self, text: &str) -> Result<Parsed<DataNode>, MarkupParseError> {
        self.0.parse_block(text)
    }
}

/// Result of [`MarkupRenderer::parse`].
#[derive(Debug, Clone, Default)]
pub struct MarkupOutput {
    pub elements: Vec<Node>,
    pub diagnostics: Vec<Diagnostic>,
    /// Set when the parser failed outright. `elements` then holds a single
    /// error message quoting the text.
    pub failure: Option<MarkupParseError>,
}

impl MarkupOutput {
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Converts markup text into elements, never failing.
#[derive(Clone, Copy)]
pub struct MarkupRenderer<'p> {
    parser: &'p dyn MarkupParser,
}

impl<'p> MarkupRenderer<'p> {
    pub fn new(parser: &'p dyn MarkupParser) -> Self {
        Self { parser }
    }

    pub fn parse(&self, text: &str, inline: bool) -> MarkupOutput {
        let result = match (inline, self.parser.supports_inline()) {
            (false, _) => self.parser.parse_block(text),
            (true, true) => self.parser.parse_inline(text),
            (true, false) => self.parser.parse_block(text).map(first_paragraph_children),
        };
        match result {
            Ok(parsed) => MarkupOutput {
                elements: parsed.nodes,
                diagnostics: parsed.diagnostics,
                failure: None,
            },
            Err(err) => {
                let message = Diagnostic::error(format!(
                    "Failed to render the following text to nodes: {}",
                    err
                ))
                .with_literal(text);
                MarkupOutput {
                    elements: vec![Node::Message(message)],
                    diagnostics: Vec::new(),
                    failure: Some(err),
                }
            }
        }
    }
}

fn first_paragraph_children(mut parsed: Parsed<DataNode>) -> Parsed<DataNode> {
    let position = parsed.nodes.iter().position(|n| n.is_kind(Kind::Paragraph));
    parsed.nodes = match position {
        Some(idx) => match parsed.nodes.swap_remove(idx) {
            Node::Element(paragraph) => paragraph.children,
            other => vec![other],
        },
        None => Vec::new(),
    };
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_parse() {
        let out = MarkupRenderer::new(&BuiltinParser::new()).parse("hello\n\nworld", false);
        assert_eq!(out.elements.len(), 2);
        assert!(out.failure.is_none());
    }

    #[test]
    fn native_inline_parse() {
        let out = MarkupRenderer::new(&BuiltinParser::new()).parse("a **b**", true);
        assert_eq!(out.elements.len(), 2);
        assert!(out.elements[1].is_kind(Kind::Strong));
    }

    #[test]
    fn emulated_inline_unwraps_first_paragraph() {
        let parser = BlockOnly(BuiltinParser::new());
        let out = MarkupRenderer::new(&parser).parse("a *b*\n\nsecond", true);
        assert_eq!(out.elements.len(), 2);
        assert!(matches!(&out.elements[0], Node::Text(t) if t == "a "));
        assert!(out.elements[1].is_kind(Kind::Emphasis));
    }

    #[test]
    fn block_only_refuses_inline() {
        let parser = BlockOnly(BuiltinParser::new());
        assert!(!parser.supports_inline());
        assert_eq!(
            parser.parse_inline("x").unwrap_err(),
            MarkupParseError::InlineUnsupported
        );
    }

    #[test]
    fn parser_failure_becomes_message() {
        let out = MarkupRenderer::new(&BuiltinParser::new()).parse("bad\u{0}", false);
        assert!(out.is_failure());
        assert_eq!(out.elements.len(), 1);
        let message = out.elements[0].as_message().unwrap();
        assert!(message.is_error());
        assert!(message
            .message
            .starts_with("Failed to render the following text to nodes"));
        assert_eq!(message.literal.as_deref(), Some("bad\u{0}"));
    }
}
