//! Block parser.
//!
//! The grammar is a small, indentation-sensitive subset of reStructuredText:
//!
//! ```text
//! Title                 section title (underline of = - ~ ^ * # +)
//! =====
//!
//! A paragraph with **strong**, *emphasis* and ``literal`` text.
//!
//! - bullet item         bullet lists (- * +)
//!
//! :Field: body          field lists
//!
//! Example::             literal blocks
//!
//!     indented text
//!
//! .. note:: body        admonitions
//! ```
//!
//! Blocks are separated by blank lines. An indented block that does not
//! follow a `::` paragraph becomes a block quote.

use std::convert::Infallible;

use crate::diagnostic::Diagnostic;
use crate::error::MarkupParseError;
use crate::inline;
use crate::node::{Element, Kind, Node};

/// Default limit for nested blocks.
pub const MAX_DEPTH: usize = 16;

/// Directive names rendered as admonitions.
pub const ADMONITIONS: &[&str] = &[
    "attention",
    "caution",
    "danger",
    "error",
    "hint",
    "important",
    "note",
    "seealso",
    "tip",
    "warning",
];

const UNDERLINE_CHARS: &str = "=-~^*#+";

/// Parser output: the produced nodes plus any non-fatal diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<X = Infallible> {
    pub nodes: Vec<Node<X>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<X> Default for Parsed<X> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// Markup parser with block and inline entry points.
#[derive(Debug, Clone)]
pub struct Parser {
    first_line: usize,
    max_depth: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self {
            first_line: 1,
            max_depth: MAX_DEPTH,
        }
    }
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Line number assigned to the first line of input.
    pub fn first_line(mut self, line: usize) -> Self {
        self.first_line = line;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Parses `text` into block-level nodes.
    pub fn parse_block<X>(&self, text: &str) -> Result<Parsed<X>, MarkupParseError> {
        let lines = self.prepare(text)?;
        let mut state = State {
            diagnostics: Vec::new(),
            max_depth: self.max_depth,
        };
        let nodes = state.blocks(&lines, 0)?;
        Ok(Parsed {
            nodes,
            diagnostics: state.diagnostics,
        })
    }

    /// Parses `text` as a single run of inline nodes.
    pub fn parse_inline<X>(&self, text: &str) -> Result<Parsed<X>, MarkupParseError> {
        let lines = self.prepare(text)?;
        let joined = lines
            .iter()
            .map(|l| l.text.trim())
            .collect::<Vec<_>>()
            .join("\n");
        let line = lines.first().map_or(self.first_line, |l| l.no);
        let mut diagnostics = Vec::new();
        let nodes = inline::parse(joined.trim(), line, &mut diagnostics);
        Ok(Parsed { nodes, diagnostics })
    }

    fn prepare(&self, text: &str) -> Result<Vec<Line>, MarkupParseError> {
        text.lines()
            .enumerate()
            .map(|(idx, raw)| {
                let no = self.first_line + idx;
                if let Some(c) = raw
                    .chars()
                    .find(|c| c.is_control() && *c != '\t' && *c != '\r')
                {
                    return Err(MarkupParseError::ControlCharacter {
                        line: no,
                        code: c as u32,
                    });
                }
                Ok(Line {
                    no,
                    text: expand_tabs(raw.trim_end()),
                })
            })
            .collect()
    }
}

/// Parses block markup with the default parser.
pub fn parse_block<X>(text: &str) -> Result<Parsed<X>, MarkupParseError> {
    Parser::new().parse_block(text)
}

/// Parses inline markup with the default parser.
pub fn parse_inline<X>(text: &str) -> Result<Parsed<X>, MarkupParseError> {
    Parser::new().parse_inline(text)
}

#[derive(Debug, Clone)]
struct Line {
    no: usize,
    text: String,
}

impl Line {
    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    fn indent(&self) -> usize {
        self.text.chars().take_while(|c| *c == ' ').count()
    }
}

fn expand_tabs(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut col = 0;
    for c in s.chars() {
        if c == '\t' {
            let pad = 8 - col % 8;
            out.extend(std::iter::repeat(' ').take(pad));
            col += pad;
        } else {
            out.push(c);
            col += 1;
        }
    }
    out
}

/// Index one past the last blank-or-indented line starting at `from`.
fn indented_end(lines: &[Line], from: usize) -> usize {
    let mut end = from;
    while end < lines.len() && (lines[end].is_blank() || lines[end].indent() > 0) {
        end += 1;
    }
    end
}

/// Strips the common indentation of a block.
fn dedent(lines: &[Line]) -> Vec<Line> {
    let amount = lines
        .iter()
        .filter(|l| !l.is_blank())
        .map(Line::indent)
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| Line {
            no: l.no,
            text: if l.is_blank() {
                String::new()
            } else {
                l.text[amount..].to_string()
            },
        })
        .collect()
}

fn join(lines: &[Line]) -> String {
    let mut texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
    while texts.last().is_some_and(|t| t.trim().is_empty()) {
        texts.pop();
    }
    texts.join("\n")
}

fn bullet_marker(text: &str) -> Option<char> {
    let mut chars = text.chars();
    let first = chars.next()?;
    if !matches!(first, '-' | '*' | '+') {
        return None;
    }
    match chars.next() {
        Some(' ') | None => Some(first),
        _ => None,
    }
}

/// Splits `:name: body` into its parts.
fn field_marker(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix(':')?;
    let close = rest.find(':')?;
    let name = &rest[..close];
    let after = &rest[close + 1..];
    if name.is_empty() || name.starts_with(' ') || name.ends_with(' ') {
        return None;
    }
    if !(after.is_empty() || after.starts_with(' ')) {
        return None;
    }
    Some((name, after.trim()))
}

/// Splits `.. name:: argument` into its parts.
fn directive_marker(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix(".. ")?;
    let close = rest.find("::")?;
    let name = &rest[..close];
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return None;
    }
    Some((name, rest[close + 2..].trim()))
}

fn is_underline(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if UNDERLINE_CHARS.contains(first) => {
            text.chars().count() >= 2 && chars.all(|c| c == first)
        }
        _ => false,
    }
}

struct State {
    diagnostics: Vec<Diagnostic>,
    max_depth: usize,
}

impl State {
    fn blocks<X>(
        &mut self,
        lines: &[Line],
        depth: usize,
    ) -> Result<Vec<Node<X>>, MarkupParseError> {
        if depth > self.max_depth {
            return Err(MarkupParseError::TooDeep {
                line: lines.first().map_or(0, |l| l.no),
                max: self.max_depth,
            });
        }

        let mut nodes = Vec::new();
        let mut expect_literal: Option<usize> = None;
        let mut i = 0;

        while i < lines.len() {
            let line = &lines[i];
            if line.is_blank() {
                i += 1;
                continue;
            }

            if line.indent() > 0 {
                let end = indented_end(lines, i);
                let body = dedent(&lines[i..end]);
                if expect_literal.take().is_some() {
                    nodes.push(Element::new(Kind::LiteralBlock).with_text(join(&body)).into());
                } else {
                    let children = self.blocks(&body, depth + 1)?;
                    nodes.push(Node::element(Kind::BlockQuote, children));
                }
                i = end;
                continue;
            }

            if let Some(at) = expect_literal.take() {
                self.literal_missing(at);
            }

            let text = line.text.as_str();

            if text == ".." || text.starts_with(".. ") {
                let end = indented_end(lines, i + 1);
                if let Some((name, argument)) = directive_marker(text) {
                    let node = self.directive(name, argument, line, &lines[i..end], depth)?;
                    nodes.push(node);
                }
                // Anything else is a comment.
                i = end;
                continue;
            }

            if let Some(bullet) = bullet_marker(text) {
                let (list, end) = self.bullet_list(lines, i, bullet, depth)?;
                nodes.push(list);
                i = end;
                continue;
            }

            if field_marker(text).is_some() {
                let (list, end) = self.field_list(lines, i, depth)?;
                nodes.push(list);
                i = end;
                continue;
            }

            let mut end = i;
            while end < lines.len() && !lines[end].is_blank() && lines[end].indent() == 0 {
                end += 1;
            }
            let para = &lines[i..end];
            i = end;

            if para.len() == 2 && is_underline(&para[1].text) && !is_underline(&para[0].text) {
                if para[1].text.chars().count() < para[0].text.chars().count() {
                    let warning = Diagnostic::warning("Title underline too short.");
                    self.diagnostics.push(warning.at_line(para[1].no));
                }
                let children = inline::parse(&para[0].text, para[0].no, &mut self.diagnostics);
                nodes.push(Node::element(Kind::Title, children));
                continue;
            }

            let mut text = join(para);
            if text.ends_with("::") {
                expect_literal = Some(para[para.len() - 1].no);
                if text == "::" {
                    continue;
                } else if text.ends_with(" ::") {
                    text.truncate(text.len() - 3);
                } else {
                    text.truncate(text.len() - 1);
                }
            }
            let children = inline::parse(&text, para[0].no, &mut self.diagnostics);
            nodes.push(Node::element(Kind::Paragraph, children));
        }

        if let Some(at) = expect_literal {
            self.literal_missing(at);
        }
        Ok(nodes)
    }

    fn literal_missing(&mut self, line: usize) {
        self.diagnostics
            .push(Diagnostic::warning("Literal block expected; none found.").at_line(line));
    }

    fn directive<X>(
        &mut self,
        name: &str,
        argument: &str,
        line: &Line,
        source: &[Line],
        depth: usize,
    ) -> Result<Node<X>, MarkupParseError> {
        if !ADMONITIONS.contains(&name) {
            let text = join(source);
            self.diagnostics.push(
                Diagnostic::error(format!("Unknown directive type \"{}\".", name))
                    .at_line(line.no)
                    .with_literal(text.clone()),
            );
            return Ok(Element::new(Kind::LiteralBlock).with_text(text).into());
        }

        let mut content = Vec::with_capacity(source.len());
        if !argument.is_empty() {
            content.push(Line {
                no: line.no,
                text: argument.to_string(),
            });
        }
        content.extend(dedent(&source[1..]));
        let children = self.blocks(&content, depth + 1)?;
        Ok(Element::new(Kind::Admonition)
            .with_attr("kind", name)
            .with_children(children)
            .into())
    }

    fn bullet_list<X>(
        &mut self,
        lines: &[Line],
        start: usize,
        bullet: char,
        depth: usize,
    ) -> Result<(Node<X>, usize), MarkupParseError> {
        let mut items = Vec::new();
        let mut i = start;

        while i < lines.len() {
            let line = &lines[i];
            if line.is_blank() {
                i += 1;
                continue;
            }
            if line.indent() > 0 || bullet_marker(&line.text) != Some(bullet) {
                break;
            }

            let first: String = line.text.chars().skip(2).collect();
            let mut end = i + 1;
            while end < lines.len() && (lines[end].is_blank() || lines[end].indent() >= 2) {
                end += 1;
            }
            let mut content = vec![Line {
                no: line.no,
                text: first,
            }];
            content.extend(dedent(&lines[i + 1..end]));
            let children = self.blocks(&content, depth + 1)?;
            items.push(Node::element(Kind::ListItem, children));
            i = end;
        }

        Ok((Node::element(Kind::BulletList, items), i))
    }

    fn field_list<X>(
        &mut self,
        lines: &[Line],
        start: usize,
        depth: usize,
    ) -> Result<(Node<X>, usize), MarkupParseError> {
        let mut fields = Vec::new();
        let mut i = start;

        while i < lines.len() {
            let line = &lines[i];
            if line.is_blank() {
                i += 1;
                continue;
            }
            if line.indent() > 0 {
                break;
            }
            let Some((name, first)) = field_marker(&line.text) else {
                break;
            };

            let end = indented_end(lines, i + 1);
            let mut content = Vec::new();
            if !first.is_empty() {
                content.push(Line {
                    no: line.no,
                    text: first.to_string(),
                });
            }
            content.extend(dedent(&lines[i + 1..end]));

            let name_nodes = inline::parse(name, line.no, &mut self.diagnostics);
            let body = self.blocks(&content, depth + 1)?;
            fields.push(Node::element(
                Kind::Field,
                vec![
                    Node::element(Kind::FieldName, name_nodes),
                    Node::element(Kind::FieldBody, body),
                ],
            ));
            i = end;
        }

        Ok((Node::element(Kind::FieldList, fields), i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Level;

    fn block(text: &str) -> Parsed {
        parse_block(text).unwrap()
    }

    #[test]
    fn single_paragraph() {
        let parsed = block("Widget: red - hello");
        assert_eq!(
            parsed.nodes,
            vec![Node::element(
                Kind::Paragraph,
                vec![Node::text("Widget: red - hello")]
            )]
        );
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        let parsed = block("one\ntwo\n\nthree");
        assert_eq!(parsed.nodes.len(), 2);
        assert_eq!(parsed.nodes[0].children(), &[Node::text("one\ntwo")]);
    }

    #[test]
    fn title_with_underline() {
        let parsed = block("Hello\n=====\n\nbody");
        assert!(parsed.nodes[0].is_kind(Kind::Title));
        assert!(parsed.nodes[1].is_kind(Kind::Paragraph));
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn short_underline_warns() {
        let parsed = block("Hello world\n===");
        assert!(parsed.nodes[0].is_kind(Kind::Title));
        assert_eq!(parsed.diagnostics[0].line, Some(2));
    }

    #[test]
    fn bullet_list_items() {
        let parsed = block("- one\n- two\n  continued\n\nafter");
        let list = parsed.nodes[0].as_element().unwrap();
        assert_eq!(list.kind, Kind::BulletList);
        assert_eq!(list.children.len(), 2);
        assert_eq!(list.children[1].children()[0].children(), &[Node::text("two\ncontinued")]);
        assert!(parsed.nodes[1].is_kind(Kind::Paragraph));
    }

    #[test]
    fn field_list_with_body() {
        let parsed = block(":Name: ``Widget``\n:color: red");
        let list = parsed.nodes[0].as_element().unwrap();
        assert_eq!(list.kind, Kind::FieldList);
        assert_eq!(list.children.len(), 2);
        let field = list.children[0].as_element().unwrap();
        assert_eq!(field.children[0].astext(), "Name");
        assert_eq!(field.children[1].astext(), "Widget");
    }

    #[test]
    fn literal_block_after_double_colon() {
        let parsed = block("Example::\n\n    raw *text*\n    more");
        assert_eq!(parsed.nodes[0].children(), &[Node::text("Example:")]);
        let literal = parsed.nodes[1].as_element().unwrap();
        assert_eq!(literal.kind, Kind::LiteralBlock);
        assert_eq!(literal.children, vec![Node::text("raw *text*\nmore")]);
    }

    #[test]
    fn missing_literal_block_warns() {
        let parsed = block("Example ::\n\nnot indented");
        assert_eq!(parsed.nodes[0].children(), &[Node::text("Example")]);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].level, Level::Warning);
    }

    #[test]
    fn admonition_parses_body() {
        let parsed = block(".. note:: first line\n\n   second paragraph");
        let note = parsed.nodes[0].as_element().unwrap();
        assert_eq!(note.kind, Kind::Admonition);
        assert_eq!(note.attrs.get("kind").map(String::as_str), Some("note"));
        assert_eq!(note.children.len(), 2);
    }

    #[test]
    fn unknown_directive_is_an_error_diagnostic() {
        let parsed = block(".. frobnicate:: x\n\n   body");
        assert!(parsed.nodes[0].is_kind(Kind::LiteralBlock));
        assert_eq!(parsed.diagnostics.len(), 1);
        assert!(parsed.diagnostics[0].is_error());
        assert!(parsed.diagnostics[0].message.contains("frobnicate"));
    }

    #[test]
    fn comments_are_dropped() {
        let parsed = block(".. a comment\n   continued\n\ntext");
        assert_eq!(parsed.nodes.len(), 1);
        assert!(parsed.nodes[0].is_kind(Kind::Paragraph));
    }

    #[test]
    fn indented_block_is_block_quote() {
        let parsed = block("para\n\n   quoted");
        assert!(parsed.nodes[1].is_kind(Kind::BlockQuote));
    }

    #[test]
    fn control_character_is_fatal() {
        let err = parse_block::<Infallible>("ok\nbad\u{0}").unwrap_err();
        assert_eq!(err, MarkupParseError::ControlCharacter { line: 2, code: 0 });
    }

    #[test]
    fn nesting_limit_is_fatal() {
        let err = Parser::new()
            .max_depth(1)
            .parse_block::<Infallible>("a\n\n  b\n\n    c")
            .unwrap_err();
        assert!(matches!(err, MarkupParseError::TooDeep { max: 1, .. }));
    }

    #[test]
    fn first_line_offsets_diagnostics() {
        let parsed: Parsed = Parser::new().first_line(10).parse_block("x *y").unwrap();
        assert_eq!(parsed.diagnostics[0].line, Some(10));
    }

    #[test]
    fn inline_entry_point_joins_lines() {
        let parsed: Parsed = parse_inline("  *hi*  there ").unwrap();
        assert_eq!(
            parsed.nodes,
            vec![
                Element::new(Kind::Emphasis).with_text("hi").into(),
                Node::text("  there"),
            ]
        );
    }

    #[test]
    fn tabs_expand_to_eight_columns() {
        assert_eq!(expand_tabs("\tx"), "        x");
        assert_eq!(expand_tabs("ab\tx"), "ab      x");
    }
}
