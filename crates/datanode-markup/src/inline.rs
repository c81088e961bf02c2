//! Inline markup: `**strong**`, `*emphasis*` and ``` ``literal`` ```.

use crate::diagnostic::Diagnostic;
use crate::node::{Element, Kind, Node};

/// Inline constructs recognized by the tokenizer, longest delimiter first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Markup {
    Literal,
    Strong,
    Emphasis,
}

impl Markup {
    const ALL: [Markup; 3] = [Markup::Literal, Markup::Strong, Markup::Emphasis];

    fn delimiter(&self) -> &'static str {
        match self {
            Markup::Literal => "``",
            Markup::Strong => "**",
            Markup::Emphasis => "*",
        }
    }

    fn kind(&self) -> Kind {
        match self {
            Markup::Literal => Kind::Literal,
            Markup::Strong => Kind::Strong,
            Markup::Emphasis => Kind::Emphasis,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Markup::Literal => "literal",
            Markup::Strong => "strong",
            Markup::Emphasis => "emphasis",
        }
    }
}

const START_PRECEDERS: &str = "([{<'\"-/:";
const END_FOLLOWERS: &str = ".,;:!?)]}>'\"-/";

/// Parses one run of inline text.
///
/// Unterminated start-strings are kept as literal text and reported as
/// warnings against `line`.
pub(crate) fn parse<X>(text: &str, line: usize, diagnostics: &mut Vec<Diagnostic>) -> Vec<Node<X>> {
    let chars: Vec<char> = text.chars().collect();
    let mut nodes = Vec::new();
    let mut buf = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\\' {
            match chars.get(i + 1) {
                Some(next) => buf.push(*next),
                None => buf.push('\\'),
            }
            i += 2;
            continue;
        }

        if let Some(markup) = start_at(&chars, i) {
            let len = markup.delimiter().chars().count();
            match find_end(&chars, i + len, markup) {
                Some(end) => {
                    if !buf.is_empty() {
                        nodes.push(Node::Text(std::mem::take(&mut buf)));
                    }
                    let inner: String = chars[i + len..end].iter().collect();
                    nodes.push(Element::new(markup.kind()).with_text(inner).into());
                    i = end + len;
                }
                None => {
                    diagnostics.push(
                        Diagnostic::warning(format!(
                            "Inline {} start-string without end-string.",
                            markup.label()
                        ))
                        .at_line(line),
                    );
                    buf.push_str(markup.delimiter());
                    i += len;
                }
            }
            continue;
        }

        buf.push(c);
        i += 1;
    }

    if !buf.is_empty() {
        nodes.push(Node::Text(buf));
    }
    nodes
}

/// Recognizes a start-string at `i`.
fn start_at(chars: &[char], i: usize) -> Option<Markup> {
    if i > 0 {
        let prev = chars[i - 1];
        if !prev.is_whitespace() && !START_PRECEDERS.contains(prev) {
            return None;
        }
    }
    Markup::ALL.into_iter().find(|m| {
        let delim: Vec<char> = m.delimiter().chars().collect();
        let after = i + delim.len();
        chars.len() > after
            && chars[i..after] == delim[..]
            && !chars[after].is_whitespace()
            // "***" is not strong followed by emphasis
            && !(*m != Markup::Literal && chars[after] == '*')
    })
}

/// Finds the matching end-string, requiring non-empty content.
fn find_end(chars: &[char], from: usize, markup: Markup) -> Option<usize> {
    let delim: Vec<char> = markup.delimiter().chars().collect();
    let len = delim.len();
    if chars.len() < from + len {
        return None;
    }
    (from + 1..=chars.len() - len).find(|&j| {
        let prev = chars[j - 1];
        chars[j..j + len] == delim[..]
            && !prev.is_whitespace()
            && (markup == Markup::Literal || prev != '\\')
            && chars
                .get(j + len)
                .map_or(true, |next| next.is_whitespace() || END_FOLLOWERS.contains(*next))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline(text: &str) -> (Vec<Node>, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let nodes = parse(text, 1, &mut diagnostics);
        (nodes, diagnostics)
    }

    #[test]
    fn plain_text_is_one_node() {
        let (nodes, diags) = inline("Widget: red - hello");
        assert_eq!(nodes, vec![Node::text("Widget: red - hello")]);
        assert!(diags.is_empty());
    }

    #[test]
    fn strong_emphasis_literal() {
        let (nodes, diags) = inline("a **b** *c* ``d*e``");
        assert!(diags.is_empty());
        assert_eq!(
            nodes,
            vec![
                Node::text("a "),
                Element::new(Kind::Strong).with_text("b").into(),
                Node::text(" "),
                Element::new(Kind::Emphasis).with_text("c").into(),
                Node::text(" "),
                Element::new(Kind::Literal).with_text("d*e").into(),
            ]
        );
    }

    #[test]
    fn unterminated_emphasis_warns() {
        let (nodes, diags) = inline("an *open start");
        assert_eq!(nodes, vec![Node::text("an *open start")]);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("emphasis"));
    }

    #[test]
    fn escaped_star_is_literal_text() {
        let (nodes, diags) = inline(r"2 \* 3");
        assert_eq!(nodes, vec![Node::text("2 * 3")]);
        assert!(diags.is_empty());
    }

    #[test]
    fn star_inside_word_is_text() {
        let (nodes, diags) = inline("a*b*c");
        assert_eq!(nodes, vec![Node::text("a*b*c")]);
        assert!(diags.is_empty());
    }
}
