//! Fatal parser errors.

use thiserror::Error;

/// A failure that prevents the parser from producing any tree.
///
/// Recoverable problems are reported as [`crate::Diagnostic`]s instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupParseError {
    /// The text contains a control character the parser refuses to handle.
    #[error("line {line}: control character U+{code:04X} is not allowed in markup")]
    ControlCharacter { line: usize, code: u32 },

    /// Nested blocks went deeper than the parser allows.
    #[error("line {line}: nesting exceeds the maximum depth of {max}")]
    TooDeep { line: usize, max: usize },

    /// The parser has no inline entry point.
    #[error("inline parsing is not supported by this parser")]
    InlineUnsupported,

    /// A failure reported by a host-provided parser.
    #[error("{0}")]
    Host(String),
}
