//! Lightweight document markup for deferred data rendering.
//!
//! This crate provides the document tree ([`Node`], [`Element`], [`Kind`]),
//! non-fatal [`Diagnostic`] messages, and a small indentation-sensitive markup
//! parser with separate block and inline entry points.
//!
//! The tree is generic over an extension payload so that a host can place its
//! own nodes next to parsed markup:
//!
//! ```rust
//! use datanode_markup::{parse_block, Kind, Node, Parsed};
//!
//! let parsed: Parsed = parse_block("Widget: **red**").unwrap();
//! assert_eq!(parsed.nodes.len(), 1);
//! assert!(parsed.nodes[0].is_kind(Kind::Paragraph));
//! assert_eq!(parsed.nodes[0].astext(), "Widget: red");
//! ```
//!
//! Recoverable problems are reported, not raised:
//!
//! ```rust
//! use datanode_markup::{parse_inline, Parsed};
//!
//! let parsed: Parsed = parse_inline("an *open start").unwrap();
//! assert_eq!(parsed.diagnostics.len(), 1);
//! ```

mod diagnostic;
mod error;
mod inline;
pub mod node;
mod parser;

pub use diagnostic::{Diagnostic, Level};
pub use error::MarkupParseError;
pub use node::{pformat_all, Attributes, Element, ExtNode, Kind, Node, SourceLocation};
pub use parser::{parse_block, parse_inline, Parsed, Parser, ADMONITIONS, MAX_DEPTH};
