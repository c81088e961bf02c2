//! Parser and host messages.

use std::fmt;

use crate::node::push_line;

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Debug => write!(f, "DEBUG"),
            Level::Info => write!(f, "INFO"),
            Level::Warning => write!(f, "WARNING"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

/// A non-fatal message attached to the tree.
///
/// Parsers report recoverable problems (unknown directives, unterminated
/// inline markup) as diagnostics instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    /// 1-based line within the parsed text.
    pub line: Option<usize>,
    /// Offending source text, if worth quoting.
    pub literal: Option<String>,
}

impl Diagnostic {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            line: None,
            literal: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Level::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_literal(mut self, literal: impl Into<String>) -> Self {
        self.literal = Some(literal.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level >= Level::Error
    }

    /// Appends the pseudo-XML `system_message` form.
    pub fn pformat_into(&self, out: &mut String, indent: usize) {
        let open = match self.line {
            Some(line) => format!("<system_message level=\"{}\" line=\"{}\">", self.level, line),
            None => format!("<system_message level=\"{}\">", self.level),
        };
        push_line(out, indent, &open);
        push_line(out, indent + 1, "<paragraph>");
        for line in self.message.lines() {
            push_line(out, indent + 2, line);
        }
        if let Some(literal) = &self.literal {
            push_line(out, indent + 1, "<literal_block>");
            for line in literal.lines() {
                push_line(out, indent + 2, line);
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {}): {}", self.level, line, self.message),
            None => write!(f, "{}: {}", self.level, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_line() {
        let d = Diagnostic::warning("oops").at_line(4);
        assert_eq!(d.to_string(), "WARNING (line 4): oops");
    }

    #[test]
    fn error_level_ordering() {
        assert!(Diagnostic::error("x").is_error());
        assert!(!Diagnostic::warning("x").is_error());
    }
}
