//! Debug reports describing what a render chain did.

use std::fmt;

use datanode_markup::node::push_line;
use datanode_markup::{Diagnostic, Level, SourceLocation};

/// A stage of the render chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Define-time dispatch rejected the placeholder.
    Dispatch,
    Validate,
    Template,
    Markup,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Dispatch => "dispatch",
            Stage::Validate => "validate",
            Stage::Template => "template",
            Stage::Markup => "markup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One section of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEntry {
    Text(String),
    Code { text: String, lang: Option<String> },
    Message(Diagnostic),
}

/// Observational payload attached to a rendered result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugReport {
    pub title: String,
    pub level: Level,
    pub source: Option<SourceLocation>,
    /// The stage that failed, if any.
    pub failed: Option<Stage>,
    pub entries: Vec<ReportEntry>,
}

impl Default for DebugReport {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugReport {
    pub const TITLE: &'static str = "Render Debug Report";

    pub fn new() -> Self {
        Self {
            title: Self::TITLE.to_string(),
            level: Level::Debug,
            source: None,
            failed: None,
            entries: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: Option<SourceLocation>) -> Self {
        self.source = source;
        self
    }

    pub fn text(&mut self, text: impl Into<String>) {
        self.entries.push(ReportEntry::Text(text.into()));
    }

    pub fn code(&mut self, text: impl Into<String>, lang: Option<&str>) {
        self.entries.push(ReportEntry::Code {
            text: text.into(),
            lang: lang.map(str::to_string),
        });
    }

    /// Adds a message and raises the report level to match it.
    pub fn message(&mut self, message: Diagnostic) {
        if message.level > self.level {
            self.level = message.level;
        }
        self.entries.push(ReportEntry::Message(message));
    }

    /// Records a stage failure.
    pub fn fail(&mut self, stage: Stage, err: &dyn std::error::Error) {
        self.failed = Some(stage);
        self.level = Level::Error;
        self.text(format!("Failed to {}:", stage_verb(stage)));
        self.code(err.to_string(), Some("text"));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_failure(&self) -> bool {
        self.failed.is_some()
    }

    /// The failure text, if the report records one.
    pub fn failure_text(&self) -> Option<&str> {
        self.failed?;
        self.entries.iter().rev().find_map(|e| match e {
            ReportEntry::Code { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Single-line summary for inline placement.
    pub fn summary(&self) -> String {
        match (self.failed, self.failure_text()) {
            (Some(stage), Some(text)) => {
                let first = text.lines().next().unwrap_or_default();
                format!("{} failed: {}", stage, first)
            }
            _ => self.title.clone(),
        }
    }

    pub fn pformat_into(&self, out: &mut String, indent: usize) {
        let mut open = format!("<debug_report level=\"{}\"", self.level);
        if let Some(stage) = self.failed {
            open.push_str(&format!(" failed=\"{}\"", stage));
        }
        if let Some(source) = &self.source {
            open.push_str(&format!(" source=\"{}\"", source));
        }
        open.push('>');
        push_line(out, indent, &open);
        push_line(out, indent + 1, "<title>");
        push_line(out, indent + 2, &self.title);
        for entry in &self.entries {
            match entry {
                ReportEntry::Text(text) => {
                    push_line(out, indent + 1, "<paragraph>");
                    for line in text.lines() {
                        push_line(out, indent + 2, line);
                    }
                }
                ReportEntry::Code { text, lang } => {
                    let open = match lang {
                        Some(lang) => format!("<literal_block language=\"{}\">", lang),
                        None => "<literal_block>".to_string(),
                    };
                    push_line(out, indent + 1, &open);
                    for line in text.lines() {
                        push_line(out, indent + 2, line);
                    }
                }
                ReportEntry::Message(message) => message.pformat_into(out, indent + 1),
            }
        }
    }
}

fn stage_verb(stage: Stage) -> &'static str {
    match stage {
        Stage::Dispatch => "dispatch the definition",
        Stage::Validate => "parse raw data",
        Stage::Template => "render template to markup text",
        Stage::Markup => "render markup text to nodes",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FieldRef, ValidationError};

    #[test]
    fn new_report_is_empty() {
        let report = DebugReport::new();
        assert!(report.is_empty());
        assert!(!report.is_failure());
        assert_eq!(report.title, "Render Debug Report");
    }

    #[test]
    fn fail_records_stage_and_text() {
        let mut report = DebugReport::new();
        report.fail(
            Stage::Validate,
            &ValidationError::Missing {
                field: FieldRef::Name,
            },
        );
        assert_eq!(report.failed, Some(Stage::Validate));
        assert_eq!(report.level, Level::Error);
        assert_eq!(report.failure_text(), Some("missing required name"));
        assert_eq!(report.summary(), "validate failed: missing required name");
    }

    #[test]
    fn message_raises_level() {
        let mut report = DebugReport::new();
        report.message(Diagnostic::warning("careful"));
        assert_eq!(report.level, Level::Warning);
        report.message(Diagnostic::info("fyi"));
        assert_eq!(report.level, Level::Warning);
    }

    #[test]
    fn pformat_layout() {
        let mut report =
            DebugReport::new().with_source(Some(SourceLocation::new("index", Some(3))));
        report.text("Template:");
        report.code("{{ x }}", Some("jinja"));
        let mut out = String::new();
        report.pformat_into(&mut out, 0);
        let expected = concat!(
            "<debug_report level=\"DEBUG\" source=\"index:3\">\n",
            "    <title>\n",
            "        Render Debug Report\n",
            "    <paragraph>\n",
            "        Template:\n",
            "    <literal_block language=\"jinja\">\n",
            "        {{ x }}\n",
        );
        assert_eq!(out, expected);
    }
}
