//! Placeholders and the render chain.
//!
//! A [`Placeholder`] stands in the document tree until its template's phase
//! arrives. [`Placeholder::render`] then runs four stages, stopping at the
//! first failure:
//!
//! 1. validate the raw data against its schema
//! 2. render the template to markup text
//! 3. parse the markup text into elements
//! 4. assemble a [`RenderedResult`]
//!
//! Stage failures are never returned to the caller. They end up as a
//! [`DebugReport`] inside the result, so one broken definition cannot stop
//! the rest of a document from rendering. `render` consumes the placeholder,
//! so it can run at most once.

use std::fmt;
use std::rc::Rc;

use datanode_markup::{pformat_all, Attributes, SourceLocation};
use serde_json::{Map, Value};

use crate::data::{Data, ParsedData, PendingData, RawData};
use crate::error::ValidationError;
use crate::extra::{ExtraContext, HostContext};
use crate::markup::MarkupRenderer;
use crate::node::Node;
use crate::phase::Phase;
use crate::rendered::RenderedResult;
use crate::report::{DebugReport, Stage};
use crate::template::Template;

/// Called with the raw data before validation.
pub type RawDataHook = Rc<dyn Fn(&Placeholder, &RawData)>;

/// Called with the data the template will see, after validation.
pub type ParsedDataHook = Rc<dyn Fn(&Placeholder, &Data)>;

/// Receives the rendered markup text and returns the text to parse.
pub type MarkupTextHook = Rc<dyn Fn(&Placeholder, String) -> String>;

/// Called with the assembled result of a successful render.
pub type RenderedHook = Rc<dyn Fn(&Placeholder, &RenderedResult)>;

/// The data a placeholder renders: still to be validated, or ready.
#[derive(Debug, Clone)]
pub enum PlaceholderData {
    Pending(PendingData),
    Ready(Data),
}

impl From<PendingData> for PlaceholderData {
    fn from(pending: PendingData) -> Self {
        PlaceholderData::Pending(pending)
    }
}

impl From<Data> for PlaceholderData {
    fn from(data: Data) -> Self {
        PlaceholderData::Ready(data)
    }
}

impl From<ParsedData> for PlaceholderData {
    fn from(parsed: ParsedData) -> Self {
        PlaceholderData::Ready(Data::Parsed(parsed))
    }
}

impl From<Map<String, Value>> for PlaceholderData {
    fn from(map: Map<String, Value>) -> Self {
        PlaceholderData::Ready(Data::Plain(map))
    }
}

#[derive(Clone, Default)]
struct Hooks {
    raw_data: Vec<RawDataHook>,
    parsed_data: Vec<ParsedDataHook>,
    markup_text: Vec<MarkupTextHook>,
    rendered: Vec<RenderedHook>,
}

/// A deferred rendering unit.
#[derive(Clone)]
pub struct Placeholder {
    data: PlaceholderData,
    template: Template,
    extra: ExtraContext,
    inline: bool,
    attrs: Attributes,
    source: Option<SourceLocation>,
    children: Vec<Node>,
    hooks: Hooks,
}

impl fmt::Debug for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Placeholder")
            .field("data", &self.data)
            .field("template", &self.template)
            .field("extra", &self.extra)
            .field("inline", &self.inline)
            .field("attrs", &self.attrs)
            .field("source", &self.source)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

impl Placeholder {
    pub fn new(data: impl Into<PlaceholderData>, template: Template) -> Self {
        Self {
            data: data.into(),
            template,
            extra: ExtraContext::new(),
            inline: false,
            attrs: Attributes::new(),
            source: None,
            children: Vec::new(),
            hooks: Hooks::default(),
        }
    }

    /// Builder: sets the inline flag.
    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    /// Builder: an attribute copied onto the rendered result.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }

    /// Builder: a child re-attached to the rendered result.
    pub fn child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }

    pub fn data(&self) -> &PlaceholderData {
        &self.data
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn phase(&self) -> Phase {
        self.template.phase
    }

    pub fn extra(&self) -> &ExtraContext {
        &self.extra
    }

    pub fn extra_mut(&mut self) -> &mut ExtraContext {
        &mut self.extra
    }

    pub fn is_inline(&self) -> bool {
        self.inline
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn source_location(&self) -> Option<&SourceLocation> {
        self.source.as_ref()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Children, for hosts scanning nested placeholders.
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn on_raw_data<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Placeholder, &RawData) + 'static,
    {
        self.hooks.raw_data.push(Rc::new(hook));
        self
    }

    pub fn on_parsed_data<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Placeholder, &Data) + 'static,
    {
        self.hooks.parsed_data.push(Rc::new(hook));
        self
    }

    /// Registers a markup text rewrite. Rewrites apply in registration order.
    pub fn on_markup_text<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Placeholder, String) -> String + 'static,
    {
        self.hooks.markup_text.push(Rc::new(hook));
        self
    }

    pub fn on_rendered<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Placeholder, &RenderedResult) + 'static,
    {
        self.hooks.rendered.push(Rc::new(hook));
        self
    }

    /// Runs the render chain.
    pub fn render(mut self, host: &HostContext<'_>) -> RenderedResult {
        let hooks = std::mem::take(&mut self.hooks);
        let debug = host.env.debug_for(&self.template);
        let mut report = DebugReport::new().with_source(self.source.clone());

        // 1. validate
        let data = match self.validate(&hooks, &mut report, debug) {
            Ok(data) => data,
            Err(err) => return self.fail(Stage::Validate, &err, report, None),
        };
        for hook in &hooks.parsed_data {
            hook(&self, &data);
        }

        // 2. template
        let context = data.to_context();
        if debug {
            report.text("Data context:");
            report.code(pretty_json(&Value::Object(context.clone())), Some("json"));
            let keys: Vec<&str> = self.extra.keys().collect();
            report.text(format!("Extra context keys: {}", keys.join(", ")));
            report.text("Template:");
            report.code(self.template.text.clone(), Some("jinja"));
        }
        let text = match self.template.render(host.env, &context, &self.extra) {
            Ok(text) => text,
            Err(err) => return self.fail(Stage::Template, &err, report, Some(data)),
        };
        let text = hooks
            .markup_text
            .iter()
            .fold(text, |text, hook| hook(&self, text));
        if debug {
            report.text("Rendered markup text:");
            report.code(text.clone(), Some("rst"));
        }

        // 3. markup
        let output = MarkupRenderer::new(host.parser).parse(&text, self.inline);
        let has_diagnostics = !output.diagnostics.is_empty();
        for diagnostic in output.diagnostics {
            report.message(diagnostic);
        }
        if let Some(err) = &output.failure {
            report.fail(Stage::Markup, err);
            tracing::warn!(
                stage = %Stage::Markup,
                source = ?self.source,
                error = %err,
                "render chain failed"
            );
        } else if debug {
            report.text("Rendered nodes:");
            report.code(pformat_all(&output.elements), Some("xml"));
        }

        // 4. assemble
        let attach = debug || has_diagnostics || output.failure.is_some();
        let succeeded = output.failure.is_none();
        let result = self.assemble(output.elements, Some(data), attach.then_some(report));
        if succeeded {
            for hook in &hooks.rendered {
                hook(&self, &result);
            }
        }
        tracing::debug!(
            phase = %self.template.phase,
            inline = self.inline,
            source = ?self.source,
            "placeholder rendered"
        );
        result
    }

    /// Terminates the placeholder without rendering, reporting `err` against
    /// `stage`.
    pub fn abandon(self, stage: Stage, err: &dyn std::error::Error) -> RenderedResult {
        let report = DebugReport::new().with_source(self.source.clone());
        self.fail(stage, err, report, None)
    }

    fn validate(
        &self,
        hooks: &Hooks,
        report: &mut DebugReport,
        debug: bool,
    ) -> Result<Data, ValidationError> {
        match &self.data {
            PlaceholderData::Pending(pending) => {
                for hook in &hooks.raw_data {
                    hook(self, &pending.raw);
                }
                if debug {
                    report.text("Raw data:");
                    report.code(
                        serde_json::to_string_pretty(&pending.raw).unwrap_or_default(),
                        Some("json"),
                    );
                    report.text("Schema:");
                    report.code(format!("{:#?}", pending.schema), None);
                }
                pending.parse().map(Data::Parsed)
            }
            PlaceholderData::Ready(data) => Ok(data.clone()),
        }
    }

    fn fail(
        mut self,
        stage: Stage,
        err: &dyn std::error::Error,
        mut report: DebugReport,
        data: Option<Data>,
    ) -> RenderedResult {
        tracing::warn!(%stage, source = ?self.source, error = %err, "render chain failed");
        report.fail(stage, err);
        let children = std::mem::take(&mut self.children);
        RenderedResult::new(self.attrs, self.source, children, data, self.inline, Some(report))
    }

    fn assemble(
        &mut self,
        elements: Vec<Node>,
        data: Option<Data>,
        report: Option<DebugReport>,
    ) -> RenderedResult {
        let mut children = std::mem::take(&mut self.children);
        children.extend(elements);
        RenderedResult::new(
            self.attrs.clone(),
            self.source.clone(),
            children,
            data,
            self.inline,
            report,
        )
    }
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

