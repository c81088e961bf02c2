//! Define-time dispatch: build a placeholder from an authoring surface, then
//! render it now or leave it for its checkpoint.

use std::collections::BTreeMap;

use datanode_render::{
    Checkpoints, ExtraContextGenerator, Flattened, HostContext, Node, PendingData, Phase,
    Placeholder, RawData, RenderedResult, Schema, SourceLocation, Stage, Template,
};

use crate::error::DefineError;
use crate::preset;

/// Where a definition comes from: supplies raw data, schema and template, and
/// may adjust what gets built.
pub trait AuthoringSurface {
    fn current_raw_data(&self) -> RawData;

    fn current_schema(&self) -> Schema;

    fn current_template(&self) -> Template;

    fn is_inline(&self) -> bool;

    fn source(&self) -> Option<SourceLocation> {
        None
    }

    /// Checks the definition before dispatch.
    fn check(&self) -> Result<(), DefineError> {
        Ok(())
    }

    fn process_raw_data(&self, raw: RawData) -> RawData {
        raw
    }

    /// Applied to every placeholder right after it is built.
    fn process_placeholder(&self, placeholder: Placeholder) -> Placeholder {
        placeholder
    }

    /// Applied to results rendered at define time.
    fn process_rendered(&self, result: RenderedResult) -> RenderedResult {
        result
    }
}

/// Block form: `.. data:: name`, options, and indented content.
#[derive(Debug, Clone)]
pub struct BlockSurface {
    type_name: String,
    arguments: Vec<String>,
    options: BTreeMap<String, String>,
    content: Vec<String>,
    schema: Schema,
    template: Template,
    source: Option<SourceLocation>,
    strict: bool,
}

impl BlockSurface {
    /// A surface using the block preset.
    pub fn new<A, S>(arguments: A) -> Self
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_name: "data".to_string(),
            arguments: arguments.into_iter().map(Into::into).collect(),
            options: BTreeMap::new(),
            content: Vec::new(),
            schema: preset::block_schema(),
            template: preset::block_template(),
            source: None,
            strict: false,
        }
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Builder: content lines.
    pub fn content<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn template(mut self, template: Template) -> Self {
        self.template = template;
        self
    }

    pub fn source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }

    /// Builder: check arguments, options and content against the schema
    /// before dispatch, reporting problems as `type_name`.
    pub fn strict(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self.strict = true;
        self
    }
}

impl AuthoringSurface for BlockSurface {
    fn current_raw_data(&self) -> RawData {
        RawData {
            name: (!self.arguments.is_empty()).then(|| self.arguments.join(" ")),
            attrs: self.options.clone(),
            content: (!self.content.is_empty()).then(|| self.content.join("\n")),
        }
    }

    fn current_schema(&self) -> Schema {
        self.schema.clone()
    }

    fn current_template(&self) -> Template {
        self.template.clone()
    }

    fn is_inline(&self) -> bool {
        false
    }

    fn source(&self) -> Option<SourceLocation> {
        self.source.clone()
    }

    fn check(&self) -> Result<(), DefineError> {
        if !self.strict {
            return Ok(());
        }
        let type_name = self.type_name.clone();
        match &self.schema.name {
            None if !self.arguments.is_empty() => {
                return Err(DefineError::UnexpectedArguments {
                    type_name,
                    count: self.arguments.len(),
                })
            }
            Some(field) if field.is_required() && self.arguments.is_empty() => {
                return Err(DefineError::MissingArgument { type_name })
            }
            _ => {}
        }
        if self.schema.other_attrs.is_none() {
            let declared = &self.schema.attrs;
            if let Some(option) = self.options.keys().find(|k| !declared.contains_key(*k)) {
                return Err(DefineError::UnknownOption {
                    type_name,
                    option: option.clone(),
                });
            }
        }
        if self.schema.content.is_none() && !self.content.is_empty() {
            return Err(DefineError::UnexpectedContent { type_name });
        }
        Ok(())
    }
}

/// Inline form: content only.
#[derive(Debug, Clone)]
pub struct InlineSurface {
    text: String,
    schema: Schema,
    template: Template,
    source: Option<SourceLocation>,
}

impl InlineSurface {
    /// A surface using the inline preset.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            schema: preset::inline_schema(),
            template: preset::inline_template(),
            source: None,
        }
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn template(mut self, template: Template) -> Self {
        self.template = template;
        self
    }

    pub fn source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }
}

impl AuthoringSurface for InlineSurface {
    fn current_raw_data(&self) -> RawData {
        RawData::new().content(self.text.clone())
    }

    fn current_schema(&self) -> Schema {
        self.schema.clone()
    }

    fn current_template(&self) -> Template {
        self.template.clone()
    }

    fn is_inline(&self) -> bool {
        true
    }

    fn source(&self) -> Option<SourceLocation> {
        self.source.clone()
    }
}

/// Block form named after the title it sits under.
///
/// Placed with [`Project::insert_auto_definition`](crate::Project::insert_auto_definition),
/// the definition takes the text of the nearest preceding title as its name,
/// and the title itself is replaced by an inline placeholder that renders
/// the title template once parsing finishes.
#[derive(Debug, Clone)]
pub struct AutoSurface {
    block: BlockSurface,
    title: Option<String>,
    title_template: Template,
}

impl AutoSurface {
    pub fn new(block: BlockSurface) -> Self {
        Self {
            block,
            title: None,
            title_template: preset::title_template(),
        }
    }

    /// Builder: the title text the name is taken from.
    pub fn title(mut self, text: impl Into<String>) -> Self {
        self.title = Some(text.into());
        self
    }

    pub fn title_template(mut self, template: Template) -> Self {
        self.title_template = template;
        self
    }

    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// The inline placeholder that stands in for the title.
    pub fn title_placeholder(&self) -> Placeholder {
        let raw = self.process_raw_data(self.current_raw_data());
        let mut placeholder = Placeholder::new(
            PendingData::new(raw, self.current_schema()),
            self.title_template.clone(),
        )
        .inline(true);
        if let Some(source) = self.source() {
            placeholder = placeholder.source(source);
        }
        placeholder
    }
}

impl AuthoringSurface for AutoSurface {
    fn current_raw_data(&self) -> RawData {
        self.block.current_raw_data()
    }

    fn current_schema(&self) -> Schema {
        self.block.current_schema()
    }

    fn current_template(&self) -> Template {
        self.block.current_template()
    }

    fn is_inline(&self) -> bool {
        false
    }

    fn source(&self) -> Option<SourceLocation> {
        AuthoringSurface::source(&self.block)
    }

    /// Checks the block as if the title had been given as its argument.
    fn check(&self) -> Result<(), DefineError> {
        match &self.title {
            Some(title) => {
                let mut block = self.block.clone();
                block.arguments = vec![title.clone()];
                block.check()
            }
            None => self.block.check(),
        }
    }

    /// The title, when known, replaces the name.
    fn process_raw_data(&self, raw: RawData) -> RawData {
        let mut raw = self.block.process_raw_data(raw);
        if let Some(title) = &self.title {
            raw.name = Some(title.clone());
        }
        raw
    }
}

/// What a definition resolved to.
#[derive(Debug, Clone)]
pub enum Defined {
    /// Left in the tree for a later checkpoint.
    Pending(Placeholder),
    Rendered(RenderedResult),
}

impl Defined {
    pub fn is_pending(&self) -> bool {
        matches!(self, Defined::Pending(_))
    }

    /// Nodes to place in the tree, plus messages for the nearest block
    /// container (only ever non-empty for inline results).
    pub fn into_nodes(self) -> Flattened {
        match self {
            Defined::Pending(placeholder) => Flattened {
                inline: vec![Node::from(placeholder)],
                messages: Vec::new(),
            },
            Defined::Rendered(result) if result.is_inline() => result.flatten(),
            Defined::Rendered(result) => Flattened {
                inline: vec![Node::from(result)],
                messages: Vec::new(),
            },
        }
    }
}

/// Builds placeholders from authoring surfaces and dispatches them.
#[derive(Debug, Clone, Copy)]
pub struct DataDefiner<'a> {
    host: &'a HostContext<'a>,
    checkpoints: &'a Checkpoints,
}

impl<'a> DataDefiner<'a> {
    pub fn new(host: &'a HostContext<'a>, checkpoints: &'a Checkpoints) -> Self {
        Self { host, checkpoints }
    }

    /// Builds the placeholder for `surface`, applying its construction hook.
    pub fn build(&self, surface: &dyn AuthoringSurface) -> Placeholder {
        let raw = surface.process_raw_data(surface.current_raw_data());
        let mut placeholder = Placeholder::new(
            PendingData::new(raw, surface.current_schema()),
            surface.current_template(),
        )
        .inline(surface.is_inline());
        if let Some(source) = surface.source() {
            placeholder = placeholder.source(source);
        }
        surface.process_placeholder(placeholder)
    }

    /// Renders immediate definitions now; returns the rest pending.
    ///
    /// A definition that fails its surface checks, or whose phase the host
    /// never reaches, is terminated with a dispatch report instead.
    pub fn define_or_render(&self, surface: &dyn AuthoringSurface) -> Defined {
        let placeholder = self.build(surface);

        if let Err(err) = surface.check() {
            return Defined::Rendered(
                surface.process_rendered(placeholder.abandon(Stage::Dispatch, &err)),
            );
        }
        match self.dispatch(placeholder) {
            Defined::Rendered(result) => Defined::Rendered(surface.process_rendered(result)),
            pending => pending,
        }
    }

    /// Dispatches an already built placeholder.
    ///
    /// The placeholder receives the host checkpoint's extra context first, so
    /// a deferred one keeps it even when the host skips that scan.
    pub fn dispatch(&self, mut placeholder: Placeholder) -> Defined {
        let generator = ExtraContextGenerator::new(self.host);
        generator.on_checkpoint(&mut placeholder);

        let phase = placeholder.phase();
        if phase != Phase::Immediate {
            if let Err(err) = self.checkpoints.validate(phase) {
                return Defined::Rendered(placeholder.abandon(Stage::Dispatch, &err));
            }
            tracing::debug!(%phase, "definition deferred");
            return Defined::Pending(placeholder);
        }

        generator.on_anytime(&mut placeholder);
        Defined::Rendered(placeholder.render(self.host))
    }
}
