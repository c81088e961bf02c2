//! # Datanode Render - Phased, Deferred Rendering of Data Records
//!
//! `datanode-render` turns small structured records into document nodes via
//! templates. Some context a template needs (section titles, resolved
//! references) only exists late in a host's pipeline, so each template names
//! the [`Phase`] at which it may render. Until then a [`Placeholder`] stands
//! in the document tree.
//!
//! ## Core Concepts
//!
//! - [`Schema`] / [`Field`]: validate and coerce a [`RawData`] record
//! - [`Template`]: text, target [`Phase`] and debug flag
//! - [`RenderEnv`]: settings, the sandboxed evaluator and extra-context
//!   providers, built once per host run
//! - [`ExtraContextGenerator`]: accumulates phase-specific variables
//! - [`Placeholder`]: the deferred unit; [`Placeholder::render`] runs the
//!   validate, template, markup, assemble chain
//! - [`RenderedResult`]: the terminal output, possibly with a [`DebugReport`]
//!
//! ## Quick Start
//!
//! ```rust
//! use datanode_render::{
//!     BuiltinParser, Field, HostContext, PendingData, Phase, Placeholder, RawData,
//!     RenderConfig, RenderEnv, Schema, Template,
//! };
//!
//! let env = RenderEnv::new(RenderConfig::default()).unwrap();
//! let parser = BuiltinParser::new();
//! let host = HostContext::new(&env, Phase::Immediate, &parser).docname("index");
//!
//! let schema = Schema::new()
//!     .name(Field::str().required())
//!     .attr("color", Field::str())
//!     .content(Field::str());
//! let raw = RawData::new().name("Widget").attr("color", "red").content("hello");
//! let template = Template::new("{{ name }}: {{ color }} - {{ content }}");
//!
//! let result = Placeholder::new(PendingData::new(raw, schema), template).render(&host);
//! let text: Vec<String> = result.elements().map(|n| n.astext()).collect();
//! assert_eq!(text, vec!["Widget: red - hello"]);
//! ```
//!
//! ## Failure Isolation
//!
//! Validation, template and markup failures never escape a render. The
//! result carries a [`DebugReport`] naming the failed [`Stage`] instead:
//!
//! ```rust
//! use datanode_render::{
//!     BuiltinParser, Field, HostContext, PendingData, Phase, Placeholder, RawData,
//!     RenderConfig, RenderEnv, Schema, Stage, Template,
//! };
//!
//! let env = RenderEnv::new(RenderConfig::default()).unwrap();
//! let parser = BuiltinParser::new();
//! let host = HostContext::new(&env, Phase::Immediate, &parser);
//!
//! let schema = Schema::new().name(Field::str().required());
//! let result = Placeholder::new(PendingData::new(RawData::new(), schema), Template::new("x"))
//!     .render(&host);
//! assert_eq!(result.elements().count(), 0);
//! assert_eq!(result.reports().next().unwrap().failed, Some(Stage::Validate));
//! ```

mod data;
mod env;
mod error;
mod extra;
mod markup;
mod node;
mod pending;
mod phase;
mod rendered;
mod report;
mod sandbox;
mod template;

pub use data::{CoerceFn, Coercion, Data, Field, ParsedData, PendingData, RawData, Schema};
pub use env::{RenderConfig, RenderEnv, RenderEnvBuilder, DEBUG_ENV_VAR};
pub use error::{CapabilityError, FieldRef, PhaseError, TemplateRenderError, ValidationError};
pub use extra::{
    ExtraContext, ExtraContextGenerator, ExtraContextProvider, HostContext, HostFacts,
    ProviderRegistry, Trigger,
};
pub use markup::{BlockOnly, BuiltinParser, MarkupOutput, MarkupParser, MarkupRenderer};
pub use node::{DataNode, Element, Node};
pub use pending::{
    MarkupTextHook, ParsedDataHook, Placeholder, PlaceholderData, RawDataHook, RenderedHook,
};
pub use phase::{Checkpoints, Phase};
pub use rendered::{Flattened, RenderedResult};
pub use report::{DebugReport, ReportEntry, Stage};
pub use sandbox::{register_filters, Capabilities, Evaluator, Receiver};
pub use template::{merge_context, Template};

// Tree and parser types hosts need alongside the render core.
pub use datanode_markup::{
    pformat_all, Attributes, Diagnostic, Kind, Level, MarkupParseError, Parsed, SourceLocation,
};
