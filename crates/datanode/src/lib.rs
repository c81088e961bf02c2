//! # Datanode - Structured Data in Documents
//!
//! Authors define small data records inside documents. Each record is
//! validated against a schema and rendered through a template into document
//! nodes, either right away or at a later checkpoint of the host pipeline
//! when the context it needs (titles, resolved references) exists.
//!
//! This crate is the application-facing layer: a [`Document`] tree host,
//! the three checkpoint scans driven by a [`Project`], the [`DataDefiner`]
//! with block, inline and title-named authoring surfaces, named
//! [`DataType`]s loaded from a YAML [`Config`], and default [`preset`]s. The
//! render core is re-exported from `datanode-render`.
//!
//! ## Quick Start
//!
//! ```rust
//! use datanode::{BlockSurface, Checkpoints, Document, Field, Phase, Project,
//!     RenderConfig, RenderEnv, Schema, Template};
//!
//! let env = RenderEnv::new(RenderConfig::default()).unwrap();
//! let mut project = Project::new(env, Checkpoints::all());
//! project.add_document(Document::new("index")).unwrap();
//!
//! let schema = Schema::new().name(Field::str().required());
//! let surface = BlockSurface::new(["Widget"])
//!     .schema(schema)
//!     .template(Template::new("{{ name }} of {{ titles|length }}").phase(Phase::PostParse));
//! project.insert_definition("index", &[0], &surface).unwrap();
//!
//! project.doc_parsed("index").unwrap();
//! let outcomes = project.finish_parsing().unwrap();
//! assert_eq!(outcomes["index"].rendered, 1);
//!
//! let doc = project.document("index").unwrap();
//! assert!(doc.pending_paths().is_empty());
//! assert_eq!(doc.children()[0].astext(), "Widget of 0");
//! ```

mod config;
mod definer;
mod document;
mod error;
pub mod preset;
mod project;
mod scan;
mod types;

pub use config::{Config, FieldSpec, FieldType, SchemaSpec, TypeSpec};
pub use definer::{
    AuthoringSurface, AutoSurface, BlockSurface, DataDefiner, Defined, InlineSurface,
};
pub use document::{Document, NodePath};
pub use error::{ConfigError, DefineError, DocumentError};
pub use project::Project;
pub use scan::{scan, ScanOutcome};
pub use types::{DataType, TypeRegistry};

// Render core
pub use datanode_render::{
    merge_context, register_filters, Attributes, BlockOnly, BuiltinParser, Capabilities,
    CapabilityError, Checkpoints, Coercion, Data, DataNode, DebugReport, Diagnostic, Element,
    Evaluator, ExtraContext, ExtraContextGenerator, ExtraContextProvider, Field, FieldRef,
    Flattened,
    HostContext, HostFacts, Kind, Level, MarkupOutput, MarkupParseError, MarkupParser,
    MarkupRenderer, Node, ParsedData, PendingData, Phase, PhaseError, Placeholder,
    PlaceholderData, ProviderRegistry, RawData, Receiver, RenderConfig, RenderEnv,
    RenderEnvBuilder, RenderedResult, ReportEntry, Schema, SourceLocation, Stage, Template,
    TemplateRenderError, Trigger, ValidationError, DEBUG_ENV_VAR,
};
pub use datanode_markup as markup;
