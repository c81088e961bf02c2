//! Driving documents through the three checkpoints.
//!
//! ```text
//! add_document / define ... doc_parsed(doc)    Immediate scan, per document
//! finish_parsing()                             PostParse scan, every document
//! post_resolve(doc, refs)                      PostResolve scan, per document
//! ```
//!
//! A [`Project`] rejects checkpoints that run out of order, run twice, or are
//! not enabled.

use std::collections::BTreeMap;

use datanode_render::{
    BlockOnly, BuiltinParser, Checkpoints, HostContext, HostFacts, MarkupParser, Phase,
    RenderEnv,
};

use crate::config::Config;
use crate::definer::{AuthoringSurface, AutoSurface, DataDefiner, Defined};
use crate::document::{title_text, Document};
use crate::error::{ConfigError, DocumentError};
use crate::scan::{scan, ScanOutcome};
use crate::types::TypeRegistry;

/// A set of documents plus the render environment they share.
#[derive(Debug)]
pub struct Project {
    env: RenderEnv,
    checkpoints: Checkpoints,
    types: TypeRegistry,
    parser: BuiltinParser,
    block_parser: BlockOnly<BuiltinParser>,
    titles: Vec<String>,
    documents: BTreeMap<String, Document>,
    progress: BTreeMap<String, Option<Phase>>,
    parsing_finished: bool,
}

impl Project {
    pub fn new(env: RenderEnv, checkpoints: Checkpoints) -> Self {
        Self {
            env,
            checkpoints,
            types: TypeRegistry::new(),
            parser: BuiltinParser::new(),
            block_parser: BlockOnly(BuiltinParser::new()),
            titles: Vec::new(),
            documents: BTreeMap::new(),
            progress: BTreeMap::new(),
            parsing_finished: false,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let project = Self::new(config.render_env()?, config.checkpoints());
        Ok(project.with_types(config.type_registry()?))
    }

    pub fn with_types(mut self, types: TypeRegistry) -> Self {
        self.types = types;
        self
    }

    pub fn env(&self) -> &RenderEnv {
        &self.env
    }

    pub fn checkpoints(&self) -> &Checkpoints {
        &self.checkpoints
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Titles collected from every document when parsing finished.
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn document(&self, name: &str) -> Option<&Document> {
        self.documents.get(name)
    }

    pub fn document_mut(&mut self, name: &str) -> Option<&mut Document> {
        self.documents.get_mut(name)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// The last checkpoint that ran for `name`.
    pub fn last_checkpoint(&self, name: &str) -> Option<Phase> {
        self.progress.get(name).copied().flatten()
    }

    pub fn add_document(&mut self, doc: Document) -> Result<(), DocumentError> {
        let name = doc.name().to_string();
        if self.parsing_finished {
            return Err(DocumentError::ParsingFinished(name));
        }
        if self.documents.contains_key(&name) {
            return Err(DocumentError::DuplicateDocument(name));
        }
        self.progress.insert(name.clone(), None);
        self.documents.insert(name, doc);
        Ok(())
    }

    /// Dispatches one definition made while parsing `docname`.
    pub fn define(&self, docname: &str, surface: &dyn AuthoringSurface) -> Defined {
        let host = HostContext::new(&self.env, Phase::Immediate, &self.parser).docname(docname);
        DataDefiner::new(&host, &self.checkpoints).define_or_render(surface)
    }

    /// Defines data and places the outcome at `path` in `docname`.
    ///
    /// Messages from an inline result go to the nearest block container.
    pub fn insert_definition(
        &mut self,
        docname: &str,
        path: &[usize],
        surface: &dyn AuthoringSurface,
    ) -> Result<(), DocumentError> {
        let flat = self.define(docname, surface).into_nodes();
        let doc = self
            .documents
            .get_mut(docname)
            .ok_or_else(|| DocumentError::UnknownDocument(docname.to_string()))?;
        let (last, parents) = path.split_last().ok_or_else(|| DocumentError::InvalidPath {
            path: path.to_vec(),
        })?;
        let container = doc.nearest_container(path);

        let siblings = doc.children_at_mut(parents).ok_or_else(|| DocumentError::InvalidPath {
            path: path.to_vec(),
        })?;
        if *last > siblings.len() {
            return Err(DocumentError::InvalidPath {
                path: path.to_vec(),
            });
        }
        siblings.splice(*last..*last, flat.inline);

        if !flat.messages.is_empty() {
            let target = doc
                .children_at_mut(&container)
                .ok_or_else(|| DocumentError::InvalidPath { path: container.clone() })?;
            target.extend(flat.messages);
        }
        Ok(())
    }

    /// Defines data named after the title governing `path`, then places it.
    ///
    /// The title's text becomes the definition's name, and the title's
    /// children are replaced by an inline placeholder that renders the title
    /// template. Without a governing title the surface is placed unchanged.
    pub fn insert_auto_definition(
        &mut self,
        docname: &str,
        path: &[usize],
        surface: AutoSurface,
    ) -> Result<(), DocumentError> {
        let doc = self
            .document(docname)
            .ok_or_else(|| DocumentError::UnknownDocument(docname.to_string()))?;
        let Some(title_path) = doc.title_for(path) else {
            tracing::debug!(doc = %docname, "no title above auto definition");
            return self.insert_definition(docname, path, &surface);
        };
        let text = doc.get(&title_path).map(title_text).unwrap_or_default();
        let surface = surface.title(text);

        let host = HostContext::new(&self.env, Phase::Immediate, &self.parser).docname(docname);
        let flat = DataDefiner::new(&host, &self.checkpoints)
            .dispatch(surface.title_placeholder())
            .into_nodes();
        let doc = self
            .documents
            .get_mut(docname)
            .ok_or_else(|| DocumentError::UnknownDocument(docname.to_string()))?;
        let mut inside = title_path.clone();
        inside.push(0);
        let container = doc.nearest_container(&inside);
        let title = doc
            .children_at_mut(&title_path)
            .ok_or_else(|| DocumentError::InvalidPath { path: title_path.clone() })?;
        *title = flat.inline;
        if !flat.messages.is_empty() {
            let target = doc
                .children_at_mut(&container)
                .ok_or_else(|| DocumentError::InvalidPath { path: container.clone() })?;
            target.extend(flat.messages);
        }

        self.insert_definition(docname, path, &surface)
    }

    /// Immediate checkpoint: `docname` finished its initial parse.
    pub fn doc_parsed(&mut self, docname: &str) -> Result<ScanOutcome, DocumentError> {
        if self.parsing_finished {
            return Err(DocumentError::OutOfOrder {
                docname: docname.to_string(),
                phase: Phase::Immediate,
                expected: self.expected_next(docname),
            });
        }
        self.advance(docname, Phase::Immediate)?;
        self.scan_document(docname, Phase::Immediate, &HostFacts::default())
    }

    /// PostParse checkpoint: every document finished its initial parse.
    ///
    /// Collects titles from all documents, then scans each of them when the
    /// checkpoint is enabled.
    pub fn finish_parsing(&mut self) -> Result<BTreeMap<String, ScanOutcome>, DocumentError> {
        if self.parsing_finished {
            return Err(DocumentError::ParsingAlreadyFinished);
        }
        if self.checkpoints.contains(Phase::Immediate) {
            if let Some((name, _)) = self
                .progress
                .iter()
                .find(|(_, last)| last.is_none())
            {
                return Err(DocumentError::OutOfOrder {
                    docname: name.clone(),
                    phase: Phase::PostParse,
                    expected: Some(Phase::Immediate),
                });
            }
        }

        self.parsing_finished = true;
        self.titles = self.documents.values().flat_map(Document::titles).collect();

        let mut outcomes = BTreeMap::new();
        if !self.checkpoints.contains(Phase::PostParse) {
            return Ok(outcomes);
        }
        let facts = HostFacts {
            titles: self.titles.clone(),
            refs: BTreeMap::new(),
        };
        let names: Vec<String> = self.documents.keys().cloned().collect();
        for name in names {
            self.advance(&name, Phase::PostParse)?;
            let outcome = self.scan_document(&name, Phase::PostParse, &facts)?;
            outcomes.insert(name, outcome);
        }
        Ok(outcomes)
    }

    /// PostResolve checkpoint: references in `docname` are resolved.
    pub fn post_resolve(
        &mut self,
        docname: &str,
        refs: BTreeMap<String, String>,
    ) -> Result<ScanOutcome, DocumentError> {
        if !self.parsing_finished {
            return Err(DocumentError::ParsingUnfinished(Phase::PostResolve));
        }
        self.advance(docname, Phase::PostResolve)?;
        let facts = HostFacts {
            titles: self.titles.clone(),
            refs,
        };
        self.scan_document(docname, Phase::PostResolve, &facts)
    }

    fn expected_next(&self, docname: &str) -> Option<Phase> {
        match self.last_checkpoint(docname) {
            Some(last) => self.checkpoints.next_after(last),
            None => self.checkpoints.first(),
        }
    }

    fn advance(&mut self, docname: &str, phase: Phase) -> Result<(), DocumentError> {
        if !self.checkpoints.contains(phase) {
            return Err(DocumentError::CheckpointDisabled(phase));
        }
        let last = *self
            .progress
            .get(docname)
            .ok_or_else(|| DocumentError::UnknownDocument(docname.to_string()))?;
        if last == Some(phase) {
            return Err(DocumentError::Repeated {
                docname: docname.to_string(),
                phase,
            });
        }
        let expected = self.expected_next(docname);
        if expected != Some(phase) {
            return Err(DocumentError::OutOfOrder {
                docname: docname.to_string(),
                phase,
                expected,
            });
        }
        self.progress.insert(docname.to_string(), Some(phase));
        Ok(())
    }

    fn scan_document(
        &mut self,
        docname: &str,
        phase: Phase,
        facts: &HostFacts,
    ) -> Result<ScanOutcome, DocumentError> {
        // Later checkpoints only offer block parsing.
        let parser: &dyn MarkupParser = if phase == Phase::Immediate {
            &self.parser
        } else {
            &self.block_parser
        };
        let doc = self
            .documents
            .get_mut(docname)
            .ok_or_else(|| DocumentError::UnknownDocument(docname.to_string()))?;
        let host = HostContext::new(&self.env, phase, parser)
            .docname(docname)
            .facts(facts);
        Ok(scan(doc, &host))
    }
}
