//! Errors raised by the tree host, checkpoint driver, definer and
//! configuration loader.
//!
//! These are structural misuse errors and are returned to the caller.
//! Per-definition render failures never show up here; they are reported
//! inside the rendered result.

use std::path::PathBuf;

use datanode_render::{CapabilityError, Phase};
use thiserror::Error;

/// Tree or checkpoint misuse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("no node at path {path:?}")]
    InvalidPath { path: Vec<usize> },

    #[error("node at path {path:?} is not a pending placeholder")]
    NotPending { path: Vec<usize> },

    #[error("unknown document '{0}'")]
    UnknownDocument(String),

    #[error("document '{0}' is already registered")]
    DuplicateDocument(String),

    #[error("document '{0}' was added after parsing finished")]
    ParsingFinished(String),

    #[error("checkpoint '{0}' is not enabled for this project")]
    CheckpointDisabled(Phase),

    #[error("checkpoint '{phase}' already ran for document '{docname}'")]
    Repeated { docname: String, phase: Phase },

    #[error("checkpoint '{phase}' is out of order for document '{docname}'")]
    OutOfOrder {
        docname: String,
        phase: Phase,
        expected: Option<Phase>,
    },

    #[error("checkpoint '{0}' needs every document to be parsed first")]
    ParsingUnfinished(Phase),

    #[error("parsing already finished")]
    ParsingAlreadyFinished,
}

/// A definition the authoring surface cannot dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefineError {
    #[error("{type_name}: takes no arguments, got {count}")]
    UnexpectedArguments { type_name: String, count: usize },

    #[error("{type_name}: requires a name argument")]
    MissingArgument { type_name: String },

    #[error("{type_name}: unknown option '{option}'")]
    UnknownOption { type_name: String, option: String },

    #[error("{type_name}: takes no content")]
    UnexpectedContent { type_name: String },

    #[error("unknown data type '{0}'")]
    UnknownType(String),
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("type '{type_name}', field '{field}': {reason}")]
    InvalidField {
        type_name: String,
        field: String,
        reason: String,
    },

    #[error(transparent)]
    Capability(#[from] CapabilityError),
}
