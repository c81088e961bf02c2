//! Error types for the render chain.
//!
//! Validation, template and markup failures are recovered at the placeholder
//! boundary and turned into [`crate::DebugReport`]s. Capability and phase
//! errors are configuration mistakes and are returned to the caller.

use std::fmt;

use thiserror::Error;

use crate::phase::Phase;

/// The part of a record a validation error refers to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldRef {
    Name,
    Attr(String),
    Content,
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Name => write!(f, "name"),
            FieldRef::Attr(key) => write!(f, "attribute '{}'", key),
            FieldRef::Content => write!(f, "content"),
        }
    }
}

/// A record failed its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field has no value.
    #[error("missing required {field}")]
    Missing { field: FieldRef },

    /// A value failed its coercion rule.
    #[error("invalid value {value:?} for {field}: {reason}")]
    Invalid {
        field: FieldRef,
        value: String,
        reason: String,
    },

    /// A strict schema received a field it does not declare.
    #[error("unexpected {field}: the schema does not declare it")]
    Unexpected { field: FieldRef },
}

impl ValidationError {
    /// The field the error is about.
    pub fn field(&self) -> &FieldRef {
        match self {
            ValidationError::Missing { field }
            | ValidationError::Invalid { field, .. }
            | ValidationError::Unexpected { field } => field,
        }
    }
}

/// The template evaluator failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TemplateRenderError {
    /// Evaluator error category (e.g. `SyntaxError`, `UndefinedError`).
    pub kind: String,
    pub message: String,
    /// Template line the error points at, if known.
    pub line: Option<usize>,
}

impl From<minijinja::Error> for TemplateRenderError {
    fn from(err: minijinja::Error) -> Self {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(&format!("\ncaused by: {}", cause));
            source = cause.source();
        }
        TemplateRenderError {
            kind: format!("{:?}", err.kind()),
            message,
            line: err.line(),
        }
    }
}

/// The sandbox capability table is inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("allowed method '{method}' starts with the reserved prefix '{prefix}'")]
    ReservedMethod { method: String, prefix: String },
}

/// A phase name or value the host cannot honor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseError {
    #[error("unknown phase '{0}' (expected immediate, post-parse or post-resolve)")]
    Unknown(String),

    #[error("phase '{phase}' is never reached: the host does not run that checkpoint")]
    Unreachable { phase: Phase },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_error_names_field() {
        let err = ValidationError::Missing {
            field: FieldRef::Name,
        };
        assert_eq!(err.to_string(), "missing required name");
        assert_eq!(err.field(), &FieldRef::Name);
    }

    #[test]
    fn attr_field_display() {
        let err = ValidationError::Invalid {
            field: FieldRef::Attr("size".into()),
            value: "big".into(),
            reason: "invalid digit found in string".into(),
        };
        assert!(err.to_string().contains("attribute 'size'"));
        assert!(err.to_string().contains("\"big\""));
    }

    #[test]
    fn from_minijinja_keeps_kind() {
        let mj = minijinja::Error::new(minijinja::ErrorKind::UndefinedError, "x is undefined");
        let err: TemplateRenderError = mj.into();
        assert_eq!(err.kind, "UndefinedError");
        assert!(err.message.contains("x is undefined"));
    }
}
