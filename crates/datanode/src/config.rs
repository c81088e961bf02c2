//! Project configuration loaded from YAML.
//!
//! ```yaml
//! render:
//!   render_debug: false
//! checkpoints: [immediate, post-parse, post-resolve]
//! types:
//!   widget:
//!     schema:
//!       name: { required: true }
//!       attrs:
//!         size: { type: int }
//!         tags: { type: list, separator: "," }
//!       content: {}
//!       strict: true
//!     template:
//!       text: "{{ name }} ({{ size }})"
//!       phase: post-parse
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use datanode_render::{
    Checkpoints, Coercion, Field, Phase, RenderConfig, RenderEnv, Schema, Template,
};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::{DataType, TypeRegistry};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub render: RenderConfig,
    /// Checkpoints the host runs. All of them when absent.
    pub checkpoints: Option<Vec<Phase>>,
    pub types: BTreeMap<String, TypeSpec>,
}

/// A named data type.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeSpec {
    #[serde(default)]
    pub schema: SchemaSpec,
    pub template: Template,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaSpec {
    pub name: Option<FieldSpec>,
    pub attrs: BTreeMap<String, FieldSpec>,
    /// Applied to attributes not listed in `attrs`.
    pub other_attrs: Option<FieldSpec>,
    pub content: Option<FieldSpec>,
    pub strict: bool,
}

/// Value types a field can coerce to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Str,
    Int,
    Float,
    Bool,
    List,
    Choice,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldSpec {
    pub required: bool,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Allowed values for `choice`, or for each `list` item.
    pub choices: Vec<String>,
    /// Item separator for `list`; whitespace when absent.
    pub separator: Option<String>,
    /// Item type for `list`.
    pub item: Option<FieldType>,
}

impl FieldSpec {
    fn coercion(&self, field_type: FieldType) -> Result<Coercion, String> {
        Ok(match field_type {
            FieldType::Str => Coercion::Str,
            FieldType::Int => Coercion::Int,
            FieldType::Float => Coercion::Float,
            FieldType::Bool => Coercion::Bool,
            FieldType::Choice if self.choices.is_empty() => {
                return Err("choice needs a non-empty 'choices' list".to_string())
            }
            FieldType::Choice => Coercion::Choice(self.choices.clone()),
            FieldType::List => return Err("list items cannot be lists".to_string()),
        })
    }

    /// Builds the field this spec describes.
    pub fn to_field(&self) -> Result<Field, String> {
        let rule = match self.field_type {
            FieldType::List => Coercion::List {
                separator: self.separator.clone(),
                item: Box::new(self.coercion(self.item.unwrap_or_default())?),
            },
            other => self.coercion(other)?,
        };
        let field = Field::new(rule);
        Ok(if self.required { field.required() } else { field })
    }
}

impl SchemaSpec {
    pub fn to_schema(&self, type_name: &str) -> Result<Schema, ConfigError> {
        let field = |label: &str, spec: &FieldSpec| {
            spec.to_field().map_err(|reason| ConfigError::InvalidField {
                type_name: type_name.to_string(),
                field: label.to_string(),
                reason,
            })
        };

        let mut schema = Schema::new().strict(self.strict);
        if let Some(spec) = &self.name {
            schema = schema.name(field("name", spec)?);
        }
        for (key, spec) in &self.attrs {
            schema = schema.attr(key.clone(), field(key.as_str(), spec)?);
        }
        if let Some(spec) = &self.other_attrs {
            schema = schema.other_attrs(field("other_attrs", spec)?);
        }
        if let Some(spec) = &self.content {
            schema = schema.content(field("content", spec)?);
        }
        Ok(schema)
    }
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn checkpoints(&self) -> Checkpoints {
        match &self.checkpoints {
            Some(phases) => phases.iter().copied().collect(),
            None => Checkpoints::all(),
        }
    }

    /// The render environment, with the environment debug toggle applied.
    pub fn render_env(&self) -> Result<RenderEnv, ConfigError> {
        Ok(RenderEnv::new(self.render.clone().with_env_overrides())?)
    }

    pub fn type_registry(&self) -> Result<TypeRegistry, ConfigError> {
        self.types
            .iter()
            .map(|(name, spec)| {
                Ok(DataType::new(
                    name.clone(),
                    spec.schema.to_schema(name)?,
                    spec.template.clone(),
                ))
            })
            .collect()
    }
}
