//! Named data types: a schema and template registered under a name.

use std::collections::BTreeMap;

use datanode_render::{Schema, Template};

use crate::definer::{BlockSurface, InlineSurface};
use crate::error::DefineError;

/// A named schema/template pair.
#[derive(Debug, Clone)]
pub struct DataType {
    name: String,
    schema: Schema,
    template: Template,
}

impl DataType {
    pub fn new(name: impl Into<String>, schema: Schema, template: Template) -> Self {
        Self {
            name: name.into(),
            schema,
            template,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// A strict block surface for this type.
    pub fn block<A, S>(&self, arguments: A) -> BlockSurface
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BlockSurface::new(arguments)
            .schema(self.schema.clone())
            .template(self.template.clone())
            .strict(self.name.clone())
    }

    pub fn inline(&self, text: impl Into<String>) -> InlineSurface {
        InlineSurface::new(text)
            .schema(self.schema.clone())
            .template(self.template.clone())
    }
}

/// Data types by name.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, DataType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `data_type`, replacing any type with the same name.
    pub fn register(&mut self, data_type: DataType) -> Option<DataType> {
        self.types.insert(data_type.name.clone(), data_type)
    }

    pub fn get(&self, name: &str) -> Result<&DataType, DefineError> {
        self.types
            .get(name)
            .ok_or_else(|| DefineError::UnknownType(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<DataType> for TypeRegistry {
    fn from_iter<T: IntoIterator<Item = DataType>>(iter: T) -> Self {
        let mut registry = Self::new();
        for data_type in iter {
            registry.register(data_type);
        }
        registry
    }
}
