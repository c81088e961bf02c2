//! Raw records, schemas, and validated data.
//!
//! Authors write a [`RawData`] record (an optional name, string attributes,
//! optional content). A [`Schema`] validates and coerces it into
//! [`ParsedData`], whose fields become template variables.
//!
//! ```rust
//! use datanode_render::{Field, RawData, Schema};
//!
//! let schema = Schema::new()
//!     .name(Field::str().required())
//!     .attr("size", Field::int())
//!     .content(Field::str());
//!
//! let raw = RawData::new().name("Widget").attr("size", "3");
//! let parsed = schema.parse(&raw).unwrap();
//! assert_eq!(parsed.attrs["size"], serde_json::json!(3));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FieldRef, ValidationError};

/// An unvalidated author-supplied record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawData {
    pub name: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    pub content: Option<String>,
}

impl RawData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Custom coercion function.
pub type CoerceFn = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;

/// How a raw string becomes a typed value.
#[derive(Clone)]
pub enum Coercion {
    Str,
    Int,
    Float,
    /// `true/false`, `yes/no`, `on/off`, `1/0`, case-insensitive.
    Bool,
    /// Splits on `separator` (whitespace when `None`) and coerces each item.
    List {
        separator: Option<String>,
        item: Box<Coercion>,
    },
    /// Accepts only one of the listed values.
    Choice(Vec<String>),
    Custom(CoerceFn),
}

impl fmt::Debug for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coercion::Str => write!(f, "Str"),
            Coercion::Int => write!(f, "Int"),
            Coercion::Float => write!(f, "Float"),
            Coercion::Bool => write!(f, "Bool"),
            Coercion::List { separator, item } => f
                .debug_struct("List")
                .field("separator", separator)
                .field("item", item)
                .finish(),
            Coercion::Choice(values) => f.debug_tuple("Choice").field(values).finish(),
            Coercion::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}

impl Coercion {
    /// Converts `raw` according to this rule.
    pub fn apply(&self, raw: &str) -> Result<Value, String> {
        match self {
            Coercion::Str => Ok(Value::String(raw.to_string())),
            Coercion::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| e.to_string()),
            Coercion::Float => {
                let f = raw.trim().parse::<f64>().map_err(|e| e.to_string())?;
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| "not a finite number".to_string())
            }
            Coercion::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
                other => Err(format!("'{}' is not a boolean", other)),
            },
            Coercion::List { separator, item } => {
                let parts: Vec<&str> = match separator {
                    Some(sep) => raw.split(sep.as_str()).map(str::trim).collect(),
                    None => raw.split_whitespace().collect(),
                };
                parts
                    .into_iter()
                    .filter(|p| !p.is_empty())
                    .map(|p| item.apply(p))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            Coercion::Choice(values) => {
                let trimmed = raw.trim();
                if values.iter().any(|v| v == trimmed) {
                    Ok(Value::String(trimmed.to_string()))
                } else {
                    Err(format!("expected one of: {}", values.join(", ")))
                }
            }
            Coercion::Custom(f) => f(raw),
        }
    }
}

/// Declarative rule for one value: presence plus coercion.
#[derive(Debug, Clone)]
pub struct Field {
    required: bool,
    rule: Coercion,
}

impl Default for Field {
    fn default() -> Self {
        Self::str()
    }
}

impl Field {
    pub fn new(rule: Coercion) -> Self {
        Self {
            required: false,
            rule,
        }
    }

    pub fn str() -> Self {
        Self::new(Coercion::Str)
    }

    pub fn int() -> Self {
        Self::new(Coercion::Int)
    }

    pub fn float() -> Self {
        Self::new(Coercion::Float)
    }

    pub fn bool() -> Self {
        Self::new(Coercion::Bool)
    }

    pub fn list(separator: Option<&str>, item: Coercion) -> Self {
        Self::new(Coercion::List {
            separator: separator.map(str::to_string),
            item: Box::new(item),
        })
    }

    pub fn choice<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Coercion::Choice(values.into_iter().map(Into::into).collect()))
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self::new(Coercion::Custom(Arc::new(f)))
    }

    /// Builder: marks the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn rule(&self) -> &Coercion {
        &self.rule
    }

    /// Validates and coerces one value.
    ///
    /// Returns `Ok(None)` for an absent optional value.
    pub fn parse(
        &self,
        field: &FieldRef,
        value: Option<&str>,
    ) -> Result<Option<Value>, ValidationError> {
        match value {
            None if self.required => Err(ValidationError::Missing {
                field: field.clone(),
            }),
            None => Ok(None),
            Some(raw) => self
                .rule
                .apply(raw)
                .map(Some)
                .map_err(|reason| ValidationError::Invalid {
                    field: field.clone(),
                    value: raw.to_string(),
                    reason,
                }),
        }
    }
}

/// Shape of a record: one optional field each for name and content, plus
/// per-attribute fields.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub name: Option<Field>,
    pub attrs: BTreeMap<String, Field>,
    /// Applied to attributes not declared in `attrs`.
    pub other_attrs: Option<Field>,
    pub content: Option<Field>,
    /// Reject undeclared values instead of passing them through.
    pub strict: bool,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, field: Field) -> Self {
        self.name = Some(field);
        self
    }

    pub fn attr(mut self, key: impl Into<String>, field: Field) -> Self {
        self.attrs.insert(key.into(), field);
        self
    }

    pub fn other_attrs(mut self, field: Field) -> Self {
        self.other_attrs = Some(field);
        self
    }

    pub fn content(mut self, field: Field) -> Self {
        self.content = Some(field);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Validates `raw` against this schema.
    ///
    /// Fields are checked in a fixed order (name, attributes by key, content),
    /// and the first failure is returned.
    pub fn parse(&self, raw: &RawData) -> Result<ParsedData, ValidationError> {
        let name = self.parse_slot(self.name.as_ref(), FieldRef::Name, raw.name.as_deref())?;

        let mut attrs = BTreeMap::new();
        for (key, field) in &self.attrs {
            let value = field.parse(
                &FieldRef::Attr(key.clone()),
                raw.attrs.get(key).map(String::as_str),
            )?;
            attrs.insert(key.clone(), value.unwrap_or(Value::Null));
        }
        for (key, value) in &raw.attrs {
            if self.attrs.contains_key(key) {
                continue;
            }
            let field_ref = FieldRef::Attr(key.clone());
            let parsed = self
                .parse_slot(self.other_attrs.as_ref(), field_ref, Some(value))?
                .unwrap_or(Value::Null);
            attrs.insert(key.clone(), parsed);
        }

        let content =
            self.parse_slot(self.content.as_ref(), FieldRef::Content, raw.content.as_deref())?;

        Ok(ParsedData {
            name,
            attrs,
            content,
        })
    }

    fn parse_slot(
        &self,
        field: Option<&Field>,
        field_ref: FieldRef,
        value: Option<&str>,
    ) -> Result<Option<Value>, ValidationError> {
        match (field, value) {
            (Some(field), value) => field.parse(&field_ref, value),
            (None, None) => Ok(None),
            (None, Some(_)) if self.strict => Err(ValidationError::Unexpected { field: field_ref }),
            (None, Some(raw)) => Ok(Some(Value::String(raw.to_string()))),
        }
    }
}

/// A record that passed its schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedData {
    pub name: Option<Value>,
    pub attrs: BTreeMap<String, Value>,
    pub content: Option<Value>,
}

impl ParsedData {
    /// Template variables for this record.
    ///
    /// `name`, `attrs` and `content` are always present (`null` when absent).
    /// Each attribute is also exposed at top level unless it collides with
    /// one of those three names.
    pub fn to_context(&self) -> Map<String, Value> {
        let mut ctx = Map::new();
        for (key, value) in &self.attrs {
            ctx.insert(key.clone(), value.clone());
        }
        ctx.insert("name".into(), self.name.clone().unwrap_or(Value::Null));
        ctx.insert(
            "attrs".into(),
            Value::Object(self.attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        );
        ctx.insert("content".into(), self.content.clone().unwrap_or(Value::Null));
        ctx
    }
}

/// A raw record paired with the schema it must satisfy.
#[derive(Debug, Clone)]
pub struct PendingData {
    pub raw: RawData,
    pub schema: Schema,
}

impl PendingData {
    pub fn new(raw: RawData, schema: Schema) -> Self {
        Self { raw, schema }
    }

    pub fn parse(&self) -> Result<ParsedData, ValidationError> {
        self.schema.parse(&self.raw)
    }
}

/// Data ready for a template: validated, or supplied as a plain mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Parsed(ParsedData),
    Plain(Map<String, Value>),
}

impl Data {
    pub fn to_context(&self) -> Map<String, Value> {
        match self {
            Data::Parsed(parsed) => parsed.to_context(),
            Data::Plain(map) => map.clone(),
        }
    }

    pub fn as_parsed(&self) -> Option<&ParsedData> {
        match self {
            Data::Parsed(parsed) => Some(parsed),
            Data::Plain(_) => None,
        }
    }
}

impl From<ParsedData> for Data {
    fn from(parsed: ParsedData) -> Self {
        Data::Parsed(parsed)
    }
}

impl From<Map<String, Value>> for Data {
    fn from(map: Map<String, Value>) -> Self {
        Data::Plain(map)
    }
}
