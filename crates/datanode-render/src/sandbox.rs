//! The restricted template evaluator.
//!
//! Templates run in a MiniJinja environment with two restrictions:
//!
//! - Members and keys whose names start with the reserved prefix are removed
//!   from the context before rendering, so templates cannot see them.
//! - Method calls are resolved against an explicit [`Capabilities`] table.
//!   Anything not in the table fails the render.
//!
//! The table is validated when the [`Evaluator`] is built.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use minijinja::value::ValueKind;
use minijinja::{Environment, Error, ErrorKind, State, UndefinedBehavior, Value};
use once_cell::sync::Lazy;
use serde_json::Map;

use crate::env::RenderConfig;
use crate::error::{CapabilityError, TemplateRenderError};

/// Value kinds that expose methods to templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Receiver {
    Map,
    String,
}

impl Receiver {
    fn of(value: &Value) -> Option<Receiver> {
        match value.kind() {
            ValueKind::Map => Some(Receiver::Map),
            ValueKind::String => Some(Receiver::String),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Receiver::Map => "map",
            Receiver::String => "string",
        }
    }
}

static STANDARD_METHODS: Lazy<BTreeMap<Receiver, BTreeSet<String>>> = Lazy::new(|| {
    let mut methods = BTreeMap::new();
    methods.insert(
        Receiver::Map,
        ["items", "keys", "values", "get"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    methods.insert(
        Receiver::String,
        [
            "upper",
            "lower",
            "strip",
            "startswith",
            "endswith",
            "split",
            "replace",
            "title",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    );
    methods
});

/// Allowed method names per receiver kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    methods: BTreeMap<Receiver, BTreeSet<String>>,
}

impl Capabilities {
    /// An empty table: no method calls at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// The default table (`map`: items, keys, values, get; `string`: upper,
    /// lower, strip, startswith, endswith, split, replace, title).
    pub fn standard() -> Self {
        Self {
            methods: STANDARD_METHODS.clone(),
        }
    }

    /// Builder: allows one more method.
    ///
    /// Only methods with a built-in implementation have any effect; see
    /// [`Evaluator`].
    pub fn allow(mut self, receiver: Receiver, method: impl Into<String>) -> Self {
        self.methods.entry(receiver).or_default().insert(method.into());
        self
    }

    /// Builder: withdraws a method.
    pub fn deny(mut self, receiver: Receiver, method: &str) -> Self {
        if let Some(set) = self.methods.get_mut(&receiver) {
            set.remove(method);
        }
        self
    }

    pub fn permits(&self, receiver: Receiver, method: &str) -> bool {
        self.methods
            .get(&receiver)
            .is_some_and(|set| set.contains(method))
    }

    /// Rejects tables that allow a reserved name.
    pub fn validate(&self, reserved_prefix: &str) -> Result<(), CapabilityError> {
        if reserved_prefix.is_empty() {
            return Ok(());
        }
        for set in self.methods.values() {
            if let Some(method) = set.iter().find(|m| m.starts_with(reserved_prefix)) {
                return Err(CapabilityError::ReservedMethod {
                    method: method.clone(),
                    prefix: reserved_prefix.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// A configured MiniJinja environment plus its capability table.
pub struct Evaluator {
    env: Environment<'static>,
    capabilities: Arc<Capabilities>,
    reserved_prefix: String,
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("capabilities", &self.capabilities)
            .field("reserved_prefix", &self.reserved_prefix)
            .finish_non_exhaustive()
    }
}

impl Evaluator {
    pub fn new(config: &RenderConfig, capabilities: Capabilities) -> Result<Self, CapabilityError> {
        capabilities.validate(&config.reserved_prefix)?;
        let capabilities = Arc::new(capabilities);

        let mut env = Environment::new();
        env.set_undefined_behavior(if config.strict_undefined {
            UndefinedBehavior::Strict
        } else {
            UndefinedBehavior::Lenient
        });
        register_filters(&mut env);

        let table = Arc::clone(&capabilities);
        let prefix = config.reserved_prefix.clone();
        env.set_unknown_method_callback(
            move |_state: &State, value: &Value, method: &str, args: &[Value]| {
                call_method(&table, &prefix, value, method, args)
            },
        );

        Ok(Self {
            env,
            capabilities,
            reserved_prefix: config.reserved_prefix.clone(),
        })
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn reserved_prefix(&self) -> &str {
        &self.reserved_prefix
    }

    /// Access to the environment, for registering filters and functions.
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }

    /// Renders `source` with the given variables.
    ///
    /// Reserved members are stripped from `context` first.
    pub fn render(
        &self,
        source: &str,
        context: Map<String, serde_json::Value>,
    ) -> Result<String, TemplateRenderError> {
        let visible = strip_reserved(serde_json::Value::Object(context), &self.reserved_prefix);
        Ok(self.env.render_str(source, Value::from_serialize(&visible))?)
    }
}

/// Registers the template filters every environment carries.
pub fn register_filters(env: &mut Environment<'static>) {
    env.add_filter("nl", |value: Value| -> String { format!("{}\n", value) });

    // Inline literal, with any backquote pair broken up.
    env.add_filter("literal", |value: Value| -> String {
        format!("``{}``", value.to_string().replace("``", "` `"))
    });

    env.add_filter("escape_markup", |value: Value| -> String {
        let text = value.to_string();
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if matches!(c, '*' | '`' | '\\') {
                out.push('\\');
            }
            out.push(c);
        }
        out
    });
}

fn strip_reserved(value: serde_json::Value, prefix: &str) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .filter(|(k, _)| prefix.is_empty() || !k.starts_with(prefix))
                .map(|(k, v)| (k, strip_reserved(v, prefix)))
                .collect(),
        ),
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items.into_iter().map(|v| strip_reserved(v, prefix)).collect(),
        ),
        other => other,
    }
}

fn call_method(
    table: &Capabilities,
    prefix: &str,
    value: &Value,
    method: &str,
    args: &[Value],
) -> Result<Value, Error> {
    if !prefix.is_empty() && method.starts_with(prefix) {
        return Err(Error::new(
            ErrorKind::UnknownMethod,
            format!("method '{}' is reserved", method),
        ));
    }
    let receiver = Receiver::of(value).ok_or_else(|| {
        Error::new(
            ErrorKind::UnknownMethod,
            format!("{:?} has no method '{}'", value.kind(), method),
        )
    })?;
    if !table.permits(receiver, method) {
        return Err(Error::new(
            ErrorKind::UnknownMethod,
            format!("method '{}' on {} is not permitted", method, receiver.as_str()),
        ));
    }
    match receiver {
        Receiver::Map => map_method(value, method, args),
        Receiver::String => {
            let s = value.as_str().unwrap_or_default();
            string_method(s, method, args)
        }
    }
}

fn map_method(map: &Value, method: &str, args: &[Value]) -> Result<Value, Error> {
    match method {
        "keys" => Ok(Value::from(map.try_iter()?.collect::<Vec<_>>())),
        "values" => {
            let values = map
                .try_iter()?
                .map(|k| map.get_item(&k))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::from(values))
        }
        "items" => {
            let items = map
                .try_iter()?
                .map(|k| map.get_item(&k).map(|v| Value::from(vec![k, v])))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::from(items))
        }
        "get" => {
            let key = args.first().ok_or_else(|| missing("get", "key"))?;
            let found = map.get_item(key)?;
            if found.is_undefined() {
                Ok(args.get(1).cloned().unwrap_or(Value::from(())))
            } else {
                Ok(found)
            }
        }
        _ => Err(unimplemented_method(Receiver::Map, method)),
    }
}

fn string_method(s: &str, method: &str, args: &[Value]) -> Result<Value, Error> {
    let arg = |idx: usize| -> Option<String> {
        args.get(idx)
            .filter(|v| !v.is_none() && !v.is_undefined())
            .map(|v| v.to_string())
    };
    match method {
        "upper" => Ok(Value::from(s.to_uppercase())),
        "lower" => Ok(Value::from(s.to_lowercase())),
        "strip" => Ok(Value::from(match arg(0) {
            Some(chars) => s.trim_matches(|c| chars.contains(c)).to_string(),
            None => s.trim().to_string(),
        })),
        "startswith" => {
            let prefix = arg(0).ok_or_else(|| missing("startswith", "prefix"))?;
            Ok(Value::from(s.starts_with(prefix.as_str())))
        }
        "endswith" => {
            let suffix = arg(0).ok_or_else(|| missing("endswith", "suffix"))?;
            Ok(Value::from(s.ends_with(suffix.as_str())))
        }
        "split" => {
            let parts: Vec<Value> = match arg(0) {
                Some(sep) if !sep.is_empty() => s.split(sep.as_str()).map(Value::from).collect(),
                Some(_) => {
                    return Err(Error::new(ErrorKind::InvalidOperation, "empty separator"))
                }
                None => s.split_whitespace().map(Value::from).collect(),
            };
            Ok(Value::from(parts))
        }
        "replace" => {
            let old = arg(0).ok_or_else(|| missing("replace", "old"))?;
            let new = arg(1).ok_or_else(|| missing("replace", "new"))?;
            Ok(Value::from(s.replace(old.as_str(), &new)))
        }
        "title" => Ok(Value::from(title_case(s))),
        _ => Err(unimplemented_method(Receiver::String, method)),
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

fn missing(method: &str, arg: &str) -> Error {
    Error::new(
        ErrorKind::MissingArgument,
        format!("{}() requires a {} argument", method, arg),
    )
}

fn unimplemented_method(receiver: Receiver, method: &str) -> Error {
    Error::new(
        ErrorKind::UnknownMethod,
        format!("{} has no method '{}'", receiver.as_str(), method),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn evaluator() -> Evaluator {
        Evaluator::new(&RenderConfig::default(), Capabilities::standard()).unwrap()
    }

    fn ctx(value: serde_json::Value) -> Map<String, serde_json::Value> {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn renders_plain_variables() {
        let out = evaluator()
            .render("{{ a }}-{{ b }}", ctx(json!({"a": 1, "b": "x"})))
            .unwrap();
        assert_eq!(out, "1-x");
    }

    #[test]
    fn strict_undefined_fails() {
        let err = evaluator().render("{{ nope }}", Map::new()).unwrap_err();
        assert_eq!(err.kind, "UndefinedError");
    }

    #[test]
    fn lenient_undefined_renders_empty() {
        let config = RenderConfig {
            strict_undefined: false,
            ..RenderConfig::default()
        };
        let ev = Evaluator::new(&config, Capabilities::standard()).unwrap();
        assert_eq!(ev.render("[{{ nope }}]", Map::new()).unwrap(), "[]");
    }

    #[test]
    fn reserved_keys_are_invisible() {
        let ev = evaluator();
        let context = ctx(json!({"_secret": 1, "m": {"_hidden": 2, "shown": 3}}));
        assert!(ev.render("{{ _secret }}", context.clone()).is_err());
        assert!(ev.render("{{ m._hidden }}", context.clone()).is_err());
        assert_eq!(ev.render("{{ m.keys()|join(',') }}", context).unwrap(), "shown");
    }

    #[test]
    fn map_methods() {
        let ev = evaluator();
        let context = ctx(json!({"m": {"a": 1, "b": 2}}));
        let out = ev
            .render(
                "{% for k, v in m.items() %}{{ k }}={{ v }};{% endfor %}",
                context.clone(),
            )
            .unwrap();
        assert_eq!(out, "a=1;b=2;");
        assert_eq!(ev.render("{{ m.get('z', 9) }}", context.clone()).unwrap(), "9");
        assert_eq!(ev.render("{{ m.values()|sum }}", context).unwrap(), "3");
    }

    #[test]
    fn string_methods() {
        let ev = evaluator();
        let context = ctx(json!({"s": "  hello world  "}));
        assert_eq!(ev.render("{{ s.strip().upper() }}", context.clone()).unwrap(), "HELLO WORLD");
        assert_eq!(ev.render("{{ s.strip().title() }}", context.clone()).unwrap(), "Hello World");
        assert_eq!(ev.render("{{ s.split()|length }}", context.clone()).unwrap(), "2");
        assert_eq!(
            ev.render("{{ s.replace('world', 'there').strip() }}", context.clone()).unwrap(),
            "hello there"
        );
        assert_eq!(ev.render("{{ s.strip().startswith('he') }}", context).unwrap(), "true");
    }

    #[test]
    fn disallowed_method_fails() {
        let ev = Evaluator::new(
            &RenderConfig::default(),
            Capabilities::standard().deny(Receiver::String, "upper"),
        )
        .unwrap();
        let err = ev.render("{{ s.upper() }}", ctx(json!({"s": "x"}))).unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn reserved_capability_rejected() {
        let err = Evaluator::new(
            &RenderConfig::default(),
            Capabilities::standard().allow(Receiver::Map, "_internal"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            CapabilityError::ReservedMethod {
                method: "_internal".into(),
                prefix: "_".into()
            }
        );
    }

    #[test]
    fn loop_controls_enabled() {
        let out = evaluator()
            .render(
                "{% for i in items %}{% if i > 2 %}{% break %}{% endif %}{{ i }}{% endfor %}",
                ctx(json!({"items": [1, 2, 3, 4]})),
            )
            .unwrap();
        assert_eq!(out, "12");
    }

    #[test]
    fn markup_filters() {
        let ev = evaluator();
        let context = ctx(json!({"s": "a*b"}));
        assert_eq!(ev.render("{{ s|escape_markup }}", context.clone()).unwrap(), "a\\*b");
        assert_eq!(ev.render("{{ s|literal }}", context).unwrap(), "``a*b``");
    }
}
