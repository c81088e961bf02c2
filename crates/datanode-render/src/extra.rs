//! Supplemental template variables that become available as the host pipeline
//! advances.
//!
//! Each placeholder carries an [`ExtraContext`]. At every checkpoint the host
//! runs, an [`ExtraContextGenerator`] asks the registered providers for values
//! and merges them in. A key, once set, is never overwritten, so the final
//! context does not depend on how many checkpoints a placeholder passed
//! through before it rendered.
//!
//! Providers are plain closures or any type implementing
//! [`ExtraContextProvider`]:
//!
//! ```rust
//! use datanode_render::{HostContext, Phase, Placeholder, ProviderRegistry, Trigger};
//! use serde_json::json;
//!
//! let mut providers = ProviderRegistry::new();
//! providers.register(
//!     Trigger::At(Phase::PostParse),
//!     "answer",
//!     |_: &Placeholder, _: &HostContext<'_>| Some(json!(42)),
//! );
//! assert_eq!(providers.len(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::env::RenderEnv;
use crate::markup::MarkupParser;
use crate::pending::Placeholder;
use crate::phase::Phase;

/// When a provider runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Trigger {
    /// At the named checkpoint, for every placeholder in the tree.
    At(Phase),
    /// Once, right before a placeholder's render chain executes.
    Anytime,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::At(phase) => write!(f, "{}", phase),
            Trigger::Anytime => write!(f, "anytime"),
        }
    }
}

/// Accumulated supplemental variables. First write wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtraContext {
    values: BTreeMap<String, Value>,
    #[serde(skip)]
    applied: BTreeSet<Trigger>,
}

impl ExtraContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` unless it is already set. Returns whether the value was
    /// stored.
    pub fn insert_first(&mut self, key: impl Into<String>, value: Value) -> bool {
        match self.values.entry(key.into()) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the providers for `trigger` already ran for this context.
    pub fn was_applied(&self, trigger: Trigger) -> bool {
        self.applied.contains(&trigger)
    }

    /// Records that `trigger` ran. Returns false if it had already run.
    pub fn mark_applied(&mut self, trigger: Trigger) -> bool {
        self.applied.insert(trigger)
    }
}

/// Facts the host has collected so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostFacts {
    /// Section titles of every parsed document, in document order.
    pub titles: Vec<String>,
    /// Resolved references: target name to resolved location.
    pub refs: BTreeMap<String, String>,
}

static NO_FACTS: HostFacts = HostFacts {
    titles: Vec::new(),
    refs: BTreeMap::new(),
};

/// What the host offers at one checkpoint.
#[derive(Clone, Copy)]
pub struct HostContext<'a> {
    pub env: &'a RenderEnv,
    pub checkpoint: Phase,
    pub docname: &'a str,
    pub parser: &'a dyn MarkupParser,
    pub facts: &'a HostFacts,
}

impl fmt::Debug for HostContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("checkpoint", &self.checkpoint)
            .field("docname", &self.docname)
            .field("facts", self.facts)
            .finish_non_exhaustive()
    }
}

impl<'a> HostContext<'a> {
    pub fn new(env: &'a RenderEnv, checkpoint: Phase, parser: &'a dyn MarkupParser) -> Self {
        Self {
            env,
            checkpoint,
            docname: "",
            parser,
            facts: &NO_FACTS,
        }
    }

    pub fn docname(mut self, docname: &'a str) -> Self {
        self.docname = docname;
        self
    }

    pub fn facts(mut self, facts: &'a HostFacts) -> Self {
        self.facts = facts;
        self
    }
}

/// Produces one extra-context value for a placeholder.
///
/// Returning `None` leaves the name unset.
pub trait ExtraContextProvider {
    fn provide(&self, placeholder: &Placeholder, host: &HostContext<'_>) -> Option<Value>;
}

impl<F> ExtraContextProvider for F
where
    F: Fn(&Placeholder, &HostContext<'_>) -> Option<Value>,
{
    fn provide(&self, placeholder: &Placeholder, host: &HostContext<'_>) -> Option<Value> {
        (self)(placeholder, host)
    }
}

struct ProviderEntry {
    trigger: Trigger,
    name: String,
    provider: Rc<dyn ExtraContextProvider>,
}

/// Ordered collection of providers.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    entries: Vec<Rc<ProviderEntry>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| format!("{}@{}", e.name, e.trigger)))
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in providers:
    ///
    /// | name     | trigger        | value                                  |
    /// |----------|----------------|----------------------------------------|
    /// | `doc`    | immediate      | `{name, source, line}`                 |
    /// | `titles` | post-parse     | every section title seen so far        |
    /// | `refs`   | post-resolve   | resolved references                    |
    /// | `render` | anytime        | `{phase, debug}` of the actual render  |
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Trigger::At(Phase::Immediate), "doc", doc_provider);
        registry.register(
            Trigger::At(Phase::PostParse),
            "titles",
            |_: &Placeholder, host: &HostContext<'_>| Some(json!(host.facts.titles)),
        );
        registry.register(
            Trigger::At(Phase::PostResolve),
            "refs",
            |_: &Placeholder, host: &HostContext<'_>| Some(json!(host.facts.refs)),
        );
        registry.register(Trigger::Anytime, "render", |p: &Placeholder, host: &HostContext<'_>| {
            Some(json!({
                "phase": host.checkpoint.as_str(),
                "debug": host.env.debug_for(p.template()),
            }))
        });
        registry
    }

    pub fn register<P>(&mut self, trigger: Trigger, name: impl Into<String>, provider: P)
    where
        P: ExtraContextProvider + 'static,
    {
        self.entries.push(Rc::new(ProviderEntry {
            trigger,
            name: name.into(),
            provider: Rc::new(provider),
        }));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names registered for `trigger`, in registration order.
    pub fn names(&self, trigger: Trigger) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.trigger == trigger)
            .map(|e| e.name.as_str())
            .collect()
    }

    fn for_trigger(&self, trigger: Trigger) -> impl Iterator<Item = &ProviderEntry> {
        self.entries
            .iter()
            .map(|e| e.as_ref())
            .filter(move |e| e.trigger == trigger)
    }
}

fn doc_provider(p: &Placeholder, host: &HostContext<'_>) -> Option<Value> {
    let (source, line) = match p.source_location() {
        Some(loc) => (Value::from(loc.source.clone()), json!(loc.line)),
        None => (Value::Null, Value::Null),
    };
    Some(json!({
        "name": host.docname,
        "source": source,
        "line": line,
    }))
}

/// Applies the providers for one checkpoint to placeholders.
#[derive(Debug, Clone, Copy)]
pub struct ExtraContextGenerator<'h> {
    host: &'h HostContext<'h>,
}

impl<'h> ExtraContextGenerator<'h> {
    pub fn new(host: &'h HostContext<'h>) -> Self {
        Self { host }
    }

    /// Merges the values for the host's current checkpoint.
    pub fn on_checkpoint(&self, placeholder: &mut Placeholder) {
        self.apply(Trigger::At(self.host.checkpoint), placeholder);
    }

    /// Merges the values that are computed right before rendering.
    pub fn on_anytime(&self, placeholder: &mut Placeholder) {
        self.apply(Trigger::Anytime, placeholder);
    }

    fn apply(&self, trigger: Trigger, placeholder: &mut Placeholder) {
        if placeholder.extra().was_applied(trigger) {
            return;
        }
        let target: &Placeholder = placeholder;
        let produced: Vec<(String, Value)> = self
            .host
            .env
            .providers()
            .for_trigger(trigger)
            .filter_map(|entry| {
                entry
                    .provider
                    .provide(target, self.host)
                    .map(|value| (entry.name.clone(), value))
            })
            .collect();

        let extra = placeholder.extra_mut();
        extra.mark_applied(trigger);
        for (name, value) in produced {
            if !extra.insert_first(name.as_str(), value) {
                tracing::trace!(
                    %trigger,
                    key = %name,
                    "extra context key already set, keeping first value"
                );
            }
        }
        tracing::trace!(%trigger, keys = extra.len(), "extra context accumulated");
    }
}
