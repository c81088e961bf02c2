//! Templates and context merging.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::env::RenderEnv;
use crate::error::TemplateRenderError;
use crate::extra::ExtraContext;
use crate::phase::Phase;

/// Template text plus the phase it renders at and its debug flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub text: String,
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub debug: bool,
}

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            phase: Phase::default(),
            debug: false,
        }
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Renders this template to markup text.
    ///
    /// `data` provides the top-level variables; `extra` only fills names that
    /// `data` leaves unset.
    pub fn render(
        &self,
        env: &RenderEnv,
        data: &Map<String, Value>,
        extra: &ExtraContext,
    ) -> Result<String, TemplateRenderError> {
        env.evaluator().render(&self.text, merge_context(data, extra))
    }
}

/// Builds a template context. Data fields take precedence over extra context.
pub fn merge_context(data: &Map<String, Value>, extra: &ExtraContext) -> Map<String, Value> {
    let mut ctx = data.clone();
    for (key, value) in extra.iter() {
        if !ctx.contains_key(key) {
            ctx.insert(key.to_string(), value.clone());
        }
    }
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::RenderConfig;
    use serde_json::json;

    #[test]
    fn data_wins_over_extra() {
        let mut data = Map::new();
        data.insert("x".into(), json!(1));
        let mut extra = ExtraContext::new();
        extra.insert_first("x", json!(2));
        extra.insert_first("y", json!(3));
        let merged = merge_context(&data, &extra);
        assert_eq!(Value::Object(merged), json!({"x": 1, "y": 3}));
    }

    #[test]
    fn renders_with_extra() {
        let env = RenderEnv::new(RenderConfig::default()).unwrap();
        let mut data = Map::new();
        data.insert("name".into(), json!("Widget"));
        let mut extra = ExtraContext::new();
        extra.insert_first("doc", json!({"name": "index"}));
        let out = Template::new("{{ name }} in {{ doc.name }}")
            .render(&env, &data, &extra)
            .unwrap();
        assert_eq!(out, "Widget in index");
    }

    #[test]
    fn template_deserializes_phase_alias() {
        let tmpl: Template = serde_json::from_str(r#"{"text": "x", "phase": "parsed"}"#).unwrap();
        assert_eq!(tmpl.phase, Phase::PostParse);
        assert!(!tmpl.debug);
    }

    #[test]
    fn syntax_error_is_reported() {
        let env = RenderEnv::new(RenderConfig::default()).unwrap();
        let err = Template::new("{% if %}")
            .render(&env, &Map::new(), &ExtraContext::new())
            .unwrap_err();
        assert_eq!(err.kind, "SyntaxError");
    }
}
