//! Render chain behavior: stages, hooks, reports and extra context.

use std::cell::RefCell;
use std::rc::Rc;

use datanode_render::{
    BlockOnly, BuiltinParser, Data, DataNode, ExtraContextGenerator, Field, HostContext,
    HostFacts, Kind, Node, PendingData, Phase, Placeholder, ProviderRegistry, RawData,
    RenderConfig, RenderEnv, Schema, Stage, Template, Trigger,
};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn env() -> RenderEnv {
    RenderEnv::new(RenderConfig::default()).unwrap()
}

fn widget_schema() -> Schema {
    Schema::new()
        .name(Field::str().required())
        .attr("color", Field::str())
        .content(Field::str())
}

fn widget_raw() -> RawData {
    RawData::new()
        .name("Widget")
        .attr("color", "red")
        .content("hello")
}

fn plain(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn constant(value: Value) -> impl Fn(&Placeholder, &HostContext<'_>) -> Option<Value> {
    move |_, _| Some(value.clone())
}

fn texts(nodes: &[Node]) -> Vec<String> {
    nodes.iter().map(|n| n.astext()).collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn widget_renders_one_paragraph() {
    let env = env();
    let parser = BuiltinParser::new();
    let host = HostContext::new(&env, Phase::Immediate, &parser);
    let template = Template::new("{{name}}: {{color}} - {{content}}");

    let result = Placeholder::new(PendingData::new(widget_raw(), widget_schema()), template)
        .render(&host);

    let elements: Vec<&Node> = result.elements().collect();
    assert_eq!(elements.len(), 1);
    assert!(elements[0].is_kind(Kind::Paragraph));
    assert_eq!(elements[0].astext(), "Widget: red - hello");
    assert_eq!(result.reports().count(), 0);
    let data = result.data().and_then(Data::as_parsed).unwrap();
    assert_eq!(data.name, Some(json!("Widget")));
}

#[test]
fn missing_name_yields_single_report() {
    let env = env();
    let parser = BuiltinParser::new();
    let host = HostContext::new(&env, Phase::Immediate, &parser);
    let template = Template::new("{{name}}: {{color}} - {{content}}");

    let result =
        Placeholder::new(PendingData::new(RawData::new(), widget_schema()), template).render(&host);

    assert_eq!(result.elements().count(), 0);
    let reports: Vec<_> = result.reports().collect();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].failed, Some(Stage::Validate));
    assert!(reports[0].failure_text().unwrap().contains("name"));
    assert!(result.data().is_none());
}

// ============================================================================
// Stage failures
// ============================================================================

#[test]
fn template_failure_keeps_data() {
    let env = env();
    let parser = BuiltinParser::new();
    let host = HostContext::new(&env, Phase::Immediate, &parser);

    let result = Placeholder::new(plain(json!({"a": 1})), Template::new("{{ missing }}"))
        .render(&host);

    assert!(result.is_failure());
    assert_eq!(result.elements().count(), 0);
    assert_eq!(result.reports().next().unwrap().failed, Some(Stage::Template));
    assert!(result.data().is_some());
}

#[test]
fn markup_failure_becomes_error_message() {
    let env = env();
    let parser = BuiltinParser::new();
    let host = HostContext::new(&env, Phase::Immediate, &parser);

    let result = Placeholder::new(plain(json!({"s": "bad\u{0}"})), Template::new("{{ s }}"))
        .render(&host);

    assert_eq!(result.reports().next().unwrap().failed, Some(Stage::Markup));
    let elements: Vec<&Node> = result.elements().collect();
    assert_eq!(elements.len(), 1);
    assert!(elements[0].as_message().unwrap().is_error());
}

#[test]
fn parser_diagnostics_attach_report_without_debug() {
    let env = env();
    let parser = BuiltinParser::new();
    let host = HostContext::new(&env, Phase::Immediate, &parser);

    let result = Placeholder::new(Map::new(), Template::new("an *open start")).render(&host);

    assert!(!result.is_failure());
    assert_eq!(result.elements().count(), 1);
    let report = result.reports().next().unwrap();
    assert!(report.failed.is_none());
    assert_eq!(report.level, datanode_render::Level::Warning);
}

#[test]
fn debug_flag_attaches_report() {
    let env = env();
    let parser = BuiltinParser::new();
    let host = HostContext::new(&env, Phase::Immediate, &parser);

    let result = Placeholder::new(
        PendingData::new(widget_raw(), widget_schema()),
        Template::new("{{ name }}").debug(true),
    )
    .render(&host);
    assert_eq!(result.elements().count(), 1);
    let report = result.reports().next().unwrap();
    assert!(!report.is_failure());
    assert!(!report.is_empty());

    let mut env = env;
    env.set_debug(true);
    let host = HostContext::new(&env, Phase::Immediate, &parser);
    let result = Placeholder::new(Map::new(), Template::new("x")).render(&host);
    assert_eq!(result.reports().count(), 1);
}

// ============================================================================
// Hooks
// ============================================================================

#[test]
fn hooks_fire_in_stage_order() {
    let env = env();
    let parser = BuiltinParser::new();
    let host = HostContext::new(&env, Phase::Immediate, &parser);
    let log = Rc::new(RefCell::new(Vec::new()));

    let mut placeholder = Placeholder::new(
        PendingData::new(widget_raw(), widget_schema()),
        Template::new("{{ name }}"),
    );
    let l = Rc::clone(&log);
    placeholder.on_rendered(move |_, _| l.borrow_mut().push("rendered"));
    let l = Rc::clone(&log);
    placeholder.on_markup_text(move |_, text| {
        l.borrow_mut().push("markup");
        format!("{} one", text)
    });
    let l = Rc::clone(&log);
    placeholder.on_markup_text(move |_, text| {
        l.borrow_mut().push("markup2");
        format!("{} two", text)
    });
    let l = Rc::clone(&log);
    placeholder.on_parsed_data(move |_, _| l.borrow_mut().push("parsed"));
    let l = Rc::clone(&log);
    placeholder.on_raw_data(move |_, raw| {
        assert_eq!(raw.name.as_deref(), Some("Widget"));
        l.borrow_mut().push("raw");
    });

    let result = placeholder.render(&host);

    assert_eq!(*log.borrow(), vec!["raw", "parsed", "markup", "markup2", "rendered"]);
    assert_eq!(result.elements().next().unwrap().astext(), "Widget one two");
}

#[test]
fn hooks_stop_at_failed_stage() {
    let env = env();
    let parser = BuiltinParser::new();
    let host = HostContext::new(&env, Phase::Immediate, &parser);
    let log = Rc::new(RefCell::new(Vec::new()));

    let mut placeholder =
        Placeholder::new(PendingData::new(RawData::new(), widget_schema()), Template::new("x"));
    let l = Rc::clone(&log);
    placeholder.on_raw_data(move |_, _| l.borrow_mut().push("raw"));
    let l = Rc::clone(&log);
    placeholder.on_parsed_data(move |_, _| l.borrow_mut().push("parsed"));
    let l = Rc::clone(&log);
    placeholder.on_rendered(move |_, _| l.borrow_mut().push("rendered"));

    placeholder.render(&host);
    assert_eq!(*log.borrow(), vec!["raw"]);
}

// ============================================================================
// Assembly
// ============================================================================

#[test]
fn attributes_and_children_are_carried_over() {
    let env = env();
    let parser = BuiltinParser::new();
    let host = HostContext::new(&env, Phase::Immediate, &parser);

    let result = Placeholder::new(Map::new(), Template::new("body"))
        .attr("ids", "widget-1")
        .source(datanode_render::SourceLocation::new("index", Some(4)))
        .child(Node::text("kept"))
        .render(&host);

    assert_eq!(result.attrs()["ids"], "widget-1");
    assert_eq!(result.source().unwrap().line, Some(4));
    assert_eq!(texts(result.children()), vec!["kept", "body"]);
}

#[test]
fn inline_placeholder_with_block_only_parser() {
    let env = env();
    let parser = BlockOnly(BuiltinParser::new());
    let host = HostContext::new(&env, Phase::PostParse, &parser);

    let result = Placeholder::new(Map::new(), Template::new("a **b**"))
        .inline(true)
        .render(&host);

    assert!(result.is_inline());
    let elements: Vec<&Node> = result.elements().collect();
    assert_eq!(elements.len(), 2);
    assert!(elements[1].is_kind(Kind::Strong));
}

#[test]
fn abandon_reports_dispatch_failure() {
    let result = Placeholder::new(Map::new(), Template::new("x"))
        .abandon(Stage::Dispatch, &datanode_render::PhaseError::Unknown("later".into()));
    assert_eq!(result.elements().count(), 0);
    assert_eq!(result.reports().next().unwrap().failed, Some(Stage::Dispatch));
}

// ============================================================================
// Extra context
// ============================================================================

#[test]
fn data_takes_precedence_over_extra_context() {
    let mut providers = ProviderRegistry::new();
    providers.register(Trigger::At(Phase::Immediate), "x", constant(json!(2)));
    providers.register(Trigger::At(Phase::Immediate), "y", constant(json!(3)));
    let env = RenderEnv::builder().providers(providers).build().unwrap();
    let parser = BuiltinParser::new();
    let host = HostContext::new(&env, Phase::Immediate, &parser);

    let mut placeholder =
        Placeholder::new(plain(json!({"x": 1})), Template::new("{{ x }},{{ y }}"));
    ExtraContextGenerator::new(&host).on_checkpoint(&mut placeholder);
    let result = placeholder.render(&host);

    assert_eq!(result.elements().next().unwrap().astext(), "1,3");
}

#[test]
fn first_write_wins_across_phases() {
    let mut providers = ProviderRegistry::new();
    providers.register(Trigger::At(Phase::PostParse), "k", constant(json!(1)));
    providers.register(Trigger::At(Phase::PostResolve), "k", constant(json!(2)));
    let env = RenderEnv::builder().providers(providers).build().unwrap();
    let parser = BuiltinParser::new();

    let mut placeholder =
        Placeholder::new(Map::new(), Template::new("{{ k }}").phase(Phase::PostResolve));

    let parsed = HostContext::new(&env, Phase::PostParse, &parser);
    ExtraContextGenerator::new(&parsed).on_checkpoint(&mut placeholder);
    let resolved = HostContext::new(&env, Phase::PostResolve, &parser);
    let generator = ExtraContextGenerator::new(&resolved);
    generator.on_checkpoint(&mut placeholder);
    generator.on_anytime(&mut placeholder);

    assert_eq!(placeholder.extra().get("k"), Some(&json!(1)));
    let result = placeholder.render(&resolved);
    assert_eq!(result.elements().next().unwrap().astext(), "1");
}

#[test]
fn checkpoint_applies_once() {
    let calls = Rc::new(RefCell::new(0));
    let c = Rc::clone(&calls);
    let env = RenderEnv::builder()
        .providers(ProviderRegistry::new())
        .provider(Trigger::At(Phase::Immediate), "n", move |_: &Placeholder, _: &HostContext<'_>| {
            *c.borrow_mut() += 1;
            Some(json!(1))
        })
        .build()
        .unwrap();
    let parser = BuiltinParser::new();
    let host = HostContext::new(&env, Phase::Immediate, &parser);
    let mut placeholder = Placeholder::new(Map::new(), Template::new("x"));
    let generator = ExtraContextGenerator::new(&host);
    generator.on_checkpoint(&mut placeholder);
    generator.on_checkpoint(&mut placeholder);
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn builtin_providers() {
    let env = env();
    let parser = BuiltinParser::new();
    let facts = HostFacts {
        titles: vec!["Intro".into(), "Usage".into()],
        refs: [("intro".to_string(), "index#intro".to_string())].into_iter().collect(),
    };

    let mut placeholder = Placeholder::new(
        Map::new(),
        Template::new("{{ doc.name }}|{{ titles|join(',') }}|{{ refs.intro }}|{{ render.phase }}")
            .phase(Phase::PostResolve),
    );
    for phase in Phase::ALL {
        let host = HostContext::new(&env, phase, &parser).docname("index").facts(&facts);
        ExtraContextGenerator::new(&host).on_checkpoint(&mut placeholder);
    }
    let host = HostContext::new(&env, Phase::PostResolve, &parser)
        .docname("index")
        .facts(&facts);
    ExtraContextGenerator::new(&host).on_anytime(&mut placeholder);
    let result = placeholder.render(&host);

    assert_eq!(
        result.elements().next().unwrap().astext(),
        "index|Intro,Usage|index#intro|post-resolve"
    );
}

#[test]
fn reserved_extra_keys_are_hidden() {
    let env = RenderEnv::builder()
        .provider(Trigger::At(Phase::Immediate), "_env", constant(json!("secret")))
        .build()
        .unwrap();
    let parser = BuiltinParser::new();
    let host = HostContext::new(&env, Phase::Immediate, &parser);
    let mut placeholder = Placeholder::new(Map::new(), Template::new("{{ _env }}"));
    ExtraContextGenerator::new(&host).on_checkpoint(&mut placeholder);
    let result = placeholder.render(&host);
    assert_eq!(result.reports().next().unwrap().failed, Some(Stage::Template));
}

#[test]
fn pending_node_pformat() {
    let node: Node = Placeholder::new(Map::new(), Template::new("x").phase(Phase::PostParse))
        .inline(true)
        .into();
    assert_eq!(node.pformat(), "<pending_data phase=\"post-parse\" inline=\"true\">\n");
    assert!(!node.is_block());
    assert!(node.as_ext().and_then(DataNode::as_pending).is_some());
}

// ============================================================================
// Schema properties
// ============================================================================

proptest! {
    #[test]
    fn valid_records_parse_deterministically(
        name in "[A-Za-z][A-Za-z0-9 ]{0,20}",
        color in proptest::option::of("[a-z]{1,10}"),
        content in proptest::option::of("[ -~]{0,40}"),
    ) {
        let mut raw = RawData::new().name(name.clone());
        if let Some(color) = &color {
            raw = raw.attr("color", color.clone());
        }
        raw.content = content.clone();
        let schema = widget_schema();
        let first = schema.parse(&raw).unwrap();
        let second = schema.parse(&raw).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.name, Some(json!(name)));
    }

    #[test]
    fn int_fields_accept_any_i64(n in any::<i64>()) {
        let schema = Schema::new().attr("n", Field::int().required());
        let parsed = schema.parse(&RawData::new().attr("n", n.to_string())).unwrap();
        prop_assert_eq!(&parsed.attrs["n"], &json!(n));
    }
}
