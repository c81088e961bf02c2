//! Loading configuration and the debug environment toggle.

use datanode::{
    BuiltinParser, Checkpoints, Config, ConfigError, Defined, Document, Node, Phase, Project,
    Stage, DEBUG_ENV_VAR,
};
use serial_test::serial;

const CONFIG: &str = r#"
render:
  strict_undefined: true
checkpoints: [immediate, post-parse]
types:
  widget:
    schema:
      name: { required: true }
      attrs:
        size: { type: int }
        tags: { type: list, separator: "," }
      strict: true
    template:
      text: "{{ name }} ({{ size }})"
      phase: post-parse
  badge:
    template:
      text: "badge"
"#;

fn write_config(dir: &tempfile::TempDir, text: &str) -> std::path::PathBuf {
    let path = dir.path().join("datanode.yaml");
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
#[serial]
fn project_from_config_file() {
    std::env::remove_var(DEBUG_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    let config = Config::from_file(write_config(&dir, CONFIG)).unwrap();

    let checkpoints: Checkpoints = [Phase::Immediate, Phase::PostParse].into_iter().collect();
    assert_eq!(config.checkpoints(), checkpoints);

    let mut project = Project::from_config(&config).unwrap();
    assert_eq!(project.types().names().collect::<Vec<_>>(), ["badge", "widget"]);

    let doc = Document::from_markup("index", "Intro\n=====", &BuiltinParser::new()).unwrap();
    project.add_document(doc).unwrap();
    let widget = project.types().get("widget").unwrap().block(["W"]).option("size", "3");
    project.insert_definition("index", &[1], &widget).unwrap();
    assert_eq!(project.document("index").unwrap().pending_paths(), vec![vec![1]]);

    project.doc_parsed("index").unwrap();
    let outcomes = project.finish_parsing().unwrap();
    assert_eq!(outcomes["index"].rendered, 1);

    let doc = project.document("index").unwrap();
    assert_eq!(doc.children()[1].astext(), "W (3)");
    assert!(doc.reports().is_empty());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn unknown_keys_are_rejected() {
    let err = Config::from_yaml("renderer: {}").unwrap_err();
    assert!(matches!(err, ConfigError::Yaml(_)));

    let err = Config::from_yaml("checkpoints: [later]").unwrap_err();
    assert!(matches!(err, ConfigError::Yaml(_)));
}

#[test]
fn invalid_field_names_the_type() {
    let config = Config::from_yaml(
        r#"
types:
  pick:
    schema:
      attrs:
        mode: { type: choice }
    template:
      text: "{{ mode }}"
"#,
    )
    .unwrap();
    match config.type_registry() {
        Err(ConfigError::InvalidField {
            type_name, field, ..
        }) => {
            assert_eq!(type_name, "pick");
            assert_eq!(field, "mode");
        }
        other => panic!("expected invalid field, got {other:?}"),
    }
}

#[test]
#[serial]
fn env_toggle_turns_debug_on() {
    std::env::set_var(DEBUG_ENV_VAR, "1");
    let config = Config::from_yaml("{}").unwrap();
    let project = Project::from_config(&config).unwrap();
    std::env::remove_var(DEBUG_ENV_VAR);

    assert!(project.env().config().render_debug);
    let surface = datanode::BlockSurface::new(["W"])
        .template(datanode::Template::new("{{ name }}"));
    let Defined::Rendered(result) = project.define("index", &surface) else {
        panic!("immediate definition must render");
    };
    let report = result.reports().next().unwrap();
    assert!(!report.is_failure());
}

#[test]
#[serial]
fn env_toggle_ignores_falsy_values() {
    std::env::set_var(DEBUG_ENV_VAR, "off");
    let config = Config::from_yaml("{}").unwrap();
    let env = config.render_env().unwrap();
    std::env::remove_var(DEBUG_ENV_VAR);

    assert!(!env.config().render_debug);
}

#[test]
#[serial]
fn lenient_undefined_from_config() {
    std::env::remove_var(DEBUG_ENV_VAR);
    let surface = datanode::BlockSurface::new(["W"])
        .schema(datanode::Schema::new().name(datanode::Field::str()))
        .template(datanode::Template::new("{{ name }}{{ colour }}"));

    let lenient = Config::from_yaml("render:\n  strict_undefined: false\n").unwrap();
    let project = Project::from_config(&lenient).unwrap();
    let Defined::Rendered(result) = project.define("index", &surface) else {
        panic!("immediate definition must render");
    };
    assert!(!result.is_failure());
    assert_eq!(Node::from(result).astext(), "W");

    // strict by default
    let project = Project::from_config(&Config::from_yaml("{}").unwrap()).unwrap();
    let Defined::Rendered(result) = project.define("index", &surface) else {
        panic!("immediate definition must render");
    };
    let report = result.reports().next().unwrap();
    assert_eq!(report.failed, Some(Stage::Template));
}
