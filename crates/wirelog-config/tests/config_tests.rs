use pretty_assertions::assert_eq;
use serial_test::serial;
use std::io::Write;
use wirelog_config::{Refinement, load_cfg, load_from_path, parse_config};

fn write_temp(contents: &str) -> tempfile::TempPath {
    let mut f = tempfile::NamedTempFile::new().expect("temp file");
    f.write_all(contents.as_bytes()).expect("write");
    f.into_temp_path()
}

#[test]
fn empty_document_yields_defaults() {
    let cfg = parse_config("   \n").expect("empty config");
    assert_eq!(cfg.source.table, "message");
    assert_eq!(cfg.source.path, None);
    assert_eq!(cfg.sensing.cardinality_threshold, 10);
    assert_eq!(cfg.report.low_sample_thresholds, vec![10, 100]);
    assert!(!cfg.logging.json);
}

#[test]
fn missing_path_yields_defaults() {
    let cfg = load_cfg(None).expect("defaults");
    assert_eq!(cfg.sensing.partition.refinements.len(), 3);
    assert_eq!(cfg.sensing.alternate_leaves[0].path, "d.guilds");
}

#[test]
fn parses_full_document() {
    let yaml = r#"
source:
  path: /var/lib/wirelog/messages.db
  table: gateway_message
sensing:
  cardinality_threshold: 4
  partition:
    refinements:
      - when: flag_set
        tag_prefix: THREAD_
        field: archived
        suffix: archived
      - when: field_missing
        tag_prefix: PRESENCE_UPDATE
        field: game
        suffix: idle
  alternate_leaves:
    - path: d.members
      field: pending
report:
  title: Capture
  low_sample_thresholds: [5]
logging:
  level: debug
  json: true
"#;

    let path = write_temp(yaml);
    let cfg = load_from_path(path.to_str().unwrap()).expect("parse yaml");

    assert_eq!(
        cfg.source.path.as_deref(),
        Some("/var/lib/wirelog/messages.db")
    );
    assert_eq!(cfg.source.table, "gateway_message");
    assert_eq!(cfg.sensing.cardinality_threshold, 4);
    assert_eq!(
        cfg.sensing.partition.refinements,
        vec![
            Refinement::FlagSet {
                tag_prefix: "THREAD_".into(),
                field: "archived".into(),
                suffix: "archived".into(),
            },
            Refinement::FieldMissing {
                tag_prefix: "PRESENCE_UPDATE".into(),
                field: "game".into(),
                suffix: "idle".into(),
            },
        ]
    );
    let rule = &cfg.sensing.alternate_leaves[0];
    assert_eq!(rule.path, "d.members");
    assert_eq!(rule.equals, serde_json::Value::Bool(true));
    assert_eq!(cfg.report.title, "Capture");
    assert_eq!(cfg.report.low_sample_thresholds, vec![5]);
    assert_eq!(cfg.logging.level.as_deref(), Some("debug"));
    assert!(cfg.logging.json);
}

#[test]
fn partial_sections_keep_other_defaults() {
    let cfg = parse_config("report:\n  title: Only a title\n").unwrap();
    assert_eq!(cfg.report.title, "Only a title");
    assert_eq!(cfg.report.low_sample_thresholds, vec![10, 100]);
    assert_eq!(cfg.sensing.cardinality_threshold, 10);
}

#[test]
#[serial]
#[allow(unsafe_code)]
fn expands_environment_variables() {
    unsafe {
        std::env::set_var("WIRELOG_TEST_DB", "/tmp/capture.db");
    }

    let cfg = parse_config("source:\n  path: ${WIRELOG_TEST_DB}\n").unwrap();
    assert_eq!(cfg.source.path.as_deref(), Some("/tmp/capture.db"));

    unsafe {
        std::env::remove_var("WIRELOG_TEST_DB");
    }
}

#[test]
#[serial]
fn undefined_variable_is_an_error() {
    let err = parse_config("source:\n  path: ${WIRELOG_SURELY_UNSET_VAR}\n")
        .unwrap_err();
    assert!(format!("{err:#}").contains("expanding environment variables"));
}

#[test]
fn unknown_refinement_kind_is_rejected() {
    let yaml = r#"
sensing:
  partition:
    refinements:
      - when: sometimes
        tag_prefix: X
        field: y
        suffix: z
"#;
    assert!(parse_config(yaml).is_err());
}

#[test]
fn missing_file_reports_path() {
    let err = load_from_path("/definitely/not/here.yaml").unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.yaml"));
}
