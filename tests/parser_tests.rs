// ABOUTME: Integration tests specifically for the workflow parser module
// ABOUTME: Tests parsing of YAML workflow definitions, validation reports and error handling

use std::time::Duration;
use tempfile::TempDir;
use tokio::fs;

use conductor::cli::commands::build_orchestrator;
use conductor::parser::{
    Backoff, NotifyOn, ParserError, TaskKind, TriggerConfig, ValidationError, WorkflowDefinition,
    WorkflowParser, WorkflowValidator,
};
use conductor::Config;

mod common;
use common::TestWorkflowBuilder;

#[tokio::test]
async fn test_parse_valid_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let workflow_file = temp_dir.path().join("valid_workflow.yaml");

    let workflow_yaml = r#"
name: release
description: Build, verify and announce a release
version: "2.1"
environment:
  STAGE: production
trigger:
  type: schedule
  cadence: "30 4 * * 1-5"
notifications:
  webhook: https://hooks.example.com/release
  on: always
timeout: 15m

tasks:
  - id: build
    name: Build artifacts
    kind: process
    command: make release
    cwd: ./app
    timeout: 10m
    retry:
      attempts: 3
      delay: 5s
      backoff: exponential

  - id: verify
    kind: script
    depends_on: [build]
    condition: env.STAGE == "production"
    script: |
      let ok = true;
      #{ verified: ok }

  - id: announce
    kind: http
    depends_on: [verify]
    url: https://api.example.com/releases
    method: post
    headers:
      Content-Type: application/json
    body: '{"stage": "production"}'
    on_failure: [verify]
    env:
      TOKEN: secret
"#;

    fs::write(&workflow_file, workflow_yaml).await.unwrap();

    let workflow = WorkflowParser::new()
        .parse_file(&workflow_file)
        .await
        .unwrap();

    assert_eq!(workflow.name, "release");
    assert_eq!(workflow.version, "2.1");
    assert_eq!(workflow.id(), "release@2.1");
    assert_eq!(workflow.tasks.len(), 3);
    assert_eq!(workflow.timeout, Some(Duration::from_secs(900)));
    assert_eq!(workflow.cadence(), Some("30 4 * * 1-5"));
    assert_eq!(workflow.notifications.as_ref().unwrap().on, NotifyOn::Always);

    let build = workflow.get_task("build").unwrap();
    assert_eq!(build.display_name(), "Build artifacts");
    assert_eq!(build.attempts(), 3);
    let policy = build.retry.as_ref().unwrap();
    assert_eq!(policy.backoff, Backoff::Exponential);
    assert_eq!(policy.delay_for(1), Duration::from_secs(5));
    assert_eq!(policy.delay_for(3), Duration::from_secs(20));
    assert_eq!(
        build.kind,
        TaskKind::Process {
            command: "make release".to_string(),
            cwd: Some("./app".to_string()),
        }
    );

    let announce = workflow.get_task("announce").unwrap();
    assert_eq!(announce.display_name(), "announce");
    assert_eq!(announce.environment.get("TOKEN"), Some(&"secret".to_string()));
    match &announce.kind {
        TaskKind::Http { method, headers, .. } => {
            assert_eq!(method, "post");
            assert_eq!(headers.len(), 1);
        }
        other => panic!("unexpected kind: {:?}", other),
    }

    assert_eq!(workflow.get_dependent_tasks("build"), vec!["verify"]);
}

#[test]
fn test_defaults_for_minimal_workflow() {
    let workflow = WorkflowDefinition::from_yaml(
        r#"
name: minimal
tasks:
  - id: ping
    kind: http
    url: https://example.com
"#,
    )
    .unwrap();

    assert_eq!(workflow.version, "1.0");
    assert_eq!(workflow.trigger, TriggerConfig::Manual);
    assert!(workflow.timeout.is_none());
    assert!(workflow.environment.is_empty());

    let ping = &workflow.tasks[0];
    assert_eq!(ping.attempts(), 1);
    assert!(ping.condition.is_none());
    match &ping.kind {
        TaskKind::Http { method, body, .. } => {
            assert_eq!(method, "GET");
            assert!(body.is_none());
        }
        other => panic!("unexpected kind: {:?}", other),
    }
}

#[test]
fn test_structural_errors_are_rejected_at_parse_time() {
    let cases = [
        (
            r#"
name: dupes
tasks:
  - id: a
    kind: process
    command: echo a
  - id: a
    kind: process
    command: echo b
"#,
            ValidationError::DuplicateTask {
                task: "a".to_string(),
            },
        ),
        (
            r#"
name: empty_command
tasks:
  - id: a
    kind: process
    command: "  "
"#,
            ValidationError::InvalidTaskConfig {
                task: "a".to_string(),
                reason: "command cannot be empty".to_string(),
            },
        ),
        (
            r#"
name: no_attempts
tasks:
  - id: a
    kind: script
    script: "1"
    retry:
      attempts: 0
"#,
            ValidationError::InvalidTaskConfig {
                task: "a".to_string(),
                reason: "retry attempts must be greater than 0".to_string(),
            },
        ),
        (
            r#"
name: ""
tasks:
  - id: a
    kind: script
    script: "1"
"#,
            ValidationError::EmptyName,
        ),
    ];

    for (yaml, expected) in cases {
        match WorkflowDefinition::from_yaml(yaml) {
            Err(ParserError::ValidationError(error)) => assert_eq!(error, expected),
            other => panic!("expected {:?}, got {:?}", expected, other),
        }
    }
}

#[test]
fn test_unknown_kind_is_a_yaml_error() {
    let result = WorkflowDefinition::from_yaml(
        r#"
name: odd
tasks:
  - id: a
    kind: teleport
"#,
    );
    assert!(matches!(result, Err(ParserError::YamlError(_))));
}

#[test]
fn test_validator_reports_graph_errors() {
    let workflow = TestWorkflowBuilder::new("graph")
        .add_task("a", &["c"])
        .add_task("b", &["a"])
        .add_task("c", &["b"])
        .add_task("d", &["missing"])
        .build();

    let report = WorkflowValidator::new().validate(&workflow);

    assert!(!report.is_valid);
    assert!(report.errors.contains(&ValidationError::UnknownDependency {
        task: "d".to_string(),
        dependency: "missing".to_string(),
    }));
    assert!(report.errors.contains(&ValidationError::CircularDependency {
        tasks: vec!["a".to_string(), "b".to_string(), "c".to_string()],
    }));
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("No root tasks found")));
}

#[test]
fn test_validator_warnings_and_conditions() {
    let mut gated = common::script_task("gated", &[]);
    gated.condition = Some("env.MODE ==".to_string());
    gated.on_success = vec!["nowhere".to_string()];

    let workflow = TestWorkflowBuilder::new("warnings")
        .with_task(gated)
        .build();

    let report = WorkflowValidator::new().validate(&workflow);

    assert!(!report.is_valid);
    assert!(report.errors.iter().any(|e| matches!(
        e,
        ValidationError::InvalidTaskConfig { task, reason }
            if task == "gated" && reason.starts_with("invalid condition")
    )));
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("unknown callback task 'nowhere'")));
}

#[test]
fn test_validator_rejects_bad_cadence() {
    let workflow = WorkflowDefinition::from_yaml(
        r#"
name: nightly
trigger:
  type: schedule
  cadence: "every day"
tasks:
  - id: a
    kind: process
    command: echo a
"#,
    )
    .unwrap();

    let report = WorkflowValidator::new().validate(&workflow);
    assert!(report
        .errors
        .iter()
        .any(|e| matches!(e, ValidationError::InvalidCadence { .. })));
}

#[test]
fn test_orchestrator_validation_includes_kind_checks() {
    let workflow = WorkflowDefinition::from_yaml(
        r#"
name: kinds
tasks:
  - id: broken_script
    kind: script
    script: "let x = ;"
  - id: ftp
    kind: http
    url: ftp://files.example.com/data
"#,
    )
    .unwrap();

    let report = build_orchestrator(&Config::default(), None).validate(&workflow);

    assert!(!report.is_valid);
    let failing: Vec<&str> = report
        .errors
        .iter()
        .filter_map(|e| match e {
            ValidationError::InvalidTaskConfig { task, .. } => Some(task.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(failing, vec!["broken_script", "ftp"]);
}

#[tokio::test]
async fn test_round_trip_through_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("built.yaml");

    let written = TestWorkflowBuilder::new("built")
        .with_variable("REGION", "eu")
        .add_echo_task("hello", "hi")
        .write_to_file(&path)
        .await
        .unwrap();

    let parsed = WorkflowDefinition::from_file(&path).unwrap();
    assert_eq!(parsed.name, written.name);
    assert_eq!(parsed.environment.get("REGION"), Some(&"eu".to_string()));
    assert_eq!(parsed.tasks[0].kind, written.tasks[0].kind);
}
