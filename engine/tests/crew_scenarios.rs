//! End-to-end crew runs with stub tools
//!
//! These tests drive `Crew::kickoff` through the public API only and check
//! the stored outputs, failure propagation and progress ordering.

use agrocrew_engine::crew::{
    Crew, CrewConfiguration, RecordingSink, RunState, TaskSpec, UnknownToolPolicy, UNKNOWN,
};
use agrocrew_engine::tools::{AdviceLookup, ToolRegistry, WebSearchTool};
use crew_sdk::errors::EngineError;
use crew_sdk::{FnTool, ToolInput, ToolOutput};
use serde_json::json;
use std::fs;
use std::time::Duration;

fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(FnTool::new("Echo", |input: &ToolInput| {
        Ok(ToolOutput::empty().with_field("y", input.param_json("x")?.clone()))
    }));
    registry.register(FnTool::new("Fail", |_: &ToolInput| {
        Err(EngineError::ExternalService("search backend down".to_string()))
    }));
    registry
}

fn echo_task(name: &str, x: serde_json::Value) -> TaskSpec {
    TaskSpec::new(name, "agent").with_tool("Echo").with_input("x", x)
}

#[test]
fn test_single_task_output_stored() {
    let config = CrewConfiguration::from_tasks(vec![echo_task("t1", json!("hello"))]);
    let store = Crew::new(config, registry()).kickoff().unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("t1").unwrap(), json!({"y": "hello"}).as_object().unwrap());
}

#[test]
fn test_back_reference_feeds_later_task() {
    let config = CrewConfiguration::from_tasks(vec![
        echo_task("t1", json!("a")),
        echo_task("t2", json!("{{t1.output.y}}")),
    ]);
    let store = Crew::new(config, registry()).kickoff().unwrap();

    assert_eq!(store.field("t2", "y"), Some(&json!("a")));
}

#[test]
fn test_missing_reference_resolves_to_unknown() {
    let config =
        CrewConfiguration::from_tasks(vec![echo_task("t1", json!("{{missing.output.y}}"))]);
    let store = Crew::new(config, registry()).kickoff().unwrap();

    assert_eq!(store.field("t1", "y"), Some(&json!(UNKNOWN)));
}

#[test]
fn test_forward_reference_resolves_to_unknown() {
    let config = CrewConfiguration::from_tasks(vec![
        echo_task("t1", json!("{{t2.output.y}}")),
        echo_task("t2", json!("later")),
    ]);
    let store = Crew::new(config, registry()).kickoff().unwrap();

    assert_eq!(store.field("t1", "y"), Some(&json!(UNKNOWN)));
}

#[test]
fn test_failure_aborts_with_partial_outputs() {
    let config = CrewConfiguration::from_tasks(vec![
        echo_task("t1", json!("a")),
        TaskSpec::new("t2", "agent").with_tool("Fail"),
        echo_task("t3", json!("never")),
    ]);
    let mut crew = Crew::new(config, registry());

    let err = crew.kickoff().unwrap_err();
    assert_eq!(err.task, "t2");
    assert!(matches!(err.source, EngineError::ExternalService(_)));
    assert_eq!(err.outputs.task_names().collect::<Vec<_>>(), vec!["t1"]);
    assert_eq!(crew.state(), RunState::Failed);
}

#[test]
fn test_duplicate_task_name_last_write_wins() {
    let config = CrewConfiguration::from_tasks(vec![
        echo_task("dup", json!("first")),
        echo_task("dup", json!("second")),
    ]);
    let store = Crew::new(config, registry()).kickoff().unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.field("dup", "y"), Some(&json!("second")));
}

#[test]
fn test_unique_tasks_store_one_entry_each_in_order() {
    let tasks: Vec<TaskSpec> = (0..12)
        .map(|i| echo_task(&format!("task_{}", i), json!(i)))
        .collect();
    let names: Vec<String> = tasks.iter().map(|t| t.name.clone()).collect();

    let sink = RecordingSink::new();
    let store = Crew::new(CrewConfiguration::from_tasks(tasks), registry())
        .with_sink(sink.clone())
        .kickoff()
        .unwrap();

    assert_eq!(store.len(), 12);
    let events = sink.events();
    assert_eq!(
        events.iter().map(|e| e.task.clone()).collect::<Vec<_>>(),
        names
    );
    assert!(events.iter().enumerate().all(|(i, e)| e.index == i));
}

#[test]
fn test_resolved_value_equals_stored_value_exactly() {
    let mut registry = registry();
    registry.register(FnTool::new("Classify", |_: &ToolInput| {
        Ok(ToolOutput::empty().with_field(
            "predictions",
            json!([{"image": "leaf.png", "disease": "Leaf Rust", "confidence": 91.5}]),
        ))
    }));

    let config = CrewConfiguration::from_tasks(vec![
        TaskSpec::new("classify", "agent").with_tool("Classify"),
        echo_task("report", json!("{{classify.output.predictions}}")),
    ]);
    let store = Crew::new(config, registry).kickoff().unwrap();

    assert_eq!(
        store.field("report", "y"),
        store.field("classify", "predictions")
    );
}

#[test]
fn test_unknown_tool_policies() {
    let tasks = vec![TaskSpec::new("t1", "agent").with_tool("NoSuchTool")];

    let store = Crew::new(CrewConfiguration::from_tasks(tasks.clone()), registry())
        .kickoff()
        .unwrap();
    assert!(store.get("t1").unwrap().is_empty());

    let err = Crew::new(CrewConfiguration::from_tasks(tasks), registry())
        .with_unknown_tool_policy(UnknownToolPolicy::Fail)
        .kickoff()
        .unwrap_err();
    assert!(matches!(err.source, EngineError::ToolNotFound(_)));
    assert!(err.outputs.is_empty());
}

#[test]
fn test_task_without_tools_stores_empty_record() {
    let sink = RecordingSink::new();
    let config = CrewConfiguration::from_tasks(vec![TaskSpec::new("t0", "agent")]);
    let store = Crew::new(config, registry())
        .with_sink(sink.clone())
        .kickoff()
        .unwrap();

    assert_eq!(store.len(), 1);
    assert!(store.get("t0").unwrap().is_empty());

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].task, "t0");
    assert!(events[0].output.is_empty());
}

#[test]
fn test_unregistered_classifier_leaves_later_tasks_running() {
    let mut registry = ToolRegistry::new();
    registry.register(AdviceLookup::new("Consult a local agronomist."));
    // Port 9 is discard; an empty prediction list never reaches it.
    registry.register(
        WebSearchTool::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap(),
    );

    let config = CrewConfiguration::from_tasks(vec![
        TaskSpec::new("PredictWheatStage", "stage_agent")
            .with_tool("StageClassifier")
            .with_input("image_paths", json!(["field.jpg"])),
        TaskSpec::new("GiveAdvice", "advice_agent")
            .with_tool("AdviceLookup")
            .with_input("predictions", json!("{{PredictWheatStage.output.predictions}}")),
        TaskSpec::new("SearchInfo", "search_agent")
            .with_tool("WebsiteSearchTool")
            .with_input("predictions", json!("{{PredictWheatStage.output.predictions}}")),
    ]);

    let mut crew = Crew::new(config, registry);
    let store = crew.kickoff().unwrap();

    assert_eq!(crew.state(), RunState::Completed);
    assert!(store.get("PredictWheatStage").unwrap().is_empty());
    assert_eq!(store.field("GiveAdvice", "predictions"), Some(&json!([])));
    assert_eq!(store.field("SearchInfo", "predictions"), Some(&json!([])));
}

#[test]
fn test_from_sources_runs_yaml_crew() {
    let dir = tempfile::tempdir().unwrap();
    let agents = dir.path().join("agents.yaml");
    let tasks = dir.path().join("tasks.yaml");

    fs::write(
        &agents,
        r#"
echo_agent:
  role: Echoer
  goal: Repeat the input
  backstory: Has a very good memory.
"#,
    )
    .unwrap();
    fs::write(
        &tasks,
        r#"
tasks:
  - name: first
    agent: echo_agent
    tools: [Echo]
    input:
      x: hello
  - name: second
    agent: echo_agent
    tools: [Echo]
    input:
      x: "{{first.output.y}}"
"#,
    )
    .unwrap();

    let mut crew = Crew::from_sources(&agents, &tasks, registry()).unwrap();
    assert_eq!(crew.config().agents().len(), 1);

    let store = crew.kickoff().unwrap();
    assert_eq!(store.field("second", "y"), Some(&json!("hello")));
    assert_eq!(crew.state(), RunState::Completed);
}
