//! Crew Engine
//!
//! Executes the tasks of a `CrewConfiguration` strictly in declaration order.
//! For each task the engine:
//! 1. Resolves the input template against the outputs recorded so far
//! 2. Dispatches every named tool, in list order, with that same input
//! 3. Stores the last tool's result under the task name
//! 4. Emits a progress event to every attached sink
//!
//! There is no branching, no retry and no parallelism. The first tool
//! failure aborts the run; the outputs recorded before it are handed back
//! inside the error.

use crew_sdk::errors::EngineError;
use crew_sdk::{Record, ToolInput};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use super::progress::{ProgressEvent, ProgressSink, TracingSink};
use super::reference::resolve_input;
use super::spec::{CrewConfiguration, TaskSpec};
use super::store::OutputStore;
use crate::tools::ToolRegistry;

/// Lifecycle of a crew
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// What to do when a task names a tool that is not registered
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum UnknownToolPolicy {
    /// Skip the tool and keep going
    #[default]
    Ignore,
    /// Abort the run with `EngineError::ToolNotFound`
    Fail,
}

/// A run aborted by a failing tool
#[derive(Debug, Error)]
#[error("Task '{task}' failed: {source}")]
pub struct CrewRunError {
    /// Name of the task whose tool failed
    pub task: String,

    #[source]
    pub source: EngineError,

    /// Outputs of the tasks that completed before the failure
    pub outputs: OutputStore,
}

/// Sequential executor of a crew's tasks
pub struct Crew {
    config: CrewConfiguration,
    registry: ToolRegistry,
    unknown_tool_policy: UnknownToolPolicy,
    sinks: Vec<Box<dyn ProgressSink>>,
    state: RunState,
}

impl Crew {
    /// Create an idle crew. Progress is logged through `tracing` by default.
    pub fn new(config: CrewConfiguration, registry: ToolRegistry) -> Self {
        Self {
            config,
            registry,
            unknown_tool_policy: UnknownToolPolicy::default(),
            sinks: vec![Box::new(TracingSink)],
            state: RunState::Idle,
        }
    }

    /// Load the agents and tasks documents and build a crew over `registry`
    pub fn from_sources(
        agents_path: &Path,
        tasks_path: &Path,
        registry: ToolRegistry,
    ) -> Result<Self, EngineError> {
        let config = CrewConfiguration::from_files(agents_path, tasks_path)?;
        Ok(Self::new(config, registry))
    }

    pub fn with_unknown_tool_policy(mut self, policy: UnknownToolPolicy) -> Self {
        self.unknown_tool_policy = policy;
        self
    }

    /// Attach another progress sink
    pub fn with_sink(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &CrewConfiguration {
        &self.config
    }

    /// Mutable access for caller overrides before a run
    pub fn config_mut(&mut self) -> &mut CrewConfiguration {
        &mut self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run every task in order and return the outputs keyed by task name.
    ///
    /// Each call starts from an empty store.
    ///
    /// # Errors
    ///
    /// Returns `CrewRunError` when a tool fails (or, under
    /// `UnknownToolPolicy::Fail`, when a tool is not registered). The error
    /// carries the outputs of the tasks that ran before the failure.
    pub fn kickoff(&mut self) -> Result<OutputStore, CrewRunError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("crew_run", %run_id);
        let _guard = span.enter();

        self.state = RunState::Running;
        let result = self.run_tasks();
        self.state = match result {
            Ok(_) => RunState::Completed,
            Err(_) => RunState::Failed,
        };
        result
    }

    fn run_tasks(&self) -> Result<OutputStore, CrewRunError> {
        info!(
            "Agents loaded: {:?}",
            self.config.agents().keys().collect::<Vec<_>>()
        );
        info!(
            "Tasks to execute: {:?}",
            self.config
                .tasks()
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
        );

        let mut store = OutputStore::new();

        for (index, task) in self.config.tasks().iter().enumerate() {
            let (input, output) = match self.execute_task(task, &store) {
                Ok(done) => done,
                Err(source) => {
                    error!("Task '{}' failed: {}", task.name, source);
                    return Err(CrewRunError {
                        task: task.name.clone(),
                        source,
                        outputs: store,
                    });
                }
            };

            let event = ProgressEvent {
                index,
                task: task.name.clone(),
                agent: task.agent.clone(),
                tools: task.tools.clone(),
                input,
                output: output.clone(),
            };

            if store.insert(task.name.clone(), output).is_some() {
                debug!("Task '{}' overwrote an earlier output", task.name);
            }

            for sink in &self.sinks {
                sink.observe(&event);
            }
        }

        info!("Crew finished: {} outputs recorded", store.len());
        Ok(store)
    }

    /// Resolve a task's input and dispatch its tools.
    ///
    /// Returns the resolved input and the record of the last tool that ran
    /// (empty when no tool ran).
    fn execute_task(
        &self,
        task: &TaskSpec,
        store: &OutputStore,
    ) -> Result<(Record, Record), EngineError> {
        info!(
            "Executing task '{}' (agent: {}, tools: {:?})",
            task.name, task.agent, task.tools
        );

        let input = ToolInput::from_record(resolve_input(&task.input, store));
        let mut output = Record::new();

        for tool_name in &task.tools {
            let Some(tool) = self.registry.get(tool_name) else {
                match self.unknown_tool_policy {
                    UnknownToolPolicy::Ignore => {
                        warn!(
                            "Task '{}' names unknown tool '{}', skipping",
                            task.name, tool_name
                        );
                        continue;
                    }
                    UnknownToolPolicy::Fail => {
                        return Err(EngineError::ToolNotFound(tool_name.clone()));
                    }
                }
            };

            debug!("Dispatching tool '{}' for task '{}'", tool_name, task.name);
            output = tool.execute(&input)?.into_record();
        }

        Ok((input.params, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crew::progress::RecordingSink;
    use crew_sdk::{FnTool, ToolOutput};
    use serde_json::json;

    fn echo_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(FnTool::new("Echo", |input: &ToolInput| {
            Ok(ToolOutput::empty().with_field("y", input.param_json("x")?.clone()))
        }));
        registry.register(FnTool::new("Upper", |input: &ToolInput| {
            let x = input.param_str("x")?;
            Ok(ToolOutput::empty().with_field("y", json!(x.to_uppercase())))
        }));
        registry.register(FnTool::new("Fail", |_: &ToolInput| {
            Err(EngineError::Retrieval("model artifact not found".to_string()))
        }));
        registry
    }

    #[test]
    fn test_state_transitions() {
        let config = CrewConfiguration::from_tasks(vec![TaskSpec::new("t1", "a")
            .with_tool("Echo")
            .with_input("x", json!("hello"))]);
        let mut crew = Crew::new(config, echo_registry());
        assert_eq!(crew.state(), RunState::Idle);

        crew.kickoff().unwrap();
        assert_eq!(crew.state(), RunState::Completed);
    }

    #[test]
    fn test_failed_state_recorded() {
        let config =
            CrewConfiguration::from_tasks(vec![TaskSpec::new("t1", "a").with_tool("Fail")]);
        let mut crew = Crew::new(config, echo_registry());

        assert!(crew.kickoff().is_err());
        assert_eq!(crew.state(), RunState::Failed);
    }

    #[test]
    fn test_last_tool_wins() {
        let config = CrewConfiguration::from_tasks(vec![TaskSpec::new("t1", "a")
            .with_tool("Echo")
            .with_tool("Upper")
            .with_input("x", json!("abc"))]);
        let store = Crew::new(config, echo_registry()).kickoff().unwrap();
        assert_eq!(store.field("t1", "y"), Some(&json!("ABC")));
    }

    #[test]
    fn test_unknown_tool_ignored_keeps_previous_result() {
        let config = CrewConfiguration::from_tasks(vec![TaskSpec::new("t1", "a")
            .with_tool("Echo")
            .with_tool("Missing")
            .with_input("x", json!("abc"))]);
        let store = Crew::new(config, echo_registry()).kickoff().unwrap();
        assert_eq!(store.field("t1", "y"), Some(&json!("abc")));
    }

    #[test]
    fn test_only_unknown_tools_store_empty_record() {
        let config =
            CrewConfiguration::from_tasks(vec![TaskSpec::new("t1", "a").with_tool("Missing")]);
        let store = Crew::new(config, echo_registry()).kickoff().unwrap();
        assert_eq!(store.get("t1"), Some(&Record::new()));
    }

    #[test]
    fn test_unknown_tool_fail_policy() {
        let config = CrewConfiguration::from_tasks(vec![
            TaskSpec::new("t0", "a")
                .with_tool("Echo")
                .with_input("x", json!("ok")),
            TaskSpec::new("t1", "a").with_tool("Missing"),
        ]);
        let mut crew =
            Crew::new(config, echo_registry()).with_unknown_tool_policy(UnknownToolPolicy::Fail);

        let err = crew.kickoff().unwrap_err();
        assert_eq!(err.task, "t1");
        assert!(matches!(err.source, EngineError::ToolNotFound(ref name) if name == "Missing"));
        assert_eq!(err.outputs.len(), 1);
    }

    #[test]
    fn test_progress_event_carries_resolved_input() {
        let sink = RecordingSink::new();
        let config = CrewConfiguration::from_tasks(vec![
            TaskSpec::new("t1", "a")
                .with_tool("Echo")
                .with_input("x", json!("a")),
            TaskSpec::new("t2", "b")
                .with_tool("Echo")
                .with_input("x", json!("{{t1.output.y}}")),
        ]);
        Crew::new(config, echo_registry())
            .with_sink(sink.clone())
            .kickoff()
            .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].agent, "b");
        assert_eq!(events[1].tools, vec!["Echo".to_string()]);
        assert_eq!(events[1].input["x"], json!("a"));
        assert_eq!(events[1].output["y"], json!("a"));
    }

    #[test]
    fn test_rerun_starts_from_empty_store() {
        let config = CrewConfiguration::from_tasks(vec![TaskSpec::new("t1", "a")
            .with_tool("Echo")
            .with_input("x", json!("{{t1.output.y}}"))]);
        let mut crew = Crew::new(config, echo_registry());

        let first = crew.kickoff().unwrap();
        let second = crew.kickoff().unwrap();
        assert_eq!(first, second);
        assert_eq!(second.field("t1", "y"), Some(&json!("UNKNOWN")));
    }

    #[test]
    fn test_config_override_before_run() {
        let config = CrewConfiguration::from_tasks(vec![TaskSpec::new("t1", "a")
            .with_tool("Echo")
            .with_input("x", json!("placeholder"))]);
        let mut crew = Crew::new(config, echo_registry());
        crew.config_mut().override_input("x", json!("upload.png"));

        let store = crew.kickoff().unwrap();
        assert_eq!(store.field("t1", "y"), Some(&json!("upload.png")));
    }
}
