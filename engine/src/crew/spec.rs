//! Declarative crew model
//!
//! Agents are descriptive metadata only; tasks name the tools to dispatch and
//! carry an input template whose values are literals or back-references to
//! earlier task outputs.

use crew_sdk::Record;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Descriptive agent metadata. Agents never execute anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Filled from the key of the agents document
    #[serde(skip)]
    pub name: String,

    #[serde(default)]
    pub role: String,

    #[serde(default)]
    pub goal: String,

    #[serde(default)]
    pub backstory: String,
}

/// One declarative step of a crew
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Key under which the task's output is stored
    pub name: String,

    /// Assigned agent (informational)
    #[serde(default)]
    pub agent: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,

    /// Tool identifiers, dispatched in order
    #[serde(default)]
    pub tools: Vec<String>,

    /// Input template: literal values or `{{task.output.field}}` references
    #[serde(default)]
    pub input: Record,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agent: agent.into(),
            ..Default::default()
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools.push(tool.into());
        self
    }

    pub fn with_input(mut self, key: impl Into<String>, value: Value) -> Self {
        self.input.insert(key.into(), value);
        self
    }

    /// Set one input parameter, returning the previous value if any
    pub fn set_input(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.input.insert(key.into(), value)
    }

    pub fn declares_input(&self, key: &str) -> bool {
        self.input.contains_key(key)
    }
}

/// Ordered tasks plus the agents they are assigned to.
///
/// Loaded once and read many times. The only sanctioned mutation is a
/// caller override of task inputs before a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrewConfiguration {
    agents: IndexMap<String, AgentSpec>,
    tasks: Vec<TaskSpec>,
}

impl CrewConfiguration {
    pub fn new(agents: IndexMap<String, AgentSpec>, tasks: Vec<TaskSpec>) -> Self {
        Self { agents, tasks }
    }

    /// Build a configuration from tasks alone, with no agent metadata
    pub fn from_tasks(tasks: Vec<TaskSpec>) -> Self {
        Self::new(IndexMap::new(), tasks)
    }

    pub fn agents(&self) -> &IndexMap<String, AgentSpec> {
        &self.agents
    }

    pub fn agent(&self, name: &str) -> Option<&AgentSpec> {
        self.agents.get(name)
    }

    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut [TaskSpec] {
        &mut self.tasks
    }

    /// First task declared under `name`
    pub fn task(&self, name: &str) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn task_mut(&mut self, name: &str) -> Option<&mut TaskSpec> {
        self.tasks.iter_mut().find(|t| t.name == name)
    }

    /// Replace `param` in every task whose template already declares it.
    ///
    /// This is how an uploaded image path is injected into whichever task
    /// expects `image_paths`. Returns the number of tasks touched.
    pub fn override_input(&mut self, param: &str, value: Value) -> usize {
        let mut touched = 0;
        for task in self.tasks.iter_mut().filter(|t| t.declares_input(param)) {
            task.set_input(param, value.clone());
            touched += 1;
        }
        touched
    }

    /// Task names declared more than once, in first-seen order
    pub fn duplicate_task_names(&self) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut duplicates = Vec::new();
        for task in &self.tasks {
            let count = counts.entry(task.name.as_str()).or_default();
            *count += 1;
            if *count == 2 {
                duplicates.push(task.name.clone());
            }
        }
        duplicates
    }

    /// (task, agent) pairs whose agent is not declared in the agents document
    pub fn undeclared_agents(&self) -> Vec<(String, String)> {
        self.tasks
            .iter()
            .filter(|t| !t.agent.is_empty() && !self.agents.contains_key(&t.agent))
            .map(|t| (t.name.clone(), t.agent.clone()))
            .collect()
    }
}
