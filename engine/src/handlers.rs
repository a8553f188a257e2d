//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: Load a crew, apply overrides, kick it off and print the outputs
//! - tasks: List the crew's agents and tasks
//! - validate: Check the crew against the registered tools
//! - tools: List registered tools

use anyhow::{anyhow, bail, Context, Result};
use crew_sdk::errors::CrewErrorExt;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cli::CrewArgs;
use crate::config::Config;
use crate::crew::reference::is_reference_expression;
use crate::crew::{Crew, CrewConfiguration, JsonLinesSink, OutputStore, Reference, UnknownToolPolicy};
use crate::tools::ToolRegistry;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Options of the `run` command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub crew: CrewArgs,
    pub images: Vec<PathBuf>,
    pub image_dir: Option<PathBuf>,
    pub overrides: Vec<String>,
    pub unknown_tool: Option<UnknownToolPolicy>,
}

/// Run a crew and print every task's output
pub fn handle_run(options: RunOptions, config: &Config, format: OutputFormat) -> Result<()> {
    let registry = ToolRegistry::from_config(&config.tools).context("Failed to set up tools")?;
    let mut crew_config = load_crew(&options.crew, config)?;

    let images = collect_image_paths(&options.images, options.image_dir.as_deref())?;
    if !images.is_empty() {
        let paths: Vec<Value> = images
            .iter()
            .map(|p| Value::String(p.to_string_lossy().into_owned()))
            .collect();
        let touched = crew_config.override_input("image_paths", Value::Array(paths));
        if touched == 0 {
            warn!("No task declares 'image_paths'; images were not used");
        }
        info!("{} image(s) queued", images.len());
    }

    for raw in &options.overrides {
        apply_override(&mut crew_config, raw)?;
    }

    let policy = options.unknown_tool.unwrap_or(config.crew.unknown_tool);
    let mut crew = Crew::new(crew_config, registry).with_unknown_tool_policy(policy);

    if let Some(path) = &config.core.progress_log {
        let sink = JsonLinesSink::create(path)
            .with_context(|| format!("Failed to open progress log {}", path.display()))?;
        crew = crew.with_sink(sink);
    }

    match crew.kickoff() {
        Ok(store) => {
            print_outputs(&store, None, format)?;
            Ok(())
        }
        Err(run_error) => {
            print_outputs(&run_error.outputs, Some(&run_error.task), format)?;
            eprintln!("Hint: {}", run_error.source.user_hint());
            Err(anyhow!(run_error))
        }
    }
}

/// List the crew's agents and tasks
pub fn handle_tasks(args: &CrewArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let crew_config = load_crew(args, config)?;

    match format {
        OutputFormat::Text => {
            println!("Agents:");
            for (name, agent) in crew_config.agents() {
                println!("  {:<20} {}", name, agent.role);
            }
            println!();

            println!("Tasks:");
            for (i, task) in crew_config.tasks().iter().enumerate() {
                println!("  {}. {} (agent: {})", i + 1, task.name, task.agent);
                println!("     Tools: {}", task.tools.join(", "));
                if let Some(description) = &task.description {
                    println!("     {}", description.trim());
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "agents": crew_config.agents().iter().map(|(name, agent)| {
                    json!({
                        "name": name,
                        "role": agent.role,
                        "goal": agent.goal,
                    })
                }).collect::<Vec<_>>(),
                "tasks": crew_config.tasks(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Check the crew against the registered tools.
///
/// Fails when any problem is found.
pub fn handle_validate(args: &CrewArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let registry = ToolRegistry::from_config(&config.tools).context("Failed to set up tools")?;
    let crew_config = load_crew(args, config)?;
    let report = validate_crew(&crew_config, &registry);

    match format {
        OutputFormat::Text => {
            println!("Crew Validation");
            println!("============================");
            println!("  {:<25} {}", "Agents:", crew_config.agents().len());
            println!("  {:<25} {}", "Tasks:", crew_config.tasks().len());
            println!();

            for warning in &report.warnings {
                println!("  warning: {}", warning);
            }

            if report.problems.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Problems found:");
                println!();
                for (i, problem) in report.problems.iter().enumerate() {
                    println!("  {}. {}", i + 1, problem);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "problems": report.problems,
                "warnings": report.warnings,
                "valid": report.problems.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    if report.problems.is_empty() {
        Ok(())
    } else {
        bail!("{} problem(s) found", report.problems.len())
    }
}

/// List registered tools
pub fn handle_tools(config: &Config, format: OutputFormat) -> Result<()> {
    let registry = ToolRegistry::from_config(&config.tools).context("Failed to set up tools")?;

    match format {
        OutputFormat::Text => {
            if registry.is_empty() {
                println!("No tools enabled");
                return Ok(());
            }
            println!("Registered tools:");
            for (name, description) in registry.descriptions() {
                println!("  {:<25} {}", name, description);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "tools": registry.descriptions().iter().map(|(name, description)| {
                    json!({"name": name, "description": description})
                }).collect::<Vec<_>>(),
                "count": registry.len()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Outcome of an eager crew check
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationReport {
    /// Unknown tools, undeclared agents, duplicate task names
    pub problems: Vec<String>,
    /// References that will resolve to `UNKNOWN` at run time
    pub warnings: Vec<String>,
}

/// Eagerly check everything the engine only discovers at run time
pub fn validate_crew(crew: &CrewConfiguration, registry: &ToolRegistry) -> ValidationReport {
    let mut report = ValidationReport::default();

    for task in crew.tasks() {
        for tool in task.tools.iter().filter(|t| !registry.contains(t)) {
            report
                .problems
                .push(format!("Task '{}' names unknown tool '{}'", task.name, tool));
        }
    }

    for (task, agent) in crew.undeclared_agents() {
        report
            .problems
            .push(format!("Task '{}' is assigned undeclared agent '{}'", task, agent));
    }

    for name in crew.duplicate_task_names() {
        report.problems.push(format!(
            "Task name '{}' is declared more than once; the last output wins",
            name
        ));
    }

    for (index, task) in crew.tasks().iter().enumerate() {
        let earlier = &crew.tasks()[..index];
        for (param, value) in task.input.iter().filter(|(_, v)| is_reference_expression(v)) {
            let text = value.as_str().unwrap_or_default();
            match Reference::parse(text) {
                None => report.warnings.push(format!(
                    "Task '{}' input '{}' is a malformed reference: {}",
                    task.name, param, text
                )),
                Some(reference) if !earlier.iter().any(|t| t.name == reference.task) => {
                    report.warnings.push(format!(
                        "Task '{}' input '{}' refers to '{}', which does not run earlier",
                        task.name, param, reference.task
                    ))
                }
                Some(_) => {}
            }
        }
    }

    report
}

/// Images from `--image` flags followed by the sorted images of `dir`
pub fn collect_image_paths(images: &[PathBuf], dir: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut paths = images.to_vec();

    if let Some(dir) = dir {
        let mut found = Vec::new();
        for entry in fs::read_dir(dir)
            .with_context(|| format!("Failed to read image directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && is_image(&path) {
                found.push(path);
            }
        }
        found.sort();
        paths.extend(found);
    }

    Ok(paths)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png"))
        .unwrap_or(false)
}

/// Parse `key=value`; the value is JSON when it parses, a string otherwise
pub fn parse_override(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Override '{}' must look like key=value", raw))?;

    let key = key.trim();
    if key.is_empty() {
        bail!("Override '{}' has an empty key", raw);
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Apply one `--set` override.
///
/// `task.param=value` sets a single task's parameter; `param=value` sets it
/// on every task that declares it.
fn apply_override(crew: &mut CrewConfiguration, raw: &str) -> Result<()> {
    let (key, value) = parse_override(raw)?;

    if let Some((task_name, param)) = key.split_once('.') {
        let task = crew
            .task_mut(task_name)
            .ok_or_else(|| anyhow!("Override '{}' names unknown task '{}'", raw, task_name))?;
        task.set_input(param, value);
        return Ok(());
    }

    if crew.override_input(&key, value) == 0 {
        warn!("No task declares '{}'; override ignored", key);
    }
    Ok(())
}

/// Load the agents and tasks documents chosen by flags or settings
fn load_crew(args: &CrewArgs, config: &Config) -> Result<CrewConfiguration> {
    let agents = args
        .agents
        .clone()
        .or_else(|| config.crew.agents.clone())
        .context("No agents document given (use --agents or [crew].agents)")?;
    let tasks = args
        .tasks
        .clone()
        .or_else(|| config.crew.tasks.clone())
        .context("No tasks document given (use --tasks or [crew].tasks)")?;

    CrewConfiguration::from_files(&agents, &tasks).context("Failed to load crew")
}

fn print_outputs(store: &OutputStore, failed: Option<&str>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if store.is_empty() && failed.is_none() {
                println!("No task produced output");
            }
            for (task, output) in store.iter() {
                println!("{}:", task);
                for (field, value) in output {
                    match value {
                        Value::String(s) => println!("  {}: {}", field, s),
                        other => println!("  {}: {}", field, other),
                    }
                }
                println!();
            }
            if let Some(task) = failed {
                println!("✗ Task '{}' failed", task);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "outputs": store,
                "failed_task": failed,
                "success": failed.is_none()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crew::TaskSpec;
    use crew_sdk::{FnTool, ToolInput, ToolOutput};

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("threshold=0.5").unwrap(),
            ("threshold".to_string(), json!(0.5))
        );
        assert_eq!(
            parse_override("name=Wheat Rust").unwrap(),
            ("name".to_string(), json!("Wheat Rust"))
        );
        assert_eq!(
            parse_override("paths=[\"a.png\"]").unwrap(),
            ("paths".to_string(), json!(["a.png"]))
        );
        assert!(parse_override("novalue").is_err());
        assert!(parse_override("=1").is_err());
    }

    #[test]
    fn test_apply_override_single_task() {
        let mut crew = CrewConfiguration::from_tasks(vec![
            TaskSpec::new("a", "x").with_input("k", json!(1)),
            TaskSpec::new("b", "x").with_input("k", json!(1)),
        ]);

        apply_override(&mut crew, "b.k=2").unwrap();
        assert_eq!(crew.task("a").unwrap().input["k"], json!(1));
        assert_eq!(crew.task("b").unwrap().input["k"], json!(2));

        apply_override(&mut crew, "k=3").unwrap();
        assert_eq!(crew.task("a").unwrap().input["k"], json!(3));

        assert!(apply_override(&mut crew, "missing.k=1").is_err());
    }

    #[test]
    fn test_collect_image_paths_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpg", "notes.txt", "c.jpeg"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let explicit = vec![PathBuf::from("first.png")];
        let paths = collect_image_paths(&explicit, Some(dir.path())).unwrap();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("first.png"),
                dir.path().join("a.jpg"),
                dir.path().join("b.PNG"),
                dir.path().join("c.jpeg"),
            ]
        );
    }

    #[test]
    fn test_validate_crew_reports_problems() {
        let mut registry = ToolRegistry::new();
        registry.register(FnTool::new("Echo", |input: &ToolInput| {
            Ok(ToolOutput::from(input.params.clone()))
        }));

        let crew = CrewConfiguration::from_tasks(vec![
            TaskSpec::new("t1", "ghost")
                .with_tool("Echo")
                .with_input("x", json!("{{t2.output.y}}")),
            TaskSpec::new("t2", "")
                .with_tool("Missing")
                .with_input("x", json!("{{t1.y}}")),
            TaskSpec::new("t2", "").with_tool("Echo"),
        ]);

        let report = validate_crew(&crew, &registry);
        assert_eq!(report.problems.len(), 3);
        assert!(report.problems[0].contains("unknown tool 'Missing'"));
        assert!(report.problems[1].contains("undeclared agent 'ghost'"));
        assert!(report.problems[2].contains("'t2'"));
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_validate_clean_crew() {
        let mut registry = ToolRegistry::new();
        registry.register(FnTool::new("Echo", |input: &ToolInput| {
            Ok(ToolOutput::from(input.params.clone()))
        }));
        let crew = CrewConfiguration::from_tasks(vec![
            TaskSpec::new("t1", "").with_tool("Echo"),
            TaskSpec::new("t2", "")
                .with_tool("Echo")
                .with_input("x", json!("{{t1.output.y}}")),
        ]);

        assert_eq!(validate_crew(&crew, &registry), ValidationReport::default());
    }
}
