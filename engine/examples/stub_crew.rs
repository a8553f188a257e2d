//! Example demonstrating a crew run with stub tools
//!
//! This example shows how to:
//! - Register tools by name
//! - Declare tasks that feed each other through back-references
//! - Run the crew and read the outputs by task name
//!
//! No model or network access is needed.

use agrocrew_engine::crew::{Crew, CrewConfiguration, RecordingSink, TaskSpec};
use agrocrew_engine::tools::{AdviceLookup, ToolRegistry};
use crew_sdk::{FnTool, ToolInput, ToolOutput};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Stub Crew Example ===\n");

    let mut registry = ToolRegistry::new();
    registry.register(FnTool::new("StageClassifier", |input: &ToolInput| {
        let predictions: Vec<_> = input
            .param_str_list("image_paths")?
            .into_iter()
            .map(|image| {
                let stage = if image.contains("gold") {
                    "Ripening"
                } else {
                    "Filling"
                };
                json!({"image": image, "growth_stage": stage})
            })
            .collect();
        Ok(ToolOutput::empty().with_field("predictions", json!(predictions)))
    }));
    registry.register(AdviceLookup::new("Consult a local agronomist."));

    println!("✓ Tools registered: {:?}", registry.names());

    let mut config = CrewConfiguration::from_tasks(vec![
        TaskSpec::new("PredictWheatStage", "growth_stage_agent")
            .with_tool("StageClassifier")
            .with_input("image_paths", json!([])),
        TaskSpec::new("GiveAdvice", "advice_agent")
            .with_tool("AdviceLookup")
            .with_input("predictions", json!("{{PredictWheatStage.output.predictions}}"))
            .with_input("label_field", json!("growth_stage")),
    ]);
    config.override_input("image_paths", json!(["field_green.jpg", "field_gold.jpg"]));

    let sink = RecordingSink::new();
    let mut crew = Crew::new(config, registry).with_sink(sink.clone());
    let outputs = crew.kickoff()?;

    println!("✓ {} progress events recorded\n", sink.events().len());

    for (task, output) in outputs.iter() {
        println!("{}:", task);
        println!("{}\n", serde_json::to_string_pretty(output)?);
    }

    Ok(())
}
