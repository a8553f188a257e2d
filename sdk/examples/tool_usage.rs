//! Example demonstrating how to implement a tool and read its parameters

use crew_sdk::{EngineError, Tool, ToolInput, ToolOutput};
use serde_json::json;

/// Labels a wheat leaf from its file name. Stands in for a real classifier.
struct FileNameClassifier;

impl Tool for FileNameClassifier {
    fn name(&self) -> &str {
        "FileNameClassifier"
    }

    fn description(&self) -> &str {
        "Guesses a disease label from the image file name"
    }

    fn execute(&self, input: &ToolInput) -> Result<ToolOutput, EngineError> {
        let mut predictions = Vec::new();
        for path in input.param_str_list("image_paths")? {
            let label = if path.contains("rust") {
                "Wheat Brown-rust"
            } else {
                "Wheat Healthy"
            };
            predictions.push(json!({ "image": path, "disease": label }));
        }
        Ok(ToolOutput::empty().with_field("predictions", json!(predictions)))
    }
}

fn main() {
    let tool = FileNameClassifier;

    let input = ToolInput::new().with_param("image_paths", json!(["leaf_rust.png", "leaf.png"]));
    match tool.execute(&input) {
        Ok(output) => println!("{} -> {}", tool.name(), json!(output)),
        Err(e) => println!("Error: {}", e),
    }

    // A missing parameter surfaces as an inference failure
    match tool.execute(&ToolInput::new()) {
        Ok(output) => println!("Unexpected output: {:?}", output),
        Err(e) => println!("Error: {}", e),
    }
}
